use url::form_urlencoded;

use crate::config::Settings;
use crate::data::filter::Predicate;
use crate::data::trend::{Aggregation, Frequency};
use crate::error::{QueryError, QueryResult};

// ---------------------------------------------------------------------------
// QueryParams – decoded query string
// ---------------------------------------------------------------------------

/// Decoded `application/x-www-form-urlencoded` pairs, in their original order.
/// Blank values count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs = form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        QueryParams { pairs }
    }

    /// Last non-blank value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, v)| k == name && !v.trim().is_empty())
            .map(|(_, v)| v.as_str())
    }

    /// Every non-blank value of `name`, in order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, v)| k == name && !v.trim().is_empty())
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Comma-separated list, parts trimmed and blanks dropped.
    pub fn get_list(&self, name: &str) -> Option<Vec<String>> {
        self.get(name).map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
    }

    fn get_int(&self, name: &str, default: usize, min: usize, max: usize) -> QueryResult<usize> {
        let Some(raw) = self.get(name) else {
            return Ok(default);
        };
        let value: i64 = raw.trim().parse().map_err(|_| {
            QueryError::Validation(format!("{name}: A valid integer is required."))
        })?;
        if value < min as i64 {
            return Err(QueryError::Validation(format!(
                "{name}: Ensure this value is greater than or equal to {min}."
            )));
        }
        if value > max as i64 {
            return Err(QueryError::Validation(format!(
                "{name}: Ensure this value is less than or equal to {max}."
            )));
        }
        Ok(value as usize)
    }
}

// ---------------------------------------------------------------------------
// Per-endpoint parameters
// ---------------------------------------------------------------------------

/// `f`, `columns`, `sort`, `page`, `page_size`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowsParams {
    pub filters: Vec<Predicate>,
    pub columns: Option<Vec<String>>,
    pub sort: Option<String>,
    pub page: usize,
    pub page_size: usize,
}

impl RowsParams {
    pub fn from_query(params: &QueryParams, settings: &Settings) -> QueryResult<Self> {
        Ok(RowsParams {
            filters: params
                .get_all("f")
                .into_iter()
                .filter_map(Predicate::parse)
                .collect(),
            columns: params.get_list("columns"),
            sort: params.get("sort").map(str::to_string),
            page: params.get_int("page", 1, 1, i64::MAX as usize)?,
            page_size: params.get_int(
                "page_size",
                settings.default_page_size,
                1,
                settings.max_page_size,
            )?,
        })
    }
}

/// `cols`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationParams {
    pub cols: Option<Vec<String>>,
}

impl CorrelationParams {
    pub fn from_query(params: &QueryParams) -> Self {
        CorrelationParams {
            cols: params.get_list("cols"),
        }
    }
}

/// `date`, `value`, `freq`, `agg`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendParams {
    pub date: String,
    /// Column aggregated; the date column itself when `agg=count` was asked
    /// without a value column.
    pub value: String,
    pub freq: Frequency,
    pub agg: Aggregation,
}

impl TrendParams {
    pub fn from_query(params: &QueryParams) -> QueryResult<Self> {
        let date = params
            .get("date")
            .ok_or_else(|| QueryError::Validation("date: This field is required.".to_string()))?
            .to_string();
        let freq = params.get("freq").unwrap_or("D").parse::<Frequency>()?;
        let agg = params.get("agg").unwrap_or("sum").parse::<Aggregation>()?;
        let value = match (params.get("value"), agg) {
            (Some(v), _) => v.to_string(),
            (None, Aggregation::Count) => date.clone(),
            (None, _) => {
                return Err(QueryError::Validation(
                    "Missing 'value' parameter for agg != count".to_string(),
                ))
            }
        };
        Ok(TrendParams {
            date,
            value,
            freq,
            agg,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_and_keeps_repeats() {
        let q = QueryParams::parse("?f=country,eq,CO&f=name%2Ccontains%2Cde+la&sort=-amount");
        assert_eq!(q.get_all("f"), ["country,eq,CO", "name,contains,de la"]);
        assert_eq!(q.get("sort"), Some("-amount"));
        assert_eq!(q.get("missing"), None);
    }

    #[test]
    fn rows_defaults() {
        let p = RowsParams::from_query(&QueryParams::parse(""), &Settings::default()).unwrap();
        assert_eq!(p.page, 1);
        assert_eq!(p.page_size, 50);
        assert!(p.filters.is_empty());
        assert_eq!(p.columns, None);
        assert_eq!(p.sort, None);
    }

    #[test]
    fn rows_full() {
        let q = QueryParams::parse(
            "f=country,eq,CO&f=bad&columns=amount,+country&sort=-amount&page=2&page_size=10",
        );
        let p = RowsParams::from_query(&q, &Settings::default()).unwrap();
        assert_eq!(p.filters, vec![Predicate::new("country", "eq", "CO")]);
        assert_eq!(p.columns, Some(vec!["amount".to_string(), "country".to_string()]));
        assert_eq!(p.sort.as_deref(), Some("-amount"));
        assert_eq!((p.page, p.page_size), (2, 10));
    }

    #[test]
    fn rows_bounds_are_validated() {
        let settings = Settings::default();
        for qs in ["page=0", "page=x", "page_size=0", "page_size=101", "page_size=-3"] {
            let err = RowsParams::from_query(&QueryParams::parse(qs), &settings).unwrap_err();
            assert!(matches!(err, QueryError::Validation(_)), "{qs}");
        }
    }

    #[test]
    fn trend_defaults_and_count_fallback() {
        let p = TrendParams::from_query(&QueryParams::parse("date=d&agg=count")).unwrap();
        assert_eq!(p.value, "d");
        assert_eq!(p.freq, Frequency::Day);

        let p = TrendParams::from_query(&QueryParams::parse("date=d&value=v")).unwrap();
        assert_eq!(p.agg, Aggregation::Sum);
        assert_eq!(p.value, "v");
    }

    #[test]
    fn trend_rejects_bad_shapes() {
        for qs in ["", "value=v", "date=d", "date=d&value=v&freq=Y", "date=d&value=v&agg=max"] {
            assert!(TrendParams::from_query(&QueryParams::parse(qs)).is_err(), "{qs}");
        }
    }

    #[test]
    fn correlation_cols() {
        let p = CorrelationParams::from_query(&QueryParams::parse("cols=a,%20b,,"));
        assert_eq!(p.cols, Some(vec!["a".to_string(), "b".to_string()]));
    }
}
