use std::collections::btree_map;
use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime};
use serde_json::{Number, Value as JsonValue};

use crate::error::{QueryError, QueryResult};

use super::model::{Record, Table, Value};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

// ---------------------------------------------------------------------------
// Frequency / Aggregation tags
// ---------------------------------------------------------------------------

/// Bucket width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    /// `D`
    Day,
    /// `W`, weeks start on Monday.
    Week,
    /// `M`
    Month,
}

impl Frequency {
    /// Start of the bucket containing `date`.
    pub fn bucket(self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Frequency::Day => Some(date),
            Frequency::Week => {
                let back = date.weekday().num_days_from_monday();
                date.checked_sub_days(Days::new(u64::from(back)))
            }
            Frequency::Month => date.with_day(1),
        }
    }
}

impl FromStr for Frequency {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "D" => Ok(Frequency::Day),
            "W" => Ok(Frequency::Week),
            "M" => Ok(Frequency::Month),
            _ => Err(QueryError::Validation(
                "Invalid freq (use D, W, or M)".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Sum,
    Mean,
    Count,
}

impl FromStr for Aggregation {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" => Ok(Aggregation::Sum),
            "mean" => Ok(Aggregation::Mean),
            "count" => Ok(Aggregation::Count),
            _ => Err(QueryError::Validation(
                "Invalid agg (use sum, mean, or count)".to_string(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Trend – lazily yielded bucket results
// ---------------------------------------------------------------------------

/// One aggregated bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl TrendPoint {
    /// `{"date": "YYYY-MM-DD", <value_key>: value}`
    pub fn to_record(&self, value_key: &str) -> Record {
        let mut record = Record::new();
        record.insert(
            "date".to_string(),
            JsonValue::String(self.date.format("%Y-%m-%d").to_string()),
        );
        let value = Number::from_f64(self.value)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null);
        record.insert(value_key.to_string(), value);
        record
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    sum: f64,
    rows: usize,
}

/// Iterator over the non-empty buckets of a trend, ascending by date. The
/// aggregate of each bucket is finalized as it is yielded.
#[derive(Debug)]
pub struct Trend {
    value_column: String,
    agg: Aggregation,
    buckets: btree_map::IntoIter<NaiveDate, Bucket>,
}

impl Trend {
    pub fn value_column(&self) -> &str {
        &self.value_column
    }

    /// Key under which a point's value is rendered. Falls back to `value` when
    /// the value column is itself called `date`.
    pub fn value_key(&self) -> &str {
        if self.value_column == "date" {
            "value"
        } else {
            &self.value_column
        }
    }

    pub fn into_records(self) -> Vec<Record> {
        let key = self.value_key().to_string();
        self.map(|point| point.to_record(&key)).collect()
    }
}

impl Iterator for Trend {
    type Item = TrendPoint;

    fn next(&mut self) -> Option<TrendPoint> {
        let (date, bucket) = self.buckets.next()?;
        let value = match self.agg {
            Aggregation::Sum => bucket.sum,
            Aggregation::Mean => bucket.sum / bucket.rows as f64,
            Aggregation::Count => bucket.rows as f64,
        };
        Some(TrendPoint { date, value })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.buckets.size_hint()
    }
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// Group rows by the bucket of `date_column` and aggregate `value_column`.
///
/// Rows whose date does not parse are dropped. For `sum` and `mean` a
/// non-numeric value drops only that row's contribution. `count` counts rows
/// with a parsed date. Buckets without contributions are not emitted.
pub fn compute_trend(
    table: &Table,
    date_column: &str,
    value_column: &str,
    freq: Frequency,
    agg: Aggregation,
) -> QueryResult<Trend> {
    table.require_columns(&[date_column, value_column])?;
    let (Some(dates), Some(values)) = (table.column(date_column), table.column(value_column))
    else {
        return Err(QueryError::missing_columns(&[date_column, value_column]));
    };

    let mut buckets: BTreeMap<NaiveDate, Bucket> = BTreeMap::new();
    let mut dropped = 0usize;
    for (date_cell, value_cell) in dates.values.iter().zip(&values.values) {
        let Some(key) = parse_date(date_cell).and_then(|d| freq.bucket(d)) else {
            dropped += 1;
            continue;
        };
        match agg {
            Aggregation::Count => buckets.entry(key).or_default().rows += 1,
            Aggregation::Sum | Aggregation::Mean => {
                if let Some(v) = value_cell.as_f64() {
                    let bucket = buckets.entry(key).or_default();
                    bucket.sum += v;
                    bucket.rows += 1;
                }
            }
        }
    }
    if dropped > 0 {
        log::debug!("trend: {dropped} row(s) without a parseable date in '{date_column}'");
    }

    Ok(Trend {
        value_column: value_column.to_string(),
        agg,
        buckets: buckets.into_iter(),
    })
}

/// Lenient date coercion: anything that is not a recognised date or
/// timestamp is `None`.
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    let Value::Text(raw) = value else {
        return None;
    };
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}
