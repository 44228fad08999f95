use std::collections::HashSet;
use std::path::Path;

use crate::error::{QueryError, QueryResult};

use super::model::{Column, DataType, Table, Value};

/// Cell contents read as a missing value; the default NA set of pandas'
/// `read_csv`.
const MISSING_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a CSV file from disk, reading at most `nrows` data rows.
pub fn load_file(path: &Path, nrows: Option<usize>) -> QueryResult<Table> {
    let bytes = std::fs::read(path)?;
    let table = load_csv(&bytes, nrows)?;
    log::debug!(
        "loaded {} rows x {} columns from {}",
        table.num_rows(),
        table.num_columns(),
        path.display()
    );
    Ok(table)
}

/// Parse CSV bytes (header row first) into a [`Table`].
///
/// Column types are inferred per column: numeric when every present cell
/// parses as a float, integral when every present cell also parses as an
/// integer, text otherwise. Rows shorter than the header are padded with
/// missing cells; rows longer than the header are a read error.
pub fn load_csv(bytes: &[u8], nrows: Option<usize>) -> QueryResult<Table> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(QueryError::DataRead("Empty file".to_string()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let raw_headers = reader.headers()?.clone();
    if raw_headers.is_empty() {
        return Err(QueryError::DataRead("Empty file".to_string()));
    }
    let headers = dedupe_headers(raw_headers.iter());

    let limit = nrows.unwrap_or(usize::MAX);
    let mut rows = Vec::new();
    for result in reader.records().take(limit) {
        let record = result?;
        if record.len() > headers.len() {
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            return Err(QueryError::DataRead(format!(
                "Invalid CSV format: expected {} fields in line {line}, saw {}",
                headers.len(),
                record.len()
            )));
        }
        rows.push(record);
    }

    let columns = headers
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let cells: Vec<Option<&str>> = rows
                .iter()
                .map(|r| r.get(idx).filter(|s| !is_missing_token(s)))
                .collect();
            build_column(name, &cells)
        })
        .collect();

    Table::try_new(columns)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn is_missing_token(s: &str) -> bool {
    MISSING_TOKENS.contains(&s.trim())
}

/// Repeated header names get a `.1`, `.2`, ... suffix so every column stays
/// addressable.
fn dedupe_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for name in raw {
        let mut candidate = name.to_string();
        let mut n = 1;
        while seen.contains(&candidate) {
            candidate = format!("{name}.{n}");
            n += 1;
        }
        seen.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

fn infer_type(cells: &[Option<&str>]) -> DataType {
    let mut present = cells.iter().flatten().map(|s| s.trim()).peekable();
    if present.peek().is_none() {
        return DataType::Text;
    }
    let mut integral = true;
    for s in present {
        if s.parse::<i64>().is_ok() {
            continue;
        }
        integral = false;
        if s.parse::<f64>().is_err() {
            return DataType::Text;
        }
    }
    if integral {
        DataType::Integer
    } else {
        DataType::Float
    }
}

fn build_column(name: String, cells: &[Option<&str>]) -> Column {
    let dtype = infer_type(cells);
    let values = cells
        .iter()
        .map(|cell| match (cell, dtype) {
            (None, _) => Value::Missing,
            (Some(s), DataType::Integer) => s
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .unwrap_or(Value::Missing),
            (Some(s), DataType::Float) => s
                .trim()
                .parse::<f64>()
                .map(Value::Number)
                .unwrap_or(Value::Missing),
            (Some(s), DataType::Text) => Value::Text(s.to_string()),
        })
        .collect();
    Column::new(name, dtype, values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_column_types() {
        let t = load_csv(b"a,b,c,d\n1,1.5,x,\n2,2,y,\n", None).unwrap();
        assert_eq!(t.num_rows(), 2);
        assert_eq!(t.column("a").unwrap().dtype, DataType::Integer);
        assert_eq!(t.column("b").unwrap().dtype, DataType::Float);
        assert_eq!(t.column("c").unwrap().dtype, DataType::Text);
        assert_eq!(t.column("d").unwrap().dtype, DataType::Text);
        assert_eq!(t.column("d").unwrap().values[0], Value::Missing);
    }

    #[test]
    fn missing_tokens_do_not_break_numeric_columns() {
        let t = load_csv(b"v\n1\nNA\n\n3\n", None).unwrap();
        let col = t.column("v").unwrap();
        assert_eq!(col.dtype, DataType::Integer);
        assert_eq!(
            col.values,
            vec![Value::Integer(1), Value::Missing, Value::Integer(3)]
        );
    }

    #[test]
    fn row_cap_is_honoured() {
        let t = load_csv(b"a\n1\n2\n3\n4\n", Some(2)).unwrap();
        assert_eq!(t.num_rows(), 2);
    }

    #[test]
    fn header_only_gives_empty_table() {
        let t = load_csv(b"a,b\n", None).unwrap();
        assert_eq!(t.num_rows(), 0);
        assert_eq!(t.column_names(), ["a", "b"]);
    }

    #[test]
    fn empty_content_is_a_read_error() {
        assert_eq!(
            load_csv(b"", None).unwrap_err(),
            QueryError::DataRead("Empty file".into())
        );
        assert!(matches!(
            load_csv(b"  \n", None),
            Err(QueryError::DataRead(_))
        ));
    }

    #[test]
    fn long_rows_are_a_read_error() {
        let err = load_csv(b"a,b\n1,2,3\n", None).unwrap_err();
        assert_eq!(
            err,
            QueryError::DataRead("Invalid CSV format: expected 2 fields in line 2, saw 3".into())
        );
    }

    #[test]
    fn short_rows_are_padded_with_missing() {
        let t = load_csv(b"a,b\n1,2\n3\n", None).unwrap();
        assert_eq!(t.num_rows(), 2);
        let b = t.column("b").unwrap();
        assert_eq!(b.dtype, DataType::Integer);
        assert_eq!(b.values, vec![Value::Integer(2), Value::Missing]);
    }

    #[test]
    fn pandas_na_tokens_keep_columns_numeric() {
        let t = load_csv(
            b"amount\n10\nn/a\n<NA>\n#NA\n-nan\n1.#QNAN\n#N/A N/A\n30\n",
            None,
        )
        .unwrap();
        let col = t.column("amount").unwrap();
        assert_eq!(col.dtype, DataType::Integer);
        assert_eq!(col.values.iter().filter(|v| v.is_missing()).count(), 6);
    }

    #[test]
    fn integers_beyond_f64_precision_are_exact() {
        let t = load_csv(b"id\n9007199254740993\n", None).unwrap();
        assert_eq!(
            t.column("id").unwrap().values,
            vec![Value::Integer(9_007_199_254_740_993)]
        );
        assert_eq!(t.record(0)["id"], serde_json::json!(9_007_199_254_740_993_i64));
    }

    #[test]
    fn invalid_utf8_is_a_read_error() {
        let err = load_csv(b"a\n\xff\xfe\n", None).unwrap_err();
        assert!(matches!(err, QueryError::DataRead(_)));
    }

    #[test]
    fn duplicate_headers_are_suffixed() {
        let t = load_csv(b"a,a,a\n1,2,3\n", None).unwrap();
        assert_eq!(t.column_names(), ["a", "a.1", "a.2"]);
    }
}
