use std::cmp::Ordering;
use std::fmt;

use serde_json::{Map, Number, Value as JsonValue};

use crate::error::{QueryError, QueryResult};

/// One row rendered for serialization: column name → JSON value, in table
/// column order.
pub type Record = Map<String, JsonValue>;

// ---------------------------------------------------------------------------
// Value – a single cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell. The variant a column may hold is decided once per
/// column at load time (see [`DataType`]); `Missing` can appear in any column.
/// Integral columns keep exact `i64` values.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Number(f64),
    Missing,
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Numeric coercion. Text cells are parsed; anything that does not yield a
    /// real number is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Number(v) if !v.is_nan() => Some(*v),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|v| !v.is_nan()),
            _ => None,
        }
    }

    /// String normalization used by equality-style predicates. Integers render
    /// exactly (`10`); floats keep a fractional part (`10.0`, `10.5`).
    pub fn to_text(&self, dtype: DataType) -> Option<String> {
        match self {
            Value::Missing => None,
            Value::Text(s) => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Number(v) => Some(format_number(*v, dtype)),
        }
    }

    pub fn to_json(&self, dtype: DataType) -> JsonValue {
        match self {
            Value::Missing => JsonValue::Null,
            Value::Text(s) => JsonValue::String(s.clone()),
            Value::Integer(i) => JsonValue::from(*i),
            Value::Number(v) if dtype == DataType::Integer && is_exact_i64(*v) => {
                JsonValue::from(*v as i64)
            }
            Value::Number(v) => Number::from_f64(*v)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
        }
    }

    /// Ordering between two present cells of the same column. Missing cells
    /// are handled by the caller so they can be placed last in either
    /// direction.
    pub fn cmp_present(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::Integer(a), Value::Number(b)) => (*a as f64).total_cmp(b),
            (Value::Number(a), Value::Integer(b)) => a.total_cmp(&(*b as f64)),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Integer(_) | Value::Number(_), Value::Text(_)) => Ordering::Less,
            (Value::Text(_), Value::Integer(_) | Value::Number(_)) => Ordering::Greater,
            _ => Ordering::Equal,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Number(v) => write!(f, "{v}"),
            Value::Missing => write!(f, "<missing>"),
        }
    }
}

/// Whether `v` is integral and inside the range an `i64` holds without
/// saturating.
fn is_exact_i64(v: f64) -> bool {
    v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64
}

fn format_number(v: f64, dtype: DataType) -> String {
    if dtype == DataType::Integer && is_exact_i64(v) {
        format!("{}", v as i64)
    } else if v.is_finite() && v.fract() == 0.0 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

// ---------------------------------------------------------------------------
// Column
// ---------------------------------------------------------------------------

/// Column type detected at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Text,
    /// Numeric, every present value integral.
    Integer,
    Float,
}

impl DataType {
    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Integer | DataType::Float)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub dtype: DataType,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, dtype: DataType, values: Vec<Value>) -> Self {
        Column {
            name: name.into(),
            dtype,
            values,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.dtype.is_numeric()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Numeric view of the column; non-coercible cells are `None`.
    pub fn numbers(&self) -> Vec<Option<f64>> {
        self.values.iter().map(Value::as_f64).collect()
    }

    fn take(&self, indices: &[usize]) -> Column {
        Column {
            name: self.name.clone(),
            dtype: self.dtype,
            values: indices.iter().map(|&i| self.values[i].clone()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// An immutable in-memory table. Every pipeline stage borrows a table and
/// builds a new one, so a table can be shared across threads freely.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Table {
    /// Build a table, checking that all columns have the same length.
    pub fn try_new(columns: Vec<Column>) -> QueryResult<Self> {
        let num_rows = columns.first().map(Column::len).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.len() != num_rows) {
            return Err(QueryError::Validation(format!(
                "Column '{}' has {} rows, expected {num_rows}",
                bad.name,
                bad.len()
            )));
        }
        Ok(Table { columns, num_rows })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Names from `names` that are not columns of this table, in request order.
    pub fn missing_columns<'a, S: AsRef<str>>(&self, names: &'a [S]) -> Vec<&'a str> {
        names
            .iter()
            .map(|n| n.as_ref())
            .filter(|n| !self.has_column(n))
            .collect()
    }

    /// Fail with a validation error naming every absent column.
    pub fn require_columns<S: AsRef<str>>(&self, names: &[S]) -> QueryResult<()> {
        let missing = self.missing_columns(names);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(QueryError::missing_columns(&missing[..]))
        }
    }

    /// New table holding the rows at `indices`, in that order.
    pub fn take(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.iter().map(|c| c.take(indices)).collect(),
            num_rows: indices.len(),
        }
    }

    /// New table with the named columns, in the given order. Unknown names are
    /// skipped; callers validate first when that matters.
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> Table {
        let columns = names
            .iter()
            .filter_map(|n| self.column(n.as_ref()).cloned())
            .collect();
        Table {
            columns,
            num_rows: self.num_rows,
        }
    }

    pub fn head(&self, n: usize) -> Table {
        let indices: Vec<usize> = (0..self.num_rows.min(n)).collect();
        self.take(&indices)
    }

    pub fn record(&self, row: usize) -> Record {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.values[row].to_json(c.dtype)))
            .collect()
    }

    pub fn records(&self) -> Vec<Record> {
        (0..self.num_rows).map(|row| self.record(row)).collect()
    }
}
