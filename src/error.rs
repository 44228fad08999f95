use serde_json::{json, Value as JsonValue};

// ---------------------------------------------------------------------------
// QueryError – everything a single request can fail with
// ---------------------------------------------------------------------------

/// Failures of the query core. Both kinds are client errors scoped to one
/// request; neither is retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    /// The stored file is empty, unreadable or not delimited text.
    #[error("{0}")]
    DataRead(String),
    /// A requested column or parameter does not exist or is malformed.
    #[error("{0}")]
    Validation(String),
}

pub type QueryResult<T> = Result<T, QueryError>;

impl QueryError {
    /// Build the error raised when one or more requested columns are absent.
    /// Every missing name is listed, not only the first.
    pub fn missing_columns<S: AsRef<str>>(missing: &[S]) -> Self {
        let names: Vec<&str> = missing.iter().map(|s| s.as_ref()).collect();
        QueryError::Validation(format!("Missing columns: [{}]", names.join(", ")))
    }

    /// Machine-readable error code of the JSON payload.
    pub fn code(&self) -> &'static str {
        "bad_request"
    }

    /// HTTP-equivalent status code.
    pub fn status(&self) -> u16 {
        400
    }

    /// `{"error": {"code": ..., "message": ...}}`
    pub fn to_payload(&self) -> JsonValue {
        json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        })
    }
}

impl From<csv::Error> for QueryError {
    fn from(err: csv::Error) -> Self {
        match err.kind() {
            csv::ErrorKind::Io(io) => QueryError::DataRead(format!("Error reading file: {io}")),
            _ => QueryError::DataRead(format!("Invalid CSV format: {err}")),
        }
    }
}

impl From<std::io::Error> for QueryError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => QueryError::DataRead("File not found".to_string()),
            _ => QueryError::DataRead(format!("Error reading file: {err}")),
        }
    }
}
