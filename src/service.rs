use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde_json::{json, Value as JsonValue};

use crate::config::Settings;
use crate::data::correlation::compute_correlation;
use crate::data::filter::apply_filters_with;
use crate::data::loader::{load_csv, load_file};
use crate::data::model::Table;
use crate::data::paginate::paginate;
use crate::data::select::select_columns;
use crate::data::sort::apply_sort_with;
use crate::data::summary::summarize;
use crate::data::trend::compute_trend;
use crate::error::{QueryError, QueryResult};
use crate::params::{CorrelationParams, QueryParams, RowsParams, TrendParams};

// ---------------------------------------------------------------------------
// Endpoint / Response
// ---------------------------------------------------------------------------

/// The dataset queries exposed to the web layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Preview,
    Summary,
    Rows,
    Correlation,
    Trend,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Endpoint::Preview => "preview",
            Endpoint::Summary => "summary",
            Endpoint::Rows => "rows",
            Endpoint::Correlation => "correlation",
            Endpoint::Trend => "trend",
        };
        f.write_str(name)
    }
}

impl FromStr for Endpoint {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preview" => Ok(Endpoint::Preview),
            "summary" => Ok(Endpoint::Summary),
            "rows" => Ok(Endpoint::Rows),
            "correlation" => Ok(Endpoint::Correlation),
            "trend" => Ok(Endpoint::Trend),
            other => Err(QueryError::Validation(format!("Unknown endpoint: {other}"))),
        }
    }
}

/// Status plus JSON body, ready for the web layer to send.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: JsonValue,
}

impl Response {
    pub fn ok(body: JsonValue) -> Self {
        Response { status: 200, body }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

impl From<QueryError> for Response {
    fn from(err: QueryError) -> Self {
        Response {
            status: err.status(),
            body: err.to_payload(),
        }
    }
}

// ---------------------------------------------------------------------------
// DatasetService
// ---------------------------------------------------------------------------

/// Runs dataset queries over stored CSV content. Holds only settings; each
/// call loads, transforms and drops its own [`Table`].
#[derive(Debug, Clone, Default)]
pub struct DatasetService {
    settings: Settings,
}

impl DatasetService {
    pub fn new(settings: Settings) -> Self {
        DatasetService { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Dispatch `endpoint` and turn any failure into its error payload.
    pub fn handle(&self, endpoint: Endpoint, id: u64, content: &[u8], query: &str) -> Response {
        log::info!("dataset {id}: {endpoint} ?{query}");
        let result = match endpoint {
            Endpoint::Preview => self.preview(id, content),
            Endpoint::Summary => self.summary(id, content),
            Endpoint::Rows => self.rows(content, query),
            Endpoint::Correlation => self.correlation(id, content, query),
            Endpoint::Trend => self.trend(id, content, query),
        };
        match result {
            Ok(body) => Response::ok(body),
            Err(err) => {
                log::info!("dataset {id}: {endpoint} rejected: {err}");
                err.into()
            }
        }
    }

    /// Same as [`handle`](Self::handle), reading the content from `path`.
    pub fn handle_file(&self, endpoint: Endpoint, id: u64, path: &Path, query: &str) -> Response {
        match std::fs::read(path) {
            Ok(content) => self.handle(endpoint, id, &content, query),
            Err(err) => QueryError::from(err).into(),
        }
    }

    /// `{"id", "rows"}` with the first `preview_rows` rows.
    pub fn preview(&self, id: u64, content: &[u8]) -> QueryResult<JsonValue> {
        let table = load_csv(content, Some(self.settings.preview_rows))?;
        Ok(json!({ "id": id, "rows": table.records() }))
    }

    /// `{"id", "summary"}` with count / mean / std per numeric column.
    pub fn summary(&self, id: u64, content: &[u8]) -> QueryResult<JsonValue> {
        let table = load_csv(content, None)?;
        let summary = serde_json::to_value(summarize(&table))
            .map_err(|e| QueryError::DataRead(format!("Unable to encode summary: {e}")))?;
        Ok(json!({ "id": id, "summary": summary }))
    }

    /// Filter, select, sort and paginate. Returns the page envelope.
    pub fn rows(&self, content: &[u8], query: &str) -> QueryResult<JsonValue> {
        let params = RowsParams::from_query(&QueryParams::parse(query), &self.settings)?;
        let table = load_csv(content, None)?;
        let table = self.run_rows_pipeline(&table, &params)?;
        let page = paginate(&table.records(), params.page, params.page_size);
        serde_json::to_value(page)
            .map_err(|e| QueryError::DataRead(format!("Unable to encode rows: {e}")))
    }

    /// `{"id", "correlation"}`
    pub fn correlation(&self, id: u64, content: &[u8], query: &str) -> QueryResult<JsonValue> {
        let params = CorrelationParams::from_query(&QueryParams::parse(query));
        let table = load_csv(content, None)?;
        let matrix = compute_correlation(&table, params.cols.as_deref())?;
        Ok(json!({ "id": id, "correlation": matrix }))
    }

    /// `{"id", "trend": [{"date", <value>}]}`
    pub fn trend(&self, id: u64, content: &[u8], query: &str) -> QueryResult<JsonValue> {
        let params = TrendParams::from_query(&QueryParams::parse(query))?;
        let table = load_csv(content, None)?;
        let trend = compute_trend(&table, &params.date, &params.value, params.freq, params.agg)?;
        Ok(json!({ "id": id, "trend": trend.into_records() }))
    }

    /// Load `path` and run the rows pipeline, without paginating.
    pub fn query_file(&self, path: &Path, params: &RowsParams) -> QueryResult<Table> {
        let table = load_file(path, None)?;
        self.run_rows_pipeline(&table, params)
    }

    /// Filter → select → sort.
    pub fn run_rows_pipeline(&self, table: &Table, params: &RowsParams) -> QueryResult<Table> {
        let policy = self.settings.unknown_targets;
        let filtered = apply_filters_with(table, &params.filters, policy)?;
        let selected = select_columns(&filtered, params.columns.as_deref())?;
        let sorted = apply_sort_with(&selected, params.sort.as_deref(), policy)?;
        log::debug!(
            "rows pipeline: {} -> {} rows, {} column(s)",
            table.num_rows(),
            sorted.num_rows(),
            sorted.num_columns()
        );
        Ok(sorted)
    }
}
