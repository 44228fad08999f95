//! Query core for uploaded CSV datasets: preview, summary, filtered and
//! paginated rows, correlation and date-bucketed trends.

pub mod config;
pub mod data;
pub mod error;
pub mod params;
pub mod service;

pub use config::Settings;
pub use error::{QueryError, QueryResult};
pub use service::{DatasetService, Endpoint, Response};
