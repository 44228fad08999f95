use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::data::paginate::MAX_PAGE_SIZE;
use crate::data::policy::{UnknownTargetPolicy, UNKNOWN_TARGETS};

/// Tunables of the query service. Every field has a default, so a config file
/// only needs the keys it changes:
///
/// ```json
/// { "preview_rows": 10, "unknown_targets": "reject" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Rows returned by the preview endpoint.
    pub preview_rows: usize,
    /// `page_size` used when the request has none.
    pub default_page_size: usize,
    /// Largest `page_size` a request may ask for.
    pub max_page_size: usize,
    /// Handling of unknown filter/sort columns and filter operators.
    pub unknown_targets: UnknownTargetPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            preview_rows: 5,
            default_page_size: 50,
            max_page_size: MAX_PAGE_SIZE,
            unknown_targets: UNKNOWN_TARGETS,
        }
    }
}

impl Settings {
    /// Read settings from a JSON file, or use the defaults when no file is
    /// named.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                Self::from_json(&text)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => Self::default(),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(text).context("invalid settings JSON")?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_page_size == 0 || self.max_page_size > MAX_PAGE_SIZE {
            bail!("max_page_size must be within 1..={MAX_PAGE_SIZE}");
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            bail!(
                "default_page_size must be within 1..={}",
                self.max_page_size
            );
        }
        if self.preview_rows == 0 {
            bail!("preview_rows must be at least 1");
        }
        Ok(())
    }
}
