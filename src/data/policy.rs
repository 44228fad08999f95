use serde::Deserialize;

/// What the filter and sort stages do with a column or operator they do not
/// recognise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownTargetPolicy {
    /// Ignore the predicate / sort key. Optional filters coming from clients
    /// that do not know the file's schema must not fail the request.
    #[default]
    Skip,
    /// Report the unknown target as a validation error.
    Reject,
}

/// Policy applied when the caller does not pick one.
pub const UNKNOWN_TARGETS: UnknownTargetPolicy = UnknownTargetPolicy::Skip;

impl std::str::FromStr for UnknownTargetPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(UnknownTargetPolicy::Skip),
            "reject" => Ok(UnknownTargetPolicy::Reject),
            other => Err(format!("unknown target policy '{other}' (use skip or reject)")),
        }
    }
}
