use std::collections::HashSet;
use std::fmt;

use crate::error::{QueryError, QueryResult};

use super::model::{Column, Table, Value};
use super::policy::{UnknownTargetPolicy, UNKNOWN_TARGETS};

// ---------------------------------------------------------------------------
// Predicate: (column, operator, operand)
// ---------------------------------------------------------------------------

/// Comparison operators understood by the filter stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    In,
}

impl FilterOp {
    /// Parse an operator tag. `neq` is accepted as an alias of `ne`.
    pub fn parse(tag: &str) -> Option<Self> {
        let op = match tag {
            "eq" => FilterOp::Eq,
            "ne" | "neq" => FilterOp::Ne,
            "gt" => FilterOp::Gt,
            "gte" => FilterOp::Gte,
            "lt" => FilterOp::Lt,
            "lte" => FilterOp::Lte,
            "contains" => FilterOp::Contains,
            "in" => FilterOp::In,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Ne => "ne",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
            FilterOp::Contains => "contains",
            FilterOp::In => "in",
        }
    }
}

/// A single filter condition. The operator tag is kept verbatim so an
/// unrecognised tag can be skipped (or rejected) when the filter runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub column: String,
    pub op: String,
    pub operand: String,
}

impl Predicate {
    pub fn new(column: impl Into<String>, op: impl Into<String>, operand: impl Into<String>) -> Self {
        Predicate {
            column: column.into(),
            op: op.into(),
            operand: operand.into(),
        }
    }

    /// Parse `col,op,value`. Parts are trimmed and everything after the second
    /// comma is the operand, so operands may themselves contain commas.
    /// Fewer than three parts yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
        if parts.len() < 3 {
            return None;
        }
        Some(Predicate::new(parts[0], parts[1], parts[2..].join(",")))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.column, self.op, self.operand)
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Apply `predicates` in order (logical AND) under the default
/// [`UNKNOWN_TARGETS`] policy.
pub fn apply_filters(table: &Table, predicates: &[Predicate]) -> QueryResult<Table> {
    apply_filters_with(table, predicates, UNKNOWN_TARGETS)
}

/// Apply `predicates` in order, each narrowing the surviving rows.
///
/// A predicate on an unknown column, or with an unknown operator, is skipped
/// under [`UnknownTargetPolicy::Skip`] and is a validation error under
/// [`UnknownTargetPolicy::Reject`].
pub fn apply_filters_with(
    table: &Table,
    predicates: &[Predicate],
    policy: UnknownTargetPolicy,
) -> QueryResult<Table> {
    if predicates.is_empty() {
        return Ok(table.clone());
    }

    let mut rows: Vec<usize> = (0..table.num_rows()).collect();
    for pred in predicates {
        let Some(column) = table.column(&pred.column) else {
            unknown_target(policy, format!("Unknown filter column: {}", pred.column))?;
            continue;
        };
        let Some(op) = FilterOp::parse(&pred.op) else {
            unknown_target(policy, format!("Invalid op: {}", pred.op))?;
            continue;
        };

        let before = rows.len();
        let matcher = Matcher::new(op, &pred.operand);
        rows.retain(|&row| matcher.matches(column, &column.values[row]));
        log::debug!("filter {pred}: {before} -> {} rows", rows.len());
    }

    Ok(table.take(&rows))
}

fn unknown_target(policy: UnknownTargetPolicy, message: String) -> QueryResult<()> {
    match policy {
        UnknownTargetPolicy::Skip => {
            log::warn!("{message}; skipped");
            Ok(())
        }
        UnknownTargetPolicy::Reject => Err(QueryError::Validation(message)),
    }
}

/// An operator with its operand already prepared for per-row testing.
enum Matcher<'a> {
    Eq(&'a str),
    Ne(&'a str),
    /// Numeric comparison; `None` when the operand is not a number, in which
    /// case no row matches.
    Compare(FilterOp, Option<f64>),
    Contains(String),
    In(HashSet<&'a str>),
}

impl<'a> Matcher<'a> {
    fn new(op: FilterOp, operand: &'a str) -> Self {
        match op {
            FilterOp::Eq => Matcher::Eq(operand),
            FilterOp::Ne => Matcher::Ne(operand),
            FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte => {
                let rhs = operand.trim().parse::<f64>().ok().filter(|v| !v.is_nan());
                Matcher::Compare(op, rhs)
            }
            FilterOp::Contains => Matcher::Contains(operand.to_lowercase()),
            FilterOp::In => Matcher::In(operand.split('|').collect()),
        }
    }

    fn matches(&self, column: &Column, value: &Value) -> bool {
        match self {
            Matcher::Eq(expected) => value.to_text(column.dtype).as_deref() == Some(*expected),
            Matcher::Ne(expected) => value.to_text(column.dtype).as_deref() != Some(*expected),
            Matcher::Compare(op, rhs) => {
                let (Some(lhs), Some(rhs)) = (value.as_f64(), *rhs) else {
                    return false;
                };
                match op {
                    FilterOp::Gt => lhs > rhs,
                    FilterOp::Gte => lhs >= rhs,
                    FilterOp::Lt => lhs < rhs,
                    FilterOp::Lte => lhs <= rhs,
                    _ => false,
                }
            }
            Matcher::Contains(needle) => value
                .to_text(column.dtype)
                .is_some_and(|s| s.to_lowercase().contains(needle.as_str())),
            Matcher::In(set) => value
                .to_text(column.dtype)
                .is_some_and(|s| set.contains(s.as_str())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load_csv;

    fn table() -> Table {
        load_csv(
            b"date,amount,country,city\n\
              2024-01-01,10,CO,Bogota\n\
              2024-01-02,5,PE,Lima\n\
              2024-01-03,30,CO,\n\
              2024-01-04,x,AR,Cordoba\n",
            None,
        )
        .unwrap()
    }

    fn countries(t: &Table) -> Vec<String> {
        t.column("country")
            .unwrap()
            .values
            .iter()
            .map(|v| v.to_string())
            .collect()
    }

    #[test]
    fn parse_rejoins_operand_commas() {
        let p = Predicate::parse(" name , eq , Smith, John ").unwrap();
        assert_eq!(p, Predicate::new("name", "eq", "Smith,John"));
        assert!(Predicate::parse("a,eq").is_none());
    }

    #[test]
    fn eq_and_ne() {
        let t = table();
        let eq = apply_filters(&t, &[Predicate::new("country", "eq", "CO")]).unwrap();
        assert_eq!(countries(&eq), ["CO", "CO"]);
        let ne = apply_filters(&t, &[Predicate::new("country", "ne", "CO")]).unwrap();
        assert_eq!(countries(&ne), ["PE", "AR"]);
        let neq = apply_filters(&t, &[Predicate::new("country", "neq", "CO")]).unwrap();
        assert_eq!(neq, ne);
    }

    #[test]
    fn numeric_comparisons_skip_non_numeric_cells() {
        let t = table();
        // `amount` is text because of the "x" cell; coercion still applies.
        let gt = apply_filters(&t, &[Predicate::new("amount", "gt", "5")]).unwrap();
        assert_eq!(countries(&gt), ["CO", "CO"]);
        let lte = apply_filters(&t, &[Predicate::new("amount", "lte", "10")]).unwrap();
        assert_eq!(countries(&lte), ["CO", "PE"]);
        let bad = apply_filters(&t, &[Predicate::new("amount", "gte", "abc")]).unwrap();
        assert_eq!(bad.num_rows(), 0);
    }

    #[test]
    fn contains_is_case_insensitive_and_ignores_missing() {
        let t = table();
        let c = apply_filters(&t, &[Predicate::new("city", "contains", "O")]).unwrap();
        assert_eq!(countries(&c), ["CO", "AR"]);
    }

    #[test]
    fn in_splits_on_pipe() {
        let t = table();
        let r = apply_filters(&t, &[Predicate::new("country", "in", "PE|AR")]).unwrap();
        assert_eq!(countries(&r), ["PE", "AR"]);
    }

    #[test]
    fn eq_rows_are_a_subset_of_in_rows() {
        let t = table();
        let eq = apply_filters(&t, &[Predicate::new("country", "eq", "CO")]).unwrap();
        let within = apply_filters(&t, &[Predicate::new("country", "in", "CO|PE")]).unwrap();
        let in_rows = within.records();
        for rec in eq.records() {
            assert!(in_rows.contains(&rec));
        }
    }

    #[test]
    fn predicates_are_anded_in_order() {
        let t = table();
        let r = apply_filters(
            &t,
            &[
                Predicate::new("country", "eq", "CO"),
                Predicate::new("amount", "gt", "10"),
            ],
        )
        .unwrap();
        assert_eq!(r.num_rows(), 1);
        assert_eq!(r.record(0)["amount"], "30");
    }

    #[test]
    fn integer_columns_compare_as_rendered() {
        let t = load_csv(b"n\n10\n20\n", None).unwrap();
        let r = apply_filters(&t, &[Predicate::new("n", "eq", "10")]).unwrap();
        assert_eq!(r.num_rows(), 1);
    }

    #[test]
    fn unknown_targets_are_skipped_by_default() {
        let t = table();
        let r = apply_filters(
            &t,
            &[
                Predicate::new("nope", "eq", "1"),
                Predicate::new("country", "like", "CO"),
            ],
        )
        .unwrap();
        assert_eq!(r, t);
    }

    #[test]
    fn unknown_targets_can_be_rejected() {
        let t = table();
        let err = apply_filters_with(
            &t,
            &[Predicate::new("country", "like", "CO")],
            UnknownTargetPolicy::Reject,
        )
        .unwrap_err();
        assert_eq!(err, QueryError::Validation("Invalid op: like".into()));
    }
}
