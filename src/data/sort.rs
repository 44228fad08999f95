use std::cmp::Ordering;

use crate::error::{QueryError, QueryResult};

use super::model::{Column, Table};
use super::policy::{UnknownTargetPolicy, UNKNOWN_TARGETS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// One `(column, direction)` pair of a sort specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub direction: Direction,
}

/// Parse `a,-b,c`: comma-separated names, `-` prefix for descending. Blank
/// parts are ignored.
pub fn parse_sort(expr: &str) -> Vec<SortKey> {
    expr.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| {
            let (column, direction) = match part.strip_prefix('-') {
                Some(rest) => (rest.trim(), Direction::Descending),
                None => (part, Direction::Ascending),
            };
            (!column.is_empty()).then(|| SortKey {
                column: column.to_string(),
                direction,
            })
        })
        .collect()
}

/// Sort under the default [`UNKNOWN_TARGETS`] policy.
pub fn apply_sort(table: &Table, expr: Option<&str>) -> QueryResult<Table> {
    apply_sort_with(table, expr, UNKNOWN_TARGETS)
}

/// Stable multi-key sort. Rows with equal keys keep their relative order and
/// missing cells go last in either direction. Keys naming unknown columns are
/// dropped (or rejected, per `policy`); with no valid key left the table is
/// returned unchanged.
pub fn apply_sort_with(
    table: &Table,
    expr: Option<&str>,
    policy: UnknownTargetPolicy,
) -> QueryResult<Table> {
    let Some(expr) = expr else {
        return Ok(table.clone());
    };

    let mut keys: Vec<(&Column, Direction)> = Vec::new();
    for key in parse_sort(expr) {
        match table.column(&key.column) {
            Some(column) => keys.push((column, key.direction)),
            None if policy == UnknownTargetPolicy::Reject => {
                return Err(QueryError::Validation(format!(
                    "Unknown sort column: {}",
                    key.column
                )));
            }
            None => log::warn!("Unknown sort column: {}; skipped", key.column),
        }
    }
    if keys.is_empty() {
        return Ok(table.clone());
    }

    let mut rows: Vec<usize> = (0..table.num_rows()).collect();
    rows.sort_by(|&a, &b| {
        keys.iter()
            .map(|(column, direction)| compare_cells(column, a, b, *direction))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    });
    log::debug!("sorted {} rows on {} key(s)", rows.len(), keys.len());

    Ok(table.take(&rows))
}

fn compare_cells(column: &Column, a: usize, b: usize, direction: Direction) -> Ordering {
    let (va, vb) = (&column.values[a], &column.values[b]);
    match (va.is_missing(), vb.is_missing()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ord = va.cmp_present(vb);
            match direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            }
        }
    }
}
