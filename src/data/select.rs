use crate::error::QueryResult;

use super::model::Table;

/// Restrict `table` to `columns`, in exactly that order.
///
/// An absent or empty list returns the table unchanged. Otherwise every
/// requested name must exist; the error lists all that do not.
pub fn select_columns<S: AsRef<str>>(table: &Table, columns: Option<&[S]>) -> QueryResult<Table> {
    let Some(columns) = columns.filter(|c| !c.is_empty()) else {
        return Ok(table.clone());
    };
    table.require_columns(columns)?;
    Ok(table.project(columns))
}
