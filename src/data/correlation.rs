use std::collections::HashSet;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::QueryResult;

use super::model::Table;

// ---------------------------------------------------------------------------
// CorrelationMatrix
// ---------------------------------------------------------------------------

/// Symmetric Pearson correlation matrix over the numeric columns of a table.
/// An undefined coefficient (constant column, too few shared observations) is
/// `None`. Serializes as `{a: {b: coef}}` keeping column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CorrelationMatrix {
    columns: Vec<String>,
    values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Coefficient between `a` and `b`; `None` when either name is not in the
    /// matrix or the coefficient is undefined.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }
}

struct Row<'a> {
    columns: &'a [String],
    values: &'a [Option<f64>],
}

impl Serialize for Row<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in self.columns.iter().zip(self.values) {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl Serialize for CorrelationMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, values) in self.columns.iter().zip(&self.values) {
            let row = Row {
                columns: &self.columns,
                values,
            };
            map.serialize_entry(name, &row)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// Pairwise Pearson correlation.
///
/// With `columns` given, every name must exist (all missing names are
/// reported); the non-numeric ones among them are then left out and repeated
/// names count once. Without it every numeric column takes part. No numeric
/// columns gives an empty matrix.
pub fn compute_correlation<S: AsRef<str>>(
    table: &Table,
    columns: Option<&[S]>,
) -> QueryResult<CorrelationMatrix> {
    let candidates: Vec<&str> = match columns.filter(|c| !c.is_empty()) {
        Some(requested) => {
            table.require_columns(requested)?;
            requested.iter().map(|c| c.as_ref()).collect()
        }
        None => table.column_names(),
    };

    let mut seen = HashSet::new();
    let numeric: Vec<(String, Vec<Option<f64>>)> = candidates
        .into_iter()
        .filter(|name| seen.insert(*name))
        .filter_map(|name| table.column(name))
        .filter(|c| c.is_numeric())
        .map(|c| (c.name.clone(), c.numbers()))
        .collect();

    let n = numeric.len();
    let mut values = vec![vec![None; n]; n];
    for i in 0..n {
        for j in i..n {
            let coef = if i == j {
                pearson(&numeric[i].1, &numeric[i].1).map(|_| 1.0)
            } else {
                pearson(&numeric[i].1, &numeric[j].1)
            };
            values[i][j] = coef;
            values[j][i] = coef;
        }
    }

    log::debug!("correlation over {n} numeric column(s)");
    Ok(CorrelationMatrix {
        columns: numeric.into_iter().map(|(name, _)| name).collect(),
        values,
    })
}

/// Pearson coefficient over the rows where both sides are present. `None`
/// with fewer than two such rows or when either side has zero variance.
fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    // Constant sides are checked exactly; a two-pass mean can leave a tiny
    // non-zero variance behind.
    let (x0, y0) = pairs[0];
    if pairs.iter().all(|(x, _)| *x == x0) || pairs.iter().all(|(_, y)| *y == y0) {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let (dx, dy) = (x - mean_x, y - mean_y);
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }

    let r = cov / (var_x.sqrt() * var_y.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}
