use serde::ser::{Serialize, SerializeMap, Serializer};

use super::model::Table;

/// Descriptive statistics of one numeric column.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ColumnSummary {
    pub count: f64,
    pub mean: Option<f64>,
    /// Sample standard deviation (n - 1 denominator).
    pub std: Option<f64>,
}

/// Per-column statistics in table order. Serializes as
/// `{column: {count, mean, std}}`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Summary {
    columns: Vec<(String, ColumnSummary)>,
}

impl Summary {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnSummary)> {
        self.columns.iter().map(|(name, stats)| (name.as_str(), stats))
    }

    pub fn get(&self, name: &str) -> Option<&ColumnSummary> {
        self.iter().find(|(n, _)| *n == name).map(|(_, stats)| stats)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Serialize for Summary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, stats) in &self.columns {
            map.serialize_entry(name, stats)?;
        }
        map.end()
    }
}

/// `count`, `mean` and `std` for every numeric column, in table order.
/// Text columns are left out.
pub fn summarize(table: &Table) -> Summary {
    let columns = table
        .columns()
        .iter()
        .filter(|c| c.is_numeric())
        .map(|c| {
            let present: Vec<f64> = c.numbers().into_iter().flatten().collect();
            (c.name.clone(), describe(&present))
        })
        .collect();
    Summary { columns }
}

fn describe(values: &[f64]) -> ColumnSummary {
    let count = values.len();
    if count == 0 {
        return ColumnSummary {
            count: 0.0,
            mean: None,
            std: None,
        };
    }
    let mean = values.iter().sum::<f64>() / count as f64;
    let std = (count > 1).then(|| {
        let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (count - 1) as f64).sqrt()
    });
    ColumnSummary {
        count: count as f64,
        mean: Some(mean),
        std,
    }
}
