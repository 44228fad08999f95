/// Data layer: the table model and every query stage.
///
/// Architecture:
/// ```text
///   CSV bytes
///       │
///       ▼
///   ┌──────────┐
///   │  loader   │  parse → Table (column types inferred)
///   └──────────┘
///       │
///       ├──────────────► correlation   Pearson matrix
///       ├──────────────► trend         date buckets → sum / mean / count
///       ├──────────────► summary       count / mean / std
///       ▼
///   ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐
///   │  filter   │ → │  select   │ → │   sort    │ → │ paginate  │
///   └──────────┘   └──────────┘   └──────────┘   └──────────┘
/// ```
///
/// Every stage borrows its input and returns a new value.

pub mod correlation;
pub mod filter;
pub mod loader;
pub mod model;
pub mod paginate;
pub mod policy;
pub mod select;
pub mod sort;
pub mod summary;
pub mod trend;
