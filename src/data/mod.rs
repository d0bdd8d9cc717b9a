/// Data layer: core types, loading, querying and extraction.
///
/// Architecture:
/// ```text
///   SQL string            .csv / .json / .parquet
///        │                        │
///        ▼                        ▼
///   ┌──────────┐            ┌──────────┐
///   │  query    │  validate │  loader   │  parse file → ResultSet
///   └──────────┘  + remote  └──────────┘
///        │                        │
///        └──────────┬─────────────┘
///                   ▼
///          ┌─────────────────┐
///          │ TabularDataset   │  name → typed numeric column
///          └─────────────────┘
///                   │
///                   ▼
///          ┌─────────────────┐
///          │ extract          │  ids / coords / redshifts / spectral records
///          └─────────────────┘
/// ```

pub mod extract;
pub mod loader;
pub mod model;
pub mod query;
