/// Data layer: core types, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .xlsx / .csv / .parquet
///        │
///        ▼
///   ┌──────────┐     ┌──────────┐
///   │  loader   │ ──▶ │  cache   │  (path, sheet) → Arc<Dataset>
///   └──────────┘     └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ Dataset   │  Vec<Record>, column order
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  registry of column predicates → surviving indices
///   └──────────┘
///        │
///        ├──▶ aggregate   totals, top-N, time counts (via period), distribution
///        └──▶ projection  visible columns → table / CSV
/// ```

pub mod aggregate;
pub mod cache;
pub mod error;
pub mod filter;
pub mod loader;
pub mod model;
pub mod period;
pub mod projection;
