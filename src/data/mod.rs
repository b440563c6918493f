/// Data layer: metadata, samples, corpora, loading.
///
/// Architecture:
/// ```text
///  .parquet / .json / .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → samples (payload + Meta)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  corpus   │  Vec<Arc<Sample>>, frequency index
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  Criteria → matching sub-corpus (shared samples)
///   └──────────┘
/// ```

pub mod corpus;
pub mod filter;
pub mod loader;
pub mod model;
pub mod sample;
