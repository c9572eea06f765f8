/// Data layer: record types, parsing, spectral reduction and statistics.
///
/// Architecture:
/// ```text
///   raw .MIS text
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  rows → Batch (Vec<Measurement>, 32×32 Spectrogram each)
///   └──────────┘
///        │
///        ├───────────────────────┐
///        ▼                       ▼
///   ┌───────────┐          ┌──────────┐
///   │ aggregate │          │  filter  │  z-score on particle counts
///   └───────────┘          └──────────┘
///   marginals, VMD,              │
///   mean diameter ───────────┐   ▼
///                          ┌───────────┐
///                          │  summary  │  mean / std per metric
///                          └───────────┘
/// ```

pub mod aggregate;
pub mod filter;
pub mod loader;
pub mod model;
pub mod stats;
pub mod summary;
