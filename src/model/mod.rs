//! Offline classifier workflow
//!
//! Engineers early-lifetime features per token, fits a random forest on the
//! IsWorthIt label, and ranks features by permutation importance. Runs as
//! the separate `train` binary; the reporting pipeline never depends on it.

pub mod features;
pub mod forest;

pub use features::{build_dataset, Dataset};
pub use forest::{ForestParams, TrainReport, TrainedForest};
