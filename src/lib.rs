//! dexflow - batch analysis of token launch records
//!
//! A single-pass pipeline over a SQLite datastore of detected token
//! launches:
//!
//! ```text
//! SQLite -> db (raw rows) -> preprocess (typed records + flat price series)
//!     -> summary (per-token aggregates) -> target (IsWorthIt label)
//!     -> filter (configured comparators) -> report (PDF charts + EDA)
//! ```
//!
//! Everything is synchronous and runs to completion or fails; each stage
//! consumes the previous stage's output by value. The `model` module is an
//! offline companion that trains a classifier on early-lifetime features.


pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod model;
pub mod pipeline;
pub mod preprocess;
pub mod record;
pub mod report;
pub mod summary;
pub mod target;

pub use error::PipelineError;
