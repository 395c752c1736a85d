//! Crate-wide error taxonomy
//!
//! Every variant is fatal to the run: the pipeline aborts the remaining
//! stages and the binary exits non-zero. Messages carry the failing stage
//! and the offending attribute or path.

use std::fmt;

#[derive(Debug)]
pub enum PipelineError {
    /// Datastore missing, unreadable, or the launch table is absent
    DataUnavailable(String),
    /// An expected column/attribute is not present in the loaded table
    SchemaMismatch(String),
    /// Malformed parameters file, comparator string, or missing required key
    ConfigParse(String),
    /// Chart or PDF generation failure (including unwritable output path)
    Render(String),
    /// Classifier training or prediction failure
    Model(String),
    Database(rusqlite::Error),
    Io(std::io::Error),
}

impl From<rusqlite::Error> for PipelineError {
    fn from(err: rusqlite::Error) -> Self {
        PipelineError::Database(err)
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io(err)
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::DataUnavailable(msg) => write!(f, "data unavailable: {}", msg),
            PipelineError::SchemaMismatch(msg) => write!(f, "schema mismatch: {}", msg),
            PipelineError::ConfigParse(msg) => write!(f, "config parse error: {}", msg),
            PipelineError::Render(msg) => write!(f, "render error: {}", msg),
            PipelineError::Model(msg) => write!(f, "model error: {}", msg),
            PipelineError::Database(e) => write!(f, "database error: {}", e),
            PipelineError::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Database(e) => Some(e),
            PipelineError::Io(e) => Some(e),
            _ => None,
        }
    }
}
