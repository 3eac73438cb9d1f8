//! Error type for `curate-queue`.

use curate_core::lifecycle::Status;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] curate_core::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("record not found: {0}")]
  RecordNotFound(String),

  /// The record exists but its status does not allow the requested move.
  #[error("record {id} is {from}; it cannot become {to}")]
  InvalidTransition {
    id:   String,
    from: Status,
    to:   Status,
  },

  #[error("an annotation run is already in progress")]
  AnnotationInProgress,

  #[error("chunk size must be at least 1")]
  InvalidChunkSize,

  #[error("export line {line}: {source}")]
  ExportLine {
    line:   usize,
    #[source]
    source: serde_json::Error,
  },

  #[error("export line {line}: expected {expected} cleavage scores, found {found}")]
  SchemaMismatch {
    line:     usize,
    expected: usize,
    found:    usize,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
