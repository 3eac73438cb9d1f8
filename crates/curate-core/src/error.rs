//! Error types for `curate-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(
    "codex is missing cleavage labels required by export schema v{version}: \
     {missing:?}"
  )]
  CodexContract {
    version: u32,
    missing: Vec<String>,
  },

  #[error("duplicate {family} label in codex: {label:?}")]
  DuplicateLabel { family: String, label: String },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
