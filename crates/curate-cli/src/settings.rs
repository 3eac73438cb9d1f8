//! Layered runtime settings: an optional TOML file overlaid by `CURATE_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use curate_queue::DEFAULT_CHUNK_SIZE;
use serde::Deserialize;

/// Runtime configuration, deserialised from `curate.toml` and the
/// environment.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  #[serde(default = "default_chunk_size")]
  pub chunk_size: usize,
  /// Codex JSON file. The built-in codex is used when unset.
  #[serde(default)]
  pub codex_path: Option<PathBuf>,
  #[serde(default)]
  pub annotator:  AnnotatorSettings,
}

/// How to launch the external annotator process.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnnotatorSettings {
  #[serde(default)]
  pub command:      String,
  #[serde(default)]
  pub args:         Vec<String>,
  /// Per-batch limit; no limit when unset.
  #[serde(default)]
  pub timeout_secs: Option<u64>,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      chunk_size: DEFAULT_CHUNK_SIZE,
      codex_path: None,
      annotator:  AnnotatorSettings::default(),
    }
  }
}

fn default_chunk_size() -> usize { DEFAULT_CHUNK_SIZE }

impl Settings {
  /// Read `path` (if it exists) and `CURATE_*` variables, e.g.
  /// `CURATE_ANNOTATOR__COMMAND`.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("CURATE")
          .prefix_separator("_")
          .separator("__")
          .list_separator(" ")
          .with_list_parse_key("annotator.args")
          .try_parsing(true),
      )
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise Settings")
  }
}
