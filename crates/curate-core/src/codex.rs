//! The Codex: the label taxonomy every annotation is scored against.
//!
//! The taxonomy itself is configuration data (a JSON file shared with the
//! generator side). The one part that is *not* configurable is
//! [`CLEAVAGE_ORDER`]: exported records carry cleavage scores as a positional
//! array, so that ordering is the schema contract with downstream training
//! code.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Schema contract ─────────────────────────────────────────────────────────

/// Positional order of the `cleavages` array in exported records.
///
/// Reordering, inserting, or removing an entry breaks every existing training
/// pipeline; bump [`CLEAVAGE_SCHEMA_VERSION`] if this ever changes.
pub const CLEAVAGE_ORDER: [&str; 5] = [
  "cleavage_post_peasant",
  "cleavage_economic_anxiety",
  "cleavage_sovereigntist",
  "cleavage_generational",
  "cleavage_trauma",
];

/// Version of the [`CLEAVAGE_ORDER`] contract.
pub const CLEAVAGE_SCHEMA_VERSION: u32 = 1;

/// Emotion id used when no emotion was suggested. Always accepted, even when
/// the codex defines its own emotion list.
pub const NEUTRAL_EMOTION: &str = "NEUTRAL";

// ─── Families ────────────────────────────────────────────────────────────────

/// The three scored label families.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LabelFamily {
  Cleavage,
  Tactic,
  Emotion,
}

// ─── Taxonomy ────────────────────────────────────────────────────────────────

/// One label definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodexItem {
  pub id:          String,
  #[serde(default)]
  pub name:        String,
  #[serde(default)]
  pub description: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub examples:    Vec<String>,
}

impl CodexItem {
  fn bare(id: &str, name: &str) -> Self {
    Self {
      id:          id.to_owned(),
      name:        name.to_owned(),
      description: String::new(),
      examples:    Vec::new(),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodexLabels {
  #[serde(default)]
  pub cleavages: Vec<CodexItem>,
  #[serde(default)]
  pub tactics:   Vec<CodexItem>,
  #[serde(default)]
  pub emotions:  Vec<CodexItem>,
}

/// The full taxonomy, in the same shape as the on-disk classification file:
/// `{"labels": {"cleavages": [...], "tactics": [...], "emotions": [...]}}`.
///
/// A family with no items accepts any label id; this is what
/// [`Codex::builtin`] does for tactics and emotions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Codex {
  #[serde(default)]
  pub labels: CodexLabels,
}

impl Codex {
  /// The cleavages from [`CLEAVAGE_ORDER`] and open tactic/emotion families.
  pub fn builtin() -> Self {
    let names = [
      "Post-peasant",
      "Economic anxiety",
      "Sovereigntist",
      "Generational",
      "Trauma",
    ];
    Self {
      labels: CodexLabels {
        cleavages: CLEAVAGE_ORDER
          .iter()
          .zip(names)
          .map(|(id, name)| CodexItem::bare(id, name))
          .collect(),
        tactics:   Vec::new(),
        emotions:  Vec::new(),
      },
    }
  }

  /// Parse and validate a codex file.
  ///
  /// A non-empty cleavage list must contain every [`CLEAVAGE_ORDER`] label,
  /// and no family may define the same id twice.
  pub fn from_json(input: &str) -> Result<Self> {
    let codex: Codex = serde_json::from_str(input)?;
    codex.validate()?;
    tracing::debug!(
      cleavages = codex.labels.cleavages.len(),
      tactics = codex.labels.tactics.len(),
      emotions = codex.labels.emotions.len(),
      "loaded codex"
    );
    Ok(codex)
  }

  fn validate(&self) -> Result<()> {
    for family in [LabelFamily::Cleavage, LabelFamily::Tactic, LabelFamily::Emotion]
    {
      let mut seen = HashSet::new();
      for item in self.family(family) {
        if !seen.insert(item.id.as_str()) {
          return Err(Error::DuplicateLabel {
            family: family.to_string(),
            label:  item.id.clone(),
          });
        }
      }
    }

    let cleavages = self.family(LabelFamily::Cleavage);
    if cleavages.is_empty() {
      return Ok(());
    }
    let missing: Vec<String> = CLEAVAGE_ORDER
      .iter()
      .filter(|id| !cleavages.iter().any(|c| c.id == **id))
      .map(|id| (*id).to_owned())
      .collect();
    if !missing.is_empty() {
      return Err(Error::CodexContract {
        version: CLEAVAGE_SCHEMA_VERSION,
        missing,
      });
    }
    Ok(())
  }

  pub fn family(&self, family: LabelFamily) -> &[CodexItem] {
    match family {
      LabelFamily::Cleavage => &self.labels.cleavages,
      LabelFamily::Tactic => &self.labels.tactics,
      LabelFamily::Emotion => &self.labels.emotions,
    }
  }

  /// Whether `label` is a valid id for `family`.
  pub fn accepts(&self, family: LabelFamily, label: &str) -> bool {
    if family == LabelFamily::Emotion && label == NEUTRAL_EMOTION {
      return true;
    }
    let items = self.family(family);
    items.is_empty() || items.iter().any(|item| item.id == label)
  }
}
