//! Review records (the queue's working state) and approved records (the
//! export-ready projection).

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
  codex::{CLEAVAGE_ORDER, LabelFamily, NEUTRAL_EMOTION},
  lifecycle::Status,
  score,
};

/// Label id → score, in the order the labels were supplied (annotator
/// response or reviewer edit). This is the iteration order used wherever a
/// map is flattened into a sequence.
pub type LabelScores = IndexMap<String, f64>;

/// Label id → score rendered as a fixed-precision decimal string.
pub type FormattedScores = IndexMap<String, String>;

// ─── Stance ──────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum StanceLabel {
  Favor,
  Against,
  #[default]
  Neutral,
}

// ─── Label issues ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
  /// The label id is not defined in the codex for its family.
  UnknownLabel,
  /// The score is non-finite or outside `[0.0, 1.0]`.
  ScoreOutOfRange,
}

/// A suggested label that was kept out of the reviewed fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelIssue {
  pub family: LabelFamily,
  pub label:  String,
  pub score:  f64,
  pub kind:   IssueKind,
}

// ─── ReviewRecord ────────────────────────────────────────────────────────────

/// One text sample under review.
///
/// `suggested_*` are written exactly once, by the annotation merge, and never
/// touched again. `reviewed_*` start as a seeded copy of the suggestions and
/// are what a human edits and what approval projects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
  pub id:                     String,
  /// The id supplied by the raw input, when it had one.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_id:              Option<String>,
  pub text:                   String,
  pub ingested_at:            DateTime<Utc>,

  #[serde(default)]
  pub suggested_cleavages:    LabelScores,
  #[serde(default)]
  pub suggested_tactics:      LabelScores,
  #[serde(default)]
  pub suggested_emotions:     LabelScores,

  #[serde(default)]
  pub reviewed_cleavages:     LabelScores,
  #[serde(default)]
  pub reviewed_tactics:       FormattedScores,
  pub reviewed_emotion:       String,
  #[serde(default)]
  pub reviewed_stance_label:  StanceLabel,
  #[serde(default)]
  pub reviewed_stance_target: String,

  pub status:                 Status,
  #[serde(
    rename = "errorMessage",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub error_message:          Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub label_issues:           Vec<LabelIssue>,
}

impl ReviewRecord {
  /// A freshly ingested record: status `raw`, empty maps, neutral defaults.
  pub fn raw(
    id: impl Into<String>,
    source_id: Option<String>,
    text: impl Into<String>,
  ) -> Self {
    Self {
      id: id.into(),
      source_id,
      text: text.into(),
      ingested_at: Utc::now(),
      suggested_cleavages: LabelScores::new(),
      suggested_tactics: LabelScores::new(),
      suggested_emotions: LabelScores::new(),
      reviewed_cleavages: LabelScores::new(),
      reviewed_tactics: FormattedScores::new(),
      reviewed_emotion: NEUTRAL_EMOTION.to_owned(),
      reviewed_stance_label: StanceLabel::Neutral,
      reviewed_stance_target: String::new(),
      status: Status::Raw,
      error_message: None,
      label_issues: Vec::new(),
    }
  }

  /// Apply human corrections. Map fields replace the reviewed map wholesale.
  pub fn apply_edits(&mut self, edits: ReviewEdits) {
    if let Some(cleavages) = edits.cleavages {
      self.reviewed_cleavages = cleavages;
    }
    if let Some(tactics) = edits.tactics {
      self.reviewed_tactics = tactics
        .into_iter()
        .map(|(label, score)| (label, score::format_one_decimal(score)))
        .collect();
    }
    if let Some(emotion) = edits.emotion {
      self.reviewed_emotion = emotion;
    }
    if let Some(label) = edits.stance_label {
      self.reviewed_stance_label = label;
    }
    if let Some(target) = edits.stance_target {
      self.reviewed_stance_target = target;
    }
  }
}

// ─── ReviewEdits ─────────────────────────────────────────────────────────────

/// Human corrections to a pending record. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewEdits {
  #[serde(default)]
  pub cleavages:     Option<LabelScores>,
  /// Numeric scores; stored formatted to one decimal.
  #[serde(default)]
  pub tactics:       Option<LabelScores>,
  #[serde(default)]
  pub emotion:       Option<String>,
  #[serde(default)]
  pub stance_label:  Option<StanceLabel>,
  #[serde(default)]
  pub stance_target: Option<String>,
}

impl ReviewEdits {
  pub fn is_empty(&self) -> bool { *self == Self::default() }
}

// ─── ApprovedRecord ──────────────────────────────────────────────────────────

/// The export row consumed by downstream fine-tuning.
///
/// Field order here is the serialised field order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovedRecord {
  pub id:            String,
  pub text:          String,
  /// One score per [`CLEAVAGE_ORDER`] entry, in that order.
  pub cleavages:     Vec<f64>,
  pub tactics:       Vec<String>,
  pub emotion_fuel:  String,
  pub stance_label:  StanceLabel,
  pub stance_target: String,
}

impl ApprovedRecord {
  /// Project a record's reviewed fields into the export schema.
  ///
  /// Cleavages absent from `reviewed_cleavages` (or not finite) become `0.0`.
  pub fn from_review(record: &ReviewRecord) -> Self {
    let cleavages = CLEAVAGE_ORDER
      .iter()
      .map(|label| {
        record
          .reviewed_cleavages
          .get(*label)
          .copied()
          .filter(|v| v.is_finite())
          .unwrap_or(0.0)
      })
      .collect();

    Self {
      id: record.id.clone(),
      text: record.text.clone(),
      cleavages,
      tactics: record.reviewed_tactics.keys().cloned().collect(),
      emotion_fuel: record.reviewed_emotion.clone(),
      stance_label: record.reviewed_stance_label,
      stance_target: record.reviewed_stance_target.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn raw_record_defaults() {
    let r = ReviewRecord::raw("a", None, "tekst");
    assert_eq!(r.status, Status::Raw);
    assert_eq!(r.reviewed_emotion, "NEUTRAL");
    assert_eq!(r.reviewed_stance_label, StanceLabel::Neutral);
    assert!(r.reviewed_stance_target.is_empty());
    assert!(r.suggested_cleavages.is_empty());
    assert!(r.reviewed_tactics.is_empty());
    assert!(r.error_message.is_none());
  }

  #[test]
  fn projection_fills_missing_cleavages_with_zero() {
    let mut r = ReviewRecord::raw("a", None, "t");
    r.reviewed_cleavages.insert("cleavage_sovereigntist".into(), 0.8);
    r.reviewed_cleavages.insert("cleavage_trauma".into(), f64::NAN);
    r.reviewed_cleavages.insert("cleavage_not_in_schema".into(), 0.5);

    let approved = ApprovedRecord::from_review(&r);
    assert_eq!(approved.cleavages, vec![0.0, 0.0, 0.8, 0.0, 0.0]);
  }

  #[test]
  fn projection_lists_tactics_in_supplied_order() {
    let mut r = ReviewRecord::raw("a", None, "t");
    r.reviewed_tactics.insert("whataboutism".into(), "0.9".into());
    r.reviewed_tactics.insert("appeal_to_fear".into(), "0.4".into());
    r.reviewed_emotion = "anger".into();
    r.reviewed_stance_label = StanceLabel::Against;
    r.reviewed_stance_target = "UE".into();

    let approved = ApprovedRecord::from_review(&r);
    assert_eq!(approved.tactics, vec!["whataboutism", "appeal_to_fear"]);
    assert_eq!(approved.emotion_fuel, "anger");
    assert_eq!(approved.stance_label, StanceLabel::Against);
    assert_eq!(approved.stance_target, "UE");
  }

  #[test]
  fn approved_record_field_order_is_fixed() {
    let r = ReviewRecord::raw("id-1", None, "t");
    let json = serde_json::to_string(&ApprovedRecord::from_review(&r)).unwrap();
    assert_eq!(
      json,
      r#"{"id":"id-1","text":"t","cleavages":[0.0,0.0,0.0,0.0,0.0],"tactics":[],"emotion_fuel":"NEUTRAL","stance_label":"NEUTRAL","stance_target":""}"#
    );
  }

  #[test]
  fn edits_replace_reviewed_fields() {
    let mut r = ReviewRecord::raw("a", None, "t");
    r.reviewed_tactics.insert("old".into(), "0.5".into());

    r.apply_edits(ReviewEdits {
      tactics: Some(LabelScores::from([("new".to_owned(), 0.72)])),
      stance_label: Some(StanceLabel::Favor),
      ..ReviewEdits::default()
    });

    assert_eq!(r.reviewed_tactics.len(), 1);
    assert_eq!(r.reviewed_tactics["new"], "0.7");
    assert_eq!(r.reviewed_stance_label, StanceLabel::Favor);
    assert_eq!(r.reviewed_emotion, "NEUTRAL");
  }

  #[test]
  fn error_message_uses_camel_case_key() {
    let mut r = ReviewRecord::raw("a", None, "t");
    r.status = Status::Error;
    r.error_message = Some("boom".into());
    let value = serde_json::to_value(&r).unwrap();
    assert_eq!(value["errorMessage"], "boom");
    assert_eq!(value["status"], "error");
  }
}
