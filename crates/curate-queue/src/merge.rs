//! Seeding a record's reviewed fields from an annotator proposal.
//!
//! Suggestions are copied verbatim. Reviewed fields are seeded only from
//! labels the codex knows with scores in `[0.0, 1.0]`; everything else is
//! recorded as a [`LabelIssue`] on the record.
//!
//! The merge overwrites `reviewed_*` unconditionally, so it must only ever run
//! on a record that is still `annotating`.

use curate_core::{
  annotator::Annotation,
  codex::{Codex, LabelFamily, NEUTRAL_EMOTION},
  lifecycle::Status,
  record::{FormattedScores, IssueKind, LabelIssue, LabelScores, ReviewRecord},
  score,
};
use tracing::warn;

/// Merge `annotation` into `record` and move it to `pending_review`.
pub fn merge_annotation(record: &mut ReviewRecord, annotation: Annotation, codex: &Codex) {
  let mut issues = Vec::new();

  let cleavages = accepted(
    codex,
    LabelFamily::Cleavage,
    &annotation.cleavages,
    &mut issues,
  );
  let tactics = accepted(codex, LabelFamily::Tactic, &annotation.tactics, &mut issues);
  let emotions = accepted(
    codex,
    LabelFamily::Emotion,
    &annotation.emotions,
    &mut issues,
  );

  record.reviewed_cleavages = cleavages;
  record.reviewed_tactics = seed_tactics(&tactics);
  record.reviewed_emotion = top_emotion(&emotions);
  record.reviewed_stance_label = annotation.stance_label;
  record.reviewed_stance_target = annotation.stance_target;

  record.suggested_cleavages = annotation.cleavages;
  record.suggested_tactics = annotation.tactics;
  record.suggested_emotions = annotation.emotions;

  for issue in &issues {
    warn!(
      record = %record.id,
      family = %issue.family,
      label = %issue.label,
      score = issue.score,
      kind = ?issue.kind,
      "suggested label not seeded for review"
    );
  }
  record.label_issues = issues;
  record.error_message = None;
  record.status = Status::PendingReview;
}

/// Tactics above the threshold, formatted to one decimal.
pub fn seed_tactics(tactics: &LabelScores) -> FormattedScores {
  tactics
    .iter()
    .filter(|(_, score)| score::clears_tactic_threshold(**score))
    .map(|(label, score)| (label.clone(), score::format_one_decimal(*score)))
    .collect()
}

/// The highest-scoring emotion; the last label in map order wins a tie.
/// `NEUTRAL` when there are none.
pub fn top_emotion(emotions: &LabelScores) -> String {
  let mut best: Option<(&String, f64)> = None;
  for (label, score) in emotions {
    if best.is_none_or(|(_, top)| *score >= top) {
      best = Some((label, *score));
    }
  }
  best.map_or_else(|| NEUTRAL_EMOTION.to_owned(), |(label, _)| label.clone())
}

fn accepted(
  codex: &Codex,
  family: LabelFamily,
  scores: &LabelScores,
  issues: &mut Vec<LabelIssue>,
) -> LabelScores {
  let mut kept = LabelScores::new();
  for (label, score) in scores {
    let kind = if !codex.accepts(family, label) {
      Some(IssueKind::UnknownLabel)
    } else if !score::is_valid(*score) {
      Some(IssueKind::ScoreOutOfRange)
    } else {
      None
    };
    match kind {
      Some(kind) => issues.push(LabelIssue {
        family,
        label: label.clone(),
        score: *score,
        kind,
      }),
      None => {
        kept.insert(label.clone(), *score);
      }
    }
  }
  kept
}

#[cfg(test)]
mod tests {
  use curate_core::record::StanceLabel;

  use super::*;

  fn scores(pairs: &[(&str, f64)]) -> LabelScores {
    pairs.iter().map(|(k, v)| ((*k).to_owned(), *v)).collect()
  }

  fn annotating(id: &str) -> ReviewRecord {
    let mut r = ReviewRecord::raw(id, None, "tekst");
    r.status = Status::Annotating;
    r
  }

  #[test]
  fn tactics_are_filtered_and_rounded() {
    let seeded = seed_tactics(&scores(&[("a", 0.2), ("b", 0.35), ("c", 0.9)]));
    assert_eq!(seeded.len(), 2);
    assert_eq!(seeded["b"], "0.4");
    assert_eq!(seeded["c"], "0.9");
    assert!(!seeded.contains_key("a"));
  }

  #[test]
  fn tactic_at_threshold_is_dropped() {
    assert!(seed_tactics(&scores(&[("edge", 0.3)])).is_empty());
  }

  #[test]
  fn top_emotion_picks_max() {
    assert_eq!(top_emotion(&scores(&[("joy", 0.2), ("anger", 0.7)])), "anger");
  }

  #[test]
  fn top_emotion_defaults_to_neutral() {
    assert_eq!(top_emotion(&LabelScores::new()), "NEUTRAL");
  }

  #[test]
  fn top_emotion_tie_goes_to_last_label() {
    assert_eq!(top_emotion(&scores(&[("anger", 0.5), ("fear", 0.5)])), "fear");
    assert_eq!(top_emotion(&scores(&[("fear", 0.5), ("anger", 0.5)])), "anger");
  }

  #[test]
  fn top_emotion_ignores_earlier_lower_scores() {
    let emotions = scores(&[("joy", 0.9), ("fear", 0.5), ("anger", 0.5)]);
    assert_eq!(top_emotion(&emotions), "joy");
  }

  #[test]
  fn tactics_keep_supplied_order() {
    let seeded = seed_tactics(&scores(&[("whataboutism", 0.8), ("appeal_to_fear", 0.6)]));
    let labels: Vec<&str> = seeded.keys().map(String::as_str).collect();
    assert_eq!(labels, ["whataboutism", "appeal_to_fear"]);
  }

  #[test]
  fn merge_seeds_reviewed_fields() {
    let mut record = annotating("r1");
    let annotation = Annotation {
      ref_id:        "r1".into(),
      cleavages:     scores(&[("cleavage_trauma", 0.6), ("cleavage_generational", 0.1)]),
      tactics:       scores(&[("whataboutism", 0.81), ("irony", 0.1)]),
      emotions:      scores(&[("anger", 0.7), ("joy", 0.2)]),
      stance_label:  StanceLabel::Against,
      stance_target: "UE".into(),
    };

    merge_annotation(&mut record, annotation.clone(), &Codex::builtin());

    assert_eq!(record.status, Status::PendingReview);
    assert_eq!(record.suggested_cleavages, annotation.cleavages);
    assert_eq!(record.suggested_tactics, annotation.tactics);
    assert_eq!(record.suggested_emotions, annotation.emotions);
    assert_eq!(record.reviewed_cleavages, annotation.cleavages);
    assert_eq!(record.reviewed_tactics.len(), 1);
    assert_eq!(record.reviewed_tactics["whataboutism"], "0.8");
    assert_eq!(record.reviewed_emotion, "anger");
    assert_eq!(record.reviewed_stance_label, StanceLabel::Against);
    assert_eq!(record.reviewed_stance_target, "UE");
    assert!(record.label_issues.is_empty());
  }

  #[test]
  fn merge_is_repeatable_on_untouched_record() {
    let annotation = Annotation {
      tactics: scores(&[("x", 0.55)]),
      ..Annotation::empty("r1")
    };
    let mut first = annotating("r1");
    let mut second = first.clone();
    merge_annotation(&mut first, annotation.clone(), &Codex::builtin());
    merge_annotation(&mut second, annotation, &Codex::builtin());
    assert_eq!(first, second);
  }

  #[test]
  fn unknown_and_out_of_range_labels_are_flagged() {
    let mut record = annotating("r1");
    let annotation = Annotation {
      cleavages: scores(&[
        ("cleavage_trauma", 1.4),
        ("cleavage_made_up", 0.5),
        ("cleavage_sovereigntist", 0.5),
      ]),
      ..Annotation::empty("r1")
    };

    merge_annotation(&mut record, annotation, &Codex::builtin());

    assert_eq!(record.reviewed_cleavages, scores(&[("cleavage_sovereigntist", 0.5)]));
    assert_eq!(record.suggested_cleavages.len(), 3);
    assert_eq!(record.label_issues.len(), 2);
    let made_up = record
      .label_issues
      .iter()
      .find(|i| i.label == "cleavage_made_up")
      .unwrap();
    assert_eq!(made_up.kind, IssueKind::UnknownLabel);
    let trauma = record
      .label_issues
      .iter()
      .find(|i| i.label == "cleavage_trauma")
      .unwrap();
    assert_eq!(trauma.kind, IssueKind::ScoreOutOfRange);
  }

  #[test]
  fn codex_restricts_emotion_choice() {
    let codex = Codex::from_json(r#"{"labels":{"emotions":[{"id":"fear"}]}}"#).unwrap();
    let mut record = annotating("r1");
    let annotation = Annotation {
      emotions: scores(&[("fear", 0.3), ("rage", 0.9)]),
      ..Annotation::empty("r1")
    };
    merge_annotation(&mut record, annotation, &codex);
    assert_eq!(record.reviewed_emotion, "fear");
    assert_eq!(record.label_issues.len(), 1);
  }
}
