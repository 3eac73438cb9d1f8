//! Reviewer decisions file: one JSON object per line,
//! `{"id": "...", "decision": "approve" | "reject", ...edits}`.
//!
//! Edits use the field names of [`ReviewEdits`] and only matter for
//! approvals.

use anyhow::Context as _;
use curate_core::record::ReviewEdits;
use curate_queue::{Error as QueueError, ReviewEngine};
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
  Approve,
  Reject,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Decision {
  pub id:       String,
  pub decision: Verdict,
  #[serde(flatten)]
  pub edits:    ReviewEdits,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecisionReport {
  pub approved: usize,
  pub rejected: usize,
  /// Decisions naming ids that were not in the pool.
  pub missing:  usize,
  /// Approvals refused because the record was not awaiting review.
  pub refused:  usize,
}

/// Parse a decisions file. Blank lines are ignored; any malformed line is an
/// error naming its line number.
pub fn parse(input: &str) -> anyhow::Result<Vec<Decision>> {
  input
    .lines()
    .enumerate()
    .filter(|(_, line)| !line.trim().is_empty())
    .map(|(index, line)| {
      serde_json::from_str(line)
        .with_context(|| format!("invalid decision on line {}", index + 1))
    })
    .collect()
}

/// Apply `decisions` in order.
pub fn apply(engine: &ReviewEngine, decisions: Vec<Decision>) -> DecisionReport {
  let mut report = DecisionReport::default();

  for Decision {
    id,
    decision,
    edits,
  } in decisions
  {
    match decision {
      Verdict::Reject => {
        if engine.reject(&id) {
          report.rejected += 1;
        } else {
          report.missing += 1;
        }
      }
      Verdict::Approve => match approve(engine, &id, edits) {
        Ok(true) => report.approved += 1,
        Ok(false) => report.missing += 1,
        Err(e) => {
          warn!(record = %id, error = %e, "approval refused");
          report.refused += 1;
        }
      },
    }
  }

  info!(
    approved = report.approved,
    rejected = report.rejected,
    missing = report.missing,
    refused = report.refused,
    "applied reviewer decisions"
  );
  report
}

fn approve(engine: &ReviewEngine, id: &str, edits: ReviewEdits) -> Result<bool, QueueError> {
  if !edits.is_empty() {
    match engine.edit(id, edits) {
      Ok(_) => {}
      Err(QueueError::RecordNotFound(_)) => return Ok(false),
      Err(e) => return Err(e),
    }
  }
  Ok(engine.approve_id(id)?.is_some())
}
