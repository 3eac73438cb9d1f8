//! Review status and the transitions between statuses.
//!
//! ```text
//! raw ──▶ annotating ──▶ pending_review ──▶ reviewed   (approved, removed)
//!                   └──▶ error
//! any live status ──────────────────────▶ rejected   (discarded, removed)
//! ```
//!
//! `reviewed` and `rejected` are never observed inside the pending pool: the
//! record leaves the pool in the same step that assigns them. `error` is
//! terminal except for rejection.

use serde::{Deserialize, Serialize};

// ─── Status ──────────────────────────────────────────────────────────────────

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
  strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Status {
  Raw,
  Annotating,
  PendingReview,
  Reviewed,
  Rejected,
  Error,
}

impl Status {
  /// Whether a record in `self` may move to `next`.
  pub fn can_become(self, next: Status) -> bool {
    match (self, next) {
      (Status::Reviewed | Status::Rejected, _) => false,
      (_, Status::Rejected) => true,
      (Status::Raw, Status::Annotating)
      | (Status::Annotating, Status::PendingReview)
      | (Status::Annotating, Status::Error)
      | (Status::PendingReview, Status::Reviewed) => true,
      _ => false,
    }
  }
}

// ─── Counts ──────────────────────────────────────────────────────────────────

/// Queue summary, one counter per live status plus the approved total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
  pub raw:            usize,
  pub annotating:     usize,
  pub pending_review: usize,
  pub error:          usize,
  pub approved:       usize,
}

impl QueueCounts {
  /// Records still in the pending pool, whatever their status.
  pub fn in_queue(&self) -> usize {
    self.raw + self.annotating + self.pending_review + self.error
  }

  fn bump(&mut self, status: Status) {
    match status {
      Status::Raw => self.raw += 1,
      Status::Annotating => self.annotating += 1,
      Status::PendingReview => self.pending_review += 1,
      Status::Error => self.error += 1,
      Status::Reviewed | Status::Rejected => {}
    }
  }

  /// Tally a sequence of pool statuses.
  pub fn tally(statuses: impl IntoIterator<Item = Status>, approved: usize) -> Self {
    let mut counts = Self {
      approved,
      ..Self::default()
    };
    for status in statuses {
      counts.bump(status);
    }
    counts
  }
}
