//! [`ReviewEngine`]: approval, rejection and human edits.
//!
//! Every operation runs under a single store lock, so a record is removed
//! from the pending pool and (for approvals) appended to the approved pool in
//! one step.

use curate_core::{
  lifecycle::Status,
  record::{ApprovedRecord, ReviewEdits, ReviewRecord},
};
use tracing::{debug, info};

use crate::{Error, Result, ReviewQueue};

pub struct ReviewEngine {
  queue: ReviewQueue,
}

impl ReviewEngine {
  pub fn new(queue: ReviewQueue) -> Self { Self { queue } }

  /// Approve `record` using the caller's (possibly edited) `reviewed_*`
  /// fields. The stored `id` and `text` are authoritative.
  ///
  /// - id not in the pool → `Ok(None)`; nothing is appended.
  /// - stored record not `pending_review` → [`Error::InvalidTransition`].
  pub fn approve(&self, record: &ReviewRecord) -> Result<Option<ApprovedRecord>> {
    self.queue.with_store(|store| {
      let Some(stored) = store.get(&record.id) else {
        debug!(record = %record.id, "approve: record no longer queued");
        return Ok(None);
      };
      if !stored.status.can_become(Status::Reviewed) {
        return Err(Error::InvalidTransition {
          id:   stored.id.clone(),
          from: stored.status,
          to:   Status::Reviewed,
        });
      }

      let mut approved = ApprovedRecord::from_review(record);
      approved.id = stored.id.clone();
      approved.text = stored.text.clone();

      store.remove(&record.id);
      store.push_approved(approved.clone());
      info!(record = %approved.id, "approved");
      Ok(Some(approved))
    })
  }

  /// Approve the stored record as it currently stands.
  pub fn approve_id(&self, id: &str) -> Result<Option<ApprovedRecord>> {
    match self.queue.get(id) {
      Some(record) => self.approve(&record),
      None => Ok(None),
    }
  }

  /// Approve every `pending_review` record, in pool order, as one batch.
  /// Records in any other status are left alone. Returns the number approved.
  pub fn bulk_approve(&self) -> usize {
    let count = self.queue.with_store(|store| {
      let ids = store.ids_with_status(Status::PendingReview);
      for id in &ids {
        if let Some(record) = store.remove(id) {
          store.push_approved(ApprovedRecord::from_review(&record));
        }
      }
      ids.len()
    });
    info!(count, "bulk approved pending records");
    count
  }

  /// Discard a record. Returns `false` if the id was not in the pool.
  pub fn reject(&self, id: &str) -> bool {
    let removed = self.queue.with_store(|store| store.remove(id)).is_some();
    if removed {
      info!(record = %id, "rejected");
    } else {
      debug!(record = %id, "reject: record no longer queued");
    }
    removed
  }

  /// Apply human corrections to a `pending_review` record and return the
  /// updated copy.
  pub fn edit(&self, id: &str, edits: ReviewEdits) -> Result<ReviewRecord> {
    self.queue.with_store(|store| {
      let record = store
        .get_mut(id)
        .ok_or_else(|| Error::RecordNotFound(id.to_owned()))?;
      if record.status != Status::PendingReview {
        return Err(Error::InvalidTransition {
          id:   id.to_owned(),
          from: record.status,
          to:   Status::PendingReview,
        });
      }
      record.apply_edits(edits);
      debug!(record = %id, "edited");
      Ok(record.clone())
    })
  }
}
