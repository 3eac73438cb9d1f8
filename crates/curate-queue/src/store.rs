//! [`RecordStore`] (the pending pool and the approved pool) and the shared
//! [`ReviewQueue`] handle every component is constructed with.

use std::sync::{Arc, Mutex, PoisonError};

use curate_core::{
  annotator::AnnotationRequest,
  lifecycle::{QueueCounts, Status},
  record::{ApprovedRecord, ReviewRecord},
};

use crate::{Error, Result};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Ordered pending pool plus the append-only approved pool.
///
/// Every record id in `pending` is unique. Records leave `pending` exactly
/// once: into `approved` (approval) or nowhere (rejection).
#[derive(Debug, Default)]
pub struct RecordStore {
  pending:  Vec<ReviewRecord>,
  approved: Vec<ApprovedRecord>,
}

impl RecordStore {
  pub fn new() -> Self { Self::default() }

  // ── Queries ─────────────────────────────────────────────────────────────

  pub fn pending(&self) -> &[ReviewRecord] { &self.pending }

  pub fn approved(&self) -> &[ApprovedRecord] { &self.approved }

  pub fn position(&self, id: &str) -> Option<usize> {
    self.pending.iter().position(|r| r.id == id)
  }

  pub fn get(&self, id: &str) -> Option<&ReviewRecord> {
    self.pending.iter().find(|r| r.id == id)
  }

  /// Ids of pending records in `status`, in pool order.
  pub fn ids_with_status(&self, status: Status) -> Vec<String> {
    self
      .pending
      .iter()
      .filter(|r| r.status == status)
      .map(|r| r.id.clone())
      .collect()
  }

  pub fn counts(&self) -> QueueCounts {
    QueueCounts::tally(self.pending.iter().map(|r| r.status), self.approved.len())
  }

  // ── Mutations ───────────────────────────────────────────────────────────

  pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut ReviewRecord> {
    self.pending.iter_mut().find(|r| r.id == id)
  }

  /// Append records to the end of the pool. Callers guarantee unique ids.
  pub(crate) fn append(&mut self, records: impl IntoIterator<Item = ReviewRecord>) {
    self.pending.extend(records);
  }

  pub(crate) fn remove(&mut self, id: &str) -> Option<ReviewRecord> {
    let index = self.position(id)?;
    Some(self.pending.remove(index))
  }

  pub(crate) fn push_approved(&mut self, record: ApprovedRecord) {
    self.approved.push(record);
  }

  /// Move a record to `to`, enforcing the lifecycle.
  pub(crate) fn transition(
    &mut self,
    id: &str,
    to: Status,
  ) -> Result<&mut ReviewRecord> {
    let record = self
      .get_mut(id)
      .ok_or_else(|| Error::RecordNotFound(id.to_owned()))?;
    if !record.status.can_become(to) {
      return Err(Error::InvalidTransition {
        id: id.to_owned(),
        from: record.status,
        to,
      });
    }
    record.status = to;
    Ok(record)
  }

  /// Mark the still-raw records among `ids` as annotating and return their
  /// gateway requests. Ids that are gone or no longer raw are skipped.
  pub(crate) fn begin_annotation(&mut self, ids: &[String]) -> Vec<AnnotationRequest> {
    let mut batch = Vec::with_capacity(ids.len());
    for id in ids {
      if let Ok(record) = self.transition(id, Status::Annotating) {
        batch.push(AnnotationRequest {
          id:   record.id.clone(),
          text: record.text.clone(),
        });
      }
    }
    batch
  }

  /// Mark every still-annotating record of `batch` as failed with `message`.
  /// Returns how many records were marked.
  pub(crate) fn fail_annotation(
    &mut self,
    batch: &[AnnotationRequest],
    message: &str,
  ) -> usize {
    let mut failed = 0;
    for request in batch {
      if let Ok(record) = self.transition(&request.id, Status::Error) {
        record.error_message = Some(message.to_owned());
        failed += 1;
      }
    }
    failed
  }
}

// ─── Shared handle ───────────────────────────────────────────────────────────

/// Cheaply cloneable handle to a single [`RecordStore`].
///
/// The lock is held only for the synchronous body of each call. A poisoned
/// lock is recovered rather than propagated: every mutation completes its
/// bookkeeping before returning, so the inner store is still consistent.
#[derive(Debug, Clone, Default)]
pub struct ReviewQueue {
  inner: Arc<Mutex<RecordStore>>,
}

impl ReviewQueue {
  pub fn new() -> Self { Self::default() }

  /// Run `f` with exclusive access to the store.
  pub(crate) fn with_store<R>(&self, f: impl FnOnce(&mut RecordStore) -> R) -> R {
    let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
  }

  /// Run a read-only query against the store.
  pub fn read<R>(&self, f: impl FnOnce(&RecordStore) -> R) -> R {
    self.with_store(|store| f(store))
  }

  /// A copy of the pending pool, in order.
  pub fn snapshot(&self) -> Vec<ReviewRecord> {
    self.read(|s| s.pending().to_vec())
  }

  /// A copy of one pending record.
  pub fn get(&self, id: &str) -> Option<ReviewRecord> {
    self.read(|s| s.get(id).cloned())
  }

  /// A copy of the approved pool, in append order.
  pub fn approved(&self) -> Vec<ApprovedRecord> {
    self.read(|s| s.approved().to_vec())
  }

  pub fn counts(&self) -> QueueCounts { self.read(RecordStore::counts) }

  /// Number of records in the pending pool.
  pub fn len(&self) -> usize { self.read(|s| s.pending().len()) }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn store_with(ids: &[&str]) -> RecordStore {
    let mut store = RecordStore::new();
    store.append(ids.iter().map(|id| ReviewRecord::raw(*id, None, "t")));
    store
  }

  #[test]
  fn transition_enforces_lifecycle() {
    let mut store = store_with(&["a"]);
    assert!(store.transition("a", Status::PendingReview).is_err());
    store.transition("a", Status::Annotating).unwrap();
    store.transition("a", Status::PendingReview).unwrap();
    match store.transition("a", Status::Error) {
      Err(Error::InvalidTransition { from, to, .. }) => {
        assert_eq!(from, Status::PendingReview);
        assert_eq!(to, Status::Error);
      }
      other => panic!("expected InvalidTransition, got {other:?}"),
    }
  }

  #[test]
  fn transition_on_missing_id() {
    let mut store = store_with(&[]);
    assert!(matches!(
      store.transition("ghost", Status::Annotating),
      Err(Error::RecordNotFound(_))
    ));
  }

  #[test]
  fn begin_annotation_skips_non_raw_and_missing() {
    let mut store = store_with(&["a", "b", "c"]);
    store.transition("b", Status::Annotating).unwrap();

    let ids = vec!["a".to_owned(), "b".to_owned(), "zzz".to_owned(), "c".to_owned()];
    let batch = store.begin_annotation(&ids);
    let batch_ids: Vec<&str> = batch.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(batch_ids, ["a", "c"]);
    assert!(store.pending().iter().all(|r| r.status == Status::Annotating));
  }

  #[test]
  fn fail_annotation_sets_message() {
    let mut store = store_with(&["a", "b"]);
    let batch = store.begin_annotation(&["a".to_owned(), "b".to_owned()]);
    assert_eq!(store.fail_annotation(&batch, "quota exceeded"), 2);
    for record in store.pending() {
      assert_eq!(record.status, Status::Error);
      assert_eq!(record.error_message.as_deref(), Some("quota exceeded"));
    }
  }

  #[test]
  fn queue_handle_shares_state() {
    let queue = ReviewQueue::new();
    let other = queue.clone();
    queue.with_store(|s| s.append([ReviewRecord::raw("a", None, "t")]));
    assert_eq!(other.len(), 1);
    assert_eq!(other.counts().raw, 1);
    assert!(other.get("a").is_some());
  }
}
