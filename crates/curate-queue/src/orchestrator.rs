//! [`Orchestrator`] drives raw records through an [`Annotator`] in
//! fixed-size chunks, one chunk at a time.
//!
//! Per chunk: mark records `annotating`, await the annotator, then either
//! merge the results or mark the chunk `error`. A failed chunk never stops the
//! run and is never retried automatically.

use std::{
  collections::HashSet,
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
};

use curate_core::{
  annotator::{Annotation, AnnotationRequest, Annotator},
  codex::Codex,
  lifecycle::Status,
};
use tracing::{debug, error, info, warn};

use crate::{Error, RecordStore, Result, ReviewQueue, merge::merge_annotation};

/// Records per annotator call unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 5;

/// Message recorded on a record the annotator silently left out.
pub const UNMATCHED_MESSAGE: &str = "annotator returned no result for this record";

const FALLBACK_FAILURE_MESSAGE: &str = "annotation batch failed";

// ─── Report ──────────────────────────────────────────────────────────────────

/// Outcome of one [`Orchestrator::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
  /// Chunks sent to the annotator.
  pub chunks:    usize,
  /// Records that reached `pending_review`.
  pub merged:    usize,
  /// Records marked `error` because their chunk failed.
  pub failed:    usize,
  /// Records marked `error` because the annotator omitted them.
  pub unmatched: usize,
}

#[derive(Default)]
struct ChunkOutcome {
  merged:    usize,
  unmatched: usize,
}

// ─── Orchestrator ────────────────────────────────────────────────────────────

pub struct Orchestrator<A> {
  queue:      ReviewQueue,
  annotator:  A,
  codex:      Arc<Codex>,
  chunk_size: usize,
  busy:       Arc<AtomicBool>,
}

impl<A: Annotator> Orchestrator<A> {
  pub fn new(queue: ReviewQueue, annotator: A, codex: Arc<Codex>) -> Self {
    Self {
      queue,
      annotator,
      codex,
      chunk_size: DEFAULT_CHUNK_SIZE,
      busy: Arc::new(AtomicBool::new(false)),
    }
  }

  /// Override the chunk size. Zero is rejected.
  pub fn with_chunk_size(mut self, chunk_size: usize) -> Result<Self> {
    if chunk_size == 0 {
      return Err(Error::InvalidChunkSize);
    }
    self.chunk_size = chunk_size;
    Ok(self)
  }

  pub fn chunk_size(&self) -> usize { self.chunk_size }

  /// True from the start of a run until its last chunk has been handled.
  pub fn is_busy(&self) -> bool { self.busy.load(Ordering::Acquire) }

  /// Annotate every record that is `raw` at the moment the run starts.
  ///
  /// Returns [`Error::AnnotationInProgress`] if another run on this
  /// orchestrator has not finished.
  #[tracing::instrument(skip(self), fields(chunk_size = self.chunk_size))]
  pub async fn run(&self) -> Result<RunReport> {
    if self
      .busy
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .is_err()
    {
      return Err(Error::AnnotationInProgress);
    }
    let _busy = BusyGuard(&self.busy);

    let ids = self.queue.read(|s| s.ids_with_status(Status::Raw));
    let mut report = RunReport::default();

    for (index, chunk) in ids.chunks(self.chunk_size).enumerate() {
      let batch = self.queue.with_store(|s| s.begin_annotation(chunk));
      if batch.is_empty() {
        continue;
      }
      report.chunks += 1;
      debug!(chunk = index + 1, records = batch.len(), "annotating chunk");

      match self.annotator.annotate(&batch).await {
        Ok(annotations) => {
          let outcome = self
            .queue
            .with_store(|s| apply_annotations(s, &batch, annotations, &self.codex));
          report.merged += outcome.merged;
          report.unmatched += outcome.unmatched;
        }
        Err(e) => {
          let mut message = e.to_string();
          if message.trim().is_empty() {
            message = FALLBACK_FAILURE_MESSAGE.to_owned();
          }
          error!(chunk = index + 1, error = %message, "annotation chunk failed");
          report.failed += self.queue.with_store(|s| s.fail_annotation(&batch, &message));
        }
      }
    }

    info!(
      chunks = report.chunks,
      merged = report.merged,
      failed = report.failed,
      unmatched = report.unmatched,
      "annotation run finished"
    );
    Ok(report)
  }
}

/// Clears the busy flag however the run ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
  fn drop(&mut self) { self.0.store(false, Ordering::Release); }
}

/// Merge a successful chunk response, scoped to the chunk's ids.
fn apply_annotations(
  store: &mut RecordStore,
  batch: &[AnnotationRequest],
  annotations: Vec<Annotation>,
  codex: &Codex,
) -> ChunkOutcome {
  let submitted: HashSet<&str> = batch.iter().map(|r| r.id.as_str()).collect();
  let mut answered: HashSet<String> = HashSet::new();
  let mut outcome = ChunkOutcome::default();

  for annotation in annotations {
    if !submitted.contains(annotation.ref_id.as_str()) {
      warn!(ref_id = %annotation.ref_id, "ignoring result for an id outside the chunk");
      continue;
    }
    if !answered.insert(annotation.ref_id.clone()) {
      warn!(ref_id = %annotation.ref_id, "ignoring duplicate result");
      continue;
    }
    // Rejected mid-flight records are simply gone.
    if let Some(record) = store.get_mut(&annotation.ref_id)
      && record.status == Status::Annotating
    {
      merge_annotation(record, annotation, codex);
      outcome.merged += 1;
    }
  }

  for request in batch {
    if answered.contains(&request.id) {
      continue;
    }
    if let Ok(record) = store.transition(&request.id, Status::Error) {
      warn!(record = %request.id, "annotator returned no result");
      record.error_message = Some(UNMATCHED_MESSAGE.to_owned());
      outcome.unmatched += 1;
    }
  }

  outcome
}
