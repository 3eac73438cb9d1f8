//! The review queue engine: an in-memory record store plus the operations
//! that move records through it.
//!
//! - [`ingest`] appends raw JSONL records.
//! - [`orchestrator::Orchestrator`] drives raw records through an
//!   [`Annotator`](curate_core::annotator::Annotator) in sequential chunks and
//!   [`merge`]s the results.
//! - [`review::ReviewEngine`] approves, bulk-approves, edits and rejects.
//! - [`export`] serialises the approved pool.
//!
//! All components share one [`ReviewQueue`] handle; none of them hold its lock
//! across an `.await`.

pub mod error;
pub mod export;
pub mod ingest;
pub mod merge;
pub mod orchestrator;
pub mod review;
pub mod store;

pub use error::{Error, Result};
pub use ingest::IngestReport;
pub use orchestrator::{DEFAULT_CHUNK_SIZE, Orchestrator, RunReport};
pub use review::ReviewEngine;
pub use store::{RecordStore, ReviewQueue};
