//! Core types and trait definitions for the Codex curation queue.
//!
//! This crate is free of I/O. It defines the label taxonomy, the review and
//! export record shapes, the status lifecycle, and the [`annotator::Annotator`]
//! boundary that the engine drives. Everything else depends on it.

// Native `async fn` in traits; the returned futures carry explicit `Send`
// bounds where it matters.
#![allow(async_fn_in_trait)]

pub mod annotator;
pub mod codex;
pub mod error;
pub mod lifecycle;
pub mod record;
pub mod score;

pub use error::{Error, Result};
