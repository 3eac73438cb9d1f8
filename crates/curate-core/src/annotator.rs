//! The `Annotator` trait, the boundary to the generative model.
//!
//! The engine hands an annotator a batch of `(id, text)` pairs and expects one
//! [`Annotation`] per id back. How the annotator builds prompts or talks to a
//! model is its own business. A call either returns the whole batch or fails
//! as a whole; per-item failure is not modelled.

use std::{future::Future, sync::Arc};

use serde::{Deserialize, Deserializer, Serialize};

use crate::{
  Result,
  record::{LabelScores, StanceLabel},
};

// ─── Wire types ──────────────────────────────────────────────────────────────

/// One item of a batch sent to the annotator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRequest {
  pub id:   String,
  pub text: String,
}

/// The annotator's proposal for one request, keyed back by `ref_id`.
///
/// Missing or `null` maps read as empty; a missing stance reads as
/// `NEUTRAL` with an empty target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
  pub ref_id:        String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub cleavages:     LabelScores,
  #[serde(default, deserialize_with = "null_as_default")]
  pub tactics:       LabelScores,
  #[serde(default, deserialize_with = "null_as_default")]
  pub emotions:      LabelScores,
  #[serde(default, deserialize_with = "null_as_default")]
  pub stance_label:  StanceLabel,
  #[serde(default, deserialize_with = "null_as_default")]
  pub stance_target: String,
}

impl Annotation {
  /// An annotation with no labels and a neutral stance.
  pub fn empty(ref_id: impl Into<String>) -> Self {
    Self {
      ref_id:        ref_id.into(),
      cleavages:     LabelScores::new(),
      tactics:       LabelScores::new(),
      emotions:      LabelScores::new(),
      stance_label:  StanceLabel::Neutral,
      stance_target: String::new(),
    }
  }
}

/// The envelope a model-backed annotator responds with:
/// `{"annotations": [ ... ]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationResponse {
  pub annotations: Vec<Annotation>,
}

/// Parse an annotator response body into its annotations.
pub fn parse_annotation_response(body: &str) -> Result<Vec<Annotation>> {
  let response: AnnotationResponse = serde_json::from_str(body.trim())?;
  Ok(response.annotations)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Batch annotation backend.
///
/// Returned futures are `Send` so an orchestrator run can be spawned onto a
/// multi-threaded runtime.
pub trait Annotator: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Annotate every request in `batch`. Results may come back in any order.
  fn annotate<'a>(
    &'a self,
    batch: &'a [AnnotationRequest],
  ) -> impl Future<Output = Result<Vec<Annotation>, Self::Error>> + Send + 'a;
}

impl<A: Annotator> Annotator for Arc<A> {
  type Error = A::Error;

  fn annotate<'a>(
    &'a self,
    batch: &'a [AnnotationRequest],
  ) -> impl Future<Output = Result<Vec<Annotation>, Self::Error>> + Send + 'a {
    (**self).annotate(batch)
  }
}
