//! [`CommandAnnotator`]: an [`Annotator`] backed by an external process.
//!
//! Each batch spawns the configured command once, writes the batch as a JSON
//! array of `{"id", "text"}` objects to its stdin, and reads an
//! `{"annotations": [...]}` envelope from its stdout.

use std::{io::ErrorKind, process::Stdio, time::Duration};

use curate_core::annotator::{
  Annotation, AnnotationRequest, Annotator, parse_annotation_response,
};
use thiserror::Error;
use tokio::{io::AsyncWriteExt as _, process::Command};
use tracing::debug;

use crate::settings::AnnotatorSettings;

/// Longest stderr excerpt carried into an error message.
const STDERR_EXCERPT: usize = 400;

#[derive(Debug, Error)]
pub enum GatewayError {
  #[error("no annotator command configured")]
  NotConfigured,

  #[error("failed to start annotator `{command}`: {source}")]
  Spawn {
    command: String,
    #[source]
    source:  std::io::Error,
  },

  #[error("annotator I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("annotator exited with {status}: {stderr}")]
  Exit { status: String, stderr: String },

  #[error("invalid annotator response: {0}")]
  InvalidResponse(#[from] curate_core::Error),

  #[error("failed to encode annotator request: {0}")]
  Encode(#[from] serde_json::Error),

  #[error("annotator timed out after {0}s")]
  Timeout(u64),
}

pub struct CommandAnnotator {
  command: String,
  args:    Vec<String>,
  timeout: Option<Duration>,
}

impl CommandAnnotator {
  pub fn new(settings: &AnnotatorSettings) -> Self {
    Self {
      command: settings.command.clone(),
      args:    settings.args.clone(),
      timeout: settings.timeout_secs.map(Duration::from_secs),
    }
  }

  async fn call(
    &self,
    batch: &[AnnotationRequest],
  ) -> Result<Vec<Annotation>, GatewayError> {
    if self.command.trim().is_empty() {
      return Err(GatewayError::NotConfigured);
    }
    let payload = serde_json::to_vec(batch)?;

    let mut child = Command::new(&self.command)
      .args(&self.args)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true)
      .spawn()
      .map_err(|source| GatewayError::Spawn {
        command: self.command.clone(),
        source,
      })?;

    // Feed stdin while draining stdout and stderr; the child may answer
    // before it has read the whole batch.
    let stdin = child.stdin.take();
    let feed = async move {
      match stdin {
        // Dropping the handle closes the pipe so the child sees EOF.
        Some(mut stdin) => stdin.write_all(&payload).await,
        None => Ok(()),
      }
    };
    let (fed, output) = tokio::join!(feed, child.wait_with_output());
    let output = output?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      let stderr: String = stderr.trim().chars().take(STDERR_EXCERPT).collect();
      return Err(GatewayError::Exit {
        status: output.status.to_string(),
        stderr,
      });
    }

    match fed {
      Ok(()) => {}
      Err(e) if e.kind() == ErrorKind::BrokenPipe => {
        debug!("annotator exited before reading the whole batch");
      }
      Err(e) => return Err(e.into()),
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let annotations = parse_annotation_response(&stdout)?;
    debug!(
      requested = batch.len(),
      returned = annotations.len(),
      "annotator responded"
    );
    Ok(annotations)
  }
}

impl Annotator for CommandAnnotator {
  type Error = GatewayError;

  async fn annotate(
    &self,
    batch: &[AnnotationRequest],
  ) -> Result<Vec<Annotation>, GatewayError> {
    match self.timeout {
      Some(limit) => tokio::time::timeout(limit, self.call(batch))
        .await
        .map_err(|_| GatewayError::Timeout(limit.as_secs()))?,
      None => self.call(batch).await,
    }
  }
}

#[cfg(all(test, unix))]
mod tests {
  use super::*;

  fn shell(script: &str, timeout_secs: Option<u64>) -> CommandAnnotator {
    CommandAnnotator::new(&AnnotatorSettings {
      command: "sh".into(),
      args: vec!["-c".into(), script.into()],
      timeout_secs,
    })
  }

  fn batch() -> Vec<AnnotationRequest> {
    vec![
      AnnotationRequest {
        id:   "r1".into(),
        text: "pierwszy".into(),
      },
      AnnotationRequest {
        id:   "r2".into(),
        text: "drugi".into(),
      },
    ]
  }

  #[tokio::test]
  async fn reads_envelope_from_stdout() {
    let annotator = shell(
      r#"cat > /dev/null; echo '{"annotations":[{"ref_id":"r1","cleavages":{"cleavage_trauma":0.5},"stance_label":"AGAINST"}]}'"#,
      None,
    );
    let annotations = annotator.annotate(&batch()).await.unwrap();
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].ref_id, "r1");
    assert_eq!(annotations[0].cleavages["cleavage_trauma"], 0.5);
    assert!(annotations[0].tactics.is_empty());
  }

  #[tokio::test]
  async fn batch_is_written_to_stdin() {
    // Answers only if the second id arrived on stdin.
    let annotator = shell(
      r#"printf '{"annotations":[{"ref_id":'; grep -o '"r2"'; printf '}]}'"#,
      None,
    );
    let annotations = annotator.annotate(&batch()).await.unwrap();
    assert_eq!(annotations, vec![Annotation::empty("r2")]);
  }

  fn large_batch() -> Vec<AnnotationRequest> {
    vec![AnnotationRequest {
      id:   "big".into(),
      text: "x".repeat(200_000),
    }]
  }

  #[tokio::test]
  async fn output_before_reading_stdin_does_not_block() {
    // Writes more than a pipe buffer before touching stdin.
    let annotator = shell(
      r#"head -c 200000 /dev/zero | tr '\0' ' '; printf '{"annotations":[]}'; cat > /dev/null"#,
      Some(20),
    );
    let annotations = annotator.annotate(&large_batch()).await.unwrap();
    assert!(annotations.is_empty());
  }

  #[tokio::test]
  async fn early_exit_reports_stderr_not_broken_pipe() {
    let annotator = shell("echo 'refusing input' >&2; exit 4", Some(20));
    let err = annotator.annotate(&large_batch()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Exit { .. }), "{err}");
    assert!(err.to_string().contains("refusing input"));
  }

  #[tokio::test]
  async fn non_zero_exit_fails_the_batch() {
    let annotator = shell("cat > /dev/null; echo 'model overloaded' >&2; exit 3", None);
    let err = annotator.annotate(&batch()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Exit { .. }));
    assert!(err.to_string().contains("model overloaded"));
  }

  #[tokio::test]
  async fn garbage_output_is_invalid() {
    let annotator = shell("cat > /dev/null; echo 'not json'", None);
    let err = annotator.annotate(&batch()).await.unwrap_err();
    assert!(matches!(err, GatewayError::InvalidResponse(_)));
  }

  #[tokio::test]
  async fn slow_annotator_times_out() {
    let annotator = shell("sleep 5", Some(1));
    let err = annotator.annotate(&batch()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Timeout(1)));
  }

  #[tokio::test]
  async fn missing_command_is_reported() {
    let annotator = CommandAnnotator::new(&AnnotatorSettings::default());
    assert!(matches!(
      annotator.annotate(&batch()).await,
      Err(GatewayError::NotConfigured)
    ));

    let annotator = CommandAnnotator::new(&AnnotatorSettings {
      command: "/definitely/not/a/binary".into(),
      ..AnnotatorSettings::default()
    });
    assert!(matches!(
      annotator.annotate(&batch()).await,
      Err(GatewayError::Spawn { .. })
    ));
  }
}
