//! JSONL ingestion into the pending pool.
//!
//! Each non-empty line must be a JSON object with a non-empty string `text`
//! (or, failing that, `full_text`). An optional `id` (string or number) is
//! kept when it is unique; anything else is skipped and counted.

use std::collections::HashSet;

use curate_core::record::ReviewRecord;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ReviewQueue;

/// Outcome of one ingestion call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
  /// Records appended to the pool.
  pub added:   usize,
  /// Non-empty lines that were dropped.
  pub skipped: usize,
  /// Records whose supplied id collided and was suffixed.
  pub rekeyed: usize,
}

struct RawLine {
  id:   Option<String>,
  text: String,
}

impl ReviewQueue {
  /// Parse `input` and append every valid line as a `raw` record, in order.
  ///
  /// Never mutates existing records. Calling it twice with the same input
  /// adds the records twice, under distinct ids.
  pub fn ingest(&self, input: &str) -> IngestReport {
    let mut report = IngestReport::default();
    let mut lines = Vec::new();

    for (index, line) in input.lines().enumerate() {
      if line.trim().is_empty() {
        continue;
      }
      match parse_line(line) {
        Some(raw) => lines.push(raw),
        None => {
          debug!(line = index + 1, "skipped invalid ingestion line");
          report.skipped += 1;
        }
      }
    }

    self.with_store(|store| {
      let mut taken: HashSet<String> =
        store.pending().iter().map(|r| r.id.clone()).collect();
      let mut records = Vec::with_capacity(lines.len());

      for raw in lines {
        let id = match &raw.id {
          Some(wanted) if !taken.contains(wanted) => wanted.clone(),
          Some(wanted) => {
            let id = rekey(wanted, &taken);
            warn!(original = %wanted, assigned = %id, "duplicate record id re-keyed");
            report.rekeyed += 1;
            id
          }
          None => fresh_id(&taken),
        };
        taken.insert(id.clone());
        records.push(ReviewRecord::raw(id, raw.id, raw.text));
      }

      report.added = records.len();
      store.append(records);
    });

    info!(
      added = report.added,
      skipped = report.skipped,
      rekeyed = report.rekeyed,
      "ingested raw records"
    );
    report
  }
}

fn parse_line(line: &str) -> Option<RawLine> {
  let value: Value = serde_json::from_str(line).ok()?;
  let object = value.as_object()?;
  let text = text_field(object, "text").or_else(|| text_field(object, "full_text"))?;
  let id = match object.get("id") {
    Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
    Some(Value::Number(n)) => Some(n.to_string()),
    _ => None,
  };
  Some(RawLine { id, text })
}

fn text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
  match object.get(key) {
    Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
    _ => None,
  }
}

fn rekey(wanted: &str, taken: &HashSet<String>) -> String {
  (1..)
    .map(|n| format!("{wanted}~{n}"))
    .find(|candidate| !taken.contains(candidate))
    .unwrap_or_else(|| fresh_id(taken))
}

fn fresh_id(taken: &HashSet<String>) -> String {
  loop {
    let id = Uuid::new_v4().to_string();
    if !taken.contains(&id) {
      return id;
    }
  }
}
