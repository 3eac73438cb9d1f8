//! JSONL serialisation of the approved pool.
//!
//! One object per line, in append order, fields in the fixed
//! [`ApprovedRecord`] order. No trailing newline; an empty pool exports as an
//! empty string.

use curate_core::{codex::CLEAVAGE_ORDER, record::ApprovedRecord};

use crate::{Error, Result, ReviewQueue};

/// Serialise `records` as JSONL without reordering or filtering.
pub fn to_jsonl(records: &[ApprovedRecord]) -> Result<String> {
  let lines = records
    .iter()
    .map(serde_json::to_string)
    .collect::<Result<Vec<_>, _>>()?;
  Ok(lines.join("\n"))
}

/// Parse export text back into approved records, checking every line against
/// the cleavage schema. Blank lines are ignored.
pub fn parse_export(input: &str) -> Result<Vec<ApprovedRecord>> {
  let mut records = Vec::new();
  for (index, line) in input.lines().enumerate() {
    if line.trim().is_empty() {
      continue;
    }
    let line_no = index + 1;
    let record: ApprovedRecord = serde_json::from_str(line).map_err(|source| {
      Error::ExportLine {
        line: line_no,
        source,
      }
    })?;
    if record.cleavages.len() != CLEAVAGE_ORDER.len() {
      return Err(Error::SchemaMismatch {
        line:     line_no,
        expected: CLEAVAGE_ORDER.len(),
        found:    record.cleavages.len(),
      });
    }
    records.push(record);
  }
  Ok(records)
}

impl ReviewQueue {
  /// Export the current approved pool. Pure; may be called any number of
  /// times.
  pub fn export(&self) -> Result<String> { self.read(|s| to_jsonl(s.approved())) }
}
