//! Line-delimited JSON storage helpers
//!
//! Journal files, the significant log and the proposal queues are all
//! append-only JSONL. A malformed line never hides the lines after it, so
//! each line is parsed independently and carries its own result.

use crate::error::{EvoError, EvoResult};
use serde_json::Value;
use std::path::Path;

/// One non-blank line of a JSONL file
#[derive(Debug)]
pub struct JsonLine {
    /// 1-based line number in the file
    pub line: usize,
    /// Parsed value or parse error
    pub value: Result<Value, serde_json::Error>,
}

/// Parse JSONL text, skipping blank lines
#[must_use]
pub fn parse_json_lines(text: &str) -> Vec<JsonLine> {
    parse_json_bytes(text.as_bytes())
}

/// Parse raw JSONL bytes, skipping blank lines
///
/// Lines are decoded one by one, so a line that is not valid UTF-8 becomes a
/// parse error at its own line number.
#[must_use]
pub fn parse_json_bytes(bytes: &[u8]) -> Vec<JsonLine> {
    bytes
        .split(|b| *b == b'\n')
        .enumerate()
        .map(|(idx, raw)| (idx, trim_ascii(raw)))
        .filter(|(_, raw)| !raw.is_empty())
        .map(|(idx, raw)| JsonLine {
            line: idx + 1,
            value: serde_json::from_slice(raw),
        })
        .collect()
}

fn trim_ascii(raw: &[u8]) -> &[u8] {
    let start = raw.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(raw.len());
    let end = raw.iter().rposition(|b| !b.is_ascii_whitespace()).map_or(start, |i| i + 1);
    &raw[start..end]
}

/// Read and parse a JSONL file
///
/// # Errors
/// Returns [`EvoError::Io`] if the file cannot be read.
pub fn read_json_lines(path: &Path) -> EvoResult<Vec<JsonLine>> {
    let bytes = std::fs::read(path).map_err(|e| EvoError::io(path, e))?;
    Ok(parse_json_bytes(&bytes))
}

/// Collect the string `id` of every parseable line, ignoring malformed ones
///
/// Used for lenient cross-reference lookups where the referenced file is
/// validated separately.
#[must_use]
pub fn collect_ids(lines: &[JsonLine]) -> Vec<String> {
    lines
        .iter()
        .filter_map(|l| l.value.as_ref().ok())
        .filter_map(|v| v.get("id").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

/// Count non-blank lines; a missing file counts as zero
#[must_use]
pub fn count_records(path: &Path) -> usize {
    match std::fs::read(path) {
        Ok(bytes) => bytes
            .split(|b| *b == b'\n')
            .filter(|l| !trim_ascii(l).is_empty())
            .count(),
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("could not count records in {}: {}", path.display(), e);
            }
            0
        }
    }
}

/// Short rendering of a JSON parse error
#[must_use]
pub fn describe_parse_error(err: &serde_json::Error) -> String {
    let text = err.to_string();
    format!("Invalid JSON: {}", crate::report::preview(&text, 80))
}
