//! JSON record parser.

use serde_json::Value;
use tracing::{debug, warn};

use crate::{ParseError, SourceId, SourceParser};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// JSON parser for campaign records.
///
/// Campaign files written by older tools are not always UTF-8. Decoding is
/// attempted in order:
///
/// 1. strict UTF-8 (a leading byte-order mark is skipped)
/// 2. Latin-1, every byte mapped to the code point of equal value
/// 3. lossy UTF-8, invalid sequences replaced by U+FFFD
///
/// The fallbacks only run when the bytes are not valid UTF-8; a syntax error
/// in a well-encoded file is reported straight away.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSourceParser;

impl JsonSourceParser {
    /// Creates a new JSON parser.
    pub fn new() -> Self {
        Self
    }

    fn error_from(identity: &SourceId, raw: &[u8], err: &serde_json::Error) -> ParseError {
        match offset_of(raw, err.line(), err.column()) {
            Some(offset) => ParseError::invalid_source_at(identity, err.to_string(), offset),
            None => ParseError::invalid_source(identity, err.to_string()),
        }
    }
}

impl SourceParser for JsonSourceParser {
    fn name(&self) -> &str {
        "json"
    }

    fn extensions(&self) -> &[&str] {
        &["json"]
    }

    fn parse(&self, identity: &SourceId, raw: &[u8]) -> Result<Value, ParseError> {
        let body = raw.strip_prefix(UTF8_BOM).unwrap_or(raw);

        let strict_err = match serde_json::from_slice::<Value>(body) {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if std::str::from_utf8(body).is_ok() {
            return Err(Self::error_from(identity, body, &strict_err));
        }

        debug!("UTF-8 decode failed for {}, trying Latin-1", identity);
        let latin1: String = body.iter().map(|&b| char::from(b)).collect();
        if let Ok(value) = serde_json::from_str::<Value>(&latin1) {
            debug!("Decoded {} as Latin-1", identity);
            return Ok(value);
        }

        let lossy = String::from_utf8_lossy(body);
        match serde_json::from_str::<Value>(&lossy) {
            Ok(value) => {
                warn!("Decoded {} with replacement characters", identity);
                Ok(value)
            }
            Err(_) => Err(Self::error_from(identity, body, &strict_err)),
        }
    }
}

/// Converts a 1-based line/column pair reported by serde_json into a byte offset.
fn offset_of(raw: &[u8], line: usize, column: usize) -> Option<usize> {
    if line == 0 {
        return None;
    }

    let mut line_start = 0;
    for _ in 1..line {
        let newline = raw[line_start..].iter().position(|&b| b == b'\n')?;
        line_start += newline + 1;
    }

    Some((line_start + column.saturating_sub(1)).min(raw.len()))
}
