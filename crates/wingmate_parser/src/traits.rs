//! Parser trait definition.

use serde_json::Value;

use crate::{ParseError, SourceId};

/// Trait for turning raw record bytes into a structured value.
///
/// Implementations must be deterministic and free of side effects: they
/// never touch the filesystem and never assume a schema beyond "decodes to a
/// generic structured value". Interpreting the value is the caller's job.
///
/// # Example
///
/// ```rust
/// use wingmate_parser::{ParseError, SourceId, SourceParser, Value};
///
/// struct NullParser;
///
/// impl SourceParser for NullParser {
///     fn name(&self) -> &str {
///         "null"
///     }
///
///     fn extensions(&self) -> &[&str] {
///         &["null"]
///     }
///
///     fn parse(&self, _identity: &SourceId, _raw: &[u8]) -> Result<Value, ParseError> {
///         Ok(Value::Null)
///     }
/// }
///
/// assert!(NullParser.can_parse("NULL"));
/// ```
pub trait SourceParser: Send + Sync {
    /// Returns the name of this parser.
    fn name(&self) -> &str;

    /// Returns the file extensions this parser handles.
    ///
    /// Extensions should not include the leading dot (e.g., `["json"]`).
    fn extensions(&self) -> &[&str];

    /// Parses raw bytes into a structured value.
    fn parse(&self, identity: &SourceId, raw: &[u8]) -> Result<Value, ParseError>;

    /// Returns true if this parser can handle the given file extension.
    fn can_parse(&self, extension: &str) -> bool {
        self.extensions()
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }
}
