//! # wingmate_parser
//!
//! Parser abstraction layer for Wing Mate campaign records.
//!
//! This crate provides:
//! - `SourceId`, the comparable key naming one on-disk record
//! - A `SourceParser` trait for turning raw bytes into a structured value
//! - Built-in JSON parser with the encoding fallbacks legacy campaign files need
//!
//! Parsers are stateless: identical bytes always yield an identical value, and
//! nothing here knows about personnel, medals or squadrons.
//!
//! ## Example
//!
//! ```rust
//! use wingmate_parser::{JsonSourceParser, SourceId, SourceParser};
//!
//! let parser = JsonSourceParser::new();
//! let id = SourceId::from("Personnel/101.json");
//! let value = parser.parse(&id, br#"{"squadronMemberCollection": {}}"#).unwrap();
//! assert!(value.get("squadronMemberCollection").is_some());
//! ```

mod error;
mod identity;
mod json;
mod traits;

pub use error::ParseError;
pub use identity::SourceId;
pub use json::JsonSourceParser;
pub use traits::SourceParser;

pub use serde_json::Value;
