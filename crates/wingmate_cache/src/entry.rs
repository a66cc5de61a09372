//! Cache entry types.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use wingmate_parser::SourceId;

/// Cheap staleness indicator for a record.
///
/// When the current fingerprint of a record equals the one stored with a
/// cache entry, the cached value is assumed current.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fingerprint {
    /// File size and modification time.
    Metadata {
        /// Size in bytes.
        len: u64,
        /// Modification time in nanoseconds since the Unix epoch, when the
        /// platform reports one.
        modified_nanos: Option<u64>,
    },

    /// BLAKE3 hash of the content.
    Content {
        /// Hex-encoded digest.
        hash: String,
    },
}

impl Fingerprint {
    /// Builds a metadata fingerprint.
    pub fn from_metadata(len: u64, modified: Option<SystemTime>) -> Self {
        let modified_nanos = modified
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .and_then(|d| u64::try_from(d.as_nanos()).ok());
        Self::Metadata {
            len,
            modified_nanos,
        }
    }

    /// Computes the BLAKE3 content fingerprint of `bytes`.
    pub fn of_content(bytes: &[u8]) -> Self {
        Self::Content {
            hash: blake3::hash(bytes).to_hex().to_string(),
        }
    }
}

/// A parsed record together with the fingerprint it was parsed under.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Record this entry belongs to.
    pub identity: SourceId,

    /// Parsed value, shared with every reader.
    pub value: Arc<Value>,

    /// Fingerprint of the bytes `value` was parsed from.
    pub fingerprint: Fingerprint,
}

impl CacheEntry {
    /// Creates a new cache entry.
    pub fn new(identity: SourceId, value: Arc<Value>, fingerprint: Fingerprint) -> Self {
        Self {
            identity,
            value,
            fingerprint,
        }
    }

    /// Checks whether this entry is still valid for `current`.
    pub fn is_current(&self, current: &Fingerprint) -> bool {
        &self.fingerprint == current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use serde_json::json;

    fn entry(fingerprint: Fingerprint) -> CacheEntry {
        CacheEntry::new(
            SourceId::from("Medals/france.json"),
            Arc::new(json!({"medals": []})),
            fingerprint,
        )
    }

    #[test]
    fn test_entry_current_for_equal_fingerprint() {
        let fp = Fingerprint::of_content(b"{}");
        assert!(entry(fp.clone()).is_current(&fp));
    }

    #[test]
    fn test_entry_stale_for_changed_content() {
        let e = entry(Fingerprint::of_content(b"{}"));
        assert!(!e.is_current(&Fingerprint::of_content(b"{ }")));
    }

    #[test]
    fn test_entry_stale_for_changed_metadata() {
        let t = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let e = entry(Fingerprint::from_metadata(10, Some(t)));

        assert!(e.is_current(&Fingerprint::from_metadata(10, Some(t))));
        assert!(!e.is_current(&Fingerprint::from_metadata(11, Some(t))));
        assert!(!e.is_current(&Fingerprint::from_metadata(
            10,
            Some(t + Duration::from_nanos(1))
        )));
    }

    #[test]
    fn test_metadata_and_content_never_match() {
        let e = entry(Fingerprint::from_metadata(2, None));
        assert!(!e.is_current(&Fingerprint::of_content(b"{}")));
    }

    #[test]
    fn test_content_fingerprint_is_blake3_hex() {
        match Fingerprint::of_content(b"") {
            Fingerprint::Content { hash } => assert_eq!(hash.len(), 64),
            other => panic!("unexpected fingerprint: {other:?}"),
        }
    }

    #[test]
    fn test_fingerprint_serialization() {
        let fp = Fingerprint::from_metadata(42, None);
        let json = serde_json::to_string(&fp).unwrap();
        assert!(json.contains("\"kind\":\"metadata\""));
        assert!(json.contains("\"len\":42"));
    }
}
