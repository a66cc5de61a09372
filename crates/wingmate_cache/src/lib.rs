//! # wingmate_cache
//!
//! In-memory parse cache for Wing Mate.
//!
//! This crate keeps parsed campaign records so that unchanged files are never
//! parsed twice.
//!
//! ## Cache Strategy
//!
//! 1. **Fingerprint-gated reuse**: an entry is served only while the record's
//!    current fingerprint (size + mtime, or a BLAKE3 content hash) equals the
//!    fingerprint stored with it
//! 2. **Explicit invalidation**: single entries via `invalidate`, the whole
//!    session via `invalidate_all`
//! 3. **Optional bound**: unbounded by default; a bounded cache evicts the
//!    oldest insertion first
//!
//! Nothing is persisted. The cache lives exactly as long as its owner.

mod entry;
mod manager;

pub use entry::{CacheEntry, Fingerprint};
pub use manager::{CacheStats, ParseCache};
