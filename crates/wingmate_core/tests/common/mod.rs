//! Shared test stores.

use std::sync::atomic::{AtomicUsize, Ordering};

use wingmate_core::{
    BackingStore, CancellationToken, Fingerprint, LoadError, MemoryStore, SourceId,
};

/// Wraps a [`MemoryStore`] and cancels `token` during its `limit`-th read.
///
/// The read that trips the token still completes, so with sequential loading
/// exactly `limit` records finish and the rest are skipped.
pub struct CancelAfterReads {
    pub inner: MemoryStore,
    pub token: CancellationToken,
    limit: usize,
    reads: AtomicUsize,
}

impl CancelAfterReads {
    pub fn new(inner: MemoryStore, limit: usize) -> Self {
        Self {
            inner,
            token: CancellationToken::new(),
            limit,
            reads: AtomicUsize::new(0),
        }
    }
}

impl BackingStore for CancelAfterReads {
    fn read(&self, identity: &SourceId) -> Result<Vec<u8>, LoadError> {
        if self.reads.fetch_add(1, Ordering::SeqCst) + 1 == self.limit {
            self.token.cancel();
        }
        self.inner.read(identity)
    }

    fn fingerprint(&self, identity: &SourceId) -> Result<Fingerprint, LoadError> {
        self.inner.fingerprint(identity)
    }
}
