//! Source identity type.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Serialize, Serializer};

/// Stable key naming one on-disk record.
///
/// Cloning is cheap (the path is shared). Two identities compare equal when
/// their paths are equal, so callers that may spell one file several ways
/// should build identities with [`SourceId::canonical`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(Arc<Path>);

impl SourceId {
    /// Creates an identity from a path as given.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(Arc::from(path.into()))
    }

    /// Creates an identity from the canonical form of `path`.
    ///
    /// Falls back to the path as given when it cannot be canonicalized
    /// (missing file, broken symlink); a later load reports the problem.
    pub fn canonical(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match path.canonicalize() {
            Ok(resolved) => Self::new(resolved),
            Err(_) => Self::new(path),
        }
    }

    /// Returns the underlying path.
    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Returns the file stem, if any.
    pub fn stem(&self) -> Option<&str> {
        self.0.file_stem().and_then(|s| s.to_str())
    }

    /// Returns the extension, if any.
    pub fn extension(&self) -> Option<&str> {
        self.0.extension().and_then(|s| s.to_str())
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl Serialize for SourceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0.display())
    }
}

impl From<&str> for SourceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SourceId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<PathBuf> for SourceId {
    fn from(value: PathBuf) -> Self {
        Self::new(value)
    }
}

impl From<&Path> for SourceId {
    fn from(value: &Path) -> Self {
        Self::new(value)
    }
}

impl AsRef<Path> for SourceId {
    fn as_ref(&self) -> &Path {
        self.path()
    }
}
