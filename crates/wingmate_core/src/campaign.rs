//! On-disk layout of a campaign installation.

use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;
use wingmate_parser::SourceId;

/// Locates campaign records under an installation root.
///
/// ```text
/// <root>/User/Campaigns/<campaign>/Personnel/<squadron id>.json
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignLayout {
    root: PathBuf,
}

impl CampaignLayout {
    /// Creates a layout rooted at an installation directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the installation root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/User/Campaigns`.
    pub fn campaigns_dir(&self) -> PathBuf {
        self.root.join("User").join("Campaigns")
    }

    /// Campaign names, sorted.
    pub fn campaigns(&self) -> Vec<String> {
        let dir = self.campaigns_dir();
        if !dir.is_dir() {
            warn!("Campaigns directory not found: {}", dir.display());
            return Vec::new();
        }

        let mut names: Vec<String> = WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect();
        names.sort();
        names
    }

    /// `<root>/User/Campaigns/<campaign>/Personnel`.
    pub fn personnel_dir(&self, campaign: &str) -> PathBuf {
        self.campaigns_dir().join(campaign.trim()).join("Personnel")
    }

    /// Personnel file of one squadron.
    pub fn personnel_file(&self, campaign: &str, squadron_id: &str) -> SourceId {
        SourceId::canonical(
            self.personnel_dir(campaign)
                .join(format!("{}.json", squadron_id.trim())),
        )
    }

    /// Every personnel file of a campaign, sorted by path.
    pub fn personnel_files(&self, campaign: &str) -> Vec<SourceId> {
        let dir = self.personnel_dir(campaign);
        let files = json_files(&dir);
        info!("Discovered {} personnel files in {}", files.len(), dir.display());
        files
    }
}

/// Top-level `*.json` files of `dir` as canonical identities, sorted.
///
/// A missing directory yields an empty list.
pub fn json_files(dir: &Path) -> Vec<SourceId> {
    if !dir.is_dir() {
        warn!("Directory not found: {}", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        })
        .collect();
    files.sort();

    files.into_iter().map(SourceId::canonical).collect()
}
