//! Release index payloads and the derived update decision.

use serde::{Deserialize, Serialize};

/// One downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseAsset {
    /// File name as published.
    pub name: String,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
    /// Direct download location.
    pub browser_download_url: String,
}

/// Snapshot of the latest remote release.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseInfo {
    /// Release tag, usually `vX.Y.Z`.
    pub tag_name: String,
    /// Human-readable title.
    #[serde(default)]
    pub name: Option<String>,
    /// Release notes (markdown).
    #[serde(default)]
    pub body: Option<String>,
    /// Publish timestamp (ISO 8601).
    #[serde(default)]
    pub published_at: Option<String>,
    /// Attached artifacts.
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// Result of comparing the running version against the latest release.
///
/// `download_url` is `None` when the release carries no artifact for this
/// platform; callers must treat that as "cannot download", which is
/// distinct from `has_update == false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDecision {
    pub current_version: String,
    pub latest_version: String,
    pub has_update: bool,
    pub release_notes: String,
    pub published_at: String,
    pub download_url: Option<String>,
    pub asset_name: Option<String>,
    pub asset_size: Option<u64>,
}

impl UpdateDecision {
    /// Decision for "nothing newer exists": latest equals current.
    pub fn up_to_date(current: &str) -> Self {
        Self {
            current_version: current.to_owned(),
            latest_version: current.to_owned(),
            has_update: false,
            release_notes: String::new(),
            published_at: String::new(),
            download_url: None,
            asset_name: None,
            asset_size: None,
        }
    }

    /// Whether an artifact for this platform was found.
    pub fn can_download(&self) -> bool {
        self.download_url.is_some()
    }
}
