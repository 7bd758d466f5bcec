//! Release resolver.
//!
//! Queries the "latest release" resource of a GitHub-compatible index,
//! picks the artifact for the running platform and decides whether it is
//! newer than the running build.

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, USER_AGENT};
use tracing::{debug, info};

use super::assets::select_asset;
use super::release::{ReleaseInfo, UpdateDecision};
use super::version::{is_dev, is_newer};
use crate::config::UpdaterConfig;
use crate::error::{Result, UpdateError};
use crate::platform::PlatformTarget;

/// Resolves the latest release into an [`UpdateDecision`].
#[derive(Debug, Clone)]
pub struct ReleaseResolver {
    client: reqwest::Client,
    config: UpdaterConfig,
    platform: PlatformTarget,
}

impl ReleaseResolver {
    /// Resolver for the running platform.
    pub fn new(client: reqwest::Client, config: UpdaterConfig) -> Self {
        Self {
            client,
            config,
            platform: PlatformTarget::current(),
        }
    }

    /// Override the platform used for asset selection.
    pub fn with_platform(mut self, platform: PlatformTarget) -> Self {
        self.platform = platform;
        self
    }

    /// Version of the running build.
    pub fn current_version(&self) -> &str {
        &self.config.current_version
    }

    /// Platform assets are selected for.
    pub fn platform(&self) -> &PlatformTarget {
        &self.platform
    }

    /// Fetch the latest release and compare it against the running version.
    ///
    /// A 404 from the index means no release has been published yet and
    /// yields an up-to-date decision. A release without an artifact for this
    /// platform yields a decision with no download URL.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Network`] if the index is unreachable,
    /// [`UpdateError::Status`] for any other non-success status and
    /// [`UpdateError::Parse`] for a malformed payload.
    pub async fn check_for_updates(&self) -> Result<UpdateDecision> {
        let current = self.current_version();

        if self.config.skip_dev_builds && is_dev(current) {
            debug!("skipping update check for dev build");
            return Ok(UpdateDecision::up_to_date(current));
        }

        let url = self.config.release.latest_release_url();
        debug!(%url, "fetching latest release");

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, &self.config.release.accept)
            .header(USER_AGENT, &self.config.release.user_agent)
            .send()
            .await
            .map_err(|e| UpdateError::Network(format!("failed to fetch releases: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("release index has no releases");
            return Ok(UpdateDecision::up_to_date(current));
        }
        if status != StatusCode::OK {
            return Err(UpdateError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| UpdateError::Network(format!("failed to read release body: {e}")))?;
        let release: ReleaseInfo =
            serde_json::from_str(&body).map_err(|e| UpdateError::Parse(e.to_string()))?;

        let decision = self.decide(release);
        if decision.has_update {
            info!(
                current = %decision.current_version,
                latest = %decision.latest_version,
                asset = decision.asset_name.as_deref().unwrap_or("<none>"),
                "update available"
            );
        }
        Ok(decision)
    }

    /// Turn a fetched release into a decision for this platform.
    pub fn decide(&self, release: ReleaseInfo) -> UpdateDecision {
        let patterns = self.platform.asset_patterns(&self.config.app_name);
        let asset = select_asset(&patterns, &release.assets);
        let current = self.current_version();

        UpdateDecision {
            current_version: current.to_owned(),
            has_update: is_newer(&release.tag_name, current),
            latest_version: release.tag_name,
            release_notes: release.body.unwrap_or_default(),
            published_at: release.published_at.unwrap_or_default(),
            download_url: asset.map(|a| a.browser_download_url.clone()),
            asset_name: asset.map(|a| a.name.clone()),
            asset_size: asset.map(|a| a.size),
        }
    }
}
