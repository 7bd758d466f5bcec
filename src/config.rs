//! Configuration types for the updater.

use crate::error::{Result, UpdateError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Version baked in at build time (`FARMLAND_VERSION=v1.2.0 cargo build`).
pub const BUILD_VERSION: &str = match option_env!("FARMLAND_VERSION") {
    Some(v) => v,
    None => "dev",
};

/// Top-level configuration for the update workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    /// Application name; stem of every release asset pattern.
    pub app_name: String,
    /// Version of the running build. `"dev"` marks an unreleased build.
    pub current_version: String,
    /// Return "no update" for `dev` builds without contacting the index.
    pub skip_dev_builds: bool,
    /// Remote release index settings.
    pub release: ReleaseConfig,
    /// Artifact download settings.
    pub download: DownloadConfig,
    /// HTTP client settings.
    pub network: NetworkConfig,
    /// Permanent install settings (Windows).
    pub install: InstallConfig,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            app_name: "farmland".to_owned(),
            current_version: BUILD_VERSION.to_owned(),
            skip_dev_builds: false,
            release: ReleaseConfig::default(),
            download: DownloadConfig::default(),
            network: NetworkConfig::default(),
            install: InstallConfig::default(),
        }
    }
}

/// Release index coordinates and request headers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    /// Base URL of the GitHub-compatible API.
    pub api_base_url: String,
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// `User-Agent` sent with every index request.
    pub user_agent: String,
    /// `Accept` media type for the index request.
    pub accept: String,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.github.com".to_owned(),
            owner: "danielkosgei".to_owned(),
            repo: "farmland".to_owned(),
            user_agent: "Farmland-App".to_owned(),
            accept: "application/vnd.github.v3+json".to_owned(),
        }
    }
}

impl ReleaseConfig {
    /// URL of the "latest release" resource.
    pub fn latest_release_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_base_url.trim_end_matches('/'),
            self.owner,
            self.repo
        )
    }
}

/// Artifact download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Prefix of the temp file the artifact is written to.
    pub temp_prefix: String,
    /// Directory for downloaded artifacts (None = system temp dir).
    pub directory: Option<PathBuf>,
    /// Copy buffer size in bytes.
    pub chunk_size: usize,
    /// Sleep between status polls in [`download_update`](crate::update::Downloader::download_update).
    pub poll_interval_ms: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            temp_prefix: "farmland-update".to_owned(),
            directory: None,
            chunk_size: 32 * 1024,
            poll_interval_ms: 50,
        }
    }
}

impl DownloadConfig {
    /// Directory downloads land in.
    pub fn target_dir(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Whole-request timeout in seconds.
    ///
    /// Unset by default: a hung server stalls the check or download until
    /// the connection drops. Setting a value changes that behavior.
    pub timeout_secs: Option<u64>,
}

impl NetworkConfig {
    /// Build the shared HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn build_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        builder
            .build()
            .map_err(|e| UpdateError::Config(format!("cannot build HTTP client: {e}")))
    }
}

/// Permanent install settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Directory name under LocalAppData.
    pub dir_name: String,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            dir_name: "Farmland".to_owned(),
        }
    }
}

impl UpdaterConfig {
    /// Config with an explicit running version.
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            current_version: version.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| UpdateError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| UpdateError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/farmland/updater.toml`.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("farmland")
            .join("updater.toml")
    }
}
