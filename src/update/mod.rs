//! Self-update system for Farmland.
//!
//! Resolves the latest GitHub release, downloads the artifact for this
//! platform in the background, replaces the running executable and
//! relaunches it. The UI drives every step and owns retry decisions:
//!
//! check_for_updates -> start_download -> poll download_status
//! -> apply_update -> restart_app

pub mod applier;
pub mod archive;
pub mod assets;
pub mod checker;
pub mod download;
pub mod install;
pub mod launcher;
pub mod release;
pub mod restart;
pub mod version;

pub use applier::{Applier, ApplyOutcome, ArtifactKind, ReplaceStrategy};
pub use checker::ReleaseResolver;
pub use download::{DownloadStatus, DownloadedArtifact, Downloader};
pub use install::{InstallLayout, InstallOutcome};
pub use launcher::{ProcessLauncher, StdioMode, SystemLauncher};
pub use release::{ReleaseAsset, ReleaseInfo, UpdateDecision};
pub use version::is_newer;

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::UpdaterConfig;
use crate::error::{Result, UpdateError};
use crate::platform::{PlatformTarget, PrivilegedExecutor, create_executor};

/// Entry point the UI talks to; one per application instance.
pub struct Updater {
    config: UpdaterConfig,
    platform: PlatformTarget,
    resolver: ReleaseResolver,
    downloader: Downloader,
    applier: Applier,
    launcher: Arc<dyn ProcessLauncher>,
}

impl Updater {
    /// Updater for the running platform with system process handling.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: UpdaterConfig) -> Result<Self> {
        let client = config.network.build_client()?;
        Ok(Self::with_components(
            config,
            client,
            PlatformTarget::current(),
            Arc::new(SystemLauncher),
            Arc::from(create_executor()),
        ))
    }

    /// Updater with explicit collaborators.
    pub fn with_components(
        config: UpdaterConfig,
        client: reqwest::Client,
        platform: PlatformTarget,
        launcher: Arc<dyn ProcessLauncher>,
        elevator: Arc<dyn PrivilegedExecutor>,
    ) -> Self {
        let resolver =
            ReleaseResolver::new(client.clone(), config.clone()).with_platform(platform.clone());
        let downloader = Downloader::new(client, config.download.clone());
        let applier = Applier::new(launcher.clone(), elevator, &platform);
        Self {
            config,
            platform,
            resolver,
            downloader,
            applier,
            launcher,
        }
    }

    /// Replace and relaunch `path` instead of the running executable.
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.applier = self.applier.with_executable(path);
        self
    }

    /// Override how the executable is swapped.
    pub fn with_strategy(mut self, strategy: ReplaceStrategy) -> Self {
        self.applier = self.applier.with_strategy(strategy);
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    /// Version of the running build.
    pub fn current_version(&self) -> &str {
        &self.config.current_version
    }

    /// `{os, arch}` of the running build.
    pub fn platform_info(&self) -> BTreeMap<&'static str, String> {
        self.platform.info()
    }

    /// See [`ReleaseResolver::check_for_updates`].
    ///
    /// # Errors
    ///
    /// Network, status and parse failures of the release index.
    pub async fn check_for_updates(&self) -> Result<UpdateDecision> {
        self.resolver.check_for_updates().await
    }

    /// See [`Downloader::start_download`].
    pub fn start_download(&self, url: &str) {
        self.downloader.start_download(url);
    }

    /// See [`Downloader::download_status`].
    pub fn download_status(&self) -> DownloadStatus {
        self.downloader.download_status()
    }

    /// Current download percentage.
    pub fn download_progress(&self) -> f64 {
        self.downloader.progress()
    }

    /// See [`Downloader::download_update`].
    ///
    /// # Errors
    ///
    /// Returns the recorded download error.
    pub async fn download_update(&self, url: &str) -> Result<PathBuf> {
        self.downloader.download_update(url).await
    }

    /// Apply the completed download.
    ///
    /// The download record is consumed by any attempt that reaches the
    /// artifact, so a second call fails with
    /// [`UpdateError::NoUpdateFile`] instead of silently succeeding. It is
    /// kept only when the executable path cannot be resolved.
    ///
    /// # Errors
    ///
    /// [`UpdateError::NoUpdateFile`] without a completed download, otherwise
    /// see [`Applier::apply`].
    pub fn apply_update(&self) -> Result<ApplyOutcome> {
        let (generation, artifact) = self
            .downloader
            .current_artifact()
            .ok_or(UpdateError::NoUpdateFile)?;

        let result = self.applier.apply(&artifact);
        match &result {
            Err(UpdateError::CurrentExe(_)) => {}
            Ok(outcome) => {
                tracing::info!(?outcome, "update applied");
                self.downloader.clear_artifact(generation);
            }
            Err(e) => {
                tracing::warn!(error = %e, "update apply failed");
                self.downloader.clear_artifact(generation);
            }
        }
        result
    }

    /// Launch a new instance of the (updated) executable and exit.
    ///
    /// # Errors
    ///
    /// Only returns if the executable cannot be located or started.
    pub fn restart_app(&self) -> Result<Infallible> {
        let executable = self.applier.current_exe()?;
        restart::restart_app(self.launcher.as_ref(), &executable)
    }

    /// Whether the app runs from its permanent install location.
    pub fn is_installed(&self) -> bool {
        let executable = self.applier.current_exe().ok();
        let local_data = dirs::data_local_dir();
        install::is_installed(
            &self.platform,
            executable.as_deref(),
            local_data.as_deref(),
            &self.config.install.dir_name,
        )
    }

    /// Install a portable Windows build permanently, then relaunch from the
    /// installed copy and exit.
    ///
    /// Returns normally only when there is nothing to install.
    ///
    /// # Errors
    ///
    /// Returns an error if the install location is unknown, the copy fails,
    /// or the installed copy cannot be started.
    pub fn install_to_system(&self) -> Result<InstallOutcome> {
        if !self.platform.is_windows() {
            return Ok(InstallOutcome::NotApplicable);
        }
        let current = self.applier.current_exe()?;
        let layout = InstallLayout::per_user(&self.config.install.dir_name).ok_or_else(|| {
            UpdateError::Install("could not find LocalAppData directory".to_owned())
        })?;
        self.install_into(&current, &layout)
    }

    fn install_into(&self, current: &Path, layout: &InstallLayout) -> Result<InstallOutcome> {
        match install::install_executable(current, layout, &self.config.app_name)? {
            InstallOutcome::Installed { executable } => {
                restart::restart_app(self.launcher.as_ref(), &executable)
                    .map(|never| match never {})
            }
            other => Ok(other),
        }
    }
}
