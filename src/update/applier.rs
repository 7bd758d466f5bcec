//! Platform-specific update application.
//!
//! Replaces the running executable with a downloaded artifact using the
//! platform-appropriate mechanism: rename-swap with an elevated fallback on
//! Windows, atomic in-place replacement on Linux/macOS, or a handoff to a
//! native installer when the artifact is one.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use tracing::{info, warn};

use super::archive::{ArchiveFormat, extract_executable};
use super::assets::is_installer_name;
use super::download::{DownloadedArtifact, artifact_extension};
use super::launcher::{ProcessLauncher, StdioMode};
use crate::error::{Result, UpdateError};
use crate::platform::{FileMove, PlatformTarget, PrivilegedExecutor};

/// Result of an update application attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Executable replaced. Restart required.
    RestartRequired {
        /// Path of the replaced executable.
        executable: PathBuf,
    },
    /// Executable replaced by the elevated helper. Restart required.
    ElevatedReplace {
        /// Path of the replaced executable.
        executable: PathBuf,
    },
    /// A native installer was started and owns the replacement. App should exit.
    InstallerLaunched {
        /// Path of the running installer.
        installer: PathBuf,
    },
}

/// What a downloaded artifact is, decided from its published name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Self-contained installer executable.
    Installer,
    /// System package (`.deb`, `.rpm`) handed to the desktop package installer.
    Package,
    /// Archive containing the executable.
    Archive(ArchiveFormat),
    /// The raw replacement executable.
    Binary,
}

impl ArtifactKind {
    /// Classify an artifact by its published name.
    pub fn classify(asset_name: &str) -> Self {
        if is_installer_name(asset_name) {
            return Self::Installer;
        }
        match artifact_extension(asset_name).to_lowercase().as_str() {
            ".deb" | ".rpm" => Self::Package,
            ".zip" => Self::Archive(ArchiveFormat::Zip),
            ".tar.gz" => Self::Archive(ArchiveFormat::TarGz),
            _ => Self::Binary,
        }
    }
}

/// How the executable file is swapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceStrategy {
    /// Rename the running executable to a timestamped backup, then copy the
    /// new one into place. Required where running executables are locked.
    RenameSwap,
    /// Stage next to the executable and rename over it.
    InPlace,
}

impl ReplaceStrategy {
    /// Strategy for a platform.
    pub fn for_platform(platform: &PlatformTarget) -> Self {
        if platform.is_windows() {
            Self::RenameSwap
        } else {
            Self::InPlace
        }
    }
}

/// Filesystem calls made by the rename-swap replacement.
pub(crate) trait SwapFs: Send + Sync {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64>;
}

struct StdFs;

impl SwapFs for StdFs {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        fs::copy(from, to)
    }
}

/// Applies a downloaded artifact to the running installation.
pub struct Applier {
    launcher: Arc<dyn ProcessLauncher>,
    elevator: Arc<dyn PrivilegedExecutor>,
    strategy: ReplaceStrategy,
    executable: Option<PathBuf>,
    fs: Arc<dyn SwapFs>,
}

impl Applier {
    /// Applier for `platform`, replacing the running executable.
    pub fn new(
        launcher: Arc<dyn ProcessLauncher>,
        elevator: Arc<dyn PrivilegedExecutor>,
        platform: &PlatformTarget,
    ) -> Self {
        Self {
            launcher,
            elevator,
            strategy: ReplaceStrategy::for_platform(platform),
            executable: None,
            fs: Arc::new(StdFs),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_fs(mut self, fs: Arc<dyn SwapFs>) -> Self {
        self.fs = fs;
        self
    }

    /// Replace `path` instead of the running executable.
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    /// Override the replace strategy.
    pub fn with_strategy(mut self, strategy: ReplaceStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Path of the executable this applier replaces.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::CurrentExe`] if the path cannot be determined.
    pub fn current_exe(&self) -> Result<PathBuf> {
        match &self.executable {
            Some(path) => Ok(path.clone()),
            None => current_exe_path(),
        }
    }

    /// Apply `artifact`.
    ///
    /// The artifact file is consumed: removed after a replacement attempt,
    /// handed over to the installer otherwise. Nothing is touched when the
    /// artifact is missing or the executable path cannot be resolved.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::MissingUpdateFile`], [`UpdateError::CurrentExe`],
    /// [`UpdateError::Launch`], [`UpdateError::Archive`],
    /// [`UpdateError::Install`] or [`UpdateError::Elevation`].
    pub fn apply(&self, artifact: &DownloadedArtifact) -> Result<ApplyOutcome> {
        fs::metadata(&artifact.path).map_err(|e| {
            UpdateError::MissingUpdateFile(format!("{}: {e}", artifact.path.display()))
        })?;
        let executable = self.current_exe()?;
        let kind = ArtifactKind::classify(&artifact.asset_name);
        info!(asset = %artifact.asset_name, ?kind, strategy = ?self.strategy, "applying update");

        match kind {
            ArtifactKind::Installer => {
                self.launcher
                    .spawn_detached(&artifact.path, &[], StdioMode::Null)?;
                Ok(ApplyOutcome::InstallerLaunched {
                    installer: artifact.path.clone(),
                })
            }
            ArtifactKind::Package => {
                let args = [OsString::from(artifact.path.as_os_str())];
                self.launcher
                    .spawn_detached(Path::new("xdg-open"), &args, StdioMode::Null)?;
                Ok(ApplyOutcome::InstallerLaunched {
                    installer: artifact.path.clone(),
                })
            }
            ArtifactKind::Archive(format) => {
                let staged = staged_path(&artifact.path, &executable);
                let result = extract_executable(
                    &artifact.path,
                    format,
                    &executable_name(&executable),
                    &staged,
                )
                .and_then(|()| self.replace(&staged, &executable));
                remove_quietly(&staged);
                remove_quietly(&artifact.path);
                result
            }
            ArtifactKind::Binary => {
                let result = self.replace(&artifact.path, &executable);
                remove_quietly(&artifact.path);
                result
            }
        }
    }

    fn replace(&self, new_binary: &Path, executable: &Path) -> Result<ApplyOutcome> {
        match self.strategy {
            ReplaceStrategy::RenameSwap => self.replace_rename_swap(new_binary, executable),
            ReplaceStrategy::InPlace => replace_in_place(new_binary, executable),
        }
    }

    /// Rename old -> timestamped backup, copy new -> target. Access denial
    /// falls back to the privileged executor.
    fn replace_rename_swap(&self, new_binary: &Path, executable: &Path) -> Result<ApplyOutcome> {
        let backup = backup_path(executable, Local::now());

        if let Err(e) = self.fs.rename(executable, &backup) {
            if e.kind() == io::ErrorKind::PermissionDenied {
                warn!("access denied renaming executable, attempting elevated update");
                self.elevator.move_files(&[
                    FileMove::new(executable, &backup),
                    FileMove::new(new_binary, executable),
                ])?;
                return Ok(ApplyOutcome::ElevatedReplace {
                    executable: executable.to_path_buf(),
                });
            }
            return Err(UpdateError::Install(format!(
                "failed to move current version to {}: {e} (check permissions)",
                backup.file_name().unwrap_or_default().to_string_lossy()
            )));
        }

        if let Err(e) = self.fs.copy(new_binary, executable) {
            if let Err(restore_err) = self.fs.rename(&backup, executable) {
                warn!(
                    backup = %backup.display(),
                    error = %restore_err,
                    "cannot restore previous executable"
                );
            }
            if e.kind() == io::ErrorKind::PermissionDenied {
                warn!("access denied writing executable, attempting elevated update");
                match self
                    .elevator
                    .move_files(&[FileMove::new(new_binary, executable)])
                {
                    Ok(()) => {
                        return Ok(ApplyOutcome::ElevatedReplace {
                            executable: executable.to_path_buf(),
                        });
                    }
                    Err(elevation_err) => warn!(error = %elevation_err, "elevated copy failed"),
                }
            }
            return Err(UpdateError::Install(format!(
                "failed to install new binary to {}: {e}",
                executable.display()
            )));
        }

        // The backup stays: a running executable cannot delete itself here.
        info!(
            executable = %executable.display(),
            backup = %backup.display(),
            "binary updated"
        );
        Ok(ApplyOutcome::RestartRequired {
            executable: executable.to_path_buf(),
        })
    }
}

/// Unix binary replacement: copy new -> sibling staging file, mark it
/// executable, rename it over the target.
fn replace_in_place(new_binary: &Path, executable: &Path) -> Result<ApplyOutcome> {
    let staging = sibling_staging_path(executable);

    let install = || -> io::Result<()> {
        fs::copy(new_binary, &staging)?;
        set_executable(&staging)?;
        fs::rename(&staging, executable)
    };
    if let Err(e) = install() {
        remove_quietly(&staging);
        return Err(UpdateError::Install(format!(
            "failed to copy update to {}: {e}",
            executable.display()
        )));
    }

    clear_quarantine(executable);
    info!("binary updated at {}", executable.display());
    Ok(ApplyOutcome::RestartRequired {
        executable: executable.to_path_buf(),
    })
}

/// Returns the path to the currently running executable.
///
/// # Errors
///
/// Returns an error if the path cannot be determined.
pub fn current_exe_path() -> Result<PathBuf> {
    std::env::current_exe().map_err(|e| UpdateError::CurrentExe(e.to_string()))
}

/// `<exe>.<YYYYmmddHHMMSS>.old`, unique per second so a backup left by an
/// earlier failed update never blocks the rename.
fn backup_path(executable: &Path, now: DateTime<Local>) -> PathBuf {
    let mut name = executable.as_os_str().to_owned();
    name.push(format!(".{}.old", now.format("%Y%m%d%H%M%S")));
    PathBuf::from(name)
}

fn sibling_staging_path(executable: &Path) -> PathBuf {
    executable.with_file_name(format!(".{}.update", executable_name(executable)))
}

fn staged_path(artifact: &Path, executable: &Path) -> PathBuf {
    artifact.with_file_name(format!("{}.staged", executable_name(executable)))
}

fn executable_name(executable: &Path) -> String {
    executable
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn remove_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "cannot remove update file"),
    }
}

/// Set executable permission on Unix platforms.
fn set_executable(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    }
    let _ = path;
    Ok(())
}

/// Clear the macOS quarantine attribute so Gatekeeper does not block the
/// relaunch.
fn clear_quarantine(path: &Path) {
    #[cfg(target_os = "macos")]
    {
        let _ = std::process::Command::new("xattr")
            .args(["-c", &path.to_string_lossy()])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status();
    }
    let _ = path;
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::platform::{Os, UnsupportedExecutor};
    use crate::update::launcher::testing::RecordingLauncher;
    use chrono::TimeZone;

    fn applier(launcher: Arc<RecordingLauncher>, exe: &Path, strategy: ReplaceStrategy) -> Applier {
        Applier::new(
            launcher,
            Arc::new(UnsupportedExecutor),
            &PlatformTarget::new(Os::Linux, "amd64"),
        )
        .with_executable(exe)
        .with_strategy(strategy)
    }

    fn artifact(path: PathBuf, asset_name: &str) -> DownloadedArtifact {
        DownloadedArtifact {
            path,
            asset_name: asset_name.to_owned(),
        }
    }

    fn old_files(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.to_string_lossy().ends_with(".old"))
            .collect()
    }

    #[test]
    fn classify_by_name() {
        assert_eq!(
            ArtifactKind::classify("farmland-windows-amd64-installer.exe"),
            ArtifactKind::Installer
        );
        assert_eq!(ArtifactKind::classify("farmland-linux-amd64.deb"), ArtifactKind::Package);
        assert_eq!(ArtifactKind::classify("farmland-linux-amd64.RPM"), ArtifactKind::Package);
        assert_eq!(
            ArtifactKind::classify("farmland-darwin-arm64.zip"),
            ArtifactKind::Archive(ArchiveFormat::Zip)
        );
        assert_eq!(
            ArtifactKind::classify("farmland-linux-amd64.tar.gz"),
            ArtifactKind::Archive(ArchiveFormat::TarGz)
        );
        assert_eq!(ArtifactKind::classify("farmland.exe"), ArtifactKind::Binary);
    }

    #[test]
    fn strategy_follows_platform() {
        assert_eq!(
            ReplaceStrategy::for_platform(&PlatformTarget::new(Os::Windows, "amd64")),
            ReplaceStrategy::RenameSwap
        );
        assert_eq!(
            ReplaceStrategy::for_platform(&PlatformTarget::new(Os::MacOs, "arm64")),
            ReplaceStrategy::InPlace
        );
    }

    #[test]
    fn backup_name_is_timestamped() {
        let now = Local.with_ymd_and_hms(2026, 10, 16, 9, 5, 7).unwrap();
        let backup = backup_path(Path::new("/opt/farmland/farmland.exe"), now);
        assert_eq!(
            backup,
            PathBuf::from("/opt/farmland/farmland.exe.20261016090507.old")
        );
    }

    #[test]
    fn current_exe_path_returns_ok() {
        let path = current_exe_path().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn missing_artifact_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("farmland");
        fs::write(&exe, "old").unwrap();
        let launcher = Arc::new(RecordingLauncher::default());

        let err = applier(launcher.clone(), &exe, ReplaceStrategy::InPlace)
            .apply(&artifact(dir.path().join("gone"), "farmland"))
            .unwrap_err();
        assert!(matches!(err, UpdateError::MissingUpdateFile(_)));
        assert_eq!(fs::read_to_string(&exe).unwrap(), "old");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn in_place_replaces_and_marks_executable() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("farmland");
        let download = dir.path().join("farmland-update");
        fs::write(&exe, "old-content").unwrap();
        fs::write(&download, "new-content").unwrap();

        let outcome = applier(
            Arc::new(RecordingLauncher::default()),
            &exe,
            ReplaceStrategy::InPlace,
        )
        .apply(&artifact(download.clone(), "farmland-linux-amd64"))
        .unwrap();

        assert_eq!(outcome, ApplyOutcome::RestartRequired { executable: exe.clone() });
        assert_eq!(fs::read_to_string(&exe).unwrap(), "new-content");
        assert!(!download.exists());
        assert!(!sibling_staging_path(&exe).exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&exe).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[test]
    fn rename_swap_keeps_backup() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("farmland.exe");
        let download = dir.path().join("farmland-update.exe");
        fs::write(&exe, "old-content").unwrap();
        fs::write(&download, "new-content").unwrap();

        let outcome = applier(
            Arc::new(RecordingLauncher::default()),
            &exe,
            ReplaceStrategy::RenameSwap,
        )
        .apply(&artifact(download.clone(), "farmland-windows-amd64.exe"))
        .unwrap();

        assert!(matches!(outcome, ApplyOutcome::RestartRequired { .. }));
        assert_eq!(fs::read_to_string(&exe).unwrap(), "new-content");
        assert!(!download.exists());
        let backups = old_files(dir.path());
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read_to_string(&backups[0]).unwrap(), "old-content");
    }

    #[test]
    fn rename_swap_restores_original_when_copy_fails() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("farmland.exe");
        fs::write(&exe, "old-content").unwrap();
        // A directory passes the existence check but cannot be copied.
        let download = dir.path().join("farmland-update.exe");
        fs::create_dir(&download).unwrap();

        let err = applier(
            Arc::new(RecordingLauncher::default()),
            &exe,
            ReplaceStrategy::RenameSwap,
        )
        .apply(&artifact(download, "farmland.exe"))
        .unwrap_err();

        assert!(matches!(err, UpdateError::Install(_)));
        assert_eq!(fs::read_to_string(&exe).unwrap(), "old-content");
        assert!(old_files(dir.path()).is_empty());
    }

    #[test]
    fn installer_is_launched_not_copied() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("farmland.exe");
        let download = dir.path().join("farmland-update.exe");
        fs::write(&exe, "old-content").unwrap();
        fs::write(&download, "installer").unwrap();
        let launcher = Arc::new(RecordingLauncher::default());

        let outcome = applier(launcher.clone(), &exe, ReplaceStrategy::RenameSwap)
            .apply(&artifact(download.clone(), "farmland-windows-amd64-installer.exe"))
            .unwrap();

        assert_eq!(
            outcome,
            ApplyOutcome::InstallerLaunched {
                installer: download.clone()
            }
        );
        assert_eq!(fs::read_to_string(&exe).unwrap(), "old-content");
        assert!(download.exists());
        let launches = launcher.launches.lock().unwrap();
        assert_eq!(launches.len(), 1);
        assert_eq!(launches[0].0, download);
        assert_eq!(launches[0].2, StdioMode::Null);
    }

    #[test]
    fn package_is_opened_with_desktop_handler() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("farmland");
        let download = dir.path().join("farmland-update.deb");
        fs::write(&exe, "old").unwrap();
        fs::write(&download, "deb").unwrap();
        let launcher = Arc::new(RecordingLauncher::default());

        applier(launcher.clone(), &exe, ReplaceStrategy::InPlace)
            .apply(&artifact(download.clone(), "farmland-linux-amd64.deb"))
            .unwrap();

        let launches = launcher.launches.lock().unwrap();
        assert_eq!(launches[0].0, PathBuf::from("xdg-open"));
        assert_eq!(launches[0].1, vec![OsString::from(download.as_os_str())]);
    }

    #[test]
    fn installer_launch_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("farmland.exe");
        let download = dir.path().join("farmland-update.exe");
        fs::write(&exe, "old").unwrap();
        fs::write(&download, "installer").unwrap();
        let launcher = Arc::new(RecordingLauncher {
            fail: true,
            ..RecordingLauncher::default()
        });

        let err = applier(launcher, &exe, ReplaceStrategy::RenameSwap)
            .apply(&artifact(download, "farmland-windows-amd64-installer.exe"))
            .unwrap_err();
        assert!(matches!(err, UpdateError::Launch(_)));
    }

    #[test]
    fn tarball_is_unpacked_before_replace() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("farmland");
        fs::write(&exe, "old").unwrap();

        let download = dir.path().join("farmland-update.tar.gz");
        let encoder = flate2::write::GzEncoder::new(
            fs::File::create(&download).unwrap(),
            flate2::Compression::default(),
        );
        let mut builder = tar::Builder::new(encoder);
        let data = b"unpacked-binary";
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o755);
        builder
            .append_data(&mut header, "farmland-linux-amd64/farmland", &data[..])
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap();

        applier(
            Arc::new(RecordingLauncher::default()),
            &exe,
            ReplaceStrategy::InPlace,
        )
        .apply(&artifact(download.clone(), "farmland-linux-amd64.tar.gz"))
        .unwrap();

        assert_eq!(fs::read(&exe).unwrap(), data);
        assert!(!download.exists());
        assert!(!staged_path(&download, &exe).exists());
    }

    /// Denies selected renames and copies with `PermissionDenied`.
    #[derive(Default)]
    struct DeniedFs {
        rename_from: Option<PathBuf>,
        copy_to: Option<PathBuf>,
    }

    impl SwapFs for DeniedFs {
        fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
            if self.rename_from.as_deref() == Some(from) {
                return Err(io::Error::from(io::ErrorKind::PermissionDenied));
            }
            fs::rename(from, to)
        }

        fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
            if self.copy_to.as_deref() == Some(to) {
                return Err(io::Error::from(io::ErrorKind::PermissionDenied));
            }
            fs::copy(from, to)
        }
    }

    #[derive(Default)]
    struct RecordingExecutor {
        moves: std::sync::Mutex<Vec<FileMove>>,
        refuse: bool,
    }

    impl PrivilegedExecutor for RecordingExecutor {
        fn move_files(&self, moves: &[FileMove]) -> Result<()> {
            self.moves.lock().unwrap().extend_from_slice(moves);
            if self.refuse {
                return Err(UpdateError::Elevation("prompt declined".to_owned()));
            }
            Ok(())
        }
    }

    struct SwapFixture {
        _dir: tempfile::TempDir,
        exe: PathBuf,
        download: PathBuf,
    }

    fn swap_fixture() -> SwapFixture {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("farmland.exe");
        let download = dir.path().join("farmland-update.exe");
        fs::write(&exe, "old-content").unwrap();
        fs::write(&download, "new-content").unwrap();
        SwapFixture {
            _dir: dir,
            exe,
            download,
        }
    }

    fn elevated_applier(
        exe: &Path,
        executor: Arc<RecordingExecutor>,
        fs: DeniedFs,
    ) -> Applier {
        Applier::new(
            Arc::new(RecordingLauncher::default()),
            executor,
            &PlatformTarget::new(Os::Windows, "amd64"),
        )
        .with_executable(exe)
        .with_fs(Arc::new(fs))
    }

    #[test]
    fn denied_rename_moves_both_files_elevated() {
        let fx = swap_fixture();
        let executor = Arc::new(RecordingExecutor::default());
        let denied = DeniedFs {
            rename_from: Some(fx.exe.clone()),
            ..DeniedFs::default()
        };

        let outcome = elevated_applier(&fx.exe, executor.clone(), denied)
            .apply(&artifact(fx.download.clone(), "farmland-windows-amd64.exe"))
            .unwrap();

        assert_eq!(
            outcome,
            ApplyOutcome::ElevatedReplace {
                executable: fx.exe.clone()
            }
        );
        let moves = executor.moves.lock().unwrap();
        assert_eq!(moves.len(), 2);
        assert_eq!(moves[0].from, fx.exe);
        let backup = moves[0].to.to_string_lossy().into_owned();
        assert!(backup.starts_with(&*fx.exe.to_string_lossy()) && backup.ends_with(".old"));
        assert_eq!(moves[1], FileMove::new(&fx.download, &fx.exe));
    }

    #[test]
    fn declined_elevation_after_denied_rename_is_reported() {
        let fx = swap_fixture();
        let executor = Arc::new(RecordingExecutor {
            refuse: true,
            ..RecordingExecutor::default()
        });
        let denied = DeniedFs {
            rename_from: Some(fx.exe.clone()),
            ..DeniedFs::default()
        };

        let err = elevated_applier(&fx.exe, executor.clone(), denied)
            .apply(&artifact(fx.download.clone(), "farmland-windows-amd64.exe"))
            .unwrap_err();

        assert!(matches!(err, UpdateError::Elevation(_)), "got {err:?}");
        assert_eq!(fs::read_to_string(&fx.exe).unwrap(), "old-content");
        assert_eq!(executor.moves.lock().unwrap().len(), 2);
    }

    #[test]
    fn denied_copy_restores_backup_then_elevates() {
        let fx = swap_fixture();
        let executor = Arc::new(RecordingExecutor::default());
        let denied = DeniedFs {
            copy_to: Some(fx.exe.clone()),
            ..DeniedFs::default()
        };

        let outcome = elevated_applier(&fx.exe, executor.clone(), denied)
            .apply(&artifact(fx.download.clone(), "farmland-windows-amd64.exe"))
            .unwrap();

        assert!(matches!(outcome, ApplyOutcome::ElevatedReplace { .. }));
        assert_eq!(fs::read_to_string(&fx.exe).unwrap(), "old-content");
        assert!(old_files(fx.exe.parent().unwrap()).is_empty());
        assert_eq!(
            *executor.moves.lock().unwrap(),
            vec![FileMove::new(&fx.download, &fx.exe)]
        );
    }

    #[test]
    fn declined_elevation_after_denied_copy_keeps_original() {
        let fx = swap_fixture();
        let executor = Arc::new(RecordingExecutor {
            refuse: true,
            ..RecordingExecutor::default()
        });
        let denied = DeniedFs {
            copy_to: Some(fx.exe.clone()),
            ..DeniedFs::default()
        };

        let err = elevated_applier(&fx.exe, executor, denied)
            .apply(&artifact(fx.download.clone(), "farmland-windows-amd64.exe"))
            .unwrap_err();

        assert!(matches!(err, UpdateError::Install(_)), "got {err:?}");
        assert_eq!(fs::read_to_string(&fx.exe).unwrap(), "old-content");
        assert!(old_files(fx.exe.parent().unwrap()).is_empty());
    }
}
