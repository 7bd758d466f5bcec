//! Permanent installation of a portable Windows build.
//!
//! A freshly downloaded `farmland.exe` can run from anywhere. Installing
//! copies it under LocalAppData, adds Desktop and Start Menu shortcuts, and
//! relaunches from there so later updates replace a stable path.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{info, warn};

use crate::error::{Result, UpdateError};
use crate::platform::PlatformTarget;

/// Result of [`install_executable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Not a Windows build; nothing to do.
    NotApplicable,
    /// Already running from the install location.
    AlreadyInstalled {
        /// Installed executable.
        executable: PathBuf,
    },
    /// Copied into the install location. The installed copy should be
    /// launched and this process should exit.
    Installed {
        /// Installed executable.
        executable: PathBuf,
    },
}

/// Where the permanent install and its shortcuts live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    /// Directory holding the installed executable.
    pub install_dir: PathBuf,
    /// Desktop shortcut to create, if any.
    pub desktop_shortcut: Option<PathBuf>,
    /// Start Menu shortcut to create, if any.
    pub start_menu_shortcut: Option<PathBuf>,
}

impl InstallLayout {
    /// Standard per-user layout: `%LOCALAPPDATA%\<dir_name>`, with shortcuts
    /// on the Desktop and in the Start Menu programs folder.
    pub fn per_user(dir_name: &str) -> Option<Self> {
        let install_dir = dirs::data_local_dir()?.join(dir_name);
        let link = format!("{dir_name}.lnk");
        Some(Self {
            install_dir,
            desktop_shortcut: dirs::desktop_dir().map(|d| d.join(&link)),
            start_menu_shortcut: dirs::data_dir().map(|d| {
                d.join("Microsoft")
                    .join("Windows")
                    .join("Start Menu")
                    .join("Programs")
                    .join(&link)
            }),
        })
    }

    /// Path of the installed executable.
    pub fn executable(&self, app_name: &str) -> PathBuf {
        self.install_dir.join(format!("{app_name}.exe"))
    }
}

/// Whether `executable` runs from `<local_data>/<dir_name>`.
///
/// Only Windows builds are ever "not installed"; unknown paths count as
/// installed so the UI never nags on a lookup failure.
pub fn is_installed(
    platform: &PlatformTarget,
    executable: Option<&Path>,
    local_data: Option<&Path>,
    dir_name: &str,
) -> bool {
    if !platform.is_windows() {
        return true;
    }
    let (Some(executable), Some(local_data)) = (executable, local_data) else {
        return true;
    };
    let install_path = local_data.join(dir_name);
    executable
        .to_string_lossy()
        .to_lowercase()
        .starts_with(&install_path.to_string_lossy().to_lowercase())
}

/// Copy `current` into the install layout and create shortcuts.
///
/// Shortcut failures are logged, not returned.
///
/// # Errors
///
/// Returns [`UpdateError::Install`] if the directory cannot be created or
/// the executable cannot be copied.
pub fn install_executable(
    current: &Path,
    layout: &InstallLayout,
    app_name: &str,
) -> Result<InstallOutcome> {
    let target = layout.executable(app_name);
    if same_path(current, &target) {
        return Ok(InstallOutcome::AlreadyInstalled { executable: target });
    }

    std::fs::create_dir_all(&layout.install_dir).map_err(|e| {
        UpdateError::Install(format!(
            "failed to create install directory {}: {e}",
            layout.install_dir.display()
        ))
    })?;
    std::fs::copy(current, &target).map_err(|e| {
        UpdateError::Install(format!(
            "failed to copy executable to {}: {e}",
            target.display()
        ))
    })?;
    info!(executable = %target.display(), "installed to system");

    for link in [&layout.desktop_shortcut, &layout.start_menu_shortcut]
        .into_iter()
        .flatten()
    {
        if let Err(e) = create_shortcut(&target, link) {
            warn!(link = %link.display(), error = %e, "cannot create shortcut");
        }
    }

    Ok(InstallOutcome::Installed { executable: target })
}

fn same_path(a: &Path, b: &Path) -> bool {
    a.to_string_lossy()
        .eq_ignore_ascii_case(&b.to_string_lossy())
}

fn ps_literal(value: &Path) -> String {
    format!("'{}'", value.to_string_lossy().replace('\'', "''"))
}

fn shortcut_script(target: &Path, link: &Path) -> String {
    let working_dir = target.parent().unwrap_or(target);
    format!(
        "$s = New-Object -ComObject WScript.Shell; $g = $s.CreateShortcut({}); $g.TargetPath = {}; $g.WorkingDirectory = {}; $g.Save()",
        ps_literal(link),
        ps_literal(target),
        ps_literal(working_dir)
    )
}

fn create_shortcut(target: &Path, link: &Path) -> Result<()> {
    if let Some(parent) = link.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let status = Command::new("powershell")
        .args(["-NoProfile", "-NonInteractive", "-Command", &shortcut_script(target, link)])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;
    if !status.success() {
        return Err(UpdateError::Install(format!(
            "shortcut script exited with {:?}",
            status.code()
        )));
    }
    Ok(())
}
