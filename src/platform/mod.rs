//! Platform detection and privileged file operations.
//!
//! [`PlatformTarget`] picks the release asset naming patterns and the apply
//! strategy for the running OS/architecture. [`PrivilegedExecutor`] performs
//! file moves with escalated rights when the running executable is locked;
//! on Windows this goes through a PowerShell `RunAs` prompt, elsewhere a
//! stub reports that elevation is unavailable.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::error::Result;

mod stub;
mod windows;

pub use stub::UnsupportedExecutor;
pub use windows::PowerShellExecutor;

/// Operating system family, named the way release assets name them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Os {
    /// Microsoft Windows.
    Windows,
    /// Apple macOS (`darwin` in asset names).
    MacOs,
    /// Linux.
    Linux,
    /// Anything else; no assets are published for it.
    Other(String),
}

impl Os {
    /// The running operating system.
    pub fn current() -> Self {
        Self::from_std(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` value.
    pub fn from_std(os: &str) -> Self {
        match os {
            "windows" => Self::Windows,
            "macos" => Self::MacOs,
            "linux" => Self::Linux,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Name used in asset filenames and the platform info map.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Windows => "windows",
            Self::MacOs => "darwin",
            Self::Linux => "linux",
            Self::Other(name) => name,
        }
    }
}

/// Map a `std::env::consts::ARCH` value to its asset name.
pub fn arch_name(arch: &str) -> &str {
    match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        other => other,
    }
}

/// Operating system + architecture pair of the running build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformTarget {
    /// Operating system.
    pub os: Os,
    /// Architecture, already in asset naming (`amd64`, `arm64`, ...).
    pub arch: String,
}

impl PlatformTarget {
    /// Create a target from explicit parts.
    pub fn new(os: Os, arch: impl Into<String>) -> Self {
        Self {
            os,
            arch: arch.into(),
        }
    }

    /// The platform this binary was built for.
    pub fn current() -> Self {
        Self::new(Os::current(), arch_name(std::env::consts::ARCH))
    }

    /// Whether the rename-swap apply strategy is required.
    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }

    /// Acceptable asset filenames for this platform, in priority order.
    pub fn asset_patterns(&self, app: &str) -> Vec<String> {
        let arch = &self.arch;
        match self.os {
            Os::Windows => vec![
                format!("{app}-windows-{arch}-installer.exe"),
                format!("{app}-windows-{arch}.exe"),
                format!("{app}.exe"),
            ],
            Os::MacOs => vec![
                format!("{app}-darwin-{arch}.zip"),
                format!("{app}-macos-{arch}.zip"),
            ],
            Os::Linux => vec![
                format!("{app}-linux-{arch}.deb"),
                format!("{app}-linux-{arch}.rpm"),
                format!("{app}-linux-{arch}.tar.gz"),
            ],
            Os::Other(_) => Vec::new(),
        }
    }

    /// `{os, arch}` map reported to the UI.
    pub fn info(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("os", self.os.as_str().to_owned()),
            ("arch", self.arch.clone()),
        ])
    }
}

impl fmt::Display for PlatformTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os.as_str(), self.arch)
    }
}

/// A single `from -> to` move carried out by a [`PrivilegedExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMove {
    /// Source path.
    pub from: PathBuf,
    /// Destination path (overwritten if present).
    pub to: PathBuf,
}

impl FileMove {
    /// Create a move.
    pub fn new(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Moves files with escalated privileges.
///
/// All moves of one call run behind a single elevation prompt, in order.
pub trait PrivilegedExecutor: Send + Sync {
    /// Move every `from` to its `to`, overwriting existing destinations.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Elevation`](crate::UpdateError::Elevation) if
    /// elevation is unavailable, declined, or the moves fail.
    fn move_files(&self, moves: &[FileMove]) -> Result<()>;
}

/// Create the platform-appropriate privileged executor.
///
/// Returns the PowerShell implementation on Windows,
/// or a stub that always fails on all other platforms.
pub fn create_executor() -> Box<dyn PrivilegedExecutor> {
    #[cfg(target_os = "windows")]
    {
        Box::new(PowerShellExecutor)
    }
    #[cfg(not(target_os = "windows"))]
    {
        Box::new(UnsupportedExecutor)
    }
}
