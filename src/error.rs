//! Error types for the self-update workflow.

/// Top-level error type for release resolution, download, apply and restart.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    /// The release index or artifact host could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The release index answered with a non-success status other than 404.
    #[error("release index returned status {0}")]
    Status(u16),

    /// The release payload could not be decoded.
    #[error("failed to parse release: {0}")]
    Parse(String),

    /// The artifact transfer failed (recorded session error).
    #[error("download failed: {0}")]
    Download(String),

    /// `apply` was called without a completed download on record.
    #[error("no update file found - please download again")]
    NoUpdateFile,

    /// The recorded download is no longer on disk.
    #[error("update file is missing or inaccessible: {0}")]
    MissingUpdateFile(String),

    /// The path of the running executable could not be resolved.
    #[error("could not determine current application path: {0}")]
    CurrentExe(String),

    /// Replacing the executable failed.
    #[error("install error: {0}")]
    Install(String),

    /// The privileged fallback failed or was declined.
    #[error("elevation error: {0}")]
    Elevation(String),

    /// A child process (installer or new instance) could not be started.
    #[error("launch error: {0}")]
    Launch(String),

    /// The downloaded archive did not yield a usable executable.
    #[error("archive error: {0}")]
    Archive(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, UpdateError>;
