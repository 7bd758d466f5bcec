//! Relaunch the (updated) executable and exit.

use std::convert::Infallible;
use std::path::Path;

use super::launcher::{ProcessLauncher, StdioMode};
use crate::error::Result;

/// Start a new instance of `executable` sharing this process's stdout/stderr.
///
/// # Errors
///
/// Returns [`UpdateError::Launch`](crate::UpdateError::Launch) if the new
/// instance cannot be started.
pub fn spawn_replacement(launcher: &dyn ProcessLauncher, executable: &Path) -> Result<()> {
    launcher.spawn_detached(executable, &[], StdioMode::Inherit)
}

/// Start a new instance of `executable` and terminate this one with exit
/// code 0.
///
/// No shutdown hooks run after the spawn; callers close persistent state
/// before invoking this.
///
/// # Errors
///
/// Only returns if the new instance could not be started.
pub fn restart_app(launcher: &dyn ProcessLauncher, executable: &Path) -> Result<Infallible> {
    spawn_replacement(launcher, executable)?;
    tracing::info!(executable = %executable.display(), "new instance started, exiting");
    std::process::exit(0)
}
