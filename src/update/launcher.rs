//! Spawning detached child processes.

use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{Result, UpdateError};

/// How a spawned child treats the parent's standard streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdioMode {
    /// Share stdout/stderr with the parent (restarts).
    Inherit,
    /// Detach all streams (installers, package handlers).
    Null,
}

/// Starts a child process without waiting for it.
pub trait ProcessLauncher: Send + Sync {
    /// Spawn `program` with `args`; return as soon as it has started.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Launch`] if the process cannot be started.
    fn spawn_detached(&self, program: &Path, args: &[OsString], stdio: StdioMode) -> Result<()>;
}

/// Launcher backed by [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn spawn_detached(&self, program: &Path, args: &[OsString], stdio: StdioMode) -> Result<()> {
        let mut command = Command::new(program);
        command.args(args).stdin(Stdio::null());
        match stdio {
            StdioMode::Inherit => command.stdout(Stdio::inherit()).stderr(Stdio::inherit()),
            StdioMode::Null => command.stdout(Stdio::null()).stderr(Stdio::null()),
        };

        let child = command.spawn().map_err(|e| {
            UpdateError::Launch(format!("cannot start {}: {e}", program.display()))
        })?;
        tracing::info!(pid = child.id(), program = %program.display(), "spawned child process");
        // Dropping the handle leaves the child running.
        drop(child);
        Ok(())
    }
}
