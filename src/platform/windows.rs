//! Elevated file moves through a PowerShell `RunAs` prompt.

use std::path::Path;
use std::process::{Command, Stdio};

use super::{FileMove, PrivilegedExecutor};
use crate::error::{Result, UpdateError};

/// Runs the moves in an elevated PowerShell child and waits for it.
///
/// The user sees one UAC prompt per call. A declined prompt surfaces as a
/// non-zero exit status.
pub struct PowerShellExecutor;

impl PrivilegedExecutor for PowerShellExecutor {
    fn move_files(&self, moves: &[FileMove]) -> Result<()> {
        if moves.is_empty() {
            return Ok(());
        }
        let script = launcher_script(moves);
        tracing::info!(moves = moves.len(), "requesting elevation for update");

        let status = Command::new("powershell")
            .args(["-NoProfile", "-NonInteractive", "-Command", &script])
            .stdin(Stdio::null())
            .status()
            .map_err(|e| UpdateError::Elevation(format!("cannot start powershell: {e}")))?;

        if !status.success() {
            return Err(UpdateError::Elevation(format!(
                "elevated update failed with exit code {:?} (did you decline the UAC prompt?)",
                status.code()
            )));
        }
        Ok(())
    }
}

/// Quote a string as a PowerShell single-quoted literal.
fn ps_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn ps_path(path: &Path) -> String {
    ps_literal(&path.to_string_lossy())
}

/// Script executed inside the elevated process.
pub(crate) fn move_script(moves: &[FileMove]) -> String {
    let mut script = String::from("$ErrorActionPreference = 'Stop'");
    for m in moves {
        script.push_str(&format!(
            "; Move-Item -LiteralPath {} -Destination {} -Force",
            ps_path(&m.from),
            ps_path(&m.to)
        ));
    }
    script
}

/// Script executed by the unelevated parent: starts the elevated child,
/// waits, and forwards its exit code.
pub(crate) fn launcher_script(moves: &[FileMove]) -> String {
    format!(
        "$p = Start-Process powershell -Verb RunAs -Wait -PassThru -ArgumentList @('-NoProfile', '-Command', {}); exit $p.ExitCode",
        ps_literal(&move_script(moves))
    )
}
