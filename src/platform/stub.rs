//! Privileged executor for platforms without an elevation path.

use super::{FileMove, PrivilegedExecutor};
use crate::error::{Result, UpdateError};

/// Executor that always refuses.
///
/// Used on Linux and macOS, where the apply step never needs to rename a
/// locked executable.
pub struct UnsupportedExecutor;

impl PrivilegedExecutor for UnsupportedExecutor {
    fn move_files(&self, _moves: &[FileMove]) -> Result<()> {
        Err(UpdateError::Elevation(
            "privilege elevation is not supported on this platform".to_owned(),
        ))
    }
}
