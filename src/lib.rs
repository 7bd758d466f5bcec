//! Farmland updater: keeps the Farmland desktop app on its latest release.
//!
//! The flow is driven step by step by the UI:
//! check the release index → download the platform artifact → apply → restart
//!
//! # Architecture
//!
//! - **Release resolution**: queries the GitHub "latest release" endpoint
//!   and picks the artifact matching this OS and architecture
//! - **Download session**: background download with pollable progress
//! - **Applier**: swaps the running executable or hands off to an installer
//! - **Platform**: OS naming, asset patterns and privileged file moves

pub mod config;
pub mod error;
pub mod platform;
pub mod update;

pub use config::UpdaterConfig;
pub use error::{Result, UpdateError};
pub use platform::PlatformTarget;
pub use update::{ApplyOutcome, DownloadStatus, InstallOutcome, UpdateDecision, Updater};
