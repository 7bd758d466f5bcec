//! Command-line front end for the Farmland updater.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use farmland_updater::update::{ApplyOutcome, InstallOutcome};
use farmland_updater::{Updater, UpdaterConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Check for, download and apply Farmland releases.
#[derive(Parser)]
#[command(name = "farmland-update", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Version to compare releases against (defaults to the build version).
    #[arg(long)]
    current_version: Option<String>,

    /// Executable to replace and relaunch instead of this binary.
    #[arg(long)]
    executable: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Query the release index and print the update decision as JSON.
    Check,

    /// Download an artifact and print where it was stored.
    Download {
        /// Artifact URL; resolved from the latest release when omitted.
        url: Option<String>,
    },

    /// Check, download and apply the latest release, then restart.
    Update {
        /// Apply without relaunching the executable.
        #[arg(long)]
        no_restart: bool,
    },

    /// Relaunch the executable and exit.
    Restart,

    /// Print the OS and architecture used for artifact selection.
    Platform,

    /// Install a portable build into the per-user install location.
    Install,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("farmland_updater=info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => UpdaterConfig::from_file(path)?,
        None => UpdaterConfig::default(),
    };
    if let Some(version) = cli.current_version {
        config.current_version = version;
    }

    let mut updater = Updater::new(config)?;
    if let Some(executable) = cli.executable {
        updater = updater.with_executable(executable);
    }

    match cli.command {
        Command::Check => check(&updater).await,
        Command::Download { url } => download(&updater, url).await,
        Command::Update { no_restart } => update(&updater, no_restart).await,
        Command::Restart => {
            updater.restart_app()?;
            Ok(())
        }
        Command::Platform => {
            println!("{}", serde_json::to_string_pretty(&updater.platform_info())?);
            Ok(())
        }
        Command::Install => install(&updater),
    }
}

async fn check(updater: &Updater) -> anyhow::Result<()> {
    let decision = updater.check_for_updates().await?;
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}

async fn resolve_url(updater: &Updater) -> anyhow::Result<Option<String>> {
    let decision = updater.check_for_updates().await?;
    if !decision.has_update {
        println!("Farmland {} is up to date", decision.current_version);
        return Ok(None);
    }
    let Some(url) = decision.download_url else {
        anyhow::bail!(
            "release {} has no artifact for {}",
            decision.latest_version,
            farmland_updater::PlatformTarget::current()
        );
    };
    info!(latest = %decision.latest_version, %url, "update available");
    Ok(Some(url))
}

async fn download(updater: &Updater, url: Option<String>) -> anyhow::Result<()> {
    let url = match url {
        Some(url) => url,
        None => match resolve_url(updater).await? {
            Some(url) => url,
            None => return Ok(()),
        },
    };
    let path = updater.download_update(&url).await?;
    println!("{}", path.display());
    Ok(())
}

async fn update(updater: &Updater, no_restart: bool) -> anyhow::Result<()> {
    let Some(url) = resolve_url(updater).await? else {
        return Ok(());
    };
    updater.download_update(&url).await?;

    match updater.apply_update()? {
        ApplyOutcome::InstallerLaunched { installer } => {
            println!("Installer started: {}", installer.display());
        }
        ApplyOutcome::RestartRequired { executable } | ApplyOutcome::ElevatedReplace { executable } => {
            println!("Updated {}", executable.display());
            if !no_restart {
                updater.restart_app()?;
            }
        }
    }
    Ok(())
}

fn install(updater: &Updater) -> anyhow::Result<()> {
    if updater.is_installed() {
        println!("Farmland is already installed");
        return Ok(());
    }
    match updater.install_to_system()? {
        InstallOutcome::NotApplicable => println!("Installation is only needed on Windows"),
        InstallOutcome::AlreadyInstalled { executable } | InstallOutcome::Installed { executable } => {
            println!("Farmland is installed at {}", executable.display());
        }
    }
    Ok(())
}
