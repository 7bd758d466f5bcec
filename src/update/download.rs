//! Background artifact download with a pollable status.
//!
//! One session is live per [`Downloader`]. [`Downloader::start_download`]
//! resets it synchronously, then a spawned task streams the artifact into a
//! temp file and publishes progress. Pollers read consistent snapshots via
//! [`Downloader::download_status`].

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures_util::TryStreamExt;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::runtime::Handle;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::DownloadConfig;
use crate::error::{Result, UpdateError};

/// Point-in-time view of the download session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadStatus {
    /// Percentage in `0..=100`. Stays at 0 when the size is unknown.
    pub progress: f64,
    /// A transfer task is still running.
    pub is_downloading: bool,
    /// Transfer finished, file recorded, no error.
    pub is_complete: bool,
    /// Transfer failed; see `error_msg`.
    pub is_error: bool,
    /// Failure message, empty unless `is_error`.
    pub error_msg: String,
}

/// A fully downloaded artifact awaiting apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedArtifact {
    /// Temp file holding the artifact.
    pub path: PathBuf,
    /// Remote file name the artifact was published under.
    pub asset_name: String,
}

#[derive(Debug, Default)]
struct DownloadSession {
    generation: u64,
    progress: f64,
    downloading: bool,
    error: Option<String>,
    file: Option<PathBuf>,
    asset_name: String,
}

impl DownloadSession {
    fn status(&self) -> DownloadStatus {
        let is_error = self.error.is_some();
        DownloadStatus {
            progress: self.progress,
            is_downloading: self.downloading,
            is_complete: self.progress >= 100.0 && !self.downloading && !is_error,
            is_error,
            error_msg: self.error.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct SessionHandle(Arc<RwLock<DownloadSession>>);

impl SessionHandle {
    fn read(&self) -> RwLockReadGuard<'_, DownloadSession> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DownloadSession> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a fresh session and return its generation.
    fn reset(&self, asset_name: &str) -> u64 {
        let mut session = self.write();
        let generation = session.generation + 1;
        *session = DownloadSession {
            generation,
            downloading: true,
            asset_name: asset_name.to_owned(),
            ..DownloadSession::default()
        };
        generation
    }

    fn set_progress(&self, generation: u64, progress: f64) {
        let mut session = self.write();
        if session.generation == generation {
            session.progress = progress.clamp(0.0, 100.0);
        }
    }

    fn finish(&self, generation: u64, outcome: std::result::Result<PathBuf, String>) {
        let mut session = self.write();
        if session.generation != generation {
            return;
        }
        session.downloading = false;
        match outcome {
            Ok(path) => {
                session.progress = 100.0;
                session.file = Some(path);
            }
            Err(message) => session.error = Some(message),
        }
    }
}

/// Progress sink bound to one session generation.
#[derive(Debug, Clone)]
struct ProgressSink {
    session: SessionHandle,
    generation: u64,
}

impl ProgressSink {
    fn report(&self, progress: f64) {
        self.session.set_progress(self.generation, progress);
    }
}

/// Streams release artifacts to disk in the background.
#[derive(Debug)]
pub struct Downloader {
    client: reqwest::Client,
    config: DownloadConfig,
    session: SessionHandle,
    active: Mutex<Option<CancellationToken>>,
    runtime: Option<Handle>,
}

impl Downloader {
    /// Create a downloader with an idle session.
    ///
    /// When created inside a Tokio runtime, transfers run on that runtime
    /// even if [`start_download`](Self::start_download) is later called
    /// from a plain thread.
    pub fn new(client: reqwest::Client, config: DownloadConfig) -> Self {
        Self {
            client,
            config,
            session: SessionHandle::default(),
            active: Mutex::new(None),
            runtime: Handle::try_current().ok(),
        }
    }

    /// Run transfers on `runtime`.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Begin downloading `url` in the background.
    ///
    /// The session is reset before this returns, so an immediate
    /// [`download_status`](Self::download_status) never shows the previous
    /// session. A transfer still running from an earlier call is stopped and
    /// its results are discarded. Without a runtime to run on, the new
    /// session is marked failed instead.
    pub fn start_download(&self, url: &str) {
        let asset_name = asset_name_from_url(url);
        let (sink, cancel) = self.begin(&asset_name);
        let dest = self.destination(&asset_name, sink.generation);

        let Some(runtime) = Handle::try_current().ok().or_else(|| self.runtime.clone()) else {
            warn!(%url, "no async runtime available for update download");
            sink.session.finish(
                sink.generation,
                Err("download error: no async runtime available".to_owned()),
            );
            return;
        };
        info!(%url, dest = %dest.display(), "starting update download");

        let job = fetch_to_file(
            self.client.clone(),
            url.to_owned(),
            dest,
            self.config.chunk_size,
            sink.clone(),
        );
        spawn_job(&runtime, sink, cancel, job);
    }

    /// Snapshot of the current session.
    pub fn download_status(&self) -> DownloadStatus {
        self.session.read().status()
    }

    /// Current progress percentage.
    pub fn progress(&self) -> f64 {
        self.session.read().progress
    }

    /// Download `url` and wait for the transfer to finish.
    ///
    /// Polls the session every `poll_interval_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Download`] with the recorded session error.
    pub async fn download_update(&self, url: &str) -> Result<PathBuf> {
        self.start_download(url);
        let interval = self.config.poll_interval();
        while self.download_status().is_downloading {
            tokio::time::sleep(interval).await;
        }

        let status = self.download_status();
        if status.is_error {
            return Err(UpdateError::Download(status.error_msg));
        }
        self.downloaded_artifact()
            .map(|artifact| artifact.path)
            .ok_or_else(|| UpdateError::Download("transfer finished without a file".to_owned()))
    }

    /// The completed artifact, if one is on record.
    pub fn downloaded_artifact(&self) -> Option<DownloadedArtifact> {
        self.current_artifact().map(|(_, artifact)| artifact)
    }

    /// The completed artifact together with the session it belongs to.
    pub(crate) fn current_artifact(&self) -> Option<(u64, DownloadedArtifact)> {
        let session = self.session.read();
        if session.downloading || session.error.is_some() {
            return None;
        }
        session.file.as_ref().map(|path| {
            let artifact = DownloadedArtifact {
                path: path.clone(),
                asset_name: session.asset_name.clone(),
            };
            (session.generation, artifact)
        })
    }

    /// Forget the artifact of session `generation` so it cannot be applied
    /// twice. A newer session's artifact is left alone.
    pub(crate) fn clear_artifact(&self, generation: u64) {
        let mut session = self.session.write();
        if session.generation == generation {
            session.file = None;
        }
    }

    /// `<prefix>-<generation><ext>`: each session writes its own file, so a
    /// superseded transfer never lands in the current one.
    fn destination(&self, asset_name: &str, generation: u64) -> PathBuf {
        self.config.target_dir().join(format!(
            "{}-{generation}{}",
            self.config.temp_prefix,
            artifact_extension(asset_name)
        ))
    }

    fn begin(&self, asset_name: &str) -> (ProgressSink, CancellationToken) {
        let generation = self.session.reset(asset_name);
        let cancel = CancellationToken::new();
        let previous = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(cancel.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }
        let sink = ProgressSink {
            session: self.session.clone(),
            generation,
        };
        (sink, cancel)
    }
}

fn spawn_job<F>(runtime: &Handle, sink: ProgressSink, cancel: CancellationToken, job: F)
where
    F: Future<Output = std::result::Result<PathBuf, String>> + Send + 'static,
{
    runtime.spawn(async move {
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(generation = sink.generation, "superseded download stopped");
                return;
            }
            outcome = job => outcome,
        };
        match &outcome {
            Ok(path) => info!(path = %path.display(), "update download complete"),
            Err(message) => warn!(error = %message, "update download failed"),
        }
        sink.session.finish(sink.generation, outcome);
    });
}

async fn fetch_to_file(
    client: reqwest::Client,
    url: String,
    dest: PathBuf,
    chunk_size: usize,
    sink: ProgressSink,
) -> std::result::Result<PathBuf, String> {
    let response = client
        .get(&url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| format!("failed to download: {e}"))?;

    let total = response.content_length();
    let reader = StreamReader::new(Box::pin(response.bytes_stream().map_err(io::Error::other)));
    write_stream_to_file(reader, total, dest, chunk_size, sink).await
}

async fn write_stream_to_file<R>(
    reader: R,
    total: Option<u64>,
    dest: PathBuf,
    chunk_size: usize,
    sink: ProgressSink,
) -> std::result::Result<PathBuf, String>
where
    R: AsyncRead + Unpin,
{
    let mut file = tokio::fs::File::create(&dest)
        .await
        .map_err(|e| format!("failed to create temp file {}: {e}", dest.display()))?;
    // A partial file is left behind on error for inspection.
    copy_with_progress(reader, &mut file, total, chunk_size, |p| sink.report(p)).await?;
    Ok(dest)
}

/// Copy `reader` into `writer` in `chunk_size` pieces, reporting percentage
/// progress after each chunk when `total` is known and positive.
async fn copy_with_progress<R, W, F>(
    mut reader: R,
    writer: &mut W,
    total: Option<u64>,
    chunk_size: usize,
    mut on_progress: F,
) -> std::result::Result<u64, String>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    F: FnMut(f64),
{
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut downloaded: u64 = 0;
    let total = total.filter(|t| *t > 0);

    loop {
        let n = reader
            .read(&mut buf)
            .await
            .map_err(|e| format!("download error: {e}"))?;
        if n == 0 {
            break;
        }
        writer
            .write_all(&buf[..n])
            .await
            .map_err(|e| format!("write error: {e}"))?;
        downloaded += n as u64;
        if let Some(total) = total {
            on_progress(downloaded as f64 / total as f64 * 100.0);
        }
    }
    writer
        .flush()
        .await
        .map_err(|e| format!("write error: {e}"))?;
    Ok(downloaded)
}

/// Last path segment of a download URL, without query or fragment.
pub fn asset_name_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_owned()
}

/// Extension of an artifact name, keeping `.tar.gz` intact.
pub fn artifact_extension(name: &str) -> String {
    if name.to_lowercase().ends_with(".tar.gz") {
        return ".tar.gz".to_owned();
    }
    Path::new(name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}
