// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Update feeds.
//
// The manager only talks to `UpdateFeed`. `HttpFeed` is the shipping
// implementation: a JSON manifest describing the newest release, and a
// payload URL that is streamed to disk with progress.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use printdesk_core::error::{PrintdeskError, Result};
use printdesk_core::types::UpdateInfo;

/// Source of releases.
#[async_trait]
pub trait UpdateFeed: Send + Sync {
    /// The newest release, if it is newer than the running build.
    async fn latest(&self) -> Result<Option<UpdateInfo>>;

    /// Fetch the payload for `info` and return where it landed.
    ///
    /// Raw percentages are sent on `progress` as they become known; the
    /// manager is responsible for sanitising them.
    async fn download(
        &self,
        info: &UpdateInfo,
        progress: mpsc::UnboundedSender<f64>,
    ) -> Result<PathBuf>;

    /// Hand over to the downloaded installer and quit. Only returns on failure
    /// to start the installer, or for feeds that don't own the process.
    fn quit_and_install(&self, artifact: &Path) -> Result<()>;
}

/// Manifest-over-HTTPS feed.
#[derive(Debug, Clone)]
pub struct HttpFeed {
    client: reqwest::Client,
    manifest_url: String,
    current_version: String,
    download_dir: PathBuf,
}

impl HttpFeed {
    pub fn new(manifest_url: impl Into<String>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: reqwest::Client::new(),
            manifest_url: manifest_url.into(),
            current_version: env!("CARGO_PKG_VERSION").to_string(),
            download_dir: download_dir.into(),
        }
    }
}

#[async_trait]
impl UpdateFeed for HttpFeed {
    #[instrument(skip(self), fields(url = %self.manifest_url))]
    async fn latest(&self) -> Result<Option<UpdateInfo>> {
        let response = self
            .client
            .get(&self.manifest_url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(feed_error)?;
        let info: UpdateInfo = response.json().await.map_err(feed_error)?;

        if is_newer(&info.version, &self.current_version) {
            info!(version = %info.version, current = %self.current_version, "newer release published");
            Ok(Some(info))
        } else {
            debug!(version = %info.version, current = %self.current_version, "already up to date");
            Ok(None)
        }
    }

    #[instrument(skip(self, info, progress), fields(version = %info.version))]
    async fn download(
        &self,
        info: &UpdateInfo,
        progress: mpsc::UnboundedSender<f64>,
    ) -> Result<PathBuf> {
        let url = info
            .url
            .as_deref()
            .ok_or_else(|| PrintdeskError::UpdateFeed("release has no download URL".into()))?;

        tokio::fs::create_dir_all(&self.download_dir).await?;
        let target = self.download_dir.join(payload_name(url, &info.version));

        match self.fetch_to(url, &target, &progress).await {
            Ok(received) => {
                info!(bytes = received, path = %target.display(), "update payload downloaded");
                Ok(target)
            }
            Err(e) => {
                discard_partial(&target).await;
                Err(e)
            }
        }
    }

    fn quit_and_install(&self, artifact: &Path) -> Result<()> {
        info!(path = %artifact.display(), "launching installer");
        launch_installer(artifact)?;
        info!("exiting so the installer can replace this build");
        std::process::exit(0)
    }
}

impl HttpFeed {
    /// Stream `url` into `target`, returning the byte count.
    async fn fetch_to(
        &self,
        url: &str,
        target: &Path,
        progress: &mpsc::UnboundedSender<f64>,
    ) -> Result<u64> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(feed_error)?;
        let total = response.content_length().filter(|len| *len > 0);

        let mut file = tokio::fs::File::create(target).await?;
        let mut received: u64 = 0;
        // Receiver gone means nobody is watching; keep downloading.
        let _ = progress.send(0.0);
        while let Some(chunk) = response.chunk().await.map_err(feed_error)? {
            file.write_all(&chunk).await?;
            received += chunk.len() as u64;
            if let Some(total) = total {
                let _ = progress.send(received as f64 * 100.0 / total as f64);
            }
        }
        file.flush().await?;
        let _ = progress.send(100.0);
        Ok(received)
    }
}

/// Remove whatever a failed download left behind.
async fn discard_partial(target: &Path) {
    match tokio::fs::remove_file(target).await {
        Ok(()) => debug!(path = %target.display(), "removed partial update payload"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %target.display(), error = %e, "could not remove partial update payload"),
    }
}

#[cfg(target_os = "macos")]
fn launch_installer(artifact: &Path) -> Result<()> {
    std::process::Command::new("open").arg(artifact).spawn()?;
    Ok(())
}

#[cfg(all(unix, not(target_os = "macos")))]
fn launch_installer(artifact: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(artifact, std::fs::Permissions::from_mode(0o755))?;
    std::process::Command::new(artifact).spawn()?;
    Ok(())
}

#[cfg(not(unix))]
fn launch_installer(artifact: &Path) -> Result<()> {
    std::process::Command::new(artifact).spawn()?;
    Ok(())
}

fn feed_error(e: reqwest::Error) -> PrintdeskError {
    PrintdeskError::UpdateFeed(e.to_string())
}

/// Last path segment of the payload URL, or a versioned fallback name.
fn payload_name(url: &str, version: &str) -> String {
    url.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .filter(|name| !matches!(*name, "" | "." | ".."))
        .map(str::to_owned)
        .unwrap_or_else(|| format!("printdesk-{version}"))
}

/// Dotted numeric comparison; pre-release and build suffixes are ignored.
pub fn is_newer(candidate: &str, current: &str) -> bool {
    let mut a = version_key(candidate);
    let mut b = version_key(current);
    let len = a.len().max(b.len());
    a.resize(len, 0);
    b.resize(len, 0);
    a > b
}

fn version_key(version: &str) -> Vec<u64> {
    version
        .trim()
        .trim_start_matches('v')
        .split(['-', '+'])
        .next()
        .unwrap_or_default()
        .split('.')
        .map(|part| part.parse().unwrap_or(0))
        .collect()
}
