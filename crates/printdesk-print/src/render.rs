// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content staging.
//
// Text-like files are escaped, wrapped in a minimal HTML page and written to a
// request-scoped staging file; native files (PDF, HTML) are loaded as-is after
// a preflight. Either way the content lands in a freshly leased hidden
// surface, and staging only succeeds once the surface reports ready.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

use printdesk_core::error::{PrintdeskError, Result};
use printdesk_core::types::{FileClassification, SurfaceState};

use crate::surface::{SurfaceLease, SurfaceLifecycle};

/// Stages documents into hidden render surfaces.
#[derive(Clone)]
pub struct ContentRenderer {
    lifecycle: SurfaceLifecycle,
    load_timeout: Duration,
}

impl ContentRenderer {
    pub fn new(lifecycle: SurfaceLifecycle, load_timeout: Duration) -> Self {
        Self {
            lifecycle,
            load_timeout,
        }
    }

    /// Load `path` into a new surface and wait until it is ready to print.
    ///
    /// Read and preflight failures happen before any surface exists. Once a
    /// surface exists, every failure drops the lease, which tears it down.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn stage(
        &self,
        path: &Path,
        classification: FileClassification,
    ) -> Result<SurfaceLease> {
        if needs_markup(path, classification) && !self.lifecycle.renders_markup() {
            debug!("surface host cannot lay out markup");
            return Err(PrintdeskError::PlatformUnavailable);
        }

        match classification {
            FileClassification::Renderable => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| PrintdeskError::LoadError(format!("read {}: {e}", path.display())))?;
                let title = base_name(path);
                let markup = wrap_markup(&title, &String::from_utf8_lossy(&bytes));
                let staging = write_staging(&markup)?;
                let target = staging.path().to_path_buf();
                debug!(staging = %target.display(), bytes = markup.len(), "markup staged");

                let mut lease = self.lifecycle.acquire()?;
                lease.attach_staging(staging);
                self.load(&mut lease, &target).await?;
                Ok(lease)
            }
            FileClassification::Native => {
                if is_pdf(path) {
                    preflight_pdf(path).await?;
                }
                let mut lease = self.lifecycle.acquire()?;
                self.load(&mut lease, path).await?;
                Ok(lease)
            }
            FileClassification::Unsupported => Err(PrintdeskError::UnsupportedType(
                extension_label(path),
            )),
        }
    }

    async fn load(&self, lease: &mut SurfaceLease, target: &Path) -> Result<()> {
        lease.advance(SurfaceState::Loading)?;

        let loaded = tokio::time::timeout(self.load_timeout, lease.surface().load_file(target)).await;
        match loaded {
            Err(_) => {
                warn!(
                    surface = %lease.id(),
                    timeout_ms = self.load_timeout.as_millis() as u64,
                    "surface did not signal ready in time"
                );
                Err(PrintdeskError::LoadTimeout(self.load_timeout))
            }
            Ok(Err(e)) => {
                warn!(surface = %lease.id(), error = %e, "surface failed to load content");
                Err(match e {
                    PrintdeskError::LoadError(_) | PrintdeskError::PlatformUnavailable => e,
                    other => PrintdeskError::LoadError(other.to_string()),
                })
            }
            Ok(Ok(())) => {
                lease.advance(SurfaceState::Ready)?;
                info!(surface = %lease.id(), "content ready");
                Ok(())
            }
        }
    }
}

/// Replace the five HTML-reserved characters with entities.
pub fn escape_markup(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + input.len() / 16);
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Minimal printable page around raw text. Both arguments are escaped here.
pub fn wrap_markup(title: &str, text: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>{}</title>\n\
         <style>body {{ margin: 0; }} pre {{ font-family: monospace; white-space: pre-wrap; word-wrap: break-word; }}</style>\n\
         </head>\n\
         <body><pre>{}</pre></body>\n\
         </html>\n",
        escape_markup(title),
        escape_markup(text)
    )
}

fn write_staging(markup: &str) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("printdesk-")
        .suffix(".html")
        .tempfile()
        .map_err(|e| PrintdeskError::LoadError(format!("create staging file: {e}")))?;
    file.write_all(markup.as_bytes())
        .and_then(|()| file.flush())
        .map_err(|e| PrintdeskError::LoadError(format!("write staging file: {e}")))?;
    Ok(file)
}

/// Parse the PDF off the async runtime and reject anything lopdf can't read.
async fn preflight_pdf(path: &Path) -> Result<()> {
    let owned: PathBuf = path.to_path_buf();
    let pages = tokio::task::spawn_blocking(move || {
        lopdf::Document::load(&owned).map(|doc| doc.get_pages().len())
    })
    .await
    .map_err(|e| PrintdeskError::LoadError(format!("PDF preflight aborted: {e}")))?
    .map_err(|e| PrintdeskError::LoadError(format!("not a readable PDF: {e}")))?;

    debug!(pages, "PDF preflight passed");
    Ok(())
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Staged as HTML: wrapped text, or an HTML document loaded as-is.
fn needs_markup(path: &Path, classification: FileClassification) -> bool {
    match classification {
        FileClassification::Renderable => true,
        FileClassification::Native => !is_pdf(path),
        FileClassification::Unsupported => false,
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Document".to_string())
}

pub(crate) fn extension_label(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_else(|| "file without extension".to_string())
}
