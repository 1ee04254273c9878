// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Desktop bridge (Linux, BSD, macOS, Windows).
//
// Opening files goes through the desktop shell launcher (`xdg-open`, `open`,
// `start`). Printer listing and hidden-surface printing go through the CUPS
// command-line tools where they exist. A UI shell with an embedded web view
// supplies its own `SurfaceHost` instead of the spooler surfaces below.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use printdesk_core::error::{PrintdeskError, Result};
use printdesk_core::types::{MarginMode, Orientation, PrintOptions, PrinterInfo, SurfaceId};

use crate::traits::*;

/// xdg-open exit status for "no application/tool available".
const XDG_NO_HANDLER: i32 = 3;

/// Bridge backed by the desktop shell and CUPS tools.
#[derive(Debug, Default)]
pub struct DesktopBridge;

impl DesktopBridge {
    pub fn new() -> Self {
        Self
    }
}

impl PlatformBridge for DesktopBridge {
    fn platform_name(&self) -> &str {
        if cfg!(target_os = "macos") {
            "macOS (CUPS)"
        } else if cfg!(target_os = "windows") {
            "Windows"
        } else {
            "Linux/BSD (CUPS)"
        }
    }
}

// ---------------------------------------------------------------------------
// Hidden surfaces: spool the staged file with `lp`
// ---------------------------------------------------------------------------

impl SurfaceHost for DesktopBridge {
    fn create_surface(&self, id: SurfaceId) -> Result<Box<dyn NativeSurface>> {
        if cfg!(windows) {
            return Err(PrintdeskError::PlatformUnavailable);
        }
        debug!(surface = %id, "creating spooler surface");
        Ok(Box::new(SpoolSurface::new(id)))
    }

    /// CUPS ships no text/html filter, so spooling a page prints its source.
    fn renders_markup(&self) -> bool {
        false
    }
}

/// A "surface" that holds a file path and hands it to the CUPS spooler.
///
/// Only formats the spooler filters itself (PDF) belong here; markup is
/// refused at load time.
pub struct SpoolSurface {
    id: SurfaceId,
    loaded: Mutex<Option<PathBuf>>,
    closed: AtomicBool,
}

impl SpoolSurface {
    pub fn new(id: SurfaceId) -> Self {
        Self {
            id,
            loaded: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl NativeSurface for SpoolSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    async fn load_file(&self, path: &Path) -> Result<()> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| PrintdeskError::LoadError(format!("{}: {e}", path.display())))?;
        if !meta.is_file() {
            return Err(PrintdeskError::LoadError(format!(
                "{} is not a regular file",
                path.display()
            )));
        }
        if is_markup(path) {
            return Err(PrintdeskError::PlatformUnavailable);
        }
        let mut slot = self
            .loaded
            .lock()
            .map_err(|_| PrintdeskError::Bridge("surface lock poisoned".into()))?;
        *slot = Some(path.to_path_buf());
        Ok(())
    }

    #[instrument(skip(self, options), fields(surface = %self.id))]
    async fn print(&self, options: &PrintOptions) -> Result<bool> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PrintdeskError::Bridge("surface already closed".into()));
        }
        let path = self
            .loaded
            .lock()
            .map_err(|_| PrintdeskError::Bridge("surface lock poisoned".into()))?
            .clone()
            .ok_or_else(|| PrintdeskError::Bridge("nothing loaded into surface".into()))?;

        let args = lp_args(options, &path);
        debug!(?args, "spooling with lp");
        let output = Command::new("lp")
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => PrintdeskError::PlatformUnavailable,
                _ => PrintdeskError::Io(e),
            })?;

        if output.status.success() {
            info!(stdout = %String::from_utf8_lossy(&output.stdout).trim(), "lp accepted job");
            Ok(true)
        } else {
            warn!(
                status = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "lp refused job"
            );
            Ok(false)
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        if let Ok(mut slot) = self.loaded.lock() {
            slot.take();
        }
    }
}

fn is_markup(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
}

/// Translate the print option set into `lp` arguments.
pub fn lp_args(options: &PrintOptions, path: &Path) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(printer) = options.printer_name.as_deref() {
        args.push("-d".to_string());
        args.push(printer.to_string());
    }
    let mut opt = |value: String| {
        args.push("-o".to_string());
        args.push(value);
    };
    if options.orientation == Orientation::Landscape {
        opt("landscape".into());
    }
    if !options.color {
        opt("print-color-mode=monochrome".into());
    }
    if options.scale_factor != 100 {
        opt(format!("scaling={}", options.scale_factor));
    }
    match options.margins {
        MarginMode::Default => {}
        MarginMode::None => {
            for side in ["left", "right", "top", "bottom"] {
                opt(format!("page-{side}=0"));
            }
        }
        MarginMode::Printable => opt("fit-to-page".into()),
    }
    args.push("--".to_string());
    args.push(path.display().to_string());
    args
}

// ---------------------------------------------------------------------------
// Opener
// ---------------------------------------------------------------------------

#[async_trait]
impl NativeOpener for DesktopBridge {
    #[instrument(skip(self), fields(path = %path.display()))]
    async fn open_path(&self, path: &Path) -> Result<()> {
        let mut cmd = opener_command(path);
        let status = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(PrintdeskError::Io)?;

        match status.code() {
            Some(0) => {
                info!("handed file to default application");
                Ok(())
            }
            Some(XDG_NO_HANDLER) if cfg!(not(target_os = "macos")) => Err(
                PrintdeskError::UnsupportedType(format!("no application opens {}", path.display())),
            ),
            // `open` fails almost exclusively when no application claims the type.
            Some(_) if cfg!(target_os = "macos") => Err(PrintdeskError::UnsupportedType(format!(
                "no application opens {}",
                path.display()
            ))),
            other => Err(PrintdeskError::Io(std::io::Error::other(format!(
                "launcher exited with {other:?}"
            )))),
        }
    }
}

fn opener_command(path: &Path) -> Command {
    if cfg!(target_os = "macos") {
        let mut cmd = Command::new("open");
        cmd.arg(path);
        cmd
    } else if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]).arg(path);
        cmd
    } else {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(path);
        cmd
    }
}

// ---------------------------------------------------------------------------
// Printers
// ---------------------------------------------------------------------------

#[async_trait]
impl NativePrinters for DesktopBridge {
    async fn list_printers(&self) -> Result<Vec<PrinterInfo>> {
        if cfg!(windows) {
            let names = run_capture(
                "powershell",
                &[
                    "-NoProfile",
                    "-Command",
                    "Get-Printer | Select-Object -ExpandProperty Name",
                ],
            )
            .await?;
            return Ok(parse_lpstat_destinations(&names, None));
        }

        let destinations = run_capture("lpstat", &["-e"]).await?;
        // No default configured makes `lpstat -d` exit non-zero; that's fine.
        let default = run_capture("lpstat", &["-d"])
            .await
            .ok()
            .and_then(|out| parse_lpstat_default(&out));
        let printers = parse_lpstat_destinations(&destinations, default.as_deref());
        debug!(count = printers.len(), "listed printers");
        Ok(printers)
    }
}

async fn run_capture(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PrintdeskError::PlatformUnavailable,
            _ => PrintdeskError::Io(e),
        })?;
    if !output.status.success() {
        return Err(PrintdeskError::Bridge(format!(
            "{program} exited with {:?}: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// One destination name per line, as printed by `lpstat -e`.
pub fn parse_lpstat_destinations(stdout: &str, default: Option<&str>) -> Vec<PrinterInfo> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|name| PrinterInfo {
            name: name.to_string(),
            display_name: name.replace('_', " "),
            is_default: default == Some(name),
        })
        .collect()
}

/// `system default destination: NAME` → `NAME`.
pub fn parse_lpstat_default(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .find_map(|line| line.split_once("default destination:"))
        .map(|(_, name)| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

// ---------------------------------------------------------------------------
// File picker
// ---------------------------------------------------------------------------

#[async_trait]
impl NativeFilePicker for DesktopBridge {
    async fn pick_file(&self, filter: &FileFilter) -> Result<Option<PathBuf>> {
        let picked = rfd::AsyncFileDialog::new()
            .set_title("Choose a file to print")
            .add_filter(filter.name, filter.extensions)
            .pick_file()
            .await;
        Ok(picked.map(|handle| handle.path().to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_request_borderless_portrait() {
        let args = lp_args(&PrintOptions::default(), Path::new("/tmp/a.html"));
        assert!(!args.contains(&"landscape".to_string()));
        assert!(args.contains(&"page-left=0".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("scaling")));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/a.html"));
    }

    #[test]
    fn printer_and_layout_options_map_to_lp_flags() {
        let options = PrintOptions {
            orientation: Orientation::Landscape,
            color: false,
            scale_factor: 80,
            margins: MarginMode::Default,
            printer_name: Some("Office_Laser".into()),
            ..Default::default()
        };
        let args = lp_args(&options, Path::new("/tmp/a.pdf"));
        assert_eq!(&args[..2], &["-d".to_string(), "Office_Laser".to_string()]);
        assert!(args.contains(&"landscape".to_string()));
        assert!(args.contains(&"print-color-mode=monochrome".to_string()));
        assert!(args.contains(&"scaling=80".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("page-")));
    }

    #[test]
    fn parses_lpstat_output() {
        let default = parse_lpstat_default("system default destination: Office_Laser\n");
        assert_eq!(default.as_deref(), Some("Office_Laser"));
        assert_eq!(parse_lpstat_default("no system default destination\n"), None);

        let printers =
            parse_lpstat_destinations("Office_Laser\nPDF\n\n", default.as_deref());
        assert_eq!(printers.len(), 2);
        assert_eq!(printers[0].display_name, "Office Laser");
        assert!(printers[0].is_default);
        assert!(!printers[1].is_default);
    }

    #[tokio::test]
    async fn spool_surface_rejects_missing_file() {
        let surface = SpoolSurface::new(SurfaceId::new());
        let err = surface
            .load_file(Path::new("/definitely/not/here.html"))
            .await
            .unwrap_err();
        assert!(matches!(err, PrintdeskError::LoadError(_)));
    }

    #[tokio::test]
    async fn spooler_does_not_take_markup() {
        assert!(!DesktopBridge::new().renders_markup());

        let page = tempfile::Builder::new().suffix(".html").tempfile().unwrap();
        let surface = SpoolSurface::new(SurfaceId::new());
        let err = surface.load_file(page.path()).await.unwrap_err();
        assert!(matches!(err, PrintdeskError::PlatformUnavailable));
    }

    #[tokio::test]
    async fn spool_surface_refuses_to_print_after_close() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let surface = SpoolSurface::new(SurfaceId::new());
        surface.load_file(file.path()).await.unwrap();
        surface.close();
        assert!(surface.print(&PrintOptions::default()).await.is_err());
    }
}
