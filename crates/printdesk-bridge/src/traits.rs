// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for native capabilities.
//
// Everything that touches a window, the print subsystem, or the desktop shell
// sits behind one of these traits so the pipeline can be driven by the real
// platform, by the UI shell, or by an in-memory fake in tests.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use printdesk_core::error::Result;
use printdesk_core::types::{PrintOptions, PrinterInfo, SurfaceId, UiEvent};

/// Unified bridge that groups the native capabilities the app needs.
pub trait PlatformBridge:
    SurfaceHost + NativeOpener + NativePrinters + NativeFilePicker + Send + Sync
{
    /// Human-readable platform name (e.g. "Linux (CUPS)").
    fn platform_name(&self) -> &str;
}

/// A content-hosting context: either the primary view or a hidden surface
/// created only to stage a document for printing.
#[async_trait]
pub trait NativeSurface: Send + Sync {
    fn id(&self) -> SurfaceId;

    /// Load `path` into the surface. Resolves once the surface signals that
    /// the content is ready, or with an error if loading aborted.
    async fn load_file(&self, path: &Path) -> Result<()>;

    /// Run the platform print action once.
    ///
    /// `Ok(false)` means the native layer reported that nothing was printed
    /// (dialog cancelled, device refused the job).
    async fn print(&self, options: &PrintOptions) -> Result<bool>;

    /// Destroy the native resource. The lifecycle calls this at most once.
    fn close(&self);
}

/// Factory for hidden render surfaces.
pub trait SurfaceHost: Send + Sync {
    fn create_surface(&self, id: SurfaceId) -> Result<Box<dyn NativeSurface>>;

    /// Whether surfaces from this host lay out HTML before printing.
    ///
    /// Hosts that only pass files through to a spooler return `false`; markup
    /// is then opened in the default application instead of being staged.
    fn renders_markup(&self) -> bool {
        true
    }
}

/// Hand a file to the OS default application.
#[async_trait]
pub trait NativeOpener: Send + Sync {
    /// Returns Ok(()) once the OS accepted the open request.
    ///
    /// Errors: `UnsupportedType` when no application handles the file,
    /// `Io` for anything else (permissions, launcher missing).
    async fn open_path(&self, path: &Path) -> Result<()>;
}

/// Printers known to the OS print subsystem.
#[async_trait]
pub trait NativePrinters: Send + Sync {
    async fn list_printers(&self) -> Result<Vec<PrinterInfo>>;
}

/// A named group of extensions for the file picker.
#[derive(Debug, Clone)]
pub struct FileFilter {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
}

/// The file types the "print a file" action offers.
pub const PRINTABLE_FILES: FileFilter = FileFilter {
    name: "Documents",
    extensions: &["pdf", "txt", "html", "htm", "md", "doc", "docx"],
};

/// Pick files from local storage.
#[async_trait]
pub trait NativeFilePicker: Send + Sync {
    /// Show a picker filtered to `filter`. Returns None if cancelled.
    async fn pick_file(&self, filter: &FileFilter) -> Result<Option<PathBuf>>;
}

/// Receiver for events pushed to the UI.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: UiEvent);
}
