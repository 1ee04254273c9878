// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Printdesk print pipeline and updater.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErrorKind;

/// Unique identifier for a print request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a transient render surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceId(pub Uuid);

impl SurfaceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SurfaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the user asked to print.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrintSource {
    /// The view currently shown in the application's primary window.
    CurrentView,
    /// A document on disk.
    ExternalFile(PathBuf),
}

/// A single print request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintRequest {
    id: RequestId,
    source: PrintSource,
    printer_name: Option<String>,
}

impl PrintRequest {
    pub fn new(source: PrintSource, printer_name: Option<String>) -> Self {
        // An empty name means "platform default", same as no name at all.
        let printer_name = printer_name.filter(|name| !name.trim().is_empty());
        Self {
            id: RequestId::new(),
            source,
            printer_name,
        }
    }

    pub fn current_view() -> Self {
        Self::new(PrintSource::CurrentView, None)
    }

    pub fn external_file(path: impl Into<PathBuf>) -> Self {
        Self::new(PrintSource::ExternalFile(path.into()), None)
    }

    pub fn with_printer(self, printer_name: impl Into<String>) -> Self {
        Self::new(self.source, Some(printer_name.into()))
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn source(&self) -> &PrintSource {
        &self.source
    }

    pub fn printer_name(&self) -> Option<&str> {
        self.printer_name.as_deref()
    }
}

/// How a file can reach the printer, derived once from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileClassification {
    /// The render surface loads the file as-is (fixed-layout documents, HTML).
    Native,
    /// Text-like content that must be escaped and wrapped in markup first.
    Renderable,
    /// Neither; the OS default application has to handle it.
    Unsupported,
}

impl FileClassification {
    /// Classify a file extension (without the dot), ignoring case.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" | "html" | "htm" => Self::Native,
            "txt" | "text" | "md" | "markdown" | "log" | "csv" | "tsv" | "json" | "xml"
            | "yaml" | "yml" | "toml" | "ini" | "cfg" | "conf" => Self::Renderable,
            _ => Self::Unsupported,
        }
    }

    /// Classify a path by its extension. Paths without one are unsupported.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unsupported)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Renderable => "renderable",
            Self::Unsupported => "unsupported",
        }
    }
}

/// Lifecycle of a transient render surface. Declaration order is the only
/// permitted direction of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SurfaceState {
    Created,
    Loading,
    Ready,
    Printing,
    Closed,
}

/// Page margin handling passed to the native print call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarginMode {
    /// Platform default margins.
    Default,
    /// Edge-to-edge.
    None,
    /// Smallest margins the device supports.
    Printable,
}

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// The fixed option set handed to the native print action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintOptions {
    /// Skip the OS print dialog.
    pub silent: bool,
    /// Print background colours and images.
    pub print_background: bool,
    pub color: bool,
    pub margins: MarginMode,
    pub orientation: Orientation,
    /// Percent, 100 = actual size.
    pub scale_factor: u16,
    /// Target printer; `None` uses the platform default or the dialog.
    pub printer_name: Option<String>,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            silent: false,
            print_background: true,
            color: true,
            margins: MarginMode::None,
            orientation: Orientation::Portrait,
            scale_factor: 100,
            printer_name: None,
        }
    }
}

impl PrintOptions {
    /// Copy of these options aimed at a specific printer.
    pub fn for_printer(&self, printer_name: Option<&str>) -> Self {
        Self {
            printer_name: printer_name.map(str::to_owned),
            ..self.clone()
        }
    }
}

/// Outcome of one print request, as delivered to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PrintResult {
    /// The job reached the print subsystem.
    pub fn printed() -> Self {
        Self {
            success: true,
            error: None,
            message: Some("Print job sent to the printer.".into()),
        }
    }

    /// The document was handed to another application; nothing was printed yet.
    pub fn opened_externally(message: impl Into<String>) -> Self {
        Self {
            success: true,
            error: None,
            message: Some(message.into()),
        }
    }

    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(kind),
            message: Some(message.into()),
        }
    }
}

/// A printer known to the OS print subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterInfo {
    pub name: String,
    pub display_name: String,
    pub is_default: bool,
}

/// Metadata about a release offered by the update feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInfo {
    pub version: String,
    #[serde(default)]
    pub release_name: Option<String>,
    #[serde(default)]
    pub release_date: Option<DateTime<Utc>>,
    /// Hex SHA-256 of the payload, when the feed publishes one.
    #[serde(default)]
    pub sha256: Option<String>,
    /// Where the payload is fetched from.
    #[serde(default)]
    pub url: Option<String>,
}

impl UpdateInfo {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            release_name: None,
            release_date: None,
            sha256: None,
            url: None,
        }
    }
}

/// The single live state of the self-updater.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UpdateState {
    Idle,
    Checking,
    NoUpdateFound,
    Available(UpdateInfo),
    Downloading { info: UpdateInfo, percent: f64 },
    Downloaded { info: UpdateInfo, artifact: PathBuf },
    /// Terminal: the process is about to restart into the new version.
    Installing,
}

impl UpdateState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Checking => "Checking",
            Self::NoUpdateFound => "NoUpdateFound",
            Self::Available(_) => "Available",
            Self::Downloading { .. } => "Downloading",
            Self::Downloaded { .. } => "Downloaded",
            Self::Installing => "Installing",
        }
    }
}

impl std::fmt::Display for UpdateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Events pushed to the UI collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum UiEvent {
    UpdateAvailable { version: String },
    DownloadProgress { percent: f64 },
    UpdateDownloaded { version: String },
    PrintComplete(PrintResult),
}

impl UiEvent {
    /// Channel name the UI subscribes to.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UpdateAvailable { .. } => "update-available",
            Self::DownloadProgress { .. } => "download-progress",
            Self::UpdateDownloaded { .. } => "update-downloaded",
            Self::PrintComplete(_) => "print-complete",
        }
    }
}
