// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Printdesk.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for all Printdesk operations.
#[derive(Debug, Error)]
pub enum PrintdeskError {
    // -- Request validation --
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("a print request is already in progress")]
    PrintInProgress,

    // -- Staging / surfaces --
    #[error("content did not become ready within {0:?}")]
    LoadTimeout(Duration),

    #[error("content failed to load: {0}")]
    LoadError(String),

    #[error("no active view to print")]
    NoActiveSurface,

    // -- Printing --
    #[error("print device error: {0}")]
    PrintDevice(String),

    // -- State machines --
    #[error("cannot {action} while {from}")]
    InvalidStateTransition { from: String, action: &'static str },

    // -- Updates --
    #[error("update feed error: {0}")]
    UpdateFeed(String),

    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform bridge --
    #[error("platform bridge error: {0}")]
    Bridge(String),

    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PrintdeskError>;

/// Flat error taxonomy reported to the UI in `PrintResult::error`.
///
/// Serializes to the bare variant name (`"FileNotFound"`, `"IOError"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    FileNotFound,
    UnsupportedType,
    LoadTimeout,
    LoadError,
    PrintDeviceError,
    NoActiveSurface,
    #[serde(rename = "IOError")]
    IoError,
    InvalidStateTransition,
    PrintInProgress,
    UpdateError,
    PlatformUnavailable,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileNotFound => "FileNotFound",
            Self::UnsupportedType => "UnsupportedType",
            Self::LoadTimeout => "LoadTimeout",
            Self::LoadError => "LoadError",
            Self::PrintDeviceError => "PrintDeviceError",
            Self::NoActiveSurface => "NoActiveSurface",
            Self::IoError => "IOError",
            Self::InvalidStateTransition => "InvalidStateTransition",
            Self::PrintInProgress => "PrintInProgress",
            Self::UpdateError => "UpdateError",
            Self::PlatformUnavailable => "PlatformUnavailable",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PrintdeskError {
    /// Taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FileNotFound(_) => ErrorKind::FileNotFound,
            Self::UnsupportedType(_) => ErrorKind::UnsupportedType,
            Self::PrintInProgress => ErrorKind::PrintInProgress,
            Self::LoadTimeout(_) => ErrorKind::LoadTimeout,
            Self::LoadError(_) => ErrorKind::LoadError,
            Self::NoActiveSurface => ErrorKind::NoActiveSurface,
            Self::PrintDevice(_) => ErrorKind::PrintDeviceError,
            Self::InvalidStateTransition { .. } => ErrorKind::InvalidStateTransition,
            Self::UpdateFeed(_) | Self::IntegrityMismatch { .. } => ErrorKind::UpdateError,
            Self::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                ErrorKind::FileNotFound
            }
            Self::Io(_) | Self::Serialization(_) => ErrorKind::IoError,
            Self::Bridge(_) => ErrorKind::PrintDeviceError,
            Self::PlatformUnavailable => ErrorKind::PlatformUnavailable,
        }
    }
}
