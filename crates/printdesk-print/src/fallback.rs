// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// External-viewer fallback.
//
// When a file can't be printed from a hidden surface it is handed to the OS
// default application. Success here means "opened for the user to print",
// and the message says so.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use printdesk_bridge::traits::NativeOpener;
use printdesk_core::error::{ErrorKind, PrintdeskError};
use printdesk_core::human_errors::humanize_error;
use printdesk_core::types::PrintResult;

/// Result of handing a file to the default application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackOutcome {
    pub success: bool,
    pub message: String,
    pub error: Option<ErrorKind>,
}

impl FallbackOutcome {
    pub fn into_result(self) -> PrintResult {
        match self.error {
            None if self.success => PrintResult::opened_externally(self.message),
            kind => PrintResult::failed(kind.unwrap_or(ErrorKind::IoError), self.message),
        }
    }
}

/// Opens files in the OS default handler.
#[derive(Clone)]
pub struct FallbackOpener {
    opener: Arc<dyn NativeOpener>,
}

impl FallbackOpener {
    pub fn new(opener: Arc<dyn NativeOpener>) -> Self {
        Self { opener }
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn open_externally(&self, path: &Path) -> FallbackOutcome {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        match self.opener.open_path(path).await {
            Ok(()) => {
                info!("opened in default application for manual printing");
                FallbackOutcome {
                    success: true,
                    message: format!(
                        "{name} can't be printed directly, so it was opened in your default application. Please print it from there."
                    ),
                    error: None,
                }
            }
            Err(PrintdeskError::UnsupportedType(_) | PrintdeskError::PlatformUnavailable) => {
                warn!("no application available to open file");
                FallbackOutcome {
                    success: false,
                    message: format!(
                        "{name} can't be printed directly and no application is installed that can open it."
                    ),
                    error: Some(ErrorKind::UnsupportedType),
                }
            }
            Err(e) => {
                warn!(error = %e, "opening file externally failed");
                FallbackOutcome {
                    success: false,
                    message: humanize_error(&e).status_line(),
                    error: Some(ErrorKind::IoError),
                }
            }
        }
    }
}
