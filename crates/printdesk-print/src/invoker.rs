// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Native print invocation.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::{error, info, instrument, warn};

use printdesk_bridge::traits::NativeSurface;
use printdesk_core::types::PrintOptions;

/// What the native layer reports when it printed nothing without an error.
const REFUSED_REASON: &str = "print was cancelled or the device refused the job";

/// Result of one native print call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintOutcome {
    pub success: bool,
    pub reason: Option<String>,
}

impl PrintOutcome {
    fn printed() -> Self {
        Self {
            success: true,
            reason: None,
        }
    }

    fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: Some(reason.into()),
        }
    }
}

/// Issues the platform print action against a ready surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintInvoker;

impl PrintInvoker {
    pub fn new() -> Self {
        Self
    }

    /// Print `surface` once with `options`.
    ///
    /// Never fails: native errors and panics come back as an unsuccessful
    /// outcome with a reason. There is no retry.
    #[instrument(skip_all, fields(surface = %surface.id(), printer = options.printer_name.as_deref().unwrap_or("<default>")))]
    pub async fn print(&self, surface: &dyn NativeSurface, options: &PrintOptions) -> PrintOutcome {
        match AssertUnwindSafe(surface.print(options)).catch_unwind().await {
            Ok(Ok(true)) => {
                info!("print job handed to the print subsystem");
                PrintOutcome::printed()
            }
            Ok(Ok(false)) => {
                warn!("{REFUSED_REASON}");
                PrintOutcome::failed(REFUSED_REASON)
            }
            Ok(Err(e)) => {
                error!(error = %e, "native print failed");
                PrintOutcome::failed(e.to_string())
            }
            Err(panic) => {
                let detail = panic_detail(panic.as_ref());
                error!(detail = %detail, "native print panicked");
                PrintOutcome::failed(format!("native print crashed: {detail}"))
            }
        }
    }
}

/// Message carried by a panic payload.
pub(crate) fn panic_detail(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
