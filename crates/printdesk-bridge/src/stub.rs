// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub bridge for targets without a desktop shell.
//
// Every trait method returns `PlatformUnavailable`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use printdesk_core::error::{PrintdeskError, Result};
use printdesk_core::types::{PrinterInfo, SurfaceId};

use crate::traits::*;

/// No-op bridge returned on unsupported platforms.
pub struct StubBridge;

impl PlatformBridge for StubBridge {
    fn platform_name(&self) -> &str {
        "Unsupported (stub)"
    }
}

impl SurfaceHost for StubBridge {
    fn create_surface(&self, _id: SurfaceId) -> Result<Box<dyn NativeSurface>> {
        tracing::warn!("SurfaceHost::create_surface called on stub bridge");
        Err(PrintdeskError::PlatformUnavailable)
    }
}

#[async_trait]
impl NativeOpener for StubBridge {
    async fn open_path(&self, _path: &Path) -> Result<()> {
        tracing::warn!("NativeOpener::open_path called on stub bridge");
        Err(PrintdeskError::PlatformUnavailable)
    }
}

#[async_trait]
impl NativePrinters for StubBridge {
    async fn list_printers(&self) -> Result<Vec<PrinterInfo>> {
        Err(PrintdeskError::PlatformUnavailable)
    }
}

#[async_trait]
impl NativeFilePicker for StubBridge {
    async fn pick_file(&self, _filter: &FileFilter) -> Result<Option<PathBuf>> {
        tracing::warn!("NativeFilePicker::pick_file called on stub bridge");
        Err(PrintdeskError::PlatformUnavailable)
    }
}
