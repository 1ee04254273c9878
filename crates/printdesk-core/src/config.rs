// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::PrintOptions;

/// What to do with files the render surface can load without wrapping
/// (PDF, HTML).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NativePolicy {
    /// Load the file into a hidden surface and print it from there.
    DirectSurface,
    /// Hand the file to the OS default viewer and let the user print.
    ExternalViewer,
}

/// Settings for the print pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintConfig {
    pub native_policy: NativePolicy,
    /// How long a staged surface may take to signal that content is ready.
    pub load_timeout_ms: u64,
    /// Delay before a used surface is destroyed, so the native dialog can
    /// detach. Zero closes immediately.
    pub release_grace_ms: u64,
    /// Options applied to every print call; the request may override the printer.
    pub options: PrintOptions,
}

impl PrintConfig {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn release_grace(&self) -> Duration {
        Duration::from_millis(self.release_grace_ms)
    }
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            native_policy: NativePolicy::DirectSurface,
            load_timeout_ms: 10_000,
            release_grace_ms: 1_000,
            options: PrintOptions::default(),
        }
    }
}

/// Settings for the self-updater.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Check the feed once when the primary view opens.
    pub check_on_launch: bool,
    /// Start downloading as soon as an update is found. Off by default: the
    /// user confirms the download.
    pub auto_download: bool,
    /// Release feed location. `None` disables the updater.
    pub feed_url: Option<String>,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            check_on_launch: true,
            auto_download: false,
            feed_url: None,
        }
    }
}

/// Persistent application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub print: PrintConfig,
    pub update: UpdateConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.print.load_timeout(), Duration::from_secs(10));
        assert_eq!(config.print.native_policy, NativePolicy::DirectSurface);
        assert!(!config.update.auto_download);
        assert!(config.print.options.print_background);
        assert_eq!(config.print.options.scale_factor, 100);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "print": { "native_policy": "ExternalViewer" } }"#).unwrap();
        assert_eq!(config.print.native_policy, NativePolicy::ExternalViewer);
        assert_eq!(config.print.load_timeout_ms, 10_000);
        assert!(config.update.check_on_launch);
    }
}
