// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer: wires the platform bridge into the print router and
// the update manager, and exposes the operations the UI calls.
//
// Print operations are awaited by the caller and always yield a
// `PrintResult`. Update operations are fire-and-forget: they run on spawned
// tasks, report through session events, and only log their failures.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use printdesk_bridge::traits::{
    NativeFilePicker, NativeOpener, NativePrinters, PRINTABLE_FILES, PlatformBridge, SurfaceHost,
};
use printdesk_bridge::{SessionId, ViewSession};
use printdesk_core::AppConfig;
use printdesk_core::error::Result;
use printdesk_core::types::{PrintRequest, PrintResult, PrintSource, PrinterInfo, UpdateState};
use printdesk_print::PrintRequestRouter;
use printdesk_update::{HttpFeed, UpdateFeed, UpdateLifecycleManager};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::data_dir;

const CONFIG_FILE: &str = "config.json";

/// Shared application services.
///
/// All fields are cheaply cloneable (Arc-wrapped) so the struct can be moved
/// into spawned tasks.
#[derive(Clone)]
pub struct AppServices {
    router: Arc<PrintRequestRouter>,
    updater: Option<Arc<UpdateLifecycleManager>>,
    picker: Arc<dyn NativeFilePicker>,
    printers: Arc<dyn NativePrinters>,
    data_dir: PathBuf,
    config: Arc<Mutex<AppConfig>>,
}

impl AppServices {
    /// Initialise all services for this platform. Call once at startup.
    ///
    /// A missing or unreadable `config.json` falls back to defaults. The
    /// updater is only enabled when a feed URL is configured.
    pub fn init() -> Self {
        let dir = data_dir::data_dir();
        info!(path = %dir.display(), "initialising app services");

        let config = load_config(&dir).unwrap_or_default();
        let feed = config.update.feed_url.as_deref().map(|url| {
            Arc::new(HttpFeed::new(url, data_dir::data_subdir("updates"))) as Arc<dyn UpdateFeed>
        });
        if feed.is_none() {
            debug!("no update feed configured, updater disabled");
        }

        Self::with_bridge(printdesk_bridge::platform_bridge(), feed, dir, config)
    }

    /// Assemble services from an explicit bridge and feed.
    pub fn with_bridge<B: PlatformBridge + 'static>(
        bridge: Arc<B>,
        feed: Option<Arc<dyn UpdateFeed>>,
        data_dir: PathBuf,
        config: AppConfig,
    ) -> Self {
        info!(platform = bridge.platform_name(), "platform bridge ready");

        let surfaces: Arc<dyn SurfaceHost> = bridge.clone();
        let opener: Arc<dyn NativeOpener> = bridge.clone();
        let router = PrintRequestRouter::new(surfaces, opener, config.print.clone());

        Self {
            router: Arc::new(router),
            updater: feed.map(|feed| Arc::new(UpdateLifecycleManager::new(feed))),
            picker: bridge.clone(),
            printers: bridge,
            data_dir,
            config: Arc::new(Mutex::new(config)),
        }
    }

    // -- Printing ------------------------------------------------------------

    /// Print the current view or an external file.
    pub async fn submit_print(
        &self,
        session: &ViewSession,
        source: PrintSource,
        printer_name: Option<String>,
    ) -> PrintResult {
        self.router
            .submit(session, PrintRequest::new(source, printer_name))
            .await
    }

    /// Close hidden surfaces still waiting out their release grace delay.
    /// Call once before the runtime shuts down.
    pub fn shutdown(&self) {
        self.router.shutdown();
    }

    /// Let the user choose a document to print. Cancel and failure both
    /// yield `None`.
    pub async fn select_file(&self) -> Option<PathBuf> {
        match self.picker.pick_file(&PRINTABLE_FILES).await {
            Ok(picked) => picked,
            Err(e) => {
                warn!(error = %e, "file picker unavailable");
                None
            }
        }
    }

    /// Printers known to the OS. Empty when the platform can't say.
    pub async fn list_printers(&self) -> Vec<PrinterInfo> {
        match self.printers.list_printers().await {
            Ok(printers) => printers,
            Err(e) => {
                warn!(error = %e, "could not list printers");
                Vec::new()
            }
        }
    }

    // -- Updates -------------------------------------------------------------

    /// Start an update check. With `auto_download` enabled a found release is
    /// downloaded straight away. Returns `None` when no feed is configured.
    pub fn check_for_updates(&self) -> Option<JoinHandle<()>> {
        let updater = self.updater()?;
        let auto_download = self.config().update.auto_download;
        Some(tokio::spawn(async move {
            match updater.check().await {
                Ok(Some(info)) if auto_download => {
                    info!(version = %info.version, "downloading update automatically");
                    if let Err(e) = updater.download().await {
                        error!(error = %e, "automatic update download failed");
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "update check failed"),
            }
        }))
    }

    pub fn download_update(&self) -> Option<JoinHandle<()>> {
        let updater = self.updater()?;
        Some(tokio::spawn(async move {
            if let Err(e) = updater.download().await {
                error!(error = %e, "update download failed");
            }
        }))
    }

    pub fn install_update(&self) -> Option<JoinHandle<()>> {
        let updater = self.updater()?;
        Some(tokio::spawn(async move {
            if let Err(e) = updater.install() {
                error!(error = %e, "update install failed");
            }
        }))
    }

    /// Current updater state, if the updater is enabled.
    pub fn update_state(&self) -> Option<UpdateState> {
        self.updater.as_ref().map(|u| u.state())
    }

    fn updater(&self) -> Option<Arc<UpdateLifecycleManager>> {
        if self.updater.is_none() {
            debug!("update action ignored, no feed configured");
        }
        self.updater.clone()
    }

    // -- Sessions ------------------------------------------------------------

    /// Route update events to `session`.
    pub fn attach_session(&self, session: Arc<ViewSession>) {
        if let Some(updater) = &self.updater {
            updater.attach(session);
        }
    }

    pub fn detach_session(&self, id: SessionId) {
        if let Some(updater) = &self.updater {
            updater.detach(id);
        }
    }

    // -- Configuration -------------------------------------------------------

    pub fn config(&self) -> AppConfig {
        self.config
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Persist `config` to `config.json`. Print settings apply from the next
    /// launch; the running router keeps the settings it was built with.
    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        *self.config.lock().unwrap_or_else(PoisonError::into_inner) = config.clone();
        persist_config(&self.data_dir, config)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

// ---------------------------------------------------------------------------
// Config persistence helpers
// ---------------------------------------------------------------------------

fn load_config(data_dir: &Path) -> Option<AppConfig> {
    let path = data_dir.join(CONFIG_FILE);
    let data = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&data) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring invalid config file");
            None
        }
    }
}

fn persist_config(data_dir: &Path, config: &AppConfig) -> Result<()> {
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}
