// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print request routing.
//
// Every request produces exactly one `PrintResult`, which is also delivered to
// the submitting session as a `print-complete` event. Errors and panics never
// escape `submit`; they are converted to an error kind plus a plain-language
// message.

use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use tracing::{debug, error, info, instrument, warn};

use printdesk_bridge::ViewSession;
use printdesk_bridge::traits::{NativeOpener, SurfaceHost};
use printdesk_core::config::{NativePolicy, PrintConfig};
use printdesk_core::error::PrintdeskError;
use printdesk_core::human_errors::humanize_error;
use printdesk_core::types::{
    FileClassification, PrintOptions, PrintRequest, PrintResult, PrintSource, SurfaceState, UiEvent,
};

use crate::fallback::FallbackOpener;
use crate::invoker::{PrintInvoker, PrintOutcome, panic_detail};
use crate::render::ContentRenderer;
use crate::surface::SurfaceLifecycle;

/// Entry point for print requests.
pub struct PrintRequestRouter {
    lifecycle: SurfaceLifecycle,
    renderer: ContentRenderer,
    invoker: PrintInvoker,
    fallback: FallbackOpener,
    config: PrintConfig,
    in_flight: AtomicBool,
}

/// Holds the single in-flight slot until dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn enter(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl PrintRequestRouter {
    pub fn new(
        surfaces: Arc<dyn SurfaceHost>,
        opener: Arc<dyn NativeOpener>,
        config: PrintConfig,
    ) -> Self {
        let lifecycle = SurfaceLifecycle::new(surfaces, config.release_grace());
        let renderer = ContentRenderer::new(lifecycle.clone(), config.load_timeout());
        Self {
            lifecycle,
            renderer,
            invoker: PrintInvoker::new(),
            fallback: FallbackOpener::new(opener),
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    /// The surface lifecycle, for observing transitions.
    pub fn lifecycle(&self) -> &SurfaceLifecycle {
        &self.lifecycle
    }

    pub fn config(&self) -> &PrintConfig {
        &self.config
    }

    /// Tear down surfaces still inside their release grace delay.
    pub fn shutdown(&self) {
        self.lifecycle.shutdown();
    }

    /// Handle one print request end to end.
    ///
    /// A request submitted while another is still running is rejected with
    /// `PrintInProgress` rather than queued.
    #[instrument(skip_all, fields(request = %request.id()))]
    pub async fn submit(&self, session: &ViewSession, request: PrintRequest) -> PrintResult {
        let result = match InFlight::enter(&self.in_flight) {
            Some(slot) => {
                let dispatched = AssertUnwindSafe(self.dispatch(session, &request))
                    .catch_unwind()
                    .await;
                drop(slot);
                dispatched.unwrap_or_else(|panic| {
                    let detail = panic_detail(panic.as_ref());
                    error!(detail = %detail, "print pipeline panicked");
                    failure(&PrintdeskError::LoadError(format!("print pipeline crashed: {detail}")))
                })
            }
            None => {
                warn!("print request rejected, another is in flight");
                failure(&PrintdeskError::PrintInProgress)
            }
        };

        info!(
            success = result.success,
            error = result.error.map(|k| k.as_str()),
            "print request finished"
        );
        session.emit(UiEvent::PrintComplete(result.clone()));
        result
    }

    async fn dispatch(&self, session: &ViewSession, request: &PrintRequest) -> PrintResult {
        let options = self.config.options.for_printer(
            request
                .printer_name()
                .or(self.config.options.printer_name.as_deref()),
        );

        match request.source() {
            PrintSource::CurrentView => self.print_current_view(session, &options).await,
            PrintSource::ExternalFile(path) => self.print_file(path, &options).await,
        }
    }

    async fn print_current_view(&self, session: &ViewSession, options: &PrintOptions) -> PrintResult {
        let Some(surface) = session.primary_surface() else {
            return failure(&PrintdeskError::NoActiveSurface);
        };
        debug!(surface = %surface.id(), "printing primary view");
        outcome_to_result(self.invoker.print(surface.as_ref(), options).await)
    }

    async fn print_file(&self, path: &Path, options: &PrintOptions) -> PrintResult {
        match tokio::fs::metadata(path).await {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return failure(&PrintdeskError::FileNotFound(path.to_path_buf()));
            }
            Err(e) => return failure(&PrintdeskError::Io(e)),
            Ok(meta) if meta.is_dir() => {
                return failure(&PrintdeskError::UnsupportedType("folder".into()));
            }
            Ok(_) => {}
        }

        let classification = FileClassification::from_path(path);
        debug!(classification = classification.label(), "file classified");

        let external = match classification {
            FileClassification::Unsupported => true,
            FileClassification::Native => {
                matches!(self.config.native_policy, NativePolicy::ExternalViewer)
            }
            FileClassification::Renderable => false,
        };
        if external {
            return self.fallback.open_externally(path).await.into_result();
        }

        let mut lease = match self.renderer.stage(path, classification).await {
            Ok(lease) => lease,
            Err(PrintdeskError::PlatformUnavailable) => {
                info!("no hidden surfaces on this platform, opening externally");
                return self.fallback.open_externally(path).await.into_result();
            }
            Err(e) => return failure(&e),
        };

        if let Err(e) = lease.advance(SurfaceState::Printing) {
            return failure(&e);
        }
        let outcome = self.invoker.print(lease.surface(), options).await;
        lease.release();
        outcome_to_result(outcome)
    }
}

fn failure(err: &PrintdeskError) -> PrintResult {
    PrintResult::failed(err.kind(), humanize_error(err).status_line())
}

/// The device's own reason is appended so it reaches the user.
fn outcome_to_result(outcome: PrintOutcome) -> PrintResult {
    if outcome.success {
        return PrintResult::printed();
    }
    let reason = outcome.reason.unwrap_or_default();
    let err = PrintdeskError::PrintDevice(reason.clone());
    let status = humanize_error(&err).status_line();
    let message = if reason.is_empty() {
        status
    } else {
        format!("{status} ({reason})")
    };
    PrintResult::failed(err.kind(), message)
}
