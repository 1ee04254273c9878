// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Explicitly scoped view session.
//
// The window-lifecycle owner creates one `ViewSession` per primary view and
// closes it when the view is torn down. Print and update components receive
// the session per call instead of looking up "the focused window", so a
// closed view can never be printed or receive events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use printdesk_core::types::UiEvent;
use tracing::debug;
use uuid::Uuid;

use crate::traits::{EventSink, NativeSurface};

/// Identifier of one view session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to the primary view and its event channel.
pub struct ViewSession {
    id: SessionId,
    primary: Mutex<Option<Arc<dyn NativeSurface>>>,
    sink: Arc<dyn EventSink>,
    open: AtomicBool,
}

impl ViewSession {
    pub fn new(sink: Arc<dyn EventSink>) -> Arc<Self> {
        Arc::new(Self {
            id: SessionId(Uuid::new_v4()),
            primary: Mutex::new(None),
            sink,
            open: AtomicBool::new(true),
        })
    }

    /// Session bound to an existing primary surface.
    pub fn with_primary(sink: Arc<dyn EventSink>, primary: Arc<dyn NativeSurface>) -> Arc<Self> {
        let session = Self::new(sink);
        session.set_primary(Some(primary));
        session
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Replace the primary surface (e.g. after the view navigated).
    pub fn set_primary(&self, surface: Option<Arc<dyn NativeSurface>>) {
        if let Ok(mut slot) = self.primary.lock() {
            *slot = surface;
        }
    }

    /// The primary surface as of now, or None once the session is closed.
    pub fn primary_surface(&self) -> Option<Arc<dyn NativeSurface>> {
        if !self.is_open() {
            return None;
        }
        self.primary.lock().ok().and_then(|slot| slot.clone())
    }

    /// Deliver an event to the view. Dropped silently after `close`.
    pub fn emit(&self, event: UiEvent) {
        if self.is_open() {
            self.sink.emit(event);
        } else {
            debug!(session = %self.id, event = event.name(), "dropping event for closed session");
        }
    }

    /// Mark the view as torn down. Idempotent.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            self.set_primary(None);
            debug!(session = %self.id, "view session closed");
        }
    }
}

impl std::fmt::Debug for ViewSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewSession")
            .field("id", &self.id)
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use async_trait::async_trait;
    use printdesk_core::error::Result;
    use printdesk_core::types::{PrintOptions, SurfaceId};

    #[derive(Default)]
    struct Recorder(Mutex<Vec<UiEvent>>);

    impl EventSink for Recorder {
        fn emit(&self, event: UiEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    struct Dummy(SurfaceId);

    #[async_trait]
    impl NativeSurface for Dummy {
        fn id(&self) -> SurfaceId {
            self.0
        }
        async fn load_file(&self, _path: &Path) -> Result<()> {
            Ok(())
        }
        async fn print(&self, _options: &PrintOptions) -> Result<bool> {
            Ok(true)
        }
        fn close(&self) {}
    }

    #[test]
    fn closed_session_drops_events_and_surface() {
        let recorder = Arc::new(Recorder::default());
        let session = ViewSession::with_primary(recorder.clone(), Arc::new(Dummy(SurfaceId::new())));

        session.emit(UiEvent::DownloadProgress { percent: 10.0 });
        assert!(session.primary_surface().is_some());

        session.close();
        session.close();
        session.emit(UiEvent::DownloadProgress { percent: 20.0 });

        assert!(session.primary_surface().is_none());
        assert_eq!(recorder.0.lock().unwrap().len(), 1);
    }
}
