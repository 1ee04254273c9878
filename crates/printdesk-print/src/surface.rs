// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Render-surface lifecycle.
//
// Hidden surfaces are handed out as `SurfaceLease`s. A lease is released
// exactly once: explicitly through `release`, or by `Drop` on any early
// return, error, or panic. Release deletes the staging artifact at once and
// destroys the native surface after an optional grace delay on a background
// task, so the native print dialog can detach without holding up the result.
// A deferred close still happens if that task is cancelled (runtime shutdown),
// and `shutdown` flushes every deferred close immediately.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::NamedTempFile;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use printdesk_bridge::traits::{NativeSurface, SurfaceHost};
use printdesk_core::error::{PrintdeskError, Result};
use printdesk_core::types::{SurfaceId, SurfaceState};

/// Capacity of the transition broadcast channel.
const TRANSITION_CHANNEL_CAPACITY: usize = 64;

/// One state change of one surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceTransition {
    pub surface: SurfaceId,
    pub state: SurfaceState,
}

/// Creates hidden surfaces and tracks them until they are closed.
///
/// Cheap to clone; clones share the live set and the transition channel.
#[derive(Clone)]
pub struct SurfaceLifecycle {
    host: Arc<dyn SurfaceHost>,
    grace: Duration,
    transitions: broadcast::Sender<SurfaceTransition>,
    live: Arc<Mutex<HashSet<SurfaceId>>>,
    /// Released surfaces waiting out the grace delay.
    pending: Arc<Mutex<HashMap<SurfaceId, Arc<dyn NativeSurface>>>>,
}

impl SurfaceLifecycle {
    pub fn new(host: Arc<dyn SurfaceHost>, grace: Duration) -> Self {
        let (transitions, _) = broadcast::channel(TRANSITION_CHANNEL_CAPACITY);
        Self {
            host,
            grace,
            transitions,
            live: Arc::new(Mutex::new(HashSet::new())),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Observe every state change of every surface from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SurfaceTransition> {
        self.transitions.subscribe()
    }

    /// Number of surfaces created and not yet destroyed.
    pub fn live_surfaces(&self) -> usize {
        self.live.lock().map(|live| live.len()).unwrap_or(0)
    }

    /// Whether the host's surfaces can lay out HTML.
    pub fn renders_markup(&self) -> bool {
        self.host.renders_markup()
    }

    /// Number of released surfaces whose native close is still deferred.
    pub fn pending_closes(&self) -> usize {
        self.pending.lock().map(|pending| pending.len()).unwrap_or(0)
    }

    /// Close every surface still waiting out its grace delay, right now.
    ///
    /// Call before the runtime goes away. Later grace timers find nothing
    /// left to close.
    pub fn shutdown(&self) {
        let drained: Vec<_> = match self.pending.lock() {
            Ok(mut pending) => pending.drain().collect(),
            Err(_) => Vec::new(),
        };
        if !drained.is_empty() {
            debug!(count = drained.len(), "flushing deferred surface closes");
        }
        for (id, native) in drained {
            self.destroy(id, native.as_ref());
        }
    }

    /// Create a native surface and lease it to the caller in `Created`.
    pub fn acquire(&self) -> Result<SurfaceLease> {
        let id = SurfaceId::new();
        let native: Arc<dyn NativeSurface> = Arc::from(self.host.create_surface(id)?);

        if let Ok(mut live) = self.live.lock() {
            live.insert(id);
        }
        self.publish(id, SurfaceState::Created);
        debug!(surface = %id, "surface created");

        Ok(SurfaceLease {
            id,
            state: SurfaceState::Created,
            native,
            staging: None,
            lifecycle: self.clone(),
        })
    }

    fn publish(&self, surface: SurfaceId, state: SurfaceState) {
        // No subscribers is fine.
        let _ = self.transitions.send(SurfaceTransition { surface, state });
    }

    fn defer_close(&self, id: SurfaceId, native: Arc<dyn NativeSurface>) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.insert(id, native);
        }
    }

    /// Close a deferred surface unless `shutdown` already did.
    fn finish_deferred(&self, id: SurfaceId) {
        let native = self.pending.lock().ok().and_then(|mut pending| pending.remove(&id));
        if let Some(native) = native {
            self.destroy(id, native.as_ref());
        }
    }

    /// Destroy the native surface and announce `Closed`.
    fn destroy(&self, id: SurfaceId, native: &dyn NativeSurface) {
        native.close();
        if let Ok(mut live) = self.live.lock() {
            live.remove(&id);
        }
        self.publish(id, SurfaceState::Closed);
        debug!(surface = %id, "surface closed");
    }
}

/// Exclusive use of one hidden surface for the duration of one request.
pub struct SurfaceLease {
    id: SurfaceId,
    state: SurfaceState,
    native: Arc<dyn NativeSurface>,
    staging: Option<NamedTempFile>,
    lifecycle: SurfaceLifecycle,
}

impl SurfaceLease {
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    pub fn surface(&self) -> &dyn NativeSurface {
        self.native.as_ref()
    }

    /// Tie a staging file to this lease; it is deleted on release.
    pub fn attach_staging(&mut self, file: NamedTempFile) {
        self.staging = Some(file);
    }

    pub fn staging_path(&self) -> Option<&Path> {
        self.staging.as_ref().map(NamedTempFile::path)
    }

    /// Move forward to `next`. States may be skipped but never revisited,
    /// and `Closed` is only reachable through release.
    pub fn advance(&mut self, next: SurfaceState) -> Result<()> {
        if next <= self.state || next == SurfaceState::Closed {
            return Err(PrintdeskError::InvalidStateTransition {
                from: format!("{:?}", self.state),
                action: "advance surface",
            });
        }
        self.state = next;
        self.lifecycle.publish(self.id, next);
        Ok(())
    }

    /// Give the surface back. Equivalent to dropping the lease.
    pub fn release(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if self.state == SurfaceState::Closed {
            return;
        }
        self.state = SurfaceState::Closed;

        if let Some(staging) = self.staging.take() {
            let path = staging.path().to_path_buf();
            if let Err(e) = staging.close() {
                warn!(surface = %self.id, path = %path.display(), error = %e, "failed to delete staging file");
            }
        }

        let grace = self.lifecycle.grace;
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) if !grace.is_zero() => {
                debug!(surface = %self.id, grace_ms = grace.as_millis() as u64, "deferring surface close");
                self.lifecycle.defer_close(self.id, Arc::clone(&self.native));
                let close = DeferredClose {
                    lifecycle: self.lifecycle.clone(),
                    id: self.id,
                };
                runtime.spawn(async move {
                    tokio::time::sleep(grace).await;
                    drop(close);
                });
            }
            _ => self.lifecycle.destroy(self.id, self.native.as_ref()),
        }
    }
}

/// Closes a deferred surface when dropped: after the grace sleep, or when
/// the runtime cancels the sleeping task.
struct DeferredClose {
    lifecycle: SurfaceLifecycle,
    id: SurfaceId,
}

impl Drop for DeferredClose {
    fn drop(&mut self) {
        self.lifecycle.finish_deferred(self.id);
    }
}

impl Drop for SurfaceLease {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl std::fmt::Debug for SurfaceLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceLease")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("staging", &self.staging_path())
            .finish()
    }
}
