// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Update lifecycle state machine.
//
//   Idle | NoUpdateFound --check--> Checking --> NoUpdateFound | Available
//   Available --download--> Downloading --> Downloaded
//   Downloaded --install--> Installing
//
// Every operation called from the wrong state fails with
// `InvalidStateTransition` and leaves the state untouched. Feed failures
// step back to the state the operation started from.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use printdesk_bridge::{SessionId, ViewSession};
use printdesk_core::error::{PrintdeskError, Result};
use printdesk_core::types::{UiEvent, UpdateInfo, UpdateState};

use crate::feed::UpdateFeed;
use crate::integrity;

/// Owns the update state and relays its events to one view session.
pub struct UpdateLifecycleManager {
    feed: Arc<dyn UpdateFeed>,
    state: Mutex<UpdateState>,
    listener: Mutex<Option<Arc<ViewSession>>>,
}

impl UpdateLifecycleManager {
    pub fn new(feed: Arc<dyn UpdateFeed>) -> Self {
        Self {
            feed,
            state: Mutex::new(UpdateState::Idle),
            listener: Mutex::new(None),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> UpdateState {
        self.lock_state().clone()
    }

    /// Make `session` the only recipient of update events.
    pub fn attach(&self, session: Arc<ViewSession>) {
        debug!(session = %session.id(), "update listener attached");
        *self.lock_listener() = Some(session);
    }

    /// Stop relaying to `id`. A different attached session is left alone.
    pub fn detach(&self, id: SessionId) {
        let mut listener = self.lock_listener();
        if listener.as_ref().is_some_and(|s| s.id() == id) {
            *listener = None;
            debug!(session = %id, "update listener detached");
        }
    }

    /// Ask the feed for a newer release.
    #[instrument(skip(self))]
    pub async fn check(&self) -> Result<Option<UpdateInfo>> {
        self.advance("check for updates", |state| match state {
            UpdateState::Idle | UpdateState::NoUpdateFound => Some((UpdateState::Checking, ())),
            _ => None,
        })?;

        match self.feed.latest().await {
            Ok(Some(info)) => {
                info!(version = %info.version, "update available");
                self.set(UpdateState::Available(info.clone()));
                self.emit(UiEvent::UpdateAvailable {
                    version: info.version.clone(),
                });
                Ok(Some(info))
            }
            Ok(None) => {
                info!("no update available");
                self.set(UpdateState::NoUpdateFound);
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "update check failed");
                self.set(UpdateState::Idle);
                Err(e)
            }
        }
    }

    /// Download the available release, relaying progress, then verify it.
    #[instrument(skip(self))]
    pub async fn download(&self) -> Result<PathBuf> {
        let info = self.advance("download an update", |state| match state {
            UpdateState::Available(info) => Some((
                UpdateState::Downloading {
                    info: info.clone(),
                    percent: 0.0,
                },
                info.clone(),
            )),
            _ => None,
        })?;

        let (tx, rx) = mpsc::unbounded_channel();
        let (fetched, ()) = tokio::join!(self.feed.download(&info, tx), self.relay_progress(rx));

        let artifact = match fetched {
            Ok(artifact) => artifact,
            Err(e) => {
                error!(error = %e, "update download failed");
                self.set(UpdateState::Available(info));
                return Err(e);
            }
        };

        if let Some(expected) = info.sha256.as_deref() {
            if let Err(e) = integrity::verify_file(&artifact, expected).await {
                error!(error = %e, path = %artifact.display(), "update payload rejected");
                if let Err(rm) = tokio::fs::remove_file(&artifact).await {
                    warn!(error = %rm, "could not remove rejected payload");
                }
                self.set(UpdateState::Available(info));
                return Err(e);
            }
            debug!("update payload checksum verified");
        }

        info!(version = %info.version, path = %artifact.display(), "update downloaded");
        let version = info.version.clone();
        self.set(UpdateState::Downloaded {
            info,
            artifact: artifact.clone(),
        });
        self.emit(UiEvent::UpdateDownloaded { version });
        Ok(artifact)
    }

    /// Hand over to the installer of the downloaded release.
    ///
    /// If the installer can't be launched the download is kept and the state
    /// returns to `Downloaded`, so installing can be retried.
    #[instrument(skip(self))]
    pub fn install(&self) -> Result<()> {
        let (info, artifact) = self.advance("install an update", |state| match state {
            UpdateState::Downloaded { info, artifact } => {
                Some((UpdateState::Installing, (info.clone(), artifact.clone())))
            }
            _ => None,
        })?;

        info!(version = %info.version, "installing update");
        if let Err(e) = self.feed.quit_and_install(&artifact) {
            error!(error = %e, "installer could not be started");
            self.set(UpdateState::Downloaded { info, artifact });
            return Err(e);
        }
        Ok(())
    }

    /// Forward sanitised progress until the feed drops its sender.
    ///
    /// Values are clamped to 0..=100 and anything below the last relayed
    /// value is dropped, so listeners only ever see a non-decreasing series.
    async fn relay_progress(&self, mut rx: mpsc::UnboundedReceiver<f64>) {
        let mut last: Option<f64> = None;
        while let Some(raw) = rx.recv().await {
            if raw.is_nan() {
                continue;
            }
            let percent = raw.clamp(0.0, 100.0);
            if last.is_some_and(|prev| percent < prev) {
                continue;
            }
            last = Some(percent);

            if let UpdateState::Downloading { percent: p, .. } = &mut *self.lock_state() {
                *p = percent;
            }
            self.emit(UiEvent::DownloadProgress { percent });
        }
    }

    /// Apply `step` to the current state under the lock.
    ///
    /// `step` returns the next state plus whatever the caller needs from the
    /// old one, or `None` when the action is not allowed from here.
    fn advance<T>(
        &self,
        action: &'static str,
        step: impl FnOnce(&UpdateState) -> Option<(UpdateState, T)>,
    ) -> Result<T> {
        let mut state = self.lock_state();
        match step(&state) {
            Some((next, carried)) => {
                debug!(from = %*state, to = %next, "update state");
                *state = next;
                Ok(carried)
            }
            None => {
                warn!(from = %*state, action, "rejected update action");
                Err(PrintdeskError::InvalidStateTransition {
                    from: state.label().to_string(),
                    action,
                })
            }
        }
    }

    fn set(&self, next: UpdateState) {
        let mut state = self.lock_state();
        debug!(from = %*state, to = %next, "update state");
        *state = next;
    }

    fn emit(&self, event: UiEvent) {
        let listener = self.lock_listener().clone();
        match listener {
            Some(session) => session.emit(event),
            None => debug!(event = event.name(), "no update listener attached"),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, UpdateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_listener(&self) -> MutexGuard<'_, Option<Arc<ViewSession>>> {
        self.listener.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use async_trait::async_trait;
    use printdesk_bridge::traits::EventSink;

    use crate::integrity::hash_bytes;

    const PAYLOAD: &[u8] = b"printdesk 2.1.0 installer";

    #[derive(Default)]
    struct Sink(Mutex<Vec<UiEvent>>);

    impl Sink {
        fn events(&self) -> Vec<UiEvent> {
            self.0.lock().unwrap().clone()
        }

        fn progress(&self) -> Vec<f64> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    UiEvent::DownloadProgress { percent } => Some(percent),
                    _ => None,
                })
                .collect()
        }
    }

    impl EventSink for Sink {
        fn emit(&self, event: UiEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    struct ScriptedFeed {
        latest: Mutex<Vec<Result<Option<UpdateInfo>>>>,
        progress: Vec<f64>,
        /// Held open until a permit is added, to keep a download running.
        gate: Option<tokio::sync::Semaphore>,
        download_fails: bool,
        install_fails: bool,
        dir: tempfile::TempDir,
        installed: Mutex<Vec<PathBuf>>,
    }

    impl ScriptedFeed {
        fn offering(info: UpdateInfo) -> Self {
            Self {
                latest: Mutex::new(vec![Ok(Some(info))]),
                progress: vec![0.0, 15.0, 47.0, 100.0],
                gate: None,
                download_fails: false,
                install_fails: false,
                dir: tempfile::tempdir().unwrap(),
                installed: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl UpdateFeed for ScriptedFeed {
        async fn latest(&self) -> Result<Option<UpdateInfo>> {
            let mut queue = self.latest.lock().unwrap();
            if queue.is_empty() {
                Ok(None)
            } else {
                queue.remove(0)
            }
        }

        async fn download(
            &self,
            info: &UpdateInfo,
            progress: mpsc::UnboundedSender<f64>,
        ) -> Result<PathBuf> {
            if let Some(gate) = &self.gate {
                let _permit = gate.acquire().await.unwrap();
            }
            for p in &self.progress {
                progress.send(*p).unwrap();
                tokio::task::yield_now().await;
            }
            if self.download_fails {
                return Err(PrintdeskError::UpdateFeed("connection reset".into()));
            }
            let path = self.dir.path().join(format!("printdesk-{}.bin", info.version));
            std::fs::write(&path, PAYLOAD)?;
            Ok(path)
        }

        fn quit_and_install(&self, artifact: &Path) -> Result<()> {
            if self.install_fails {
                return Err(PrintdeskError::Io(std::io::Error::from(
                    std::io::ErrorKind::PermissionDenied,
                )));
            }
            self.installed.lock().unwrap().push(artifact.to_path_buf());
            Ok(())
        }
    }

    fn manager(feed: ScriptedFeed) -> (UpdateLifecycleManager, Arc<ScriptedFeed>, Arc<Sink>) {
        let feed = Arc::new(feed);
        let sink = Arc::new(Sink::default());
        let manager = UpdateLifecycleManager::new(feed.clone());
        manager.attach(ViewSession::new(sink.clone()));
        (manager, feed, sink)
    }

    #[tokio::test]
    async fn check_download_install_happy_path() {
        let (manager, feed, sink) = manager(ScriptedFeed::offering(UpdateInfo::new("2.1.0")));

        let offered = manager.check().await.unwrap();
        assert_eq!(offered.map(|i| i.version).as_deref(), Some("2.1.0"));
        assert!(matches!(manager.state(), UpdateState::Available(_)));

        let artifact = manager.download().await.unwrap();
        assert_eq!(sink.progress(), vec![0.0, 15.0, 47.0, 100.0]);
        match manager.state() {
            UpdateState::Downloaded { info, artifact: a } => {
                assert_eq!(info.version, "2.1.0");
                assert_eq!(a, artifact);
            }
            other => panic!("expected Downloaded, got {other:?}"),
        }

        manager.install().unwrap();
        assert_eq!(manager.state(), UpdateState::Installing);
        assert_eq!(*feed.installed.lock().unwrap(), vec![artifact]);

        let names: Vec<_> = sink.events().iter().map(UiEvent::name).collect();
        assert_eq!(
            names,
            vec![
                "update-available",
                "download-progress",
                "download-progress",
                "download-progress",
                "download-progress",
                "update-downloaded",
            ]
        );
    }

    #[tokio::test]
    async fn actions_from_wrong_state_change_nothing() {
        let (manager, _, sink) = manager(ScriptedFeed::offering(UpdateInfo::new("2.1.0")));

        let err = manager.download().await.unwrap_err();
        assert!(matches!(
            err,
            PrintdeskError::InvalidStateTransition { ref from, .. } if from == "Idle"
        ));
        assert!(manager.install().is_err());
        assert_eq!(manager.state(), UpdateState::Idle);

        manager.check().await.unwrap();
        assert!(manager.install().is_err());
        assert!(manager.check().await.is_err());
        assert!(matches!(manager.state(), UpdateState::Available(_)));
        assert_eq!(sink.events().len(), 1);
    }

    #[tokio::test]
    async fn overlapping_actions_are_rejected_while_downloading() {
        let mut feed = ScriptedFeed::offering(UpdateInfo::new("2.1.0"));
        feed.gate = Some(tokio::sync::Semaphore::new(0));
        let (manager, feed, _) = manager(feed);
        let manager = Arc::new(manager);

        manager.check().await.unwrap();
        let running = tokio::spawn({
            let manager = manager.clone();
            async move { manager.download().await }
        });
        while !matches!(manager.state(), UpdateState::Downloading { .. }) {
            tokio::task::yield_now().await;
        }

        let busy = |err: PrintdeskError| {
            matches!(err, PrintdeskError::InvalidStateTransition { ref from, .. } if from == "Downloading")
        };
        assert!(busy(manager.download().await.unwrap_err()));
        assert!(busy(manager.check().await.unwrap_err()));
        assert!(busy(manager.install().unwrap_err()));
        assert!(matches!(manager.state(), UpdateState::Downloading { .. }));

        feed.gate.as_ref().unwrap().add_permits(1);
        running.await.unwrap().unwrap();
        assert!(matches!(manager.state(), UpdateState::Downloaded { .. }));
    }

    #[tokio::test]
    async fn progress_is_clamped_and_never_goes_back() {
        let mut feed = ScriptedFeed::offering(UpdateInfo::new("2.1.0"));
        feed.progress = vec![10.0, 5.0, f64::NAN, -3.0, 60.0, 150.0, 99.0];
        let (manager, _, sink) = manager(feed);

        manager.check().await.unwrap();
        manager.download().await.unwrap();

        assert_eq!(sink.progress(), vec![10.0, 60.0, 100.0]);
    }

    #[tokio::test]
    async fn failed_check_returns_to_idle() {
        let feed = ScriptedFeed::offering(UpdateInfo::new("2.1.0"));
        *feed.latest.lock().unwrap() = vec![
            Err(PrintdeskError::UpdateFeed("dns".into())),
            Ok(None),
            Ok(Some(UpdateInfo::new("2.1.0"))),
        ];
        let (manager, _, _) = manager(feed);

        assert!(matches!(
            manager.check().await,
            Err(PrintdeskError::UpdateFeed(_))
        ));
        assert_eq!(manager.state(), UpdateState::Idle);

        assert_eq!(manager.check().await.unwrap(), None);
        assert_eq!(manager.state(), UpdateState::NoUpdateFound);

        // Checking again after "nothing new" is allowed.
        assert!(manager.check().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn failed_download_returns_to_available() {
        let mut feed = ScriptedFeed::offering(UpdateInfo::new("2.1.0"));
        feed.download_fails = true;
        let (manager, _, sink) = manager(feed);

        manager.check().await.unwrap();
        assert!(manager.download().await.is_err());
        assert!(matches!(manager.state(), UpdateState::Available(_)));
        assert!(
            !sink
                .events()
                .iter()
                .any(|e| matches!(e, UiEvent::UpdateDownloaded { .. }))
        );
    }

    #[tokio::test]
    async fn checksum_mismatch_discards_payload() {
        let mut info = UpdateInfo::new("2.1.0");
        info.sha256 = Some(hash_bytes(b"something else"));
        let (manager, feed, _) = manager(ScriptedFeed::offering(info));

        manager.check().await.unwrap();
        let err = manager.download().await.unwrap_err();

        assert_eq!(err.kind(), printdesk_core::ErrorKind::UpdateError);
        assert!(matches!(err, PrintdeskError::IntegrityMismatch { .. }));
        assert!(matches!(manager.state(), UpdateState::Available(_)));
        assert!(!feed.dir.path().join("printdesk-2.1.0.bin").exists());
    }

    #[tokio::test]
    async fn matching_checksum_is_accepted() {
        let mut info = UpdateInfo::new("2.1.0");
        info.sha256 = Some(hash_bytes(PAYLOAD));
        let (manager, _, _) = manager(ScriptedFeed::offering(info));

        manager.check().await.unwrap();
        manager.download().await.unwrap();
        assert!(matches!(manager.state(), UpdateState::Downloaded { .. }));
    }

    #[tokio::test]
    async fn installer_failure_keeps_download() {
        let mut feed = ScriptedFeed::offering(UpdateInfo::new("2.1.0"));
        feed.install_fails = true;
        let (manager, _, _) = manager(feed);

        manager.check().await.unwrap();
        manager.download().await.unwrap();
        assert!(manager.install().is_err());
        assert!(matches!(manager.state(), UpdateState::Downloaded { .. }));
    }

    #[tokio::test]
    async fn only_the_attached_session_hears_events() {
        let feed = Arc::new(ScriptedFeed::offering(UpdateInfo::new("2.1.0")));
        let manager = UpdateLifecycleManager::new(feed);
        let first = Arc::new(Sink::default());
        let second = Arc::new(Sink::default());
        let first_session = ViewSession::new(first.clone());
        let second_session = ViewSession::new(second.clone());

        manager.attach(first_session.clone());
        manager.attach(second_session.clone());
        // Detaching a session that isn't attached is a no-op.
        manager.detach(first_session.id());
        manager.check().await.unwrap();

        assert!(first.events().is_empty());
        assert_eq!(second.events().len(), 1);

        second_session.close();
        manager.download().await.unwrap();
        assert_eq!(second.events().len(), 1);

        manager.detach(second_session.id());
        assert!(manager.lock_listener().is_none());
    }
}
