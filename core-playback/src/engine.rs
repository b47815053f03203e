//! # Unified Playback Engine
//!
//! One engine drives whichever native backend the host offers. A session is
//! created per `play()`: the backend kind is chosen once from platform
//! capabilities, the source is loaded, and a progress poller is started.
//!
//! ## State
//!
//! State is published through `tokio::sync::watch` channels so any number of
//! UI subscribers can follow it without touching the backend:
//!
//! ```text
//! idle ─play─> loading ─ok─> playing <─pause/resume─> paused
//!   ^                 └─err─> stopped <──stop / end / failure──┘
//!   └───────────────────────────┘ (next play)
//! ```
//!
//! ## Teardown
//!
//! Every exit path (stop, superseding play, end of track, backend failure)
//! runs the same teardown: cancel the poller, bump the session generation,
//! stop and release the backend (errors logged, never returned), and zero
//! the published progress. A poller only publishes while its generation is
//! current, so a superseded session never reports again.

use crate::config::EngineConfig;
use crate::error::{PlaybackError, Result};
use crate::poller::ProgressPoller;
use crate::selector::BackendSelector;
use crate::session::{PlaybackState, PlaybackStatus, Progress};
use async_trait::async_trait;
use bridge_traits::platform::PlatformCapabilities;
use bridge_traits::playback::{AudioSource, BackendKind, BackendProvider, PlaybackBackend};
use core_library::{PlaybackControl, Track};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use core_runtime::logging::loggable_locator;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub(crate) struct ActiveSession {
    pub(crate) generation: u64,
    pub(crate) kind: BackendKind,
    pub(crate) backend: Arc<dyn PlaybackBackend>,
    pub(crate) track: Track,
    pub(crate) cancel: CancellationToken,
}

/// State shared between the engine and its poller task.
pub(crate) struct Shared {
    pub(crate) session: Mutex<Option<ActiveSession>>,
    generation: AtomicU64,
    pub(crate) status_tx: watch::Sender<PlaybackStatus>,
    progress_tx: watch::Sender<Progress>,
    events: RwLock<Option<EventBus>>,
}

fn millis(secs: f64) -> u64 {
    (secs.max(0.0) * 1000.0) as u64
}

impl Shared {
    fn new() -> Self {
        let (status_tx, _) = watch::channel(PlaybackStatus::default());
        let (progress_tx, _) = watch::channel(Progress::default());
        Self {
            session: Mutex::new(None),
            generation: AtomicU64::new(0),
            status_tx,
            progress_tx,
            events: RwLock::new(None),
        }
    }

    pub(crate) fn emit(&self, event: PlaybackEvent) {
        if let Some(bus) = self.events.read().as_ref() {
            bus.emit(CoreEvent::Playback(event)).ok();
        }
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn state(&self) -> PlaybackState {
        self.status_tx.borrow().state
    }

    pub(crate) fn progress(&self) -> Progress {
        *self.progress_tx.borrow()
    }

    /// Apply `update` to the published progress if `generation` is current.
    ///
    /// The check runs under the channel's write lock, which teardown also
    /// takes to zero progress, so a stale session cannot overwrite the reset.
    /// Returns whether the session was current.
    pub(crate) fn publish_progress(
        &self,
        generation: u64,
        update: impl FnOnce(&mut Progress),
    ) -> bool {
        let mut applied = false;
        self.progress_tx.send_if_modified(|progress| {
            if !self.is_current(generation) {
                return false;
            }
            applied = true;
            let before = *progress;
            update(progress);
            *progress != before
        });
        applied
    }

    fn set_stopped(&self, last_error: Option<String>) {
        self.status_tx.send_replace(PlaybackStatus {
            state: PlaybackState::Stopped,
            backend: None,
            track: None,
            last_error,
        });
    }

    /// Release the session's backend and invalidate its poller.
    async fn teardown(&self, session: ActiveSession) -> Track {
        session.cancel.cancel();
        self.next_generation();
        self.progress_tx.send_replace(Progress::default());

        if let Err(e) = session.backend.stop().await {
            warn!(backend = %session.kind, error = %e, "Backend stop failed during teardown");
        }
        if let Err(e) = session.backend.release().await {
            warn!(backend = %session.kind, error = %e, "Backend release failed during teardown");
        }

        debug!(
            backend = %session.kind,
            generation = session.generation,
            "Session torn down"
        );
        session.track
    }

    /// End the session of `generation` from the poller: natural end when
    /// `failure` is `None`, backend failure otherwise.
    pub(crate) async fn finish(&self, generation: u64, failure: Option<String>) {
        let mut guard = self.session.lock().await;
        let session = match guard.take() {
            Some(session) if session.generation == generation => session,
            other => {
                *guard = other;
                return;
            }
        };

        let kind = session.kind;
        let track = self.teardown(session).await;
        self.set_stopped(failure.clone());

        match failure {
            None => {
                info!(source = %loggable_locator(&track.file_url), "Track completed");
                self.emit(PlaybackEvent::Completed {
                    file_url: track.file_url,
                });
            }
            Some(message) => {
                error!(
                    backend = %kind,
                    source = %loggable_locator(&track.file_url),
                    error = %message,
                    "Backend reported playback failure"
                );
                self.emit(PlaybackEvent::Error {
                    file_url: Some(track.file_url),
                    message,
                    recoverable: false,
                });
            }
        }
    }
}

/// Plays one track at a time through a platform backend.
pub struct PlaybackEngine {
    provider: Arc<dyn BackendProvider>,
    selector: BackendSelector,
    config: EngineConfig,
    shared: Arc<Shared>,
}

impl PlaybackEngine {
    pub fn new(
        provider: Arc<dyn BackendProvider>,
        capabilities: PlatformCapabilities,
        config: EngineConfig,
    ) -> Self {
        Self {
            provider,
            selector: BackendSelector::new(capabilities),
            config,
            shared: Arc::new(Shared::new()),
        }
    }

    /// Publish playback events to `events`.
    pub fn with_event_bus(self, events: EventBus) -> Self {
        *self.shared.events.write() = Some(events);
        self
    }

    /// Backend family new sessions will use.
    pub fn backend_kind(&self) -> BackendKind {
        self.selector.select()
    }

    pub fn status(&self) -> PlaybackStatus {
        self.shared.status_tx.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<PlaybackStatus> {
        self.shared.status_tx.subscribe()
    }

    pub fn progress(&self) -> Progress {
        self.shared.progress()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<Progress> {
        self.shared.progress_tx.subscribe()
    }

    pub fn is_playing(&self) -> bool {
        self.shared.state() == PlaybackState::Playing
    }

    /// Start playing `track`, replacing any active session.
    ///
    /// A blank or unparseable locator fails with
    /// [`PlaybackError::InvalidSource`] and leaves the engine untouched.
    /// Backend failures end in the `Stopped` state with the reason recorded
    /// in [`PlaybackStatus::last_error`].
    pub async fn play(&self, track: Track) -> Result<()> {
        if !track.has_source() {
            return Err(PlaybackError::InvalidSource(
                "track has no source locator".to_string(),
            ));
        }
        let source = AudioSource::from_locator(&track.file_url)
            .map_err(|e| PlaybackError::InvalidSource(e.to_string()))?;

        let mut guard = self.shared.session.lock().await;

        if let Some(previous) = guard.take() {
            let replaced = self.shared.teardown(previous).await;
            debug!(source = %loggable_locator(&replaced.file_url), "Superseding active session");
            self.shared.emit(PlaybackEvent::Stopped {
                file_url: replaced.file_url,
            });
        }

        let kind = self.selector.select();
        let backend = match self.provider.create(kind) {
            Ok(backend) => backend,
            Err(e) => {
                let err = PlaybackError::BackendUnavailable {
                    kind,
                    message: e.to_string(),
                };
                self.fail_start(&track, &err);
                return Err(err);
            }
        };

        let generation = self.shared.next_generation();
        self.shared.progress_tx.send_replace(Progress::default());
        self.shared.status_tx.send_replace(PlaybackStatus {
            state: PlaybackState::Loading,
            backend: Some(kind),
            track: Some(track.clone()),
            last_error: None,
        });
        debug!(backend = %kind, source = %source, generation, "Loading track");

        let started = async {
            backend.load(source).await?;
            backend.play().await
        }
        .await;

        if let Err(e) = started {
            let err = PlaybackError::backend(kind, e);
            let session = ActiveSession {
                generation,
                kind,
                backend,
                track: track.clone(),
                cancel: CancellationToken::new(),
            };
            self.shared.teardown(session).await;
            self.fail_start(&track, &err);
            return Err(err);
        }

        self.shared.status_tx.send_modify(|status| {
            status.state = PlaybackState::Playing;
        });

        let cancel = CancellationToken::new();
        ProgressPoller::new(
            Arc::clone(&self.shared),
            Arc::clone(&backend),
            generation,
            self.config.progress_poll_interval,
            cancel.clone(),
            track.file_url.clone(),
        )
        .spawn();

        info!(
            backend = %kind,
            source = %loggable_locator(&track.file_url),
            title = %track.title,
            "Playback started"
        );
        self.shared.emit(PlaybackEvent::Started {
            file_url: track.file_url.clone(),
            title: track.title.clone(),
            backend: kind.to_string(),
        });

        *guard = Some(ActiveSession {
            generation,
            kind,
            backend,
            track,
            cancel,
        });
        Ok(())
    }

    fn fail_start(&self, track: &Track, err: &PlaybackError) {
        error!(
            source = %loggable_locator(&track.file_url),
            error = %err,
            "Failed to start playback"
        );
        self.shared.set_stopped(Some(err.to_string()));
        self.shared.emit(PlaybackEvent::Error {
            file_url: Some(track.file_url.clone()),
            message: err.to_string(),
            recoverable: false,
        });
    }

    /// Pause the playing session. No-op unless playing.
    pub async fn pause(&self) -> Result<()> {
        let guard = self.shared.session.lock().await;
        let Some(session) = guard.as_ref() else {
            return Ok(());
        };
        if self.shared.state() != PlaybackState::Playing {
            return Ok(());
        }

        session
            .backend
            .pause()
            .await
            .map_err(|e| PlaybackError::backend(session.kind, e))?;

        self.shared
            .status_tx
            .send_modify(|status| status.state = PlaybackState::Paused);
        // Keeps the last polled position when the backend cannot report one.
        match session.backend.position().await {
            Ok(position) => {
                self.shared.publish_progress(session.generation, |p| {
                    p.position_secs = position.as_secs_f64();
                });
            }
            Err(e) => warn!(error = %e, "Position unavailable while pausing"),
        }

        let position_ms = millis(self.shared.progress().position_secs);
        debug!(position_ms, "Playback paused");
        self.shared.emit(PlaybackEvent::Paused {
            file_url: session.track.file_url.clone(),
            position_ms,
        });
        Ok(())
    }

    /// Continue a paused session. No-op unless paused.
    pub async fn resume(&self) -> Result<()> {
        let guard = self.shared.session.lock().await;
        let Some(session) = guard.as_ref() else {
            return Ok(());
        };
        if self.shared.state() != PlaybackState::Paused {
            return Ok(());
        }

        session
            .backend
            .resume()
            .await
            .map_err(|e| PlaybackError::backend(session.kind, e))?;

        self.shared
            .status_tx
            .send_modify(|status| status.state = PlaybackState::Playing);

        let position_ms = millis(self.shared.progress().position_secs);
        debug!(position_ms, "Playback resumed");
        self.shared.emit(PlaybackEvent::Resumed {
            file_url: session.track.file_url.clone(),
            position_ms,
        });
        Ok(())
    }

    /// Pause when playing, resume otherwise.
    pub async fn toggle(&self) -> Result<()> {
        if self.is_playing() {
            self.pause().await
        } else {
            self.resume().await
        }
    }

    /// Tear down the active session. Reachable from every state and never fails.
    pub async fn stop(&self) {
        let mut guard = self.shared.session.lock().await;
        let stopped = match guard.take() {
            Some(session) => Some(self.shared.teardown(session).await),
            None => None,
        };

        self.shared.progress_tx.send_replace(Progress::default());
        self.shared.set_stopped(None);

        if let Some(track) = stopped {
            info!(source = %loggable_locator(&track.file_url), "Playback stopped");
            self.shared.emit(PlaybackEvent::Stopped {
                file_url: track.file_url,
            });
        }
    }

    /// Seek to `seconds`, clamped to `[0, duration]`. No-op without a session.
    pub async fn seek_to(&self, seconds: f64) -> Result<()> {
        let guard = self.shared.session.lock().await;
        let Some(session) = guard.as_ref() else {
            return Ok(());
        };

        let duration = match session.backend.duration().await {
            Ok(Some(duration)) => duration.as_secs_f64(),
            _ => self.shared.progress().duration_secs,
        };
        let requested = if seconds.is_nan() { 0.0 } else { seconds };
        let target = requested.clamp(0.0, duration.max(0.0));

        session
            .backend
            .seek(Duration::from_secs_f64(target))
            .await
            .map_err(|e| PlaybackError::backend(session.kind, e))?;

        self.shared
            .publish_progress(session.generation, |p| p.position_secs = target);
        debug!(requested, target, "Seeked");
        Ok(())
    }
}

#[async_trait]
impl PlaybackControl for PlaybackEngine {
    async fn stop_playback(&self) {
        self.stop().await;
    }
}
