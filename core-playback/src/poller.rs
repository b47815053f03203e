//! Periodic position and duration polling for the active session.

use crate::engine::Shared;
use crate::session::PlaybackState;
use bridge_traits::playback::{BackendStatus, PlaybackBackend};
use core_runtime::events::PlaybackEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Pulls progress from one backend until its session ends.
///
/// The poller exits when its token is cancelled, when its generation is no
/// longer current, or after reporting the end of the source.
pub(crate) struct ProgressPoller {
    shared: Arc<Shared>,
    backend: Arc<dyn PlaybackBackend>,
    generation: u64,
    interval: Duration,
    cancel: CancellationToken,
    file_url: String,
}

impl ProgressPoller {
    pub(crate) fn new(
        shared: Arc<Shared>,
        backend: Arc<dyn PlaybackBackend>,
        generation: u64,
        interval: Duration,
        cancel: CancellationToken,
        file_url: String,
    ) -> Self {
        Self {
            shared,
            backend,
            generation,
            interval,
            cancel,
            file_url,
        }
    }

    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let mut duration_known = false;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
            if !self.shared.is_current(self.generation) {
                break;
            }

            match self.backend.status().await {
                Ok(BackendStatus::Active) => {}
                Ok(BackendStatus::Ended) => {
                    self.shared.finish(self.generation, None).await;
                    break;
                }
                Ok(BackendStatus::Failed { message }) => {
                    self.shared.finish(self.generation, Some(message)).await;
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Backend status query failed");
                }
            }

            if !duration_known {
                duration_known = self.poll_duration().await;
            }

            if self.shared.state() == PlaybackState::Playing {
                match self.backend.position().await {
                    Ok(position) => {
                        let secs = position.as_secs_f64();
                        self.shared
                            .publish_progress(self.generation, |p| p.position_secs = secs);
                    }
                    Err(e) => debug!(error = %e, "Position unavailable"),
                }
            }
        }

        debug!(generation = self.generation, "Progress poller exited");
    }

    /// Returns `true` once a positive duration has been published.
    async fn poll_duration(&self) -> bool {
        let duration = match self.backend.duration().await {
            Ok(Some(duration)) if duration > Duration::ZERO => duration,
            Ok(_) => return false,
            Err(e) => {
                debug!(error = %e, "Duration unavailable");
                return false;
            }
        };

        let secs = duration.as_secs_f64();
        if !self
            .shared
            .publish_progress(self.generation, |p| p.duration_secs = secs)
        {
            return false;
        }

        debug!(duration_ms = duration.as_millis() as u64, "Duration known");
        self.shared.emit(PlaybackEvent::DurationKnown {
            file_url: self.file_url.clone(),
            duration_ms: duration.as_millis() as u64,
        });
        true
    }
}
