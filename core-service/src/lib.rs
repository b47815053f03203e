//! Core service façade and bootstrap helpers.
//!
//! [`MusicCore`] wires the host bridges from a [`CoreConfig`] into the
//! playback engine and the library, and coordinates the operations that touch
//! both: playing a library entry moves the current-track pointer, navigation
//! plays the neighbour it lands on, and deleting the playing track stops the
//! engine through the library's [`PlaybackControl`] seam.
//!
//! Desktop apps typically enable the `desktop-shims` feature (which depends on
//! `bridge-desktop`) so the SQLite library store and the desktop backend
//! provider are filled in when the host does not inject its own.

pub mod error;
pub mod lifecycle;

pub use error::{CoreError, Result};
pub use lifecycle::BackAction;

pub use core_library::{LibraryManager, Track};
pub use core_playback::{PlaybackEngine, PlaybackState, PlaybackStatus, Progress};
pub use core_runtime::config::CoreConfig;
pub use core_runtime::events::{CoreEvent, EventBus, EventStream};

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop::{DesktopBackendProvider, SqliteLibraryStore};

use bridge_traits::lifecycle::{LifecycleObserver, LifecycleState};
use bridge_traits::metadata::{MetadataReader, TrackMetadata};
use bridge_traits::search::{playable_results, RemoteTrackResult, SearchProvider};
use core_library::{LibraryConfig, PlaybackControl};
use core_playback::{EngineConfig, PlaybackError};
use core_runtime::logging::loggable_locator;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct MusicCore {
    engine: Arc<PlaybackEngine>,
    library: Arc<LibraryManager>,
    events: EventBus,
    search_provider: Option<Arc<dyn SearchProvider>>,
    metadata_reader: Option<Arc<dyn MetadataReader>>,
    lifecycle_observer: Option<Arc<dyn LifecycleObserver>>,
}

impl MusicCore {
    /// Build the event bus, playback engine and library from `config`.
    ///
    /// Loading the library reads every persisted collection; a store that
    /// cannot be read fails the bootstrap.
    pub async fn bootstrap(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let events = EventBus::new(config.event_buffer_size);

        let engine_config =
            EngineConfig::default().with_progress_poll_interval(config.progress_poll_interval);
        let engine = Arc::new(
            PlaybackEngine::new(
                Arc::clone(&config.backend_provider),
                config.capabilities,
                engine_config,
            )
            .with_event_bus(events.clone()),
        );

        let library_config =
            LibraryConfig::default().with_search_history_limit(config.search_history_limit);
        let playback: Arc<dyn PlaybackControl> = engine.clone();
        let library = LibraryManager::load(Arc::clone(&config.library_store), library_config)
            .await?
            .with_playback_control(playback)
            .with_event_bus(events.clone());

        info!(
            platform = ?config.capabilities.platform,
            backend = %engine.backend_kind(),
            "Music core ready"
        );

        Ok(Self {
            engine,
            library: Arc::new(library),
            events,
            search_provider: config.search_provider,
            metadata_reader: config.metadata_reader,
            lifecycle_observer: config.lifecycle_observer,
        })
    }

    pub fn library(&self) -> &LibraryManager {
        &self.library
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    // ------------------------------------------------------------------
    // Playback
    // ------------------------------------------------------------------

    /// Play `track` and make it the library's current track.
    ///
    /// The pointer only moves once the backend accepted the source.
    pub async fn play_track(&self, track: Track) -> Result<()> {
        self.engine.play(track.clone()).await?;
        self.library.set_current_track(track).await;
        Ok(())
    }

    /// Play the library entry with `file_url`, looking in the playlist first
    /// and then in the uploads. Returns `false` when no entry matches.
    #[instrument(skip(self, file_url), fields(source = %loggable_locator(file_url)))]
    pub async fn play_file(&self, file_url: &str) -> Result<bool> {
        match self.library.find_by_file_url(file_url).await {
            Some(track) => {
                self.play_track(track).await?;
                Ok(true)
            }
            None => {
                debug!("No library entry for locator");
                Ok(false)
            }
        }
    }

    /// Stream the preview clip of a remote search result.
    pub async fn stream_preview(&self, result: &RemoteTrackResult) -> Result<Track> {
        let track = Track::from_remote(result).ok_or_else(|| {
            PlaybackError::InvalidSource(format!("'{}' has no preview clip", result.title))
        })?;
        self.play_track(track.clone()).await?;
        Ok(track)
    }

    /// Restart the current track. Returns `false` when there is none.
    pub async fn replay_current(&self) -> Result<bool> {
        match self.library.current_track().await {
            Some(track) if track.has_source() => {
                self.engine.play(track).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Move to and play the next track of the navigation list.
    ///
    /// The current track is left where it was when the engine rejects the
    /// neighbour.
    pub async fn next(&self) -> Result<Option<Track>> {
        let before = self.library.current_track().await;
        let neighbour = self.library.next_track().await;
        self.play_neighbour(before, neighbour).await
    }

    /// Move to and play the previous track of the navigation list.
    pub async fn previous(&self) -> Result<Option<Track>> {
        let before = self.library.current_track().await;
        let neighbour = self.library.previous_track().await;
        self.play_neighbour(before, neighbour).await
    }

    async fn play_neighbour(
        &self,
        before: Option<Track>,
        neighbour: Option<Track>,
    ) -> Result<Option<Track>> {
        let Some(track) = neighbour else {
            return Ok(None);
        };

        if let Err(e) = self.engine.play(track.clone()).await {
            match before {
                Some(previous) => self.library.set_current_track(previous).await,
                None => self.library.clear_current_track().await,
            }
            return Err(e.into());
        }
        Ok(Some(track))
    }

    /// Stop playback and clear the current track.
    pub async fn stop(&self) {
        self.engine.stop().await;
        self.library.clear_current_track().await;
    }

    pub async fn pause(&self) -> Result<()> {
        Ok(self.engine.pause().await?)
    }

    pub async fn resume(&self) -> Result<()> {
        Ok(self.engine.resume().await?)
    }

    pub async fn toggle(&self) -> Result<()> {
        Ok(self.engine.toggle().await?)
    }

    pub async fn seek_to(&self, seconds: f64) -> Result<()> {
        Ok(self.engine.seek_to(seconds).await?)
    }

    pub fn status(&self) -> PlaybackStatus {
        self.engine.status()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<PlaybackStatus> {
        self.engine.subscribe_status()
    }

    pub fn progress(&self) -> Progress {
        self.engine.progress()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<Progress> {
        self.engine.subscribe_progress()
    }

    // ------------------------------------------------------------------
    // Collaborators
    // ------------------------------------------------------------------

    /// Search the remote catalogue and remember the query.
    ///
    /// Blank queries return no results without contacting the provider.
    /// Only results with a preview clip are returned.
    pub async fn search(&self, query: &str) -> Result<Vec<RemoteTrackResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let provider = self
            .search_provider
            .as_ref()
            .ok_or_else(|| CoreError::CapabilityMissing {
                capability: "SearchProvider".to_string(),
                message: "Remote search requires a SearchProvider in CoreConfig".to_string(),
            })?;

        if let Err(e) = self.library.record_search(query).await {
            warn!(error = %e, "Search history not saved");
        }

        let results = provider.search_tracks(query).await?;
        let total = results.len();
        let playable = playable_results(results);
        debug!(total, playable = playable.len(), "Search completed");
        Ok(playable)
    }

    /// Add a user-picked file to the uploads, reading its tags when a
    /// metadata reader is configured. Returns the stored track.
    ///
    /// Unreadable tags fall back to the unknown-title defaults.
    pub async fn import_file(&self, locator: &str) -> Result<Track> {
        if locator.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "file locator must not be empty".to_string(),
            ));
        }

        let metadata = match &self.metadata_reader {
            Some(reader) => match reader.read_metadata(locator).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(
                        source = %loggable_locator(locator),
                        error = %e,
                        "Tag extraction failed, using defaults"
                    );
                    TrackMetadata::default()
                }
            },
            None => TrackMetadata::default(),
        };

        let track = Track::local(locator, metadata);
        self.library.add_uploaded_track(track.clone()).await?;
        Ok(track)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Pause playback when the app leaves the foreground.
    pub async fn handle_lifecycle(&self, state: LifecycleState) -> Result<()> {
        if state.is_hidden() && self.engine.is_playing() {
            debug!(?state, "App hidden, pausing playback");
            self.engine.pause().await?;
        }
        Ok(())
    }

    /// Pause if something is playing, otherwise tell the host to exit.
    pub async fn handle_back_button(&self) -> Result<BackAction> {
        if self.engine.is_playing() {
            self.engine.pause().await?;
            Ok(BackAction::Paused)
        } else {
            Ok(BackAction::Exit)
        }
    }

    /// Follow the configured lifecycle observer in a background task.
    ///
    /// Returns `None` when no observer was configured.
    pub async fn watch_lifecycle(&self) -> Result<Option<JoinHandle<()>>> {
        let Some(observer) = &self.lifecycle_observer else {
            return Ok(None);
        };

        let initial = observer.get_state().await?;
        self.handle_lifecycle(initial).await?;

        let stream = observer.subscribe_changes().await?;
        Ok(Some(lifecycle::spawn_lifecycle_watcher(
            self.clone(),
            stream,
        )))
    }
}
