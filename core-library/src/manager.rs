//! Library consistency layer.
//!
//! [`LibraryManager`] exclusively owns uploads, the playlist, albums, the
//! now-playing pointer and the search history. Every mutation runs under one
//! async lock and writes the affected collections back to the
//! [`LibraryStore`] before returning.
//!
//! A failed write keeps the in-memory change (the user already saw it), marks
//! the collection as pending and reports [`LibraryError::Persistence`].
//! [`LibraryManager::flush`] retries pending collections.

use crate::config::LibraryConfig;
use crate::error::{LibraryError, Result};
use crate::history::SearchHistory;
use crate::models::{append_unique, prepend_unique, Albums, Collection, Library, Track};
use crate::removal::TrackRemoval;
use async_trait::async_trait;
use bridge_traits::storage::LibraryStore;
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
use core_runtime::logging::loggable_locator;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Seam through which the library stops playback when the current track is
/// deleted. Implemented by the playback engine.
#[async_trait]
pub trait PlaybackControl: Send + Sync {
    /// Tear down the active session, if any. Never fails.
    async fn stop_playback(&self);
}

struct LibraryState {
    library: Library,
    history: SearchHistory,
    /// Album names whose track list is shown expanded. Not persisted.
    expanded: HashSet<String>,
    pending: BTreeSet<Collection>,
}

/// Owner of all library collections.
pub struct LibraryManager {
    store: Arc<dyn LibraryStore>,
    state: Mutex<LibraryState>,
    playback: Option<Arc<dyn PlaybackControl>>,
    events: Option<EventBus>,
}

async fn read_raw(store: &dyn LibraryStore, collection: Collection) -> Result<Option<Value>> {
    let value = store
        .get(collection.key())
        .await
        .map_err(|e| LibraryError::Persistence {
            collection: collection.key().to_string(),
            message: e.to_string(),
        })?;

    Ok(value.filter(|v| !v.is_null()))
}

/// Decode a stored array entry by entry, skipping entries that fail.
fn decode_list<T: DeserializeOwned>(collection: Collection, value: Value) -> Vec<T> {
    let Value::Array(items) = value else {
        warn!(collection = %collection, "Stored collection is not a list, starting empty");
        return Vec::new();
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(
                    collection = %collection,
                    index,
                    error = %e,
                    "Skipping unreadable stored entry"
                );
                None
            }
        })
        .collect()
}

fn decode_albums(value: Value) -> Albums {
    let Value::Object(albums) = value else {
        warn!(collection = %Collection::Albums, "Stored albums are not a map, starting empty");
        return Albums::new();
    };

    albums
        .into_iter()
        .map(|(name, tracks)| (name, decode_list(Collection::Albums, tracks)))
        .collect()
}

async fn read_list<T: DeserializeOwned>(
    store: &dyn LibraryStore,
    collection: Collection,
) -> Result<Vec<T>> {
    Ok(read_raw(store, collection)
        .await?
        .map(|value| decode_list(collection, value))
        .unwrap_or_default())
}

impl LibraryManager {
    /// Read every collection from `store`.
    ///
    /// Absent keys load as empty. Entries that no longer decode are logged
    /// and skipped; the rest of their collection is kept. A failing store read
    /// is returned as [`LibraryError::Persistence`].
    pub async fn load(store: Arc<dyn LibraryStore>, config: LibraryConfig) -> Result<Self> {
        let uploaded_tracks: Vec<Track> =
            read_list(store.as_ref(), Collection::UploadedTracks).await?;
        let playlist: Vec<Track> = read_list(store.as_ref(), Collection::Playlist).await?;
        let albums = read_raw(store.as_ref(), Collection::Albums)
            .await?
            .map(decode_albums)
            .unwrap_or_default();
        let searches: Vec<String> = read_list(store.as_ref(), Collection::SearchHistory).await?;

        let history = SearchHistory::new(searches, config.search_history_limit);

        info!(
            uploads = uploaded_tracks.len(),
            playlist = playlist.len(),
            albums = albums.len(),
            "Library loaded"
        );

        Ok(Self {
            store,
            state: Mutex::new(LibraryState {
                library: Library {
                    uploaded_tracks,
                    playlist,
                    albums,
                    current_track: None,
                    search_history: Vec::new(),
                },
                history,
                expanded: HashSet::new(),
                pending: BTreeSet::new(),
            }),
            playback: None,
            events: None,
        })
    }

    pub fn with_playback_control(mut self, playback: Arc<dyn PlaybackControl>) -> Self {
        self.playback = Some(playback);
        self
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    fn emit(&self, event: LibraryEvent) {
        if let Some(bus) = &self.events {
            bus.emit(CoreEvent::Library(event)).ok();
        }
    }

    fn encode(state: &LibraryState, collection: Collection) -> serde_json::Result<Value> {
        match collection {
            Collection::UploadedTracks => serde_json::to_value(&state.library.uploaded_tracks),
            Collection::Playlist => serde_json::to_value(&state.library.playlist),
            Collection::Albums => serde_json::to_value(&state.library.albums),
            Collection::SearchHistory => serde_json::to_value(state.history.entries()),
            Collection::CurrentTrack => Ok(Value::Null),
        }
    }

    /// Write `collections` back to the store.
    ///
    /// Every collection is attempted; the first failure is returned.
    async fn persist(&self, state: &mut LibraryState, collections: &[Collection]) -> Result<()> {
        let mut first_error = None;

        for &collection in collections.iter().filter(|c| c.is_persisted()) {
            let written = match Self::encode(state, collection) {
                Ok(value) => self
                    .store
                    .set(collection.key(), value)
                    .await
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };

            match written {
                Ok(()) => {
                    state.pending.remove(&collection);
                    debug!(collection = %collection, "Collection persisted");
                }
                Err(message) => {
                    warn!(
                        collection = %collection,
                        error = %message,
                        "Failed to persist collection, keeping in-memory change"
                    );
                    state.pending.insert(collection);
                    self.emit(LibraryEvent::PersistenceFailed {
                        collection: collection.key().to_string(),
                        message: message.clone(),
                    });
                    first_error.get_or_insert(LibraryError::Persistence {
                        collection: collection.key().to_string(),
                        message,
                    });
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    // ------------------------------------------------------------------------
    // Uploads
    // ------------------------------------------------------------------------

    /// Prepend an uploaded track. A track whose locator is already present is
    /// ignored. Returns whether the track was added.
    pub async fn add_uploaded_track(&self, track: Track) -> Result<bool> {
        let mut state = self.state.lock().await;
        let file_url = track.file_url.clone();
        let title = track.title.clone();

        if !prepend_unique(&mut state.library.uploaded_tracks, track) {
            debug!(source = %loggable_locator(&file_url), "Upload already present");
            return Ok(false);
        }

        self.emit(LibraryEvent::TrackAdded {
            collection: Collection::UploadedTracks.key().to_string(),
            file_url,
            title,
        });
        self.persist(&mut state, &[Collection::UploadedTracks])
            .await?;
        Ok(true)
    }

    /// Delete the upload at `index` and every reference to it.
    ///
    /// Playlist entries and album entries sharing its locator are removed.
    /// If it is the current track, playback is stopped first and the pointer
    /// cleared. Returns the removed track.
    pub async fn delete_uploaded_track(&self, index: usize) -> Result<Track> {
        let mut state = self.state.lock().await;
        let removal = TrackRemoval::plan(&state.library, index)?;

        if removal.stops_playback {
            if let Some(playback) = &self.playback {
                playback.stop_playback().await;
            }
        }

        removal.apply(&mut state.library);

        let affected = removal.affected();
        info!(
            source = %loggable_locator(&removal.track.file_url),
            collections = affected.len(),
            stopped_playback = removal.stops_playback,
            "Uploaded track deleted"
        );
        self.emit(LibraryEvent::TrackRemoved {
            file_url: removal.track.file_url.clone(),
            collections: affected.iter().map(|c| c.key().to_string()).collect(),
        });

        self.persist(&mut state, &removal.persisted()).await?;
        Ok(removal.track)
    }

    // ------------------------------------------------------------------------
    // Playlist
    // ------------------------------------------------------------------------

    /// Prepend to the playlist unless already present.
    pub async fn add_to_playlist(&self, track: Track) -> Result<bool> {
        let mut state = self.state.lock().await;
        let file_url = track.file_url.clone();
        let title = track.title.clone();

        if !prepend_unique(&mut state.library.playlist, track) {
            return Ok(false);
        }

        self.emit(LibraryEvent::TrackAdded {
            collection: Collection::Playlist.key().to_string(),
            file_url,
            title,
        });
        self.persist(&mut state, &[Collection::Playlist]).await?;
        Ok(true)
    }

    pub async fn delete_from_playlist(&self, index: usize) -> Result<Track> {
        let mut state = self.state.lock().await;
        let len = state.library.playlist.len();
        if index >= len {
            return Err(LibraryError::IndexOutOfRange {
                collection: Collection::Playlist.key().to_string(),
                index,
                len,
            });
        }

        let track = state.library.playlist.remove(index);
        self.emit(LibraryEvent::TrackRemoved {
            file_url: track.file_url.clone(),
            collections: vec![Collection::Playlist.key().to_string()],
        });
        self.persist(&mut state, &[Collection::Playlist]).await?;
        Ok(track)
    }

    // ------------------------------------------------------------------------
    // Albums
    // ------------------------------------------------------------------------

    /// Create an empty album. Blank or taken names are ignored.
    pub async fn create_album(&self, name: &str) -> Result<bool> {
        let name = name.trim();
        let mut state = self.state.lock().await;
        if name.is_empty() || state.library.albums.contains_key(name) {
            return Ok(false);
        }

        state.library.albums.insert(name.to_string(), Vec::new());
        self.emit(LibraryEvent::AlbumCreated {
            name: name.to_string(),
        });
        self.persist(&mut state, &[Collection::Albums]).await?;
        Ok(true)
    }

    /// Append `track` to an album unless that album already has it.
    pub async fn add_track_to_album(&self, album: &str, track: Track) -> Result<bool> {
        let album = album.trim();
        let mut state = self.state.lock().await;
        let tracks = state
            .library
            .albums
            .get_mut(album)
            .ok_or_else(|| LibraryError::UnknownAlbum(album.to_string()))?;

        let file_url = track.file_url.clone();
        let title = track.title.clone();
        if !append_unique(tracks, track) {
            return Ok(false);
        }

        self.emit(LibraryEvent::TrackAdded {
            collection: Collection::Albums.key().to_string(),
            file_url,
            title,
        });
        self.persist(&mut state, &[Collection::Albums]).await?;
        Ok(true)
    }

    /// Move an album to a new name, keeping its tracks and expansion state.
    ///
    /// Ignored when `new_name` is blank, unchanged or already taken.
    pub async fn rename_album(&self, old_name: &str, new_name: &str) -> Result<bool> {
        let old_name = old_name.trim();
        let new_name = new_name.trim();
        let mut state = self.state.lock().await;

        if new_name.is_empty() || new_name == old_name || state.library.albums.contains_key(new_name)
        {
            return Ok(false);
        }

        let tracks = state
            .library
            .albums
            .remove(old_name)
            .ok_or_else(|| LibraryError::UnknownAlbum(old_name.to_string()))?;
        state.library.albums.insert(new_name.to_string(), tracks);

        if state.expanded.remove(old_name) {
            state.expanded.insert(new_name.to_string());
        }

        self.emit(LibraryEvent::AlbumRenamed {
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
        });
        self.persist(&mut state, &[Collection::Albums]).await?;
        Ok(true)
    }

    /// Remove an album. Absent names are not an error.
    pub async fn delete_album(&self, name: &str) -> Result<bool> {
        let name = name.trim();
        let mut state = self.state.lock().await;
        state.expanded.remove(name);
        if state.library.albums.remove(name).is_none() {
            return Ok(false);
        }

        self.emit(LibraryEvent::AlbumDeleted {
            name: name.to_string(),
        });
        self.persist(&mut state, &[Collection::Albums]).await?;
        Ok(true)
    }

    pub async fn album(&self, name: &str) -> Option<Vec<Track>> {
        self.state.lock().await.library.albums.get(name.trim()).cloned()
    }

    pub async fn album_names(&self) -> Vec<String> {
        self.state.lock().await.library.albums.keys().cloned().collect()
    }

    pub async fn set_album_expanded(&self, name: &str, expanded: bool) {
        let name = name.trim();
        let mut state = self.state.lock().await;
        if !state.library.albums.contains_key(name) {
            return;
        }
        if expanded {
            state.expanded.insert(name.to_string());
        } else {
            state.expanded.remove(name);
        }
    }

    /// Flip the expansion state; returns the new state.
    pub async fn toggle_album_expanded(&self, name: &str) -> bool {
        let name = name.trim();
        let mut state = self.state.lock().await;
        if !state.library.albums.contains_key(name) {
            return false;
        }
        if state.expanded.remove(name) {
            false
        } else {
            state.expanded.insert(name.to_string());
            true
        }
    }

    pub async fn is_album_expanded(&self, name: &str) -> bool {
        self.state.lock().await.expanded.contains(name.trim())
    }

    // ------------------------------------------------------------------------
    // Current track and navigation
    // ------------------------------------------------------------------------

    pub async fn set_current_track(&self, track: Track) {
        self.state.lock().await.library.current_track = Some(track);
    }

    pub async fn clear_current_track(&self) {
        self.state.lock().await.library.current_track = None;
    }

    pub async fn current_track(&self) -> Option<Track> {
        self.state.lock().await.library.current_track.clone()
    }

    /// Look up a track by locator, playlist first, then uploads.
    pub async fn find_by_file_url(&self, file_url: &str) -> Option<Track> {
        self.state
            .lock()
            .await
            .library
            .find_by_file_url(file_url)
            .cloned()
    }

    /// Move the current pointer one entry back and return the new track.
    ///
    /// Navigates the playlist when it has entries, otherwise uploads. No-op at
    /// the first entry, without a current track, or when the current track is
    /// not in the list.
    pub async fn previous_track(&self) -> Option<Track> {
        let mut state = self.state.lock().await;
        let current = state.library.current_track.as_ref()?;
        let list = state.library.navigation_list();
        let index = list.iter().position(|t| t.same_identity(current))?;
        if index == 0 {
            return None;
        }

        let previous = list[index - 1].clone();
        state.library.current_track = Some(previous.clone());
        Some(previous)
    }

    /// Move the current pointer one entry forward and return the new track.
    ///
    /// No-op at the last entry or without a current track. A current track
    /// missing from the list moves to the first entry.
    pub async fn next_track(&self) -> Option<Track> {
        let mut state = self.state.lock().await;
        let current = state.library.current_track.as_ref()?;
        let list = state.library.navigation_list();
        let next_index = match list.iter().position(|t| t.same_identity(current)) {
            Some(index) => index + 1,
            None => 0,
        };

        let next = list.get(next_index)?.clone();
        state.library.current_track = Some(next.clone());
        Some(next)
    }

    // ------------------------------------------------------------------------
    // Search history
    // ------------------------------------------------------------------------

    pub async fn record_search(&self, query: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.history.record(query) {
            self.persist(&mut state, &[Collection::SearchHistory])
                .await?;
        }
        Ok(())
    }

    pub async fn search_history(&self) -> Vec<String> {
        self.state.lock().await.history.entries().to_vec()
    }

    pub async fn clear_search_history(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.history.clear() {
            self.persist(&mut state, &[Collection::SearchHistory])
                .await?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Durability and snapshots
    // ------------------------------------------------------------------------

    /// Collections whose latest change has not reached the store.
    pub async fn pending_writes(&self) -> Vec<Collection> {
        self.state.lock().await.pending.iter().copied().collect()
    }

    pub async fn is_durable(&self) -> bool {
        self.state.lock().await.pending.is_empty()
    }

    /// Retry every pending collection.
    pub async fn flush(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let pending: Vec<Collection> = state.pending.iter().copied().collect();
        if pending.is_empty() {
            return Ok(());
        }

        self.persist(&mut state, &pending).await?;
        info!(collections = pending.len(), "Pending library changes flushed");
        self.emit(LibraryEvent::Flushed {
            collections: pending.iter().map(|c| c.key().to_string()).collect(),
        });
        Ok(())
    }

    pub async fn snapshot(&self) -> Library {
        let state = self.state.lock().await;
        let mut library = state.library.clone();
        library.search_history = state.history.entries().to_vec();
        library
    }

    pub async fn uploaded_tracks(&self) -> Vec<Track> {
        self.state.lock().await.library.uploaded_tracks.clone()
    }

    pub async fn playlist(&self) -> Vec<Track> {
        self.state.lock().await.library.playlist.clone()
    }

    pub async fn albums(&self) -> Albums {
        self.state.lock().await.library.albums.clone()
    }
}
