//! Domain models for the music library
//!
//! Tracks are identified by their `file_url` alone. A preview clip from a
//! remote search and a locally picked file share one identity scheme, so there
//! is no synthetic id.

use bridge_traits::metadata::TrackMetadata;
use bridge_traits::search::{CatalogId, RemoteTrackResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Artwork shown when a track has none of its own.
pub const PLACEHOLDER_IMAGE: &str = "assets/placeholder.png";

/// Title used when tag extraction yields nothing.
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Artist used when tag extraction yields nothing.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Album name to ordered track list.
pub type Albums = BTreeMap<String, Vec<Track>>;

// =============================================================================
// Track
// =============================================================================

/// A playable audio item with display metadata and a source locator.
///
/// Serialized with camelCase keys (`fileUrl`, `isLocal`, ...) which is the
/// shape already sitting in users' stores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub title: String,
    pub artist: String,
    /// Artwork locator.
    pub image: String,
    /// Source locator: remote URL, data URI, object URL, or native path.
    pub file_url: String,
    /// Whether the source came from the device rather than a remote catalogue.
    #[serde(default)]
    pub is_local: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_id: Option<CatalogId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist_id: Option<CatalogId>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Track {
    /// Build a track for a user-picked file.
    ///
    /// Missing or blank tags fall back to [`UNKNOWN_TITLE`], [`UNKNOWN_ARTIST`]
    /// and [`PLACEHOLDER_IMAGE`].
    pub fn local(file_url: impl Into<String>, metadata: TrackMetadata) -> Self {
        Self {
            title: non_blank(metadata.title).unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            artist: non_blank(metadata.artist).unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            image: non_blank(metadata.image).unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            file_url: file_url.into(),
            is_local: true,
            album: None,
            album_id: None,
            artist_id: None,
        }
    }

    /// Map a remote search result to a track streaming its preview clip.
    ///
    /// Returns `None` when the result has no usable preview.
    pub fn from_remote(result: &RemoteTrackResult) -> Option<Self> {
        if !result.has_preview() {
            return None;
        }
        let preview = result.preview_url.clone()?;

        Some(Self {
            title: result.title.clone(),
            artist: result.artist.name.clone(),
            image: non_blank(result.album.cover_image_url.clone())
                .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            file_url: preview,
            is_local: false,
            album: Some(result.album.title.clone()),
            album_id: result.album.id.clone(),
            artist_id: result.artist.id.clone(),
        })
    }

    /// Tracks are the same entry when their locators match.
    pub fn same_identity(&self, other: &Track) -> bool {
        self.file_url == other.file_url
    }

    /// Whether the track carries a non-blank locator.
    pub fn has_source(&self) -> bool {
        !self.file_url.trim().is_empty()
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.artist, self.title)
    }
}

// =============================================================================
// Collections
// =============================================================================

/// The collections owned by the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    UploadedTracks,
    Playlist,
    Albums,
    /// Now-playing pointer. Lives in memory only.
    CurrentTrack,
    SearchHistory,
}

impl Collection {
    /// Every collection written to the store.
    pub const PERSISTED: [Collection; 4] = [
        Collection::UploadedTracks,
        Collection::Playlist,
        Collection::Albums,
        Collection::SearchHistory,
    ];

    /// Store key, also used as the name in events.
    pub fn key(&self) -> &'static str {
        match self {
            Collection::UploadedTracks => "uploadedTracks",
            Collection::Playlist => "playlist",
            Collection::Albums => "albums",
            Collection::CurrentTrack => "currentTrack",
            Collection::SearchHistory => "searchHistory",
        }
    }

    pub fn is_persisted(&self) -> bool {
        !matches!(self, Collection::CurrentTrack)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Point-in-time copy of the library.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Library {
    pub uploaded_tracks: Vec<Track>,
    pub playlist: Vec<Track>,
    pub albums: Albums,
    pub current_track: Option<Track>,
    pub search_history: Vec<String>,
}

impl Library {
    /// List used by previous/next: the playlist when non-empty, else uploads.
    pub fn navigation_list(&self) -> &[Track] {
        if self.playlist.is_empty() {
            &self.uploaded_tracks
        } else {
            &self.playlist
        }
    }

    /// Find a track by locator, playlist first.
    pub fn find_by_file_url(&self, file_url: &str) -> Option<&Track> {
        self.playlist
            .iter()
            .chain(self.uploaded_tracks.iter())
            .find(|t| t.file_url == file_url)
    }

    pub fn album(&self, name: &str) -> Option<&[Track]> {
        self.albums.get(name).map(Vec::as_slice)
    }

    pub fn is_current(&self, track: &Track) -> bool {
        self.current_track
            .as_ref()
            .is_some_and(|current| current.same_identity(track))
    }
}

/// Insert `track` at the front unless a track with the same locator exists.
/// Returns whether it was inserted.
pub(crate) fn prepend_unique(list: &mut Vec<Track>, track: Track) -> bool {
    if list.iter().any(|t| t.same_identity(&track)) {
        return false;
    }
    list.insert(0, track);
    true
}

/// Append `track` unless a track with the same locator exists.
pub(crate) fn append_unique(list: &mut Vec<Track>, track: Track) -> bool {
    if list.iter().any(|t| t.same_identity(&track)) {
        return false;
    }
    list.push(track);
    true
}
