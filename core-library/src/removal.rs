//! Cascade removal of an uploaded track.
//!
//! Deleting an upload must also drop every playlist and album entry with the
//! same locator, and stop playback if that track is playing. The work is
//! planned up front against the current state into a [`TrackRemoval`], which
//! names every affected collection, and then applied in one step.

use crate::error::{LibraryError, Result};
use crate::models::{Collection, Library, Track};
use std::collections::{BTreeMap, BTreeSet};

/// Planned removal of one track from every collection referencing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRemoval {
    /// The track being removed.
    pub track: Track,
    /// Index in `uploadedTracks`.
    pub upload_index: usize,
    /// Matching positions in the playlist.
    pub playlist_indices: Vec<usize>,
    /// Matching positions per album. Albums without a match are absent.
    pub album_indices: BTreeMap<String, Vec<usize>>,
    /// Whether the track is the current one.
    pub stops_playback: bool,
}

fn matching_indices(list: &[Track], track: &Track) -> Vec<usize> {
    list.iter()
        .enumerate()
        .filter(|(_, t)| t.same_identity(track))
        .map(|(i, _)| i)
        .collect()
}

impl TrackRemoval {
    /// Plan removal of the upload at `index`.
    ///
    /// Fails with [`LibraryError::IndexOutOfRange`] without touching anything.
    pub fn plan(library: &Library, index: usize) -> Result<Self> {
        let track = library
            .uploaded_tracks
            .get(index)
            .cloned()
            .ok_or_else(|| LibraryError::IndexOutOfRange {
                collection: Collection::UploadedTracks.key().to_string(),
                index,
                len: library.uploaded_tracks.len(),
            })?;

        let playlist_indices = matching_indices(&library.playlist, &track);
        let album_indices = library
            .albums
            .iter()
            .filter_map(|(name, tracks)| {
                let hits = matching_indices(tracks, &track);
                (!hits.is_empty()).then(|| (name.clone(), hits))
            })
            .collect();
        let stops_playback = library.is_current(&track);

        Ok(Self {
            track,
            upload_index: index,
            playlist_indices,
            album_indices,
            stops_playback,
        })
    }

    /// Every collection this removal changes.
    pub fn affected(&self) -> BTreeSet<Collection> {
        let mut affected = BTreeSet::from([Collection::UploadedTracks]);
        if !self.playlist_indices.is_empty() {
            affected.insert(Collection::Playlist);
        }
        if !self.album_indices.is_empty() {
            affected.insert(Collection::Albums);
        }
        if self.stops_playback {
            affected.insert(Collection::CurrentTrack);
        }
        affected
    }

    /// Collections that must be written back to the store.
    pub fn persisted(&self) -> Vec<Collection> {
        self.affected()
            .into_iter()
            .filter(Collection::is_persisted)
            .collect()
    }

    /// Apply every in-memory effect.
    ///
    /// The library must be in the state the plan was made from.
    pub(crate) fn apply(&self, library: &mut Library) {
        library.uploaded_tracks.remove(self.upload_index);
        library.playlist.retain(|t| !t.same_identity(&self.track));
        for name in self.album_indices.keys() {
            if let Some(tracks) = library.albums.get_mut(name) {
                tracks.retain(|t| !t.same_identity(&self.track));
            }
        }
        if self.stops_playback {
            library.current_track = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::metadata::TrackMetadata;

    fn track(url: &str) -> Track {
        Track::local(url, TrackMetadata::default())
    }

    fn library() -> Library {
        let mut library = Library {
            uploaded_tracks: vec![track("a"), track("b"), track("c")],
            playlist: vec![track("b"), track("c")],
            current_track: Some(track("b")),
            ..Default::default()
        };
        library
            .albums
            .insert("Road Trip".to_string(), vec![track("c"), track("b")]);
        library.albums.insert("Chill".to_string(), vec![track("a")]);
        library
    }

    #[test]
    fn test_plan_collects_every_reference() {
        let removal = TrackRemoval::plan(&library(), 1).unwrap();
        assert_eq!(removal.track.file_url, "b");
        assert_eq!(removal.playlist_indices, vec![0]);
        assert_eq!(
            removal.album_indices.get("Road Trip"),
            Some(&vec![1usize])
        );
        assert!(!removal.album_indices.contains_key("Chill"));
        assert!(removal.stops_playback);
        assert_eq!(
            removal.affected(),
            BTreeSet::from([
                Collection::UploadedTracks,
                Collection::Playlist,
                Collection::Albums,
                Collection::CurrentTrack,
            ])
        );
        assert_eq!(removal.persisted().len(), 3);
    }

    #[test]
    fn test_plan_rejects_bad_index() {
        let err = TrackRemoval::plan(&library(), 3).unwrap_err();
        assert!(matches!(
            err,
            LibraryError::IndexOutOfRange { index: 3, len: 3, .. }
        ));
    }

    #[test]
    fn test_apply() {
        let mut library = library();
        let removal = TrackRemoval::plan(&library, 1).unwrap();
        removal.apply(&mut library);

        let urls = |list: &[Track]| list.iter().map(|t| t.file_url.clone()).collect::<Vec<_>>();
        assert_eq!(urls(&library.uploaded_tracks), ["a", "c"]);
        assert_eq!(urls(&library.playlist), ["c"]);
        assert_eq!(urls(&library.albums["Road Trip"]), ["c"]);
        assert_eq!(urls(&library.albums["Chill"]), ["a"]);
        assert!(library.current_track.is_none());
    }

    #[test]
    fn test_unreferenced_upload_only_touches_uploads() {
        let removal = TrackRemoval::plan(&library(), 0).unwrap();
        assert!(removal.playlist_indices.is_empty());
        assert!(!removal.stops_playback);
        assert_eq!(
            removal.persisted(),
            vec![Collection::UploadedTracks, Collection::Albums]
        );
    }
}
