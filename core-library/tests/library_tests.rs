//! Integration tests for the library consistency layer

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::metadata::TrackMetadata;
use bridge_traits::storage::LibraryStore;
use core_library::{
    Collection, LibraryConfig, LibraryError, LibraryManager, PlaybackControl, Track,
};
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
use mockall::mock;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Test doubles
// ============================================================================

#[derive(Default)]
struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
    fail_writes: Mutex<bool>,
}

impl MemoryStore {
    fn value(&self, key: &str) -> Option<Value> {
        self.values.lock().unwrap().get(key).cloned()
    }

    fn urls(&self, key: &str) -> Vec<String> {
        self.value(key)
            .and_then(|v| serde_json::from_value::<Vec<Track>>(v).ok())
            .unwrap_or_default()
            .into_iter()
            .map(|t| t.file_url)
            .collect()
    }

    fn set_failing(&self, failing: bool) {
        *self.fail_writes.lock().unwrap() = failing;
    }
}

#[async_trait]
impl LibraryStore for MemoryStore {
    async fn get(&self, key: &str) -> BridgeResult<Option<Value>> {
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: Value) -> BridgeResult<()> {
        if *self.fail_writes.lock().unwrap() {
            return Err(BridgeError::OperationFailed("disk full".to_string()));
        }
        self.values.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }
}

mock! {
    Store {}

    #[async_trait]
    impl LibraryStore for Store {
        async fn get(&self, key: &str) -> BridgeResult<Option<Value>>;
        async fn set(&self, key: &str, value: Value) -> BridgeResult<()>;
    }
}

#[derive(Default)]
struct RecordingPlayback {
    stops: AtomicUsize,
}

#[async_trait]
impl PlaybackControl for RecordingPlayback {
    async fn stop_playback(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

fn track(url: &str) -> Track {
    Track::local(
        url,
        TrackMetadata {
            title: Some(format!("Title {}", url)),
            artist: Some("Artist".to_string()),
            image: None,
        },
    )
}

fn urls(tracks: &[Track]) -> Vec<&str> {
    tracks.iter().map(|t| t.file_url.as_str()).collect()
}

async fn manager(store: Arc<MemoryStore>) -> LibraryManager {
    LibraryManager::load(store, LibraryConfig::default())
        .await
        .unwrap()
}

// ============================================================================
// Uploads and de-duplication
// ============================================================================

#[tokio::test]
async fn test_uploads_are_unique_and_prepended() {
    let store = Arc::new(MemoryStore::default());
    let library = manager(store.clone()).await;

    for url in ["a", "b", "a", "c", "b"] {
        library.add_uploaded_track(track(url)).await.unwrap();
    }

    assert_eq!(urls(&library.uploaded_tracks().await), ["c", "b", "a"]);
    assert_eq!(store.urls("uploadedTracks"), ["c", "b", "a"]);
}

#[tokio::test]
async fn test_duplicate_upload_returns_false() {
    let library = manager(Arc::new(MemoryStore::default())).await;
    assert!(library.add_uploaded_track(track("a")).await.unwrap());
    assert!(!library.add_uploaded_track(track("a")).await.unwrap());
}

// ============================================================================
// Cascade delete
// ============================================================================

#[tokio::test]
async fn test_cascade_delete_of_current_track() {
    let store = Arc::new(MemoryStore::default());
    let playback = Arc::new(RecordingPlayback::default());
    let library = manager(store.clone())
        .await
        .with_playback_control(playback.clone());

    // uploads [A, B, C], playlist [B, C], current B
    for url in ["c", "b", "a"] {
        library.add_uploaded_track(track(url)).await.unwrap();
    }
    for url in ["c", "b"] {
        library.add_to_playlist(track(url)).await.unwrap();
    }
    library.set_current_track(track("b")).await;

    let removed = library.delete_uploaded_track(1).await.unwrap();
    assert_eq!(removed.file_url, "b");

    assert_eq!(urls(&library.uploaded_tracks().await), ["a", "c"]);
    assert_eq!(urls(&library.playlist().await), ["c"]);
    assert!(library.current_track().await.is_none());
    assert_eq!(playback.stops.load(Ordering::SeqCst), 1);

    assert_eq!(store.urls("uploadedTracks"), ["a", "c"]);
    assert_eq!(store.urls("playlist"), ["c"]);
    assert!(library.is_durable().await);
}

#[tokio::test]
async fn test_cascade_delete_reaches_every_album() {
    let store = Arc::new(MemoryStore::default());
    let library = manager(store.clone()).await;

    library.add_uploaded_track(track("t")).await.unwrap();
    library.add_to_playlist(track("t")).await.unwrap();
    library.create_album("A").await.unwrap();
    library.create_album("B").await.unwrap();
    library.add_track_to_album("A", track("t")).await.unwrap();
    library.add_track_to_album("B", track("x")).await.unwrap();
    library.add_track_to_album("B", track("t")).await.unwrap();

    library.delete_uploaded_track(0).await.unwrap();

    let snapshot = library.snapshot().await;
    assert!(snapshot.uploaded_tracks.is_empty());
    assert!(snapshot.playlist.is_empty());
    assert!(snapshot.albums["A"].is_empty());
    assert_eq!(urls(&snapshot.albums["B"]), ["x"]);

    let stored_albums = store.value("albums").unwrap();
    assert_eq!(stored_albums["A"], json!([]));
    assert_eq!(stored_albums["B"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_other_track_keeps_playback() {
    let playback = Arc::new(RecordingPlayback::default());
    let library = manager(Arc::new(MemoryStore::default()))
        .await
        .with_playback_control(playback.clone());

    library.add_uploaded_track(track("a")).await.unwrap();
    library.add_uploaded_track(track("b")).await.unwrap();
    library.set_current_track(track("a")).await;

    library.delete_uploaded_track(0).await.unwrap();

    assert_eq!(playback.stops.load(Ordering::SeqCst), 0);
    assert_eq!(library.current_track().await.unwrap().file_url, "a");
}

#[tokio::test]
async fn test_delete_out_of_range_changes_nothing() {
    let store = Arc::new(MemoryStore::default());
    let library = manager(store.clone()).await;
    library.add_uploaded_track(track("a")).await.unwrap();

    let err = library.delete_uploaded_track(5).await.unwrap_err();
    assert!(matches!(
        err,
        LibraryError::IndexOutOfRange { index: 5, len: 1, .. }
    ));
    assert!(err.is_caller_error());
    assert_eq!(urls(&library.uploaded_tracks().await), ["a"]);

    let err = library.delete_from_playlist(0).await.unwrap_err();
    assert!(matches!(err, LibraryError::IndexOutOfRange { .. }));
}

#[tokio::test]
async fn test_delete_from_playlist() {
    let store = Arc::new(MemoryStore::default());
    let library = manager(store.clone()).await;
    library.add_to_playlist(track("a")).await.unwrap();
    library.add_to_playlist(track("b")).await.unwrap();

    let removed = library.delete_from_playlist(0).await.unwrap();
    assert_eq!(removed.file_url, "b");
    assert_eq!(store.urls("playlist"), ["a"]);
}

// ============================================================================
// Albums
// ============================================================================

#[tokio::test]
async fn test_album_dedup_within_album() {
    let library = manager(Arc::new(MemoryStore::default())).await;
    library.create_album("Road Trip").await.unwrap();

    assert!(library.add_track_to_album("Road Trip", track("x")).await.unwrap());
    assert!(!library.add_track_to_album("Road Trip", track("x")).await.unwrap());

    assert_eq!(library.album("Road Trip").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_album_tracks_append() {
    let library = manager(Arc::new(MemoryStore::default())).await;
    library.create_album("Mix").await.unwrap();
    library.add_track_to_album("Mix", track("1")).await.unwrap();
    library.add_track_to_album("Mix", track("2")).await.unwrap();
    assert_eq!(urls(&library.album("Mix").await.unwrap()), ["1", "2"]);
}

#[tokio::test]
async fn test_create_album_ignores_blank_and_duplicates() {
    let library = manager(Arc::new(MemoryStore::default())).await;
    assert!(library.create_album("  Road Trip ").await.unwrap());
    assert!(!library.create_album("Road Trip").await.unwrap());
    assert!(!library.create_album("   ").await.unwrap());
    assert_eq!(library.album_names().await, ["Road Trip"]);
}

#[tokio::test]
async fn test_add_to_unknown_album() {
    let library = manager(Arc::new(MemoryStore::default())).await;
    let err = library
        .add_track_to_album("Nope", track("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::UnknownAlbum(ref name) if name == "Nope"));
}

#[tokio::test]
async fn test_rename_preserves_contents_and_expansion() {
    let library = manager(Arc::new(MemoryStore::default())).await;
    library.create_album("Old").await.unwrap();
    library.add_track_to_album("Old", track("1")).await.unwrap();
    library.set_album_expanded("Old", true).await;

    assert!(library.rename_album("Old", "New").await.unwrap());
    library.add_track_to_album("New", track("2")).await.unwrap();

    assert!(library.album("Old").await.is_none());
    assert_eq!(urls(&library.album("New").await.unwrap()), ["1", "2"]);
    assert!(!library.is_album_expanded("Old").await);
    assert!(library.is_album_expanded("New").await);
}

#[tokio::test]
async fn test_rename_noops() {
    let library = manager(Arc::new(MemoryStore::default())).await;
    library.create_album("A").await.unwrap();
    library.create_album("B").await.unwrap();

    assert!(!library.rename_album("A", "  ").await.unwrap());
    assert!(!library.rename_album("A", "A").await.unwrap());
    assert!(!library.rename_album("A", "B").await.unwrap());
    assert_eq!(library.album_names().await, ["A", "B"]);

    let err = library.rename_album("Missing", "C").await.unwrap_err();
    assert!(matches!(err, LibraryError::UnknownAlbum(_)));
}

#[tokio::test]
async fn test_delete_album_is_idempotent() {
    let library = manager(Arc::new(MemoryStore::default())).await;
    library.create_album("A").await.unwrap();
    library.toggle_album_expanded("A").await;

    assert!(library.delete_album("A").await.unwrap());
    assert!(!library.delete_album("A").await.unwrap());
    assert!(!library.is_album_expanded("A").await);
}

#[tokio::test]
async fn test_toggle_expansion() {
    let library = manager(Arc::new(MemoryStore::default())).await;
    library.create_album("A").await.unwrap();
    assert!(library.toggle_album_expanded("A").await);
    assert!(!library.toggle_album_expanded("A").await);
    assert!(!library.toggle_album_expanded("Unknown").await);
}

#[tokio::test]
async fn test_album_names_are_trimmed_everywhere() {
    let library = manager(Arc::new(MemoryStore::default())).await;
    assert!(library.create_album("  Road Trip ").await.unwrap());
    assert_eq!(library.album_names().await, ["Road Trip"]);

    assert!(library.add_track_to_album(" Road Trip", track("a")).await.unwrap());
    assert_eq!(urls(&library.album("Road Trip  ").await.unwrap()), ["a"]);

    library.set_album_expanded("  Road Trip ", true).await;
    assert!(library.is_album_expanded("Road Trip").await);
    assert!(!library.toggle_album_expanded(" Road Trip ").await);
    assert!(library.toggle_album_expanded("Road Trip ").await);

    assert!(library.rename_album("  Road Trip ", " Long Drive ").await.unwrap());
    assert_eq!(library.album_names().await, ["Long Drive"]);
    assert!(library.is_album_expanded(" Long Drive").await);

    assert!(!library.rename_album(" Long Drive ", "Long Drive").await.unwrap());
    assert!(library.delete_album("  Long Drive ").await.unwrap());
    assert!(library.album_names().await.is_empty());
}

// ============================================================================
// Navigation
// ============================================================================

#[tokio::test]
async fn test_navigation_over_playlist() {
    let library = manager(Arc::new(MemoryStore::default())).await;
    library.add_uploaded_track(track("u")).await.unwrap();
    for url in ["3", "2", "1"] {
        library.add_to_playlist(track(url)).await.unwrap();
    }

    // No current track.
    assert!(library.next_track().await.is_none());

    library.set_current_track(track("1")).await;
    assert!(library.previous_track().await.is_none());
    assert_eq!(library.next_track().await.unwrap().file_url, "2");
    assert_eq!(library.next_track().await.unwrap().file_url, "3");
    assert!(library.next_track().await.is_none());
    assert_eq!(library.current_track().await.unwrap().file_url, "3");
    assert_eq!(library.previous_track().await.unwrap().file_url, "2");
}

#[tokio::test]
async fn test_navigation_falls_back_to_uploads() {
    let library = manager(Arc::new(MemoryStore::default())).await;
    library.add_uploaded_track(track("b")).await.unwrap();
    library.add_uploaded_track(track("a")).await.unwrap();
    library.set_current_track(track("a")).await;

    assert_eq!(library.next_track().await.unwrap().file_url, "b");
}

#[tokio::test]
async fn test_navigation_from_track_outside_list() {
    let library = manager(Arc::new(MemoryStore::default())).await;
    library.add_to_playlist(track("2")).await.unwrap();
    library.add_to_playlist(track("1")).await.unwrap();
    library.set_current_track(track("preview")).await;

    assert!(library.previous_track().await.is_none());
    assert_eq!(library.next_track().await.unwrap().file_url, "1");
}

#[tokio::test]
async fn test_find_by_file_url_prefers_playlist() {
    let library = manager(Arc::new(MemoryStore::default())).await;
    let mut upload = track("a");
    upload.title = "From uploads".to_string();
    library.add_uploaded_track(upload).await.unwrap();
    let mut listed = track("a");
    listed.title = "From playlist".to_string();
    library.add_to_playlist(listed).await.unwrap();

    let found = library.find_by_file_url("a").await.unwrap();
    assert_eq!(found.title, "From playlist");
    assert!(library.find_by_file_url("zzz").await.is_none());
}

// ============================================================================
// Loading
// ============================================================================

#[tokio::test]
async fn test_load_round_trips_store_shape() {
    let store = Arc::new(MemoryStore::default());
    {
        let library = manager(store.clone()).await;
        library.add_uploaded_track(track("a")).await.unwrap();
        library.create_album("Mix").await.unwrap();
        library.add_track_to_album("Mix", track("a")).await.unwrap();
        library.record_search("daft punk").await.unwrap();
    }

    let reloaded = manager(store.clone()).await;
    let snapshot = reloaded.snapshot().await;
    assert_eq!(snapshot.uploaded_tracks, vec![track("a")]);
    assert_eq!(snapshot.albums["Mix"], vec![track("a")]);
    assert_eq!(snapshot.search_history, ["daft punk"]);
    assert!(snapshot.current_track.is_none());
}

#[tokio::test]
async fn test_load_tolerates_corrupt_values() {
    let store = Arc::new(MemoryStore::default());
    store
        .values
        .lock()
        .unwrap()
        .insert("playlist".to_string(), json!({"not": "a list"}));
    store.values.lock().unwrap().insert(
        "uploadedTracks".to_string(),
        json!([{"title": "t", "artist": "a", "image": "i", "fileUrl": "f"}]),
    );

    let library = manager(store).await;
    assert!(library.playlist().await.is_empty());
    assert_eq!(library.uploaded_tracks().await.len(), 1);
}

#[tokio::test]
async fn test_load_skips_only_unreadable_entries() {
    let store = Arc::new(MemoryStore::default());
    store.values.lock().unwrap().insert(
        "playlist".to_string(),
        json!([
            {"title": "Kept", "artist": "a", "image": "i", "fileUrl": "kept"},
            {"title": "Spotify", "artist": "a", "image": "i", "fileUrl": "spotify",
             "albumId": "4aawyAB9vmqN3uQ7FjRGTy"},
            {"title": 5, "fileUrl": "broken"}
        ]),
    );
    store.values.lock().unwrap().insert(
        "albums".to_string(),
        json!({
            "Mix": [
                {"artist": "missing title"},
                {"title": "t", "artist": "a", "image": "i", "fileUrl": "in-mix"}
            ]
        }),
    );

    let library = manager(store.clone()).await;
    assert_eq!(urls(&library.playlist().await), ["kept", "spotify"]);
    assert_eq!(urls(&library.album("Mix").await.unwrap()), ["in-mix"]);

    library.add_to_playlist(track("new")).await.unwrap();
    assert_eq!(store.urls("playlist"), ["new", "kept", "spotify"]);
    assert_eq!(
        store.value("playlist").unwrap()[2]["albumId"],
        "4aawyAB9vmqN3uQ7FjRGTy"
    );
}

#[tokio::test]
async fn test_load_fails_on_store_read_error() {
    let mut store = MockStore::new();
    store
        .expect_get()
        .returning(|_| Err(BridgeError::OperationFailed("locked".to_string())));

    let result = LibraryManager::load(Arc::new(store), LibraryConfig::default()).await;
    assert!(matches!(
        result,
        Err(LibraryError::Persistence { ref collection, .. }) if collection == "uploadedTracks"
    ));
}

// ============================================================================
// Persistence failure
// ============================================================================

#[tokio::test]
async fn test_persistence_failure_keeps_change_and_flushes_later() {
    let store = Arc::new(MemoryStore::default());
    let bus = EventBus::new(16);
    let mut events = bus.subscribe();
    let library = manager(store.clone()).await.with_event_bus(bus);

    store.set_failing(true);
    let err = library.add_uploaded_track(track("a")).await.unwrap_err();
    assert!(err.is_persistence_error());

    assert_eq!(urls(&library.uploaded_tracks().await), ["a"]);
    assert_eq!(library.pending_writes().await, vec![Collection::UploadedTracks]);
    assert!(!library.is_durable().await);
    assert!(store.value("uploadedTracks").is_none());

    let mut saw_failure = false;
    while let Ok(event) = events.try_recv() {
        if let CoreEvent::Library(LibraryEvent::PersistenceFailed { collection, .. }) = event {
            assert_eq!(collection, "uploadedTracks");
            saw_failure = true;
        }
    }
    assert!(saw_failure);

    assert!(library.flush().await.is_err());

    store.set_failing(false);
    library.flush().await.unwrap();
    assert!(library.is_durable().await);
    assert_eq!(store.urls("uploadedTracks"), ["a"]);
}

#[tokio::test]
async fn test_cascade_with_failing_store_still_applies_in_memory() {
    let mut store = MockStore::new();
    store.expect_get().returning(|_| Ok(None));
    store
        .expect_set()
        .withf(|key, _| key == "uploadedTracks")
        .returning(|_, _| Ok(()));
    store
        .expect_set()
        .withf(|key, _| key == "playlist")
        .returning(|_, _| Err(BridgeError::OperationFailed("quota".to_string())));

    let playback = Arc::new(RecordingPlayback::default());
    let library = LibraryManager::load(Arc::new(store), LibraryConfig::default())
        .await
        .unwrap()
        .with_playback_control(playback.clone());

    library.add_uploaded_track(track("a")).await.unwrap();
    assert!(library.add_to_playlist(track("a")).await.is_err());
    library.set_current_track(track("a")).await;

    let err = library.delete_uploaded_track(0).await.unwrap_err();
    assert!(matches!(err, LibraryError::Persistence { ref collection, .. } if collection == "playlist"));

    let snapshot = library.snapshot().await;
    assert!(snapshot.uploaded_tracks.is_empty());
    assert!(snapshot.playlist.is_empty());
    assert!(snapshot.current_track.is_none());
    assert_eq!(playback.stops.load(Ordering::SeqCst), 1);
    assert_eq!(library.pending_writes().await, vec![Collection::Playlist]);
}

// ============================================================================
// Search history
// ============================================================================

#[tokio::test]
async fn test_search_history_limit_and_persistence() {
    let store = Arc::new(MemoryStore::default());
    let library = LibraryManager::load(
        store.clone(),
        LibraryConfig::default().with_search_history_limit(2),
    )
    .await
    .unwrap();

    library.record_search("a").await.unwrap();
    library.record_search("b").await.unwrap();
    library.record_search(" a ").await.unwrap();
    library.record_search("c").await.unwrap();

    assert_eq!(library.search_history().await, ["c", "a"]);
    assert_eq!(store.value("searchHistory"), Some(json!(["c", "a"])));

    library.clear_search_history().await.unwrap();
    assert!(library.search_history().await.is_empty());
    assert_eq!(store.value("searchHistory"), Some(json!([])));
}
