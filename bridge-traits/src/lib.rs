//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the music core and the host shell.
//! Each trait represents a capability the core needs but that is implemented
//! differently per platform (desktop, Android, iOS, browser/WebView).
//!
//! ## Traits
//!
//! ### Playback
//! - [`PlaybackBackend`](playback::PlaybackBackend) - One native player handle (streaming decoder or OS media session)
//! - [`BackendProvider`](playback::BackendProvider) - Hands out backend handles per [`BackendKind`](playback::BackendKind)
//!
//! ### Storage
//! - [`LibraryStore`](storage::LibraryStore) - Async key-value persistence for the library collections
//!
//! ### Collaborators
//! - [`SearchProvider`](search::SearchProvider) - Remote catalogue search
//! - [`MetadataReader`](metadata::MetadataReader) - Embedded tag extraction for picked files
//! - [`LifecycleObserver`](lifecycle::LifecycleObserver) - App foreground/background transitions
//!
//! ### Utilities
//! - [`PlatformCapabilities`](platform::PlatformCapabilities) - Which backends the host can offer
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should convert native failures into it with enough context
//! (source locator, store key) to act on.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so handles can be shared across
//! async tasks behind `Arc`.

pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod metadata;
pub mod platform;
pub mod playback;
pub mod search;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use lifecycle::{LifecycleChangeStream, LifecycleObserver, LifecycleState};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use metadata::{MetadataReader, TrackMetadata};
pub use platform::{PlatformCapabilities, PlatformKind};
pub use playback::{AudioSource, BackendKind, BackendProvider, BackendStatus, PlaybackBackend};
pub use search::{playable_results, CatalogId, RemoteAlbum, RemoteArtist, RemoteTrackResult, SearchProvider};
pub use storage::LibraryStore;
