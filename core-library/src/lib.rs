//! # Library Management Module
//!
//! Owns the user's library: uploaded tracks, the playlist, named albums, the
//! now-playing pointer and recent searches.
//!
//! ## Overview
//!
//! - [`models`]: track identity (keyed by `file_url`) and the collection types
//! - [`manager`]: [`LibraryManager`], which de-duplicates, cascades deletes and
//!   persists through a [`LibraryStore`](bridge_traits::storage::LibraryStore)
//! - [`removal`]: the cascade-delete plan
//! - [`history`]: search history

pub mod config;
pub mod error;
pub mod history;
pub mod manager;
pub mod models;
pub mod removal;

pub use config::LibraryConfig;
pub use error::{LibraryError, Result};
pub use manager::{LibraryManager, PlaybackControl};
pub use models::{Albums, Collection, Library, Track, PLACEHOLDER_IMAGE};
pub use removal::TrackRemoval;
