//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `LibraryStore` using a SQLite key-value table (`sqlx`)
//! - `BackendProvider` handing out rodio streaming backends
//! - `RodioBackend` decoding local files, data URIs and remote URLs
//!
//! ## Feature Flags
//!
//! - `audio-output`: Enable the rodio backend and source fetching with `reqwest`
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{default_store_path, DesktopBackendProvider, SqliteLibraryStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = SqliteLibraryStore::new(default_store_path().unwrap()).await.unwrap();
//!     let provider = DesktopBackendProvider::new();
//!
//!     // Use in core configuration
//! }
//! ```

mod provider;
mod store;

#[cfg(feature = "audio-output")]
mod rodio_backend;
#[cfg(feature = "audio-output")]
mod source;

pub use provider::DesktopBackendProvider;
pub use store::{default_store_path, SqliteLibraryStore};

#[cfg(feature = "audio-output")]
pub use rodio_backend::RodioBackend;
#[cfg(feature = "audio-output")]
pub use source::fetch_source_bytes;
