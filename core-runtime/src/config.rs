//! # Core Configuration Module
//!
//! Builder-based configuration for the music core.
//!
//! The builder collects the host bridges and tuning knobs, then validates them
//! fail-fast so a misconfigured host learns about it at startup rather than on
//! the first `play()`.
//!
//! ## Required Dependencies
//!
//! - `LibraryStore` - persistence for uploads, playlist, albums and search history
//! - `BackendProvider` - hands out native playback backends
//!
//! With the `desktop-shims` feature both are filled in automatically: a SQLite
//! library store under the platform data directory and the rodio-backed
//! desktop provider.
//!
//! ## Optional Dependencies
//!
//! - `PlatformCapabilities` - decides streaming vs native backend (default: detected)
//! - `SearchProvider` - remote catalogue search
//! - `MetadataReader` - tag extraction for user-picked files
//! - `LifecycleObserver` - foreground/background notifications
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .library_store(Arc::new(MyStore))
//!     .backend_provider(Arc::new(MyProvider))
//!     .progress_poll_interval(Duration::from_millis(250))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{
    BackendProvider, LibraryStore, LifecycleObserver, MetadataReader, PlatformCapabilities,
    SearchProvider,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default interval between progress polls.
pub const DEFAULT_PROGRESS_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default number of remembered search queries.
pub const DEFAULT_SEARCH_HISTORY_LIMIT: usize = 20;

/// Core configuration. Build with [`CoreConfig::builder`].
#[derive(Clone)]
pub struct CoreConfig {
    /// Persistent key-value store for the library collections (required)
    pub library_store: Arc<dyn LibraryStore>,

    /// Factory for playback backends (required)
    pub backend_provider: Arc<dyn BackendProvider>,

    /// What the host platform offers
    pub capabilities: PlatformCapabilities,

    /// Remote catalogue search (optional)
    pub search_provider: Option<Arc<dyn SearchProvider>>,

    /// Tag reader for user-picked files (optional)
    pub metadata_reader: Option<Arc<dyn MetadataReader>>,

    /// App lifecycle observer (optional)
    pub lifecycle_observer: Option<Arc<dyn LifecycleObserver>>,

    /// How often the engine polls backend position and duration
    pub progress_poll_interval: Duration,

    /// Maximum remembered search queries
    pub search_history_limit: usize,

    /// Per-subscriber buffer of the event bus
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("library_store", &"LibraryStore { ... }")
            .field("backend_provider", &"BackendProvider { ... }")
            .field("capabilities", &self.capabilities)
            .field(
                "search_provider",
                &self.search_provider.as_ref().map(|_| "SearchProvider { ... }"),
            )
            .field(
                "metadata_reader",
                &self.metadata_reader.as_ref().map(|_| "MetadataReader { ... }"),
            )
            .field(
                "lifecycle_observer",
                &self
                    .lifecycle_observer
                    .as_ref()
                    .map(|_| "LifecycleObserver { ... }"),
            )
            .field("progress_poll_interval", &self.progress_poll_interval)
            .field("search_history_limit", &self.search_history_limit)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Checks the tuning values.
    pub fn validate(&self) -> Result<()> {
        if self.progress_poll_interval.is_zero() {
            return Err(Error::Config(
                "Progress poll interval must be greater than 0ms".to_string(),
            ));
        }

        if self.progress_poll_interval > Duration::from_secs(10) {
            return Err(Error::Config(
                "Progress poll interval exceeds maximum of 10 seconds".to_string(),
            ));
        }

        if self.search_history_limit == 0 {
            return Err(Error::Config(
                "Search history limit must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn library_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "LibraryStore".to_string(),
        message: "LibraryStore implementation is required to persist uploads, playlist and albums. \
                 Desktop: enable the 'desktop-shims' feature to use the default SqliteLibraryStore. \
                 Mobile: inject a store backed by app sandbox storage. \
                 Web: inject an IndexedDB-backed store."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn backend_provider_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "BackendProvider".to_string(),
        message: "BackendProvider implementation is required for audio playback. \
                 Desktop: enable the 'desktop-shims' feature to use the default DesktopBackendProvider. \
                 Mobile: inject a provider wrapping the platform media session. \
                 Web: inject a provider wrapping an audio element."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_library_store(path: Option<PathBuf>) -> Result<Arc<dyn LibraryStore>> {
    use bridge_desktop::SqliteLibraryStore;
    use std::thread;
    use tokio::runtime::{Builder, Handle};

    let path = match path {
        Some(path) => path,
        None => bridge_desktop::default_store_path().map_err(|e| Error::CapabilityMissing {
            capability: "LibraryStore".to_string(),
            message: format!("No data directory for the default library store: {}", e),
        })?,
    };

    let init_store = |path: PathBuf| -> Result<SqliteLibraryStore> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                Error::Config(format!(
                    "Failed to create Tokio runtime for default library store: {}",
                    e
                ))
            })?;

        runtime
            .block_on(SqliteLibraryStore::new(path))
            .map_err(|e| Error::Config(format!("Failed to open default library store: {}", e)))
    };

    // block_on panics inside a runtime, so hop to a plain thread there.
    let store = match Handle::try_current() {
        Ok(_) => thread::spawn(move || init_store(path))
            .join()
            .map_err(|_| {
                Error::Config("Thread panicked while opening default library store".to_string())
            })??,
        Err(_) => init_store(path)?,
    };

    let store: Arc<dyn LibraryStore> = Arc::new(store);
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_library_store(_path: Option<PathBuf>) -> Result<Arc<dyn LibraryStore>> {
    Err(library_store_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_backend_provider() -> Result<Arc<dyn BackendProvider>> {
    let provider: Arc<dyn BackendProvider> = Arc::new(bridge_desktop::DesktopBackendProvider::new());
    Ok(provider)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_backend_provider() -> Result<Arc<dyn BackendProvider>> {
    Err(backend_provider_missing_error())
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    library_store: Option<Arc<dyn LibraryStore>>,
    store_path: Option<PathBuf>,
    backend_provider: Option<Arc<dyn BackendProvider>>,
    capabilities: Option<PlatformCapabilities>,
    search_provider: Option<Arc<dyn SearchProvider>>,
    metadata_reader: Option<Arc<dyn MetadataReader>>,
    lifecycle_observer: Option<Arc<dyn LifecycleObserver>>,
    progress_poll_interval: Option<Duration>,
    search_history_limit: Option<usize>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the library store (required unless `desktop-shims` is enabled).
    pub fn library_store(mut self, store: Arc<dyn LibraryStore>) -> Self {
        self.library_store = Some(store);
        self
    }

    /// Database file for the desktop default store. Ignored when a store is
    /// injected with [`library_store`](Self::library_store).
    pub fn store_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.store_path = Some(path.into());
        self
    }

    /// Sets the backend provider (required unless `desktop-shims` is enabled).
    pub fn backend_provider(mut self, provider: Arc<dyn BackendProvider>) -> Self {
        self.backend_provider = Some(provider);
        self
    }

    /// Overrides detected platform capabilities.
    pub fn capabilities(mut self, capabilities: PlatformCapabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    pub fn search_provider(mut self, provider: Arc<dyn SearchProvider>) -> Self {
        self.search_provider = Some(provider);
        self
    }

    pub fn metadata_reader(mut self, reader: Arc<dyn MetadataReader>) -> Self {
        self.metadata_reader = Some(reader);
        self
    }

    pub fn lifecycle_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.lifecycle_observer = Some(observer);
        self
    }

    /// Default: 500ms
    pub fn progress_poll_interval(mut self, interval: Duration) -> Self {
        self.progress_poll_interval = Some(interval);
        self
    }

    /// Default: 20
    pub fn search_history_limit(mut self, limit: usize) -> Self {
        self.search_history_limit = Some(limit);
        self
    }

    /// Default: 100
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// Fails with [`Error::CapabilityMissing`] when a required bridge is
    /// neither injected nor available as a desktop default, and with
    /// [`Error::Config`] for out-of-range tuning values.
    pub fn build(self) -> Result<CoreConfig> {
        let library_store = match self.library_store {
            Some(store) => store,
            None => provide_default_library_store(self.store_path)?,
        };

        let backend_provider = match self.backend_provider {
            Some(provider) => provider,
            None => provide_default_backend_provider()?,
        };

        let config = CoreConfig {
            library_store,
            backend_provider,
            capabilities: self.capabilities.unwrap_or_else(PlatformCapabilities::detect),
            search_provider: self.search_provider,
            metadata_reader: self.metadata_reader,
            lifecycle_observer: self.lifecycle_observer,
            progress_poll_interval: self
                .progress_poll_interval
                .unwrap_or(DEFAULT_PROGRESS_POLL_INTERVAL),
            search_history_limit: self
                .search_history_limit
                .unwrap_or(DEFAULT_SEARCH_HISTORY_LIMIT),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{BackendKind, BridgeError, PlatformKind, PlaybackBackend};
    use serde_json::Value;

    struct MockLibraryStore;

    #[async_trait]
    impl LibraryStore for MockLibraryStore {
        async fn get(&self, _key: &str) -> BridgeResult<Option<Value>> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: Value) -> BridgeResult<()> {
            Ok(())
        }
    }

    struct MockProvider;

    impl BackendProvider for MockProvider {
        fn supports(&self, _kind: BackendKind) -> bool {
            false
        }

        fn create(&self, kind: BackendKind) -> BridgeResult<Arc<dyn PlaybackBackend>> {
            Err(BridgeError::NotAvailable(format!("{} backend", kind)))
        }
    }

    fn builder() -> CoreConfigBuilder {
        CoreConfig::builder()
            .library_store(Arc::new(MockLibraryStore))
            .backend_provider(Arc::new(MockProvider))
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_library_store() {
        let result = CoreConfig::builder()
            .backend_provider(Arc::new(MockProvider))
            .build();

        let err = result.unwrap_err();
        assert!(matches!(err, Error::CapabilityMissing { ref capability, .. } if capability == "LibraryStore"));
        assert!(err.to_string().contains("LibraryStore"));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_backend_provider() {
        let result = CoreConfig::builder()
            .library_store(Arc::new(MockLibraryStore))
            .build();

        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("BackendProvider"));
        assert!(err_msg.contains("audio playback"));
    }

    #[test]
    fn test_builder_defaults() {
        let config = builder().build().unwrap();
        assert_eq!(config.progress_poll_interval, Duration::from_millis(500));
        assert_eq!(config.search_history_limit, 20);
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert_eq!(config.capabilities, PlatformCapabilities::detect());
        assert!(config.search_provider.is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let config = builder()
            .capabilities(PlatformCapabilities::mobile(PlatformKind::Android))
            .progress_poll_interval(Duration::from_millis(100))
            .search_history_limit(5)
            .build()
            .unwrap();

        assert!(config.capabilities.native_media_session);
        assert_eq!(config.progress_poll_interval, Duration::from_millis(100));
        assert_eq!(config.search_history_limit, 5);
    }

    #[test]
    fn test_validate_rejects_zero_poll_interval() {
        let result = builder().progress_poll_interval(Duration::ZERO).build();
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("must be greater than 0ms"));
    }

    #[test]
    fn test_validate_rejects_slow_poll_interval() {
        let result = builder()
            .progress_poll_interval(Duration::from_secs(60))
            .build();
        assert!(result.unwrap_err().to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_validate_rejects_zero_history_limit() {
        let result = builder().search_history_limit(0).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_config_debug_hides_bridges() {
        let config = builder().build().unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("LibraryStore { ... }"));
        assert!(debug.contains("progress_poll_interval"));
    }
}
