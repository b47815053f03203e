//! Backend provider for desktop hosts.

use bridge_traits::{
    error::{BridgeError, Result},
    playback::{BackendKind, BackendProvider, PlaybackBackend},
};
use std::sync::Arc;

/// Hands out rodio streaming backends.
///
/// Desktops have no OS media session the core can bind to, so only
/// [`BackendKind::Streaming`] is offered, and only when built with the
/// `audio-output` feature.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopBackendProvider;

impl DesktopBackendProvider {
    pub fn new() -> Self {
        Self
    }
}

impl BackendProvider for DesktopBackendProvider {
    fn supports(&self, kind: BackendKind) -> bool {
        kind == BackendKind::Streaming && cfg!(feature = "audio-output")
    }

    fn create(&self, kind: BackendKind) -> Result<Arc<dyn PlaybackBackend>> {
        match kind {
            #[cfg(feature = "audio-output")]
            BackendKind::Streaming => {
                let backend: Arc<dyn PlaybackBackend> = Arc::new(crate::RodioBackend::new()?);
                Ok(backend)
            }
            #[cfg(not(feature = "audio-output"))]
            BackendKind::Streaming => Err(BridgeError::NotAvailable(
                "streaming playback requires the 'audio-output' feature".to_string(),
            )),
            BackendKind::Native => Err(BridgeError::NotAvailable(
                "desktop hosts have no native media session".to_string(),
            )),
        }
    }
}
