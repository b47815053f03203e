//! Backend selection.

use bridge_traits::platform::PlatformCapabilities;
use bridge_traits::playback::BackendKind;

/// Picks the backend family for new sessions from host capabilities.
///
/// The choice depends on the platform only, never on the track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendSelector {
    capabilities: PlatformCapabilities,
}

impl BackendSelector {
    pub fn new(capabilities: PlatformCapabilities) -> Self {
        Self { capabilities }
    }

    pub fn select(&self) -> BackendKind {
        if self.capabilities.native_media_session {
            BackendKind::Native
        } else {
            BackendKind::Streaming
        }
    }

    pub fn capabilities(&self) -> PlatformCapabilities {
        self.capabilities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::platform::PlatformKind;

    #[test]
    fn test_selection() {
        assert_eq!(
            BackendSelector::new(PlatformCapabilities::web()).select(),
            BackendKind::Streaming
        );
        assert_eq!(
            BackendSelector::new(PlatformCapabilities::mobile(PlatformKind::Ios)).select(),
            BackendKind::Native
        );
        assert_eq!(
            BackendSelector::new(PlatformCapabilities::new(PlatformKind::Desktop, false)).select(),
            BackendKind::Streaming
        );
    }
}
