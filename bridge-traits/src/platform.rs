//! Platform identification and capability discovery.
//!
//! Hosts differ in which audio backend they can offer. Browser and WebView
//! contexts only have a software decoder, while packaged mobile builds expose
//! an OS-level media session. The core asks these capabilities once per
//! playback session and never inspects track shape to decide.

use serde::{Deserialize, Serialize};

/// Host platform family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    Desktop,
    Android,
    Ios,
    Web,
}

impl PlatformKind {
    /// Platform the current binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "android") {
            PlatformKind::Android
        } else if cfg!(target_os = "ios") {
            PlatformKind::Ios
        } else if cfg!(target_arch = "wasm32") {
            PlatformKind::Web
        } else {
            PlatformKind::Desktop
        }
    }

    /// Returns `true` for packaged mobile builds.
    pub fn is_mobile(&self) -> bool {
        matches!(self, PlatformKind::Android | PlatformKind::Ios)
    }
}

/// Capabilities reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformCapabilities {
    /// Platform family.
    pub platform: PlatformKind,
    /// Whether an OS media session object can be created for playback.
    pub native_media_session: bool,
}

impl PlatformCapabilities {
    /// Construct capabilities explicitly.
    pub fn new(platform: PlatformKind, native_media_session: bool) -> Self {
        Self {
            platform,
            native_media_session,
        }
    }

    /// Best guess for the compiled target. Mobile targets get a native media
    /// session, everything else falls back to software decoding.
    pub fn detect() -> Self {
        let platform = PlatformKind::current();
        Self::new(platform, platform.is_mobile())
    }

    /// Browser/WebView capabilities: streaming decoder only.
    pub fn web() -> Self {
        Self::new(PlatformKind::Web, false)
    }

    /// Packaged mobile capabilities.
    pub fn mobile(platform: PlatformKind) -> Self {
        Self::new(platform, true)
    }
}

impl Default for PlatformCapabilities {
    fn default() -> Self {
        Self::detect()
    }
}
