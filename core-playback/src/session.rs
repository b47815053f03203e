//! Published playback state.

use bridge_traits::playback::BackendKind;
use core_library::Track;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a playback session.
///
/// `Idle -> Loading -> Playing <-> Paused`, and any state `-> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    Stopped,
}

impl PlaybackState {
    /// Whether a backend is bound.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            PlaybackState::Loading | PlaybackState::Playing | PlaybackState::Paused
        )
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Loading => "loading",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Snapshot of what the engine is doing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlaybackStatus {
    pub state: PlaybackState,
    /// Backend family of the active session.
    pub backend: Option<BackendKind>,
    /// Now playing. Absent once stopped.
    pub track: Option<Track>,
    /// Reason the last session ended abnormally.
    pub last_error: Option<String>,
}

impl PlaybackStatus {
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }
}

/// Position and duration of the active session, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Progress {
    pub position_secs: f64,
    /// Zero while unknown.
    pub duration_secs: f64,
}

impl Progress {
    /// Position as a fraction of duration in `[0, 1]`; 0 while duration is unknown.
    pub fn fraction(&self) -> f64 {
        if self.duration_secs <= 0.0 {
            return 0.0;
        }
        (self.position_secs / self.duration_secs).clamp(0.0, 1.0)
    }

    pub fn is_zero(&self) -> bool {
        self.position_secs == 0.0 && self.duration_secs == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction() {
        let p = Progress {
            position_secs: 15.0,
            duration_secs: 30.0,
        };
        assert_eq!(p.fraction(), 0.5);
        assert_eq!(Progress::default().fraction(), 0.0);
        assert_eq!(
            Progress {
                position_secs: 40.0,
                duration_secs: 30.0
            }
            .fraction(),
            1.0
        );
    }

    #[test]
    fn test_state_activity() {
        assert!(PlaybackState::Paused.is_active());
        assert!(!PlaybackState::Stopped.is_active());
        assert_eq!(PlaybackState::Loading.to_string(), "loading");
    }
}
