//! # Playback Error Types

use bridge_traits::error::BridgeError;
use bridge_traits::playback::BackendKind;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Caller Errors
    // ========================================================================
    /// Track has no usable source locator. Rejected before any state change.
    #[error("Invalid audio source: {0}")]
    InvalidSource(String),

    // ========================================================================
    // Backend Errors
    // ========================================================================
    /// Backend failed to load, decode, or reach the source.
    #[error("{kind} backend failed: {message}")]
    Backend { kind: BackendKind, message: String },

    /// Host could not hand out a backend of the selected kind.
    #[error("{kind} backend unavailable: {message}")]
    BackendUnavailable { kind: BackendKind, message: String },
}

impl PlaybackError {
    pub(crate) fn backend(kind: BackendKind, err: BridgeError) -> Self {
        PlaybackError::Backend {
            kind,
            message: err.to_string(),
        }
    }

    /// Returns `true` for contract violations by the caller.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, PlaybackError::InvalidSource(_))
    }

    /// Returns `true` if a native backend reported the failure.
    pub fn is_backend_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::Backend { .. } | PlaybackError::BackendUnavailable { .. }
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
