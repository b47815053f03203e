//! Playback bridge traits and supporting source types.
//!
//! The core drives two incompatible kinds of native players: a software
//! streaming decoder that accepts arbitrary URLs and data URIs, and an OS media
//! session bound to a file path. Both are reached through [`PlaybackBackend`],
//! and hosts hand out fresh backend handles through a [`BackendProvider`].

use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Which family of native player backs a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Software decoder for URL, data URI, and object URL sources.
    Streaming,
    /// OS-level media session bound to a file path.
    Native,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Streaming => write!(f, "streaming"),
            BackendKind::Native => write!(f, "native"),
        }
    }
}

/// Parsed playable source.
///
/// Tracks carry a single string locator; this splits it into the forms the
/// backends understand. Which backend receives it is decided elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// Remote HTTP(S) resource, typically a preview clip.
    Remote { url: String },
    /// Inline `data:` URI.
    DataUri {
        /// Declared media type, empty when omitted.
        media_type: String,
        /// Whether the payload is base64 encoded.
        base64: bool,
        /// Raw payload after the comma.
        payload: String,
    },
    /// Browser object URL (`blob:`), only resolvable inside the page that minted it.
    ObjectUrl { url: String },
    /// File on the local filesystem.
    LocalPath { path: PathBuf },
}

impl AudioSource {
    /// Parse a track locator.
    ///
    /// `file://` URLs become local paths. Anything without a recognised
    /// scheme is treated as a native path.
    pub fn from_locator(locator: &str) -> Result<Self> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(BridgeError::UnsupportedSource("empty locator".to_string()));
        }

        let lower = locator.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Ok(AudioSource::Remote {
                url: locator.to_string(),
            });
        }
        if lower.starts_with("blob:") {
            return Ok(AudioSource::ObjectUrl {
                url: locator.to_string(),
            });
        }
        if lower.starts_with("data:") {
            return Self::parse_data_uri(&locator[5..]);
        }
        if lower.starts_with("file://") {
            return Ok(AudioSource::LocalPath {
                path: PathBuf::from(&locator[7..]),
            });
        }

        Ok(AudioSource::LocalPath {
            path: PathBuf::from(locator),
        })
    }

    fn parse_data_uri(rest: &str) -> Result<Self> {
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| BridgeError::UnsupportedSource("data URI without payload".to_string()))?;

        let mut parts = header.split(';');
        let media_type = parts.next().unwrap_or_default().to_string();
        let base64 = parts.any(|p| p.eq_ignore_ascii_case("base64"));

        Ok(AudioSource::DataUri {
            media_type,
            base64,
            payload: payload.to_string(),
        })
    }

    /// Returns `true` if this source requires network access.
    pub fn is_remote(&self) -> bool {
        matches!(self, AudioSource::Remote { .. })
    }

    /// Returns `true` for sources that name a file on disk.
    pub fn is_local_path(&self) -> bool {
        matches!(self, AudioSource::LocalPath { .. })
    }
}

/// Short, privacy-preserving rendering used in logs. Data URIs collapse to
/// their media type and size; paths to their file name.
impl fmt::Display for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioSource::Remote { url } => write!(f, "{}", url),
            AudioSource::ObjectUrl { url } => write!(f, "{}", url),
            AudioSource::DataUri {
                media_type,
                payload,
                ..
            } => write!(f, "data:{} ({} bytes)", media_type, payload.len()),
            AudioSource::LocalPath { path } => match path.file_name() {
                Some(name) => write!(f, "{}", name.to_string_lossy()),
                None => write!(f, "{}", path.display()),
            },
        }
    }
}

/// Terminal conditions a backend can report while a session runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendStatus {
    /// Loaded and either playing or paused.
    Active,
    /// The source played to its end.
    Ended,
    /// Decode, load, or network failure after the source was accepted.
    Failed { message: String },
}

/// A single native player handle.
///
/// One handle serves one session: the engine calls [`load`](Self::load) once,
/// drives transport, and finishes with [`stop`](Self::stop) followed by
/// [`release`](Self::release). Position and duration are pulled, never pushed.
#[async_trait]
pub trait PlaybackBackend: Send + Sync {
    /// Backend family of this handle.
    fn kind(&self) -> BackendKind;

    /// Bind the source. Backends that cannot open it return
    /// [`BridgeError::UnsupportedSource`].
    async fn load(&self, source: AudioSource) -> Result<()>;

    /// Start playback of the loaded source.
    async fn play(&self) -> Result<()>;

    /// Pause without releasing the source.
    async fn pause(&self) -> Result<()>;

    /// Continue after [`pause`](Self::pause).
    async fn resume(&self) -> Result<()>;

    /// Halt playback.
    async fn stop(&self) -> Result<()>;

    /// Current playback position.
    async fn position(&self) -> Result<Duration>;

    /// Total duration, `None` while the backend has not learned it yet.
    async fn duration(&self) -> Result<Option<Duration>>;

    /// Seek to an absolute position.
    async fn seek(&self, position: Duration) -> Result<()>;

    /// Report end-of-stream or asynchronous failures.
    async fn status(&self) -> Result<BackendStatus> {
        Ok(BackendStatus::Active)
    }

    /// Free OS resources held by the handle. Called after [`stop`](Self::stop).
    async fn release(&self) -> Result<()> {
        Ok(())
    }
}

/// Factory handing out backend handles.
pub trait BackendProvider: Send + Sync {
    /// Whether this host can create a backend of `kind`.
    fn supports(&self, kind: BackendKind) -> bool;

    /// Create a fresh, unloaded backend handle.
    fn create(&self, kind: BackendKind) -> Result<Arc<dyn PlaybackBackend>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_remote_urls() {
        let source = AudioSource::from_locator("https://cdn.example.com/preview.mp3").unwrap();
        assert!(source.is_remote());
    }

    #[test]
    fn parses_data_uri() {
        let source = AudioSource::from_locator("data:audio/mpeg;base64,SUQzBA==").unwrap();
        assert_eq!(
            source,
            AudioSource::DataUri {
                media_type: "audio/mpeg".to_string(),
                base64: true,
                payload: "SUQzBA==".to_string(),
            }
        );
        assert_eq!(source.to_string(), "data:audio/mpeg (8 bytes)");
    }

    #[test]
    fn rejects_data_uri_without_payload() {
        assert!(AudioSource::from_locator("data:audio/mpeg;base64").is_err());
    }

    #[test]
    fn parses_object_url_and_paths() {
        assert!(matches!(
            AudioSource::from_locator("blob:http://localhost/1234").unwrap(),
            AudioSource::ObjectUrl { .. }
        ));

        let file = AudioSource::from_locator("file:///storage/Music/song.mp3").unwrap();
        assert_eq!(
            file,
            AudioSource::LocalPath {
                path: PathBuf::from("/storage/Music/song.mp3")
            }
        );
        assert_eq!(file.to_string(), "song.mp3");

        assert!(AudioSource::from_locator("/sdcard/Music/a.mp3")
            .unwrap()
            .is_local_path());
    }

    #[test]
    fn rejects_empty_locator() {
        assert!(matches!(
            AudioSource::from_locator("   "),
            Err(BridgeError::UnsupportedSource(_))
        ));
    }

    #[test]
    fn backend_kind_display() {
        assert_eq!(BackendKind::Streaming.to_string(), "streaming");
        assert_eq!(BackendKind::Native.to_string(), "native");
    }
}
