//! # Event Bus System
//!
//! The library and the playback engine announce what they did on a single
//! `tokio::sync::broadcast` channel. Shells subscribe to show notices such as
//! "track removed" or "playback failed" instead of polling state.
//!
//! ```text
//!  LibraryManager ──┐                 ┌──> UI shell
//!                   ├──> EventBus ────┤
//!  PlaybackEngine ──┘                 └──> logger
//! ```
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::default();
//! let mut stream = bus.subscribe();
//!
//! let _ = bus.emit(CoreEvent::Playback(PlaybackEvent::Stopped {
//!     file_url: "https://cdn.example.com/preview.mp3".to_string(),
//! }));
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.description(), "Playback stopped");
//! # }
//! ```
//!
//! A slow subscriber gets `RecvError::Lagged(n)` and then continues with newer
//! events. `RecvError::Closed` means every bus handle was dropped. Emitting
//! while nobody listens returns `Err`, which publishers ignore.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast::{self, error::TryRecvError};

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Events buffered per subscriber when no size is configured.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Everything published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Library(LibraryEvent),
    Playback(PlaybackEvent),
}

/// Collection changes. Collections are named by storage key
/// (`uploadedTracks`, `playlist`, `albums`, `currentTrack`, `searchHistory`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    TrackAdded {
        collection: String,
        file_url: String,
        title: String,
    },
    /// Lists every collection that held the track.
    TrackRemoved {
        file_url: String,
        collections: Vec<String>,
    },
    AlbumCreated {
        name: String,
    },
    AlbumRenamed {
        old_name: String,
        new_name: String,
    },
    AlbumDeleted {
        name: String,
    },
    /// The write failed but the in-memory change stays.
    PersistenceFailed {
        collection: String,
        message: String,
    },
    /// Previously pending collections reached the store.
    Flushed {
        collections: Vec<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    Started {
        file_url: String,
        title: String,
        /// "streaming" or "native"
        backend: String,
    },
    Paused {
        file_url: String,
        position_ms: u64,
    },
    Resumed {
        file_url: String,
        position_ms: u64,
    },
    Stopped {
        file_url: String,
    },
    /// Reached the end of the source.
    Completed {
        file_url: String,
    },
    /// First positive duration reported by the backend.
    DurationKnown {
        file_url: String,
        duration_ms: u64,
    },
    /// The session ended because the backend failed.
    Error {
        file_url: Option<String>,
        message: String,
        /// Failed sessions are never retried, so this is `false`.
        recoverable: bool,
    },
}

/// Ordering used to decide what reaches the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

impl CoreEvent {
    /// Short human-readable label.
    pub fn description(&self) -> &'static str {
        use LibraryEvent as L;
        use PlaybackEvent as P;

        match self {
            CoreEvent::Library(event) => match event {
                L::TrackAdded { .. } => "Track added",
                L::TrackRemoved { .. } => "Track removed",
                L::AlbumCreated { .. } => "Album created",
                L::AlbumRenamed { .. } => "Album renamed",
                L::AlbumDeleted { .. } => "Album deleted",
                L::PersistenceFailed { .. } => "Library changes not saved",
                L::Flushed { .. } => "Library changes saved",
            },
            CoreEvent::Playback(event) => match event {
                P::Started { .. } => "Playback started",
                P::Paused { .. } => "Playback paused",
                P::Resumed { .. } => "Playback resumed",
                P::Stopped { .. } => "Playback stopped",
                P::Completed { .. } => "Track completed",
                P::DurationKnown { .. } => "Track duration known",
                P::Error { .. } => "Playback error",
            },
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Library(LibraryEvent::PersistenceFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::Started { .. } | PlaybackEvent::Completed { .. })
            | CoreEvent::Library(LibraryEvent::TrackRemoved { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// Warnings and errors, which a shell shows as dismissible notices.
    pub fn is_user_notice(&self) -> bool {
        self.severity() >= EventSeverity::Warning
    }
}

impl fmt::Display for CoreEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Cloneable handle to the broadcast channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            sender: broadcast::channel(capacity).0,
        }
    }

    /// Returns how many subscribers got the event.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// New subscribers only see events emitted after this call.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventBus({} subscribers)", self.subscriber_count())
    }
}

type Predicate = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Subscriber that skips events rejected by a predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::default();
/// let notices = EventStream::new(bus.subscribe()).filter(CoreEvent::is_user_notice);
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    predicate: Option<Predicate>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            predicate: None,
        }
    }

    /// Replaces any earlier predicate.
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Some(Box::new(predicate)),
            ..self
        }
    }

    fn wants(&self, event: &CoreEvent) -> bool {
        match &self.predicate {
            Some(predicate) => predicate(event),
            None => true,
        }
    }

    /// Waits for the next accepted event.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.wants(&event) {
                break Ok(event);
            }
        }
    }

    /// `None` once the queued events are exhausted.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            let event = match self.receiver.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Lagged(missed)) => return Some(Err(RecvError::Lagged(missed))),
                Err(TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            };
            if self.wants(&event) {
                return Some(Ok(event));
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("filtered", &self.predicate.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stopped(url: &str) -> CoreEvent {
        CoreEvent::Playback(PlaybackEvent::Stopped {
            file_url: url.to_string(),
        })
    }

    fn decode_failure(url: &str) -> CoreEvent {
        CoreEvent::Playback(PlaybackEvent::Error {
            file_url: Some(url.to_string()),
            message: "decode failed".to_string(),
            recoverable: false,
        })
    }

    #[test]
    fn test_emit_without_listeners_is_an_error() {
        let bus = EventBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        assert!(bus.emit(stopped("a")).is_err());
    }

    #[tokio::test]
    async fn test_every_subscriber_sees_the_event() {
        let bus = EventBus::new(4);
        let mut shell = bus.subscribe();
        let mut logger = bus.clone().subscribe();

        let created = CoreEvent::Library(LibraryEvent::AlbumCreated {
            name: "Road Trip".to_string(),
        });
        assert_eq!(bus.emit(created.clone()).unwrap(), 2);

        assert_eq!(shell.recv().await.unwrap(), created);
        assert_eq!(logger.recv().await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_filtered_stream_only_yields_notices() {
        let bus = EventBus::new(8);
        let mut notices = EventStream::new(bus.subscribe()).filter(CoreEvent::is_user_notice);

        let _ = bus.emit(stopped("a"));
        let _ = bus.emit(decode_failure("a"));
        let _ = bus.emit(stopped("b"));

        assert_eq!(notices.recv().await.unwrap(), decode_failure("a"));
        assert!(notices.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags() {
        let bus = EventBus::new(2);
        let mut stream = EventStream::new(bus.subscribe());

        for n in 0..5 {
            let _ = bus.emit(stopped(&format!("track-{}", n)));
        }

        assert!(matches!(stream.try_recv(), Some(Err(RecvError::Lagged(3)))));
        assert_eq!(stream.recv().await.unwrap(), stopped("track-3"));
    }

    #[test]
    fn test_severity_and_notices() {
        let unsaved = CoreEvent::Library(LibraryEvent::PersistenceFailed {
            collection: "playlist".to_string(),
            message: "disk full".to_string(),
        });
        assert_eq!(unsaved.severity(), EventSeverity::Warning);
        assert!(unsaved.is_user_notice());
        assert_eq!(unsaved.to_string(), "Library changes not saved");

        let started = CoreEvent::Playback(PlaybackEvent::Started {
            file_url: "a".to_string(),
            title: "Song".to_string(),
            backend: "streaming".to_string(),
        });
        assert_eq!(started.severity(), EventSeverity::Info);
        assert!(!started.is_user_notice());

        assert_eq!(decode_failure("a").severity(), EventSeverity::Error);
        assert_eq!(stopped("a").severity(), EventSeverity::Debug);
    }

    #[test]
    fn test_json_shape() {
        let removed = CoreEvent::Library(LibraryEvent::TrackRemoved {
            file_url: "blob:abc".to_string(),
            collections: vec!["uploadedTracks".to_string(), "playlist".to_string()],
        });

        let json = serde_json::to_value(&removed).unwrap();
        assert_eq!(json["type"], "Library");
        assert_eq!(json["payload"]["event"], "TrackRemoved");
        assert_eq!(json["payload"]["collections"][1], "playlist");

        let back: CoreEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, removed);
    }
}
