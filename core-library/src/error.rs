use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    /// Index passed by the caller does not address an entry.
    #[error("Index {index} out of range for {collection} (len {len})")]
    IndexOutOfRange {
        collection: String,
        index: usize,
        len: usize,
    },

    #[error("Unknown album: {0}")]
    UnknownAlbum(String),

    /// Store read or write failed. On writes the in-memory change is kept
    /// and the collection stays pending until [`flush`](crate::LibraryManager::flush).
    #[error("Persistence error for {collection}: {message}")]
    Persistence { collection: String, message: String },

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

impl LibraryError {
    /// Returns `true` for contract violations by the caller; nothing was changed.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            LibraryError::IndexOutOfRange { .. } | LibraryError::UnknownAlbum(_)
        )
    }

    /// Returns `true` if the change happened in memory but is not yet durable.
    pub fn is_persistence_error(&self) -> bool {
        matches!(self, LibraryError::Persistence { .. })
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;
