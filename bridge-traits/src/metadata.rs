//! File and tag metadata contract.
//!
//! Picking a file, resolving it to a playable locator, and reading embedded
//! tags are host concerns. The reader returns whatever it managed to extract;
//! the library fills in defaults for anything missing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Best-effort tags extracted from an audio file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    /// Artwork locator (object URL, data URI, or path).
    pub image: Option<String>,
}

/// Reads embedded tags for a locally resolvable locator.
#[async_trait]
pub trait MetadataReader: Send + Sync {
    /// Extract tags from the file behind `locator`.
    async fn read_metadata(&self, locator: &str) -> Result<TrackMetadata>;
}
