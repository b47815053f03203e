//! Remote catalogue search contract.
//!
//! The core does not talk to any catalogue API itself. Hosts plug in a
//! provider that handles its own authentication and returns normalised
//! results; entries without a preview clip cannot be played.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Catalogue identifier. Deezer hands out numbers, Spotify base62 strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CatalogId {
    Numeric(u64),
    Text(String),
}

impl From<u64> for CatalogId {
    fn from(id: u64) -> Self {
        CatalogId::Numeric(id)
    }
}

impl From<&str> for CatalogId {
    fn from(id: &str) -> Self {
        CatalogId::Text(id.to_string())
    }
}

impl From<String> for CatalogId {
    fn from(id: String) -> Self {
        CatalogId::Text(id)
    }
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogId::Numeric(id) => write!(f, "{}", id),
            CatalogId::Text(id) => f.write_str(id),
        }
    }
}

/// Artist part of a search result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteArtist {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CatalogId>,
}

/// Album part of a search result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAlbum {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CatalogId>,
}

/// A single track returned by a catalogue search.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTrackResult {
    pub title: String,
    pub artist: RemoteArtist,
    pub album: RemoteAlbum,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
}

impl RemoteTrackResult {
    /// Whether the result carries a non-blank preview clip.
    pub fn has_preview(&self) -> bool {
        self.preview_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }
}

/// Keep only results that can actually be played.
pub fn playable_results(results: Vec<RemoteTrackResult>) -> Vec<RemoteTrackResult> {
    results.into_iter().filter(|r| r.has_preview()).collect()
}

/// Catalogue search provider implemented by the host.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Search the catalogue for `query`.
    async fn search_tracks(&self, query: &str) -> Result<Vec<RemoteTrackResult>>;
}
