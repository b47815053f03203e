//! Persistent library storage abstraction.
//!
//! The library is persisted as a handful of JSON documents under fixed keys.
//! Hosts back this with whatever durable key-value store they have:
//! - Desktop: SQLite table (see `bridge-desktop`)
//! - iOS/Android: app sandbox storage or a native KV plugin
//! - Web: IndexedDB / localStorage

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Asynchronous key-value store holding the library collections.
///
/// Absent keys return `Ok(None)`. A value written with [`set`](Self::set)
/// must read back structurally equal.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::LibraryStore;
///
/// async fn reset_playlist(store: &dyn LibraryStore) -> Result<()> {
///     store.set("playlist", serde_json::json!([])).await
/// }
/// ```
#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// Read the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Replace the value stored under `key`.
    async fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// Typed read helper: decode the stored JSON into `T`.
pub async fn get_typed<T>(store: &dyn LibraryStore, key: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
{
    match store.get(key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Typed write helper: encode `value` as JSON and store it.
pub async fn set_typed<T>(store: &dyn LibraryStore, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_value(value)?;
    store.set(key, json).await
}
