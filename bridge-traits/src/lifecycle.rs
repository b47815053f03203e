//! Application lifecycle notifications.

use async_trait::async_trait;

use crate::error::Result;

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Application is in the foreground and active
    Foreground,
    /// Application is in the background
    Background,
    /// Application is being suspended
    Suspended,
}

impl LifecycleState {
    /// Whether the UI is no longer visible to the user.
    pub fn is_hidden(&self) -> bool {
        !matches!(self, LifecycleState::Foreground)
    }
}

/// Lifecycle observer trait
///
/// Notifies the core about app lifecycle transitions so it can pause playback
/// when the host leaves the foreground.
///
/// # Platform Support
///
/// - **iOS**: UIApplication lifecycle notifications
/// - **Android**: Activity/Application lifecycle callbacks
/// - **Desktop**: Window focus/minimize events (less critical)
/// - **Web**: Page Visibility API
#[async_trait]
pub trait LifecycleObserver: Send + Sync {
    /// Get current lifecycle state
    async fn get_state(&self) -> Result<LifecycleState>;

    /// Subscribe to lifecycle state changes
    async fn subscribe_changes(&self) -> Result<Box<dyn LifecycleChangeStream>>;
}

/// Stream of lifecycle state changes
#[async_trait]
pub trait LifecycleChangeStream: Send {
    /// Get the next lifecycle state update
    ///
    /// Returns `None` when the stream is closed.
    async fn next(&mut self) -> Option<LifecycleState>;
}
