//! Host lifecycle and hardware-button handling.

use crate::MusicCore;
use bridge_traits::lifecycle::LifecycleChangeStream;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// What the host should do after the back button was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackAction {
    /// Playback was paused; stay in the app.
    Paused,
    /// Nothing was playing; the host may exit.
    Exit,
}

/// Forward lifecycle transitions from `stream` to `core` until the stream closes.
pub(crate) fn spawn_lifecycle_watcher(
    core: MusicCore,
    mut stream: Box<dyn LifecycleChangeStream>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(state) = stream.next().await {
            if let Err(e) = core.handle_lifecycle(state).await {
                warn!(?state, error = %e, "Failed to apply lifecycle transition");
            }
        }
        debug!("Lifecycle stream closed");
    })
}
