//! # Playback Module
//!
//! Unified playback engine over the host's native audio backends.
//!
//! ## Overview
//!
//! This module handles:
//! - Backend selection from platform capabilities
//! - Session lifecycle (load, transport, teardown)
//! - Progress polling published through watch channels
//! - Stopping playback on behalf of the library when the playing track is deleted

pub mod config;
pub mod engine;
pub mod error;
mod poller;
pub mod selector;
pub mod session;

pub use config::EngineConfig;
pub use engine::PlaybackEngine;
pub use error::{PlaybackError, Result};
pub use selector::BackendSelector;
pub use session::{PlaybackState, PlaybackStatus, Progress};
