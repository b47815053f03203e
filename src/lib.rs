//! Mixtape music core.
//!
//! Host applications depend on this crate and enable the documented features
//! (`desktop-shims`, `audio-output`) instead of wiring each workspace crate.
//! Everything is re-exported from `core-service`.

pub use core_service::*;
