//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the music core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the library and playback
//! crates depend on. It establishes the logging conventions, configuration
//! validation, and event broadcasting used throughout the system.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
