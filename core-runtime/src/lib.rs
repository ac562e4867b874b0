//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the video pipeline core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the pipeline, player and
//! service crates depend on. It establishes the logging conventions, the
//! configuration surface and the event broadcasting used throughout the
//! system.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventSeverity, EventStream, PipelineEvent, PlayerEvent};
