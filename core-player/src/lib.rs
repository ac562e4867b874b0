//! # Player Time Bridge
//!
//! Lets the UI and an assistant agent read and set the playback position of
//! a host-owned video player whose readiness is asynchronous.
//!
//! ## Overview
//!
//! - [`PlayerBridge`] holds a weak [`PlayerHandle`], parks one
//!   [`PendingSeek`] until the player is ready and applies seeks afterwards
//! - [`AgentTool`] (`setTime`, `seekYoutube`) funnels agent tool calls into
//!   the same seek path as the UI
//! - [`TimeSyncLoop`] samples the playhead at a fixed cadence and
//!   republishes it as shared current-time state

pub mod bridge;
pub mod error;
pub mod time_sync;
pub mod tool;

pub use bridge::{PendingSeek, PlayerBridge, PlayerHandle, SeekOutcome};
pub use error::{PlayerError, Result};
pub use time_sync::TimeSyncLoop;
pub use tool::{tool_definitions, AgentTool, SeekToolArgs};
