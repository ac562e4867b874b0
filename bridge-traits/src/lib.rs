//! # Host Bridge Traits
//!
//! Capability traits the host application implements so the core can reach
//! the outside world.
//!
//! ## Overview
//!
//! The core never talks to the network or to a live media player directly.
//! It goes through the contracts defined here, which keeps the pipeline and
//! player state machines testable with in-memory fakes.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async JSON-over-HTTP calls to the processing backend
//! - [`MediaPlayer`](player::MediaPlayer) - Seek/play/pause/position on the host's live player
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ HttpClient |
//! | Web      | host-provided       | 📋 Planned |
//!
//! `MediaPlayer` is always host-provided: the player widget lives in the UI
//! layer.
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it and keep messages actionable.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so handles can be shared across
//! async tasks behind an `Arc`.

pub mod error;
pub mod http;
pub mod player;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use player::MediaPlayer;
pub use time::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
