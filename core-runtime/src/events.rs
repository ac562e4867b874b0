//! # Event Bus System
//!
//! Application-wide event channel built on `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! The job pipeline and the player bridge both announce what they do on a
//! shared [`EventBus`]. Hosts (UI shells, agent-context layers, loggers)
//! subscribe once and see every transition without holding references to the
//! components themselves.
//!
//! ```text
//! ┌────────────────────┐  emit   ┌───────────┐  subscribe  ┌────────────┐
//! │ PipelineController ├────────>│           ├────────────>│ UI shell   │
//! └────────────────────┘         │ EventBus  │             └────────────┘
//! ┌────────────────────┐  emit   │           │  subscribe  ┌────────────┐
//! │ PlayerBridge       ├────────>│           ├────────────>│ Agent ctx  │
//! └────────────────────┘         └───────────┘             └────────────┘
//! ```
//!
//! Payloads are flat, serializable summaries. Components that need the full
//! typed state (e.g. the pipeline's artifact) expose their own subscription.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PlayerEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus.emit(CoreEvent::Player(PlayerEvent::Ready)).ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event, CoreEvent::Player(PlayerEvent::Ready));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; it can keep reading.
//! - **`RecvError::Closed`**: every sender is gone; treat as shutdown.
//!
//! Emitting with no subscribers returns `Err`, which publishers ignore with `.ok()`.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Job pipeline events
    Pipeline(PipelineEvent),
    /// Player bridge events
    Player(PlayerEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Pipeline(e) => e.description(),
            CoreEvent::Player(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Pipeline(PipelineEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Pipeline(PipelineEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Pipeline(PipelineEvent::Superseded { .. }) => EventSeverity::Warning,
            CoreEvent::Player(PlayerEvent::Ready) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Pipeline Events
// ============================================================================

/// Events emitted by the submit → poll → fetch job pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PipelineEvent {
    /// The controller entered a new phase.
    PhaseChanged {
        /// Monotonic run counter of the controller that emitted the event.
        run_id: u64,
        /// Phase name (`idle`, `submitting`, `polling`, `fetching`, `done`, `error`).
        phase: String,
        /// Backend job id, once known.
        job_id: Option<String>,
    },
    /// The backend reported a new status for the job being polled.
    JobStatusObserved {
        run_id: u64,
        job_id: String,
        /// `queued`, `processing`, `completed` or `failed`.
        status: String,
        /// 1-based poll attempt that observed the status.
        attempt: u32,
    },
    /// The run finished and produced an artifact.
    Completed {
        run_id: u64,
        job_id: String,
        file_name: String,
    },
    /// The run ended with a classified error.
    Failed {
        run_id: u64,
        /// Error class (`validation`, `api`, `protocol`, `job_failure`, `timeout`).
        kind: String,
        /// Human-readable error message.
        message: String,
    },
    /// A newer `start` cancelled this run before it finished.
    Superseded { run_id: u64 },
    /// The run was stopped explicitly (or its owner went away).
    Stopped { run_id: u64 },
}

impl PipelineEvent {
    fn description(&self) -> &str {
        match self {
            PipelineEvent::PhaseChanged { .. } => "Pipeline phase changed",
            PipelineEvent::JobStatusObserved { .. } => "Job status observed",
            PipelineEvent::Completed { .. } => "Pipeline completed",
            PipelineEvent::Failed { .. } => "Pipeline failed",
            PipelineEvent::Superseded { .. } => "Pipeline run superseded",
            PipelineEvent::Stopped { .. } => "Pipeline stopped",
        }
    }
}

// ============================================================================
// Player Events
// ============================================================================

/// Events emitted by the player bridge.
///
/// Positions are carried in milliseconds to keep payloads `Eq`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlayerEvent {
    /// The host player signalled readiness and was attached.
    Ready,
    /// A seek arrived before readiness and was parked.
    SeekDeferred { position_ms: u64, play: bool },
    /// A seek was applied to the live player.
    SeekApplied { position_ms: u64, play: bool },
    /// The parked seek was applied as part of readiness.
    PendingSeekFlushed { position_ms: u64, play: bool },
    /// The player handle was released.
    TornDown,
}

impl PlayerEvent {
    fn description(&self) -> &str {
        match self {
            PlayerEvent::Ready => "Player ready",
            PlayerEvent::SeekDeferred { .. } => "Seek deferred until player is ready",
            PlayerEvent::SeekApplied { .. } => "Seek applied",
            PlayerEvent::PendingSeekFlushed { .. } => "Pending seek flushed",
            PlayerEvent::TornDown => "Player torn down",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    ///   When a subscriber falls behind by more than this amount, it will
    ///   receive a `RecvError::Lagged` error.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// Returns an error if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let player_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Player(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events that match `predicate` will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn phase(run_id: u64, phase: &str) -> CoreEvent {
        CoreEvent::Pipeline(PipelineEvent::PhaseChanged {
            run_id,
            phase: phase.to_string(),
            job_id: None,
        })
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);

        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(phase(1, "submitting")).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Pipeline(PipelineEvent::Completed {
            run_id: 1,
            job_id: "42".to_string(),
            file_name: "42.mp4".to_string(),
        });

        assert_eq!(bus.emit(event.clone()).unwrap(), 2);
        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Player(_)));

        bus.emit(phase(1, "polling")).ok();

        let player_event = CoreEvent::Player(PlayerEvent::SeekApplied {
            position_ms: 30_000,
            play: true,
        });
        bus.emit(player_event.clone()).ok();

        assert_eq!(stream.recv().await.unwrap(), player_event);
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for run_id in 0..5 {
            bus.emit(phase(run_id, "submitting")).ok();
        }

        let result = sub.recv().await;
        assert!(matches!(result, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity() {
        let failed = CoreEvent::Pipeline(PipelineEvent::Failed {
            run_id: 3,
            kind: "timeout".to_string(),
            message: "gave up".to_string(),
        });
        assert_eq!(failed.severity(), EventSeverity::Error);

        let superseded = CoreEvent::Pipeline(PipelineEvent::Superseded { run_id: 2 });
        assert_eq!(superseded.severity(), EventSeverity::Warning);

        assert_eq!(
            CoreEvent::Player(PlayerEvent::Ready).severity(),
            EventSeverity::Info
        );
        assert_eq!(phase(1, "polling").severity(), EventSeverity::Debug);
    }

    #[test]
    fn test_event_description() {
        assert_eq!(
            CoreEvent::Player(PlayerEvent::TornDown).description(),
            "Player torn down"
        );
        assert_eq!(phase(1, "done").description(), "Pipeline phase changed");
    }

    #[test]
    fn test_event_serialization() {
        let event = CoreEvent::Pipeline(PipelineEvent::JobStatusObserved {
            run_id: 7,
            job_id: "job-123".to_string(),
            status: "processing".to_string(),
            attempt: 2,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("job-123"));
        assert!(json.contains(r#""type":"Pipeline""#));

        let deserialized: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[tokio::test]
    async fn test_try_recv() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());
        assert!(stream.try_recv().is_none());

        bus.emit(CoreEvent::Player(PlayerEvent::Ready)).ok();

        let received = stream.try_recv().unwrap().unwrap();
        assert_eq!(received, CoreEvent::Player(PlayerEvent::Ready));
    }
}
