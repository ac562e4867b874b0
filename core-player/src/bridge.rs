//! # Player Bridge
//!
//! Owns the reference to the host's live player and serialises every
//! playback command against its asynchronous readiness.
//!
//! ## State Machine
//!
//! ```text
//!             on_ready(player)
//!  NotReady ───────────────────> Ready
//!     ↑  issue_seek: park         │  issue_seek: apply
//!     └───────── teardown() ──────┘
//! ```
//!
//! While not ready, at most one [`PendingSeek`] is kept (last write wins).
//! `on_ready` pauses the player and flushes that seek before releasing the
//! lock, so no direct call can overtake it.

use crate::error::Result;
use bridge_traits::MediaPlayer;
use core_runtime::events::{CoreEvent, EventBus, PlayerEvent};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Non-owning reference to the host player.
#[derive(Clone)]
pub struct PlayerHandle(Weak<dyn MediaPlayer>);

impl PlayerHandle {
    pub fn new(player: &Arc<dyn MediaPlayer>) -> Self {
        Self(Arc::downgrade(player))
    }

    /// The player, unless the host already dropped it.
    pub fn upgrade(&self) -> Option<Arc<dyn MediaPlayer>> {
        self.0.upgrade()
    }
}

impl std::fmt::Debug for PlayerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerHandle")
            .field("alive", &(self.0.strong_count() > 0))
            .finish()
    }
}

/// Seek parked until the player is ready.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingSeek {
    pub seconds: f64,
    pub play: bool,
}

/// What `issue_seek` did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeekOutcome {
    /// Position was not a finite, non-negative number.
    Ignored,
    /// Player not ready; stored as the pending seek.
    Deferred,
    /// Applied to the live player.
    Applied,
}

#[derive(Default)]
struct BridgeState {
    ready: bool,
    handle: Option<PlayerHandle>,
    pending: Option<PendingSeek>,
}

/// Single writer of the player reference and of the shared current time.
pub struct PlayerBridge {
    state: Mutex<BridgeState>,
    event_bus: EventBus,
    current_time: watch::Sender<f64>,
}

fn position_ms(seconds: f64) -> u64 {
    (seconds * 1000.0).round() as u64
}

impl PlayerBridge {
    pub fn new(event_bus: EventBus) -> Self {
        let (current_time, _) = watch::channel(0.0);
        Self {
            state: Mutex::new(BridgeState::default()),
            event_bus,
            current_time,
        }
    }

    /// Direct UI seek.
    pub fn seek(&self, seconds: f64, play: bool) -> Result<SeekOutcome> {
        self.issue_seek(seconds, play)
    }

    /// Move the playhead, or park the request until the player is ready.
    ///
    /// Non-finite or negative positions are ignored.
    pub fn issue_seek(&self, seconds: f64, play: bool) -> Result<SeekOutcome> {
        if !seconds.is_finite() || seconds < 0.0 {
            warn!(seconds, "Ignoring seek to invalid position");
            return Ok(SeekOutcome::Ignored);
        }

        let mut state = self.state.lock();

        let player = match Self::live_player(&mut state) {
            Some(player) => player,
            None => {
                if let Some(previous) = state.pending.replace(PendingSeek { seconds, play }) {
                    debug!(previous = previous.seconds, "Replacing pending seek");
                }
                debug!(seconds, play, "Player not ready, deferring seek");
                self.emit(PlayerEvent::SeekDeferred {
                    position_ms: position_ms(seconds),
                    play,
                });
                return Ok(SeekOutcome::Deferred);
            }
        };

        self.apply(player.as_ref(), seconds, play)?;
        self.emit(PlayerEvent::SeekApplied {
            position_ms: position_ms(seconds),
            play,
        });
        Ok(SeekOutcome::Applied)
    }

    /// Attach the host player once it reports readiness.
    ///
    /// Pauses the player and flushes the pending seek, if any, before any
    /// other command can reach it.
    pub fn on_ready(&self, player: &Arc<dyn MediaPlayer>) -> Result<()> {
        let mut state = self.state.lock();
        state.handle = Some(PlayerHandle::new(player));
        state.ready = true;

        if let Err(e) = player.pause() {
            warn!(error = %e, "Failed to pause player on ready");
        }

        info!(pending = state.pending.is_some(), "Player ready");
        self.emit(PlayerEvent::Ready);

        if let Some(pending) = state.pending.take() {
            self.apply(player.as_ref(), pending.seconds, pending.play)?;
            self.emit(PlayerEvent::PendingSeekFlushed {
                position_ms: position_ms(pending.seconds),
                play: pending.play,
            });
        }

        Ok(())
    }

    /// Release the player reference and drop any pending seek.
    pub fn teardown(&self) {
        let mut state = self.state.lock();
        let was_attached = state.handle.take().is_some();
        state.ready = false;
        state.pending = None;
        drop(state);

        if was_attached {
            info!("Player torn down");
        }
        self.emit(PlayerEvent::TornDown);
    }

    pub fn is_ready(&self) -> bool {
        let mut state = self.state.lock();
        Self::live_player(&mut state).is_some()
    }

    pub fn pending_seek(&self) -> Option<PendingSeek> {
        self.state.lock().pending
    }

    /// The live player, when ready and still alive.
    pub fn player(&self) -> Option<Arc<dyn MediaPlayer>> {
        let mut state = self.state.lock();
        Self::live_player(&mut state)
    }

    /// Last published playhead position in seconds.
    pub fn current_time(&self) -> f64 {
        *self.current_time.borrow()
    }

    /// Receiver of the shared current-time state.
    pub fn subscribe_time(&self) -> watch::Receiver<f64> {
        self.current_time.subscribe()
    }

    /// Publish a playhead position; non-finite values are dropped.
    pub fn publish_time(&self, seconds: f64) {
        if !seconds.is_finite() {
            return;
        }
        self.current_time.send_if_modified(|current| {
            if *current == seconds {
                false
            } else {
                *current = seconds;
                true
            }
        });
    }

    fn live_player(state: &mut BridgeState) -> Option<Arc<dyn MediaPlayer>> {
        if !state.ready {
            return None;
        }
        let player = state.handle.as_ref().and_then(PlayerHandle::upgrade);
        if player.is_none() {
            warn!("Player dropped without teardown, waiting for next ready");
            state.ready = false;
            state.handle = None;
        }
        player
    }

    fn apply(&self, player: &dyn MediaPlayer, seconds: f64, play: bool) -> Result<()> {
        player.seek_to(seconds)?;
        if play {
            player.play()?;
        }
        self.publish_time(seconds);
        debug!(seconds, play, "Seek applied");
        Ok(())
    }

    fn emit(&self, event: PlayerEvent) {
        self.event_bus.emit(CoreEvent::Player(event)).ok();
    }
}
