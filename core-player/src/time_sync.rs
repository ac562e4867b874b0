//! Periodic sampling of the player's playhead into the shared current-time
//! state.

use crate::bridge::PlayerBridge;
use core_runtime::config::DEFAULT_TIME_SYNC_INTERVAL;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Background loop republishing the player position at a fixed cadence.
///
/// The loop only reads from the player. It idles while the bridge has no
/// live player and exits on [`stop`](TimeSyncLoop::stop) or drop.
pub struct TimeSyncLoop {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl TimeSyncLoop {
    /// Spawn with the default 500ms cadence.
    pub fn spawn_default(bridge: Arc<PlayerBridge>) -> Self {
        Self::spawn(bridge, DEFAULT_TIME_SYNC_INTERVAL)
    }

    /// Spawn the loop. Must be called from within a Tokio runtime.
    pub fn spawn(bridge: Arc<PlayerBridge>, period: Duration) -> Self {
        let token = CancellationToken::new();
        let period = period.max(Duration::from_millis(1));
        let task = tokio::spawn(run(bridge, period, token.clone()));

        debug!(period_ms = period.as_millis() as u64, "Time sync loop started");

        Self {
            token,
            task: Some(task),
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the loop and wait for it to exit.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        debug!("Time sync loop stopped");
    }
}

impl Drop for TimeSyncLoop {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run(bridge: Arc<PlayerBridge>, period: Duration, token: CancellationToken) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => sample(&bridge),
        }
    }
}

fn sample(bridge: &PlayerBridge) {
    let Some(player) = bridge.player() else {
        return;
    };

    match player.current_time() {
        Ok(seconds) if seconds.is_finite() && seconds >= 0.0 => bridge.publish_time(seconds),
        Ok(seconds) => trace!(seconds, "Skipping non-finite player time"),
        Err(e) => trace!(error = %e, "Player time unavailable"),
    }
}
