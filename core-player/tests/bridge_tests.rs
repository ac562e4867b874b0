//! Behaviour of the player bridge against a recording fake player.

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::MediaPlayer;
use core_player::{PlayerBridge, SeekOutcome, TimeSyncLoop};
use core_runtime::events::EventBus;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Seek(f64),
    Play,
    Pause,
}

#[derive(Default)]
struct RecordingPlayer {
    calls: Mutex<Vec<Call>>,
    position: Mutex<f64>,
}

impl RecordingPlayer {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl MediaPlayer for RecordingPlayer {
    fn seek_to(&self, seconds: f64) -> BridgeResult<()> {
        *self.position.lock().unwrap() = seconds;
        self.calls.lock().unwrap().push(Call::Seek(seconds));
        Ok(())
    }

    fn play(&self) -> BridgeResult<()> {
        self.calls.lock().unwrap().push(Call::Play);
        Ok(())
    }

    fn pause(&self) -> BridgeResult<()> {
        self.calls.lock().unwrap().push(Call::Pause);
        Ok(())
    }

    fn current_time(&self) -> BridgeResult<f64> {
        Ok(*self.position.lock().unwrap())
    }
}

fn attach(bridge: &PlayerBridge) -> Arc<RecordingPlayer> {
    let recorder = Arc::new(RecordingPlayer::default());
    let player: Arc<dyn MediaPlayer> = recorder.clone();
    bridge.on_ready(&player).unwrap();
    recorder
}

#[test]
fn test_direct_and_agent_paths_issue_identical_commands() {
    let direct = PlayerBridge::new(EventBus::default());
    let agent = PlayerBridge::new(EventBus::default());
    let direct_player = attach(&direct);
    let agent_player = attach(&agent);

    direct.seek(95.0, true).unwrap();
    agent
        .handle_tool_call("setTime", json!({"seconds": 95.0, "play": true}))
        .unwrap();

    assert_eq!(direct_player.calls(), agent_player.calls());
    assert_eq!(
        direct_player.calls(),
        vec![Call::Pause, Call::Seek(95.0), Call::Play]
    );
}

#[test]
fn test_ready_flushes_pending_before_later_seeks() {
    let bridge = PlayerBridge::new(EventBus::default());

    assert_eq!(bridge.seek(5.0, false).unwrap(), SeekOutcome::Deferred);
    assert_eq!(
        bridge
            .handle_tool_call("seekYoutube", json!({"seconds": 60}))
            .unwrap(),
        SeekOutcome::Deferred
    );

    let player = attach(&bridge);
    assert_eq!(bridge.seek(61.0, false).unwrap(), SeekOutcome::Applied);

    // A second readiness signal finds nothing left to flush.
    let again: Arc<dyn MediaPlayer> = player.clone();
    bridge.on_ready(&again).unwrap();

    assert_eq!(
        player.calls(),
        vec![Call::Pause, Call::Seek(60.0), Call::Seek(61.0), Call::Pause]
    );
}

#[test]
fn test_concurrent_seeks_before_ready_keep_one_pending() {
    let bridge = Arc::new(PlayerBridge::new(EventBus::default()));

    let handles: Vec<_> = (1..=8)
        .map(|i| {
            let bridge = Arc::clone(&bridge);
            std::thread::spawn(move || bridge.seek(i as f64, false).unwrap())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), SeekOutcome::Deferred);
    }

    let pending = bridge.pending_seek().unwrap();
    let player = attach(&bridge);

    let calls = player.calls();
    assert_eq!(calls, vec![Call::Pause, Call::Seek(pending.seconds)]);
    assert!(bridge.pending_seek().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_time_sync_tracks_applied_seeks() {
    let bridge = Arc::new(PlayerBridge::new(EventBus::default()));
    let player = attach(&bridge);
    let mut time = bridge.subscribe_time();

    let sync = TimeSyncLoop::spawn(Arc::clone(&bridge), Duration::from_millis(500));

    bridge.seek(42.0, false).unwrap();
    assert_eq!(*time.borrow_and_update(), 42.0);

    // The player moves on by itself; the loop picks it up.
    *player.position.lock().unwrap() = 44.5;
    time.changed().await.unwrap();
    assert_eq!(*time.borrow(), 44.5);

    sync.stop().await;
}
