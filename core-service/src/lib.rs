//! Core service façade and bootstrap helpers.
//!
//! [`CoreService`] wires a [`CoreConfig`] into the job pipeline, the player
//! bridge and the time-sync loop behind one handle. Hosts drive it from their
//! UI layer: text input goes to [`CoreService::start_pipeline`], the player
//! widget reports readiness through [`CoreService::player_ready`], and both
//! UI controls and agent tool calls seek through the same bridge.
//!
//! Desktop apps typically keep the `desktop-shims` feature enabled so the
//! configuration falls back to the reqwest-backed HTTP client.
//!
//! ```no_run
//! # async fn example() -> core_service::Result<()> {
//! use core_service::CoreService;
//!
//! let core = CoreService::from_env()?;
//! let run = core.start_pipeline("https://youtu.be/dQw4w9WgXcQ")?;
//! if let Some(state) = run.wait().await {
//!     println!("pipeline finished in phase {}", state.phase.as_str());
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;

pub use error::{CoreError, Result};

pub use core_pipeline::{PipelineController, PipelineState, RunHandle};
pub use core_player::{PlayerBridge, SeekOutcome, TimeSyncLoop};
pub use core_runtime::{CoreConfig, CoreEvent, EventBus, EventStream};

use bridge_traits::MediaPlayer;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

/// Primary façade exposed to host applications.
///
/// Dropping the service cancels any pipeline run in flight and stops the
/// time-sync loop.
pub struct CoreService {
    event_bus: EventBus,
    pipeline: PipelineController,
    player: Arc<PlayerBridge>,
    time_sync: Mutex<Option<TimeSyncLoop>>,
    time_sync_interval: Duration,
}

impl CoreService {
    /// Create a new service from a validated configuration.
    pub fn new(config: CoreConfig) -> Self {
        let event_bus = EventBus::new(config.event_buffer_size);
        let pipeline = PipelineController::from_config(&config, event_bus.clone());
        let player = Arc::new(PlayerBridge::new(event_bus.clone()));

        info!(config = ?config, "Core service initialized");

        Self {
            event_bus,
            pipeline,
            player,
            time_sync: Mutex::new(None),
            time_sync_interval: config.time_sync_interval,
        }
    }

    /// Build the configuration from the process environment (and `.env`).
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(CoreConfig::from_env()?))
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Subscribe to the flat lifecycle events of both subsystems.
    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    // ---------------------------------------------------------------------
    // Pipeline
    // ---------------------------------------------------------------------

    /// Start a pipeline run for user input, superseding any run in flight.
    pub fn start_pipeline(&self, input: &str) -> Result<RunHandle> {
        Ok(self.pipeline.start(input)?)
    }

    /// Stop the active run, returning the pipeline to idle.
    pub fn stop_pipeline(&self) {
        self.pipeline.stop();
    }

    pub fn pipeline_state(&self) -> PipelineState {
        self.pipeline.state()
    }

    /// Receive every published pipeline state snapshot.
    pub fn subscribe_pipeline(&self) -> broadcast::Receiver<PipelineState> {
        self.pipeline.subscribe()
    }

    pub fn pipeline(&self) -> &PipelineController {
        &self.pipeline
    }

    // ---------------------------------------------------------------------
    // Player
    // ---------------------------------------------------------------------

    /// Report that the host player finished loading.
    ///
    /// Flushes any pending seek and starts the time-sync loop if it is not
    /// already running. Must be called from within a Tokio runtime.
    pub fn player_ready(&self, player: &Arc<dyn MediaPlayer>) -> Result<()> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(CoreError::InitializationFailed(
                "player_ready requires a Tokio runtime".to_string(),
            ));
        }

        self.player.on_ready(player)?;

        let mut time_sync = self.time_sync.lock();
        if !time_sync.as_ref().is_some_and(TimeSyncLoop::is_running) {
            *time_sync = Some(TimeSyncLoop::spawn(
                Arc::clone(&self.player),
                self.time_sync_interval,
            ));
        }

        Ok(())
    }

    /// Report that the host player went away.
    pub async fn player_teardown(&self) {
        self.player.teardown();

        let time_sync = self.time_sync.lock().take();
        if let Some(time_sync) = time_sync {
            time_sync.stop().await;
        }
        debug!("Player detached from core service");
    }

    /// Seek from a direct UI control.
    pub fn seek(&self, seconds: f64, play: bool) -> Result<SeekOutcome> {
        Ok(self.player.seek(seconds, play)?)
    }

    /// Dispatch an agent tool call (`setTime` or `seekYoutube`).
    pub fn handle_tool_call(&self, name: &str, args: Value) -> Result<SeekOutcome> {
        Ok(self.player.handle_tool_call(name, args)?)
    }

    /// Tool definitions to register with an agent framework.
    pub fn tool_definitions(&self) -> Vec<Value> {
        core_player::tool_definitions()
    }

    /// Watch the shared current playback time in seconds.
    pub fn current_time(&self) -> watch::Receiver<f64> {
        self.player.subscribe_time()
    }

    pub fn player(&self) -> &Arc<PlayerBridge> {
        &self.player
    }
}
