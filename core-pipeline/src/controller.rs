//! # Pipeline Controller
//!
//! Orchestrates resolve → submit → poll → fetch as one cancellable,
//! restartable run and publishes every transition.
//!
//! ## Overview
//!
//! The controller is the only stateful piece of the pipeline. It keeps the
//! current [`PipelineState`] and a run counter behind one lock; a background
//! task drives the stages and may only publish while its run is still the
//! current one. That check happens under the same lock as every publish, so
//! a superseded or stopped run can never leak a late result.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_pipeline::PipelineController;
//!
//! let controller = PipelineController::from_config(&config, event_bus);
//! let mut states = controller.subscribe();
//!
//! let run = controller.start("https://youtu.be/dQw4w9WgXcQ")?;
//! if let Some(final_state) = run.wait().await {
//!     println!("{:?}", final_state.result);
//! }
//! ```

use crate::api::Backend;
use crate::error::{PipelineError, Result};
use crate::fetcher::ResultFetcher;
use crate::models::{Job, PipelineState};
use crate::poller::{PollPolicy, StatusPoller};
use crate::resolver::{self, VideoReference};
use crate::submitter::JobSubmitter;
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, PipelineEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Run bookkeeping guarded by a single lock.
struct RunSlot {
    /// Id of the current run; bumped by every `start` and `stop`.
    generation: u64,
    token: Option<CancellationToken>,
    state: PipelineState,
}

struct Inner {
    submitter: JobSubmitter,
    poller: StatusPoller,
    fetcher: ResultFetcher,
    event_bus: EventBus,
    states: broadcast::Sender<PipelineState>,
    slot: Mutex<RunSlot>,
}

/// Completion handle for one run.
#[derive(Debug)]
pub struct RunHandle {
    run_id: u64,
    done: oneshot::Receiver<Option<PipelineState>>,
}

impl RunHandle {
    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    /// Wait for the run to finish.
    ///
    /// Returns the terminal (`done` or `error`) state, or `None` when the
    /// run was superseded or stopped before it finished.
    pub async fn wait(self) -> Option<PipelineState> {
        self.done.await.ok().flatten()
    }
}

/// Orchestrates the job pipeline.
///
/// Dropping the controller cancels the active run.
pub struct PipelineController {
    inner: Arc<Inner>,
}

impl PipelineController {
    pub fn new(backend: Backend, policy: PollPolicy, event_bus: EventBus) -> Self {
        Self::with_capacity(backend, policy, event_bus, core_runtime::events::DEFAULT_EVENT_BUFFER_SIZE)
    }

    pub fn from_config(config: &CoreConfig, event_bus: EventBus) -> Self {
        let backend = Backend::new(Arc::clone(&config.http_client), config.backend_url.clone());
        Self::with_capacity(
            backend,
            PollPolicy::from_config(config),
            event_bus,
            config.event_buffer_size,
        )
    }

    fn with_capacity(
        backend: Backend,
        policy: PollPolicy,
        event_bus: EventBus,
        capacity: usize,
    ) -> Self {
        let (states, _) = broadcast::channel(capacity.max(1));
        let inner = Inner {
            submitter: JobSubmitter::new(backend.clone()),
            poller: StatusPoller::new(backend.clone(), policy),
            fetcher: ResultFetcher::new(backend),
            event_bus,
            states,
            slot: Mutex::new(RunSlot {
                generation: 0,
                token: None,
                state: PipelineState::idle(),
            }),
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    /// Start a new run for `input`, superseding any run in flight.
    ///
    /// Invalid input is published as an `error` state and returned without
    /// any network call. Outside a Tokio runtime the call fails with
    /// [`PipelineError::RuntimeUnavailable`] and leaves the state untouched.
    pub fn start(&self, input: &str) -> Result<RunHandle> {
        let runtime = Handle::try_current().map_err(|_| PipelineError::RuntimeUnavailable)?;
        let resolved = resolver::resolve(input);
        let mut slot = self.inner.slot.lock();

        self.inner.supersede(&mut slot);
        slot.generation += 1;
        let run_id = slot.generation;

        let reference = match resolved {
            Ok(reference) => reference,
            Err(err) => {
                warn!(run_id, error = %err, "Rejected video reference");
                self.inner
                    .publish_locked(&mut slot, PipelineState::failed(None, None, err.clone()));
                self.inner.emit_failed(run_id, &err);
                return Err(err);
            }
        };

        let token = CancellationToken::new();
        slot.token = Some(token.clone());
        self.inner
            .publish_locked(&mut slot, PipelineState::submitting(reference.clone()));
        drop(slot);

        info!(run_id, video_id = %reference.video_id(), "Pipeline run started");

        let (done_tx, done_rx) = oneshot::channel();
        let inner = Arc::clone(&self.inner);
        runtime.spawn(async move {
            let outcome = inner.run(run_id, reference, token).await;
            let _ = done_tx.send(outcome);
        });

        Ok(RunHandle {
            run_id,
            done: done_rx,
        })
    }

    /// Cancel the active run and return to `idle`.
    ///
    /// A controller that is not running (idle, done or error) is left
    /// untouched, so a delivered result stays visible.
    pub fn stop(&self) {
        let mut slot = self.inner.slot.lock();
        if !slot.state.phase.is_working() {
            return;
        }

        if let Some(token) = slot.token.take() {
            token.cancel();
        }
        self.inner
            .event_bus
            .emit(CoreEvent::Pipeline(PipelineEvent::Stopped {
                run_id: slot.generation,
            }))
            .ok();
        info!(run_id = slot.generation, "Pipeline run stopped");

        slot.generation += 1;
        self.inner.publish_locked(&mut slot, PipelineState::idle());
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> PipelineState {
        self.inner.slot.lock().state.clone()
    }

    /// Id of the most recent run (0 before the first `start`).
    pub fn current_run_id(&self) -> u64 {
        self.inner.slot.lock().generation
    }

    /// Subscribe to state snapshots. Past states are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineState> {
        self.inner.states.subscribe()
    }
}

impl Drop for PipelineController {
    fn drop(&mut self) {
        let mut slot = self.inner.slot.lock();
        if let Some(token) = slot.token.take() {
            token.cancel();
            if slot.state.phase.is_working() {
                self.inner
                    .event_bus
                    .emit(CoreEvent::Pipeline(PipelineEvent::Stopped {
                        run_id: slot.generation,
                    }))
                    .ok();
            }
        }
        slot.generation += 1;
    }
}

impl Inner {
    fn supersede(&self, slot: &mut RunSlot) {
        if let Some(token) = slot.token.take() {
            token.cancel();
            if slot.state.phase.is_working() {
                debug!(run_id = slot.generation, "Superseding pipeline run");
                self.event_bus
                    .emit(CoreEvent::Pipeline(PipelineEvent::Superseded {
                        run_id: slot.generation,
                    }))
                    .ok();
            }
        }
    }

    /// Store and broadcast `state`; the caller holds the lock.
    fn publish_locked(&self, slot: &mut RunSlot, state: PipelineState) {
        let phase_changed = slot.state.phase != state.phase;
        slot.state = state.clone();

        if phase_changed {
            info!(run_id = slot.generation, phase = %state.phase, "Pipeline phase changed");
            self.event_bus
                .emit(CoreEvent::Pipeline(PipelineEvent::PhaseChanged {
                    run_id: slot.generation,
                    phase: state.phase.as_str().to_string(),
                    job_id: state.job_id().map(|id| id.to_string()),
                }))
                .ok();
        }

        // No subscribers is fine.
        let _ = self.states.send(state);
    }

    /// Publish `state` only if `run_id` is still the current run.
    fn publish(&self, run_id: u64, state: PipelineState) -> bool {
        let mut slot = self.slot.lock();
        if slot.generation != run_id {
            debug!(run_id, current = slot.generation, "Dropping state of stale run");
            return false;
        }
        self.publish_locked(&mut slot, state);
        true
    }

    fn observe(&self, run_id: u64, reference: &VideoReference, job: &Job, attempt: u32) {
        let mut slot = self.slot.lock();
        if slot.generation != run_id {
            return;
        }

        self.event_bus
            .emit(CoreEvent::Pipeline(PipelineEvent::JobStatusObserved {
                run_id,
                job_id: job.id.to_string(),
                status: job.status.as_str().to_string(),
                attempt,
            }))
            .ok();

        let changed = slot.state.job.as_ref().map(|j| j.status) != Some(job.status);
        if changed {
            self.publish_locked(
                &mut slot,
                PipelineState::polling(reference.clone(), job.clone()),
            );
        }
    }

    fn emit_failed(&self, run_id: u64, err: &PipelineError) {
        self.event_bus
            .emit(CoreEvent::Pipeline(PipelineEvent::Failed {
                run_id,
                kind: err.kind().as_str().to_string(),
                message: err.to_string(),
            }))
            .ok();
    }

    #[instrument(skip(self, reference, token), fields(video_id = %reference.video_id()))]
    async fn run(
        &self,
        run_id: u64,
        reference: VideoReference,
        token: CancellationToken,
    ) -> Option<PipelineState> {
        let mut last_job = None;

        match self.execute(run_id, &reference, &token, &mut last_job).await {
            Ok(state) => Some(state),
            Err(PipelineError::Cancelled) => {
                debug!(run_id, "Pipeline run cancelled");
                None
            }
            Err(err) => {
                error!(run_id, kind = err.kind().as_str(), error = %err, "Pipeline run failed");
                let state = PipelineState::failed(Some(reference), last_job, err.clone());
                if self.publish(run_id, state.clone()) {
                    self.emit_failed(run_id, &err);
                    Some(state)
                } else {
                    None
                }
            }
        }
    }

    async fn execute(
        &self,
        run_id: u64,
        reference: &VideoReference,
        token: &CancellationToken,
        last_job: &mut Option<Job>,
    ) -> Result<PipelineState> {
        let submitted = self.submitter.submit(reference).await;
        if token.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let job = submitted?;
        *last_job = Some(job.clone());

        if !self.publish(run_id, PipelineState::polling(reference.clone(), job.clone())) {
            return Err(PipelineError::Cancelled);
        }

        let completed = self
            .poller
            .poll(&job, token, |observed, attempt| {
                *last_job = Some(observed.clone());
                self.observe(run_id, reference, observed, attempt);
            })
            .await?;
        *last_job = Some(completed.job.clone());

        if !self.publish(
            run_id,
            PipelineState::fetching(reference.clone(), completed.job.clone()),
        ) {
            return Err(PipelineError::Cancelled);
        }

        let fetched = self
            .fetcher
            .fetch(&completed.job.id, &completed.file_name)
            .await;
        if token.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let artifact = fetched?;

        let state = PipelineState::done(reference.clone(), completed.job.clone(), artifact);
        if !self.publish(run_id, state.clone()) {
            return Err(PipelineError::Cancelled);
        }

        self.event_bus
            .emit(CoreEvent::Pipeline(PipelineEvent::Completed {
                run_id,
                job_id: completed.job.id.to_string(),
                file_name: completed.file_name,
            }))
            .ok();

        Ok(state)
    }
}
