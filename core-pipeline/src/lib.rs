//! # Core Pipeline Module
//!
//! Submit → poll → fetch job pipeline against the processing backend.
//!
//! ## Overview
//!
//! - [`resolve`] turns free-form input into a [`VideoReference`]
//! - [`JobSubmitter`] issues `POST /download`
//! - [`StatusPoller`] polls `GET /status/{jobId}` under a bounded [`PollPolicy`]
//! - [`ResultFetcher`] retrieves `GET /downloadFile/{jobId}/{fileName}`
//! - [`PipelineController`] runs the stages as one cancellable operation and
//!   publishes [`PipelineState`] snapshots
//!
//! Every stage returns a classified [`PipelineError`]; the controller is the
//! only place errors become user-visible state.

pub mod api;
pub mod controller;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod poller;
pub mod resolver;
pub mod submitter;

pub use api::Backend;
pub use controller::{PipelineController, RunHandle};
pub use error::{ErrorKind, PipelineError, Result, Stage};
pub use fetcher::ResultFetcher;
pub use models::{Artifact, Job, JobId, JobStatus, PipelinePhase, PipelineState};
pub use poller::{CompletedJob, PollPolicy, StatusPoller};
pub use resolver::{resolve, VideoReference};
pub use submitter::JobSubmitter;
