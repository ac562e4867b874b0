//! # Pipeline Data Model
//!
//! Jobs, artifacts and the published pipeline state, plus the wire shapes of
//! the backend contract.
//!
//! ## State Machine
//!
//! ```text
//! Idle → Submitting → Polling → Fetching → Done
//!            ↓           ↓          ↓
//!            └─────────→ Error ←────┘
//! ```
//!
//! `result` is only set in `Done` and `error` only in `Error`.

use crate::error::{PipelineError, Stage};
use crate::resolver::VideoReference;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Container format requested from the backend.
pub const JOB_FORMAT: &str = "mp4";

/// Vertical resolution requested from the backend.
pub const JOB_QUALITY: u32 = 720;

// ============================================================================
// ID Types
// ============================================================================

/// Backend-assigned job identifier.
///
/// The backend may return the id as a JSON string or number; both are kept
/// in their textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extract a job id from the `jobId` field of a submit response.
    ///
    /// Empty strings, zero and non-scalar values are rejected.
    pub(crate) fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(Self(s.trim().to_string())),
            serde_json::Value::Number(n) if n.as_f64() != Some(0.0) => Some(Self(n.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ============================================================================
// Status Types
// ============================================================================

/// Server-side job status.
///
/// Statuses only move forward; see [`JobStatus::advances_from`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Processing => 1,
            JobStatus::Completed | JobStatus::Failed => 2,
        }
    }

    /// Whether moving from `previous` to `self` keeps the status monotonic.
    pub fn advances_from(&self, previous: JobStatus) -> bool {
        self.rank() >= previous.rank()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status '{}'", other)),
        }
    }
}

// ============================================================================
// Job & Artifact
// ============================================================================

/// A processing job as last observed from the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub source_reference: String,
    pub format: String,
    pub quality: u32,
    pub status: JobStatus,
}

impl Job {
    /// A freshly submitted job; the backend reports it as queued.
    pub fn submitted(id: JobId, source_reference: impl Into<String>) -> Self {
        Self {
            id,
            source_reference: source_reference.into(),
            format: JOB_FORMAT.to_string(),
            quality: JOB_QUALITY,
            status: JobStatus::Queued,
        }
    }

    pub(crate) fn with_status(&self, status: JobStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

/// Final output descriptor of a completed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub job_id: JobId,
    pub file_name: String,
    /// Descriptor returned by the backend, kept verbatim.
    pub payload_ref: serde_json::Value,
}

// ============================================================================
// Pipeline State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelinePhase {
    #[default]
    Idle,
    Submitting,
    Polling,
    Fetching,
    Done,
    Error,
}

impl PipelinePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelinePhase::Idle => "idle",
            PipelinePhase::Submitting => "submitting",
            PipelinePhase::Polling => "polling",
            PipelinePhase::Fetching => "fetching",
            PipelinePhase::Done => "done",
            PipelinePhase::Error => "error",
        }
    }

    /// Phases during which a run is in flight.
    pub fn is_working(&self) -> bool {
        matches!(
            self,
            PipelinePhase::Submitting | PipelinePhase::Polling | PipelinePhase::Fetching
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelinePhase::Done | PipelinePhase::Error)
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot published to subscribers on every transition.
///
/// The controller only publishes states built by the phase constructors
/// below, which keep `result` and `error` mutually exclusive. Fields are
/// public for reading; a hand-built value carries no such guarantee.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineState {
    pub phase: PipelinePhase,
    pub reference: Option<VideoReference>,
    pub job: Option<Job>,
    pub result: Option<Artifact>,
    pub error: Option<PipelineError>,
}

impl PipelineState {
    pub fn idle() -> Self {
        Self::default()
    }

    pub(crate) fn submitting(reference: VideoReference) -> Self {
        Self {
            phase: PipelinePhase::Submitting,
            reference: Some(reference),
            ..Self::default()
        }
    }

    pub(crate) fn polling(reference: VideoReference, job: Job) -> Self {
        Self {
            phase: PipelinePhase::Polling,
            reference: Some(reference),
            job: Some(job),
            ..Self::default()
        }
    }

    pub(crate) fn fetching(reference: VideoReference, job: Job) -> Self {
        Self {
            phase: PipelinePhase::Fetching,
            ..Self::polling(reference, job)
        }
    }

    pub(crate) fn done(reference: VideoReference, job: Job, artifact: Artifact) -> Self {
        Self {
            phase: PipelinePhase::Done,
            result: Some(artifact),
            ..Self::polling(reference, job)
        }
    }

    pub(crate) fn failed(
        reference: Option<VideoReference>,
        job: Option<Job>,
        error: PipelineError,
    ) -> Self {
        Self {
            phase: PipelinePhase::Error,
            reference,
            job,
            result: None,
            error: Some(error),
        }
    }

    pub fn job_id(&self) -> Option<&JobId> {
        self.job.as_ref().map(|job| &job.id)
    }
}

// ============================================================================
// Wire Types
// ============================================================================

/// Body of `POST /download`.
#[derive(Debug, Serialize)]
pub(crate) struct SubmitRequest<'a> {
    pub url: &'a str,
    pub format: &'a str,
    pub quality: u32,
}

/// Body of a `POST /download` response.
#[derive(Debug, Deserialize)]
pub(crate) struct SubmitResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "jobId")]
    pub job_id: Option<serde_json::Value>,
}

/// Envelope of a `GET /status/{jobId}` response.
///
/// `data` stays untyped so that a malformed payload is reported as a
/// protocol error rather than an unparseable body.
#[derive(Debug, Deserialize)]
pub(crate) struct StatusEnvelope {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusData {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "fileName", alias = "filename")]
    pub file_name: Option<String>,
    #[serde(default, alias = "error")]
    pub message: Option<String>,
}

impl StatusData {
    pub(crate) fn parse(data: serde_json::Value) -> crate::Result<Self> {
        serde_json::from_value(data).map_err(|_| PipelineError::protocol(Stage::Status, "data"))
    }
}
