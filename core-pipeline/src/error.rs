use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Backend call that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Submit,
    Status,
    Fetch,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Submit => "submit",
            Stage::Status => "status",
            Stage::Fetch => "fetch",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified pipeline failure.
///
/// Stage errors travel unmodified to the controller, which stores them in
/// [`PipelineState`](crate::PipelineState). The type is `Clone` and
/// serializable so it can be republished to every subscriber.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineError {
    #[error("Invalid video reference: {reason}")]
    Validation { input: String, reason: String },

    #[error("{stage} request failed: {message}")]
    Api {
        stage: Stage,
        http_status: Option<u16>,
        message: String,
    },

    #[error("Malformed {stage} response: missing or invalid `{field}`")]
    Protocol { stage: Stage, field: String },

    #[error("Job {job_id} failed: {}", .message.as_deref().unwrap_or("no reason given"))]
    JobFailure {
        job_id: String,
        message: Option<String>,
    },

    #[error("Job {job_id} did not finish after {attempts} status checks ({elapsed_ms} ms)")]
    Timeout {
        job_id: String,
        attempts: u32,
        elapsed_ms: u64,
    },

    #[error("Pipeline run cancelled")]
    Cancelled,

    #[error("No Tokio runtime available to drive the pipeline")]
    RuntimeUnavailable,
}

/// Coarse error class, stable across message changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Api,
    Protocol,
    JobFailure,
    Timeout,
    Cancelled,
    Runtime,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Api => "api",
            ErrorKind::Protocol => "protocol",
            ErrorKind::JobFailure => "job_failure",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Runtime => "runtime",
        }
    }
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Validation { .. } => ErrorKind::Validation,
            PipelineError::Api { .. } => ErrorKind::Api,
            PipelineError::Protocol { .. } => ErrorKind::Protocol,
            PipelineError::JobFailure { .. } => ErrorKind::JobFailure,
            PipelineError::Timeout { .. } => ErrorKind::Timeout,
            PipelineError::Cancelled => ErrorKind::Cancelled,
            PipelineError::RuntimeUnavailable => ErrorKind::Runtime,
        }
    }

    /// Stage that failed, for errors raised by a backend call.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::Api { stage, .. } | PipelineError::Protocol { stage, .. } => {
                Some(*stage)
            }
            PipelineError::JobFailure { .. } | PipelineError::Timeout { .. } => {
                Some(Stage::Status)
            }
            PipelineError::Validation { .. }
            | PipelineError::Cancelled
            | PipelineError::RuntimeUnavailable => None,
        }
    }

    /// Text suitable for showing next to the search bar.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Validation { .. } => {
                "Please enter a valid YouTube link or video ID.".to_string()
            }
            other => format!("Error while downloading video: {}", other),
        }
    }

    pub(crate) fn api(stage: Stage, http_status: Option<u16>, message: impl Into<String>) -> Self {
        PipelineError::Api {
            stage,
            http_status,
            message: message.into(),
        }
    }

    pub(crate) fn protocol(stage: Stage, field: impl Into<String>) -> Self {
        PipelineError::Protocol {
            stage,
            field: field.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
