//! Job submission (`POST /download`).

use crate::api::Backend;
use crate::error::{PipelineError, Result, Stage};
use crate::models::{Job, JobId, SubmitRequest, SubmitResponse, JOB_FORMAT, JOB_QUALITY};
use crate::resolver::VideoReference;
use bridge_traits::HttpRequest;
use core_runtime::logging::redact_url_credentials;
use tracing::{debug, info, instrument};

/// Issues the processing request for a resolved reference.
///
/// Exactly one request per call; failures are never retried here.
#[derive(Debug, Clone)]
pub struct JobSubmitter {
    backend: Backend,
}

impl JobSubmitter {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    #[instrument(skip(self, reference), fields(video_id = %reference.video_id()))]
    pub async fn submit(&self, reference: &VideoReference) -> Result<Job> {
        let source_url = reference.source_url();
        let body = SubmitRequest {
            url: &source_url,
            format: JOB_FORMAT,
            quality: JOB_QUALITY,
        };

        let url = self.backend.endpoint(&["download"]);
        let request = HttpRequest::post(url.as_str())
            .json(&body)
            .map_err(|e| PipelineError::api(Stage::Submit, None, e.to_string()))?;

        debug!(
            endpoint = %url,
            source_url = %redact_url_credentials(&source_url),
            "Submitting download job"
        );

        let response: SubmitResponse = self.backend.execute_json(Stage::Submit, request).await?;

        match response.status.as_deref() {
            Some("ok") => {}
            other => {
                return Err(PipelineError::api(
                    Stage::Submit,
                    None,
                    format!("backend reported status {:?}", other.unwrap_or("<missing>")),
                ))
            }
        }

        let job_id = response
            .job_id
            .as_ref()
            .and_then(JobId::from_json)
            .ok_or_else(|| PipelineError::protocol(Stage::Submit, "jobId"))?;

        info!(job_id = %job_id, "Download job accepted");

        Ok(Job::submitted(job_id, source_url))
    }
}
