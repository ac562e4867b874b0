//! Artifact retrieval (`GET /downloadFile/{jobId}/{fileName}`).

use crate::api::Backend;
use crate::error::{Result, Stage};
use crate::models::{Artifact, JobId};
use bridge_traits::HttpRequest;
use tracing::{debug, info, instrument};

/// Retrieves the artifact descriptor of a completed job.
#[derive(Debug, Clone)]
pub struct ResultFetcher {
    backend: Backend,
}

impl ResultFetcher {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    /// Fetch the descriptor for `file_name`, as reported by the status
    /// endpoint. The JSON body is kept verbatim in [`Artifact::payload_ref`].
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn fetch(&self, job_id: &JobId, file_name: &str) -> Result<Artifact> {
        let url = self
            .backend
            .endpoint(&["downloadFile", job_id.as_str(), file_name]);

        debug!(endpoint = %url, "Fetching artifact descriptor");

        let payload: serde_json::Value = self
            .backend
            .execute_json(Stage::Fetch, HttpRequest::get(url.as_str()))
            .await?;

        info!(file_name, "Artifact descriptor retrieved");

        Ok(Artifact {
            job_id: job_id.clone(),
            file_name: file_name.to_string(),
            payload_ref: payload,
        })
    }
}
