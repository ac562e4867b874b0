//! Shared request plumbing for the backend stages.

use crate::error::{PipelineError, Result, Stage};
use bridge_traits::{HttpClient, HttpRequest};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use url::Url;

/// Longest slice of an error body copied into an error message.
const BODY_SNIPPET_LEN: usize = 200;

/// Backend location plus the client used to reach it.
#[derive(Clone)]
pub struct Backend {
    http_client: Arc<dyn HttpClient>,
    base_url: Url,
}

impl Backend {
    pub fn new(http_client: Arc<dyn HttpClient>, base_url: Url) -> Self {
        Self {
            http_client,
            base_url,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append path segments to the base URL, percent-encoding each one.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Execute a request and decode a 2xx JSON body.
    ///
    /// Transport failures, non-2xx statuses and undecodable bodies all map
    /// to [`PipelineError::Api`] for the given stage.
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        stage: Stage,
        request: HttpRequest,
    ) -> Result<T> {
        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| PipelineError::api(stage, None, e.to_string()))?;

        if !response.is_success() {
            let snippet: String = response
                .text()
                .unwrap_or_default()
                .chars()
                .take(BODY_SNIPPET_LEN)
                .collect();
            let message = if snippet.trim().is_empty() {
                format!("HTTP {}", response.status)
            } else {
                format!("HTTP {}: {}", response.status, snippet.trim())
            };
            return Err(PipelineError::api(stage, Some(response.status), message));
        }

        response.json::<T>().map_err(|e| {
            PipelineError::api(
                stage,
                Some(response.status),
                format!("unparseable response body: {}", e),
            )
        })
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("base_url", &self.base_url.as_str())
            .field("http_client", &"HttpClient { ... }")
            .finish()
    }
}
