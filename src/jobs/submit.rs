//! Job submission.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::auth::TokenProvider;
use crate::error::{Error, Result};
use crate::http::ApiClient;
use crate::types::{Event, JobId, SubmissionRequest};

/// Posts job requests and extracts the assigned job ID
#[derive(Clone, Debug)]
pub struct JobSubmitter {
    client: ApiClient,
    tokens: Arc<TokenProvider>,
    event_tx: broadcast::Sender<Event>,
}

impl JobSubmitter {
    /// Create a submitter sharing the given client and token provider
    pub fn new(
        client: ApiClient,
        tokens: Arc<TokenProvider>,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            client,
            tokens,
            event_tx,
        }
    }

    /// Submit a job to `{base}/clarity/v1/public{api_path}`
    ///
    /// # Errors
    ///
    /// - [`Error::Auth`] if no token can be obtained
    /// - [`Error::Submission`] if the request fails or the response has no
    ///   usable `uuid`; both cases are deliberately reported as one kind
    pub async fn submit<P>(&self, api_path: &str, payload: &P) -> Result<JobId>
    where
        P: Serialize + ?Sized,
    {
        let url = self.client.public_url(api_path);
        tracing::info!(url = %url, "Requesting job");
        if tracing::enabled!(tracing::Level::DEBUG) {
            let data = serde_json::to_string(payload)?;
            tracing::debug!(url = %url, data = %data, "Job request body");
        }

        let token = self.tokens.get_token().await?;
        let response = self
            .client
            .post_json(&url, Some(&token), payload)
            .await
            .map_err(|e| {
                tracing::error!(url = %url, status = ?e.status(), error = %e, "Error requesting async job");
                Error::Submission {
                    message: format!("the request for an async job failed: {e}"),
                }
            })?;

        let job_id = extract_job_id(&response)?;
        tracing::info!(job_id = %job_id, "Requested job");
        self.event_tx
            .send(Event::JobSubmitted {
                job_id: job_id.clone(),
                api_path: api_path.to_string(),
            })
            .ok();
        Ok(job_id)
    }

    /// Submit a prepared [`SubmissionRequest`]
    pub async fn submit_request(&self, request: &SubmissionRequest) -> Result<JobId> {
        self.submit(&request.api_path, &request.payload).await
    }
}

fn extract_job_id(response: &Value) -> Result<JobId> {
    match response.get("uuid") {
        Some(Value::String(id)) => JobId::parse(id.as_str()),
        Some(other) => Err(Error::Submission {
            message: format!("job uuid is not a string: {other}"),
        }),
        None => {
            let reason = server_message(response).unwrap_or("response has no uuid field");
            tracing::error!(reason = %reason, "Error requesting async job");
            Err(Error::Submission {
                message: format!("the request for an async job failed: {reason}"),
            })
        }
    }
}

/// Human-readable reason the API put in an error body, if any
fn server_message(response: &Value) -> Option<&str> {
    response
        .pointer("/elements/0/message")
        .or_else(|| response.get("message"))
        .and_then(Value::as_str)
}
