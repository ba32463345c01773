//! Job status polling.
//!
//! The poller sleeps for the configured interval, queries the status endpoint,
//! and repeats while the job reports `RUNNING`. A failed status query is
//! treated as a possible token expiry: the token is replaced and the same
//! query is retried exactly once. A second failure ends polling with
//! [`Error::Poll`].

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::auth::TokenProvider;
use crate::config::PollConfig;
use crate::error::{Error, Result};
use crate::http::ApiClient;
use crate::types::{Event, Job, JobId, JobStatus};

/// Polls a job until it reaches a terminal status
#[derive(Clone, Debug)]
pub struct StatusPoller {
    client: ApiClient,
    tokens: Arc<TokenProvider>,
    config: PollConfig,
    event_tx: broadcast::Sender<Event>,
}

impl StatusPoller {
    /// Create a poller sharing the given client and token provider
    pub fn new(
        client: ApiClient,
        tokens: Arc<TokenProvider>,
        config: PollConfig,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            client,
            tokens,
            config,
            event_tx,
        }
    }

    /// Wait until job `id` succeeds
    ///
    /// Runs until a terminal status, an unrecoverable query failure, or the
    /// configured deadline.
    pub async fn wait_until_done(&self, id: &JobId) -> Result<()> {
        let mut job = Job::submitted(id.clone());
        self.track(&mut job, &CancellationToken::new()).await
    }

    /// Poll `job` until it is terminal, updating its status along the way
    ///
    /// # Errors
    ///
    /// - [`Error::JobFailed`] if the final status is not `SUCCESS`
    /// - [`Error::Poll`] if a status query fails again after a token refresh,
    ///   or a successful response has no `statusMessage`
    /// - [`Error::Auth`] if a token cannot be obtained
    /// - [`Error::Cancelled`] if `cancel` fires first
    /// - [`Error::DeadlineExceeded`] if the configured deadline elapses first
    pub async fn track(&self, job: &mut Job, cancel: &CancellationToken) -> Result<()> {
        let job_id = job.id.clone();
        tracing::info!(job_id = %job_id, "Waiting for job to finish");

        let polling = self.poll_until_terminal(job);
        let bounded = async {
            match self.config.deadline {
                Some(deadline) => match tokio::time::timeout(deadline, polling).await {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::error!(job_id = %job_id, deadline = ?deadline, "Job did not finish in time");
                        Err(Error::DeadlineExceeded {
                            job_id: job_id.clone(),
                            waited: deadline,
                        })
                    }
                },
                None => polling.await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(job_id = %job_id, "Stopped waiting for job: cancelled");
                return Err(Error::Cancelled { job_id: job_id.clone() });
            }
            result = bounded => result?,
        }

        match &job.status {
            JobStatus::Success => {
                tracing::info!(job_id = %job_id, "Job finished correctly");
                self.event_tx.send(Event::JobCompleted { job_id }).ok();
                Ok(())
            }
            JobStatus::Failed(status) => {
                tracing::error!(job_id = %job_id, status = %status, "Job finished with error");
                self.event_tx
                    .send(Event::JobFailed {
                        job_id: job_id.clone(),
                        status: status.clone(),
                    })
                    .ok();
                Err(Error::JobFailed {
                    job_id,
                    status: status.clone(),
                })
            }
            // poll_until_terminal only returns Ok on a terminal status
            JobStatus::Running => Err(Error::Poll {
                job_id,
                message: "polling stopped while the job was still running".to_string(),
            }),
        }
    }

    async fn poll_until_terminal(&self, job: &mut Job) -> Result<()> {
        let url = self.client.job_status_url(&job.id);
        let mut attempt: u32 = 0;

        while !job.status.is_terminal() {
            tokio::time::sleep(self.config.interval).await;
            attempt += 1;

            let status = self.query_status(&job.id, &url).await?;
            tracing::debug!(job_id = %job.id, attempt, status = %status, "Job status");
            self.event_tx
                .send(Event::StatusChecked {
                    job_id: job.id.clone(),
                    status: status.clone(),
                    attempt,
                })
                .ok();
            job.status = status;
        }

        Ok(())
    }

    async fn query_status(&self, id: &JobId, url: &str) -> Result<JobStatus> {
        let token = self.tokens.get_token().await?;

        let response = match self.client.get_json(url, Some(&token)).await {
            Ok(response) => response,
            Err(first) => {
                // Expired tokens and unreachable endpoints look the same here
                tracing::warn!(
                    job_id = %id,
                    status = ?first.status(),
                    error = %first,
                    "Status query failed, renewing token and retrying once"
                );
                let fresh = self.tokens.refresh(&token).await?;
                self.client
                    .get_json(url, Some(&fresh))
                    .await
                    .map_err(|e| {
                        tracing::error!(job_id = %id, status = ?e.status(), error = %e, "Status query failed after token renewal");
                        Error::Poll {
                            job_id: id.clone(),
                            message: e.to_string(),
                        }
                    })?
            }
        };

        parse_status(id, &response)
    }
}

fn parse_status(id: &JobId, response: &Value) -> Result<JobStatus> {
    response
        .get("statusMessage")
        .and_then(Value::as_str)
        .map(JobStatus::from_wire)
        .ok_or_else(|| Error::Poll {
            job_id: id.clone(),
            message: "status response has no statusMessage field".to_string(),
        })
}
