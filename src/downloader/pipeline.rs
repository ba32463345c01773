//! Submit, wait and fetch as a single operation.

use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::types::{Job, SubmissionRequest};

use super::AsyncDownloader;

impl AsyncDownloader {
    /// Run a job end to end and return the path of the downloaded result
    ///
    /// Submits `payload` to `api_path`, waits for the job to finish and
    /// streams its result into the scratch directory as `{job_id}.csv.gz`
    /// (or the configured extension).
    ///
    /// # Errors
    ///
    /// The first failing stage's error is returned unchanged:
    /// [`Error::Auth`], [`Error::Submission`], [`Error::Poll`],
    /// [`Error::JobFailed`], [`Error::DeadlineExceeded`] or [`Error::Download`].
    pub async fn download<P>(&self, api_path: &str, payload: &P) -> Result<PathBuf>
    where
        P: Serialize + ?Sized,
    {
        self.download_with_cancel(api_path, payload, &CancellationToken::new())
            .await
    }

    /// Like [`download`](Self::download), stopping early when `cancel` fires
    ///
    /// Cancellation takes effect once the job has been submitted: while
    /// sleeping between polls, during a status query or during the result
    /// download. A cancelled download leaves no result file behind.
    pub async fn download_with_cancel<P>(
        &self,
        api_path: &str,
        payload: &P,
        cancel: &CancellationToken,
    ) -> Result<PathBuf>
    where
        P: Serialize + ?Sized,
    {
        let started = Instant::now();
        tracing::info!(api_path = %api_path, "Starting async download");

        let job_id = self.submitter.submit(api_path, payload).await?;

        let mut job = Job::submitted(job_id.clone());
        self.poller.track(&mut job, cancel).await?;

        let path = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(job_id = %job_id, "Download cancelled while fetching the result");
                self.fetcher.discard_partial(&job_id).await;
                return Err(Error::Cancelled { job_id: job_id.clone() });
            }
            result = self.fetcher.fetch(&job_id) => result?,
        };

        tracing::info!(
            job_id = %job_id,
            path = %path.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Async download finished"
        );
        Ok(path)
    }

    /// Run a prepared [`SubmissionRequest`] end to end
    pub async fn download_request(&self, request: &SubmissionRequest) -> Result<PathBuf> {
        self.download(&request.api_path, &request.payload).await
    }
}
