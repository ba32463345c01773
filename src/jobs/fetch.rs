//! Result download.
//!
//! The body is streamed into `{id}.{ext}.part` and renamed to `{id}.{ext}`
//! once the last chunk is on disk. A failed download removes the partial
//! file, so an existing `{id}.{ext}` is always complete.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;

use crate::auth::TokenProvider;
use crate::config::DownloadConfig;
use crate::error::{Error, Result};
use crate::http::ApiClient;
use crate::types::{Event, JobId};

/// Downloads finished job results into the scratch directory
#[derive(Clone, Debug)]
pub struct ResultFetcher {
    client: ApiClient,
    tokens: Arc<TokenProvider>,
    config: DownloadConfig,
    event_tx: broadcast::Sender<Event>,
}

impl ResultFetcher {
    /// Create a fetcher sharing the given client and token provider
    pub fn new(
        client: ApiClient,
        tokens: Arc<TokenProvider>,
        config: DownloadConfig,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            client,
            tokens,
            config,
            event_tx,
        }
    }

    /// Where the result of `id` is written
    pub fn result_path(&self, id: &JobId) -> PathBuf {
        self.config
            .scratch_dir
            .join(format!("{}.{}", id, self.config.file_extension))
    }

    /// Download the result of job `id` and return the local file path
    ///
    /// # Errors
    ///
    /// - [`Error::Download`] if the endpoint does not answer 200 or the body
    ///   cannot be read or written
    /// - [`Error::Auth`] if no token can be obtained
    /// - [`Error::Io`] if the scratch directory cannot be created
    pub async fn fetch(&self, id: &JobId) -> Result<PathBuf> {
        let url = self.client.job_fetch_url(id);
        let dest = self.result_path(id);
        let partial = partial_path(&dest);

        tokio::fs::create_dir_all(&self.config.scratch_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create scratch directory '{}': {}",
                        self.config.scratch_dir.display(),
                        e
                    ),
                ))
            })?;
        // Leftover from an earlier download of this job that was cut short
        self.discard_partial(id).await;

        tracing::info!(job_id = %id, url = %url, path = %dest.display(), "Downloading job result");

        let token = self.tokens.get_token().await?;
        let response = self
            .client
            .get_stream(&url, Some(&token))
            .await
            .map_err(|e| Error::Download {
                job_id: id.clone(),
                message: e.to_string(),
            })?;

        let size_bytes = match write_body(response, &partial).await {
            Ok(size) => size,
            Err(e) => {
                self.discard_partial(id).await;
                tracing::error!(job_id = %id, error = %e, "Error downloading job result");
                return Err(Error::Download {
                    job_id: id.clone(),
                    message: e.to_string(),
                });
            }
        };

        tokio::fs::rename(&partial, &dest)
            .await
            .map_err(|e| Error::Download {
                job_id: id.clone(),
                message: format!(
                    "failed to move '{}' into place: {}",
                    partial.display(),
                    e
                ),
            })?;

        tracing::info!(
            job_id = %id,
            path = %dest.display(),
            size_bytes,
            "Downloaded job result"
        );
        self.event_tx
            .send(Event::ResultDownloaded {
                job_id: id.clone(),
                path: dest.clone(),
                size_bytes,
            })
            .ok();
        Ok(dest)
    }

    /// Remove the partial file of an abandoned download of `id`
    pub(crate) async fn discard_partial(&self, id: &JobId) {
        let partial = partial_path(&self.result_path(id));
        if let Err(e) = tokio::fs::remove_file(&partial).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %partial.display(), error = %e, "Failed to remove partial download");
        }
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Stream the response body into `path`, returning the number of bytes written
async fn write_body(response: reqwest::Response, path: &Path) -> std::io::Result<u64> {
    let file = tokio::fs::File::create(path).await?;
    let mut writer = tokio::io::BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(std::io::Error::other)?;
        writer.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    writer.flush().await?;
    writer.into_inner().sync_all().await?;
    Ok(written)
}
