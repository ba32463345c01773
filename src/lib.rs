//! # clarity-dl
//!
//! Client library for the Clarity AI asynchronous bulk-data API.
//!
//! A bulk request is a job: it is submitted, runs on the server for a while,
//! and its result is then downloaded as a gzip-compressed CSV file. This crate
//! drives that lifecycle:
//! - **Token management** - one bearer token shared by every request,
//!   refreshed at most once per expiry even under concurrent use
//! - **Polling** - fixed-interval status checks with one token-refresh retry
//! - **Streaming download** - results go straight to disk, never into memory
//! - **Event-driven** - consumers subscribe to lifecycle events
//!
//! ## Quick Start
//!
//! ```no_run
//! use clarity_dl::{AsyncDownloader, Config, Credentials};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = AsyncDownloader::new(Config::default(), Credentials::from_env()?)?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let path = downloader
//!         .download(
//!             "/organizations/sfdr/metric-by-id/async",
//!             &serde_json::json!({ "metricIds": ["CARBON_FOOTPRINT", "GHG_INTENSITY"] }),
//!         )
//!         .await?;
//!     println!("Result written to {}", path.display());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Bearer token acquisition and caching
pub mod auth;
/// Configuration types
pub mod config;
/// End-to-end download orchestration
pub mod downloader;
/// Error types
pub mod error;
/// HTTP transport shared by all components
pub mod http;
/// Job lifecycle components
pub mod jobs;
/// Core types and events
pub mod types;

use std::path::PathBuf;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

// Re-export commonly used types
pub use auth::{Token, TokenProvider};
pub use config::{Config, Credentials, DownloadConfig, HttpConfig, PollConfig};
pub use downloader::AsyncDownloader;
pub use error::{Error, Result};
pub use jobs::{JobSubmitter, ResultFetcher, StatusPoller};
pub use types::{Event, Job, JobId, JobStatus, SubmissionRequest};

/// Helper function to run a download with graceful signal handling.
///
/// Runs [`AsyncDownloader::download_with_cancel`] and cancels it when a
/// termination signal arrives. A download interrupted this way returns
/// [`Error::Cancelled`] and leaves no result file behind.
///
/// - **Unix:** listens for SIGTERM and SIGINT, falling back to Ctrl+C if registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use clarity_dl::{AsyncDownloader, Config, Credentials, download_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = AsyncDownloader::new(Config::default(), Credentials::from_env()?)?;
///
///     // Run with automatic signal handling
///     let payload = serde_json::json!({ "scoreIds": ["ESG"], "securityTypes": ["EQUITY"] });
///     download_with_shutdown(&downloader, "/securities/esg-risk/scores-by-id/async", &payload)
///         .await?;
///
///     Ok(())
/// }
/// ```
pub async fn download_with_shutdown<P>(
    downloader: &AsyncDownloader,
    api_path: &str,
    payload: &P,
) -> Result<PathBuf>
where
    P: Serialize + ?Sized,
{
    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = wait_for_signal() => {
                    tracing::info!("Cancelling download after termination signal");
                    cancel.cancel();
                }
                _ = cancel.cancelled() => {}
            }
        })
    };

    let result = downloader
        .download_with_cancel(api_path, payload, &cancel)
        .await;

    // Release the signal watcher when the download finished on its own
    cancel.cancel();
    watcher.await.ok();
    result
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, falling back to Ctrl+C");
            wait_for_ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            // Never resolve, so a broken listener does not cancel the download
            std::future::pending::<()>().await;
        }
    }
}
