//! Core downloader implementation split into focused submodules.
//!
//! The `AsyncDownloader` struct wires the lifecycle components together:
//! - [`pipeline`] - submit, poll and fetch as one operation
//!
//! The components themselves live in [`crate::jobs`] and can be driven
//! individually through the accessors on [`AsyncDownloader`].

mod pipeline;

use std::sync::Arc;

use crate::auth::TokenProvider;
use crate::config::{Config, Credentials};
use crate::error::Result;
use crate::http::ApiClient;
use crate::jobs::{JobSubmitter, ResultFetcher, StatusPoller};
use crate::types::Event;

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone, Debug)]
pub struct AsyncDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Token cache shared by every stage and every concurrent download
    pub(crate) tokens: Arc<TokenProvider>,
    pub(crate) submitter: Arc<JobSubmitter>,
    pub(crate) poller: Arc<StatusPoller>,
    pub(crate) fetcher: Arc<ResultFetcher>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
}

impl AsyncDownloader {
    /// Create a new AsyncDownloader instance
    ///
    /// Validates the configuration, builds the HTTP client and sets up the
    /// event channel. No request is sent until the first download.
    pub fn new(config: Config, credentials: Credentials) -> Result<Self> {
        config.validate()?;

        // Create broadcast channel with buffer size of 1000 events
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        let client = ApiClient::new(&config)?;
        let tokens = Arc::new(TokenProvider::new(
            client.clone(),
            credentials,
            event_tx.clone(),
        ));
        let submitter = JobSubmitter::new(client.clone(), tokens.clone(), event_tx.clone());
        let poller = StatusPoller::new(
            client.clone(),
            tokens.clone(),
            config.poll.clone(),
            event_tx.clone(),
        );
        let fetcher = ResultFetcher::new(
            client,
            tokens.clone(),
            config.download.clone(),
            event_tx.clone(),
        );

        tracing::debug!(
            base_url = %config.base_url(),
            poll_interval_ms = config.poll.interval.as_millis() as u64,
            scratch_dir = %config.download.scratch_dir.display(),
            "Downloader initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            tokens,
            submitter: Arc::new(submitter),
            poller: Arc::new(poller),
            fetcher: Arc::new(fetcher),
            event_tx,
        })
    }

    /// Subscribe to lifecycle events
    ///
    /// Each subscriber receives every event sent after it subscribed.
    /// Events are best-effort: a slow subscriber sees `RecvError::Lagged`.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Shared token provider
    pub fn tokens(&self) -> &TokenProvider {
        &self.tokens
    }

    /// Job submission stage
    pub fn submitter(&self) -> &JobSubmitter {
        &self.submitter
    }

    /// Status polling stage
    pub fn poller(&self) -> &StatusPoller {
        &self.poller
    }

    /// Result download stage
    pub fn fetcher(&self) -> &ResultFetcher {
        &self.fetcher
    }
}
