//! Test configuration helpers for loading .env credentials and creating test downloaders

use std::time::Duration;

use clarity_dl::{AsyncDownloader, Config, Credentials};
use tempfile::TempDir;
use wiremock::MockServer;

/// Downloader pointed at `server`, polling every millisecond and writing into a fresh temp dir
///
/// Keep the returned `TempDir` alive for as long as the result files are inspected.
pub fn mock_downloader(server: &MockServer) -> (AsyncDownloader, TempDir) {
    let scratch = tempfile::tempdir().unwrap();
    let mut config = Config::with_base_url(server.uri());
    config.poll.interval = Duration::from_millis(1);
    config.download.scratch_dir = scratch.path().to_path_buf();
    let downloader = AsyncDownloader::new(config, Credentials::new("K", "S")).unwrap();
    (downloader, scratch)
}

/// Check whether API credentials are available (from the environment or .env)
pub fn has_live_credentials() -> bool {
    dotenvy::dotenv().ok();
    Credentials::from_env().is_ok()
}

/// Downloader against the real API using credentials from the environment or .env
pub fn create_live_downloader() -> Result<(AsyncDownloader, TempDir), String> {
    dotenvy::dotenv().ok();
    let credentials = Credentials::from_env().map_err(|e| e.to_string())?;
    let scratch = tempfile::tempdir().map_err(|e| format!("Failed to create temp dir: {}", e))?;

    let mut config = Config::default();
    config.poll.interval = Duration::from_secs(10);
    config.poll.deadline = Some(Duration::from_secs(30 * 60));
    config.download.scratch_dir = scratch.path().to_path_buf();

    let downloader = AsyncDownloader::new(config, credentials).map_err(|e| e.to_string())?;
    Ok((downloader, scratch))
}
