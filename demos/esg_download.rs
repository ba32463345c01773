//! Download ESG risk scores and SFDR metrics with credentials from the environment.
//!
//! ```bash
//! export CLARITY_AI_API_KEY=...
//! export CLARITY_AI_API_SECRET=...
//! cargo run --example esg_download
//! ```
//!
//! A `.env` file in the working directory is read as well. Set `RUST_LOG=debug`
//! to see request bodies and every status check.

use clarity_dl::{AsyncDownloader, Config, Credentials, Event, SubmissionRequest};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let downloader = AsyncDownloader::new(Config::default(), Credentials::from_env()?)?;

    let mut events = downloader.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let Event::ResultDownloaded { job_id, path, size_bytes } = event {
                println!("{job_id}: {size_bytes} bytes -> {}", path.display());
            }
        }
    });

    let esg = SubmissionRequest::new(
        "/securities/esg-risk/scores-by-id/async",
        serde_json::json!({
            "scoreIds": ["ESG", "ENVIRONMENTAL"],
            "securityTypes": ["EQUITY"]
        }),
    )?;
    let sfdr = SubmissionRequest::new(
        "/organizations/sfdr/metric-by-id/async",
        serde_json::json!({ "metricIds": ["CARBON_FOOTPRINT", "GHG_INTENSITY"] }),
    )?;

    // Both jobs run on the server at the same time and share one token
    let (esg_result, sfdr_result) = tokio::join!(
        downloader.download_request(&esg),
        downloader.download_request(&sfdr),
    );

    println!("ESG risk scores: {}", esg_result?.display());
    println!("SFDR metrics: {}", sfdr_result?.display());
    Ok(())
}
