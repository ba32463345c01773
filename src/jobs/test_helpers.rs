//! Shared wiremock fixtures for the job lifecycle tests.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::auth::TokenProvider;
use crate::config::{Config, Credentials};
use crate::http::ApiClient;
use crate::types::Event;

pub(crate) const TOKEN_PATH: &str = "/clarity/v1/oauth/token";

/// Config pointing at the mock server with a 1 ms poll interval
pub(crate) fn test_config(server: &MockServer) -> Config {
    let mut config = Config::with_base_url(server.uri());
    config.poll.interval = Duration::from_millis(1);
    config
}

/// Client, token provider and event channel wired to the mock server
pub(crate) fn test_parts(
    config: &Config,
) -> (ApiClient, Arc<TokenProvider>, broadcast::Sender<Event>) {
    let client = ApiClient::new(config).unwrap();
    let (event_tx, _rx) = broadcast::channel(256);
    let tokens = Arc::new(TokenProvider::new(
        client.clone(),
        Credentials::new("K", "S"),
        event_tx.clone(),
    ));
    (client, tokens, event_tx)
}

/// Token endpoint answering `token` for the next `times` calls, expected exactly that often
pub(crate) async fn mount_token(server: &MockServer, token: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "token": token })),
        )
        .up_to_n_times(times)
        .expect(times)
        .mount(server)
        .await;
}

/// Path of the status endpoint for `id`
pub(crate) fn status_path(id: &str) -> String {
    format!("/clarity/v1/public/job/{id}/status")
}

/// Path of the fetch endpoint for `id`
pub(crate) fn fetch_path(id: &str) -> String {
    format!("/clarity/v1/public/job/{id}/fetch")
}

/// A status response body
pub(crate) fn status_body(status: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({ "statusMessage": status }))
}
