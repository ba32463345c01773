//! HTTP plumbing shared by the job lifecycle components.
//!
//! One pooled [`reqwest::Client`] is built per downloader. JSON calls accept
//! 200, 202 and 302 as success; result downloads accept only 200. Redirects
//! are not followed, so a 302 reaches the caller as-is.

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::auth::Token;
use crate::config::Config;
use crate::error::{Error, Result, TransportError};
use crate::types::JobId;

/// Status codes a JSON call may return and still count as successful
pub const ACCEPTED_STATUSES: [StatusCode; 3] =
    [StatusCode::OK, StatusCode::ACCEPTED, StatusCode::FOUND];

const AUTH_PATH: &str = "/clarity/v1/oauth/token";
const PUBLIC_PREFIX: &str = "/clarity/v1/public";

/// Thin client over the API's endpoints
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
    download_timeout: Option<Duration>,
}

impl ApiClient {
    /// Build the HTTP client from configuration
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(&config.http.user_agent)
            .connect_timeout(config.http.connect_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::Config {
                message: format!("Failed to create HTTP client: {}", e),
                key: Some("http".to_string()),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url().to_string(),
            request_timeout: config.http.request_timeout,
            download_timeout: config.http.download_timeout,
        })
    }

    /// `{base}/clarity/v1/oauth/token`
    pub fn token_url(&self) -> String {
        format!("{}{}", self.base_url, AUTH_PATH)
    }

    /// `{base}/clarity/v1/public{api_path}`
    pub fn public_url(&self, api_path: &str) -> String {
        format!("{}{}{}", self.base_url, PUBLIC_PREFIX, api_path)
    }

    /// `{base}/clarity/v1/public/job/{id}/status`
    pub fn job_status_url(&self, id: &JobId) -> String {
        self.public_url(&format!("/job/{}/status", urlencoding::encode(id.as_str())))
    }

    /// `{base}/clarity/v1/public/job/{id}/fetch`
    pub fn job_fetch_url(&self, id: &JobId) -> String {
        self.public_url(&format!("/job/{}/fetch", urlencoding::encode(id.as_str())))
    }

    /// POST a JSON body and decode the JSON answer
    pub(crate) async fn post_json<B>(
        &self,
        url: &str,
        bearer: Option<&Token>,
        body: &B,
    ) -> std::result::Result<Value, TransportError>
    where
        B: Serialize + ?Sized,
    {
        let request = self
            .request(Method::POST, url, bearer)
            .timeout(self.request_timeout)
            .json(body);
        send_json(request, url).await
    }

    /// GET a JSON document
    pub(crate) async fn get_json(
        &self,
        url: &str,
        bearer: Option<&Token>,
    ) -> std::result::Result<Value, TransportError> {
        let request = self
            .request(Method::GET, url, bearer)
            .timeout(self.request_timeout);
        send_json(request, url).await
    }

    /// GET a response whose body the caller streams; requires exactly 200
    pub(crate) async fn get_stream(
        &self,
        url: &str,
        bearer: Option<&Token>,
    ) -> std::result::Result<reqwest::Response, TransportError> {
        let mut request = self.request(Method::GET, url, bearer);
        if let Some(timeout) = self.download_timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        if response.status() != StatusCode::OK {
            let status = response.status().as_u16();
            tracing::error!(url = %url, status, "Error getting job result");
            return Err(TransportError::Status { status });
        }
        Ok(response)
    }

    fn request(&self, method: Method, url: &str, bearer: Option<&Token>) -> RequestBuilder {
        let request = self.http.request(method, url);
        match bearer {
            Some(token) => request.header(AUTHORIZATION, token.header_value()),
            None => request,
        }
    }
}

async fn send_json(
    request: RequestBuilder,
    url: &str,
) -> std::result::Result<Value, TransportError> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !ACCEPTED_STATUSES.contains(&status) {
        tracing::error!(
            url = %url,
            status = status.as_u16(),
            "Request finished with unexpected status code"
        );
        if !body.trim().is_empty() {
            tracing::debug!(url = %url, body = %body, "Error body");
        }
        return Err(TransportError::Status {
            status: status.as_u16(),
        });
    }

    Ok(serde_json::from_str(&body)?)
}
