//! Bearer token acquisition and caching.
//!
//! [`TokenProvider`] owns the one "current" token. The slot is guarded by an
//! async mutex that stays locked while a token request is in flight, so
//! concurrent callers wait for that request instead of issuing their own.

use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::header::HeaderValue;
use serde::Serialize;
use tokio::sync::{Mutex, broadcast};

use crate::config::Credentials;
use crate::error::{Error, Result};
use crate::http::ApiClient;
use crate::types::Event;

/// Opaque bearer token
///
/// Compared by value. `Debug` does not reveal it.
#[derive(Clone)]
pub struct Token {
    value: String,
    header: HeaderValue,
}

impl Token {
    /// Wrap a token string
    ///
    /// Fails with [`Error::Auth`] if the value is empty or cannot be sent in an
    /// HTTP header.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(Error::Auth {
                message: "token is empty".to_string(),
            });
        }
        let mut header =
            HeaderValue::from_str(&format!("Bearer {value}")).map_err(|_| Error::Auth {
                message: "token contains characters not allowed in a header".to_string(),
            })?;
        header.set_sensitive(true);
        Ok(Self { value, header })
    }

    /// The raw token string
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// `Authorization` header value (`Bearer {token}`)
    pub(crate) fn header_value(&self) -> HeaderValue {
        self.header.clone()
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Token {}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    key: &'a str,
    secret: &'a str,
}

/// Owner of the cached bearer token
pub struct TokenProvider {
    client: ApiClient,
    credentials: Credentials,
    slot: Mutex<Option<Token>>,
    requests_made: AtomicU64,
    event_tx: broadcast::Sender<Event>,
}

impl TokenProvider {
    /// Create a provider with an empty cache
    pub fn new(
        client: ApiClient,
        credentials: Credentials,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            client,
            credentials,
            slot: Mutex::new(None),
            requests_made: AtomicU64::new(0),
            event_tx,
        }
    }

    /// Return the cached token, requesting one first if the cache is empty
    pub async fn get_token(&self) -> Result<Token> {
        let mut slot = self.slot.lock().await;
        if let Some(token) = slot.as_ref() {
            return Ok(token.clone());
        }

        let token = self.request_new_token().await?;
        *slot = Some(token.clone());
        Ok(token)
    }

    /// Drop the cached token so the next [`get_token`](Self::get_token) requests a new one
    pub async fn invalidate(&self) {
        let mut slot = self.slot.lock().await;
        if slot.take().is_some() {
            tracing::debug!("Cached token invalidated");
        }
    }

    /// Replace `stale` with a fresh token
    ///
    /// If another caller already replaced `stale`, its token is returned and no
    /// request is made. This keeps one expiry seen by many concurrent callers
    /// down to a single token request.
    pub async fn refresh(&self, stale: &Token) -> Result<Token> {
        let mut slot = self.slot.lock().await;
        if let Some(current) = slot.as_ref()
            && current != stale
        {
            return Ok(current.clone());
        }

        *slot = None;
        let token = self.request_new_token().await?;
        *slot = Some(token.clone());
        Ok(token)
    }

    /// Number of token requests issued so far
    pub fn requests_made(&self) -> u64 {
        self.requests_made.load(Ordering::SeqCst)
    }

    async fn request_new_token(&self) -> Result<Token> {
        let url = self.client.token_url();
        tracing::info!(url = %url, "Requesting new token");
        let made = self.requests_made.fetch_add(1, Ordering::SeqCst) + 1;

        let body = TokenRequest {
            key: self.credentials.key(),
            secret: self.credentials.secret(),
        };
        let response = self
            .client
            .post_json(&url, None, &body)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Unable to get token");
                Error::Auth {
                    message: format!("couldn't request the access token: {e}"),
                }
            })?;

        let token = match response.get("token").and_then(|t| t.as_str()) {
            Some(value) => Token::new(value)?,
            None => {
                let reason = response
                    .get("status")
                    .or_else(|| response.get("message"))
                    .and_then(|m| m.as_str())
                    .unwrap_or("response has no token field");
                tracing::error!(reason = %reason, "Unable to get token");
                return Err(Error::Auth {
                    message: format!("cannot get authentication token: {reason}"),
                });
            }
        };

        self.event_tx
            .send(Event::TokenAcquired {
                requests_made: made,
            })
            .ok();
        Ok(token)
    }
}

impl std::fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenProvider")
            .field("credentials", &self.credentials)
            .field("requests_made", &self.requests_made())
            .finish_non_exhaustive()
    }
}
