//! Error types for clarity-dl
//!
//! This module provides the error handling for the library:
//! - One error kind per stage of the job lifecycle (auth, submit, poll, fetch)
//! - Machine-readable error codes for callers that branch on the category
//! - Context information (job ID, HTTP status, configuration key)

use std::time::Duration;
use thiserror::Error;

use crate::types::JobId;

/// Result type alias for clarity-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for clarity-dl
///
/// Every variant is unrecoverable at the point it is raised. The only recovery
/// the library performs is the single token refresh inside status polling.
#[derive(Debug, Error)]
pub enum Error {
    /// The token request failed or its response had no `token` field
    #[error("authentication error: {message}")]
    Auth {
        /// Human-readable description of the failure
        message: String,
    },

    /// The job submission failed or its response had no usable `uuid`
    #[error("job submission failed: {message}")]
    Submission {
        /// Human-readable description of the failure
        message: String,
    },

    /// The status endpoint could not be queried, even after a token refresh
    #[error("error requesting the status of job {job_id}: {message}")]
    Poll {
        /// The job being polled
        job_id: JobId,
        /// Human-readable description of the failure
        message: String,
    },

    /// The job reached a terminal status other than success
    #[error("job {job_id} didn't finish correctly, status: {status}")]
    JobFailed {
        /// The failed job
        job_id: JobId,
        /// Status string reported by the server
        status: String,
    },

    /// Downloading the job result failed
    #[error("error downloading result of job {job_id}: {message}")]
    Download {
        /// The job whose result could not be fetched
        job_id: JobId,
        /// Human-readable description, including the HTTP status where known
        message: String,
    },

    /// The caller cancelled the wait for the job
    #[error("waiting for job {job_id} was cancelled")]
    Cancelled {
        /// The job that was being waited on
        job_id: JobId,
    },

    /// The configured polling deadline elapsed before the job finished
    #[error("job {job_id} did not finish within {waited:?}")]
    DeadlineExceeded {
        /// The job that was being waited on
        job_id: JobId,
        /// The deadline that elapsed
        waited: Duration,
    },

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "base_url")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a configuration error tied to a key
    pub(crate) fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }

    /// Get the machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Auth { .. } => "auth_error",
            Error::Submission { .. } => "submission_error",
            Error::Poll { .. } => "poll_error",
            Error::JobFailed { .. } => "job_failed",
            Error::Download { .. } => "download_error",
            Error::Cancelled { .. } => "cancelled",
            Error::DeadlineExceeded { .. } => "deadline_exceeded",
            Error::Config { .. } => "config_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
        }
    }

    /// The job this error refers to, if any
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            Error::Poll { job_id, .. }
            | Error::JobFailed { job_id, .. }
            | Error::Download { job_id, .. }
            | Error::Cancelled { job_id }
            | Error::DeadlineExceeded { job_id, .. } => Some(job_id),
            _ => None,
        }
    }
}

/// Failure of a single HTTP exchange
///
/// Never returned to callers directly: each component folds it into its own
/// [`Error`] kind.
#[derive(Debug, Error)]
pub(crate) enum TransportError {
    /// The server answered with a status outside the accepted set
    #[error("request finished with status code {status}")]
    Status {
        /// HTTP status code
        status: u16,
    },

    /// The request could not be sent or the body could not be read
    #[error("couldn't make the request: {0}")]
    Request(#[from] reqwest::Error),

    /// The body was not the expected JSON document
    #[error("couldn't decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl TransportError {
    /// HTTP status code, when the server answered at all
    pub(crate) fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status } => Some(*status),
            TransportError::Request(e) => e.status().map(|s| s.as_u16()),
            TransportError::Decode(_) => None,
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: &str) -> JobId {
        JobId::parse(id).unwrap()
    }

    #[test]
    fn job_failed_message_names_job_and_status() {
        let err = Error::JobFailed {
            job_id: job("J1"),
            status: "ERROR".into(),
        };

        let msg = err.to_string();
        assert!(msg.contains("J1"), "message should include job id: {msg}");
        assert!(msg.contains("ERROR"), "message should include status: {msg}");
        assert_eq!(err.error_code(), "job_failed");
    }

    #[test]
    fn download_error_carries_http_status_in_message() {
        let err = Error::Download {
            job_id: job("J2"),
            message: "status code 404".into(),
        };

        assert!(err.to_string().contains("404"));
        assert_eq!(err.job_id().map(JobId::as_str), Some("J2"));
    }

    #[test]
    fn error_codes_are_distinct_per_lifecycle_stage() {
        let errors = [
            Error::Auth {
                message: "x".into(),
            },
            Error::Submission {
                message: "x".into(),
            },
            Error::Poll {
                job_id: job("a"),
                message: "x".into(),
            },
            Error::JobFailed {
                job_id: job("a"),
                status: "FAILED".into(),
            },
            Error::Download {
                job_id: job("a"),
                message: "x".into(),
            },
            Error::Cancelled { job_id: job("a") },
            Error::DeadlineExceeded {
                job_id: job("a"),
                waited: Duration::from_secs(1),
            },
        ];

        let mut codes: Vec<_> = errors.iter().map(Error::error_code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn errors_without_job_context_have_no_job_id() {
        let err = Error::Auth {
            message: "no token".into(),
        };
        assert!(err.job_id().is_none());

        let err = Error::config("base_url", "bad");
        assert!(err.job_id().is_none());
        match err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("base_url")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn transport_status_is_exposed() {
        let err = TransportError::Status { status: 401 };
        assert_eq!(err.status(), Some(401));
        assert!(err.to_string().contains("401"));
    }
}
