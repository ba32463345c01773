//! Core types for clarity-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Server-assigned identifier of an asynchronous job
///
/// Opaque to the library, but validated on construction because it is used
/// both as a URL path segment and as a file name in the scratch directory.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobId(String);

impl JobId {
    /// Validate and wrap a job ID
    ///
    /// Rejects empty IDs, IDs containing path separators or NUL, and the
    /// special names `.` and `..`.
    pub fn parse(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::Submission {
                message: "job id is empty".to_string(),
            });
        }
        if id == "." || id == ".." || id.contains(['/', '\\', '\0']) {
            return Err(Error::Submission {
                message: format!("job id '{}' is not a valid file name", id.escape_debug()),
            });
        }
        Ok(Self(id))
    }

    /// Borrow the raw ID
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for JobId {
    type Error = Error;

    fn try_from(id: String) -> Result<Self> {
        Self::parse(id)
    }
}

impl From<JobId> for String {
    fn from(id: JobId) -> Self {
        id.0
    }
}

/// Status of a job as reported by the status endpoint
///
/// `Running` is the only non-terminal state. Any wire value other than
/// `RUNNING` or `SUCCESS` maps to `Failed` and carries the raw string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    /// Still being computed server-side
    Running,
    /// Finished, result ready to fetch
    Success,
    /// Finished with any other status (the server's status string)
    Failed(String),
}

impl JobStatus {
    /// Wire value of the in-progress marker
    pub const RUNNING: &'static str = "RUNNING";
    /// Wire value of the success marker
    pub const SUCCESS: &'static str = "SUCCESS";

    /// Map a `statusMessage` value to a status
    pub fn from_wire(status: &str) -> Self {
        match status {
            Self::RUNNING => JobStatus::Running,
            Self::SUCCESS => JobStatus::Success,
            other => JobStatus::Failed(other.to_string()),
        }
    }

    /// The status string as the server spells it
    pub fn as_wire(&self) -> &str {
        match self {
            JobStatus::Running => Self::RUNNING,
            JobStatus::Success => Self::SUCCESS,
            JobStatus::Failed(status) => status,
        }
    }

    /// Whether polling should stop
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Running)
    }
}

impl From<String> for JobStatus {
    fn from(status: String) -> Self {
        Self::from_wire(&status)
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Failed(status) => status,
            other => other.as_wire().to_string(),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// A submitted job and its last known status
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Server-assigned ID
    pub id: JobId,
    /// Last status observed
    pub status: JobStatus,
    /// When the submission was accepted
    pub submitted_at: DateTime<Utc>,
}

impl Job {
    /// A freshly submitted job (status `Running`)
    pub fn submitted(id: JobId) -> Self {
        Self {
            id,
            status: JobStatus::Running,
            submitted_at: Utc::now(),
        }
    }
}

/// A job request: which async endpoint to call and with what body
///
/// The payload is opaque to the library and sent as-is.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    /// Path below `/clarity/v1/public`, e.g. `/securities/esg-risk/scores-by-id/async`
    pub api_path: String,
    /// JSON body of the request
    #[serde(default)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl SubmissionRequest {
    /// Create a request from an API path and a JSON object
    ///
    /// Fails with [`Error::Submission`] if `payload` is not a JSON object.
    pub fn new(api_path: impl Into<String>, payload: serde_json::Value) -> Result<Self> {
        match payload {
            serde_json::Value::Object(payload) => Ok(Self {
                api_path: api_path.into(),
                payload,
            }),
            other => Err(Error::Submission {
                message: format!("payload must be a JSON object, got {other}"),
            }),
        }
    }
}

/// Event emitted during the job lifecycle
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A new bearer token was obtained
    TokenAcquired {
        /// Number of token requests made so far by this provider
        requests_made: u64,
    },

    /// A job was accepted by the API
    JobSubmitted {
        /// Job ID
        job_id: JobId,
        /// Path the job was submitted to
        api_path: String,
    },

    /// A status query returned
    StatusChecked {
        /// Job ID
        job_id: JobId,
        /// Status reported
        status: JobStatus,
        /// 1-based poll number
        attempt: u32,
    },

    /// The job reached `SUCCESS`
    JobCompleted {
        /// Job ID
        job_id: JobId,
    },

    /// The job reached a non-success terminal status
    JobFailed {
        /// Job ID
        job_id: JobId,
        /// Status reported
        status: String,
    },

    /// The job result was written to disk
    ResultDownloaded {
        /// Job ID
        job_id: JobId,
        /// Final path of the result file
        path: PathBuf,
        /// File size in bytes
        size_bytes: u64,
    },
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_rejects_values_unsafe_as_file_names() {
        for bad in ["", ".", "..", "a/b", "..\\x", "nul\0byte"] {
            let err = JobId::parse(bad).unwrap_err();
            assert_eq!(err.error_code(), "submission_error", "{bad:?} should be rejected");
        }
    }

    #[test]
    fn job_id_accepts_uuid_like_values() {
        let id = JobId::parse("3f0c2b8e-51b1-4d8f-9d0a-8a1f6a7c2e10").unwrap();
        assert_eq!(id.to_string(), "3f0c2b8e-51b1-4d8f-9d0a-8a1f6a7c2e10");
    }

    #[test]
    fn job_id_deserialization_validates() {
        let ok: JobId = serde_json::from_str(r#""J1""#).unwrap();
        assert_eq!(ok.as_str(), "J1");
        assert!(serde_json::from_str::<JobId>(r#""../etc""#).is_err());
    }

    #[test]
    fn only_running_is_non_terminal() {
        assert_eq!(JobStatus::from_wire("RUNNING"), JobStatus::Running);
        assert_eq!(JobStatus::from_wire("SUCCESS"), JobStatus::Success);
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Success.is_terminal());

        for other in ["ERROR", "FAILED", "running", "", "QUEUED"] {
            let status = JobStatus::from_wire(other);
            assert_eq!(status, JobStatus::Failed(other.to_string()));
            assert!(status.is_terminal(), "{other:?} must end polling");
        }
    }

    #[test]
    fn job_status_keeps_server_spelling() {
        assert_eq!(JobStatus::from_wire("TIMEOUT").to_string(), "TIMEOUT");
        let json = serde_json::to_string(&JobStatus::Success).unwrap();
        assert_eq!(json, r#""SUCCESS""#);
    }

    #[test]
    fn submission_request_requires_object_payload() {
        let req =
            SubmissionRequest::new("/x/async", serde_json::json!({"a": 1})).unwrap();
        assert_eq!(req.payload["a"], 1);

        let err = SubmissionRequest::new("/x/async", serde_json::json!([1, 2])).unwrap_err();
        assert_eq!(err.error_code(), "submission_error");
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let event = Event::StatusChecked {
            job_id: JobId::parse("J1").unwrap(),
            status: JobStatus::Running,
            attempt: 2,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "status_checked");
        assert_eq!(value["job_id"], "J1");
        assert_eq!(value["status"], "RUNNING");
    }
}
