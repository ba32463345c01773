//! Job lifecycle components.
//!
//! Each stage of a download is a separate component sharing one
//! [`ApiClient`](crate::http::ApiClient) and one
//! [`TokenProvider`](crate::auth::TokenProvider):
//! - [`JobSubmitter`] - post the job request and read back its ID
//! - [`StatusPoller`] - query the job status until it is terminal
//! - [`ResultFetcher`] - stream the finished result to disk

mod fetch;
mod poll;
mod submit;

pub use fetch::ResultFetcher;
pub use poll::StatusPoller;
pub use submit::JobSubmitter;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
