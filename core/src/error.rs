//! Error types for the swift-cloud client.
//!
//! # Design
//! Every failure the caller can observe has its own variant so callers can
//! tell a local precondition failure from a credential problem from a server
//! that is simply unreachable. The 401/402/403/426 responses share
//! `Unauthorized` and differ only in their message. Unrecognized non-200
//! responses land in `UnknownService` with the raw status code and body for
//! debugging.

use thiserror::Error;

/// Errors returned by `SwiftCloudClient` and `CloudApi` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Inputs failed a local precondition. Raised before any network I/O.
    #[error("invalid input: {0}")]
    Validation(String),

    /// No network path is available; the request was never built.
    #[error("no internet connectivity: {0}")]
    NoConnectivity(String),

    /// A bearer token could not be obtained.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The server returned 400; the message is the response body.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The server returned 401, 402, 403 or 426.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The server returned 504.
    #[error("the cloud service timed out")]
    Timeout,

    /// The server returned a non-200 status without a dedicated mapping.
    #[error("unknown cloud service error (HTTP {status}): {body}")]
    UnknownService { status: u16, body: String },

    /// The connection to the service could not be established at all.
    #[error("connection with the cloud service could not be established: {0}")]
    ServiceUnreachable(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}
