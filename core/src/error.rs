//! Error types for the comments API client.
//!
//! # Design
//! Only write operations surface these to callers. Read operations convert
//! every failure into an empty result, so they use `ApiError` internally to
//! decide when to fall back and what to log.

use thiserror::Error;

/// Errors returned by `CommentClient` parse methods and `CommentApi` writes.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body could not be parsed into the expected shape.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The request never produced a response (connect, DNS, timeout, I/O).
    #[error("transport failed: {0}")]
    Transport(String),

    /// A required input was missing. Raised before any request is issued.
    #[error("{0} is required")]
    MissingField(&'static str),
}
