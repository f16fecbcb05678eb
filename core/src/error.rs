//! Error types for the LMS client.
//!
//! # Design
//! Failures are never handled inside the core. Transport and decode errors
//! surface from the I/O boundary and `RemoteRejection` is produced only when
//! a caller (or a read operation) asks for a successful status explicitly.
//! `InvalidArgument` covers structural preconditions; the write inputs encode
//! theirs in their types (student ids are a `Vec<u64>`), so content such as
//! a blank name is left for the server to judge.

/// A specialized `Result` type for LMS client operations.
pub type Result<T> = std::result::Result<T, LmsError>;

/// Errors returned by `LmsClient`, the resource model and transports.
#[derive(Debug, thiserror::Error)]
pub enum LmsError {
    /// The request never produced a response (connection, DNS, timeout).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response body was not valid JSON, or not the expected shape.
    #[error("could not decode response: {0}")]
    Decode(String),

    /// A caller-supplied value violated a precondition. No request was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The server answered with a non-success status.
    #[error("remote rejected request with HTTP {status}: {body}")]
    RemoteRejection { status: u16, body: String },

    /// Connection settings could not be read from the environment.
    #[error("configuration error: {0}")]
    Config(String),
}
