//! Error types for request signing.

/// Errors that can occur while signing a request.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    /// A required credential environment variable is not set.
    #[error("Missing credential: {0} is not set")]
    MissingCredential(&'static str),

    /// The request has neither a `host` header nor an authority in its URI.
    #[error("Request has no host to sign")]
    MissingHost,

    /// A header value is not visible ASCII and cannot be signed.
    #[error("Header {0} has a non-ASCII value")]
    InvalidHeaderValue(String),

    /// A computed header could not be inserted into the request.
    #[error("Generated header {0} is not a valid header value")]
    InvalidGeneratedHeader(&'static str),

    /// The HMAC key could not be initialized.
    #[error("Invalid HMAC key length")]
    InvalidKey,
}
