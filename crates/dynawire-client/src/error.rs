//! Client error taxonomy and classification of transport failures.

use dynawire_model::{DynamoDBErrorCode, ErrorResponse, ValidationError, ValueError};

use crate::transport::TransportFailure;

/// Every way a client call can fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The request broke a local rule, or the server answered with
    /// `ValidationException`/`SerializationException`.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A write's condition evaluated to false on the server.
    #[error("conditional check failed: {0}")]
    ConditionalCheckFailed(String),

    /// The table or index does not exist (or is not yet active).
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// The table is in a state that does not allow the operation.
    #[error("resource in use: {0}")]
    ResourceInUse(String),

    /// Throughput was exceeded, the request was throttled, or a batch
    /// came back entirely unprocessed.
    #[error("provisioned throughput exceeded: {0}")]
    ProvisionedThroughputExceeded(String),

    /// A value in the request violates the value model.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// The response does not follow the wire contract.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Any other error code reported by the server.
    #[error("{code} ({status}): {message}")]
    Service {
        /// The short error code, e.g. `InternalServerError`.
        code: String,
        /// The server's message.
        message: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The request never produced a recognizable server answer.
    #[error("transport failure (status {status:?}): {body}")]
    Transport {
        /// The HTTP status, if a response was received at all.
        status: Option<u16>,
        /// The raw body or connection error text.
        body: String,
    },

    /// The call timed out or the caller cancelled it.
    #[error("request cancelled")]
    Cancelled,
}

impl ClientError {
    /// Whether a later retry of the same request could succeed.
    ///
    /// Informational only: the client itself never retries.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ProvisionedThroughputExceeded(_) => true,
            Self::Service { status, .. } => *status >= 500,
            Self::Transport { status, .. } => status.is_none_or(|s| s >= 500),
            _ => false,
        }
    }

    /// Classify a transport failure by its status and error body.
    #[must_use]
    pub fn from_failure(failure: &TransportFailure) -> Self {
        let body = String::from_utf8_lossy(&failure.body).into_owned();
        let Some(status) = failure.status else {
            return Self::Transport { status: None, body };
        };
        let Some(response) = ErrorResponse::parse(&failure.body) else {
            return Self::Transport {
                status: Some(status),
                body,
            };
        };
        let message = response.message.clone().unwrap_or_default();
        match response.code() {
            Some(
                DynamoDBErrorCode::ValidationException
                | DynamoDBErrorCode::SerializationException,
            ) => Self::Validation(message),
            Some(DynamoDBErrorCode::ConditionalCheckFailedException) => {
                Self::ConditionalCheckFailed(message)
            }
            Some(DynamoDBErrorCode::ResourceNotFoundException) => Self::ResourceNotFound(message),
            Some(DynamoDBErrorCode::ResourceInUseException) => Self::ResourceInUse(message),
            Some(code) if code.is_throttling() => Self::ProvisionedThroughputExceeded(message),
            Some(code) => Self::Service {
                code: code.as_str().to_owned(),
                message,
                status,
            },
            None => match response.raw_code() {
                Some(code) => Self::Service {
                    code: code.to_owned(),
                    message,
                    status,
                },
                None => Self::Transport {
                    status: Some(status),
                    body,
                },
            },
        }
    }
}

impl From<ValueError> for ClientError {
    fn from(err: ValueError) -> Self {
        match err {
            ValueError::InvalidValue(msg) => Self::InvalidValue(msg),
            ValueError::MalformedValue(msg) => Self::MalformedResponse(msg),
        }
    }
}

impl From<ValidationError> for ClientError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.0)
    }
}

/// Shorthand for a local validation failure.
pub(crate) fn invalid(message: impl Into<String>) -> ClientError {
    ClientError::Validation(message.into())
}
