//! DynamoDB error types.
//!
//! Two families live here:
//!
//! - [`ValueError`] is raised locally when an `AttributeValue` violates the
//!   value model (invalid sets or numbers on encode, malformed wire objects
//!   on decode).
//! - [`ValidationError`] is raised when a request shape breaks a local rule.
//! - [`DynamoDBErrorCode`] names the error codes the service reports in the
//!   `__type` field of an error body, parsed from an [`ErrorResponse`].

use std::fmt;

use serde::Deserialize;

/// Value model violation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    /// The value cannot be encoded (empty or duplicated set, bad number).
    #[error("invalid attribute value: {0}")]
    InvalidValue(String),

    /// The wire object does not describe exactly one well-formed value.
    #[error("malformed attribute value: {0}")]
    MalformedValue(String),
}

/// A request shape that breaks a local rule (operator arity, mutually
/// exclusive fields, key schema shape).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    /// Create a validation error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<ValueError> for ValidationError {
    fn from(err: ValueError) -> Self {
        Self(err.to_string())
    }
}

/// Well-known DynamoDB error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DynamoDBErrorCode {
    /// Table is being created, updated or deleted.
    ResourceInUseException,
    /// Table or index not found.
    ResourceNotFoundException,
    /// Condition check failed.
    ConditionalCheckFailedException,
    /// Item collection size limit exceeded.
    ItemCollectionSizeLimitExceededException,
    /// Provisioned throughput exceeded.
    ProvisionedThroughputExceededException,
    /// Account-level request limit exceeded.
    RequestLimitExceeded,
    /// Request throttled.
    ThrottlingException,
    /// Too many concurrent control plane operations.
    LimitExceededException,
    /// Validation error.
    ValidationException,
    /// Serialization error.
    SerializationException,
    /// Internal server error.
    InternalServerError,
    /// Service temporarily unavailable.
    ServiceUnavailable,
    /// Missing action.
    MissingAction,
    /// Access denied.
    AccessDeniedException,
    /// Unknown access key or operation.
    UnrecognizedClientException,
    /// Request signature rejected.
    InvalidSignatureException,
    /// Session credentials expired.
    ExpiredTokenException,
}

impl DynamoDBErrorCode {
    const ALL: [Self; 17] = [
        Self::ResourceInUseException,
        Self::ResourceNotFoundException,
        Self::ConditionalCheckFailedException,
        Self::ItemCollectionSizeLimitExceededException,
        Self::ProvisionedThroughputExceededException,
        Self::RequestLimitExceeded,
        Self::ThrottlingException,
        Self::LimitExceededException,
        Self::ValidationException,
        Self::SerializationException,
        Self::InternalServerError,
        Self::ServiceUnavailable,
        Self::MissingAction,
        Self::AccessDeniedException,
        Self::UnrecognizedClientException,
        Self::InvalidSignatureException,
        Self::ExpiredTokenException,
    ];

    /// Returns the fully-qualified error type string as sent in `__type`.
    #[must_use]
    pub fn error_type(&self) -> String {
        match self {
            Self::ValidationException => "com.amazon.coral.validate#ValidationException".to_owned(),
            Self::ThrottlingException
            | Self::ServiceUnavailable
            | Self::MissingAction
            | Self::AccessDeniedException
            | Self::UnrecognizedClientException
            | Self::InvalidSignatureException
            | Self::ExpiredTokenException => {
                format!("com.amazon.coral.service#{}", self.as_str())
            }
            _ => format!("com.amazonaws.dynamodb.v20120810#{}", self.as_str()),
        }
    }

    /// Returns the short error code string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResourceInUseException => "ResourceInUseException",
            Self::ResourceNotFoundException => "ResourceNotFoundException",
            Self::ConditionalCheckFailedException => "ConditionalCheckFailedException",
            Self::ItemCollectionSizeLimitExceededException => {
                "ItemCollectionSizeLimitExceededException"
            }
            Self::ProvisionedThroughputExceededException => {
                "ProvisionedThroughputExceededException"
            }
            Self::RequestLimitExceeded => "RequestLimitExceeded",
            Self::ThrottlingException => "ThrottlingException",
            Self::LimitExceededException => "LimitExceededException",
            Self::ValidationException => "ValidationException",
            Self::SerializationException => "SerializationException",
            Self::InternalServerError => "InternalServerError",
            Self::ServiceUnavailable => "ServiceUnavailable",
            Self::MissingAction => "MissingAction",
            Self::AccessDeniedException => "AccessDeniedException",
            Self::UnrecognizedClientException => "UnrecognizedClientException",
            Self::InvalidSignatureException => "InvalidSignatureException",
            Self::ExpiredTokenException => "ExpiredTokenException",
        }
    }

    /// Parse a `__type` value (either fully-qualified or the short code).
    ///
    /// Everything up to the last `#` is a namespace and is ignored, as is a
    /// trailing `:`-separated suffix some endpoints append.
    #[must_use]
    pub fn from_type(error_type: &str) -> Option<Self> {
        let short = error_type.rsplit('#').next().unwrap_or(error_type);
        let short = short.split(':').next().unwrap_or(short).trim();
        Self::ALL.into_iter().find(|code| code.as_str() == short)
    }

    /// Returns `true` for codes that signal exhausted capacity.
    #[must_use]
    pub fn is_throttling(&self) -> bool {
        matches!(
            self,
            Self::ProvisionedThroughputExceededException
                | Self::RequestLimitExceeded
                | Self::ThrottlingException
        )
    }
}

impl fmt::Display for DynamoDBErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The JSON body of a DynamoDB error response.
///
/// ```json
/// {
///   "__type": "com.amazonaws.dynamodb.v20120810#ResourceNotFoundException",
///   "message": "Requested resource not found"
/// }
/// ```
///
/// The service is inconsistent about `message` vs `Message`; both are accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorResponse {
    /// The fully-qualified error type.
    #[serde(rename = "__type", default)]
    pub error_type: Option<String>,
    /// The human-readable error message.
    #[serde(rename = "message", alias = "Message", default)]
    pub message: Option<String>,
}

impl ErrorResponse {
    /// Parse an error body, returning `None` when it is not a JSON object.
    #[must_use]
    pub fn parse(body: &[u8]) -> Option<Self> {
        serde_json::from_slice(body).ok()
    }

    /// The parsed error code, if the `__type` is a known one.
    #[must_use]
    pub fn code(&self) -> Option<DynamoDBErrorCode> {
        self.error_type
            .as_deref()
            .and_then(DynamoDBErrorCode::from_type)
    }

    /// The short code as reported, even when it is not a known one.
    #[must_use]
    pub fn raw_code(&self) -> Option<&str> {
        self.error_type
            .as_deref()
            .map(|t| t.rsplit('#').next().unwrap_or(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_parse_fully_qualified_type() {
        let code = DynamoDBErrorCode::from_type(
            "com.amazonaws.dynamodb.v20120810#ConditionalCheckFailedException",
        );
        assert_eq!(
            code,
            Some(DynamoDBErrorCode::ConditionalCheckFailedException)
        );
    }

    #[test]
    fn test_should_roundtrip_every_error_type() {
        for code in DynamoDBErrorCode::ALL {
            assert_eq!(DynamoDBErrorCode::from_type(&code.error_type()), Some(code));
        }
    }

    #[test]
    fn test_should_ignore_type_suffix() {
        let code =
            DynamoDBErrorCode::from_type("ResourceInUseException:http://internal.amazon.com/");
        assert_eq!(code, Some(DynamoDBErrorCode::ResourceInUseException));
    }

    #[test]
    fn test_should_reject_unknown_type() {
        assert_eq!(DynamoDBErrorCode::from_type("com.example#Whatever"), None);
    }

    #[test]
    fn test_should_parse_error_body_with_either_message_casing() {
        let lower = ErrorResponse::parse(
            br#"{"__type":"com.amazon.coral.validate#ValidationException","message":"bad"}"#,
        )
        .unwrap();
        assert_eq!(lower.code(), Some(DynamoDBErrorCode::ValidationException));
        assert_eq!(lower.message.as_deref(), Some("bad"));

        let upper = ErrorResponse::parse(
            br#"{"__type":"com.amazonaws.dynamodb.v20120810#ResourceNotFoundException","Message":"gone"}"#,
        )
        .unwrap();
        assert_eq!(upper.code(), Some(DynamoDBErrorCode::ResourceNotFoundException));
        assert_eq!(upper.message.as_deref(), Some("gone"));
    }

    #[test]
    fn test_should_keep_raw_code_for_unknown_errors() {
        let body = ErrorResponse::parse(br#"{"__type":"com.example#TeapotException"}"#).unwrap();
        assert_eq!(body.code(), None);
        assert_eq!(body.raw_code(), Some("TeapotException"));
    }

    #[test]
    fn test_should_not_parse_non_json_body() {
        assert!(ErrorResponse::parse(b"<html>502</html>").is_none());
    }

    #[test]
    fn test_should_flag_throttling_codes() {
        assert!(DynamoDBErrorCode::ProvisionedThroughputExceededException.is_throttling());
        assert!(DynamoDBErrorCode::ThrottlingException.is_throttling());
        assert!(!DynamoDBErrorCode::ValidationException.is_throttling());
    }
}
