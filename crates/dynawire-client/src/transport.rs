//! The transport boundary between the dispatcher and the network.
//!
//! The dispatcher knows nothing about HTTP, signing or endpoints. A
//! [`Transport`] receives the `X-Amz-Target` value and the JSON body, and
//! answers with the response body or a [`TransportFailure`]. Credentials and
//! region belong to the transport instance.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

/// The boxed future returned by [`Transport::send`].
pub type SendFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Bytes, TransportFailure>> + Send + 'a>>;

/// Sends one signed request and returns the raw response body.
///
/// Implementations must not retry: a call to `send` is exactly one attempt.
pub trait Transport: Send + Sync + 'static {
    /// POST `body` with the given `X-Amz-Target`.
    ///
    /// Non-2xx responses are returned as a failure carrying the status and
    /// body; connection-level errors carry no status.
    fn send(&self, target: &str, body: Bytes) -> SendFuture<'_>;
}

/// A request that did not produce a 2xx response.
#[derive(Clone, PartialEq, Eq)]
pub struct TransportFailure {
    /// The HTTP status, or `None` if no response was received.
    pub status: Option<u16>,
    /// The response body, or the error text for status-less failures.
    pub body: Bytes,
}

impl TransportFailure {
    /// A failure that produced an HTTP response.
    #[must_use]
    pub fn http(status: u16, body: Bytes) -> Self {
        Self {
            status: Some(status),
            body,
        }
    }

    /// A failure before any response arrived.
    #[must_use]
    pub fn io(error: impl fmt::Display) -> Self {
        Self {
            status: None,
            body: Bytes::from(error.to_string()),
        }
    }
}

impl fmt::Debug for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportFailure")
            .field("status", &self.status)
            .field("body", &String::from_utf8_lossy(&self.body))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_build_status_less_failure_from_error_text() {
        let failure = TransportFailure::io("connection refused");
        assert_eq!(failure.status, None);
        assert_eq!(failure.body, Bytes::from_static(b"connection refused"));
        assert!(format!("{failure:?}").contains("connection refused"));
    }
}
