//! [`Transport`] over a hyper client, with SigV4 signing and CRC32 checks.

use std::fmt;

use bytes::Bytes;
use chrono::Utc;
use dynawire_auth::{Credentials, SigningParams, sign_request};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, Method, Request, Response, Uri};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper_util::client::legacy::Client as HyperClient;
use hyper_util::client::legacy::connect::{Connect, HttpConnector};
use hyper_util::rt::TokioExecutor;
use tracing::trace;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::transport::{SendFuture, Transport, TransportFailure};

/// Content type of every request and response body.
pub const CONTENT_TYPE_JSON: &str = "application/x-amz-json-1.0";

const X_AMZ_TARGET: &str = "x-amz-target";
const X_AMZ_CRC32: &str = "x-amz-crc32";
const SIGNING_SERVICE: &str = "dynamodb";

/// Signs and POSTs requests to a single endpoint.
pub struct HyperTransport<C = HttpConnector> {
    client: HyperClient<C, Full<Bytes>>,
    endpoint: Uri,
    region: String,
    credentials: Credentials,
    verify_crc32: bool,
}

impl HyperTransport {
    /// Plain-HTTP transport for `config.endpoint_url`.
    pub fn new(config: &ClientConfig, credentials: Credentials) -> Result<Self, ClientError> {
        let client = HyperClient::builder(TokioExecutor::new()).build_http();
        Self::with_client(client, config, credentials)
    }
}

impl<C> HyperTransport<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    /// Wrap an existing hyper client, e.g. one built with a TLS connector.
    pub fn with_client(
        client: HyperClient<C, Full<Bytes>>,
        config: &ClientConfig,
        credentials: Credentials,
    ) -> Result<Self, ClientError> {
        let endpoint: Uri = config.endpoint_url.parse().map_err(|e| {
            ClientError::Validation(format!("invalid endpoint {}: {e}", config.endpoint_url))
        })?;
        if endpoint.authority().is_none() {
            return Err(ClientError::Validation(format!(
                "endpoint {} has no host",
                config.endpoint_url
            )));
        }
        Ok(Self {
            client,
            endpoint,
            region: config.region.clone(),
            credentials,
            verify_crc32: config.verify_crc32,
        })
    }

    async fn round_trip(&self, target: String, body: Bytes) -> Result<Bytes, TransportFailure> {
        let (mut parts, ()) = Request::builder()
            .method(Method::POST)
            .uri(self.endpoint.clone())
            .header(CONTENT_TYPE, CONTENT_TYPE_JSON)
            .header(X_AMZ_TARGET, target)
            .body(())
            .map_err(TransportFailure::io)?
            .into_parts();

        let params = SigningParams {
            credentials: &self.credentials,
            region: &self.region,
            service: SIGNING_SERVICE,
            time: Utc::now(),
        };
        sign_request(&mut parts, &body, &params).map_err(TransportFailure::io)?;

        let response: Response<Incoming> = self
            .client
            .request(Request::from_parts(parts, Full::new(body)))
            .await
            .map_err(TransportFailure::io)?;
        let (parts, incoming) = response.into_parts();
        let bytes = incoming
            .collect()
            .await
            .map_err(TransportFailure::io)?
            .to_bytes();
        trace!(status = %parts.status, response_bytes = bytes.len(), "received response");

        if self.verify_crc32 {
            check_crc32(&parts.headers, &bytes)?;
        }
        if !parts.status.is_success() {
            return Err(TransportFailure::http(parts.status.as_u16(), bytes));
        }
        Ok(bytes)
    }
}

impl<C> Transport for HyperTransport<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    fn send(&self, target: &str, body: Bytes) -> SendFuture<'_> {
        Box::pin(self.round_trip(target.to_owned(), body))
    }
}

impl<C> fmt::Debug for HyperTransport<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HyperTransport")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("credentials", &self.credentials)
            .field("verify_crc32", &self.verify_crc32)
            .finish_non_exhaustive()
    }
}

/// Compare the `x-amz-crc32` header, when present, with the body checksum.
fn check_crc32(headers: &HeaderMap, body: &[u8]) -> Result<(), TransportFailure> {
    let Some(value) = headers.get(X_AMZ_CRC32) else {
        return Ok(());
    };
    let expected = value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
        .ok_or_else(|| TransportFailure::io(format!("unparseable {X_AMZ_CRC32} header")))?;
    let actual = crc32fast::hash(body);
    if expected != actual {
        return Err(TransportFailure::io(format!(
            "{X_AMZ_CRC32} mismatch: header {expected}, body {actual}"
        )));
    }
    Ok(())
}
