//! AWS Signature Version 4 request signing for dynawire.
//!
//! The client-side half of SigV4: given an outgoing request, its body and a
//! set of [`Credentials`], add `x-amz-date`, the optional
//! `x-amz-security-token` and the `authorization` header.
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use dynawire_auth::{Credentials, SigningParams, sign_request};
//!
//! let credentials = Credentials::new("AKIDEXAMPLE", "secret");
//! let params = SigningParams {
//!     credentials: &credentials,
//!     region: "us-east-1",
//!     service: "dynamodb",
//!     time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
//! };
//! let (mut parts, ()) = http::Request::post("http://localhost:8000/")
//!     .body(())
//!     .unwrap()
//!     .into_parts();
//! sign_request(&mut parts, b"{}", &params).unwrap();
//! assert!(parts.headers.contains_key(http::header::AUTHORIZATION));
//! ```
//!
//! # Modules
//!
//! - [`canonical`] - Canonical request construction
//! - [`credentials`] - Access key material
//! - [`error`] - Signing error types
//! - [`sigv4`] - Signing key derivation and request signing

pub mod canonical;
pub mod credentials;
pub mod error;
pub mod sigv4;

pub use credentials::Credentials;
pub use error::SigningError;
pub use sigv4::{SigningParams, hash_payload, sign_request};
