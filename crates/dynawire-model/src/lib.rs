//! DynamoDB model types for dynawire.
//!
//! This crate holds everything a client needs to talk the DynamoDB
//! `awsJson1_0` protocol without any transport: the `AttributeValue` tagged
//! union and its wire encoding, item/key helpers, the request and response
//! shapes of the thirteen supported operations, and the wire error codes.
#![allow(clippy::struct_excessive_bools)]

pub mod attribute_value;
pub mod error;
pub mod input;
pub mod item;
pub mod operations;
pub mod output;
pub mod types;

pub use attribute_value::AttributeValue;
pub use error::{DynamoDBErrorCode, ErrorResponse, ValidationError, ValueError};
pub use item::{Item, Key, KeySchema, TableSchema};
pub use operations::DynamoDBOperation;
