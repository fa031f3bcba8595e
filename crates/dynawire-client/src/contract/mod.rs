//! Per-operation contracts.
//!
//! Each supported operation is a zero-sized marker type implementing
//! [`OperationContract`]. The dispatcher is generic over the contract, so the
//! wire path (encode, send, decode) is written once and the per-operation
//! rules live here as two explicit steps:
//!
//! - [`OperationContract::validate`] runs before anything is sent. A request
//!   that fails it never reaches the transport.
//! - [`OperationContract::finish`] post-processes a decoded response.

mod batch;
mod read;
mod table;
mod write;

use std::collections::HashMap;

use dynawire_model::types::{Condition, ConditionalOperator, ExpectedAttributeValue};
use dynawire_model::{AttributeValue, DynamoDBOperation, Item, Key, TableSchema};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ClientError, invalid};

pub use batch::{BatchGetItem, BatchWriteItem, MAX_BATCH_GET_KEYS, MAX_BATCH_WRITE_REQUESTS};
pub use read::{GetItem, Query, Scan};
pub use table::{CreateTable, DeleteTable, DescribeTable, ListTables, UpdateTable};
pub use write::{DeleteItem, PutItem, UpdateItem};

/// What a contract may consult while validating.
#[derive(Debug, Clone, Copy)]
pub struct ContractContext<'a> {
    schemas: &'a HashMap<String, TableSchema>,
}

impl<'a> ContractContext<'a> {
    /// A context over the registered table schemas.
    #[must_use]
    pub fn new(schemas: &'a HashMap<String, TableSchema>) -> Self {
        Self { schemas }
    }

    /// The registered schema for `table_name`, if any.
    #[must_use]
    pub fn schema(&self, table_name: &str) -> Option<&'a TableSchema> {
        self.schemas.get(table_name)
    }
}

/// The typed contract of one operation.
pub trait OperationContract {
    /// The operation, which names the `X-Amz-Target`.
    const OPERATION: DynamoDBOperation;

    /// The request shape.
    type Input: Serialize + Send + Sync;

    /// The response shape.
    type Output: DeserializeOwned + Send;

    /// Check the request before it is sent.
    fn validate(input: &Self::Input, ctx: &ContractContext<'_>) -> Result<(), ClientError>;

    /// Post-process a successfully decoded response.
    fn finish(input: &Self::Input, output: Self::Output) -> Result<Self::Output, ClientError> {
        let _ = input;
        Ok(output)
    }
}

// ---------------------------------------------------------------------------
// Shared checks
// ---------------------------------------------------------------------------

fn check_table_name(table_name: &str) -> Result<(), ClientError> {
    if table_name.is_empty() {
        return Err(invalid("TableName must not be empty"));
    }
    Ok(())
}

/// A key must be non-empty, hold only S/N/B values and, when the table
/// schema is registered, name exactly the key attributes.
fn check_key(key: &Key, table_name: &str, ctx: &ContractContext<'_>) -> Result<(), ClientError> {
    if key.is_empty() {
        return Err(invalid(format!("key for table {table_name} must not be empty")));
    }
    for (name, value) in key {
        if !value.is_key_scalar() {
            return Err(invalid(format!(
                "key attribute {name} must be S, N or B, got {}",
                value.type_descriptor()
            )));
        }
        value.validate()?;
    }
    if let Some(schema) = ctx.schema(table_name) {
        if !schema.key_schema.matches_key(key) {
            return Err(invalid(format!("key does not match the key schema of table {table_name}")));
        }
    }
    Ok(())
}

/// An item to write must be non-empty, hold valid values and, when the
/// table schema is registered, carry scalar key attributes.
fn check_item(item: &Item, table_name: &str, ctx: &ContractContext<'_>) -> Result<(), ClientError> {
    if item.is_empty() {
        return Err(invalid(format!("item for table {table_name} must not be empty")));
    }
    for value in item.values() {
        value.validate()?;
    }
    if let Some(schema) = ctx.schema(table_name) {
        let key = schema.key_schema.project(item).ok_or_else(|| {
            invalid(format!("item is missing key attributes of table {table_name}"))
        })?;
        if let Some((name, value)) = key.iter().find(|(_, v)| !v.is_key_scalar()) {
            return Err(invalid(format!(
                "key attribute {name} must be S, N or B, got {}",
                value.type_descriptor()
            )));
        }
    }
    Ok(())
}

fn check_values(values: &HashMap<String, AttributeValue>) -> Result<(), ClientError> {
    for value in values.values() {
        value.validate()?;
    }
    Ok(())
}

/// Legacy `Expected` against `ConditionExpression`, plus operator presence.
fn check_expected(
    expected: &HashMap<String, ExpectedAttributeValue>,
    condition_expression: Option<&str>,
    conditional_operator: Option<ConditionalOperator>,
) -> Result<(), ClientError> {
    if !expected.is_empty() && condition_expression.is_some() {
        return Err(invalid("Expected and ConditionExpression cannot be used together"));
    }
    if conditional_operator.is_some() && expected.is_empty() {
        return Err(invalid("ConditionalOperator requires Expected"));
    }
    for (name, entry) in expected {
        entry.validate(name)?;
    }
    Ok(())
}

/// Legacy filter conditions against `FilterExpression`.
fn check_filter(
    filter: &HashMap<String, Condition>,
    filter_field: &str,
    filter_expression: Option<&str>,
    conditional_operator: Option<ConditionalOperator>,
) -> Result<(), ClientError> {
    if !filter.is_empty() && filter_expression.is_some() {
        return Err(invalid(format!(
            "{filter_field} and FilterExpression cannot be used together"
        )));
    }
    if conditional_operator.is_some() && filter.is_empty() {
        return Err(invalid(format!("ConditionalOperator requires {filter_field}")));
    }
    for condition in filter.values() {
        condition.validate()?;
    }
    Ok(())
}

fn check_projection(
    attributes_to_get: &[String],
    projection_expression: Option<&str>,
) -> Result<(), ClientError> {
    if !attributes_to_get.is_empty() && projection_expression.is_some() {
        return Err(invalid(
            "AttributesToGet and ProjectionExpression cannot be used together",
        ));
    }
    Ok(())
}

fn check_limit(limit: Option<i32>) -> Result<(), ClientError> {
    match limit {
        Some(n) if n < 1 => Err(invalid(format!("Limit must be at least 1, got {n}"))),
        _ => Ok(()),
    }
}

/// Global secondary indexes are eventually consistent only.
fn check_consistent_read(
    table_name: &str,
    index_name: Option<&str>,
    consistent_read: Option<bool>,
    ctx: &ContractContext<'_>,
) -> Result<(), ClientError> {
    let (Some(true), Some(index)) = (consistent_read, index_name) else {
        return Ok(());
    };
    if ctx
        .schema(table_name)
        .is_some_and(|schema| schema.is_global_index(index))
    {
        return Err(invalid(format!(
            "consistent reads are not supported on global secondary index {index}"
        )));
    }
    Ok(())
}
