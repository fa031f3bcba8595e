//! GetItem, Query and Scan.

use std::collections::HashMap;

use dynawire_model::input::{GetItemInput, QueryInput, ScanInput};
use dynawire_model::output::{GetItemOutput, QueryOutput, ScanOutput};
use dynawire_model::types::{ComparisonOperator, Condition};
use dynawire_model::{DynamoDBOperation, KeySchema};

use super::{
    ContractContext, OperationContract, check_consistent_read, check_filter, check_key,
    check_limit, check_projection, check_table_name, check_values,
};
use crate::error::{ClientError, invalid};

/// Largest accepted `TotalSegments` for a parallel scan.
pub const MAX_TOTAL_SEGMENTS: i32 = 1_000_000;

/// Read one item by primary key.
#[derive(Debug, Clone, Copy)]
pub struct GetItem;

impl OperationContract for GetItem {
    const OPERATION: DynamoDBOperation = DynamoDBOperation::GetItem;
    type Input = GetItemInput;
    type Output = GetItemOutput;

    fn validate(input: &GetItemInput, ctx: &ContractContext<'_>) -> Result<(), ClientError> {
        check_table_name(&input.table_name)?;
        check_key(&input.key, &input.table_name, ctx)?;
        check_projection(&input.attributes_to_get, input.projection_expression.as_deref())
    }
}

/// Read the items sharing a partition key.
#[derive(Debug, Clone, Copy)]
pub struct Query;

impl OperationContract for Query {
    const OPERATION: DynamoDBOperation = DynamoDBOperation::Query;
    type Input = QueryInput;
    type Output = QueryOutput;

    fn validate(input: &QueryInput, ctx: &ContractContext<'_>) -> Result<(), ClientError> {
        check_table_name(&input.table_name)?;
        let index_name = input.index_name.as_deref();

        match (
            input.key_condition_expression.as_deref(),
            input.key_conditions.is_empty(),
        ) {
            (Some(_), false) => {
                return Err(invalid(
                    "KeyConditionExpression and KeyConditions cannot be used together",
                ));
            }
            (None, true) => {
                return Err(invalid("Query requires KeyConditionExpression or KeyConditions"));
            }
            (Some(expr), true) if expr.trim().is_empty() => {
                return Err(invalid("KeyConditionExpression must not be empty"));
            }
            (Some(_), true) => {}
            (None, false) => {
                let key_schema = ctx
                    .schema(&input.table_name)
                    .and_then(|schema| schema.key_schema_for(index_name));
                check_key_conditions(&input.key_conditions, key_schema)?;
            }
        }

        check_filter(
            &input.query_filter,
            "QueryFilter",
            input.filter_expression.as_deref(),
            input.conditional_operator,
        )?;
        check_projection(&input.attributes_to_get, input.projection_expression.as_deref())?;
        check_limit(input.limit)?;
        check_consistent_read(&input.table_name, index_name, input.consistent_read, ctx)?;
        check_values(&input.expression_attribute_values)
    }
}

/// Legacy `KeyConditions`: one `EQ` on the partition key and at most one
/// more condition on the sort key.
fn check_key_conditions(
    conditions: &HashMap<String, Condition>,
    key_schema: Option<&KeySchema>,
) -> Result<(), ClientError> {
    if conditions.len() > 2 {
        return Err(invalid(format!(
            "KeyConditions accepts at most 2 conditions, got {}",
            conditions.len()
        )));
    }
    for (name, condition) in conditions {
        if !condition.comparison_operator.is_key_condition() {
            return Err(invalid(format!(
                "{} is not a valid key condition operator (attribute {name})",
                condition.comparison_operator
            )));
        }
        condition.validate()?;
    }

    let hash_candidates: Vec<&str> = conditions
        .iter()
        .filter(|(_, c)| c.comparison_operator == ComparisonOperator::Eq)
        .map(|(name, _)| name.as_str())
        .collect();
    if hash_candidates.is_empty() {
        return Err(invalid(
            "KeyConditions must contain an EQ condition on the partition key",
        ));
    }

    let Some(schema) = key_schema else {
        return Ok(());
    };
    let hash_key = schema.hash_key();
    if !hash_candidates.contains(&hash_key) {
        return Err(invalid(format!(
            "KeyConditions must contain an EQ condition on partition key {hash_key}"
        )));
    }
    for name in conditions.keys().filter(|name| name.as_str() != hash_key) {
        if schema.range_key() != Some(name.as_str()) {
            return Err(invalid(format!("KeyConditions attribute {name} is not a key attribute")));
        }
    }
    Ok(())
}

/// Read every item of a table or index, optionally one segment of it.
#[derive(Debug, Clone, Copy)]
pub struct Scan;

impl OperationContract for Scan {
    const OPERATION: DynamoDBOperation = DynamoDBOperation::Scan;
    type Input = ScanInput;
    type Output = ScanOutput;

    fn validate(input: &ScanInput, ctx: &ContractContext<'_>) -> Result<(), ClientError> {
        check_table_name(&input.table_name)?;
        check_filter(
            &input.scan_filter,
            "ScanFilter",
            input.filter_expression.as_deref(),
            input.conditional_operator,
        )?;
        check_projection(&input.attributes_to_get, input.projection_expression.as_deref())?;
        check_limit(input.limit)?;
        check_segments(input.segment, input.total_segments)?;
        check_consistent_read(
            &input.table_name,
            input.index_name.as_deref(),
            input.consistent_read,
            ctx,
        )?;
        check_values(&input.expression_attribute_values)
    }
}

fn check_segments(segment: Option<i32>, total_segments: Option<i32>) -> Result<(), ClientError> {
    match (segment, total_segments) {
        (None, None) => Ok(()),
        (Some(segment), Some(total)) => {
            if !(1..=MAX_TOTAL_SEGMENTS).contains(&total) {
                return Err(invalid(format!(
                    "TotalSegments must be between 1 and {MAX_TOTAL_SEGMENTS}, got {total}"
                )));
            }
            if !(0..total).contains(&segment) {
                return Err(invalid(format!(
                    "Segment must be between 0 and {}, got {segment}",
                    total - 1
                )));
            }
            Ok(())
        }
        _ => Err(invalid("Segment and TotalSegments must be specified together")),
    }
}
