//! BatchGetItem and BatchWriteItem.
//!
//! Both caps are enforced before sending, and duplicate keys within a table
//! are rejected locally. A partially processed batch is a success; the
//! caller resubmits what came back unprocessed.

use std::collections::HashSet;

use dynawire_model::input::{BatchGetItemInput, BatchWriteItemInput};
use dynawire_model::item::{KeyIdentity, identity_value, key_identity};
use dynawire_model::output::{BatchGetItemOutput, BatchWriteItemOutput};
use dynawire_model::types::WriteRequest;
use dynawire_model::{DynamoDBOperation, Item};

use super::{ContractContext, OperationContract, check_item, check_key, check_table_name};
use crate::error::{ClientError, invalid};

/// Most keys one `BatchGetItem` may read, across all tables.
pub const MAX_BATCH_GET_KEYS: usize = 100;

/// Most requests one `BatchWriteItem` may carry, across all tables.
pub const MAX_BATCH_WRITE_REQUESTS: usize = 25;

/// Read up to 100 items from one or more tables.
#[derive(Debug, Clone, Copy)]
pub struct BatchGetItem;

impl BatchGetItem {
    fn requested(input: &BatchGetItemInput) -> usize {
        input.request_items.values().map(|k| k.keys.len()).sum()
    }
}

impl OperationContract for BatchGetItem {
    const OPERATION: DynamoDBOperation = DynamoDBOperation::BatchGetItem;
    type Input = BatchGetItemInput;
    type Output = BatchGetItemOutput;

    fn validate(input: &BatchGetItemInput, ctx: &ContractContext<'_>) -> Result<(), ClientError> {
        if input.request_items.is_empty() {
            return Err(invalid("RequestItems must not be empty"));
        }
        let total = Self::requested(input);
        if total > MAX_BATCH_GET_KEYS {
            return Err(invalid(format!(
                "too many keys requested: {total}, at most {MAX_BATCH_GET_KEYS}"
            )));
        }

        for (table_name, request) in &input.request_items {
            check_table_name(table_name)?;
            if request.keys.is_empty() {
                return Err(invalid(format!("Keys for table {table_name} must not be empty")));
            }
            if !request.attributes_to_get.is_empty() && request.projection_expression.is_some() {
                return Err(invalid(format!(
                    "AttributesToGet and ProjectionExpression cannot be used together for table {table_name}"
                )));
            }
            let mut seen = HashSet::with_capacity(request.keys.len());
            for key in &request.keys {
                check_key(key, table_name, ctx)?;
                if !seen.insert(key_identity(key)) {
                    return Err(invalid(format!("duplicate key in request for table {table_name}")));
                }
            }
        }
        Ok(())
    }

    fn finish(
        input: &BatchGetItemInput,
        output: BatchGetItemOutput,
    ) -> Result<BatchGetItemOutput, ClientError> {
        let requested = Self::requested(input);
        if requested > 0 && output.unprocessed_count() >= requested {
            return Err(ClientError::ProvisionedThroughputExceeded(format!(
                "none of the {requested} requested keys were processed"
            )));
        }
        Ok(output)
    }
}

/// Put or delete up to 25 items across one or more tables.
#[derive(Debug, Clone, Copy)]
pub struct BatchWriteItem;

impl BatchWriteItem {
    fn requested(input: &BatchWriteItemInput) -> usize {
        input.request_items.values().map(Vec::len).sum()
    }
}

impl OperationContract for BatchWriteItem {
    const OPERATION: DynamoDBOperation = DynamoDBOperation::BatchWriteItem;
    type Input = BatchWriteItemInput;
    type Output = BatchWriteItemOutput;

    fn validate(input: &BatchWriteItemInput, ctx: &ContractContext<'_>) -> Result<(), ClientError> {
        if input.request_items.is_empty() {
            return Err(invalid("RequestItems must not be empty"));
        }
        let total = Self::requested(input);
        if total > MAX_BATCH_WRITE_REQUESTS {
            return Err(invalid(format!(
                "too many write requests: {total}, at most {MAX_BATCH_WRITE_REQUESTS}"
            )));
        }

        for (table_name, requests) in &input.request_items {
            check_table_name(table_name)?;
            if requests.is_empty() {
                return Err(invalid(format!(
                    "write requests for table {table_name} must not be empty"
                )));
            }
            let key_names = identity_names(table_name, requests, ctx);
            let mut seen = HashSet::with_capacity(requests.len());
            for request in requests {
                let identity = match (&request.put_request, &request.delete_request) {
                    (Some(put), None) => {
                        check_item(&put.item, table_name, ctx)?;
                        put_identity(&put.item, key_names.as_deref())
                    }
                    (None, Some(delete)) => {
                        check_key(&delete.key, table_name, ctx)?;
                        key_identity(&delete.key)
                    }
                    _ => {
                        return Err(invalid(format!(
                            "each write request for table {table_name} must contain exactly one of PutRequest or DeleteRequest"
                        )));
                    }
                };
                if !seen.insert(identity) {
                    return Err(invalid(format!(
                        "duplicate write to the same key in table {table_name}"
                    )));
                }
            }
        }
        Ok(())
    }

    fn finish(
        input: &BatchWriteItemInput,
        output: BatchWriteItemOutput,
    ) -> Result<BatchWriteItemOutput, ClientError> {
        let requested = Self::requested(input);
        if requested > 0 && output.unprocessed_count() >= requested {
            return Err(ClientError::ProvisionedThroughputExceeded(format!(
                "none of the {requested} write requests were processed"
            )));
        }
        Ok(output)
    }
}

/// The attribute names that identify an item in `table_name`: the registered
/// key schema, else the key of any delete request for the table.
fn identity_names<'a>(
    table_name: &str,
    requests: &'a [WriteRequest],
    ctx: &ContractContext<'a>,
) -> Option<Vec<&'a str>> {
    if let Some(schema) = ctx.schema(table_name) {
        return Some(schema.key_schema.attribute_names().collect());
    }
    requests
        .iter()
        .find_map(|r| r.delete_request.as_ref())
        .map(|delete| delete.key.keys().map(String::as_str).collect())
}

/// Project a put item onto the identity names; the whole item when the
/// names are unknown or not all present.
fn put_identity<'a>(item: &'a Item, names: Option<&[&str]>) -> KeyIdentity<'a> {
    let projected = names.and_then(|names| {
        names
            .iter()
            .map(|name| {
                item.get_key_value(*name)
                    .map(|(k, v)| (k.as_str(), identity_value(v)))
            })
            .collect::<Option<KeyIdentity<'a>>>()
    });
    projected.unwrap_or_else(|| key_identity(item))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use dynawire_model::types::KeysAndAttributes;
    use dynawire_model::{AttributeValue, Key, KeySchema, TableSchema};

    use super::*;

    fn id(n: usize) -> Key {
        Key::from([("id".to_owned(), AttributeValue::number(n))])
    }

    fn item(n: usize, payload: &str) -> Item {
        Item::from([
            ("id".to_owned(), AttributeValue::number(n)),
            ("payload".to_owned(), AttributeValue::from(payload)),
        ])
    }

    fn get_input(tables: &[(&str, Vec<Key>)]) -> BatchGetItemInput {
        BatchGetItemInput {
            request_items: tables
                .iter()
                .map(|(t, keys)| {
                    (
                        (*t).to_owned(),
                        KeysAndAttributes {
                            keys: keys.clone(),
                            ..KeysAndAttributes::default()
                        },
                    )
                })
                .collect(),
            return_consumed_capacity: None,
        }
    }

    fn write_input(table: &str, requests: Vec<WriteRequest>) -> BatchWriteItemInput {
        BatchWriteItemInput {
            request_items: HashMap::from([(table.to_owned(), requests)]),
            ..BatchWriteItemInput::default()
        }
    }

    #[test]
    fn test_should_cap_batch_get_across_tables() {
        let schemas = HashMap::new();
        let ctx = ContractContext::new(&schemas);
        let at_cap = get_input(&[
            ("a", (0..60).map(id).collect()),
            ("b", (0..40).map(id).collect()),
        ]);
        assert!(BatchGetItem::validate(&at_cap, &ctx).is_ok());

        let over = get_input(&[
            ("a", (0..60).map(id).collect()),
            ("b", (0..41).map(id).collect()),
        ]);
        assert!(BatchGetItem::validate(&over, &ctx).is_err());
    }

    #[test]
    fn test_should_reject_duplicate_and_empty_batch_get_keys() {
        let schemas = HashMap::new();
        let ctx = ContractContext::new(&schemas);
        assert!(BatchGetItem::validate(&get_input(&[("a", vec![id(1), id(1)])]), &ctx).is_err());
        assert!(BatchGetItem::validate(&get_input(&[("a", vec![])]), &ctx).is_err());
        assert!(BatchGetItem::validate(&get_input(&[]), &ctx).is_err());
        // The same key in two tables is fine.
        assert!(
            BatchGetItem::validate(&get_input(&[("a", vec![id(1)]), ("b", vec![id(1)])]), &ctx)
                .is_ok()
        );
    }

    #[test]
    fn test_should_cap_batch_write() {
        let schemas = HashMap::new();
        let ctx = ContractContext::new(&schemas);
        let puts = |n: usize| -> Vec<WriteRequest> {
            (0..n).map(|i| WriteRequest::put(item(i, "x"))).collect()
        };
        assert!(BatchWriteItem::validate(&write_input("t", puts(25)), &ctx).is_ok());
        assert!(BatchWriteItem::validate(&write_input("t", puts(26)), &ctx).is_err());
    }

    #[test]
    fn test_should_require_exactly_one_write_action() {
        let schemas = HashMap::new();
        let ctx = ContractContext::new(&schemas);
        let mut both = WriteRequest::put(item(1, "x"));
        both.delete_request = WriteRequest::delete(id(2)).delete_request;
        assert!(BatchWriteItem::validate(&write_input("t", vec![both]), &ctx).is_err());

        let neither = WriteRequest {
            put_request: None,
            delete_request: None,
        };
        assert!(BatchWriteItem::validate(&write_input("t", vec![neither]), &ctx).is_err());
    }

    #[test]
    fn test_should_detect_duplicate_writes_with_registered_schema() {
        let schemas = HashMap::from([(
            "t".to_owned(),
            TableSchema::new("t", KeySchema::hash_only("id")),
        )]);
        let ctx = ContractContext::new(&schemas);
        let input = write_input(
            "t",
            vec![WriteRequest::put(item(1, "x")), WriteRequest::put(item(1, "y"))],
        );
        assert!(BatchWriteItem::validate(&input, &ctx).is_err());

        let input = write_input(
            "t",
            vec![WriteRequest::put(item(1, "x")), WriteRequest::delete(id(1))],
        );
        assert!(BatchWriteItem::validate(&input, &ctx).is_err());
    }

    #[test]
    fn test_should_infer_key_names_from_delete_requests() {
        let schemas = HashMap::new();
        let ctx = ContractContext::new(&schemas);
        let input = write_input(
            "t",
            vec![WriteRequest::delete(id(1)), WriteRequest::put(item(1, "y"))],
        );
        assert!(BatchWriteItem::validate(&input, &ctx).is_err());

        // Without any key information, distinct put items are distinct writes.
        let input = write_input(
            "t",
            vec![WriteRequest::put(item(1, "x")), WriteRequest::put(item(1, "y"))],
        );
        assert!(BatchWriteItem::validate(&input, &ctx).is_ok());
    }

    #[test]
    fn test_should_fail_when_nothing_was_processed() {
        let input = get_input(&[("a", vec![id(1), id(2)])]);
        let all_unprocessed = BatchGetItemOutput {
            unprocessed_keys: input.request_items.clone(),
            ..BatchGetItemOutput::default()
        };
        assert!(matches!(
            BatchGetItem::finish(&input, all_unprocessed),
            Err(ClientError::ProvisionedThroughputExceeded(_))
        ));

        let partial = BatchGetItemOutput {
            unprocessed_keys: get_input(&[("a", vec![id(2)])]).request_items,
            ..BatchGetItemOutput::default()
        };
        let output = BatchGetItem::finish(&input, partial).unwrap();
        assert_eq!(output.unprocessed_count(), 1);
    }
}
