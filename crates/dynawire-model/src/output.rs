//! Response shapes for the thirteen supported operations.
//!
//! Absent optional fields decode to `None`; an absent `LastEvaluatedKey` is
//! how the service signals the last page, so cursors stay `Option<Key>`
//! rather than collapsing into an empty map.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::input::{BatchGetItemInput, BatchWriteItemInput};
use crate::item::{Item, Key};
use crate::types::{
    ConsumedCapacity, ItemCollectionMetrics, KeysAndAttributes, ReturnConsumedCapacity,
    ReturnItemCollectionMetrics, TableDescription, WriteRequest,
};

// ---------------------------------------------------------------------------
// Table management
// ---------------------------------------------------------------------------

/// Output for the `CreateTable` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateTableOutput {
    /// The properties of the newly created table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_description: Option<TableDescription>,
}

/// Output for the `DeleteTable` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteTableOutput {
    /// The properties of the table that was deleted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_description: Option<TableDescription>,
}

/// Output for the `DescribeTable` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeTableOutput {
    /// The properties of the table.
    #[serde(rename = "Table", skip_serializing_if = "Option::is_none")]
    pub table: Option<TableDescription>,
}

/// Output for the `UpdateTable` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateTableOutput {
    /// The properties of the updated table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_description: Option<TableDescription>,
}

/// Output for the `ListTables` operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListTablesOutput {
    /// The table names in this page.
    #[serde(default)]
    pub table_names: Vec<String>,

    /// The name of the last table in this page; absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_evaluated_table_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Item CRUD
// ---------------------------------------------------------------------------

/// Output for the `PutItem` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutItemOutput {
    /// The item as it was before the put, when `ReturnValues` asked for it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Item>,

    /// The capacity units consumed by the operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumed_capacity: Option<ConsumedCapacity>,

    /// Information about item collections modified by the operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_collection_metrics: Option<ItemCollectionMetrics>,
}

/// Output for the `GetItem` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetItemOutput {
    /// The retrieved item, or `None` if no item has the key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<Item>,

    /// The capacity units consumed by the operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumed_capacity: Option<ConsumedCapacity>,
}

/// Output for the `UpdateItem` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateItemOutput {
    /// Attributes before or after the update, per `ReturnValues`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Item>,

    /// The capacity units consumed by the operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumed_capacity: Option<ConsumedCapacity>,

    /// Information about item collections modified by the operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_collection_metrics: Option<ItemCollectionMetrics>,
}

/// Output for the `DeleteItem` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteItemOutput {
    /// The deleted item, when `ReturnValues` was `ALL_OLD` and it existed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Item>,

    /// The capacity units consumed by the operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumed_capacity: Option<ConsumedCapacity>,

    /// Information about item collections modified by the operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_collection_metrics: Option<ItemCollectionMetrics>,
}

// ---------------------------------------------------------------------------
// Query & Scan
// ---------------------------------------------------------------------------

/// Output for the `Query` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryOutput {
    /// The matching items; empty when `Select=COUNT`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Item>,

    /// The number of items after filtering.
    #[serde(default)]
    pub count: i32,

    /// The number of items evaluated before filtering.
    #[serde(default)]
    pub scanned_count: i32,

    /// Where the query stopped; absent once the results are exhausted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_evaluated_key: Option<Key>,

    /// The capacity units consumed by the operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumed_capacity: Option<ConsumedCapacity>,
}

/// Output for the `Scan` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanOutput {
    /// The matching items; empty when `Select=COUNT`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Item>,

    /// The number of items after filtering.
    #[serde(default)]
    pub count: i32,

    /// The number of items evaluated before filtering.
    #[serde(default)]
    pub scanned_count: i32,

    /// Where the scan stopped; absent once the segment is exhausted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_evaluated_key: Option<Key>,

    /// The capacity units consumed by the operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumed_capacity: Option<ConsumedCapacity>,
}

// ---------------------------------------------------------------------------
// Batch operations
// ---------------------------------------------------------------------------

/// Output for the `BatchGetItem` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchGetItemOutput {
    /// The items retrieved, grouped by table.
    #[serde(default)]
    pub responses: HashMap<String, Vec<Item>>,

    /// Keys that were not read, in request shape. Resubmit them as
    /// `RequestItems`.
    #[serde(default)]
    pub unprocessed_keys: HashMap<String, KeysAndAttributes>,

    /// The capacity units consumed by the operation for each table.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub consumed_capacity: Vec<ConsumedCapacity>,
}

impl BatchGetItemOutput {
    /// Returns `true` if every requested key was read.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unprocessed_count() == 0
    }

    /// The number of keys left unprocessed across all tables.
    #[must_use]
    pub fn unprocessed_count(&self) -> usize {
        self.unprocessed_keys.values().map(|k| k.keys.len()).sum()
    }

    /// Build the request that reads the unprocessed keys, or `None` if
    /// there are none.
    #[must_use]
    pub fn into_retry_input(
        self,
        return_consumed_capacity: Option<ReturnConsumedCapacity>,
    ) -> Option<BatchGetItemInput> {
        if self.is_complete() {
            return None;
        }
        Some(BatchGetItemInput {
            request_items: self
                .unprocessed_keys
                .into_iter()
                .filter(|(_, keys)| !keys.keys.is_empty())
                .collect(),
            return_consumed_capacity,
        })
    }
}

/// Output for the `BatchWriteItem` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchWriteItemOutput {
    /// Requests that were not applied, in request shape. Resubmit them as
    /// `RequestItems`.
    #[serde(default)]
    pub unprocessed_items: HashMap<String, Vec<WriteRequest>>,

    /// Item collection metrics for the affected tables.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub item_collection_metrics: HashMap<String, Vec<ItemCollectionMetrics>>,

    /// The capacity units consumed by the operation for each table.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub consumed_capacity: Vec<ConsumedCapacity>,
}

impl BatchWriteItemOutput {
    /// Returns `true` if every request was applied.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unprocessed_count() == 0
    }

    /// The number of write requests left unprocessed across all tables.
    #[must_use]
    pub fn unprocessed_count(&self) -> usize {
        self.unprocessed_items.values().map(Vec::len).sum()
    }

    /// Build the request that resubmits the unprocessed writes, or `None` if
    /// there are none.
    #[must_use]
    pub fn into_retry_input(
        self,
        return_consumed_capacity: Option<ReturnConsumedCapacity>,
        return_item_collection_metrics: Option<ReturnItemCollectionMetrics>,
    ) -> Option<BatchWriteItemInput> {
        if self.is_complete() {
            return None;
        }
        Some(BatchWriteItemInput {
            request_items: self
                .unprocessed_items
                .into_iter()
                .filter(|(_, requests)| !requests.is_empty())
                .collect(),
            return_consumed_capacity,
            return_item_collection_metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute_value::AttributeValue;

    #[test]
    fn test_should_decode_last_page_without_cursor() {
        let page: QueryOutput =
            serde_json::from_str(r#"{"Items":[],"Count":0,"ScannedCount":4}"#).unwrap();
        assert!(page.last_evaluated_key.is_none());
        assert_eq!(page.scanned_count, 4);
    }

    #[test]
    fn test_should_decode_cursor_exactly() {
        let page: ScanOutput = serde_json::from_str(
            r#"{"Count":0,"ScannedCount":0,"LastEvaluatedKey":{"pk":{"N":"1.000"}}}"#,
        )
        .unwrap();
        let cursor = page.last_evaluated_key.unwrap();
        assert_eq!(cursor["pk"], AttributeValue::N("1.000".to_owned()));
    }

    #[test]
    fn test_should_report_unprocessed_batch_writes() {
        let body = r#"{
            "UnprocessedItems": {
                "t": [
                    {"PutRequest": {"Item": {"id": {"S": "1"}}}},
                    {"DeleteRequest": {"Key": {"id": {"S": "2"}}}}
                ]
            }
        }"#;
        let out: BatchWriteItemOutput = serde_json::from_str(body).unwrap();
        assert!(!out.is_complete());
        assert_eq!(out.unprocessed_count(), 2);

        let retry = out.clone().into_retry_input(None, None).unwrap();
        assert_eq!(retry.request_items["t"], out.unprocessed_items["t"]);
    }

    #[test]
    fn test_should_not_build_retry_for_complete_batch() {
        let out = BatchGetItemOutput {
            unprocessed_keys: [("t".to_owned(), KeysAndAttributes::default())].into(),
            ..Default::default()
        };
        assert!(out.is_complete());
        assert!(out.into_retry_input(None).is_none());
    }
}
