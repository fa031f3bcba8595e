//! BatchGetItem and BatchWriteItem over a scripted transport.

mod common;

use common::{item, s, stub_client};
use dynawire_client::{ClientConfig, ClientError};
use dynawire_model::input::{BatchGetItemInput, BatchWriteItemInput};
use dynawire_model::types::{KeysAndAttributes, WriteRequest};
use dynawire_model::{AttributeValue, KeySchema, TableSchema};
use serde_json::json;

fn events_config() -> ClientConfig {
    ClientConfig::default()
        .with_table_schema(TableSchema::new("events", KeySchema::hash_only("id")))
}

fn puts(count: usize) -> Vec<WriteRequest> {
    (0..count)
        .map(|i| WriteRequest::put(item(&[("id", s(&format!("e{i}"))), ("kind", s("click"))])))
        .collect()
}

fn put_json(i: usize) -> serde_json::Value {
    json!({"PutRequest": {"Item": {"id": {"S": format!("e{i}")}, "kind": {"S": "click"}}}})
}

#[tokio::test]
async fn test_should_return_unprocessed_writes_for_resubmission() {
    let (client, stub) = stub_client(events_config());
    let leftovers: Vec<_> = (20..25).map(put_json).collect();
    stub.reply(json!({"UnprocessedItems": {"events": leftovers}}))
        .reply(json!({"UnprocessedItems": {}}));

    let output = client
        .batch_write_item(BatchWriteItemInput {
            request_items: [("events".to_owned(), puts(25))].into(),
            ..BatchWriteItemInput::default()
        })
        .await
        .unwrap();
    assert!(!output.is_complete());
    assert_eq!(output.unprocessed_count(), 5);

    let retry = output.into_retry_input(None, None).unwrap();
    assert_eq!(retry.request_items["events"].len(), 5);
    let done = client.batch_write_item(retry).await.unwrap();
    assert!(done.is_complete());
    assert!(done.into_retry_input(None, None).is_none());

    let requests = stub.requests();
    assert_eq!(requests[0].target, "DynamoDB_20120810.BatchWriteItem");
    assert_eq!(requests[1].body["RequestItems"]["events"][0], put_json(20));
}

#[tokio::test]
async fn test_should_reject_oversized_batches_locally() {
    let (client, stub) = stub_client(events_config());

    let writes = client
        .batch_write_item(BatchWriteItemInput {
            request_items: [("events".to_owned(), puts(26))].into(),
            ..BatchWriteItemInput::default()
        })
        .await;
    assert!(matches!(writes, Err(ClientError::Validation(_))));

    let keys = (0..101).map(|i| item(&[("id", s(&format!("e{i}")))])).collect();
    let reads = client
        .batch_get_item(BatchGetItemInput {
            request_items: [(
                "events".to_owned(),
                KeysAndAttributes {
                    keys,
                    ..KeysAndAttributes::default()
                },
            )]
            .into(),
            ..BatchGetItemInput::default()
        })
        .await;
    assert!(matches!(reads, Err(ClientError::Validation(_))));

    assert_eq!(stub.request_count(), 0);
}

#[tokio::test]
async fn test_should_reject_duplicate_keys_in_one_batch() {
    let (client, stub) = stub_client(events_config());

    let result = client
        .batch_write_item(BatchWriteItemInput {
            request_items: [(
                "events".to_owned(),
                vec![
                    WriteRequest::put(item(&[("id", s("e1")), ("kind", s("click"))])),
                    WriteRequest::delete(item(&[("id", s("e1"))])),
                ],
            )]
            .into(),
            ..BatchWriteItemInput::default()
        })
        .await;
    assert!(matches!(result, Err(ClientError::Validation(_))));
    assert_eq!(stub.request_count(), 0);
}

#[tokio::test]
async fn test_should_treat_equal_numeric_keys_as_duplicates() {
    let config = ClientConfig::default()
        .with_table_schema(TableSchema::new("counters", KeySchema::hash_only("id")));
    let (client, stub) = stub_client(config);
    let number = |raw: &str| AttributeValue::N(raw.to_owned());

    let writes = client
        .batch_write_item(BatchWriteItemInput {
            request_items: [(
                "counters".to_owned(),
                vec![
                    WriteRequest::put(item(&[("id", number("1")), ("hits", number("3"))])),
                    WriteRequest::delete(item(&[("id", number("1.0"))])),
                ],
            )]
            .into(),
            ..BatchWriteItemInput::default()
        })
        .await;
    assert!(matches!(writes, Err(ClientError::Validation(_))));

    let reads = client
        .batch_get_item(BatchGetItemInput {
            request_items: [(
                "counters".to_owned(),
                KeysAndAttributes {
                    keys: vec![item(&[("id", number("10"))]), item(&[("id", number("1e1"))])],
                    ..KeysAndAttributes::default()
                },
            )]
            .into(),
            ..BatchGetItemInput::default()
        })
        .await;
    assert!(matches!(reads, Err(ClientError::Validation(_))));

    assert_eq!(stub.request_count(), 0);
}

#[tokio::test]
async fn test_should_read_partial_batch_and_keep_unprocessed_keys() {
    let (client, stub) = stub_client(events_config());
    stub.reply(json!({
        "Responses": {"events": [{"id": {"S": "e1"}, "kind": {"S": "click"}}]},
        "UnprocessedKeys": {"events": {"Keys": [{"id": {"S": "e2"}}], "ConsistentRead": true}},
    }));

    let output = client
        .batch_get_item(BatchGetItemInput {
            request_items: [(
                "events".to_owned(),
                KeysAndAttributes {
                    keys: vec![item(&[("id", s("e1"))]), item(&[("id", s("e2"))])],
                    consistent_read: Some(true),
                    ..KeysAndAttributes::default()
                },
            )]
            .into(),
            ..BatchGetItemInput::default()
        })
        .await
        .unwrap();

    assert_eq!(output.responses["events"].len(), 1);
    assert_eq!(output.unprocessed_count(), 1);
    let retry = output.into_retry_input(None).unwrap();
    assert_eq!(retry.request_items["events"].keys, vec![item(&[("id", s("e2"))])]);
    assert_eq!(retry.request_items["events"].consistent_read, Some(true));
}

#[tokio::test]
async fn test_should_report_throttling_when_nothing_was_processed() {
    let (client, stub) = stub_client(events_config());
    let everything: Vec<_> = (0..3).map(put_json).collect();
    stub.reply(json!({"UnprocessedItems": {"events": everything}}));

    let result = client
        .batch_write_item(BatchWriteItemInput {
            request_items: [("events".to_owned(), puts(3))].into(),
            ..BatchWriteItemInput::default()
        })
        .await;
    let err = result.unwrap_err();
    assert!(matches!(err, ClientError::ProvisionedThroughputExceeded(_)));
    assert!(err.is_retryable());
}
