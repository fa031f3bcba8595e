//! Polling for table lifecycle changes.
//!
//! Tables move through `CREATING`, `UPDATING` and `DELETING` asynchronously.
//! The waiters poll `DescribeTable` at a fixed interval for a bounded number
//! of attempts. Every observed status change must be a legal lifecycle
//! transition; anything else means the response cannot be trusted.

use std::time::Duration;

use dynawire_model::input::DescribeTableInput;
use dynawire_model::types::{TableDescription, TableStatus};
use tracing::debug;

use crate::client::Client;
use crate::error::ClientError;

impl Client {
    /// Poll until `table_name` reports `target`, returning its description.
    ///
    /// Fails with [`ClientError::Cancelled`] once `max_attempts` describes
    /// have not reached the target, and with
    /// [`ClientError::MalformedResponse`] on an impossible transition.
    pub async fn wait_for_table_status(
        &self,
        table_name: &str,
        target: TableStatus,
        interval: Duration,
        max_attempts: u32,
    ) -> Result<TableDescription, ClientError> {
        let mut last: Option<TableStatus> = None;
        for attempt in 1..=max_attempts {
            let table = self.describe(table_name).await?;
            let status = table.table_status.ok_or_else(|| {
                ClientError::MalformedResponse(format!(
                    "DescribeTable for {table_name} returned no TableStatus"
                ))
            })?;
            if let Some(previous) = last {
                if !previous.can_transition_to(status) {
                    return Err(ClientError::MalformedResponse(format!(
                        "table {table_name} moved from {previous} to {status}"
                    )));
                }
            }
            debug!(table = table_name, %status, %target, attempt, "polled table status");
            if status == target {
                return Ok(table);
            }
            last = Some(status);
            if attempt < max_attempts {
                tokio::time::sleep(interval).await;
            }
        }
        Err(ClientError::Cancelled)
    }

    /// Poll until `table_name` no longer exists.
    pub async fn wait_until_table_gone(
        &self,
        table_name: &str,
        interval: Duration,
        max_attempts: u32,
    ) -> Result<(), ClientError> {
        for attempt in 1..=max_attempts {
            match self.describe(table_name).await {
                Err(ClientError::ResourceNotFound(_)) => return Ok(()),
                Err(err) => return Err(err),
                Ok(table) => {
                    debug!(
                        table = table_name,
                        status = ?table.table_status,
                        attempt,
                        "table still present"
                    );
                }
            }
            if attempt < max_attempts {
                tokio::time::sleep(interval).await;
            }
        }
        Err(ClientError::Cancelled)
    }

    async fn describe(&self, table_name: &str) -> Result<TableDescription, ClientError> {
        self.describe_table(DescribeTableInput {
            table_name: table_name.to_owned(),
        })
        .await?
        .table
        .ok_or_else(|| {
            ClientError::MalformedResponse(format!(
                "DescribeTable for {table_name} returned no Table"
            ))
        })
    }
}
