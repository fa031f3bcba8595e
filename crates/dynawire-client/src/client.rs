//! The dispatcher: one generic wire path shared by every operation.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use dynawire_model::input::{
    BatchGetItemInput, BatchWriteItemInput, CreateTableInput, DeleteItemInput, DeleteTableInput,
    DescribeTableInput, GetItemInput, ListTablesInput, PutItemInput, QueryInput, ScanInput,
    UpdateItemInput, UpdateTableInput,
};
use dynawire_model::output::{
    BatchGetItemOutput, BatchWriteItemOutput, CreateTableOutput, DeleteItemOutput,
    DeleteTableOutput, DescribeTableOutput, GetItemOutput, ListTablesOutput, PutItemOutput,
    QueryOutput, ScanOutput, UpdateItemOutput, UpdateTableOutput,
};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::contract::{
    BatchGetItem, BatchWriteItem, ContractContext, CreateTable, DeleteItem, DeleteTable,
    DescribeTable, GetItem, ListTables, OperationContract, PutItem, Query, Scan, UpdateItem,
    UpdateTable,
};
use crate::error::ClientError;
use crate::paginator::{ListTablesPaginator, QueryPaginator, ScanPaginator};
use crate::transport::Transport;

/// A typed DynamoDB client.
///
/// Cheap to clone; clones share the transport and configuration. Every call
/// makes at most one request and never retries.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    config: Arc<ClientConfig>,
}

impl Client {
    /// Create a client over `transport`.
    pub fn new(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self {
            transport,
            config: Arc::new(config),
        }
    }

    /// The client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Validate, send and decode one request for operation `C`.
    ///
    /// Local validation failures return before the transport is touched.
    /// The configured timeout, if any, yields [`ClientError::Cancelled`].
    pub async fn call<C: OperationContract>(
        &self,
        input: C::Input,
    ) -> Result<C::Output, ClientError> {
        self.call_with_cancel::<C, _>(input, std::future::pending())
            .await
    }

    /// Like [`Client::call`], but gives up with [`ClientError::Cancelled`]
    /// as soon as `cancel` completes.
    pub async fn call_with_cancel<C, F>(
        &self,
        input: C::Input,
        cancel: F,
    ) -> Result<C::Output, ClientError>
    where
        C: OperationContract,
        F: Future<Output = ()>,
    {
        let operation = C::OPERATION;
        if let Err(err) = C::validate(&input, &ContractContext::new(&self.config.table_schemas)) {
            debug!(%operation, error = %err, "request rejected before dispatch");
            return Err(err);
        }
        let body =
            serde_json::to_vec(&input).map_err(|e| ClientError::InvalidValue(e.to_string()))?;
        debug!(%operation, request_bytes = body.len(), "dispatching request");

        let exchange = self.exchange::<C>(input, Bytes::from(body));
        let bounded = async {
            match self.config.timeout {
                Some(limit) => tokio::time::timeout(limit, exchange)
                    .await
                    .unwrap_or_else(|_| Err(ClientError::Cancelled)),
                None => exchange.await,
            }
        };

        tokio::select! {
            biased;
            () = cancel => {
                debug!(%operation, "request cancelled by caller");
                Err(ClientError::Cancelled)
            }
            result = bounded => {
                if matches!(result, Err(ClientError::Cancelled)) {
                    debug!(%operation, "request timed out");
                }
                result
            }
        }
    }

    async fn exchange<C: OperationContract>(
        &self,
        input: C::Input,
        body: Bytes,
    ) -> Result<C::Output, ClientError> {
        let operation = C::OPERATION;
        let response = match self.transport.send(&operation.target(), body).await {
            Ok(response) => response,
            Err(failure) => {
                let err = ClientError::from_failure(&failure);
                warn!(%operation, status = ?failure.status, error = %err, "request failed");
                return Err(err);
            }
        };
        debug!(%operation, response_bytes = response.len(), "received response");

        let output = serde_json::from_slice(&response).map_err(|e| {
            warn!(%operation, error = %e, "undecodable response body");
            ClientError::MalformedResponse(e.to_string())
        })?;
        C::finish(&input, output)
    }

    // -----------------------------------------------------------------------
    // Item operations
    // -----------------------------------------------------------------------

    /// Read one item.
    pub async fn get_item(&self, input: GetItemInput) -> Result<GetItemOutput, ClientError> {
        self.call::<GetItem>(input).await
    }

    /// Create or replace one item.
    pub async fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput, ClientError> {
        self.call::<PutItem>(input).await
    }

    /// Edit one item.
    pub async fn update_item(
        &self,
        input: UpdateItemInput,
    ) -> Result<UpdateItemOutput, ClientError> {
        self.call::<UpdateItem>(input).await
    }

    /// Delete one item. Deleting a missing item succeeds.
    pub async fn delete_item(
        &self,
        input: DeleteItemInput,
    ) -> Result<DeleteItemOutput, ClientError> {
        self.call::<DeleteItem>(input).await
    }

    /// Fetch one page of a query. See [`Client::query_pages`] to walk them all.
    pub async fn query(&self, input: QueryInput) -> Result<QueryOutput, ClientError> {
        self.call::<Query>(input).await
    }

    /// Fetch one page of a scan. See [`Client::scan_pages`] to walk them all.
    pub async fn scan(&self, input: ScanInput) -> Result<ScanOutput, ClientError> {
        self.call::<Scan>(input).await
    }

    /// Read up to 100 items across tables.
    pub async fn batch_get_item(
        &self,
        input: BatchGetItemInput,
    ) -> Result<BatchGetItemOutput, ClientError> {
        self.call::<BatchGetItem>(input).await
    }

    /// Put or delete up to 25 items across tables.
    pub async fn batch_write_item(
        &self,
        input: BatchWriteItemInput,
    ) -> Result<BatchWriteItemOutput, ClientError> {
        self.call::<BatchWriteItem>(input).await
    }

    // -----------------------------------------------------------------------
    // Table operations
    // -----------------------------------------------------------------------

    /// Create a table.
    pub async fn create_table(
        &self,
        input: CreateTableInput,
    ) -> Result<CreateTableOutput, ClientError> {
        self.call::<CreateTable>(input).await
    }

    /// Delete a table.
    pub async fn delete_table(
        &self,
        input: DeleteTableInput,
    ) -> Result<DeleteTableOutput, ClientError> {
        self.call::<DeleteTable>(input).await
    }

    /// Describe a table.
    pub async fn describe_table(
        &self,
        input: DescribeTableInput,
    ) -> Result<DescribeTableOutput, ClientError> {
        self.call::<DescribeTable>(input).await
    }

    /// Change a table's throughput, billing mode or global indexes.
    pub async fn update_table(
        &self,
        input: UpdateTableInput,
    ) -> Result<UpdateTableOutput, ClientError> {
        self.call::<UpdateTable>(input).await
    }

    /// Fetch one page of table names.
    pub async fn list_tables(
        &self,
        input: ListTablesInput,
    ) -> Result<ListTablesOutput, ClientError> {
        self.call::<ListTables>(input).await
    }

    // -----------------------------------------------------------------------
    // Pagination
    // -----------------------------------------------------------------------

    /// Walk every page of a query, starting at `input.exclusive_start_key`.
    #[must_use]
    pub fn query_pages(&self, input: QueryInput) -> QueryPaginator {
        QueryPaginator::new(self.clone(), input)
    }

    /// Walk every page of a scan, starting at `input.exclusive_start_key`.
    #[must_use]
    pub fn scan_pages(&self, input: ScanInput) -> ScanPaginator {
        ScanPaginator::new(self.clone(), input)
    }

    /// Walk every page of table names.
    #[must_use]
    pub fn list_tables_pages(&self, input: ListTablesInput) -> ListTablesPaginator {
        ListTablesPaginator::new(self.clone(), input)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
