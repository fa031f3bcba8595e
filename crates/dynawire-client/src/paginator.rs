//! Cursor-driven pagination for Query, Scan and ListTables.
//!
//! A paginator owns the request and advances its cursor after each page.
//! It stops once a page comes back without a cursor. An error leaves the
//! cursor where it was, so calling `next_page` again retries the same page.

use dynawire_model::Item;
use dynawire_model::input::{ListTablesInput, QueryInput, ScanInput};
use dynawire_model::output::{ListTablesOutput, QueryOutput, ScanOutput};
use dynawire_model::types::ConsumedCapacity;

use crate::client::Client;
use crate::contract::{ListTables, Query, Scan};
use crate::error::ClientError;

fn merge_capacity(acc: &mut Option<ConsumedCapacity>, next: Option<ConsumedCapacity>) {
    match (acc.as_mut(), next) {
        (Some(total), Some(next)) => total.merge(&next),
        (None, next) => *acc = next,
        (Some(_), None) => {}
    }
}

/// Pages of a query.
///
/// Never yields an empty page that still carries a cursor: such pages are
/// folded into the following one, with `Count`, `ScannedCount` and consumed
/// capacity summed across the folded pages.
#[derive(Debug)]
pub struct QueryPaginator {
    client: Client,
    input: QueryInput,
    done: bool,
}

impl QueryPaginator {
    pub(crate) fn new(client: Client, input: QueryInput) -> Self {
        Self {
            client,
            input,
            done: false,
        }
    }

    /// Fetch the next non-empty page, or `None` once the query is exhausted.
    pub async fn next_page(&mut self) -> Option<Result<QueryOutput, ClientError>> {
        if self.done {
            return None;
        }
        let mut folded: Option<QueryOutput> = None;
        loop {
            let page = match self.client.call::<Query>(self.input.clone()).await {
                Ok(page) => page,
                Err(err) => return Some(Err(err)),
            };
            self.input.exclusive_start_key.clone_from(&page.last_evaluated_key);

            let page = match folded.take() {
                None => page,
                Some(mut acc) => {
                    acc.items.extend(page.items);
                    acc.count += page.count;
                    acc.scanned_count += page.scanned_count;
                    acc.last_evaluated_key = page.last_evaluated_key;
                    merge_capacity(&mut acc.consumed_capacity, page.consumed_capacity);
                    acc
                }
            };

            if page.last_evaluated_key.is_none() {
                self.done = true;
                return Some(Ok(page));
            }
            if page.count > 0 || !page.items.is_empty() {
                return Some(Ok(page));
            }
            folded = Some(page);
        }
    }

    /// Collect the items of every remaining page.
    pub async fn collect_items(mut self) -> Result<Vec<Item>, ClientError> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await {
            items.extend(page?.items);
        }
        Ok(items)
    }
}

/// Pages of a scan, yielded as the server returns them.
///
/// A filtered scan can return empty pages that still carry a cursor; keep
/// calling `next_page` until it returns `None`.
#[derive(Debug)]
pub struct ScanPaginator {
    client: Client,
    input: ScanInput,
    done: bool,
}

impl ScanPaginator {
    pub(crate) fn new(client: Client, input: ScanInput) -> Self {
        Self {
            client,
            input,
            done: false,
        }
    }

    /// Fetch the next page, or `None` once the scan is exhausted.
    pub async fn next_page(&mut self) -> Option<Result<ScanOutput, ClientError>> {
        if self.done {
            return None;
        }
        let page = match self.client.call::<Scan>(self.input.clone()).await {
            Ok(page) => page,
            Err(err) => return Some(Err(err)),
        };
        self.input.exclusive_start_key.clone_from(&page.last_evaluated_key);
        self.done = page.last_evaluated_key.is_none();
        Some(Ok(page))
    }

    /// Collect the items of every remaining page.
    pub async fn collect_items(mut self) -> Result<Vec<Item>, ClientError> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await {
            items.extend(page?.items);
        }
        Ok(items)
    }
}

/// Pages of table names.
#[derive(Debug)]
pub struct ListTablesPaginator {
    client: Client,
    input: ListTablesInput,
    done: bool,
}

impl ListTablesPaginator {
    pub(crate) fn new(client: Client, input: ListTablesInput) -> Self {
        Self {
            client,
            input,
            done: false,
        }
    }

    /// Fetch the next page, or `None` once every table name has been listed.
    pub async fn next_page(&mut self) -> Option<Result<ListTablesOutput, ClientError>> {
        if self.done {
            return None;
        }
        let page = match self.client.call::<ListTables>(self.input.clone()).await {
            Ok(page) => page,
            Err(err) => return Some(Err(err)),
        };
        self.input
            .exclusive_start_table_name
            .clone_from(&page.last_evaluated_table_name);
        self.done = page.last_evaluated_table_name.is_none();
        Some(Ok(page))
    }

    /// Collect every remaining table name.
    pub async fn collect_names(mut self) -> Result<Vec<String>, ClientError> {
        let mut names = Vec::new();
        while let Some(page) = self.next_page().await {
            names.extend(page?.table_names);
        }
        Ok(names)
    }
}
