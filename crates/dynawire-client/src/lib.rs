//! Typed DynamoDB wire-protocol client.
//!
//! Requests are plain structs from [`dynawire_model`]. [`Client::call`]
//! checks each one against its [`OperationContract`], encodes it, hands it
//! to a [`Transport`] and decodes the answer into a typed output or a
//! classified [`ClientError`]. The client never retries and never caches.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use dynawire_auth::Credentials;
//! use dynawire_client::{Client, ClientConfig, HyperTransport};
//! use dynawire_model::input::GetItemInput;
//! use dynawire_model::{AttributeValue, Key};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env();
//! let transport = HyperTransport::new(&config, Credentials::from_env()?)?;
//! let client = Client::new(Arc::new(transport), config);
//!
//! let output = client
//!     .get_item(GetItemInput {
//!         table_name: "users".to_owned(),
//!         key: Key::from([("id".to_owned(), AttributeValue::from("u-1"))]),
//!         ..GetItemInput::default()
//!     })
//!     .await?;
//! println!("{:?}", output.item);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod contract;
pub mod error;
pub mod hyper_transport;
pub mod paginator;
pub mod transport;
mod waiter;

pub use client::Client;
pub use config::ClientConfig;
pub use contract::{ContractContext, OperationContract};
pub use error::ClientError;
pub use hyper_transport::HyperTransport;
pub use paginator::{ListTablesPaginator, QueryPaginator, ScanPaginator};
pub use transport::{SendFuture, Transport, TransportFailure};
