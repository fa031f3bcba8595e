//! Shared helpers for the client tests: a scripted, recording transport.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Once};

use bytes::Bytes;
use dynawire_client::{Client, ClientConfig, SendFuture, Transport, TransportFailure};
use dynawire_model::{AttributeValue, Item};
use parking_lot::Mutex;
use serde_json::{Value, json};

static INIT: Once = Once::new();

/// Initialize tracing (once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// One scripted answer.
#[derive(Debug, Clone)]
pub enum Reply {
    /// 200 with this JSON body.
    Ok(Value),
    /// A non-2xx status with this JSON body.
    Fail(u16, Value),
    /// No status at all, e.g. a refused connection.
    Io(String),
    /// Never answer.
    Hang,
}

/// A request as the transport saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub target: String,
    pub body: Value,
}

/// Answers requests from a script and records everything it is sent.
#[derive(Debug, Default)]
pub struct StubTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<Recorded>>,
}

impl StubTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, body: Value) -> &Self {
        self.replies.lock().push_back(Reply::Ok(body));
        self
    }

    pub fn fail(&self, status: u16, code: &str, message: &str) -> &Self {
        self.replies.lock().push_back(Reply::Fail(
            status,
            json!({
                "__type": format!("com.amazonaws.dynamodb.v20120810#{code}"),
                "message": message,
            }),
        ));
        self
    }

    pub fn push(&self, reply: Reply) -> &Self {
        self.replies.lock().push_back(reply);
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn remaining_replies(&self) -> usize {
        self.replies.lock().len()
    }
}

impl Transport for StubTransport {
    fn send(&self, target: &str, body: Bytes) -> SendFuture<'_> {
        let body: Value = serde_json::from_slice(&body).expect("request body is JSON");
        self.requests.lock().push(Recorded {
            target: target.to_owned(),
            body,
        });
        let reply = self.replies.lock().pop_front();
        let target = target.to_owned();
        Box::pin(async move {
            match reply {
                Some(Reply::Ok(value)) => Ok(Bytes::from(value.to_string())),
                Some(Reply::Fail(status, value)) => {
                    Err(TransportFailure::http(status, Bytes::from(value.to_string())))
                }
                Some(Reply::Io(message)) => Err(TransportFailure::io(message)),
                Some(Reply::Hang) => std::future::pending().await,
                None => panic!("unscripted request to {target}"),
            }
        })
    }
}

/// A client over a fresh stub.
pub fn stub_client(config: ClientConfig) -> (Client, Arc<StubTransport>) {
    init_tracing();
    let stub = StubTransport::new();
    let client = Client::new(stub.clone(), config);
    (client, stub)
}

pub fn item(pairs: &[(&str, AttributeValue)]) -> Item {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), v.clone()))
        .collect()
}

pub fn s(value: &str) -> AttributeValue {
    AttributeValue::from(value)
}

pub fn n(value: impl std::fmt::Display) -> AttributeValue {
    AttributeValue::number(value)
}
