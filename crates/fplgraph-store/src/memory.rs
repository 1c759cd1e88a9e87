//! A scripted, in-memory [`GraphStore`].
//!
//! Replies are chosen by the first rule whose needle occurs in the query
//! text; unmatched queries return an empty result. Every call is recorded.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::StoreError;
use crate::graph_store::{GraphStore, QueryOutput};

#[derive(Debug, Clone)]
enum Reply {
    Output(QueryOutput),
    Fail(String),
}

#[derive(Debug, Clone)]
struct Rule {
    needle: String,
    reply: Reply,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub query: String,
    pub params: Map<String, Value>,
}

#[derive(Debug, Default)]
pub struct ScriptedStore {
    rules: Vec<Rule>,
    delay: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
    closed: AtomicBool,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, needle: impl Into<String>, output: QueryOutput) -> Self {
        self.rules.push(Rule {
            needle: needle.into(),
            reply: Reply::Output(output),
        });
        self
    }

    pub fn fail_on(mut self, needle: impl Into<String>, message: impl Into<String>) -> Self {
        self.rules.push(Rule {
            needle: needle.into(),
            reply: Reply::Fail(message.into()),
        });
        self
    }

    /// Sleep this long before answering any query.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl GraphStore for ScriptedStore {
    async fn run(&self, query: &str, params: &Map<String, Value>) -> Result<QueryOutput, StoreError> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        self.calls.lock().push(RecordedCall {
            query: query.to_string(),
            params: params.clone(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.rules.iter().find(|r| query.contains(&r.needle)) {
            Some(Rule {
                reply: Reply::Output(out),
                ..
            }) => Ok(out.clone()),
            Some(Rule {
                reply: Reply::Fail(message),
                ..
            }) => Err(StoreError::Neo4j {
                code: "Scripted.Failure".to_string(),
                message: message.clone(),
            }),
            None => Ok(QueryOutput::default()),
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
