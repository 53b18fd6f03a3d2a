//! Shared fixtures: a scripted transport and a client wired to a manual clock

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use clickup_toolkit::client::{
    HttpTransport, ManualClock, RateLimiter, RawResponse, RequestEnvelope, ResourceClient,
    RetryPolicy, RetryingTransport, TransportFailure,
};

pub type Reply = Result<RawResponse, TransportFailure>;
type Responder = Box<dyn Fn(&RequestEnvelope) -> Reply + Send + Sync>;

/// Transport that answers from a script, then from a fallback responder
pub struct FakeTransport {
    script: Mutex<VecDeque<Reply>>,
    fallback: Option<Responder>,
    requests: Mutex<Vec<RequestEnvelope>>,
}

impl FakeTransport {
    /// Replies in order; panics when the script runs out
    pub fn scripted(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(replies.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Every request is answered by `responder`
    pub fn responding<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&RequestEnvelope) -> Reply + Send + Sync + 'static,
    {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Some(Box::new(responder)),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Number of requests sent
    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    /// Requests sent, in order
    pub fn requests(&self) -> Vec<RequestEnvelope> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn send(&self, envelope: &RequestEnvelope) -> Result<RawResponse, TransportFailure> {
        self.requests.lock().push(envelope.clone());
        if let Some(reply) = self.script.lock().pop_front() {
            return reply;
        }
        match &self.fallback {
            Some(responder) => responder(envelope),
            None => panic!("unexpected request: {}", envelope.describe()),
        }
    }
}

/// Response with a JSON body and no headers
pub fn json_reply(status: u16, body: Value) -> Reply {
    Ok(RawResponse::new(
        status,
        Vec::<(String, String)>::new(),
        body.to_string(),
    ))
}

/// Response with headers
pub fn reply_with_headers(status: u16, headers: &[(&str, &str)], body: Value) -> Reply {
    Ok(RawResponse::new(
        status,
        headers.iter().map(|(k, v)| (*k, v.to_string())),
        body.to_string(),
    ))
}

/// Minimal task payload as the API returns it
pub fn task_json(id: &str, name: &str, status: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "status": {"status": status, "type": "custom"},
        "assignees": [],
        "tags": [],
        "url": format!("https://app.clickup.com/t/{id}")
    })
}

/// Client over `transport` with a generous limiter on a manual clock and no jitter
pub fn client_with(transport: Arc<FakeTransport>) -> (ResourceClient, Arc<ManualClock>) {
    client_with_limit(transport, 1000, 3)
}

/// Client with an explicit request ceiling and retry count
pub fn client_with_limit(
    transport: Arc<FakeTransport>,
    limit: u32,
    max_retries: u32,
) -> (ResourceClient, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let limiter = Arc::new(RateLimiter::new(limit, Duration::from_secs(60), clock.clone()));
    let policy = RetryPolicy::default()
        .with_max_retries(max_retries)
        .without_jitter();
    let retrying = RetryingTransport::new(transport, limiter).with_policy(policy);
    (ResourceClient::new(retrying), clock)
}
