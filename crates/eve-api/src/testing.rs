use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{EndpointError, EndpointResult};
use crate::transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};

/// Scripted transport: answers each `(method, url)` with the response registered for it and
/// records every request it sees.
#[derive(Clone, Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportState>>,
    yield_before_response: bool,
}

#[derive(Debug, Default)]
struct MockTransportState {
    routes: BTreeMap<(HttpMethod, String), HttpResponse>,
    requests: Vec<HttpRequest>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Yield to the runtime once before answering, so concurrent callers interleave.
    pub fn with_yield(mut self) -> Self {
        self.yield_before_response = true;
        self
    }

    /// Registers (or replaces) the response for `method url`.
    pub fn respond(&self, method: HttpMethod, url: &str, status: u16, body: Option<Value>) {
        let mut state = self.inner.lock().expect("mock transport mutex poisoned");
        state
            .routes
            .insert((method, url.to_string()), HttpResponse::new(status, body));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.inner
            .lock()
            .expect("mock transport mutex poisoned")
            .requests
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.inner
            .lock()
            .expect("mock transport mutex poisoned")
            .requests
            .len()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.inner
            .lock()
            .expect("mock transport mutex poisoned")
            .requests
            .last()
            .cloned()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> EndpointResult<HttpResponse> {
        if self.yield_before_response {
            tokio::task::yield_now().await;
        }

        let mut state = self
            .inner
            .lock()
            .map_err(|_| EndpointError::Backend("mock transport mutex poisoned".to_string()))?;
        let key = (request.method, request.url.clone());
        state.requests.push(request);
        state.routes.get(&key).cloned().ok_or_else(|| {
            EndpointError::Transport(format!("no scripted response for {} {}", key.0.as_str(), key.1))
        })
    }
}
