//! Scripted Telegraph transport for tests

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use super::{Method, TelegraphApi};
use crate::error::ApiError;

type Reply = Result<String, ApiError>;

/// Replays queued bodies per method name and records every call
#[derive(Default)]
pub struct MockApi {
    replies: Mutex<HashMap<&'static str, VecDeque<Reply>>>,
    calls: Mutex<Vec<Method>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, method: &'static str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(method)
            .or_default()
            .push_back(reply);
    }

    /// Queue an `ok: true` envelope around `result`
    pub fn push_ok(&self, method: &'static str, result: serde_json::Value) {
        let body = serde_json::json!({ "ok": true, "result": result }).to_string();
        self.push(method, Ok(body));
    }

    /// Queue an `ok: false` envelope
    pub fn push_remote_error(&self, method: &'static str, error: &str) {
        let body = serde_json::json!({ "ok": false, "error": error }).to_string();
        self.push(method, Ok(body));
    }

    /// Queue a raw body
    pub fn push_raw(&self, method: &'static str, body: &str) {
        self.push(method, Ok(body.to_string()));
    }

    /// Queue a transport failure
    pub fn push_transport_error(&self, method: &'static str, message: &str) {
        self.push(method, Err(ApiError::Transport(message.to_string())));
    }

    /// Every method executed so far
    pub fn calls(&self) -> Vec<Method> {
        self.calls.lock().unwrap().clone()
    }
}

impl TelegraphApi for MockApi {
    async fn execute(&self, method: &Method) -> Result<String, ApiError> {
        self.calls.lock().unwrap().push(method.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(method.name())
            .and_then(VecDeque::pop_front);
        reply.unwrap_or_else(|| Err(ApiError::Transport(format!("no reply queued for {}", method.name()))))
    }
}
