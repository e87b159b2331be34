//! Test doubles shared by unit tests

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use crate::error::{ApiError, ApiResult, INVALID_PAGE_DETAIL};
use crate::gateway::{Auth, Body, Target, Transport};

/// A request as the transport saw it
#[derive(Debug, Clone)]
pub(crate) struct Sent {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub auth: Auth,
    pub body: Option<Value>,
    pub multipart: bool,
}

impl Sent {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

type Handler = Box<dyn Fn(&Sent) -> ApiResult<Value> + Send + Sync>;

/// Transport that records every request and answers from a script
pub(crate) struct ScriptedTransport {
    handler: Handler,
    sent: Mutex<Vec<Sent>>,
}

impl ScriptedTransport {
    pub fn new(handler: impl Fn(&Sent) -> ApiResult<Value> + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Answer requests with `replies` in order, whatever they ask for
    pub fn replies(replies: Vec<ApiResult<Value>>) -> Self {
        let queue = Mutex::new(VecDeque::from(replies));
        Self::new(move |sent: &Sent| {
            queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| panic!("no scripted reply left for {}", sent.path))
        })
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.path == path)
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, target: Target) -> ApiResult<Value> {
        let sent = Sent {
            method: target.method().clone(),
            path: target.path().to_string(),
            query: target.query_pairs().to_vec(),
            auth: target.auth_mode().clone(),
            body: match target.body() {
                Body::Json(value) => Some(value.clone()),
                _ => None,
            },
            multipart: target.is_upload(),
        };
        self.sent.lock().unwrap().push(sent.clone());
        (self.handler)(&sent)
    }

    fn resolve(&self, path: &str, query: &[(String, String)]) -> ApiResult<String> {
        let mut url = url::Url::parse("http://test.local/api/")
            .and_then(|base| base.join(path))
            .map_err(|e| ApiError::InvalidTarget(e.to_string()))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url.to_string())
    }
}

/// The error the service returns for a page past the end of a collection
pub(crate) fn invalid_page() -> ApiError {
    ApiError::from_response(404, format!(r#"{{"detail": "{}"}}"#, INVALID_PAGE_DETAIL))
}
