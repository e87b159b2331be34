//! Request gateway
//!
//! Issues authenticated HTTP requests against the service API and
//! normalizes the response into either a JSON value or an [`ApiError`].
//!
//! ## Authentication modes
//!
//! - `Auth::Session`: bearer token from the [`TokenProvider`]
//! - `Auth::TaskToken`: single-use token sent as a `token` query parameter,
//!   used for task status polls that must survive session invalidation
//! - `Auth::None`: nothing attached (login, first-run bootstrap, version)

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::Form;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::auth::TokenProvider;
use crate::error::{ApiError, ApiResult};

/// Deadline applied to binary uploads unless the target sets its own
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// How a request authenticates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// Bearer token from the session token provider
    Session,
    /// No credentials
    None,
    /// Task-scoped token passed as a query parameter
    TaskToken(String),
}

/// Request body
#[derive(Debug)]
pub enum Body {
    Empty,
    /// Structured body, sent as JSON
    Json(Value),
    /// Binary/multipart body, passed through unmodified
    Multipart(Form),
}

/// Description of a single request, relative to the API root
#[derive(Debug)]
pub struct Target {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Body,
    headers: Vec<(String, String)>,
    auth: Auth,
    deadline: Option<Duration>,
}

impl Target {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: Body::Empty,
            headers: Vec::new(),
            auth: Auth::Session,
            deadline: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append query parameters, preserving their order
    pub fn query<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Body::Json(body);
        self
    }

    pub fn multipart(mut self, form: Form) -> Self {
        self.body = Body::Multipart(form);
        self
    }

    /// Override or add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    pub fn without_auth(self) -> Self {
        self.auth(Auth::None)
    }

    /// Abort the request if no response arrives within `deadline`
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn auth_mode(&self) -> &Auth {
        &self.auth
    }

    pub fn is_upload(&self) -> bool {
        matches!(self.body, Body::Multipart(_))
    }
}

/// Something that can carry a [`Target`] to the service
///
/// The gateway is the production implementation; the synchronizer, the
/// task poller and the API families only depend on this trait.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and return the decoded success body
    ///
    /// Empty or non-JSON success bodies decode to `Value::Null`.
    async fn send(&self, target: Target) -> ApiResult<Value>;

    /// Absolute URL for a path and query, without sending anything
    fn resolve(&self, path: &str, query: &[(String, String)]) -> ApiResult<String>;
}

/// HTTP gateway to the service API
pub struct Gateway {
    client: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenProvider>,
    upload_timeout: Duration,
}

impl Gateway {
    /// Create a gateway for a server URL (`http://host:port`)
    ///
    /// Request paths are resolved against `<server_url>/api/`.
    pub fn new(server_url: &str, tokens: Arc<dyn TokenProvider>) -> ApiResult<Self> {
        let base_url = api_root(server_url)?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("tvctl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            tokens,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
        })
    }

    /// Set the deadline applied to uploads
    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the absolute URL for a path relative to the API root
    pub fn url_for(&self, path: &str, query: &[(String, String)]) -> ApiResult<Url> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidTarget(format!("{}: {}", path, e)))?;

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        Ok(url)
    }

    /// Turn a target into a ready-to-send request plus its deadline
    pub fn build_request(&self, target: Target) -> ApiResult<(reqwest::Request, Option<Duration>)> {
        let Target {
            method,
            path,
            mut query,
            body,
            headers: overrides,
            auth,
            deadline,
        } = target;

        let deadline = match body {
            Body::Multipart(_) => Some(deadline.unwrap_or(self.upload_timeout)),
            _ => deadline,
        };

        let mut headers = HeaderMap::new();
        match auth {
            Auth::Session => {
                let token = self.tokens.token()?;
                let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|_| ApiError::Auth("token is not a valid header value".to_string()))?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            Auth::TaskToken(token) => query.push(("token".to_string(), token)),
            Auth::None => {}
        }

        let url = self.url_for(&path, &query)?;
        let mut builder = self.client.request(method, url);

        builder = match body {
            Body::Empty => builder,
            Body::Json(value) => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                builder.body(serde_json::to_vec(&value)?)
            }
            Body::Multipart(form) => builder.multipart(form),
        };

        for (name, value) in overrides {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ApiError::InvalidTarget(format!("bad header name '{}'", name)))?;
            let header_value = HeaderValue::from_str(&value)
                .map_err(|_| ApiError::InvalidTarget(format!("bad value for header '{}'", name)))?;
            headers.insert(header_name, header_value);
        }

        let request = builder.headers(headers).build()?;
        Ok((request, deadline))
    }

    /// Execute a request and read the whole body
    async fn exchange(&self, request: reqwest::Request) -> ApiResult<(StatusCode, String)> {
        let response = self.client.execute(request).await?;
        let status = response.status();
        let text = response.text().await?;
        Ok((status, text))
    }
}

#[async_trait]
impl Transport for Gateway {
    async fn send(&self, target: Target) -> ApiResult<Value> {
        let label = format!("{} {}", target.method(), target.path());
        let (request, deadline) = self.build_request(target)?;
        debug!("Sending {}", label);

        let exchange = self.exchange(request);
        let (status, text) = match deadline {
            Some(after) => match tokio::time::timeout(after, exchange).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!("{} aborted after {:?}", label, after);
                    return Err(ApiError::Timeout { after });
                }
            },
            None => exchange.await?,
        };

        debug!("{} -> {}", label, status);
        normalize(status, text)
    }

    fn resolve(&self, path: &str, query: &[(String, String)]) -> ApiResult<String> {
        self.url_for(path, query).map(String::from)
    }
}

/// Map a status and body onto the gateway's result shape
pub(crate) fn normalize(status: StatusCode, text: String) -> ApiResult<Value> {
    if !status.is_success() {
        return Err(ApiError::from_response(status.as_u16(), text));
    }

    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    Ok(serde_json::from_str(&text).unwrap_or(Value::Null))
}

/// `http://host:port` -> `http://host:port/api/`
fn api_root(server_url: &str) -> ApiResult<Url> {
    let mut root = server_url.trim_end_matches('/').to_string();
    if !root.ends_with("/api") {
        root.push_str("/api");
    }
    root.push('/');

    Url::parse(&root).map_err(|e| ApiError::InvalidTarget(format!("{}: {}", server_url, e)))
}

/// Percent-encode a value for use as a single path segment
pub fn encode_segment(segment: &str) -> String {
    let Ok(mut url) = Url::parse("http://segment.invalid/") else {
        return segment.to_string();
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().push(segment);
    }
    url.path().trim_start_matches('/').to_string()
}
