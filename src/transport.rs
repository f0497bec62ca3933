//! HTTP transport seam.
//!
//! Every resolver talks to the network through [`Transport`], so tests can
//! swap in a scripted fake (see `test_helpers::MockTransport`). The production
//! implementation is [`ReqwestTransport`], a blocking `reqwest` client: work
//! inside one article is strictly sequential, and the batch parallelism comes
//! from rayon, not from an async runtime.
//!
//! No timeout is configured here beyond the client's default; a slow endpoint
//! surfaces as a [`TransportError`] like any other failure.

use std::borrow::Cow;
use std::collections::HashMap;
use thiserror::Error;
use url::Url;

const USER_AGENT: &str = concat!("ojs-harvest/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },
    #[error("Request to {url} failed: {message}")]
    RequestFailed { url: String, message: String },
    #[error("Reading response body from {url} failed: {message}")]
    Body { url: String, message: String },
    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

/// A GET request: URL, query parameters, optional bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub bearer: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            bearer: None,
        }
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// The absolute URL with query parameters encoded.
    pub fn full_url(&self) -> Result<Url, TransportError> {
        let invalid = || TransportError::InvalidUrl {
            url: self.url.clone(),
        };
        if self.query.is_empty() {
            Url::parse(&self.url).map_err(|_| invalid())
        } else {
            Url::parse_with_params(&self.url, &self.query).map_err(|_| invalid())
        }
    }
}

/// Status, headers (names lowercased) and body of a response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The `Content-Type` header, or `""` when the server sent none.
    pub fn content_type(&self) -> &str {
        self.header("content-type").unwrap_or_default()
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Something that can perform a GET request.
///
/// `Sync` so one transport can be shared by every rayon worker.
pub trait Transport: Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Plain GET without query parameters or credentials.
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        self.send(&HttpRequest::get(url))
    }
}

/// Blocking `reqwest` transport.
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.full_url()?;
        let mut builder = self.client.get(url.as_str());
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .map_err(|e| TransportError::RequestFailed {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .map_err(|e| TransportError::Body {
                url: url.to_string(),
                message: e.to_string(),
            })?
            .to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
