//! HTTP session seam.
//!
//! A [`Session`] owns whatever cookie/auth state a run accumulates and
//! performs single exchanges without any retry logic of its own. The
//! production implementation is [`ReqwestSession`]; retries live in
//! [`crate::executor`].

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport-level failure of a single exchange.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The underlying HTTP client failed (DNS, reset, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A configured header could not be encoded.
    #[error("invalid header '{name}': {message}")]
    InvalidHeader {
        /// Header name as configured.
        name: String,
        /// Encoding failure.
        message: String,
    },

    /// The connection could not be made or was dropped.
    #[error("connection error: {0}")]
    Connection(String),
}

/// A single outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Request headers.
    pub headers: BTreeMap<String, String>,
    /// URL-encoded form body, if any.
    pub form: Option<BTreeMap<String, String>>,
}

impl HttpRequest {
    /// Creates a `GET` request for `url`.
    #[must_use]
    pub fn get(url: &str) -> Self {
        Self::new(Method::GET, url)
    }

    /// Creates a `POST` request for `url`.
    #[must_use]
    pub fn post(url: &str) -> Self {
        Self::new(Method::POST, url)
    }

    /// Creates a request with an arbitrary method.
    #[must_use]
    pub fn new(method: Method, url: &str) -> Self {
        Self {
            method,
            url: url.to_owned(),
            headers: BTreeMap::new(),
            form: None,
        }
    }

    /// Replaces the request headers.
    #[must_use]
    pub fn with_headers(mut self, headers: &BTreeMap<String, String>) -> Self {
        headers.clone_into(&mut self.headers);
        self
    }

    /// Attaches a URL-encoded form body.
    #[must_use]
    pub fn with_form(mut self, form: BTreeMap<String, String>) -> Self {
        self.form = Some(form);
        self
    }
}

/// A fully read response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Final URL after redirects.
    pub url: String,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Performs one HTTP exchange against shared session state.
#[async_trait]
pub trait Session: Send + Sync {
    /// Sends `request` once and reads the whole body.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the exchange fails before a complete
    /// response is read. Non-success statuses are not errors here.
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Options for building a [`ReqwestSession`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Skip TLS certificate verification. The target portal serves an
    /// incomplete certificate chain.
    pub accept_invalid_certs: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            accept_invalid_certs: false,
        }
    }
}

/// [`Session`] backed by a `reqwest` client with a cookie store.
#[derive(Debug, Clone)]
pub struct ReqwestSession {
    client: reqwest::Client,
}

impl ReqwestSession {
    /// Builds a fresh session with an empty cookie jar.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Http`] if the client cannot be built.
    pub fn new(options: &SessionOptions) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(options.timeout)
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .build()?;
        Ok(Self { client })
    }

    fn header_map(
        headers: &BTreeMap<String, String>,
    ) -> Result<reqwest::header::HeaderMap, TransportError> {
        let mut header_map = reqwest::header::HeaderMap::new();
        for (key, value) in headers {
            let name = reqwest::header::HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                TransportError::InvalidHeader {
                    name: key.clone(),
                    message: e.to_string(),
                }
            })?;
            let val = reqwest::header::HeaderValue::from_str(value).map_err(|e| {
                TransportError::InvalidHeader {
                    name: key.clone(),
                    message: e.to_string(),
                }
            })?;
            header_map.insert(name, val);
        }
        Ok(header_map)
    }
}

#[async_trait]
impl Session for ReqwestSession {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.as_str())
            .headers(Self::header_map(&request.headers)?);
        if let Some(form) = &request.form {
            builder = builder.form(form);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_connect() {
                TransportError::Connection(e.to_string())
            } else {
                TransportError::Http(e)
            }
        })?;
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse { status, url, body })
    }
}
