//! In-memory [`Session`] that replays canned responses.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use reqwest::Method;

use crate::session::{HttpRequest, HttpResponse, Session, TransportError};

type Script = VecDeque<Result<HttpResponse, String>>;

/// Replays scripted responses per `(method, url)` and records every
/// request it receives.
///
/// Responses for the same route are returned in the order they were
/// scripted. A route with no responses left fails with
/// [`TransportError::Connection`].
#[derive(Debug, Default)]
pub struct ScriptedSession {
    routes: Mutex<BTreeMap<(String, String), Script>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedSession {
    /// Creates a session with no routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response with `status` and `body` for `method url`.
    #[must_use]
    pub fn respond(self, method: &Method, url: &str, status: u16, body: &str) -> Self {
        self.push(
            method,
            url,
            Ok(HttpResponse {
                status,
                url: url.to_owned(),
                body: body.as_bytes().to_vec(),
            }),
        );
        self
    }

    /// Queues a transport failure for `method url`.
    #[must_use]
    pub fn fail(self, method: &Method, url: &str, message: &str) -> Self {
        self.push(method, url, Err(message.to_owned()));
        self
    }

    /// Every request received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, method: &Method, url: &str, entry: Result<HttpResponse, String>) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry((method.to_string(), url.to_owned()))
            .or_default()
            .push_back(entry);
    }
}

#[async_trait]
impl Session for ScriptedSession {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let next = self
            .routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&(request.method.to_string(), request.url.clone()))
            .and_then(VecDeque::pop_front);

        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(TransportError::Connection(message)),
            None => Err(TransportError::Connection(format!(
                "no scripted response for {} {}",
                request.method, request.url
            ))),
        }
    }
}
