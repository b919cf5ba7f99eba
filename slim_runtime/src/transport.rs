// Copyright 2025 the Slim Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Request transport seam.
//!
//! Requests are handed to a [`Transport`] with an id and their completions are
//! polled later, so several requests can be in flight at once and complete in
//! any order. The engine never blocks on a response.

use std::collections::VecDeque;

use slim_responder::types::Method;
use url::Url;

use crate::error::TransportError;

/// Identifies one in-flight request.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

/// Ordered header list with case-insensitive lookup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    /// Create an empty header list.
    pub fn new() -> Self {
        Self::default()
    }

    /// First value of `name`, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set `name`, replacing any existing values.
    pub fn insert(&mut self, name: &str, value: &str) {
        self.0.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.0.push((name.to_owned(), value.to_owned()));
    }

    /// Iterate headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Request payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Body {
    /// No body.
    #[default]
    Empty,
    /// Form fields sent as `multipart/form-data`.
    Multipart(Vec<(String, String)>),
    /// A JSON document sent as `application/json`.
    Json(String),
}

/// An outgoing request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    /// Method.
    pub method: Method,
    /// Absolute URL, query included.
    pub url: Url,
    /// Request headers.
    pub headers: Headers,
    /// Payload.
    pub body: Body,
}

/// A completed response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    /// Status code.
    pub status: u16,
    /// Response headers.
    pub headers: Headers,
    /// Body text.
    pub body: String,
}

impl Response {
    /// An empty response with `status`.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: String::new(),
        }
    }

    /// A `200` markup response.
    pub fn html(body: impl Into<String>) -> Self {
        Self::new(200)
            .with_header("Content-Type", "text/html; charset=utf-8")
            .with_body(body)
    }

    /// A `200` plain-text response.
    pub fn text(body: impl Into<String>) -> Self {
        Self::new(200)
            .with_header("Content-Type", "text/plain; charset=utf-8")
            .with_body(body)
    }

    /// Set a header.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns true for statuses in `200..300`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Delivers requests and reports their completions.
pub trait Transport {
    /// Start delivering `request`.
    fn send(&mut self, id: RequestId, request: Request);

    /// Next completed request, if any.
    fn poll(&mut self) -> Option<(RequestId, Result<Response, TransportError>)>;
}

type Handler = Box<dyn FnMut(&Request) -> Result<Response, TransportError>>;

struct Route {
    method: Method,
    path: String,
    handler: Handler,
}

/// In-memory transport answering from registered routes.
///
/// Routes match on method and URL path. Completions are queued at send time
/// and delivered by [`Transport::poll`]; [`ScriptedTransport::hold`] keeps them
/// back so tests can reorder or interleave them.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Vec<Route>,
    /// Every request sent, oldest first.
    pub requests: Vec<Request>,
    completed: VecDeque<(RequestId, Result<Response, TransportError>)>,
    held: bool,
}

impl core::fmt::Debug for ScriptedTransport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScriptedTransport")
            .field("routes", &self.routes.len())
            .field("requests", &self.requests.len())
            .field("completed", &self.completed.len())
            .field("held", &self.held)
            .finish_non_exhaustive()
    }
}

impl ScriptedTransport {
    /// Create a transport with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method path` with a handler. Later registrations take precedence.
    pub fn route(
        &mut self,
        method: Method,
        path: &str,
        handler: impl FnMut(&Request) -> Result<Response, TransportError> + 'static,
    ) -> &mut Self {
        self.routes.push(Route {
            method,
            path: path.to_owned(),
            handler: Box::new(handler),
        });
        self
    }

    /// Answer `method path` with a fixed response.
    pub fn respond(&mut self, method: Method, path: &str, response: Response) -> &mut Self {
        self.route(method, path, move |_| Ok(response.clone()))
    }

    /// Fail `method path` without a response.
    pub fn fail(&mut self, method: Method, path: &str, reason: &str) -> &mut Self {
        let reason = reason.to_owned();
        self.route(method, path, move |_| Err(TransportError::Failed(reason.clone())))
    }

    /// Hold completions until [`ScriptedTransport::release`].
    pub fn hold(&mut self) {
        self.held = true;
    }

    /// Deliver held completions, optionally reversed.
    pub fn release(&mut self, reverse: bool) {
        self.held = false;
        if reverse {
            self.completed.make_contiguous().reverse();
        }
    }

    /// Number of completions not yet polled.
    pub fn pending(&self) -> usize {
        self.completed.len()
    }
}

impl Transport for ScriptedTransport {
    fn send(&mut self, id: RequestId, request: Request) {
        tracing::debug!(?id, method = %request.method, url = %request.url, "scripted request");
        let result = match self
            .routes
            .iter_mut()
            .rev()
            .find(|r| r.method == request.method && r.path == request.url.path())
        {
            Some(route) => (route.handler)(&request),
            None => Err(TransportError::Unscripted {
                method: request.method.to_string(),
                path: request.url.path().to_owned(),
            }),
        };
        self.requests.push(request);
        self.completed.push_back((id, result));
    }

    fn poll(&mut self) -> Option<(RequestId, Result<Response, TransportError>)> {
        if self.held {
            return None;
        }
        self.completed.pop_front()
    }
}
