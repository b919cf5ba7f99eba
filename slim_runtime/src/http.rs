// Copyright 2025 the Slim Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Blocking HTTP transport built on `reqwest`.

use std::collections::VecDeque;

use reqwest::blocking::{Client, multipart};
use reqwest::redirect::Policy;
use slim_responder::types::Method;

use crate::error::TransportError;
use crate::transport::{Body, Headers, Request, RequestId, Response, Transport};

/// Sends requests over HTTP.
///
/// Each request is performed when sent and its completion queued for
/// [`Transport::poll`]. Redirects are never followed, so redirect headers
/// reach the engine unchanged.
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    completed: VecDeque<(RequestId, Result<Response, TransportError>)>,
}

impl HttpTransport {
    /// Build a transport with a fresh client.
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .redirect(Policy::none())
            .build()
            .map_err(|e| TransportError::Failed(e.to_string()))?;
        Ok(Self::with_client(client))
    }

    /// Wrap an existing client. It should not follow redirects.
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            completed: VecDeque::new(),
        }
    }

    fn perform(&self, request: Request) -> Result<Response, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };
        let mut builder = self.client.request(method, request.url);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        builder = match request.body {
            Body::Empty => builder,
            Body::Json(json) => builder.body(json),
            Body::Multipart(fields) => {
                let form = fields
                    .into_iter()
                    .fold(multipart::Form::new(), |form, (name, value)| {
                        form.text(name, value)
                    });
                builder.multipart(form)
            }
        };

        let response = builder
            .send()
            .map_err(|e| TransportError::Failed(e.to_string()))?;
        let status = response.status().as_u16();
        let mut headers = Headers::new();
        for (name, value) in response.headers() {
            match value.to_str() {
                Ok(value) => headers.insert(name.as_str(), value),
                Err(_) => tracing::debug!(header = %name, "skipping non-text header"),
            }
        }
        let body = response
            .text()
            .map_err(|e| TransportError::Failed(e.to_string()))?;
        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

impl Transport for HttpTransport {
    fn send(&mut self, id: RequestId, request: Request) {
        tracing::debug!(?id, method = %request.method, url = %request.url, "http request");
        let result = self.perform(request);
        if let Err(err) = &result {
            tracing::warn!(?id, error = %err, "http request failed");
        }
        self.completed.push_back((id, result));
    }

    fn poll(&mut self) -> Option<(RequestId, Result<Response, TransportError>)> {
        self.completed.pop_front()
    }
}
