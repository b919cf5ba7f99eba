// Copyright 2025 the Slim Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for the runtime.

use slim_dom::{DomError, SelectorError};
use thiserror::Error;

/// Failure delivering a request or receiving its response.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Failed(String),
    /// The response status was rejected by the configured policy.
    #[error("server responded with status {0}")]
    Status(u16),
    /// A scripted transport had nothing registered for the request.
    #[error("no response scripted for {method} {path}")]
    Unscripted {
        /// Request method.
        method: String,
        /// Request path.
        path: String,
    },
}

/// Failure evaluating an inline script.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The host does not evaluate scripts.
    #[error("scripted evaluation is not supported by this host")]
    Unsupported,
    /// The script ran and failed.
    #[error("script failed: {0}")]
    Failed(String),
}

/// Failure on the live-update socket.
#[derive(Debug, Error)]
pub enum SocketError {
    /// No connector is configured; the bridge stays inert.
    #[error("live updates are not supported by this connector")]
    Unsupported,
    /// The endpoint could not be turned into a socket URL.
    #[error("invalid socket endpoint `{0}`")]
    Endpoint(String),
    /// Connecting failed.
    #[error("failed to connect to {url}: {reason}")]
    Connect {
        /// Endpoint URL.
        url: String,
        /// Underlying reason.
        reason: String,
    },
    /// An established connection failed.
    #[error("socket error: {0}")]
    Io(String),
}

/// Errors surfaced by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Document operation failed.
    #[error(transparent)]
    Dom(#[from] DomError),
    /// A selector could not be parsed.
    #[error(transparent)]
    Selector(#[from] SelectorError),
    /// Request delivery failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Socket failure.
    #[error(transparent)]
    Socket(#[from] SocketError),
    /// A declared URL could not be resolved against the current location.
    #[error("invalid url `{url}`: {source}")]
    Url {
        /// URL as declared.
        url: String,
        /// Parse failure.
        #[source]
        source: url::ParseError,
    },
}
