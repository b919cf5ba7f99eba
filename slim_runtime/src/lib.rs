// Copyright 2025 the Slim Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Slim Runtime: executes attribute-declared behavior against a [`slim_dom::Document`].
//!
//! ## Overview
//!
//! The [`Engine`] owns the document and drives everything the declarations ask for:
//! confirmations and inline scripts through the [`Host`], network actions through a
//! [`Transport`], content swaps, history pushes, follow-on broadcasts, delayed emits,
//! `appear` detection, and server-pushed events over a live-update socket.
//!
//! The runtime is headless and deterministic. Requests complete when the transport
//! reports them, sockets deliver when polled, and time moves only with
//! [`Engine::advance`].
//!
//! ## Seams
//!
//! - [`Host`]: location, history, reload and navigation, confirmation, scripts.
//!   [`HeadlessHost`] records every call.
//! - [`Transport`]: delivers [`Request`]s and reports [`Response`]s.
//!   [`ScriptedTransport`] answers from in-memory routes; `HttpTransport` (feature `http`)
//!   uses `reqwest`.
//! - [`Connector`]: opens live-update sockets. [`ChannelConnector`] is in-memory;
//!   `TungsteniteConnector` (feature `ws`) uses `tungstenite`.
//!
//! ## Example
//!
//! ```rust
//! use slim_responder::types::{Event, Method};
//! use slim_runtime::{Engine, HeadlessHost, Response, ScriptedTransport};
//! use url::Url;
//!
//! let host = HeadlessHost::new(Url::parse("http://localhost:8000/").unwrap());
//! let mut transport = ScriptedTransport::new();
//! transport.respond(Method::Put, "/increment", Response::html("Counter: 1"));
//!
//! let mut engine = Engine::from_html(
//!     r##"<button id="inc" s-put="/increment" s-target="#result">+</button>
//!         <div id="result">Counter: 0</div>"##,
//!     host,
//!     transport,
//! )
//! .unwrap();
//! engine.start();
//!
//! let button = engine.document().query_selector("#inc").unwrap().unwrap();
//! engine.dispatch(Event::targeted("click", button));
//! engine.run_until_idle();
//!
//! let result = engine.document().query_selector("#result").unwrap().unwrap();
//! assert_eq!(engine.document().text_content(result), "Counter: 1");
//! ```
//!
//! ## Logging
//!
//! Everything is reported through `tracing`: requests at `info`, routing and swaps
//! at `debug`, recoverable declaration and selector problems at `warn`, failed
//! requests and scripts at `error`. Install any subscriber to see them.

mod bridge;
mod config;
mod engine;
mod error;
mod host;
#[cfg(feature = "http")]
mod http;
pub mod pipeline;
mod queue;
pub mod swap;
mod transport;
mod visibility;
#[cfg(feature = "ws")]
mod ws;

pub use bridge::{
    ChannelConnector, ChannelSocket, Connector, NoConnector, NoSocket, Socket, SocketEvent,
    resolve_endpoint,
};
pub use config::{
    EngineConfig, HeaderNames, MIN_RECONNECT_BACKOFF, NotificationNames, ROUTED_EVENTS,
    StatusPolicy,
};
pub use engine::{Engine, Notification};
pub use error::{EngineError, ScriptError, SocketError, TransportError};
pub use host::{Evaluation, HeadlessHost, Host};
#[cfg(feature = "http")]
pub use http::HttpTransport;
pub use transport::{Body, Headers, Request, RequestId, Response, ScriptedTransport, Transport};
pub use visibility::VisibilityObserver;
#[cfg(feature = "ws")]
pub use ws::{TungsteniteConnector, TungsteniteSocket};
