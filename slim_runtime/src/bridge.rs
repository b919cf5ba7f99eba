// Copyright 2025 the Slim Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Live-update bridge.
//!
//! The root element may declare a socket endpoint. Every text message received
//! on it is broadcast verbatim as an event name. A failed connection is retried
//! after a fixed backoff, forever; a clean close is final.

use core::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use url::Url;

use crate::error::SocketError;

/// Something that happened on a socket.
#[derive(Debug)]
pub enum SocketEvent {
    /// A text message.
    Message(String),
    /// The connection failed.
    Error(SocketError),
    /// The connection was closed cleanly.
    Closed,
}

/// An open live-update connection.
pub trait Socket {
    /// Next event, or `None` if nothing is pending.
    fn poll(&mut self) -> Option<SocketEvent>;

    /// Close the connection.
    fn close(&mut self);
}

/// Opens live-update connections.
pub trait Connector {
    /// Connection type.
    type Socket: Socket;

    /// Connect to `url`.
    fn connect(&mut self, url: &Url) -> Result<Self::Socket, SocketError>;
}

/// Connector for hosts without live updates. Every connection is refused.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoConnector;

/// Socket type of [`NoConnector`]; it cannot be constructed.
#[derive(Debug)]
pub enum NoSocket {}

impl Socket for NoSocket {
    fn poll(&mut self) -> Option<SocketEvent> {
        match *self {}
    }

    fn close(&mut self) {
        match *self {}
    }
}

impl Connector for NoConnector {
    type Socket = NoSocket;

    fn connect(&mut self, _url: &Url) -> Result<NoSocket, SocketError> {
        Err(SocketError::Unsupported)
    }
}

#[derive(Debug, Default)]
struct ChannelState {
    attempts: Vec<Url>,
    refusals: usize,
    live: Option<usize>,
    inbox: VecDeque<SocketEvent>,
}

/// In-memory connector whose server side is driven through the connector itself.
///
/// Clones share one connection, so a test can keep a handle while the engine
/// owns another.
#[derive(Clone, Debug, Default)]
pub struct ChannelConnector {
    state: Rc<RefCell<ChannelState>>,
}

impl ChannelConnector {
    /// Create a connector that accepts every connection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse the next `count` connection attempts.
    pub fn refuse_next(&self, count: usize) {
        self.state.borrow_mut().refusals = count;
    }

    /// Deliver a text message. Returns false when no connection is open.
    pub fn send(&self, message: &str) -> bool {
        self.deliver(SocketEvent::Message(message.to_owned()))
    }

    /// Fail the open connection.
    pub fn fail(&self, reason: &str) -> bool {
        self.deliver(SocketEvent::Error(SocketError::Io(reason.to_owned())))
    }

    /// Close the open connection from the server side.
    pub fn close_remote(&self) -> bool {
        self.deliver(SocketEvent::Closed)
    }

    /// Every connection attempt, refused ones included.
    pub fn attempts(&self) -> Vec<Url> {
        self.state.borrow().attempts.clone()
    }

    /// Returns true if a connection is open.
    pub fn is_connected(&self) -> bool {
        self.state.borrow().live.is_some()
    }

    fn deliver(&self, event: SocketEvent) -> bool {
        let mut state = self.state.borrow_mut();
        if state.live.is_none() {
            return false;
        }
        state.inbox.push_back(event);
        true
    }
}

/// Socket type of [`ChannelConnector`].
#[derive(Debug)]
pub struct ChannelSocket {
    state: Rc<RefCell<ChannelState>>,
    id: usize,
}

impl Socket for ChannelSocket {
    fn poll(&mut self) -> Option<SocketEvent> {
        let mut state = self.state.borrow_mut();
        if state.live != Some(self.id) {
            return None;
        }
        let event = state.inbox.pop_front()?;
        if matches!(event, SocketEvent::Error(_) | SocketEvent::Closed) {
            state.live = None;
            state.inbox.clear();
        }
        Some(event)
    }

    fn close(&mut self) {
        let mut state = self.state.borrow_mut();
        if state.live == Some(self.id) {
            state.live = None;
            state.inbox.clear();
        }
    }
}

impl Connector for ChannelConnector {
    type Socket = ChannelSocket;

    fn connect(&mut self, url: &Url) -> Result<ChannelSocket, SocketError> {
        let mut state = self.state.borrow_mut();
        state.attempts.push(url.clone());
        if state.refusals > 0 {
            state.refusals -= 1;
            return Err(SocketError::Connect {
                url: url.to_string(),
                reason: "refused".into(),
            });
        }
        let id = state.attempts.len();
        state.live = Some(id);
        state.inbox.clear();
        Ok(ChannelSocket {
            state: Rc::clone(&self.state),
            id,
        })
    }
}

/// Resolve a declared endpoint against the page location.
///
/// `http` maps to `ws` and `https` to `wss`; socket schemes are kept.
pub fn resolve_endpoint(location: &Url, declared: &str) -> Result<Url, SocketError> {
    let mut url = location
        .join(declared.trim())
        .map_err(|_| SocketError::Endpoint(declared.to_owned()))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        _ => return Err(SocketError::Endpoint(declared.to_owned())),
    };
    url.set_scheme(scheme)
        .map_err(|()| SocketError::Endpoint(declared.to_owned()))?;
    Ok(url)
}

/// Connection state owned by the engine.
pub(crate) struct LiveBridge<S> {
    endpoint: Option<Url>,
    socket: Option<S>,
}

impl<S> core::fmt::Debug for LiveBridge<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LiveBridge")
            .field("endpoint", &self.endpoint.as_ref().map(Url::as_str))
            .field("open", &self.socket.is_some())
            .finish()
    }
}

impl<S: Socket> LiveBridge<S> {
    pub(crate) fn new() -> Self {
        Self {
            endpoint: None,
            socket: None,
        }
    }

    pub(crate) fn endpoint(&self) -> Option<&Url> {
        self.endpoint.as_ref()
    }

    pub(crate) fn set_endpoint(&mut self, endpoint: Url) {
        self.endpoint = Some(endpoint);
    }

    pub(crate) fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    pub(crate) fn connect<C>(&mut self, connector: &mut C) -> Result<(), SocketError>
    where
        C: Connector<Socket = S>,
    {
        self.close();
        let Some(endpoint) = &self.endpoint else {
            return Ok(());
        };
        self.socket = Some(connector.connect(endpoint)?);
        Ok(())
    }

    /// Drain pending events. A failure or close drops the connection and ends the batch.
    pub(crate) fn drain(&mut self) -> Vec<SocketEvent> {
        let mut events = Vec::new();
        let Some(socket) = self.socket.as_mut() else {
            return events;
        };
        while let Some(event) = socket.poll() {
            let terminal = matches!(event, SocketEvent::Error(_) | SocketEvent::Closed);
            events.push(event);
            if terminal {
                self.socket = None;
                break;
            }
        }
        events
    }

    pub(crate) fn close(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            socket.close();
        }
    }
}
