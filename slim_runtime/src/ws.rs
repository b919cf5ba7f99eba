// Copyright 2025 the Slim Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Live-update sockets built on `tungstenite`.

use std::io::ErrorKind;
use std::net::TcpStream;

use tungstenite::WebSocket;
use tungstenite::protocol::Message;
use tungstenite::stream::MaybeTlsStream;
use url::Url;

use crate::bridge::{Connector, Socket, SocketEvent};
use crate::error::SocketError;

/// Connects with a blocking handshake, then reads without blocking.
#[derive(Copy, Clone, Debug, Default)]
pub struct TungsteniteConnector;

/// A `tungstenite` client connection.
#[derive(Debug)]
pub struct TungsteniteSocket {
    ws: WebSocket<MaybeTlsStream<TcpStream>>,
}

impl Connector for TungsteniteConnector {
    type Socket = TungsteniteSocket;

    fn connect(&mut self, url: &Url) -> Result<TungsteniteSocket, SocketError> {
        let (ws, _response) =
            tungstenite::connect(url.as_str()).map_err(|e| SocketError::Connect {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        match ws.get_ref() {
            MaybeTlsStream::Plain(stream) => stream
                .set_nonblocking(true)
                .map_err(|e| SocketError::Io(e.to_string()))?,
            _ => tracing::warn!(%url, "socket stream stays blocking"),
        }
        tracing::info!(%url, "live updates connected");
        Ok(TungsteniteSocket { ws })
    }
}

impl Socket for TungsteniteSocket {
    fn poll(&mut self) -> Option<SocketEvent> {
        loop {
            match self.ws.read() {
                Ok(Message::Text(text)) => {
                    return Some(SocketEvent::Message(text.as_str().to_owned()));
                }
                Ok(Message::Close(_)) => return Some(SocketEvent::Closed),
                // Pings are answered by tungstenite; binary frames carry no event names.
                Ok(_) => {}
                Err(tungstenite::Error::Io(ref e)) if e.kind() == ErrorKind::WouldBlock => {
                    return None;
                }
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    return Some(SocketEvent::Closed);
                }
                Err(e) => return Some(SocketEvent::Error(SocketError::Io(e.to_string()))),
            }
        }
    }

    fn close(&mut self) {
        if let Err(err) = self.ws.close(None) {
            tracing::debug!(error = %err, "closing socket");
        }
    }
}
