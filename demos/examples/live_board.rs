// Copyright 2025 the Slim Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A task board fed by a live-update socket.
//!
//! This example shows:
//! - server-pushed event names over an in-memory socket, including a dropped
//!   connection and the reconnect after the backoff,
//! - a lazily loaded section that fires on `appear`,
//! - drag and drop of a card onto a lane with a JSON payload.
//!
//! Run:
//! - `cargo run -p slim_demos --example live_board`

use core::time::Duration;

use kurbo::Rect;
use slim_dom::NodeId;
use slim_responder::types::{Event, Method};
use slim_runtime::{
    Body, ChannelConnector, Connector, Engine, HeadlessHost, Response, ScriptedTransport,
};
use tracing_subscriber::EnvFilter;
use url::Url;

const PAGE: &str = r##"
<body s-ws="/live">
  <ul id="todo" s-get="/lanes/todo" s-on="board:changed">
    <li id="card-7" s-drag-json="{&quot;id&quot;:7}" s-drag-effect="move">write docs</li>
  </ul>
  <ul id="done" s-post="/move" s-on="drop" s-drop-effect="move" s-drop-class="drop-here"></ul>
  <section id="archive" s-get="/archive">loading archive</section>
</body>
"##;

type DemoResult<T> = Result<T, Box<dyn std::error::Error>>;

fn find<C: Connector>(
    engine: &Engine<HeadlessHost, ScriptedTransport, C>,
    selector: &str,
) -> DemoResult<NodeId> {
    Ok(engine
        .document()
        .query_selector(selector)?
        .ok_or_else(|| format!("missing {selector}"))?)
}

fn main() -> DemoResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("slim_runtime=debug".parse()?))
        .init();

    let mut transport = ScriptedTransport::new();
    transport
        .route(Method::Post, "/move", |request| {
            if let Body::Json(payload) = &request.body {
                tracing::info!(%payload, "server moved card");
            }
            Ok(Response::new(204))
        })
        .respond(
            Method::Get,
            "/lanes/todo",
            Response::html("<li>review pull request</li>"),
        )
        .respond(
            Method::Get,
            "/archive",
            Response::html("<ol><li>ship 0.1</li></ol>"),
        );

    let server = ChannelConnector::new();
    let host = HeadlessHost::new(Url::parse("http://localhost:8000/board")?);
    let mut engine = Engine::from_html(PAGE, host, transport)?.with_connector(server.clone());
    engine.start();

    // Drag the card onto the done lane.
    let card = find(&engine, "#card-7")?;
    let done = find(&engine, "#done")?;
    engine.dispatch(Event::targeted("dragstart", card));
    let over = engine.dispatch(Event::targeted("dragover", done));
    println!("lane accepts drop: {}", over.default_prevented);
    engine.dispatch(Event::targeted("drop", done));
    engine.run_until_idle();

    // The server announces the change; the todo lane refreshes itself.
    server.send("board:changed");
    engine.run_until_idle();

    // Scroll the archive into view.
    let archive = find(&engine, "#archive")?;
    engine.set_viewport(Rect::new(0.0, 0.0, 1024.0, 768.0));
    engine.set_bounds(archive, Some(Rect::new(0.0, 600.0, 1024.0, 700.0)));
    engine.run_until_idle();

    // Lose the connection; the bridge comes back after the backoff.
    server.fail("server restarted");
    engine.run_until_idle();
    println!("live after failure: {}", engine.is_live());
    engine.advance(Duration::from_secs(1));
    println!("live after backoff: {}", engine.is_live());
    println!("connection attempts: {}", server.attempts().len());

    println!("{}", engine.document().inner_html(engine.document().root()));
    Ok(())
}
