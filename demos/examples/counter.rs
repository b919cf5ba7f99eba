// Copyright 2025 the Slim Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A counter driven entirely by attributes.
//!
//! The button declares a `PUT` and a confirmation. The scripted server keeps
//! the count and answers with an empty body plus an `S-Emit` header; the
//! broadcast makes the result fetch fresh markup. A plain-text status line is
//! refreshed the same way.
//!
//! Run:
//! - `RUST_LOG=slim_runtime=debug cargo run -p slim_demos --example counter`

use std::cell::Cell;
use std::rc::Rc;

use slim_responder::types::{Event, Method};
use slim_runtime::{Engine, HeadlessHost, Response, ScriptedTransport};
use tracing_subscriber::EnvFilter;
use url::Url;

const PAGE: &str = r##"
<main>
  <button id="inc" s-put="/increment" s-confirm="Increment?">+</button>
  <div id="result" s-get="/count" s-on="counter:changed">Counter: 0</div>
  <p id="status" s-get="/status" s-on="counter:changed">never clicked</p>
</main>
"##;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("slim_runtime=info".parse()?))
        .init();

    let count = Rc::new(Cell::new(0_u32));
    let mut transport = ScriptedTransport::new();
    {
        let count = Rc::clone(&count);
        transport.route(Method::Put, "/increment", move |_| {
            count.set(count.get() + 1);
            Ok(Response::new(204).with_header("S-Emit", "counter:changed"))
        });
    }
    {
        let count = Rc::clone(&count);
        transport.route(Method::Get, "/count", move |_| {
            Ok(Response::html(format!("Counter: <b>{}</b>", count.get())))
        });
    }
    {
        let count = Rc::clone(&count);
        transport.route(Method::Get, "/status", move |_| {
            Ok(Response::text(format!("clicked {} <times>", count.get())))
        });
    }

    let host = HeadlessHost::new(Url::parse("http://localhost:8000/")?);
    let mut engine = Engine::from_html(PAGE, host, transport)?;
    engine.start();

    let button = engine
        .document()
        .query_selector("#inc")?
        .ok_or("missing button")?;
    // The fourth prompt is declined, so only three increments reach the server.
    for accept in [true, true, true, false] {
        engine.host_mut().answer_next_confirm(accept);
        engine.dispatch(Event::targeted("click", button));
        engine.run_until_idle();
    }

    for notification in engine.drain_notifications() {
        tracing::info!(name = %notification.name, status = ?notification.status, "notification");
    }
    println!("{}", engine.document().inner_html(engine.document().root()));
    println!("prompts shown: {}", engine.host().prompts.len());
    Ok(())
}
