// Copyright 2025 the Slim Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Slim Responder: declarative attribute reader and deterministic event router.
//!
//! ## Overview
//!
//! Elements declare behavior with attributes: what to request (`s-get`, `s-post`, ...),
//! which events trigger it (`s-on`), where results go (`s-target`, `s-swap`), and what
//! follows (`s-emit`, `s-push`). This crate reads those declarations and decides, for one
//! event, which declared reactions fire and in what order.
//! It does not execute anything; a runtime consumes the returned [`PendingMatch`](types::PendingMatch) list.
//!
//! ## Declarations
//!
//! [`AttributeNames::read_element`](attrs::AttributeNames::read_element) builds an
//! [`ElementConfig`](types::ElementConfig) per element. Triggers are parsed by
//! [`parse_event_specs`](trigger::parse_event_specs) (`"click on .row | appear"`), with tag
//! defaults from [`default_event_specs`](trigger::default_event_specs) when none are declared.
//! Malformed trigger and emit segments are dropped with a `tracing` warning.
//!
//! ## Routing
//!
//! [`Router::route`](router::Router::route) handles two [dispatch modes](types::DispatchMode):
//!
//! - **Targeted**: the event has an origin. The router walks origin → root and, at each node,
//!   emits the node's own local handler and then every global handler whose scope matches it.
//!   `appear` and other non-bubbling events stop at the origin.
//! - **Broadcast**: no origin (emits, socket messages, navigation). Every handler listening
//!   for the event fires in document order.
//!
//! ```rust
//! use slim_dom::Document;
//! use slim_responder::router::Router;
//! use slim_responder::types::Event;
//!
//! let doc = Document::parse(
//!     r##"<div s-get="/list" s-on="items:updated"></div>
//!         <button id="add" s-post="/items" s-target="#list">Add</button>"##,
//! )
//! .unwrap();
//! let router = Router::new();
//!
//! let add = doc.query_selector("#add").unwrap().unwrap();
//! let clicked = router.route(&doc, &Event::targeted("click", add));
//! assert_eq!(clicked.len(), 1);
//!
//! let updated = router.route(&doc, &Event::broadcast("items:updated"));
//! assert_eq!(updated[0].config.action.as_ref().unwrap().url, "/list");
//! ```
//!
//! ## Drag and drop
//!
//! [`dnd::apply_drag_bookkeeping`] runs once per targeted drag event to attach drag payloads,
//! accept drops, and toggle drop highlight classes.

pub mod attrs;
pub mod dnd;
pub mod router;
pub mod trigger;
pub mod types;
