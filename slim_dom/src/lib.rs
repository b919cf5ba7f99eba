// Copyright 2025 the Slim Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Slim DOM: a generational-arena markup document for headless behavior engines.
//!
//! Slim DOM is the tree the behavior engine reads declarations from and swaps content into.
//!
//! - Represents a hierarchy of elements and text nodes under a single `body` root.
//! - Parses markup fragments with [`tl`] and serializes nodes back to markup.
//! - Evaluates CSS selectors (compound selectors, combinators, attribute conditions).
//! - Stores optional layout bounds per element so visibility can be computed without a renderer.
//!
//! ## Not a browser
//!
//! This crate does not run scripts, apply styles, or perform layout.
//! Hosts that render the document elsewhere push the resulting element rectangles back in with
//! [`Document::set_bounds`], and visibility queries use those rectangles as-is.
//!
//! ## Handles
//!
//! Nodes are addressed by [`NodeId`], a generational handle.
//! Removing a node frees its whole subtree and every handle into it becomes stale:
//! accessors return `None` or empty values, and mutators report [`DomError::Stale`].
//! A node created but not yet inserted is alive but not [connected](Document::is_connected).
//!
//! ## API overview
//!
//! - [`Document::parse`] / [`Document::new`] build a document.
//! - [`Document::create_element`], [`Document::append_child`], [`Document::insert_before`],
//!   [`Document::remove`] edit structure.
//! - [`Document::attribute`], [`Document::set_attribute`], [`Document::add_class`] edit element data.
//! - [`Document::query_selector_all`], [`Document::matches`], [`Document::closest`] run selectors.
//! - [`Document::inner_html`], [`Document::set_inner_html`], [`Document::parse_fragment`] move markup
//!   in and out.
//! - [`Document::intersect_rect`] yields connected elements whose bounds overlap a rectangle.
//!
//! ## Example
//!
//! ```rust
//! use slim_dom::Document;
//!
//! let mut doc = Document::parse(r#"<div id="result">Counter: 0</div>"#).unwrap();
//! let result = doc.query_selector("#result").unwrap().unwrap();
//! doc.set_inner_html(result, "Counter: <b>1</b>").unwrap();
//! assert_eq!(doc.text_content(result), "Counter: 1");
//! ```

mod document;
mod error;
mod parse;
mod select;
mod serialize;
mod types;

pub use document::Document;
pub use error::{DomError, SelectorError};
pub use select::Selector;
pub use types::{NodeId, NodeKind};
