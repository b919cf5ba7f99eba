// Copyright 2025 the Slim Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Router implementation.
//!
//! ## Overview
//!
//! Enumerates candidate elements, matches their triggers against an event, and
//! emits the handlers that fire, in firing order.
//!
//! ## Candidates
//!
//! - Only elements with at least one action-bearing capability (action, emit,
//!   eval, template, push) are candidates. Everything else is invisible to routing.
//! - A trigger without a scope is *local*; with a scope it is *global*.
//!
//! ## Targeted dispatch
//!
//! The path is computed up front as an explicit list: the origin, then each
//! ancestor up to the root. At every node the router emits the first local
//! handler declared on that node, then every global handler whose scope
//! matches that node, in document order. Non-bubbling events (including
//! `appear`) stop after the origin.
//!
//! ## Broadcast dispatch
//!
//! Every matching handler fires once in document order, independent of tree
//! position. [`BroadcastScopePolicy`] decides how scoped handlers take part.

use slim_dom::{Document, NodeId, Selector};

use crate::attrs::AttributeNames;
use crate::types::{APPEAR, DispatchMode, ElementConfig, Event, PendingMatch};

/// How scoped (global) handlers behave when an event has no origin.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum BroadcastScopePolicy {
    /// The scope selector is ignored and the handler fires like a local one.
    #[default]
    Ignore,
    /// Scoped handlers never fire for broadcasts.
    Exclude,
}

/// Deterministic trigger router.
///
/// ## Usage
///
/// - Construct with [`Router::new`] for the default `s-` attributes, or
///   [`Router::with_names`] for a custom prefix.
/// - Optionally set [`Router::set_broadcast_scope`].
/// - Call [`Router::route`] for each event to get the handlers that fire.
#[derive(Clone)]
pub struct Router {
    names: AttributeNames,
    broadcast_scope: BroadcastScopePolicy,
}

impl core::fmt::Debug for Router {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Router")
            .field("on", &self.names.on)
            .field("broadcast_scope", &self.broadcast_scope)
            .finish_non_exhaustive()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Create a router reading the default `s-` attributes.
    pub fn new() -> Self {
        Self::with_names(AttributeNames::default())
    }

    /// Create a router reading custom attribute names.
    pub fn with_names(names: AttributeNames) -> Self {
        Self {
            names,
            broadcast_scope: BroadcastScopePolicy::default(),
        }
    }

    /// Attribute names this router reads.
    pub fn names(&self) -> &AttributeNames {
        &self.names
    }

    /// Set how scoped handlers take part in broadcasts.
    pub fn set_broadcast_scope(&mut self, policy: BroadcastScopePolicy) {
        self.broadcast_scope = policy;
    }

    /// Connected candidate elements in document order, with their declarations.
    pub fn candidates(&self, doc: &Document) -> Vec<(NodeId, ElementConfig)> {
        self.candidates_within(doc, doc.root())
    }

    /// Candidates among `scope` and its descendants.
    pub fn candidates_within(&self, doc: &Document, scope: NodeId) -> Vec<(NodeId, ElementConfig)> {
        core::iter::once(scope)
            .chain(doc.descendant_elements(scope))
            .filter_map(|id| {
                let config = self.names.read_element(doc, id)?;
                config.is_candidate().then_some((id, config))
            })
            .collect()
    }

    /// Handlers that fire for `event`, in firing order.
    pub fn route(&self, doc: &Document, event: &Event) -> Vec<PendingMatch> {
        let handlers = self.matching_handlers(doc, &event.name);
        let out = match event.mode {
            DispatchMode::Targeted { origin } => Self::route_targeted(doc, event, origin, handlers),
            DispatchMode::Broadcast => self.route_broadcast(handlers),
        };
        tracing::debug!(
            event = %event.name,
            mode = ?event.mode,
            fired = out.len(),
            "routed event"
        );
        out
    }

    fn matching_handlers(&self, doc: &Document, name: &str) -> Vec<PendingMatch> {
        let mut handlers = Vec::new();
        for (element, config) in self.candidates(doc) {
            for trigger in config.triggers.iter().filter(|t| t.event == name) {
                handlers.push(PendingMatch {
                    element,
                    event: name.to_owned(),
                    trigger: trigger.clone(),
                    config: config.clone(),
                });
            }
        }
        handlers
    }

    fn route_targeted(
        doc: &Document,
        event: &Event,
        origin: NodeId,
        handlers: Vec<PendingMatch>,
    ) -> Vec<PendingMatch> {
        let (locals, scoped): (Vec<PendingMatch>, Vec<PendingMatch>) =
            handlers.into_iter().partition(|h| h.trigger.is_local());
        let globals: Vec<(Selector, PendingMatch)> = scoped
            .into_iter()
            .filter_map(|h| {
                let scope = h.trigger.scope.as_deref().unwrap_or_default();
                match Selector::parse(scope) {
                    Ok(selector) => Some((selector, h)),
                    Err(err) => {
                        tracing::warn!(
                            element = ?h.element,
                            error = %err,
                            "skipping trigger with invalid scope"
                        );
                        None
                    }
                }
            })
            .collect();

        let start = if doc.is_element(origin) {
            Some(origin)
        } else {
            doc.parent_of(origin)
        };
        let Some(start) = start else {
            return Vec::new();
        };
        let path: Vec<NodeId> = core::iter::once(start).chain(doc.ancestors(start)).collect();
        let stops_at_origin = !event.bubbles || event.name == APPEAR;

        let mut out = Vec::new();
        for node in path {
            if let Some(local) = locals.iter().find(|h| h.element == node) {
                out.push(local.clone());
            }
            for (selector, global) in &globals {
                if selector.matches(doc, node) {
                    out.push(global.clone());
                }
            }
            if stops_at_origin {
                break;
            }
        }
        out
    }

    fn route_broadcast(&self, mut handlers: Vec<PendingMatch>) -> Vec<PendingMatch> {
        if self.broadcast_scope == BroadcastScopePolicy::Exclude {
            handlers.retain(|h| h.trigger.is_local());
        }
        handlers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fired(doc: &Document, router: &Router, event: &Event) -> Vec<String> {
        router
            .route(doc, event)
            .into_iter()
            .map(|m| doc.attribute(m.element, "id").unwrap_or("?").to_owned())
            .collect()
    }

    fn by_id(doc: &Document, id: &str) -> NodeId {
        doc.query_selector(&format!("#{id}")).unwrap().unwrap()
    }

    #[test]
    fn non_candidates_are_never_routed() {
        let doc = Document::parse(
            r##"<div id="plain" s-on="click"><button id="b" s-on="click" s-target="#x">x</button></div>"##,
        )
        .unwrap();
        let router = Router::new();
        assert!(router.candidates(&doc).is_empty());
        let b = by_id(&doc, "b");
        assert!(router.route(&doc, &Event::targeted("click", b)).is_empty());
        assert!(router.route(&doc, &Event::broadcast("click")).is_empty());
    }

    #[test]
    fn targeted_walks_origin_to_root() {
        let doc = Document::parse(
            r#"<section id="outer" s-get="/outer" s-on="click">
                 <div id="mid" s-emit="m" s-on="click">
                   <button id="inner" s-post="/inner">go</button>
                 </div>
               </section>"#,
        )
        .unwrap();
        let router = Router::new();
        let inner = by_id(&doc, "inner");
        assert_eq!(
            fired(&doc, &router, &Event::targeted("click", inner)),
            ["inner", "mid", "outer"]
        );
    }

    #[test]
    fn locals_before_globals_at_each_node() {
        let doc = Document::parse(
            r#"<ul id="list" s-get="/list" s-on="click">
                 <li id="row" class="row" s-get="/row" s-on="click"></li>
               </ul>
               <div id="watcher" s-emit="seen" s-on="click on .row"></div>
               <div id="listwatch" s-emit="seen" s-on="click on ul"></div>"#,
        )
        .unwrap();
        let router = Router::new();
        let row = by_id(&doc, "row");
        assert_eq!(
            fired(&doc, &router, &Event::targeted("click", row)),
            ["row", "watcher", "list", "listwatch"]
        );
    }

    #[test]
    fn appear_does_not_bubble() {
        let doc = Document::parse(
            r#"<div id="parent" s-get="/p"><div id="child" s-get="/c"></div></div>"#,
        )
        .unwrap();
        let router = Router::new();
        let child = by_id(&doc, "child");
        assert_eq!(fired(&doc, &router, &Event::appear(child)), ["child"]);
        // Even a host-built `appear` that claims to bubble stops at the origin.
        let mut claimed = Event::appear(child);
        claimed.bubbles = true;
        assert_eq!(fired(&doc, &router, &claimed), ["child"]);
    }

    #[test]
    fn scoped_appear_ignores_descendants() {
        let doc = Document::parse(
            r#"<div id="parent" class="parent"><div id="child" s-get="/c"></div></div>
               <div id="watcher" s-get="/w" s-on="appear on .parent | click on .parent"></div>"#,
        )
        .unwrap();
        let router = Router::new();
        let child = by_id(&doc, "child");
        assert_eq!(fired(&doc, &router, &Event::appear(child)), ["child"]);
        assert_eq!(
            fired(&doc, &router, &Event::appear(by_id(&doc, "parent"))),
            ["watcher"]
        );
        // A bubbling event from the same child does reach the scope.
        assert_eq!(
            fired(&doc, &router, &Event::targeted("click", child)),
            ["watcher"]
        );
    }

    #[test]
    fn non_bubbling_events_stop_at_origin() {
        let doc = Document::parse(
            r#"<div id="parent" s-get="/p" s-on="ping"><div id="child" s-get="/c" s-on="ping"></div></div>"#,
        )
        .unwrap();
        let router = Router::new();
        let mut event = Event::targeted("ping", by_id(&doc, "child"));
        event.bubbles = false;
        assert_eq!(fired(&doc, &router, &event), ["child"]);
    }

    #[test]
    fn broadcast_ignores_tree_position_and_scope() {
        let doc = Document::parse(
            r##"<div id="a" s-get="/a" s-on="items:updated"></div>
               <section><p id="b" s-get="/b" s-on="items:updated on .nothing"></p></section>
               <div id="c" s-emit="x" s-on="other"></div>
               <div id="d" s-template="#t" s-on="items:updated"></div>"##,
        )
        .unwrap();
        let mut router = Router::new();
        assert_eq!(
            fired(&doc, &router, &Event::broadcast("items:updated")),
            ["a", "b", "d"]
        );
        router.set_broadcast_scope(BroadcastScopePolicy::Exclude);
        assert_eq!(
            fired(&doc, &router, &Event::broadcast("items:updated")),
            ["a", "d"]
        );
    }

    #[test]
    fn invalid_scope_is_skipped() {
        let doc = Document::parse(
            r#"<button id="b" s-get="/b" s-on="click on li:hover | click"></button>"#,
        )
        .unwrap();
        let router = Router::new();
        let b = by_id(&doc, "b");
        let matches = router.route(&doc, &Event::targeted("click", b));
        assert_eq!(matches.len(), 1);
        assert!(matches[0].trigger.is_local());
    }

    #[test]
    fn text_origin_starts_at_parent() {
        let doc = Document::parse(r#"<button id="b" s-get="/b">label</button>"#).unwrap();
        let b = by_id(&doc, "b");
        let text = doc.children_of(b)[0];
        assert_eq!(
            fired(&doc, &Router::new(), &Event::targeted("click", text)),
            ["b"]
        );
    }

    #[test]
    fn pending_match_carries_declarations() {
        let doc = Document::parse(
            r##"<form id="f" s-post="/save" s-target="#out" s-swap="outer"></form>"##,
        )
        .unwrap();
        let f = by_id(&doc, "f");
        let matches = Router::new().route(&doc, &Event::targeted("submit", f));
        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert_eq!(m.event, "submit");
        assert_eq!(m.config.target.as_deref(), Some("#out"));
        assert_eq!(m.config.action.as_ref().map(|a| a.url.as_str()), Some("/save"));
    }
}
