// Copyright 2025 the Slim Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Content swapping.
//!
//! Each target is swapped independently; a failure on one target is logged
//! and does not stop the others. The returned [`SwapOutcome`] names the
//! subtrees whose `appear` handlers must be re-registered.

use slim_dom::{Document, NodeId};
use slim_responder::types::SwapStrategy;

/// A subtree that needs visibility registration after a swap.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Rescan {
    /// Elements strictly below this node.
    Descendants(NodeId),
    /// This node and every element below it.
    Subtree(NodeId),
}

/// What a swap changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SwapOutcome {
    /// Targets that were swapped.
    pub swapped: Vec<NodeId>,
    /// Subtrees to rescan for `appear` handlers, in document order per target.
    pub rescan: Vec<Rescan>,
}

/// Place `content` into every target using `strategy`.
///
/// - Inner: the target's children are replaced and its descendants rescanned.
/// - Outer: the parsed element nodes are inserted before the target, the
///   target is removed, and each inserted element is rescanned. Top-level text
///   in the content is dropped. Targets without a parent are skipped.
pub fn swap(
    doc: &mut Document,
    content: &str,
    targets: &[NodeId],
    strategy: SwapStrategy,
) -> SwapOutcome {
    let mut outcome = SwapOutcome::default();
    for &target in targets {
        if !doc.is_alive(target) {
            tracing::debug!(?target, "skipping swap into removed target");
            continue;
        }
        let swapped = match strategy {
            SwapStrategy::Inner => swap_inner(doc, content, target, &mut outcome.rescan),
            SwapStrategy::Outer => swap_outer(doc, content, target, &mut outcome.rescan),
        };
        if swapped {
            outcome.swapped.push(target);
        }
    }
    outcome
}

fn swap_inner(doc: &mut Document, content: &str, target: NodeId, rescan: &mut Vec<Rescan>) -> bool {
    match doc.set_inner_html(target, content) {
        Ok(_) => {
            rescan.push(Rescan::Descendants(target));
            true
        }
        Err(err) => {
            tracing::warn!(?target, error = %err, "inner swap failed");
            false
        }
    }
}

fn swap_outer(doc: &mut Document, content: &str, target: NodeId, rescan: &mut Vec<Rescan>) -> bool {
    let Some(parent) = doc.parent_of(target) else {
        tracing::warn!(?target, "skipping outer swap of a target without parent");
        return false;
    };
    let fragment = match doc.parse_fragment(content) {
        Ok(fragment) => fragment,
        Err(err) => {
            tracing::warn!(?target, error = %err, "outer swap failed");
            return false;
        }
    };
    for node in fragment {
        if !doc.is_element(node) {
            doc.remove(node);
            continue;
        }
        match doc.insert_before(parent, node, target) {
            Ok(()) => rescan.push(Rescan::Subtree(node)),
            Err(err) => {
                tracing::warn!(?target, error = %err, "failed to insert swapped element");
                doc.remove(node);
            }
        }
    }
    doc.remove(target);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn by_id(doc: &Document, id: &str) -> NodeId {
        doc.query_selector(&format!("#{id}")).unwrap().unwrap()
    }

    #[test]
    fn inner_replaces_children() {
        let mut doc = Document::parse(r#"<div id="result">Counter: 0</div>"#).unwrap();
        let result = by_id(&doc, "result");
        let outcome = swap(&mut doc, "Counter: 1", &[result], SwapStrategy::Inner);
        assert_eq!(doc.text_content(result), "Counter: 1");
        assert_eq!(outcome.swapped, [result]);
        assert_eq!(outcome.rescan, [Rescan::Descendants(result)]);
    }

    #[test]
    fn outer_replaces_target_in_place() {
        let mut doc =
            Document::parse(r#"<ul id="list"><li>a</li><li id="old">b</li><li>c</li></ul>"#).unwrap();
        let list = by_id(&doc, "list");
        let old = by_id(&doc, "old");
        let outcome = swap(
            &mut doc,
            "<li>x</li> stray text <li>y</li>",
            &[old],
            SwapStrategy::Outer,
        );
        assert!(!doc.is_alive(old));
        assert_eq!(doc.inner_html(list), "<li>a</li><li>x</li><li>y</li><li>c</li>");
        assert_eq!(outcome.rescan.len(), 2);
        assert!(matches!(outcome.rescan[0], Rescan::Subtree(_)));
    }

    #[test]
    fn outer_skips_parentless_targets() {
        let mut doc = Document::new();
        let detached = doc.create_element("div");
        let outcome = swap(&mut doc, "<p>x</p>", &[detached], SwapStrategy::Outer);
        assert!(outcome.swapped.is_empty());
        assert!(doc.is_alive(detached));
    }

    #[test]
    fn targets_are_independent() {
        let mut doc = Document::parse(
            r#"<div id="outer" class="t"><div id="inner" class="t">x</div></div><p id="p" class="t"></p>"#,
        )
        .unwrap();
        let targets = doc.query_selector_all(".t").unwrap();
        let outcome = swap(&mut doc, "<span>new</span>", &targets, SwapStrategy::Inner);
        // The nested target was freed by the first swap; the others still swap.
        assert_eq!(outcome.swapped, [by_id(&doc, "outer"), by_id(&doc, "p")]);
        assert_eq!(doc.inner_html(by_id(&doc, "p")), "<span>new</span>");
    }

    #[test]
    fn empty_content_clears() {
        let mut doc = Document::parse(r#"<div id="d"><p>gone</p></div>"#).unwrap();
        let d = by_id(&doc, "d");
        swap(&mut doc, "", &[d], SwapStrategy::Inner);
        assert!(doc.children_of(d).is_empty());
    }
}
