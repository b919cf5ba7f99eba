// Copyright 2025 the Slim Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Visibility observer for `appear` triggers.
//!
//! Elements are observed once and reported the first time their recorded
//! bounds intersect the viewport, after which they are no longer observed.
//! Elements without bounds are never visible.

use hashbrown::HashSet;
use kurbo::Rect;
use slim_dom::{Document, NodeId};

/// One-shot visibility tracker.
#[derive(Clone, Debug, Default)]
pub struct VisibilityObserver {
    order: Vec<NodeId>,
    observed: HashSet<NodeId>,
}

impl VisibilityObserver {
    /// Create an observer with nothing observed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start observing `id`. Returns false if it was already observed.
    pub fn observe(&mut self, id: NodeId) -> bool {
        if !self.observed.insert(id) {
            return false;
        }
        self.order.push(id);
        true
    }

    /// Stop observing `id`.
    pub fn unobserve(&mut self, id: NodeId) -> bool {
        if !self.observed.remove(&id) {
            return false;
        }
        self.order.retain(|&o| o != id);
        true
    }

    /// Returns true if `id` is observed.
    pub fn is_observing(&self, id: NodeId) -> bool {
        self.observed.contains(&id)
    }

    /// Number of observed elements.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if nothing is observed.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Stop observing everything.
    pub fn clear(&mut self) {
        self.order.clear();
        self.observed.clear();
    }

    /// Unobserve and return every observed element now intersecting `viewport`,
    /// in registration order. Removed elements are dropped along the way.
    pub fn take_intersecting(&mut self, doc: &Document, viewport: Rect) -> Vec<NodeId> {
        let visible: HashSet<NodeId> = doc.intersect_rect(viewport).collect();
        let mut hits = Vec::new();
        let observed = &mut self.observed;
        self.order.retain(|&id| {
            let alive = doc.is_alive(id);
            if alive && !visible.contains(&id) {
                return true;
            }
            observed.remove(&id);
            if alive {
                hits.push(id);
            }
            false
        });
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Document, NodeId, NodeId) {
        let mut doc = Document::parse(r#"<div id="a"></div><div id="b"></div>"#).unwrap();
        let a = doc.query_selector("#a").unwrap().unwrap();
        let b = doc.query_selector("#b").unwrap().unwrap();
        doc.set_bounds(a, Some(Rect::new(0.0, 0.0, 100.0, 50.0)));
        doc.set_bounds(b, Some(Rect::new(0.0, 900.0, 100.0, 950.0)));
        (doc, a, b)
    }

    #[test]
    fn reports_once() {
        let (doc, a, b) = setup();
        let mut observer = VisibilityObserver::new();
        assert!(observer.observe(a));
        assert!(!observer.observe(a));
        observer.observe(b);
        let viewport = Rect::new(0.0, 0.0, 800.0, 600.0);
        assert_eq!(observer.take_intersecting(&doc, viewport), [a]);
        assert!(observer.take_intersecting(&doc, viewport).is_empty());
        assert!(!observer.is_observing(a));
        assert_eq!(observer.len(), 1);
    }

    #[test]
    fn unbounded_and_removed_elements() {
        let (mut doc, a, b) = setup();
        doc.set_bounds(a, None);
        let mut observer = VisibilityObserver::new();
        observer.observe(a);
        observer.observe(b);
        doc.remove(b);
        assert!(observer
            .take_intersecting(&doc, Rect::new(0.0, 0.0, 1000.0, 1000.0))
            .is_empty());
        assert_eq!(observer.len(), 1);
        assert!(observer.unobserve(a));
        assert!(observer.is_empty());
    }
}
