// Copyright 2025 the Slim Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core document implementation: structure, element data, queries.

use kurbo::Rect;

use crate::error::{DomError, SelectorError};
use crate::parse;
use crate::select::Selector;
use crate::serialize;
use crate::types::{NodeId, NodeKind};

/// Markup document stored in a generational arena.
///
/// The document always has a root `body` element. Nodes created with
/// [`Document::create_element`] or [`Document::parse_fragment`] start detached
/// and become [connected](Document::is_connected) once inserted under the root.
///
/// ## Example
///
/// ```rust
/// use slim_dom::Document;
///
/// let mut doc = Document::new();
/// let list = doc.create_element("ul");
/// doc.append_child(doc.root(), list).unwrap();
/// let item = doc.create_element("li");
/// doc.append_child(list, item).unwrap();
/// doc.set_text_content(item, "first").unwrap();
///
/// assert_eq!(doc.outer_html(list), "<ul><li>first</li></ul>");
/// assert_eq!(doc.parent_of(item), Some(list));
/// ```
pub struct Document {
    /// slots
    nodes: Vec<Option<Node>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
    root: NodeId,
}

impl core::fmt::Debug for Document {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        f.debug_struct("Document")
            .field("root", &self.root)
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &self.free_list.len())
            .finish_non_exhaustive()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Element {
    pub(crate) tag: String,
    pub(crate) attrs: Vec<(String, String)>,
    /// Inert markup of a `template` element, kept outside the tree.
    pub(crate) content: Option<String>,
}

#[derive(Clone, Debug)]
pub(crate) enum NodeData {
    Element(Element),
    Text(String),
}

#[derive(Clone, Debug)]
struct Node {
    generation: u32,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
    bounds: Option<Rect>,
}

impl Document {
    /// Create an empty document with a bare `body` root.
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            root: NodeId::new(0, 0),
        };
        doc.root = doc.alloc(NodeData::Element(Element {
            tag: "body".into(),
            attrs: Vec::new(),
            content: None,
        }));
        doc
    }

    /// Parse a page.
    ///
    /// When the markup contains a `body` element, its attributes and children
    /// are adopted by the root. Otherwise every top-level node becomes a child
    /// of the root.
    pub fn parse(html: &str) -> Result<Self, DomError> {
        let mut doc = Self::new();
        parse::build_document(&mut doc, html)?;
        Ok(doc)
    }

    /// The root `body` element.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Create a detached element. The tag name is lowercased.
    ///
    /// A `template` element starts with empty [inert content](Document::template_content).
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let tag = tag.to_ascii_lowercase();
        let content = (tag == "template").then(String::new);
        self.alloc(NodeData::Element(Element {
            tag,
            attrs: Vec::new(),
            content,
        }))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::Text(text.to_owned()))
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Node::new(generation, data));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(Node::new(generation, data)));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            ((self.nodes.len() - 1) as u32, generation)
        };
        NodeId::new(idx, generation)
    }

    /// Append `child` as the last child of `parent`, detaching it from any previous parent.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_insert(parent, child)?;
        self.detach(child)?;
        self.link_parent(child, parent, None);
        Ok(())
    }

    /// Insert `child` into `parent` immediately before `reference`.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: NodeId,
    ) -> Result<(), DomError> {
        self.check_insert(parent, child)?;
        if child == reference {
            return Ok(());
        }
        if self.parent_of(reference) != Some(parent) {
            return Err(DomError::NotAChild { parent, reference });
        }
        self.detach(child)?;
        self.link_parent(child, parent, Some(reference));
        Ok(())
    }

    /// Unlink a node from its parent without freeing it.
    pub fn detach(&mut self, id: NodeId) -> Result<(), DomError> {
        if !self.is_alive(id) {
            return Err(DomError::Stale(id));
        }
        if id == self.root {
            return Err(DomError::Root);
        }
        if let Some(parent) = self.node(id).parent {
            self.unlink_parent(id, parent);
        }
        Ok(())
    }

    /// Remove a node and its subtree. Every handle into the subtree becomes stale.
    ///
    /// Removing a stale node is a no-op. The root cannot be removed.
    pub fn remove(&mut self, id: NodeId) {
        if !self.is_alive(id) || id == self.root {
            return;
        }
        if let Some(parent) = self.node(id).parent {
            self.unlink_parent(id, parent);
        }
        self.free_subtree(id);
    }

    fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes[current.idx()].take() {
                stack.extend(node.children);
                self.free_list.push(current.idx());
            }
        }
    }

    /// Remove every child of `id`.
    pub fn clear_children(&mut self, id: NodeId) {
        if !self.is_alive(id) {
            return;
        }
        let children = core::mem::take(&mut self.node_mut(id).children);
        for child in children {
            self.node_mut(child).parent = None;
            self.free_subtree(child);
        }
    }

    /// Returns true if `id` refers to a live node.
    ///
    /// A `NodeId` is live if its slot exists and its generation matches
    /// the generation stored in that slot.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .map(|n| n.generation == id.generation())
            .unwrap_or(false)
    }

    /// Returns true if `id` is live and reachable from the root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        id == self.root || self.ancestors(id).any(|a| a == self.root)
    }

    /// Returns the parent of a node, or `None` for the root, detached nodes, and stale ids.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|node| node.parent)
    }

    /// Get the children of a node, or an empty slice if the node is stale.
    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Iterate the ancestors of a node, nearest first. The node itself is excluded.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        core::iter::successors(self.parent_of(id), |&p| self.parent_of(p))
    }

    /// Kind of a live node.
    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.get(id).map(|n| match n.data {
            NodeData::Element(_) => NodeKind::Element,
            NodeData::Text(_) => NodeKind::Text,
        })
    }

    /// Returns true if `id` is a live element.
    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    /// Lowercase tag name of a live element.
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    /// Character data of a live text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.get(id)?.data {
            NodeData::Text(t) => Some(t),
            NodeData::Element(_) => None,
        }
    }

    /// Value of an attribute on a live element.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?
            .attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if a live element carries the attribute, whatever its value.
    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    /// All attributes of a live element in source order.
    pub fn attributes(&self, id: NodeId) -> &[(String, String)] {
        self.element(id).map(|e| e.attrs.as_slice()).unwrap_or(&[])
    }

    /// Set or replace an attribute. The name is lowercased.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let element = self.element_mut(id)?;
        let name = name.to_ascii_lowercase();
        if let Some(slot) = element.attrs.iter_mut().find(|(k, _)| *k == name) {
            value.clone_into(&mut slot.1);
        } else {
            element.attrs.push((name, value.to_owned()));
        }
        Ok(())
    }

    /// Remove an attribute if present.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<(), DomError> {
        let element = self.element_mut(id)?;
        element.attrs.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        Ok(())
    }

    /// Returns true if the element's class list contains `class`.
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attribute(id, "class")
            .is_some_and(|list| list.split_ascii_whitespace().any(|c| c == class))
    }

    /// Add a class to the element's class list if missing.
    pub fn add_class(&mut self, id: NodeId, class: &str) -> Result<(), DomError> {
        if self.has_class(id, class) {
            return Ok(());
        }
        let list = match self.attribute(id, "class") {
            Some(existing) if !existing.trim().is_empty() => {
                format!("{} {class}", existing.trim())
            }
            _ => class.to_owned(),
        };
        self.set_attribute(id, "class", &list)
    }

    /// Remove every occurrence of a class from the element's class list.
    pub fn remove_class(&mut self, id: NodeId, class: &str) -> Result<(), DomError> {
        let Some(existing) = self.attribute(id, "class") else {
            self.element_mut(id)?;
            return Ok(());
        };
        let list = existing
            .split_ascii_whitespace()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute(id, "class", &list)
    }

    /// Concatenated character data of the node and its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.get(current) else {
                continue;
            };
            match &node.data {
                NodeData::Text(t) => out.push_str(t),
                NodeData::Element(_) => stack.extend(node.children.iter().rev()),
            }
        }
        out
    }

    /// Replace the children of an element with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> Result<(), DomError> {
        self.element_mut(id)?;
        self.clear_children(id);
        if !text.is_empty() {
            let t = self.create_text(text);
            self.link_parent(t, id, None);
        }
        Ok(())
    }

    /// Serialize the children of a node.
    ///
    /// For a `template` element this is its inert content.
    pub fn inner_html(&self, id: NodeId) -> String {
        if let Some(content) = self.template_content(id) {
            return content.to_owned();
        }
        let mut out = String::new();
        for &child in self.children_of(id) {
            serialize::write_node(self, child, &mut out);
        }
        out
    }

    /// Serialize a node including its own tag.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        serialize::write_node(self, id, &mut out);
        out
    }

    /// Inert markup held by a `template` element.
    ///
    /// Template content is not part of the tree: it is never connected,
    /// matched by selectors, or visited by traversal.
    pub fn template_content(&self, id: NodeId) -> Option<&str> {
        self.element(id)?.content.as_deref()
    }

    /// Parse markup into detached nodes, returned in document order.
    pub fn parse_fragment(&mut self, html: &str) -> Result<Vec<NodeId>, DomError> {
        parse::build_fragment(self, html)
    }

    /// Replace the children of an element with parsed markup.
    ///
    /// Returns the inserted top-level nodes. A `template` element stores the
    /// markup as its inert content instead and returns nothing.
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) -> Result<Vec<NodeId>, DomError> {
        if let Some(content) = &mut self.element_mut(id)?.content {
            html.clone_into(content);
            return Ok(Vec::new());
        }
        let fragment = self.parse_fragment(html)?;
        self.clear_children(id);
        for &node in &fragment {
            self.link_parent(node, id, None);
        }
        Ok(fragment)
    }

    /// Get the next node in depth-first order, staying inside the subtree of `scope`.
    ///
    /// Returns `None` at the end of the subtree or if `current` is stale.
    pub fn next_depth_first(&self, current: NodeId, scope: NodeId) -> Option<NodeId> {
        if !self.is_alive(current) {
            return None;
        }
        if let Some(&first_child) = self.children_of(current).first() {
            return Some(first_child);
        }
        let mut node = current;
        while node != scope {
            if let Some(next) = self.next_sibling(node) {
                return Some(next);
            }
            node = self.parent_of(node)?;
        }
        None
    }

    /// Get the previous node in depth-first order, staying inside the subtree of `scope`.
    ///
    /// Inverse of [`Document::next_depth_first`]: `scope` itself is the first node.
    pub fn prev_depth_first(&self, current: NodeId, scope: NodeId) -> Option<NodeId> {
        if !self.is_alive(current) || current == scope {
            return None;
        }
        let parent = self.parent_of(current)?;
        let siblings = self.children_of(parent);
        let pos = siblings.iter().position(|&id| id == current)?;
        let Some(pos) = pos.checked_sub(1) else {
            return Some(parent);
        };
        let mut node = siblings[pos];
        while let Some(&last) = self.children_of(node).last() {
            node = last;
        }
        Some(node)
    }

    /// Connected elements in document order, root first.
    pub fn elements(&self) -> Vec<NodeId> {
        let mut out = vec![self.root];
        out.extend(self.descendant_elements(self.root));
        out
    }

    /// Elements below `id` in document order. `id` itself is excluded.
    pub fn descendant_elements(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.next_depth_first(id, id);
        while let Some(node) = cursor {
            if self.is_element(node) {
                out.push(node);
            }
            cursor = self.next_depth_first(node, id);
        }
        out
    }

    /// Nearest preceding sibling that is an element.
    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent_of(id)?;
        let siblings = self.children_of(parent);
        let pos = siblings.iter().position(|&s| s == id)?;
        siblings[..pos]
            .iter()
            .rev()
            .copied()
            .find(|&s| self.is_element(s))
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent_of(node)?;
        let siblings = self.children_of(parent);
        let pos = siblings.iter().position(|&id| id == node)?;
        siblings.get(pos + 1).copied()
    }

    /// Returns true if the element matches a parsed selector.
    pub fn matches(&self, id: NodeId, selector: &Selector) -> bool {
        selector.matches(self, id)
    }

    /// First connected element matching `selector` in document order.
    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>, SelectorError> {
        let selector = Selector::parse(selector)?;
        Ok(self
            .elements()
            .into_iter()
            .find(|&id| selector.matches(self, id)))
    }

    /// Every connected element matching `selector` in document order.
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
        let selector = Selector::parse(selector)?;
        Ok(self
            .elements()
            .into_iter()
            .filter(|&id| selector.matches(self, id))
            .collect())
    }

    /// Nearest inclusive ancestor of `id` matching `selector`.
    pub fn closest(&self, id: NodeId, selector: &str) -> Result<Option<NodeId>, SelectorError> {
        let selector = Selector::parse(selector)?;
        Ok(core::iter::once(id)
            .chain(self.ancestors(id))
            .find(|&n| selector.matches(self, n)))
    }

    /// Record the rendered rectangle of an element.
    pub fn set_bounds(&mut self, id: NodeId, bounds: Option<Rect>) {
        if let Some(n) = self.node_opt_mut(id) {
            n.bounds = bounds;
        }
    }

    /// Rendered rectangle of a live node, if one was recorded.
    pub fn bounds(&self, id: NodeId) -> Option<Rect> {
        self.get(id).and_then(|n| n.bounds)
    }

    /// Iterate connected elements whose bounds overlap `rect`.
    ///
    /// Edges are included, so rectangles that share an edge are considered to overlap.
    /// Elements without recorded bounds never match.
    pub fn intersect_rect(&self, rect: Rect) -> impl Iterator<Item = NodeId> + '_ {
        self.elements().into_iter().filter(move |&id| {
            self.bounds(id).is_some_and(|b| {
                b.x0 <= rect.x1 && rect.x0 <= b.x1 && b.y0 <= rect.y1 && rect.y0 <= b.y1
            })
        })
    }

    // --- internals ---

    fn get(&self, id: NodeId) -> Option<&Node> {
        let n = self.nodes.get(id.idx())?.as_ref()?;
        (n.generation == id.generation()).then_some(n)
    }

    fn node(&self, id: NodeId) -> &Node {
        self.nodes[id.idx()].as_ref().expect("dangling NodeId")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.idx()].as_mut().expect("dangling NodeId")
    }

    fn node_opt_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let n = self.nodes.get_mut(id.idx())?.as_mut()?;
        if n.generation != id.generation() {
            return None;
        }
        Some(n)
    }

    pub(crate) fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.get(id)?.data {
            NodeData::Element(e) => Some(e),
            NodeData::Text(_) => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut Element, DomError> {
        match self.node_opt_mut(id) {
            None => Err(DomError::Stale(id)),
            Some(Node {
                data: NodeData::Element(e),
                ..
            }) => Ok(e),
            Some(_) => Err(DomError::NotAnElement(id)),
        }
    }

    fn check_insert(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        for id in [parent, child] {
            if !self.is_alive(id) {
                return Err(DomError::Stale(id));
            }
        }
        if !self.is_element(parent) {
            return Err(DomError::NotAnElement(parent));
        }
        if child == self.root {
            return Err(DomError::Root);
        }
        if parent == child || self.ancestors(parent).any(|a| a == child) {
            return Err(DomError::Cycle { parent, child });
        }
        Ok(())
    }

    fn link_parent(&mut self, id: NodeId, parent: NodeId, before: Option<NodeId>) {
        let parent_node = self.node_mut(parent);
        let pos = before
            .and_then(|r| parent_node.children.iter().position(|&c| c == r))
            .unwrap_or(parent_node.children.len());
        parent_node.children.insert(pos, id);
        self.node_mut(id).parent = Some(parent);
    }

    fn unlink_parent(&mut self, id: NodeId, parent: NodeId) {
        let p = self.node_mut(parent);
        p.children.retain(|c| *c != id);
        self.node_mut(id).parent = None;
    }
}

impl Node {
    fn new(generation: u32, data: NodeData) -> Self {
        Self {
            generation,
            parent: None,
            children: Vec::new(),
            data,
            bounds: None,
        }
    }
}
