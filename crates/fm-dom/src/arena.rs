//! Node arena and structural queries
//!
//! Elements live in a flat arena indexed by [`NodeId`]. Slots are never
//! freed while the document exists; detaching a subtree only unlinks it from
//! its parent. That makes `NodeId` a stable identity suitable for
//! processed-sets and work queues, which is exactly what the filtering
//! pipeline needs.

use std::collections::BTreeMap;

use crate::mutation::MutationRecord;

// =============================================================================
// NodeId
// =============================================================================

/// Stable identifier of a node in a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// =============================================================================
// Node
// =============================================================================

/// A single element: tag, element id, classes, attributes, own text.
#[derive(Debug, Clone, Default)]
pub struct Node {
    pub tag: String,
    pub element_id: Option<String>,
    classes: Vec<String>,
    attrs: BTreeMap<String, String>,
    pub text: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

// =============================================================================
// Document
// =============================================================================

/// The page being observed: arena, root element, current URL, and the
/// mutation journal drained by the harness.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    url: String,
    journal: Vec<MutationRecord>,
}

impl Document {
    /// Create an empty document with an `html` root element.
    pub fn new(url: &str) -> Self {
        let root_node = Node {
            tag: "html".to_string(),
            ..Node::default()
        };
        Self {
            nodes: vec![root_node],
            root: NodeId(0),
            url: url.to_string(),
            journal: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Change the page URL; models a client-side (SPA) navigation.
    pub fn set_url(&mut self, url: &str) {
        self.url = url.to_string();
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // -------------------------------------------------------------------------
    // Construction and structure
    // -------------------------------------------------------------------------

    /// Create a detached element. It enters the tree (and the mutation
    /// journal) only when appended to a parent.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            tag: tag.to_string(),
            ..Node::default()
        });
        id
    }

    /// Append `child` under `parent` and journal the insertion.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(self.nodes[child.index()].parent.is_none());
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
        self.journal.push(MutationRecord {
            added: vec![child],
        });
    }

    /// Unlink `node` from its parent. The arena slot survives, so stale
    /// identifiers held by the pipeline stay valid but report as detached.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.index()].parent.take() {
            self.nodes[parent.index()].children.retain(|&c| c != node);
        }
    }

    /// Whether `node` is still reachable from the root.
    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == self.root {
                return true;
            }
            match self.nodes[current.index()].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Drain the mutation journal. The harness feeds these to the engine the
    /// way a MutationObserver callback would.
    pub fn take_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.journal)
    }

    // -------------------------------------------------------------------------
    // Attributes, classes, text
    // -------------------------------------------------------------------------

    pub fn set_element_id(&mut self, id: NodeId, value: &str) {
        self.nodes[id.index()].element_id = Some(value.to_string());
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        self.nodes[id.index()]
            .attrs
            .insert(name.to_string(), value.to_string());
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        self.nodes[id.index()].attrs.remove(name);
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id).attr(name)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        let node = &mut self.nodes[id.index()];
        if !node.classes.iter().any(|c| c == class) {
            node.classes.push(class.to_string());
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        self.nodes[id.index()].classes.retain(|c| c != class);
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.node(id).has_class(class)
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) {
        self.nodes[id.index()].text = Some(text.to_string());
    }

    /// Concatenated text of the subtree in document order, the analogue of
    /// DOM `textContent`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        if let Some(text) = &node.text {
            out.push_str(text);
        }
        for &child in &node.children {
            self.collect_text(child, out);
        }
    }

    /// `href` targets of every `a[href]` descendant.
    pub fn link_targets(&self, id: NodeId) -> Vec<&str> {
        let mut out = Vec::new();
        for desc in self.descendants(id) {
            let node = self.node(desc);
            if node.tag == "a" {
                if let Some(href) = node.attr("href") {
                    out.push(href);
                }
            }
        }
        out
    }

    // -------------------------------------------------------------------------
    // Traversal
    // -------------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Ancestors of `id`, nearest first, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            current: self.node(id).parent,
        }
    }

    /// Pre-order descendants of `id`, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack = Vec::new();
        stack.extend(self.node(id).children.iter().rev().copied());
        Descendants { doc: self, stack }
    }

    /// Nearest node (self included) within `max_depth` parent hops for which
    /// `pred` holds.
    pub fn closest<F>(&self, id: NodeId, max_depth: usize, pred: F) -> Option<NodeId>
    where
        F: Fn(&Document, NodeId) -> bool,
    {
        let mut current = Some(id);
        let mut depth = 0;
        while let Some(node) = current {
            if pred(self, node) {
                return Some(node);
            }
            if depth >= max_depth {
                return None;
            }
            current = self.node(node).parent;
            depth += 1;
        }
        None
    }

    /// First descendant (document order) for which `pred` holds.
    pub fn descendant_matching<F>(&self, id: NodeId, pred: F) -> Option<NodeId>
    where
        F: Fn(&Document, NodeId) -> bool,
    {
        self.descendants(id).find(|&n| pred(self, n))
    }
}

// =============================================================================
// Iterators
// =============================================================================

pub struct Ancestors<'a> {
    doc: &'a Document,
    current: Option<NodeId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.current?;
        self.current = self.doc.node(id).parent;
        Some(id)
    }
}

pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.doc.node(id).children.iter().rev().copied());
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_tree() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new("https://example.test/");
        let outer = doc.create_element("div");
        let inner = doc.create_element("p");
        let link = doc.create_element("a");
        doc.append_child(doc.root(), outer);
        doc.append_child(outer, inner);
        doc.append_child(inner, link);
        (doc, outer, inner, link)
    }

    #[test]
    fn append_and_detach() {
        let (mut doc, outer, inner, link) = small_tree();
        assert!(doc.is_attached(link));
        assert_eq!(doc.parent(inner), Some(outer));

        doc.detach(inner);
        assert!(!doc.is_attached(inner));
        assert!(!doc.is_attached(link));
        assert!(doc.is_attached(outer));
        // The arena slot is still readable through the stale id.
        assert_eq!(doc.node(link).tag, "a");
    }

    #[test]
    fn text_content_is_document_order() {
        let (mut doc, outer, inner, link) = small_tree();
        doc.set_text(outer, "a ");
        doc.set_text(inner, "b ");
        doc.set_text(link, "c");
        assert_eq!(doc.text_content(outer), "a b c");
        assert_eq!(doc.text_content(inner), "b c");
    }

    #[test]
    fn link_targets_are_descendants_only() {
        let (mut doc, outer, _inner, link) = small_tree();
        doc.set_attr(link, "href", "/alice");
        assert_eq!(doc.link_targets(outer), vec!["/alice"]);
        // querySelector semantics: the element itself is not inspected
        assert!(doc.link_targets(link).is_empty());
    }

    #[test]
    fn descendants_preorder() {
        let (doc, outer, inner, link) = small_tree();
        let order: Vec<NodeId> = doc.descendants(outer).collect();
        assert_eq!(order, vec![inner, link]);
    }

    #[test]
    fn closest_respects_depth() {
        let (doc, outer, _inner, link) = small_tree();
        let hit = doc.closest(link, 10, |d, n| d.node(n).tag == "div");
        assert_eq!(hit, Some(outer));
        let miss = doc.closest(link, 1, |d, n| d.node(n).tag == "div");
        assert_eq!(miss, None);
    }

    #[test]
    fn journal_drains() {
        let (mut doc, _, _, _) = small_tree();
        let records = doc.take_mutations();
        assert_eq!(records.len(), 3);
        assert!(doc.take_mutations().is_empty());
    }
}
