//! Container resolution
//!
//! A matched candidate node is rarely the thing to hide. Posts are hidden as
//! a whole; replies are hidden individually, never by hiding their parent
//! thread, because the thread UI keeps rendering the surrounding replies.
//! This module walks the structure around a candidate and picks the
//! container that gets the hidden marker.

use fm_dom::{Document, NodeId};

use crate::markers::PageMarkers;

/// Parent hops allowed when searching for a reply ancestor inside a thread.
const MAX_REPLY_WALK: usize = 5;
/// Parent hops allowed for the post and generic-boundary walks.
const MAX_CONTAINER_WALK: usize = 10;

/// Resolve `node` to the container that should carry the hidden marker.
///
/// Order of preference: the node itself if it is a reply; a reply ancestor
/// when inside a thread container; a post ancestor; a generic structural
/// boundary (`article` or any classed element); the parent; the node.
pub fn locate_container(doc: &Document, node: NodeId, markers: &PageMarkers) -> NodeId {
    if markers.is_reply(doc, node) {
        return node;
    }

    if let Some(thread) = doc.closest(node, usize::MAX, |d, n| markers.is_thread_container(d, n)) {
        let mut current = node;
        for _ in 0..MAX_REPLY_WALK {
            if current == thread {
                break;
            }
            if markers.is_reply(doc, current) {
                return current;
            }
            match doc.parent(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
    }

    if let Some(post) = doc.closest(node, MAX_CONTAINER_WALK, |d, n| {
        markers.is_post_marker(d, n)
            || d.descendant_matching(n, |d2, m| d2.attr(m, &markers.post_id_attr).is_some())
                .is_some()
    }) {
        return post;
    }

    if let Some(boundary) = doc.closest(node, MAX_CONTAINER_WALK, |d, n| {
        let element = d.node(n);
        element.tag == "article" || !element.classes().is_empty()
    }) {
        return boundary;
    }

    doc.parent(node).unwrap_or(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_returns_itself() {
        let markers = PageMarkers::default();
        let mut doc = Document::new("https://social.example/");
        let reply = doc.create_element("div");
        doc.add_class(reply, "reply");
        doc.append_child(doc.root(), reply);
        assert_eq!(locate_container(&doc, reply, &markers), reply);
    }

    #[test]
    fn node_inside_thread_resolves_to_reply_ancestor() {
        let markers = PageMarkers::default();
        let mut doc = Document::new("https://social.example/");
        let thread = doc.create_element("div");
        doc.set_element_id(thread, "thread-42");
        let reply = doc.create_element("div");
        doc.set_attr(reply, "data-reply-id", "7");
        let span = doc.create_element("span");
        doc.append_child(doc.root(), thread);
        doc.append_child(thread, reply);
        doc.append_child(reply, span);

        assert_eq!(locate_container(&doc, span, &markers), reply);
    }

    #[test]
    fn node_inside_post_resolves_to_post() {
        let markers = PageMarkers::default();
        let mut doc = Document::new("https://social.example/");
        let post = doc.create_element("div");
        doc.set_attr(post, "data-post-id", "42");
        let body = doc.create_element("div");
        let span = doc.create_element("span");
        doc.append_child(doc.root(), post);
        doc.append_child(post, body);
        doc.append_child(body, span);

        assert_eq!(locate_container(&doc, span, &markers), post);
    }

    #[test]
    fn generic_boundary_fallback() {
        let markers = PageMarkers::default();
        let mut doc = Document::new("https://social.example/");
        let article = doc.create_element("article");
        let span = doc.create_element("span");
        doc.append_child(doc.root(), article);
        doc.append_child(article, span);

        assert_eq!(locate_container(&doc, span, &markers), article);
    }

    #[test]
    fn parent_fallback_for_unrecognized_structure() {
        let markers = PageMarkers::default();
        let mut doc = Document::new("https://social.example/");
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        doc.append_child(doc.root(), outer);
        doc.append_child(outer, inner);

        assert_eq!(locate_container(&doc, inner, &markers), outer);
    }
}
