//! Host page vocabulary
//!
//! Class names, attributes, and id conventions by which posts, replies, and
//! reply threads are recognized, plus the marker names this system writes
//! back onto the page. Structural sniffing is inherently fragile coupling to
//! an unversioned page, so it all lives here: when the host site changes its
//! markup, this is the only file that should need touching.

use fm_dom::{Document, NodeId};

#[derive(Debug, Clone)]
pub struct PageMarkers {
    /// Classes identifying an individual reply.
    pub reply_classes: Vec<String>,
    /// Attribute carrying a reply identifier.
    pub reply_id_attr: String,
    /// Classes identifying a top-level post.
    pub post_classes: Vec<String>,
    /// Attribute carrying a post identifier.
    pub post_id_attr: String,
    /// Element-id prefix of a reply-thread container.
    pub thread_id_prefix: String,

    // Markers written by the filter itself.
    pub hidden_class: String,
    pub prehide_class: String,
    pub filtered_attr: String,
    pub overlay_class: String,
}

impl Default for PageMarkers {
    fn default() -> Self {
        Self {
            reply_classes: vec!["reply".to_string(), "reply-item".to_string()],
            reply_id_attr: "data-reply-id".to_string(),
            post_classes: vec!["post".to_string(), "post-item".to_string()],
            post_id_attr: "data-post-id".to_string(),
            thread_id_prefix: "thread-".to_string(),
            hidden_class: "fm-hidden".to_string(),
            prehide_class: "fm-prehide".to_string(),
            filtered_attr: "data-fm-filtered".to_string(),
            overlay_class: "fm-thread-overlay".to_string(),
        }
    }
}

impl PageMarkers {
    /// An individual reply: reply class or reply-id attribute.
    pub fn is_reply(&self, doc: &Document, node: NodeId) -> bool {
        let n = doc.node(node);
        self.reply_classes.iter().any(|c| n.has_class(c)) || n.attr(&self.reply_id_attr).is_some()
    }

    /// A top-level post marker: post class or post-id attribute.
    pub fn is_post_marker(&self, doc: &Document, node: NodeId) -> bool {
        let n = doc.node(node);
        self.post_classes.iter().any(|c| n.has_class(c)) || n.attr(&self.post_id_attr).is_some()
    }

    /// A reply-thread container, recognized by its element-id prefix.
    pub fn is_thread_container(&self, doc: &Document, node: NodeId) -> bool {
        doc.node(node)
            .element_id
            .as_deref()
            .is_some_and(|id| id.starts_with(&self.thread_id_prefix))
    }

    /// A candidate for the throttled rescan: anything post-like plus
    /// semantic articles.
    pub fn is_scan_candidate(&self, doc: &Document, node: NodeId) -> bool {
        self.is_post_marker(doc, node) || doc.node(node).tag == "article"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_page_shapes() {
        let markers = PageMarkers::default();
        let mut doc = Document::new("https://social.example/");

        let reply = doc.create_element("div");
        doc.add_class(reply, "reply");
        doc.append_child(doc.root(), reply);
        assert!(markers.is_reply(&doc, reply));

        let by_attr = doc.create_element("div");
        doc.set_attr(by_attr, "data-reply-id", "9");
        doc.append_child(doc.root(), by_attr);
        assert!(markers.is_reply(&doc, by_attr));

        let post = doc.create_element("div");
        doc.set_attr(post, "data-post-id", "42");
        doc.append_child(doc.root(), post);
        assert!(markers.is_post_marker(&doc, post));
        assert!(markers.is_scan_candidate(&doc, post));

        let thread = doc.create_element("div");
        doc.set_element_id(thread, "thread-42");
        doc.append_child(doc.root(), thread);
        assert!(markers.is_thread_container(&doc, thread));
        assert!(!markers.is_thread_container(&doc, post));

        let article = doc.create_element("article");
        doc.append_child(doc.root(), article);
        assert!(markers.is_scan_candidate(&doc, article));
        assert!(!markers.is_post_marker(&doc, article));
    }
}
