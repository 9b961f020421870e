//! Page fixtures
//!
//! JSON description of a page subtree, used by tests and the CLI to build
//! documents without hand-writing arena calls.
//!
//! ```json
//! {
//!   "url": "https://social.example/feed",
//!   "body": [
//!     {"tag": "div", "classes": ["post"], "text": "hi @alice!"}
//!   ]
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Document, NodeId};

/// A whole page: URL plus the elements under the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageFixture {
    pub url: String,
    #[serde(default)]
    pub body: Vec<FixtureNode>,
}

/// One element in a fixture tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureNode {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FixtureNode>,
}

/// Build a [`Document`] from a fixture.
///
/// The construction journal is drained before returning: a fixture models a
/// page that existed before the observer was attached, not a mutation burst.
pub fn build_document(fixture: &PageFixture) -> Document {
    let mut doc = Document::new(&fixture.url);
    let root = doc.root();
    for node in &fixture.body {
        append_fixture(&mut doc, root, node);
    }
    doc.take_mutations();
    doc
}

/// Append a fixture subtree under `parent`, journaling the insertions.
pub fn append_fixture(doc: &mut Document, parent: NodeId, fixture: &FixtureNode) -> NodeId {
    let id = doc.create_element(&fixture.tag);
    if let Some(element_id) = &fixture.id {
        doc.set_element_id(id, element_id);
    }
    for class in &fixture.classes {
        doc.add_class(id, class);
    }
    for (name, value) in &fixture.attrs {
        doc.set_attr(id, name, value);
    }
    if let Some(text) = &fixture.text {
        doc.set_text(id, text);
    }
    doc.append_child(parent, id);
    for child in &fixture.children {
        append_fixture(doc, id, child);
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_from_json() {
        let json = r#"{
            "url": "https://social.example/feed",
            "body": [
                {
                    "tag": "div",
                    "classes": ["post"],
                    "attrs": {"data-post-id": "42"},
                    "text": "hello ",
                    "children": [
                        {"tag": "a", "attrs": {"href": "/alice"}, "text": "@alice"}
                    ]
                }
            ]
        }"#;

        let fixture: PageFixture = serde_json::from_str(json).unwrap();
        let mut doc = build_document(&fixture);

        // Construction does not count as observed mutations.
        assert!(doc.take_mutations().is_empty());

        let post = doc.children(doc.root())[0];
        assert!(doc.has_class(post, "post"));
        assert_eq!(doc.attr(post, "data-post-id"), Some("42"));
        assert_eq!(doc.text_content(post), "hello @alice");
        assert_eq!(doc.link_targets(post), vec!["/alice"]);
    }

    #[test]
    fn append_journals_mutations() {
        let fixture = FixtureNode {
            tag: "div".to_string(),
            id: None,
            classes: vec!["reply".to_string()],
            attrs: BTreeMap::new(),
            text: Some("late reply".to_string()),
            children: Vec::new(),
        };
        let mut doc = Document::new("https://social.example/");
        let root = doc.root();
        let added = append_fixture(&mut doc, root, &fixture);
        let records = doc.take_mutations();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].added, vec![added]);
    }
}
