//! Visibility gate
//!
//! The single source of truth for what the user currently sees:
//!
//! - a page-wide pre-hide class on the document root, armed before any
//!   filtering begins and cleared when the scan pass completes — with an
//!   independent fail-safe deadline so a stuck filter can never hide the
//!   page for more than a bounded interval;
//! - a per-thread filtered attribute, set exactly once after the thread's
//!   replies were classified;
//! - per-container hidden classes, cleared in bulk when filtering is
//!   disabled or the blocklist/mode changes.

use std::time::Duration;

use fm_dom::{Document, NodeId};

use crate::markers::PageMarkers;

/// Upper bound on how long the pre-hide state may be held.
pub const PREHIDE_FAILSAFE: Duration = Duration::from_millis(2000);

// =============================================================================
// Page-wide pre-hide
// =============================================================================

#[derive(Debug, Default)]
pub struct Gate {
    prehidden: bool,
    failsafe_at: Option<Duration>,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the pre-hide state and its fail-safe deadline.
    pub fn prehide(&mut self, doc: &mut Document, markers: &PageMarkers, now: Duration) {
        doc.add_class(doc.root(), &markers.prehide_class);
        self.prehidden = true;
        self.failsafe_at = Some(now + PREHIDE_FAILSAFE);
    }

    /// Clear the pre-hide state and disarm the fail-safe.
    pub fn reveal(&mut self, doc: &mut Document, markers: &PageMarkers) {
        doc.remove_class(doc.root(), &markers.prehide_class);
        self.prehidden = false;
        self.failsafe_at = None;
    }

    /// Force a reveal if the fail-safe deadline has passed. Returns whether
    /// the fail-safe fired.
    pub fn check_failsafe(
        &mut self,
        doc: &mut Document,
        markers: &PageMarkers,
        now: Duration,
    ) -> bool {
        match self.failsafe_at {
            Some(at) if now >= at => {
                log::warn!("pre-hide fail-safe fired; revealing page");
                self.reveal(doc, markers);
                true
            }
            _ => false,
        }
    }

    pub fn is_prehidden(&self) -> bool {
        self.prehidden
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.failsafe_at
    }
}

// =============================================================================
// Per-thread and per-container markers
// =============================================================================

pub fn is_thread_filtered(doc: &Document, markers: &PageMarkers, thread: NodeId) -> bool {
    doc.attr(thread, &markers.filtered_attr) == Some("1")
}

pub fn set_thread_filtered(doc: &mut Document, markers: &PageMarkers, thread: NodeId) {
    doc.set_attr(thread, &markers.filtered_attr, "1");
}

pub fn clear_thread_filtered(doc: &mut Document, markers: &PageMarkers, thread: NodeId) {
    doc.remove_attr(thread, &markers.filtered_attr);
}

pub fn mark_hidden(doc: &mut Document, markers: &PageMarkers, container: NodeId) {
    doc.add_class(container, &markers.hidden_class);
}

pub fn is_hidden(doc: &Document, markers: &PageMarkers, container: NodeId) -> bool {
    doc.has_class(container, &markers.hidden_class)
}

/// Remove every hidden marker on the page. Returns how many were cleared.
pub fn clear_all_hidden(doc: &mut Document, markers: &PageMarkers) -> usize {
    let hidden: Vec<NodeId> = doc
        .descendants(doc.root())
        .filter(|&n| doc.has_class(n, &markers.hidden_class))
        .collect();
    let count = hidden.len();
    for node in hidden {
        doc.remove_class(node, &markers.hidden_class);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prehide_and_reveal() {
        let markers = PageMarkers::default();
        let mut doc = Document::new("https://social.example/");
        let mut gate = Gate::new();

        gate.prehide(&mut doc, &markers, Duration::ZERO);
        assert!(gate.is_prehidden());
        assert!(doc.has_class(doc.root(), &markers.prehide_class));

        gate.reveal(&mut doc, &markers);
        assert!(!gate.is_prehidden());
        assert!(!doc.has_class(doc.root(), &markers.prehide_class));
        assert_eq!(gate.next_deadline(), None);
    }

    #[test]
    fn failsafe_bounds_the_prehide_window() {
        let markers = PageMarkers::default();
        let mut doc = Document::new("https://social.example/");
        let mut gate = Gate::new();

        gate.prehide(&mut doc, &markers, Duration::ZERO);
        assert!(!gate.check_failsafe(&mut doc, &markers, Duration::from_millis(1999)));
        assert!(gate.is_prehidden());

        assert!(gate.check_failsafe(&mut doc, &markers, PREHIDE_FAILSAFE));
        assert!(!gate.is_prehidden());
        assert!(!doc.has_class(doc.root(), &markers.prehide_class));

        // Disarmed after firing.
        assert!(!gate.check_failsafe(&mut doc, &markers, Duration::from_secs(10)));
    }

    #[test]
    fn thread_filtered_flag() {
        let markers = PageMarkers::default();
        let mut doc = Document::new("https://social.example/");
        let thread = doc.create_element("div");
        doc.set_element_id(thread, "thread-1");
        doc.append_child(doc.root(), thread);

        assert!(!is_thread_filtered(&doc, &markers, thread));
        set_thread_filtered(&mut doc, &markers, thread);
        assert!(is_thread_filtered(&doc, &markers, thread));
        clear_thread_filtered(&mut doc, &markers, thread);
        assert!(!is_thread_filtered(&doc, &markers, thread));
    }

    #[test]
    fn clear_all_hidden_sweeps_the_page() {
        let markers = PageMarkers::default();
        let mut doc = Document::new("https://social.example/");
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        doc.append_child(doc.root(), a);
        doc.append_child(a, b);
        mark_hidden(&mut doc, &markers, a);
        mark_hidden(&mut doc, &markers, b);

        assert_eq!(clear_all_hidden(&mut doc, &markers), 2);
        assert!(!is_hidden(&doc, &markers, a));
        assert!(!is_hidden(&doc, &markers, b));
        assert_eq!(clear_all_hidden(&mut doc, &markers), 0);
    }
}
