//! Throttled scan queue
//!
//! Candidate nodes from mutation bursts accumulate here instead of being
//! classified inline. A throttle deadline batches the work, and each batch
//! is capped so a single large burst never holds the page's thread for an
//! unbounded pass; the remainder is re-scheduled, not processed immediately.

use std::collections::VecDeque;
use std::time::Duration;

use fm_dom::NodeId;

pub const THROTTLE: Duration = Duration::from_millis(500);
pub const BATCH_SIZE: usize = 100;

#[derive(Debug, Default)]
pub struct ScanQueue {
    pending: VecDeque<NodeId>,
    throttle_at: Option<Duration>,
}

impl ScanQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a candidate and arm the throttle timer if it is not already
    /// running. Callers filter out already-processed nodes.
    pub fn enqueue(&mut self, node: NodeId, now: Duration) {
        self.pending.push_back(node);
        if self.throttle_at.is_none() {
            self.throttle_at = Some(now + THROTTLE);
        }
    }

    pub fn is_due(&self, now: Duration) -> bool {
        matches!(self.throttle_at, Some(at) if now >= at)
    }

    /// Pop up to one batch. If work remains, the throttle is re-armed so the
    /// remainder runs a full interval later.
    pub fn take_batch(&mut self, now: Duration) -> Vec<NodeId> {
        self.throttle_at = None;
        let count = self.pending.len().min(BATCH_SIZE);
        let batch: Vec<NodeId> = self.pending.drain(..count).collect();
        if !self.pending.is_empty() {
            self.throttle_at = Some(now + THROTTLE);
        }
        batch
    }

    /// Abandon all pending work (watchdog auto-disable, settings rescan).
    pub fn clear(&mut self) {
        self.pending.clear();
        self.throttle_at = None;
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.throttle_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(doc: &mut fm_dom::Document) -> NodeId {
        let id = doc.create_element("div");
        doc.append_child(doc.root(), id);
        id
    }

    #[test]
    fn throttle_arms_once() {
        let mut doc = fm_dom::Document::new("https://social.example/");
        let mut queue = ScanQueue::new();
        let t0 = Duration::ZERO;

        queue.enqueue(node(&mut doc), t0);
        queue.enqueue(node(&mut doc), t0 + Duration::from_millis(100));
        assert_eq!(queue.next_deadline(), Some(THROTTLE));

        assert!(!queue.is_due(Duration::from_millis(499)));
        assert!(queue.is_due(Duration::from_millis(500)));
    }

    #[test]
    fn batch_is_capped_and_remainder_rescheduled() {
        let mut doc = fm_dom::Document::new("https://social.example/");
        let mut queue = ScanQueue::new();
        for _ in 0..(BATCH_SIZE + 25) {
            queue.enqueue(node(&mut doc), Duration::ZERO);
        }

        let due = THROTTLE;
        let batch = queue.take_batch(due);
        assert_eq!(batch.len(), BATCH_SIZE);
        assert_eq!(queue.len(), 25);
        assert_eq!(queue.next_deadline(), Some(due + THROTTLE));

        let rest = queue.take_batch(due + THROTTLE);
        assert_eq!(rest.len(), 25);
        assert!(queue.is_empty());
        assert_eq!(queue.next_deadline(), None);
    }

    #[test]
    fn clear_abandons_work() {
        let mut doc = fm_dom::Document::new("https://social.example/");
        let mut queue = ScanQueue::new();
        queue.enqueue(node(&mut doc), Duration::ZERO);
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.next_deadline(), None);
    }
}
