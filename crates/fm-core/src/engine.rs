//! Mutation watcher and run loop
//!
//! The engine owns the in-memory config, the processed-set, and every timer.
//! The host delivers mutation records, clicks, and settings-change
//! notifications; [`Engine::advance`] dispatches whatever timers are due.
//! All of it runs on one thread — ordering guarantees come from dispatch
//! order, not from locks.
//!
//! Two paths exist for new content:
//!
//! - Reply threads are CSS-hidden by the page until their filtered flag is
//!   set, so a thread container is classified synchronously and revealed in
//!   the same dispatch; queuing would visibly delay the reveal.
//! - Everything else goes through the throttled scan queue.

use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;

use fm_dom::{Document, MutationRecord, NodeId};
use serde_json::Value;

use crate::classify::locate_container;
use crate::clock::Clock;
use crate::config::{self, FilterConfig};
use crate::error::FilterError;
use crate::gate::{self, Gate};
use crate::markers::PageMarkers;
use crate::matcher;
use crate::queue::ScanQueue;
use crate::store::{ChangeSet, SettingsStore, StorageArea};

/// SPA navigation poll period.
pub const NAV_POLL: Duration = Duration::from_millis(1000);
/// How long a clicked post identifier is retained.
pub const CLICK_RETENTION: Duration = Duration::from_millis(2000);
/// Delay before the full rescan triggered by a settings change.
pub const RESCAN_DELAY: Duration = Duration::from_millis(100);
/// Parent hops inspected when resolving the clicked post.
const CLICK_WALK: usize = 5;

#[derive(Debug)]
struct PendingPost {
    id: String,
    expires_at: Duration,
}

pub struct Engine {
    config: FilterConfig,
    markers: PageMarkers,
    store: Box<dyn SettingsStore>,
    clock: Rc<dyn Clock>,
    gate: Gate,
    queue: ScanQueue,
    processed: HashSet<NodeId>,

    nav_poll_at: Duration,
    last_url: String,
    /// Settings-change rescan, throttled through the queue.
    rescan_at: Option<Duration>,
    /// Synchronous rescan scheduled by SPA navigation (the "timeout zero").
    immediate_rescan_at: Option<Duration>,
    /// Cosmetic thread overlays awaiting their removal frame.
    overlays: Vec<NodeId>,
    overlay_sweep_at: Option<Duration>,
    pending_post: Option<PendingPost>,
}

impl Engine {
    pub fn new(store: Box<dyn SettingsStore>, clock: Rc<dyn Clock>) -> Self {
        Self::with_markers(store, clock, PageMarkers::default())
    }

    pub fn with_markers(
        store: Box<dyn SettingsStore>,
        clock: Rc<dyn Clock>,
        markers: PageMarkers,
    ) -> Self {
        Self {
            config: FilterConfig::default(),
            markers,
            store,
            clock,
            gate: Gate::new(),
            queue: ScanQueue::new(),
            processed: HashSet::new(),
            nav_poll_at: Duration::ZERO,
            last_url: String::new(),
            rescan_at: None,
            immediate_rescan_at: None,
            overlays: Vec::new(),
            overlay_sweep_at: None,
            pending_post: None,
        }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn markers(&self) -> &PageMarkers {
        &self.markers
    }

    pub fn store(&self) -> &dyn SettingsStore {
        self.store.as_ref()
    }

    pub fn is_prehidden(&self) -> bool {
        self.gate.is_prehidden()
    }

    /// Post identifier most recently clicked, if still within its retention
    /// window. Kept for targeting heuristics; matching does not depend on it.
    pub fn pending_post(&self) -> Option<&str> {
        self.pending_post.as_ref().map(|p| p.id.as_str())
    }

    // -------------------------------------------------------------------------
    // Startup
    // -------------------------------------------------------------------------

    /// Load settings and run the initial synchronous scan. The page is
    /// pre-hidden for the duration; the reveal runs on every exit path, and
    /// the fail-safe deadline bounds the window even if scanning stalls.
    pub fn start(&mut self, doc: &mut Document) {
        let now = self.clock.now();
        self.last_url = doc.url().to_string();
        self.nav_poll_at = now + NAV_POLL;
        self.gate.prehide(doc, &self.markers, now);

        self.config = FilterConfig::load(self.store.as_ref());

        if self.config.enabled {
            self.scan_and_reveal(doc);
        } else {
            self.gate.reveal(doc, &self.markers);
        }
    }

    /// Unthrottled full scan followed by an unconditional reveal. Per-node
    /// failures are contained inside the scan, so the reveal below is
    /// reached on every path.
    fn scan_and_reveal(&mut self, doc: &mut Document) {
        self.rescan_all_immediate(doc);

        // Permalink pages already carry populated thread containers.
        let threads: Vec<NodeId> = doc
            .descendants(doc.root())
            .filter(|&n| self.markers.is_thread_container(doc, n))
            .collect();
        for thread in threads {
            self.process_and_reveal_thread(doc, thread);
        }

        self.gate.reveal(doc, &self.markers);
    }

    // -------------------------------------------------------------------------
    // Mutation watching
    // -------------------------------------------------------------------------

    /// React to a delivery of mutation records, in document order,
    /// synchronously.
    pub fn handle_mutations(&mut self, doc: &mut Document, records: &[MutationRecord]) {
        let now = self.clock.now();
        for record in records {
            for &node in &record.added {
                self.watch_added_node(doc, node, now);
            }
        }
    }

    fn watch_added_node(&mut self, doc: &mut Document, node: NodeId, now: Duration) {
        // A thread container arriving: classify and reveal right away.
        if self.markers.is_thread_container(doc, node) {
            self.process_and_reveal_thread(doc, node);
            self.pending_post = None;
            return;
        }

        // Nested insertion carrying a thread container.
        if let Some(thread) =
            doc.descendant_matching(node, |d, n| self.markers.is_thread_container(d, n))
        {
            if !gate::is_thread_filtered(doc, &self.markers, thread) {
                self.process_and_reveal_thread(doc, thread);
            }
        }

        // A reply landing after its thread was already filtered missed the
        // thread-level pass; classify it immediately.
        if self.markers.is_reply(doc, node) {
            if let Some(thread) =
                doc.closest(node, usize::MAX, |d, n| self.markers.is_thread_container(d, n))
            {
                if gate::is_thread_filtered(doc, &self.markers, thread) {
                    self.classify_reply_now(doc, node);
                    return;
                }
            }
        }

        // Everything else takes the throttled path, along with any candidate
        // descendants it brought with it.
        self.enqueue(node, now);
        let descendants: Vec<NodeId> = doc
            .descendants(node)
            .filter(|&n| self.markers.is_scan_candidate(doc, n))
            .collect();
        for candidate in descendants {
            self.enqueue(candidate, now);
        }
    }

    /// Capture-phase click tracking: remember the nearest post identifier
    /// for a bounded window.
    pub fn handle_click(&mut self, doc: &Document, target: NodeId) {
        let now = self.clock.now();
        if let Some(post) = doc.closest(target, CLICK_WALK, |d, n| {
            d.attr(n, &self.markers.post_id_attr).is_some()
        }) {
            let id = doc
                .attr(post, &self.markers.post_id_attr)
                .unwrap_or_default()
                .to_string();
            self.pending_post = Some(PendingPost {
                id,
                expires_at: now + CLICK_RETENTION,
            });
        }
    }

    // -------------------------------------------------------------------------
    // Settings bridge
    // -------------------------------------------------------------------------

    /// Apply an external settings-change notification. Notifications from
    /// any area other than `Local` are ignored.
    pub fn handle_storage_change(&mut self, doc: &mut Document, changes: &ChangeSet) {
        if changes.area != StorageArea::Local {
            return;
        }

        let mut needs_rescan = false;

        for change in &changes.changes {
            match change.key.as_str() {
                config::KEY_ENABLED => {
                    let enabled = change.new.as_ref().and_then(Value::as_bool).unwrap_or(false);
                    self.config.enabled = enabled;
                    if enabled {
                        needs_rescan = true;
                    } else {
                        // Fail open: never leave stale hides when off.
                        gate::clear_all_hidden(doc, &self.markers);
                    }
                }
                config::KEY_BLACKLIST => {
                    let raw = change
                        .new
                        .as_ref()
                        .map(config::string_array)
                        .unwrap_or_default();
                    self.config.set_blocklist(raw);
                    needs_rescan = true;
                }
                config::KEY_FUZZY => {
                    self.config.fuzzy_match =
                        change.new.as_ref().and_then(Value::as_bool).unwrap_or(false);
                    needs_rescan = true;
                }
                config::KEY_WATCHDOG_AUTO_DISABLE => {
                    self.config.watchdog_auto_disable =
                        change.new.as_ref().and_then(Value::as_bool).unwrap_or(false);
                }
                config::KEY_WATCHDOG_THRESHOLD_MS => {
                    self.config.watchdog_threshold = change
                        .new
                        .as_ref()
                        .and_then(Value::as_u64)
                        .filter(|&ms| ms > 0)
                        .map(Duration::from_millis)
                        .unwrap_or(config::DEFAULT_WATCHDOG_THRESHOLD);
                }
                _ => {}
            }
        }

        if needs_rescan && self.config.enabled {
            gate::clear_all_hidden(doc, &self.markers);
            // Force a fresh evaluation of everything under the new settings.
            self.processed.clear();
            self.rescan_at = Some(self.clock.now() + RESCAN_DELAY);
        }
    }

    // -------------------------------------------------------------------------
    // Run loop
    // -------------------------------------------------------------------------

    /// Fire every due timer: navigation poll, scheduled rescans, the queue
    /// throttle, overlay frames, click retention, and the pre-hide
    /// fail-safe.
    pub fn advance(&mut self, doc: &mut Document) {
        let now = self.clock.now();

        if now >= self.nav_poll_at {
            self.nav_poll_at = now + NAV_POLL;
            if doc.url() != self.last_url {
                self.last_url = doc.url().to_string();
                self.gate.prehide(doc, &self.markers, now);
                self.immediate_rescan_at = Some(now);
            }
        }

        if self.immediate_rescan_at.is_some_and(|at| now >= at) {
            self.immediate_rescan_at = None;
            // Synchronous, to avoid flashing content after navigation; the
            // reveal is unconditional.
            self.rescan_all_immediate(doc);
            self.gate.reveal(doc, &self.markers);
        }

        if self.rescan_at.is_some_and(|at| now >= at) {
            self.rescan_at = None;
            self.rescan_all(doc, now);
        }

        if self.queue.is_due(now) {
            self.process_batch(doc);
        }

        if self.overlay_sweep_at.is_some_and(|at| now >= at) {
            self.overlay_sweep_at = None;
            for overlay in std::mem::take(&mut self.overlays) {
                doc.detach(overlay);
            }
        }

        if self.pending_post.as_ref().is_some_and(|p| now >= p.expires_at) {
            self.pending_post = None;
        }

        self.gate.check_failsafe(doc, &self.markers, now);
    }

    /// Whether any scan work (queued nodes or a scheduled rescan) remains.
    pub fn has_pending_scans(&self) -> bool {
        !self.queue.is_empty() || self.rescan_at.is_some() || self.immediate_rescan_at.is_some()
    }

    /// Earliest instant at which `advance` has work to do.
    pub fn next_deadline(&self) -> Option<Duration> {
        let mut next = Some(self.nav_poll_at);
        for candidate in [
            self.queue.next_deadline(),
            self.gate.next_deadline(),
            self.rescan_at,
            self.immediate_rescan_at,
            self.overlay_sweep_at,
            self.pending_post.as_ref().map(|p| p.expires_at),
        ] {
            if let Some(at) = candidate {
                next = Some(next.map_or(at, |n| n.min(at)));
            }
        }
        next
    }

    // -------------------------------------------------------------------------
    // Scanning
    // -------------------------------------------------------------------------

    fn enqueue(&mut self, node: NodeId, now: Duration) {
        if self.processed.contains(&node) {
            return;
        }
        self.queue.enqueue(node, now);
    }

    fn collect_candidates(&self, doc: &Document) -> Vec<NodeId> {
        doc.descendants(doc.root())
            .filter(|&n| self.markers.is_scan_candidate(doc, n))
            .collect()
    }

    /// Throttled full rescan: re-queue every candidate and re-filter settled
    /// threads in place (their replies are not queue candidates).
    fn rescan_all(&mut self, doc: &mut Document, now: Duration) {
        self.queue.clear();
        for candidate in self.collect_candidates(doc) {
            self.enqueue(candidate, now);
        }

        let threads: Vec<NodeId> = doc
            .descendants(doc.root())
            .filter(|&n| {
                self.markers.is_thread_container(doc, n)
                    && gate::is_thread_filtered(doc, &self.markers, n)
            })
            .collect();
        for thread in threads {
            self.filter_thread_replies(doc, thread);
        }
    }

    /// Synchronous rescan used at startup and on SPA navigation. Per-node
    /// failures are logged and skipped.
    fn rescan_all_immediate(&mut self, doc: &mut Document) {
        for candidate in self.collect_candidates(doc) {
            if let Err(err) = self.process_node(doc, candidate) {
                log::error!("error processing node: {err}");
            }
        }
    }

    /// Classify one queued candidate: match, resolve its container, mark.
    /// The node counts as processed even on failure so it is never retried.
    fn process_node(&mut self, doc: &mut Document, node: NodeId) -> Result<(), FilterError> {
        if self.processed.contains(&node) {
            return Ok(());
        }
        self.processed.insert(node);

        if !doc.is_attached(node) {
            return Err(FilterError::NodeDetached(node));
        }

        if matcher::is_blocked(doc, node, &self.config) {
            let container = locate_container(doc, node, &self.markers);
            gate::mark_hidden(doc, &self.markers, container);
        }
        Ok(())
    }

    /// Immediate classification of a reply that arrived after its thread's
    /// batch pass. The reply itself is the container.
    fn classify_reply_now(&mut self, doc: &mut Document, node: NodeId) {
        if self.processed.contains(&node) {
            return;
        }
        self.processed.insert(node);
        if matcher::is_blocked(doc, node, &self.config) {
            gate::mark_hidden(doc, &self.markers, node);
        }
    }

    fn process_batch(&mut self, doc: &mut Document) {
        let started = self.clock.now();
        let batch = self.queue.take_batch(started);
        for node in batch {
            if let Err(err) = self.process_node(doc, node) {
                log::error!("error processing node: {err}");
            }
        }

        let elapsed = self.clock.now().saturating_sub(started);
        if elapsed > self.config.watchdog_threshold {
            log::warn!(
                "batch pass took {}ms, over the {}ms threshold",
                elapsed.as_millis(),
                self.config.watchdog_threshold.as_millis()
            );
            if self.config.watchdog_auto_disable {
                self.watchdog_disable(doc);
            }
        }
    }

    /// Circuit breaker: disable filtering, abandon queued work, unhide
    /// everything, and persist the disable.
    fn watchdog_disable(&mut self, doc: &mut Document) {
        self.config.enabled = false;
        self.queue.clear();
        self.rescan_at = None;
        gate::clear_all_hidden(doc, &self.markers);
        if let Err(err) = self.store.set(config::KEY_ENABLED, Value::Bool(false)) {
            log::error!("failed to persist watchdog disable: {err}");
        }
        log::warn!("filtering auto-disabled by watchdog");
    }

    // -------------------------------------------------------------------------
    // Thread reveal
    // -------------------------------------------------------------------------

    /// Classify a thread's replies while the page still hides them, then set
    /// the filtered flag that lets the page show the thread. Idempotent.
    fn process_and_reveal_thread(&mut self, doc: &mut Document, thread: NodeId) {
        if gate::is_thread_filtered(doc, &self.markers, thread) {
            return;
        }

        self.filter_thread_replies(doc, thread);
        gate::set_thread_filtered(doc, &self.markers, thread);

        // Cosmetic overlay, removed on the next frame tick.
        let overlay = doc.create_element("div");
        doc.add_class(overlay, &self.markers.overlay_class);
        doc.append_child(thread, overlay);
        self.overlays.push(overlay);
        self.overlay_sweep_at = Some(self.clock.now());
    }

    /// One full pass over a single thread's replies, not the whole document.
    fn filter_thread_replies(&mut self, doc: &mut Document, thread: NodeId) {
        if !self.config.enabled || self.config.blocklist.is_empty() {
            return;
        }

        let replies: Vec<NodeId> = doc
            .descendants(thread)
            .filter(|&n| self.markers.is_reply(doc, n))
            .collect();
        for reply in replies {
            if self.processed.contains(&reply) {
                continue;
            }
            if matcher::is_blocked(doc, reply, &self.config) {
                gate::mark_hidden(doc, &self.markers, reply);
            }
            self.processed.insert(reply);
        }
    }
}
