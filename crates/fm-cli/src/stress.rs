//! `fm-cli stress`: synthesize a feed, push it through the scan queue as one
//! mutation burst, and time the batch passes.

use std::thread;
use std::time::{Duration, Instant};

use fm_core::{queue, Clock, Engine, MemoryStore, SystemClock};
use fm_dom::Document;
use serde_json::json;

const BLOCKED_USER: &str = "spammer";

pub fn cmd_stress(posts: usize, blocked_every: usize, watchdog: bool) -> Result<(), String> {
    if posts == 0 {
        return Err("Post count must be positive".to_string());
    }

    let store = MemoryStore::with_values([
        ("blacklist".to_string(), json!([BLOCKED_USER])),
        ("watchdogAutoDisable".to_string(), json!(watchdog)),
    ]);

    let clock = SystemClock::new();
    let mut engine = Engine::new(Box::new(store), clock.clone());
    let mut doc = Document::new("https://social.example/feed");
    engine.start(&mut doc);
    doc.take_mutations();

    let mut expected_blocked = 0usize;
    for index in 0..posts {
        let post = doc.create_element("div");
        doc.add_class(post, "post");
        doc.set_attr(post, "data-post-id", &index.to_string());
        let blocked = blocked_every > 0 && index % blocked_every == 0;
        if blocked {
            doc.set_text(post, &format!("post {index}: you won, see @{BLOCKED_USER}"));
            expected_blocked += 1;
        } else {
            doc.set_text(post, &format!("post {index}: nothing to see"));
        }
        doc.append_child(doc.root(), post);
    }

    let records = doc.take_mutations();
    let delivery = Instant::now();
    engine.handle_mutations(&mut doc, &records);
    let delivery_time = delivery.elapsed();

    // Real time, so the watchdog sees genuine batch durations.
    let mut batches = 0usize;
    let mut total = Duration::ZERO;
    let mut worst = Duration::ZERO;
    while engine.has_pending_scans() {
        if let Some(at) = engine.next_deadline() {
            let now = clock.now();
            if at > now {
                thread::sleep(at - now);
            }
        }
        let pass = Instant::now();
        engine.advance(&mut doc);
        let elapsed = pass.elapsed();
        total += elapsed;
        worst = worst.max(elapsed);
        batches += 1;
    }

    let hidden = doc
        .descendants(doc.root())
        .filter(|&n| doc.has_class(n, &engine.markers().hidden_class))
        .count();

    println!("Stress run: {posts} posts, 1 in {blocked_every} blocked");
    println!("  Delivery:   {:.2}ms", delivery_time.as_secs_f64() * 1000.0);
    println!("  Batches:    {batches} (cap {} nodes)", queue::BATCH_SIZE);
    println!(
        "  Scan time:  {:.2}ms total, {:.3}ms worst pass",
        total.as_secs_f64() * 1000.0,
        worst.as_secs_f64() * 1000.0
    );
    println!("  Hidden:     {hidden} (expected {expected_blocked})");
    println!(
        "  Watchdog:   {}",
        if !engine.config().enabled {
            "tripped (filtering disabled)"
        } else if watchdog {
            "armed, not tripped"
        } else {
            "off"
        }
    );

    Ok(())
}
