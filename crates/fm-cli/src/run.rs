//! `fm-cli run`: filter a fixture page and report hidden containers.

use std::fs;
use std::thread;

use fm_core::{Clock, Engine, MemoryStore, SystemClock};
use fm_dom::fixture::{append_fixture, build_document};
use fm_dom::{Document, FixtureNode, NodeId, PageFixture};

pub fn cmd_run(
    page: &str,
    config: Option<&str>,
    mutations: Option<&str>,
    verbose: bool,
) -> Result<(), String> {
    let fixture = load_page(page)?;
    let mut doc = build_document(&fixture);

    let store = match config {
        Some(path) => load_store(path)?,
        None => MemoryStore::new(),
    };

    let clock = SystemClock::new();
    let mut engine = Engine::new(Box::new(store), clock.clone());
    engine.start(&mut doc);

    if let Some(path) = mutations {
        let burst = load_mutations(path)?;
        let root = doc.root();
        for node in &burst {
            append_fixture(&mut doc, root, node);
        }
        let records = doc.take_mutations();
        engine.handle_mutations(&mut doc, &records);

        // Let the throttle drain; each pass handles one batch.
        while engine.has_pending_scans() {
            if let Some(at) = engine.next_deadline() {
                let now = clock.now();
                if at > now {
                    thread::sleep(at - now);
                }
            }
            engine.advance(&mut doc);
        }
    }

    report(&engine, &doc, verbose);
    Ok(())
}

fn load_page(path: &str) -> Result<PageFixture, String> {
    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read '{path}': {e}"))?;
    serde_json::from_str(&content).map_err(|e| format!("Invalid page fixture '{path}': {e}"))
}

fn load_mutations(path: &str) -> Result<Vec<FixtureNode>, String> {
    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read '{path}': {e}"))?;
    serde_json::from_str(&content).map_err(|e| format!("Invalid mutation fixture '{path}': {e}"))
}

fn load_store(path: &str) -> Result<MemoryStore, String> {
    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read '{path}': {e}"))?;
    let value: serde_json::Value =
        serde_json::from_str(&content).map_err(|e| format!("Invalid settings '{path}': {e}"))?;
    let object = value
        .as_object()
        .ok_or_else(|| format!("Settings '{path}' must be a JSON object"))?;
    Ok(MemoryStore::with_values(
        object.iter().map(|(k, v)| (k.clone(), v.clone())),
    ))
}

fn report(engine: &Engine, doc: &Document, verbose: bool) {
    let hidden: Vec<NodeId> = doc
        .descendants(doc.root())
        .filter(|&n| doc.has_class(n, &engine.markers().hidden_class))
        .collect();

    println!("Filtered '{}'", doc.url());
    println!("  Blocklist: {:?}", engine.config().blocklist);
    println!(
        "  Mode:      {}",
        if engine.config().fuzzy_match {
            "fuzzy"
        } else {
            "exact"
        }
    );
    println!("  Elements:  {}", doc.len());
    println!("  Hidden:    {}", hidden.len());

    if verbose {
        for node in hidden {
            let element = doc.node(node);
            let label = element
                .element_id
                .as_deref()
                .or_else(|| element.attr("data-post-id"))
                .unwrap_or("-");
            println!(
                "    <{}> id={} \"{}\"",
                element.tag,
                label,
                snippet(&doc.text_content(node))
            );
        }
    }
}

fn snippet(text: &str) -> String {
    const MAX: usize = 60;
    let trimmed = text.trim();
    if trimmed.len() <= MAX {
        trimmed.to_string()
    } else {
        let cut = trimmed
            .char_indices()
            .take_while(|(i, _)| *i < MAX)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}...", &trimmed[..cut])
    }
}
