//! FeedMute Core Library
//!
//! The incremental filtering pipeline: a mutation-driven scanner that hides
//! posts and replies authored by or mentioning blocked usernames before the
//! user sees them.
//!
//! # Architecture
//!
//! Everything runs single-threaded. The host (browser content script in the
//! real deployment, the test/CLI harness here) delivers mutation records,
//! clicks, and settings-change notifications to the [`Engine`], and calls
//! [`Engine::advance`] to fire due timers. There is no locking anywhere;
//! correctness rests on the absence of parallelism, and every "suspension"
//! is an explicit timer deadline dispatched by the run loop.
//!
//! # Modules
//!
//! - `config`: filter configuration, persisted keys, username normalization
//! - `store`: the settings store contract and change notifications
//! - `markers`: the versioned vocabulary of the host page's structure
//! - `matcher`: pure blocked/not-blocked predicate (text + profile links)
//! - `classify`: candidate node to hideable container resolution
//! - `queue`: throttled, batch-capped scan queue
//! - `gate`: pre-hide flag, fail-safe timer, hidden/filtered markers
//! - `engine`: mutation watcher and the single-threaded run loop
//! - `clock`: time source abstraction so tests drive the timers

pub mod classify;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod gate;
pub mod markers;
pub mod matcher;
pub mod queue;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{normalize_username, FilterConfig};
pub use engine::Engine;
pub use error::FilterError;
pub use markers::PageMarkers;
pub use store::{ChangeSet, KeyChange, MemoryStore, SettingsStore, StorageArea, StoreError};
