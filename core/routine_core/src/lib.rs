//! Daily routine tracker: a fixed task catalog, a per-day completion log,
//! derived analytics and best-effort AI summaries.

pub mod analytics;
pub mod catalog;
pub mod date_key;
pub mod export;
pub mod log;
pub mod shell;
pub mod store;
pub mod summarizer;
pub mod tracker;

pub use catalog::{Catalog, Category, RoutineItem, TimeOfDay};
pub use date_key::{Clock, DateKey, FixedClock, SystemClock};
pub use log::{CompletionLog, ReflectionLog};
pub use store::{KeyValueStore, MemoryStore, SqliteStore, StoreError, WriteStatus};
pub use tracker::{ToggleOutcome, Tracker};
