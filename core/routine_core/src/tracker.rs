use crate::{
    catalog::Catalog,
    date_key::DateKey,
    log::{CompletionLog, ReflectionLog},
    store::{
        load_or_default, write_through, KeyValueStore, WriteStatus, HISTORY_KEY,
        REFLECTIONS_KEY,
    },
};
use std::collections::BTreeSet;
use tracing::{debug, error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub completed: bool,
    pub write: WriteStatus,
}

/// Owns the catalog, both logs and the store they are written through to.
pub struct Tracker<S: KeyValueStore> {
    store: S,
    catalog: Catalog,
    history: CompletionLog,
    reflections: ReflectionLog,
}

impl<S: KeyValueStore> Tracker<S> {
    pub fn load(store: S, catalog: Catalog) -> Self {
        let history = load_or_default(&store, HISTORY_KEY, CompletionLog::from_json);
        let reflections = load_or_default(&store, REFLECTIONS_KEY, ReflectionLog::from_json);
        info!(
            "loaded {} logged days, {} reflections",
            history.days().count(),
            reflections.len()
        );
        Self {
            store,
            catalog,
            history,
            reflections,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn history(&self) -> &CompletionLog {
        &self.history
    }

    pub fn reflections(&self) -> &ReflectionLog {
        &self.reflections
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Completed ids for `date`; empty when nothing was logged.
    pub fn completed(&self, date: DateKey) -> BTreeSet<String> {
        self.history.get(date).cloned().unwrap_or_default()
    }

    pub fn reflection(&self, date: DateKey) -> Option<&str> {
        self.reflections.get(date)
    }

    pub fn toggle(&mut self, date: DateKey, task_id: &str) -> ToggleOutcome {
        let completed = self.history.toggle(date, task_id);
        debug!("toggle {date} {task_id} -> {completed}");
        let write = match self.history.to_json() {
            Ok(blob) => write_through(&mut self.store, HISTORY_KEY, &blob),
            Err(err) => {
                error!("serialize completion log failed: {err}");
                WriteStatus::Failed {
                    error: err.to_string(),
                }
            }
        };
        ToggleOutcome { completed, write }
    }

    pub fn save_reflection(&mut self, date: DateKey, text: String) -> WriteStatus {
        self.reflections.set(date, text);
        match self.reflections.to_json() {
            Ok(blob) => write_through(&mut self.store, REFLECTIONS_KEY, &blob),
            Err(err) => {
                error!("serialize reflection log failed: {err}");
                WriteStatus::Failed {
                    error: err.to_string(),
                }
            }
        }
    }
}
