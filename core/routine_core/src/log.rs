use crate::date_key::DateKey;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Completed task ids per local date.
///
/// A date with no entry and a date with an empty entry mean the same thing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CompletionLog {
    days: BTreeMap<DateKey, BTreeSet<String>>,
}

impl CompletionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips `task_id` for `date` and returns whether it is now completed.
    /// Ids unknown to the catalog are stored as-is.
    pub fn toggle(&mut self, date: DateKey, task_id: &str) -> bool {
        let done = self.days.entry(date).or_default();
        if done.remove(task_id) {
            false
        } else {
            done.insert(task_id.to_string());
            true
        }
    }

    pub fn get(&self, date: DateKey) -> Option<&BTreeSet<String>> {
        self.days.get(&date)
    }

    pub fn is_done(&self, date: DateKey, task_id: &str) -> bool {
        self.days.get(&date).is_some_and(|d| d.contains(task_id))
    }

    /// Logged dates, oldest first, including ones left empty by a toggle-off.
    pub fn days(&self) -> impl Iterator<Item = (DateKey, &BTreeSet<String>)> + '_ {
        self.days.iter().map(|(k, v)| (*k, v))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Entries whose key is not a `YYYY-MM-DD` date are dropped; repeated ids
    /// within a day collapse.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let raw: BTreeMap<String, Vec<String>> = serde_json::from_str(json)?;
        let mut days = BTreeMap::new();
        let mut skipped = 0usize;
        for (k, ids) in raw {
            match DateKey::parse(&k) {
                Ok(date) => {
                    days.insert(date, ids.into_iter().collect::<BTreeSet<_>>());
                }
                Err(_) => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!("completion log: dropped {skipped} entries with invalid date keys");
        }
        Ok(Self { days })
    }
}

/// One free-text reflection per local date; a newer write replaces the old one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReflectionLog {
    entries: BTreeMap<DateKey, String>,
}

impl ReflectionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, date: DateKey, text: String) {
        self.entries.insert(date, text);
    }

    pub fn get(&self, date: DateKey) -> Option<&str> {
        self.entries.get(&date).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let raw: BTreeMap<String, String> = serde_json::from_str(json)?;
        let mut entries = BTreeMap::new();
        let mut skipped = 0usize;
        for (k, text) in raw {
            match DateKey::parse(&k) {
                Ok(date) => {
                    entries.insert(date, text);
                }
                Err(_) => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!("reflection log: dropped {skipped} entries with invalid date keys");
        }
        Ok(Self { entries })
    }
}
