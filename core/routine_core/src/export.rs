use crate::{
    analytics::{self, Summary},
    catalog::Catalog,
    date_key::DateKey,
    log::{CompletionLog, ReflectionLog},
};
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("serialize export: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument<'a> {
    pub history: &'a CompletionLog,
    pub reflections: &'a ReflectionLog,
    pub exported_at: String,
    pub summary: Summary,
}

impl<'a> ExportDocument<'a> {
    /// Snapshot of both logs taken at `now` (local time with offset).
    pub fn build(
        catalog: &Catalog,
        history: &'a CompletionLog,
        reflections: &'a ReflectionLog,
        now: DateTime<FixedOffset>,
    ) -> Self {
        let today = DateKey::from_local(now.naive_local());
        Self {
            history,
            reflections,
            exported_at: now
                .with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            summary: analytics::summary(catalog, history, today),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

pub fn backup_file_name(today: DateKey) -> String {
    format!("routine-backup-{today}.json")
}

/// Writes the document into `dir` and returns the file path.
pub fn write_backup(
    dir: &Path,
    today: DateKey,
    doc: &ExportDocument<'_>,
) -> Result<PathBuf, ExportError> {
    let json = doc.to_json_pretty()?;
    let path = dir.join(backup_file_name(today));
    std::fs::create_dir_all(dir).map_err(|source| ExportError::Write {
        path: dir.to_path_buf(),
        source,
    })?;
    std::fs::write(&path, json).map_err(|source| ExportError::Write {
        path: path.clone(),
        source,
    })?;
    info!("exported {}", path.display());
    Ok(path)
}
