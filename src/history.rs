//! Listing of previously generated deck artifacts.

use crate::error::DeckError;
use crate::render::{parse_artifact_timestamp, ARTIFACT_PREFIX};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// One artifact in an output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub filename: String,
    pub created: DateTime<Utc>,
    /// Size in bytes.
    pub size: u64,
}

/// Deck artifacts in `dir`, newest first.
///
/// The creation time comes from the timestamp in the file name, falling back
/// to the file's modification time. A missing directory is an empty history.
pub async fn history(dir: impl AsRef<Path>) -> Result<Vec<HistoryEntry>, DeckError> {
    let dir = dir.as_ref();
    let read_err = |e: std::io::Error| {
        DeckError::Internal(format!("Failed to read history in {}: {}", dir.display(), e))
    };

    let mut reader = match tokio::fs::read_dir(dir).await {
        Ok(r) => r,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(read_err(e)),
    };

    let mut entries = Vec::new();
    while let Some(item) = reader.next_entry().await.map_err(read_err)? {
        let filename = item.file_name().to_string_lossy().into_owned();
        if !filename.starts_with(ARTIFACT_PREFIX) || filename.ends_with(".tmp") {
            continue;
        }
        let meta = item.metadata().await.map_err(read_err)?;
        if !meta.is_file() {
            continue;
        }
        let created = parse_artifact_timestamp(&filename)
            .or_else(|| meta.modified().ok().map(DateTime::<Utc>::from))
            .unwrap_or_default();
        entries.push(HistoryEntry {
            filename,
            created,
            size: meta.len(),
        });
    }

    entries.sort_by(|a, b| {
        b.created
            .cmp(&a.created)
            .then_with(|| b.filename.cmp(&a.filename))
    });
    debug!("{} artifacts in {}", entries.len(), dir.display());
    Ok(entries)
}
