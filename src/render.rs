//! Renderer boundary: encode a finished [`Deck`] into artifact bytes.
//!
//! The pipeline stops at a renderable deck description. Turning that into an
//! office file is the job of a [`DeckRenderer`] supplied through
//! [`crate::config::GenerationConfigBuilder::renderer`]; the built-in
//! [`JsonDeckRenderer`] writes the description itself as pretty JSON.

use crate::error::DeckError;
use crate::output::Deck;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// Prefix shared by every artifact file name.
pub const ARTIFACT_PREFIX: &str = "deck_";

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Encodes a deck for [`crate::generate_to_file`].
pub trait DeckRenderer: Send + Sync {
    fn render(&self, deck: &Deck) -> Result<Vec<u8>, DeckError>;

    /// File extension without the leading dot, e.g. `"deck.json"`.
    fn extension(&self) -> &str;
}

/// Pretty-printed JSON of the [`Deck`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDeckRenderer;

impl DeckRenderer for JsonDeckRenderer {
    fn render(&self, deck: &Deck) -> Result<Vec<u8>, DeckError> {
        let mut bytes = serde_json::to_vec_pretty(deck)
            .map_err(|e| DeckError::Internal(format!("deck serialisation failed: {e}")))?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    fn extension(&self) -> &str {
        "deck.json"
    }
}

/// `deck_YYYYmmdd_HHMMSS.<extension>`, timestamped in UTC.
pub fn artifact_filename<Tz: TimeZone>(at: &DateTime<Tz>, extension: &str) -> String {
    format!(
        "{}{}.{}",
        ARTIFACT_PREFIX,
        at.with_timezone(&Utc).format(TIMESTAMP_FORMAT),
        extension.trim_start_matches('.')
    )
}

/// Timestamp encoded in an artifact file name, if it has one.
pub fn parse_artifact_timestamp(filename: &str) -> Option<DateTime<Utc>> {
    let stamp = filename.strip_prefix(ARTIFACT_PREFIX)?.get(..15)?;
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
