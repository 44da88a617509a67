//! Extractor: condense raw text into a [`ContentMap`].
//!
//! The only decision made locally is the length gate: input below
//! `min_input_words` is rejected before any service call, since no prompt
//! can make a deck out of a sentence.

use crate::error::{DeckError, ExtractionError};
use crate::model::ContentMap;
use crate::pipeline::llm::{decode_json, ServiceClient};
use crate::pipeline::Stage;
use crate::prompts::EXTRACTOR_SYSTEM_PROMPT;
use tracing::{debug, info};

/// Count whitespace-separated words that contain a letter or digit.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace()
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .count()
}

/// Reject inputs below the configured minimum.
pub fn check_length(text: &str, min_words: usize) -> Result<usize, ExtractionError> {
    let words = count_words(text);
    if words < min_words {
        return Err(ExtractionError::InputTooShort {
            words,
            min: min_words,
        });
    }
    Ok(words)
}

/// Run the Extractor.
///
/// A response that does not decode, or decodes to a map with no usable
/// topic, is [`ExtractionError::Unparseable`].
pub async fn extract(text: &str, client: &ServiceClient<'_>) -> Result<ContentMap, DeckError> {
    let config = client.config();
    let words = check_length(text, config.min_input_words)?;
    info!("Extracting content map from {} words", words);

    let system = config
        .extractor_prompt
        .as_deref()
        .unwrap_or(EXTRACTOR_SYSTEM_PROMPT);
    let raw = client
        .call(Stage::Extract, system, text.trim(), config.temperature)
        .await?;

    let map: ContentMap = decode_json(&raw)
        .map_err(|detail| ExtractionError::Unparseable { detail })?;
    let mut map = map.normalised();

    if map.is_empty() {
        return Err(ExtractionError::Unparseable {
            detail: "content map has no topic with facts".into(),
        }
        .into());
    }
    if map.title.is_empty() {
        map.title = map.topics[0].name.clone();
    }

    debug!(
        "Content map: '{}', {} topics, {} facts",
        map.title,
        map.topics.len(),
        map.fact_count()
    );
    Ok(map)
}
