//! Error types for the deckwright library.
//!
//! Two distinct families reflect two distinct failure modes:
//!
//! * [`DeckError`] — **Fatal**: the deck cannot be produced at all (input
//!   too short, no usable layouts, a manifest that does not fit its layout,
//!   a service that keeps failing). Returned as `Err(DeckError)` from the
//!   top-level `generate*` functions. A request never yields a partial deck.
//!
//! * [`DensityViolation`] — **Non-fatal**: the Writer had to trim content to
//!   keep a slide within its word budget. Recorded in
//!   [`crate::output::DeckOutput::density_violations`] so callers can audit
//!   how much the model over-wrote, but never surfaced as an error.

use crate::model::{LayoutId, SlideRole};
use crate::pipeline::Stage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the deckwright library.
#[derive(Debug, Error)]
pub enum DeckError {
    // ── Stage errors ──────────────────────────────────────────────────────
    /// The input text could not be turned into a content map.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// The content map could not be planned onto the template.
    #[error(transparent)]
    Planning(#[from] PlanningError),

    /// The finished manifest does not fit the template's placeholders.
    #[error(transparent)]
    Injection(#[from] InjectionError),

    // ── Service errors ────────────────────────────────────────────────────
    /// A generative-text call kept failing after its automatic retry.
    #[error("{stage} stage failed after {attempts} attempt(s): {detail}")]
    GenerationFailed {
        stage: Stage,
        attempts: u32,
        detail: String,
    },

    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Registry errors ───────────────────────────────────────────────────
    /// No indexed registry exists for the requested template.
    #[error("No layout registry for template '{template}'\nIndex the template first, then retry.")]
    TemplateNotFound { template: String },

    /// A registry file exists but could not be read or parsed.
    #[error("Failed to load layout registry '{path}': {detail}")]
    RegistryLoad { path: PathBuf, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output deck file.
    #[error("Failed to write deck file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The request was cancelled between two stages.
    #[error("Generation cancelled after the {after} stage")]
    Cancelled { after: Stage },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The Extractor could not produce a content map. User-correctable; never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    /// Fewer words than the configured minimum.
    #[error("Input is too short: {words} words, at least {min} required")]
    InputTooShort { words: usize, min: usize },

    /// The input file does not exist or cannot be read.
    #[error("Cannot read input file '{path}': {detail}")]
    Unreadable { path: PathBuf, detail: String },

    /// The input file has an extension the extractor does not understand.
    #[error("Unsupported input format '{extension}'. Supported: .txt, .md, .docx, .pptx")]
    UnsupportedFormat { extension: String },

    /// The service answered, but not with a usable content map.
    #[error("Content map could not be parsed: {detail}")]
    Unparseable { detail: String },
}

/// The Architect could not build a valid slide plan. Fatal to the request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlanningError {
    /// TITLE and AGENDA need two layouts at minimum.
    #[error("Template provides {available} layout(s); at least 2 are required")]
    InsufficientLayouts { available: usize },

    /// Nothing survived extraction.
    #[error("Content map is empty; nothing to plan")]
    EmptyContent,

    /// Every layout is reserved for TITLE/AGENDA, so a body slide has nowhere to go.
    #[error("No layout can host a {role} slide")]
    NoCompatibleLayout { role: SlideRole },

    /// The plan failed its own post-condition check.
    #[error("Slide plan is invalid: {0}")]
    InvalidPlan(String),
}

/// The manifest and the template disagree. Fatal; no partial output is written.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InjectionError {
    /// More slots than the layout has placeholder shapes.
    #[error("Slide {slide}: manifest has {slots} slots but layout {layout_id} only has {shapes} shapes")]
    SlotOverflow {
        slide: usize,
        layout_id: LayoutId,
        slots: usize,
        shapes: usize,
    },

    /// A slot references a placeholder that the layout does not define.
    #[error("Slide {slide}: placeholder {placeholder_id} does not exist in layout {layout_id}")]
    UnknownPlaceholder {
        slide: usize,
        layout_id: LayoutId,
        placeholder_id: u32,
    },

    /// The manifest references a layout the template does not have.
    #[error("Slide {slide}: layout {layout_id} is not in the template registry")]
    UnknownLayout { slide: usize, layout_id: LayoutId },
}

/// A non-fatal density correction applied by the Writer.
///
/// Stored alongside the finished deck; the slide itself was trimmed to fit.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum DensityViolation {
    /// More items than the role allows; the trailing ones were dropped.
    #[error("Slide {slide}: {found} items exceed the {role} limit of {max}")]
    TooManyItems {
        slide: usize,
        role: SlideRole,
        found: usize,
        max: usize,
    },

    /// Fewer items than the role requires.
    #[error("Slide {slide}: {found} items are below the {role} minimum of {min}")]
    TooFewItems {
        slide: usize,
        role: SlideRole,
        found: usize,
        min: usize,
    },

    /// A text field exceeded its word ceiling and was cut.
    #[error("Slide {slide}: '{field}' has {words} words, ceiling is {max}")]
    TooManyWords {
        slide: usize,
        field: String,
        words: usize,
        max: usize,
    },

    /// A text field was below its strict word floor and was dropped.
    #[error("Slide {slide}: '{field}' has {words} words, floor is {min}")]
    TooFewWords {
        slide: usize,
        field: String,
        words: usize,
        min: usize,
    },

    /// Copy the layout has no placeholder for; it is missing from the slide.
    #[error("Slide {slide}: layout {layout_id} has no body placeholder for {items} items")]
    ItemsNotPlaced {
        slide: usize,
        layout_id: LayoutId,
        items: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_error_wraps_transparently() {
        let e: DeckError = ExtractionError::InputTooShort { words: 3, min: 20 }.into();
        let msg = e.to_string();
        assert!(msg.contains("3 words"), "got: {msg}");
        assert!(msg.contains("20"), "got: {msg}");
    }

    #[test]
    fn slot_overflow_display() {
        let e = InjectionError::SlotOverflow {
            slide: 4,
            layout_id: 7,
            slots: 6,
            shapes: 5,
        };
        let msg = e.to_string();
        assert!(msg.contains("6 slots"));
        assert!(msg.contains("5 shapes"));
    }

    #[test]
    fn generation_failed_names_stage() {
        let e = DeckError::GenerationFailed {
            stage: Stage::Writer,
            attempts: 2,
            detail: "timeout".into(),
        };
        assert!(e.to_string().starts_with("writer stage"));
    }

    #[test]
    fn density_violation_round_trips_through_json() {
        let v = DensityViolation::TooManyItems {
            slide: 3,
            role: SlideRole::Content,
            found: 7,
            max: 5,
        };
        let json = serde_json::to_string(&v).unwrap();
        let back: DensityViolation = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
        assert!(v.to_string().contains("CONTENT"));
    }
}
