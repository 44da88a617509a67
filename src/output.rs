//! Output types: the renderable deck and per-request statistics.

use crate::error::DensityViolation;
use crate::model::{LayoutId, PlaceholderId, SlideRole};
use crate::pipeline::Stage;
use crate::registry::{Alignment, ShapeKind, VerticalAnchor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A run of uniformly formatted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub italic: bool,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: false,
        }
    }
}

/// One line of a placeholder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    pub runs: Vec<TextRun>,
}

impl Paragraph {
    /// Concatenated run text without markup.
    pub fn plain_text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// A placeholder with its final text, size and alignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedPlaceholder {
    pub placeholder_id: PlaceholderId,
    pub kind: ShapeKind,
    pub paragraphs: Vec<Paragraph>,
    pub font_size: Option<u16>,
    pub alignment: Alignment,
    /// `None` keeps the template's anchoring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical_anchor: Option<VerticalAnchor>,
    /// Template boilerplate that was filtered out; always empty.
    pub cleared: bool,
}

impl RenderedPlaceholder {
    pub fn plain_text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::plain_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A slide ready for a renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedSlide {
    /// 1-based.
    pub slide_index: usize,
    pub layout_id: LayoutId,
    pub role: SlideRole,
    pub placeholders: Vec<RenderedPlaceholder>,
    /// Non-visual annex; holds the background image spec when one is enabled.
    pub notes: Option<String>,
}

impl RenderedSlide {
    pub fn placeholder(&self, id: PlaceholderId) -> Option<&RenderedPlaceholder> {
        self.placeholders.iter().find(|p| p.placeholder_id == id)
    }
}

/// The finished deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub template_id: String,
    pub title: String,
    pub slides: Vec<RenderedSlide>,
}

impl Deck {
    pub fn roles(&self) -> Vec<SlideRole> {
        self.slides.iter().map(|s| s.role).collect()
    }
}

/// Per-request statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub slide_count: usize,
    pub stage_durations_ms: BTreeMap<Stage, u64>,
    pub total_duration_ms: u64,
    /// Generative-service calls that returned a response.
    pub service_calls: u32,
    /// Automatic retries after transient failures.
    pub retries: u32,
}

/// Result of [`crate::generate`].
#[derive(Debug, Clone)]
pub struct DeckOutput {
    pub deck: Deck,
    pub stats: GenerationStats,
    /// Density corrections the Writer applied. Informational.
    pub density_violations: Vec<DensityViolation>,
}

/// Result of [`crate::generate_to_file`].
#[derive(Debug, Clone)]
pub struct DeckArtifact {
    pub path: PathBuf,
    pub bytes: u64,
    pub output: DeckOutput,
}
