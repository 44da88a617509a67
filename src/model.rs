//! Core vocabulary shared by every pipeline stage.
//!
//! [`SlideRole`] is the structural purpose of a slide. [`PurposeTag`] is the
//! closed set of free-text purposes seen in legacy layout records and in the
//! Extractor's topic tags; [`PurposeTag::role`] is the single place where a
//! purpose becomes a role.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a layout inside a template registry.
pub type LayoutId = u32;

/// Identifier of a placeholder shape inside a layout.
pub type PlaceholderId = u32;

// ── SlideRole ────────────────────────────────────────────────────────────

/// Structural role of a slide.
///
/// Serialised as `"TITLE"`, `"AGENDA"`, … Parsing is case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum SlideRole {
    Title,
    Agenda,
    Content,
    Diagram,
    Timeline,
    Closing,
}

impl SlideRole {
    /// Every role, in deck order.
    pub const ALL: [SlideRole; 6] = [
        SlideRole::Title,
        SlideRole::Agenda,
        SlideRole::Content,
        SlideRole::Diagram,
        SlideRole::Timeline,
        SlideRole::Closing,
    ];

    /// The upper-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SlideRole::Title => "TITLE",
            SlideRole::Agenda => "AGENDA",
            SlideRole::Content => "CONTENT",
            SlideRole::Diagram => "DIAGRAM",
            SlideRole::Timeline => "TIMELINE",
            SlideRole::Closing => "CLOSING",
        }
    }

    /// TITLE and AGENDA are pinned to positions 1 and 2 of every deck.
    pub fn is_reserved(&self) -> bool {
        matches!(self, SlideRole::Title | SlideRole::Agenda)
    }

    /// Roles that carry topic content (everything after the agenda).
    pub fn is_body(&self) -> bool {
        !self.is_reserved()
    }
}

impl fmt::Display for SlideRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlideRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        SlideRole::ALL
            .into_iter()
            .find(|r| r.as_str() == upper)
            .ok_or_else(|| format!("unknown slide role '{}'", s.trim()))
    }
}

impl TryFrom<String> for SlideRole {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ── PurposeTag ───────────────────────────────────────────────────────────

/// Closed set of purpose tags.
///
/// Legacy layout records carry a free-text `layout_purpose` such as
/// `"COMPARISON_SLIDE"`; topics in a content map carry short tags such as
/// `"process"`. Both funnel through [`PurposeTag::parse`], which never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
pub enum PurposeTag {
    TitleSlide,
    AgendaSlide,
    ContentSlide,
    VisualSlide,
    ComparisonSlide,
    DataSlide,
    StructureSlide,
    ProcessSlide,
    TimelineSlide,
    ClosingSlide,
    #[default]
    GeneralContent,
}

impl PurposeTag {
    /// Total parse: case-insensitive, `-`/space tolerant, optional `_SLIDE`
    /// suffix, short synonyms accepted. Anything else is `GeneralContent`.
    pub fn parse(raw: &str) -> PurposeTag {
        let norm: String = raw
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        let base = norm.strip_suffix("_slide").unwrap_or(&norm);

        match base {
            "title" | "opening" | "cover" => PurposeTag::TitleSlide,
            "agenda" | "overview" | "outline" => PurposeTag::AgendaSlide,
            "content" | "narrative" | "text" | "bullets" => PurposeTag::ContentSlide,
            "visual" | "image" | "picture" => PurposeTag::VisualSlide,
            "comparison" | "compare" | "versus" | "contrast" => PurposeTag::ComparisonSlide,
            "data" | "metrics" | "statistics" | "numbers" | "chart" => PurposeTag::DataSlide,
            "structure" | "architecture" | "components" | "diagram" => PurposeTag::StructureSlide,
            "process" | "workflow" | "steps" | "how_it_works" => PurposeTag::ProcessSlide,
            "timeline" | "roadmap" | "schedule" | "milestones" => PurposeTag::TimelineSlide,
            "closing" | "summary" | "conclusion" | "takeaways" | "next_steps" => {
                PurposeTag::ClosingSlide
            }
            _ => PurposeTag::GeneralContent,
        }
    }

    /// The purpose → role mapping table.
    pub fn role(&self) -> SlideRole {
        match self {
            PurposeTag::TitleSlide => SlideRole::Title,
            PurposeTag::AgendaSlide => SlideRole::Agenda,
            PurposeTag::ComparisonSlide | PurposeTag::DataSlide | PurposeTag::StructureSlide => {
                SlideRole::Diagram
            }
            PurposeTag::ProcessSlide | PurposeTag::TimelineSlide => SlideRole::Timeline,
            PurposeTag::ClosingSlide => SlideRole::Closing,
            PurposeTag::ContentSlide | PurposeTag::VisualSlide | PurposeTag::GeneralContent => {
                SlideRole::Content
            }
        }
    }

    /// Canonical purpose for a role; `PurposeTag::for_role(r).role() == r`.
    pub fn for_role(role: SlideRole) -> PurposeTag {
        match role {
            SlideRole::Title => PurposeTag::TitleSlide,
            SlideRole::Agenda => PurposeTag::AgendaSlide,
            SlideRole::Content => PurposeTag::ContentSlide,
            SlideRole::Diagram => PurposeTag::StructureSlide,
            SlideRole::Timeline => PurposeTag::TimelineSlide,
            SlideRole::Closing => PurposeTag::ClosingSlide,
        }
    }
}

impl From<String> for PurposeTag {
    fn from(value: String) -> Self {
        PurposeTag::parse(&value)
    }
}

// ── Content map ──────────────────────────────────────────────────────────

/// One topic of the condensed input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    #[serde(default)]
    pub purpose: PurposeTag,
    #[serde(default)]
    pub facts: Vec<String>,
}

/// The Extractor's output: topic → key facts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentMap {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub topics: Vec<Topic>,
}

impl ContentMap {
    /// Drop blank facts and topics left without any.
    pub fn normalised(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.summary = self.summary.trim().to_string();
        for topic in &mut self.topics {
            topic.name = topic.name.trim().to_string();
            topic.facts = topic
                .facts
                .iter()
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect();
        }
        self.topics
            .retain(|t| !t.facts.is_empty() && !t.name.is_empty());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn fact_count(&self) -> usize {
        self.topics.iter().map(|t| t.facts.len()).sum()
    }
}

// ── Slide plan ───────────────────────────────────────────────────────────

/// One desired slide, before any text is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlidePlan {
    pub role: SlideRole,
    pub intent: String,
    pub layout_id: LayoutId,
    /// Topic the slide was planned from; `None` for TITLE and AGENDA.
    #[serde(default)]
    pub topic: Option<String>,
    /// Facts the Writer may draw from.
    #[serde(default)]
    pub facts: Vec<String>,
}
