//! Slide manifest: one slide's content as it flows through the back half of
//! the pipeline (Writer → Image Director → Beautifier → Injector).
//!
//! Fields are private. The Writer creates an entry with [`ManifestEntry::draft`];
//! every later stage returns a new entry through the one method that touches
//! only the fields that stage owns:
//!
//! | Stage | Method | Owns |
//! |-------|--------|------|
//! | Image Director | [`ManifestEntry::with_background`] | `background_image` |
//! | Beautifier | [`ManifestEntry::restyle`] | slot `font_size`, `alignment`, `vertical_anchor` |
//! | Injector | [`ManifestEntry::clear_slots`] | slot `text`, `cleared` |

use crate::model::{LayoutId, PlaceholderId, SlidePlan, SlideRole};
use crate::registry::{Alignment, ShapeKind, VerticalAnchor};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Declarative description of a wanted background image. Never resolved to bytes here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundImageSpec {
    pub enabled: bool,
    pub keywords: Vec<String>,
    pub mood: String,
    pub composition: String,
    /// Fraction in `[0.35, 0.60]` when enabled.
    pub overlay_opacity: f32,
}

impl BackgroundImageSpec {
    /// The spec attached to slides that get no background.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            keywords: Vec::new(),
            mood: String::new(),
            composition: String::new(),
            overlay_opacity: 0.0,
        }
    }
}

/// One placeholder's content inside a manifest entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub kind: ShapeKind,
    /// Markup text; `**bold**` and `*italic*` spans, one paragraph per line.
    pub text: String,
    pub font_size: Option<u16>,
    pub alignment: Option<Alignment>,
    #[serde(default)]
    pub vertical_anchor: Option<VerticalAnchor>,
    /// Set once the Injector has filtered this slot as boilerplate.
    pub cleared: bool,
}

impl Slot {
    pub fn new(kind: ShapeKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            font_size: None,
            alignment: None,
            vertical_anchor: None,
            cleared: false,
        }
    }

    pub fn style(&self) -> SlotStyle {
        SlotStyle {
            font_size: self.font_size,
            alignment: self.alignment,
            vertical_anchor: self.vertical_anchor,
        }
    }
}

/// The presentation fields the Beautifier sets on a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotStyle {
    pub font_size: Option<u16>,
    pub alignment: Option<Alignment>,
    pub vertical_anchor: Option<VerticalAnchor>,
}

/// One slide's finished content, keyed by placeholder id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    slide_index: usize,
    layout_id: LayoutId,
    slide_role: SlideRole,
    intent: String,
    slots: BTreeMap<PlaceholderId, Slot>,
    background_image: Option<BackgroundImageSpec>,
}

impl ManifestEntry {
    /// Writer output: role, layout and intent copied from the plan.
    pub fn draft(
        slide_index: usize,
        plan: &SlidePlan,
        slots: BTreeMap<PlaceholderId, Slot>,
    ) -> Self {
        Self {
            slide_index,
            layout_id: plan.layout_id,
            slide_role: plan.role,
            intent: plan.intent.clone(),
            slots,
            background_image: None,
        }
    }

    /// 1-based position in the deck.
    pub fn slide_index(&self) -> usize {
        self.slide_index
    }

    pub fn layout_id(&self) -> LayoutId {
        self.layout_id
    }

    pub fn slide_role(&self) -> SlideRole {
        self.slide_role
    }

    pub fn intent(&self) -> &str {
        &self.intent
    }

    pub fn slots(&self) -> &BTreeMap<PlaceholderId, Slot> {
        &self.slots
    }

    pub fn slot(&self, id: PlaceholderId) -> Option<&Slot> {
        self.slots.get(&id)
    }

    pub fn background_image(&self) -> Option<&BackgroundImageSpec> {
        self.background_image.as_ref()
    }

    /// Image Director: attach the background spec.
    pub fn with_background(self, spec: BackgroundImageSpec) -> Self {
        Self {
            background_image: Some(spec),
            ..self
        }
    }

    /// Beautifier: set the [`SlotStyle`] of every slot.
    pub fn restyle<F>(self, mut style: F) -> Self
    where
        F: FnMut(PlaceholderId, &Slot) -> SlotStyle,
    {
        let slots = self
            .slots
            .into_iter()
            .map(|(id, slot)| {
                let SlotStyle {
                    font_size,
                    alignment,
                    vertical_anchor,
                } = style(id, &slot);
                (
                    id,
                    Slot {
                        font_size,
                        alignment,
                        vertical_anchor,
                        ..slot
                    },
                )
            })
            .collect();
        Self { slots, ..self }
    }

    /// Injector: empty the listed slots. Cleared slots stay in the map.
    pub fn clear_slots(self, ids: &BTreeSet<PlaceholderId>) -> Self {
        let slots = self
            .slots
            .into_iter()
            .map(|(id, slot)| {
                if ids.contains(&id) {
                    (
                        id,
                        Slot {
                            text: String::new(),
                            cleared: true,
                            ..slot
                        },
                    )
                } else {
                    (id, slot)
                }
            })
            .collect();
        Self { slots, ..self }
    }
}
