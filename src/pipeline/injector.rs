//! Injector: bind the finished manifest to the template's placeholders.
//!
//! This is the last gate before anything is written. Every slide is checked
//! against its layout ([`InjectionError`] on any mismatch), boilerplate
//! placeholder text is cleared, emphasis markup becomes formatted runs and
//! enabled background specs go to the slide notes.

use crate::error::{DeckError, InjectionError};
use crate::manifest::{BackgroundImageSpec, ManifestEntry};
use crate::output::{Deck, RenderedPlaceholder, RenderedSlide};
use crate::pipeline::boilerplate::BoilerplateFilter;
use crate::pipeline::markup::{parse_runs, plain_text};
use crate::registry::{Alignment, LayoutMetadata, ShapeKind, TemplateRegistry};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Human-readable background annex written to the slide notes.
pub fn background_notes(spec: &BackgroundImageSpec) -> Option<String> {
    if !spec.enabled {
        return None;
    }
    Some(format!(
        "Background Image Specification:\n\
         - Keywords: {}\n\
         - Mood: {}\n\
         - Composition: {}\n\
         - Overlay Opacity: {}%\n\
         \n\
         Pending: image retrieval for the keywords above",
        spec.keywords.join(", "),
        spec.mood,
        spec.composition,
        (spec.overlay_opacity * 100.0).round() as u32
    ))
}

/// Placeholder binding with a compiled boilerplate filter.
#[derive(Debug, Clone, Default)]
pub struct Injector {
    filter: BoilerplateFilter,
}

impl Injector {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, DeckError> {
        let filter = BoilerplateFilter::new(patterns)
            .map_err(|e| DeckError::InvalidConfig(format!("boilerplate pattern: {e}")))?;
        Ok(Self { filter })
    }

    /// Check `entry` against `layout`.
    pub fn check(&self, entry: &ManifestEntry, layout: &LayoutMetadata) -> Result<(), InjectionError> {
        let slide = entry.slide_index();
        if entry.slots().len() > layout.shapes.len() {
            return Err(InjectionError::SlotOverflow {
                slide,
                layout_id: layout.layout_id,
                slots: entry.slots().len(),
                shapes: layout.shapes.len(),
            });
        }
        if let Some(&placeholder_id) = entry.slots().keys().find(|id| layout.shape(**id).is_none()) {
            return Err(InjectionError::UnknownPlaceholder {
                slide,
                layout_id: layout.layout_id,
                placeholder_id,
            });
        }
        Ok(())
    }

    /// Clear every slot whose shape's default text is boilerplate, and
    /// chrome slots whose own text is. Clearing a cleared slot changes nothing.
    pub fn filter_boilerplate(&self, entry: ManifestEntry, layout: &LayoutMetadata) -> ManifestEntry {
        let ids: BTreeSet<_> = entry
            .slots()
            .iter()
            .filter(|(_, slot)| !slot.cleared)
            .filter(|(id, slot)| {
                let default_text = layout
                    .shape(**id)
                    .and_then(|s| s.default_text.as_deref())
                    .unwrap_or("");
                (slot.kind.is_chrome() && self.filter.is_boilerplate(&slot.text))
                    || self.filter.is_boilerplate(default_text)
            })
            .map(|(id, _)| *id)
            .collect();
        if ids.is_empty() {
            return entry;
        }
        debug!(
            "Slide {}: clearing boilerplate in placeholders {:?}",
            entry.slide_index(),
            ids
        );
        entry.clear_slots(&ids)
    }

    /// Check, filter and render one slide.
    pub fn inject_slide(
        &self,
        entry: ManifestEntry,
        registry: &TemplateRegistry,
    ) -> Result<RenderedSlide, InjectionError> {
        let layout = registry
            .layout(entry.layout_id())
            .ok_or(InjectionError::UnknownLayout {
                slide: entry.slide_index(),
                layout_id: entry.layout_id(),
            })?;
        self.check(&entry, layout)?;
        let entry = self.filter_boilerplate(entry, layout);

        let placeholders = entry
            .slots()
            .iter()
            .map(|(&id, slot)| {
                let intrinsic = layout.shape(id).and_then(|s| s.alignment);
                RenderedPlaceholder {
                    placeholder_id: id,
                    kind: slot.kind,
                    paragraphs: parse_runs(&slot.text),
                    font_size: slot.font_size,
                    alignment: slot.alignment.or(intrinsic).unwrap_or(Alignment::Left),
                    vertical_anchor: slot.vertical_anchor,
                    cleared: slot.cleared,
                }
            })
            .collect();

        Ok(RenderedSlide {
            slide_index: entry.slide_index(),
            layout_id: entry.layout_id(),
            role: entry.slide_role(),
            placeholders,
            notes: entry.background_image().and_then(background_notes),
        })
    }

    /// Inject every slide. The first failure aborts the deck.
    pub fn inject(
        &self,
        entries: Vec<ManifestEntry>,
        registry: &TemplateRegistry,
        fallback_title: &str,
    ) -> Result<Deck, DeckError> {
        let slides = entries
            .into_iter()
            .map(|e| self.inject_slide(e, registry))
            .collect::<Result<Vec<_>, _>>()?;

        let title = slides
            .first()
            .and_then(|s| s.placeholders.iter().find(|p| p.kind == ShapeKind::Title))
            .map(RenderedPlaceholder::plain_text)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| plain_text(fallback_title));

        let cleared = slides
            .iter()
            .flat_map(|s| &s.placeholders)
            .filter(|p| p.cleared)
            .count();
        info!(
            "Injected {} slides into '{}' ({} boilerplate placeholders cleared)",
            slides.len(),
            registry.template_id,
            cleared
        );

        Ok(Deck {
            template_id: registry.template_id.clone(),
            title,
            slides,
        })
    }
}
