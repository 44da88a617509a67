//! Beautifier: font size and alignment for every slot.
//!
//! Sizes start from the [`TypographyPolicy`] table, keyed by slide role,
//! shape kind and how much of the slide the shape covers, then shrink one
//! point at a time until the estimated capacity of the shape holds the text.
//! Circular shapes are measured line by line against the chord of the
//! inscribed circle instead of the bounding box. The title of a TITLE slide
//! is anchored to the middle of its box.
//!
//! Only the [`SlotStyle`] fields change; role, text and background pass
//! through untouched.

use crate::config::TypographyPolicy;
use crate::manifest::{ManifestEntry, SlotStyle};
use crate::model::SlideRole;
use crate::pipeline::markup::plain_text;
use crate::registry::{
    Alignment, Geometry, ShapeDescriptor, ShapeKind, TemplateRegistry, VerticalAnchor,
};
use tracing::{debug, info};

/// Base size before the geometry clamp.
pub fn base_font_size(
    role: SlideRole,
    kind: ShapeKind,
    area_ratio: f32,
    policy: &TypographyPolicy,
) -> u16 {
    if role == SlideRole::Title {
        return match kind {
            ShapeKind::Title => policy.title_slide_title,
            ShapeKind::Subtitle | ShapeKind::Body => policy.title_slide_body,
            k if k.is_chrome() => policy.title_slide_footer,
            _ => policy.title_large,
        };
    }
    match kind {
        ShapeKind::Title if area_ratio > policy.title_area_threshold => policy.title_large,
        ShapeKind::Title => policy.title_small,
        ShapeKind::Body if area_ratio > policy.body_area_threshold => policy.body_large,
        ShapeKind::Body => policy.body_small,
        k if k.is_chrome() => policy.footer,
        _ if area_ratio > policy.supporting_area_threshold => policy.supporting_large,
        _ => policy.supporting_small,
    }
}

/// Estimated characters a shape holds at `size` points.
pub fn capacity(geometry: &Geometry, size: u16, policy: &TypographyPolicy) -> f32 {
    let s = f32::from(size.max(1));
    let per_line = geometry.width / (policy.char_width_ratio * s);
    let lines = geometry.height / (policy.line_height_ratio * s);
    per_line * lines
}

/// Shrink `base` until `chars` fit, never below the policy floor.
///
/// Shapes without geometry are left at `base`.
pub fn clamp_to_geometry(
    base: u16,
    chars: usize,
    geometry: &Geometry,
    policy: &TypographyPolicy,
) -> u16 {
    if geometry.width <= 0.0 || geometry.height <= 0.0 {
        return base;
    }
    let floor = policy.min_font_size.min(base);
    let mut size = base;
    while size > floor && capacity(geometry, size, policy) < chars as f32 {
        size -= 1;
    }
    size
}

/// Width of the horizontal chord `y` points from the centre of a circle.
pub fn chord_width(y: f32, radius: f32) -> f32 {
    if radius <= 0.0 || y.abs() >= radius {
        return 0.0;
    }
    2.0 * (radius * radius - y * y).sqrt()
}

/// Whether `text` word-wraps inside a circle of `radius` points at `size`.
///
/// Lines stack from the top of the circle; each line may be as wide as the
/// chord through its middle. A word wider than its chord never fits.
pub fn fits_in_circle(text: &str, radius: f32, size: u16, policy: &TypographyPolicy) -> bool {
    let s = f32::from(size.max(1));
    let char_width = policy.char_width_ratio * s;
    let line_height = policy.line_height_ratio * s;
    let available = |top: f32| chord_width(top + line_height / 2.0, radius);

    let mut top = -radius;
    for paragraph in text.lines().filter(|l| !l.trim().is_empty()) {
        let mut used = 0.0f32;
        for word in paragraph.split_whitespace() {
            let width = (word.chars().count() + 1) as f32 * char_width;
            if used > 0.0 && used + width > available(top) {
                top += line_height;
                used = 0.0;
            }
            if width > available(top) {
                return false;
            }
            used += width;
        }
        top += line_height;
        if top > radius {
            return false;
        }
    }
    true
}

/// Largest size from `base` down to the policy floor at which `text` fits
/// the circle inscribed in `geometry`.
///
/// Shapes without a radius are left at `base`.
pub fn fit_in_circle(
    base: u16,
    text: &str,
    geometry: &Geometry,
    policy: &TypographyPolicy,
) -> u16 {
    let Some(radius) = geometry.radius() else {
        return base;
    };
    let radius = radius * (1.0 - policy.circle_padding_ratio);
    let floor = policy.min_font_size.min(base);
    let mut size = base;
    while size > floor && !fits_in_circle(text, radius, size, policy) {
        size -= 1;
    }
    size
}

/// Alignment before the Injector's fallback.
pub fn alignment_for(role: SlideRole, shape: &ShapeDescriptor) -> Alignment {
    if let Some(intrinsic) = shape.alignment {
        return intrinsic;
    }
    if role == SlideRole::Title || matches!(shape.kind, ShapeKind::Title | ShapeKind::SlideNumber) {
        Alignment::Center
    } else {
        Alignment::Left
    }
}

/// TITLE slide titles sit in the middle of their box; everything else keeps
/// the template's anchoring.
pub fn vertical_anchor_for(role: SlideRole, kind: ShapeKind) -> Option<VerticalAnchor> {
    (role == SlideRole::Title && kind == ShapeKind::Title).then_some(VerticalAnchor::Middle)
}

/// Run the Beautifier over the manifest.
pub fn beautify(
    entries: Vec<ManifestEntry>,
    registry: &TemplateRegistry,
    policy: &TypographyPolicy,
) -> Vec<ManifestEntry> {
    let slide_area = registry.slide_area();
    let mut clamped = 0usize;

    let out: Vec<ManifestEntry> = entries
        .into_iter()
        .map(|entry| {
            let role = entry.slide_role();
            let index = entry.slide_index();
            let Some(layout) = registry.layout(entry.layout_id()) else {
                return entry;
            };
            entry.restyle(|id, slot| {
                let Some(shape) = layout.shape(id) else {
                    return slot.style();
                };
                let ratio = shape.geometry.area() / slide_area;
                let base = base_font_size(role, shape.kind, ratio, policy);
                let text = plain_text(&slot.text);
                let chars = text.chars().count();
                let size = if shape.geometry.circular {
                    fit_in_circle(base, &text, &shape.geometry, policy)
                } else {
                    clamp_to_geometry(base, chars, &shape.geometry, policy)
                };
                if size < base {
                    clamped += 1;
                    debug!(
                        "Slide {} placeholder {}: {}pt → {}pt for {} chars",
                        index, id, base, size, chars
                    );
                }
                SlotStyle {
                    font_size: Some(size),
                    alignment: Some(alignment_for(role, shape)),
                    vertical_anchor: vertical_anchor_for(role, shape.kind),
                }
            })
        })
        .collect();

    info!("Styled {} slides ({} sizes clamped)", out.len(), clamped);
    out
}
