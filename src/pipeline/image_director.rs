//! Image Director: declare a background image for TITLE and CLOSING slides.
//!
//! Purely declarative. A [`BackgroundImageSpec`] names keywords, mood,
//! composition and the overlay opacity that keeps text readable; nothing is
//! fetched here and the spec is written to the slide notes by the Injector.

use crate::manifest::{BackgroundImageSpec, ManifestEntry};
use crate::model::SlideRole;
use crate::registry::TemplateRegistry;
use tracing::{debug, info};

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "from",
    "into", "that", "this", "these", "those", "their", "about", "what", "which", "will", "have",
];

/// Intent words contributed to the keyword list.
const MAX_INTENT_KEYWORDS: usize = 3;

/// Art direction for a role that gets a background.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Direction {
    pub base_keywords: &'static str,
    pub mood: &'static str,
    pub composition: &'static str,
    /// Within `[0.35, 0.60]`.
    pub overlay_opacity: f32,
}

const TITLE: Direction = Direction {
    base_keywords: "professional business presentation abstract corporate modern",
    mood: "inspiring, bold, confident",
    composition: "centered, high-impact, abstract gradient",
    overlay_opacity: 0.35,
};

const CLOSING: Direction = Direction {
    base_keywords: "success achievement future opportunity next steps",
    mood: "optimistic, motivational, future-oriented",
    composition: "centered, uplifting, open space",
    overlay_opacity: 0.40,
};

/// Only TITLE and CLOSING slides carry a background.
pub fn direction(role: SlideRole) -> Option<&'static Direction> {
    match role {
        SlideRole::Title => Some(&TITLE),
        SlideRole::Closing => Some(&CLOSING),
        _ => None,
    }
}

/// Base terms followed by up to three meaningful words of the intent.
pub fn keywords(direction: &Direction, intent: &str) -> Vec<String> {
    let mut out: Vec<String> = direction
        .base_keywords
        .split_whitespace()
        .map(String::from)
        .collect();
    let intent_words = intent
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| w.chars().count() > 3 && !STOPWORDS.contains(&w.as_str()));

    let mut added = 0;
    for word in intent_words {
        if added == MAX_INTENT_KEYWORDS {
            break;
        }
        if !out.contains(&word) {
            out.push(word);
            added += 1;
        }
    }
    out
}

/// The spec for one slide.
pub fn background_for(role: SlideRole, intent: &str, layout_supports: bool) -> BackgroundImageSpec {
    match direction(role) {
        Some(d) if layout_supports => BackgroundImageSpec {
            enabled: true,
            keywords: keywords(d, intent),
            mood: d.mood.to_string(),
            composition: d.composition.to_string(),
            overlay_opacity: d.overlay_opacity,
        },
        _ => BackgroundImageSpec::disabled(),
    }
}

/// Run the Image Director over the manifest.
pub fn direct_images(entries: Vec<ManifestEntry>, registry: &TemplateRegistry) -> Vec<ManifestEntry> {
    let mut enabled = 0;
    let out: Vec<ManifestEntry> = entries
        .into_iter()
        .map(|entry| {
            let supports = registry
                .layout(entry.layout_id())
                .is_some_and(|l| l.supports_background_image);
            let spec = background_for(entry.slide_role(), entry.intent(), supports);
            if spec.enabled {
                enabled += 1;
                debug!(
                    "Slide {} ({}): background [{}]",
                    entry.slide_index(),
                    entry.slide_role(),
                    spec.keywords.join(" ")
                );
            }
            entry.with_background(spec)
        })
        .collect();
    info!("Background images declared for {} of {} slides", enabled, out.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_only_for_title_and_closing_on_supporting_layouts() {
        for role in SlideRole::ALL {
            let spec = background_for(role, "Launch Aurora", true);
            let expected = matches!(role, SlideRole::Title | SlideRole::Closing);
            assert_eq!(spec.enabled, expected, "{role}");
            assert_eq!(direction(role).is_some(), expected, "{role}");
            if spec.enabled {
                assert!((0.35..=0.60).contains(&spec.overlay_opacity));
            } else {
                assert_eq!(spec, BackgroundImageSpec::disabled());
            }
            assert!(!background_for(role, "x", false).enabled);
        }
    }

    #[test]
    fn title_and_closing_directions() {
        let title = background_for(SlideRole::Title, "Introduce Aurora", true);
        assert_eq!(title.overlay_opacity, 0.35);
        assert_eq!(title.mood, "inspiring, bold, confident");
        let closing = background_for(SlideRole::Closing, "Wrap up", true);
        assert_eq!(closing.overlay_opacity, 0.40);
        assert_eq!(closing.composition, "centered, uplifting, open space");
    }

    #[test]
    fn intent_contributes_three_meaningful_words() {
        let kw = keywords(
            &CLOSING,
            "Close with the takeaways on Aurora pricing, launch and hiring",
        );
        let base = CLOSING.base_keywords.split_whitespace().count();
        assert_eq!(&kw[base..], ["close", "takeaways", "aurora"]);
    }
}
