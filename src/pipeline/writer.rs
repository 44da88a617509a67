//! Writer: one service call per slide, held to the role's density budget.
//!
//! Per slide:
//!
//! 1. Ask for `{"title", "subtitle", "items"}` and tidy the answer (emphasis
//!    repair, list markers stripped, AGENDA padding, TIMELINE phases).
//! 2. If the copy breaks the [`DensityPolicy`] or is not valid JSON, ask once
//!    more with the broken limits listed.
//! 3. If it still breaks them, truncate deterministically and record the
//!    violations. A slide with no usable answer is written from its facts.
//!
//! Ceilings always hold after step 3. Floors only drop content where the
//! rule is marked `strict_floor`; a short headline is recorded, not padded.

use crate::config::{DensityPolicy, WordRange};
use crate::error::{DeckError, DensityViolation};
use crate::manifest::{ManifestEntry, Slot};
use crate::model::{PlaceholderId, SlidePlan, SlideRole};
use crate::pipeline::llm::{decode_json, ServiceClient};
use crate::pipeline::markup::{repair_emphasis, truncate_words, word_count};
use crate::pipeline::Stage;
use crate::prompts::{writer_request, writer_retry_suffix, WRITER_SYSTEM_PROMPT};
use crate::registry::{LayoutMetadata, ShapeKind, TemplateRegistry};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, info, warn};

/// Timeline phase labels, in order.
pub const PHASES: [&str; 3] = ["Now", "Next", "Later"];

// "- item", "• item", "1. item", "2) item"
static RE_LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-•·*]|\d{1,2}[.)])\s+").unwrap());

// "Now: …", "**Next** – …", "later - …"
static RE_PHASE_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:\*\*)?\s*(?:now|next|later)\s*(?:\*\*)?\s*[:\-–—]\s*").unwrap()
});

/// The text of one slide before it is bound to placeholders.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SlideCopy {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub items: Vec<String>,
}

impl SlideCopy {
    fn is_blank(&self) -> bool {
        self.title.trim().is_empty() && self.subtitle.trim().is_empty() && self.items.is_empty()
    }
}

/// Everything the Writer produced for a deck.
#[derive(Debug, Clone, Default)]
pub struct WriterOutput {
    pub entries: Vec<ManifestEntry>,
    pub violations: Vec<DensityViolation>,
}

// ── Tidying ──────────────────────────────────────────────────────────────

fn tidy_line(text: &str) -> String {
    let stripped = RE_LIST_MARKER.replace(text.trim(), "");
    let one_line = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    repair_emphasis(&one_line)
}

/// Relabel the first three items as Now / Next / Later, filling gaps from
/// the plan's facts.
pub fn normalise_timeline(items: &[String], facts: &[String]) -> Vec<String> {
    let mut bodies: Vec<String> = items
        .iter()
        .map(|i| RE_PHASE_LABEL.replace(i, "").trim().to_string())
        .filter(|i| !i.is_empty())
        .take(PHASES.len())
        .collect();
    let spare: Vec<String> = facts
        .iter()
        .filter(|f| !bodies.iter().any(|b| b.eq_ignore_ascii_case(f)))
        .cloned()
        .collect();
    let mut spare = spare.into_iter();
    while bodies.len() < PHASES.len() {
        bodies.push(spare.next().unwrap_or_else(|| "To be confirmed".to_string()));
    }
    PHASES
        .iter()
        .zip(bodies)
        .map(|(label, body)| format!("{}: {}", label, tidy_line(&body)))
        .collect()
}

/// Top up an AGENDA with topic names until it has `min` items.
pub fn pad_agenda(items: &mut Vec<String>, facts: &[String], min: usize, words: WordRange) {
    for fact in facts {
        if items.len() >= min {
            break;
        }
        let fact = truncate_words(fact, words.max);
        if !items.iter().any(|i| i.eq_ignore_ascii_case(&fact)) {
            items.push(fact);
        }
    }
}

fn prepare(copy: SlideCopy, plan: &SlidePlan, policy: &DensityPolicy) -> SlideCopy {
    let mut items: Vec<String> = copy
        .items
        .iter()
        .map(|i| tidy_line(i))
        .filter(|i| !i.is_empty())
        .collect();
    let mut title = tidy_line(&copy.title);
    let mut subtitle = tidy_line(&copy.subtitle);

    match plan.role {
        SlideRole::Title => {
            if title.is_empty() {
                title = plan.facts.first().cloned().unwrap_or_default();
            }
            if subtitle.is_empty() {
                subtitle = plan.facts.get(1).cloned().unwrap_or_default();
            }
            items.clear();
        }
        SlideRole::Agenda => {
            if title.is_empty() {
                title = "Agenda".to_string();
            }
            let rule = policy.agenda;
            pad_agenda(&mut items, &plan.facts, rule.min_items, rule.words);
        }
        SlideRole::Timeline => items = normalise_timeline(&items, &plan.facts),
        _ => {}
    }
    if title.is_empty() {
        title = plan.topic.clone().unwrap_or_default();
    }

    SlideCopy {
        title,
        subtitle,
        items,
    }
}

/// Copy built from the plan alone, for slides with no usable answer.
pub fn fallback_copy(plan: &SlidePlan, policy: &DensityPolicy) -> SlideCopy {
    let raw = match plan.role {
        SlideRole::Title => SlideCopy::default(),
        _ => SlideCopy {
            items: plan.facts.clone(),
            ..SlideCopy::default()
        },
    };
    prepare(raw, plan, policy)
}

// ── Density ──────────────────────────────────────────────────────────────

fn check_words(
    out: &mut Vec<DensityViolation>,
    slide: usize,
    field: &str,
    text: &str,
    range: WordRange,
    floor: bool,
) {
    let words = word_count(text);
    if words > range.max {
        out.push(DensityViolation::TooManyWords {
            slide,
            field: field.to_string(),
            words,
            max: range.max,
        });
    } else if floor && words < range.min {
        out.push(DensityViolation::TooFewWords {
            slide,
            field: field.to_string(),
            words,
            min: range.min,
        });
    }
}

/// Every way `copy` breaks the budget for `role`.
pub fn check_density(
    copy: &SlideCopy,
    role: SlideRole,
    slide: usize,
    policy: &DensityPolicy,
) -> Vec<DensityViolation> {
    let mut out = Vec::new();
    let Some(rule) = policy.rule(role) else {
        check_words(&mut out, slide, "title", &copy.title, policy.title, true);
        check_words(&mut out, slide, "subtitle", &copy.subtitle, policy.subtitle, true);
        return out;
    };

    check_words(&mut out, slide, "title", &copy.title, policy.headline, false);
    let found = copy.items.len();
    if found > rule.max_items {
        out.push(DensityViolation::TooManyItems {
            slide,
            role,
            found,
            max: rule.max_items,
        });
    } else if found < rule.min_items {
        out.push(DensityViolation::TooFewItems {
            slide,
            role,
            found,
            min: rule.min_items,
        });
    }
    for (i, item) in copy.items.iter().enumerate() {
        let field = format!("item {}", i + 1);
        check_words(&mut out, slide, &field, item, rule.words, rule.strict_floor);
    }
    out
}

/// Cut `copy` down until every ceiling holds.
pub fn enforce_density(copy: SlideCopy, role: SlideRole, policy: &DensityPolicy) -> SlideCopy {
    let Some(rule) = policy.rule(role) else {
        return SlideCopy {
            title: truncate_words(&copy.title, policy.title.max),
            subtitle: truncate_words(&copy.subtitle, policy.subtitle.max),
            items: Vec::new(),
        };
    };

    let mut items: Vec<String> = copy
        .items
        .into_iter()
        .filter(|i| !rule.strict_floor || word_count(i) >= rule.words.min)
        .map(|i| truncate_words(&i, rule.words.max))
        .collect();
    items.truncate(rule.max_items);

    SlideCopy {
        title: truncate_words(&copy.title, policy.headline.max),
        subtitle: truncate_words(&copy.subtitle, policy.subtitle.max),
        items,
    }
}

// ── Slot assignment ──────────────────────────────────────────────────────

/// Bind copy to the layout's shapes. Never yields more slots than shapes.
///
/// Title → first Title shape; subtitle → Subtitle shape, else a spare Body;
/// items → Body shapes, one per shape when there are several, else one per
/// line of the single body. Chrome shapes that carry default text get a slot
/// with that text so the Injector can decide whether it is boilerplate.
pub fn assign_slots(copy: &SlideCopy, layout: &LayoutMetadata) -> BTreeMap<PlaceholderId, Slot> {
    place_copy(copy, layout).0
}

/// [`assign_slots`], plus the lines that found no placeholder.
fn place_copy(
    copy: &SlideCopy,
    layout: &LayoutMetadata,
) -> (BTreeMap<PlaceholderId, Slot>, Vec<String>) {
    let mut slots = BTreeMap::new();
    let mut unplaced = Vec::new();
    let mut bodies: VecDeque<_> = layout.shapes_of(ShapeKind::Body).collect();
    let mut items = copy.items.clone();

    if !copy.title.is_empty() {
        match layout.shapes_of(ShapeKind::Title).next() {
            Some(shape) => {
                slots.insert(shape.placeholder_id, Slot::new(shape.kind, &copy.title));
            }
            None => items.insert(0, format!("**{}**", copy.title)),
        }
    }

    if !copy.subtitle.is_empty() {
        if let Some(shape) = layout.shapes_of(ShapeKind::Subtitle).next() {
            slots.insert(shape.placeholder_id, Slot::new(shape.kind, &copy.subtitle));
        } else if items.is_empty() || bodies.len() > 1 {
            match bodies.pop_front() {
                Some(shape) => {
                    slots.insert(shape.placeholder_id, Slot::new(shape.kind, &copy.subtitle));
                }
                None => unplaced.push(copy.subtitle.clone()),
            }
        } else {
            items.insert(0, copy.subtitle.clone());
        }
    }

    if !items.is_empty() {
        let n = bodies.len();
        for (i, shape) in bodies.iter().enumerate() {
            let text = if i + 1 < n {
                items.get(i).cloned().unwrap_or_default()
            } else {
                items.get(i..).map(|rest| rest.join("\n")).unwrap_or_default()
            };
            if !text.is_empty() {
                slots.insert(shape.placeholder_id, Slot::new(shape.kind, text));
            }
        }
        if n == 0 {
            unplaced.extend(items);
        }
    }

    for shape in layout.shapes.iter().filter(|s| s.kind.is_chrome()) {
        if let Some(text) = shape.default_text.as_deref().filter(|t| !t.trim().is_empty()) {
            slots.insert(shape.placeholder_id, Slot::new(shape.kind, text));
        }
    }
    (slots, unplaced)
}

// ── Service ──────────────────────────────────────────────────────────────

async fn request_copy(
    client: &ServiceClient<'_>,
    user: &str,
    slide: usize,
) -> Result<Option<SlideCopy>, DeckError> {
    let raw = client
        .call(
            Stage::Writer,
            WRITER_SYSTEM_PROMPT,
            user,
            client.config().writer_temperature,
        )
        .await?;
    match decode_json::<SlideCopy>(&raw) {
        Ok(copy) if !copy.is_blank() => Ok(Some(copy)),
        Ok(_) => {
            warn!("Slide {}: writer returned empty copy", slide);
            Ok(None)
        }
        Err(e) => {
            warn!("Slide {}: writer response unparseable: {}", slide, e);
            Ok(None)
        }
    }
}

/// Write one slide. Returns its copy and the violations that had to be fixed.
pub async fn write_slide(
    plan: &SlidePlan,
    slide: usize,
    deck_title: &str,
    client: &ServiceClient<'_>,
) -> Result<(SlideCopy, Vec<DensityViolation>), DeckError> {
    let policy = &client.config().density;
    let request = writer_request(plan, slide, deck_title, policy);

    let mut copy = request_copy(client, &request, slide)
        .await?
        .map(|c| prepare(c, plan, policy));

    let reasons: Vec<String> = match &copy {
        None => vec!["the answer was not a JSON object with title, subtitle and items".into()],
        Some(c) => check_density(c, plan.role, slide, policy)
            .iter()
            .map(ToString::to_string)
            .collect(),
    };
    if !reasons.is_empty() {
        debug!("Slide {}: regenerating ({} problems)", slide, reasons.len());
        let retry = format!("{}{}", request, writer_retry_suffix(&reasons));
        if let Some(c) = request_copy(client, &retry, slide).await? {
            copy = Some(prepare(c, plan, policy));
        }
    }

    let copy = copy.unwrap_or_else(|| {
        warn!("Slide {}: no usable answer, writing from facts", slide);
        fallback_copy(plan, policy)
    });
    let violations = check_density(&copy, plan.role, slide, policy);
    if violations.is_empty() {
        return Ok((copy, violations));
    }
    for v in &violations {
        warn!("{}", v);
    }
    Ok((enforce_density(copy, plan.role, policy), violations))
}

/// Run the Writer over the whole plan, in order.
pub async fn write_deck(
    plans: &[SlidePlan],
    registry: &TemplateRegistry,
    deck_title: &str,
    client: &ServiceClient<'_>,
) -> Result<WriterOutput, DeckError> {
    let total = plans.len();
    let mut out = WriterOutput::default();

    for (i, plan) in plans.iter().enumerate() {
        let slide = i + 1;
        let (copy, violations) = write_slide(plan, slide, deck_title, client).await?;
        let (slots, unplaced) = match registry.layout(plan.layout_id) {
            Some(layout) => place_copy(&copy, layout),
            None => (BTreeMap::new(), Vec::new()),
        };
        if !unplaced.is_empty() {
            warn!(
                "Slide {} ({}): layout {} has no body shape, {} lines dropped",
                slide,
                plan.role,
                plan.layout_id,
                unplaced.len()
            );
            out.violations.push(DensityViolation::ItemsNotPlaced {
                slide,
                layout_id: plan.layout_id,
                items: unplaced.len(),
            });
        }
        debug!(
            "Slide {}/{} ({}): {} slots, {} items",
            slide,
            total,
            plan.role,
            slots.len(),
            copy.items.len()
        );
        out.entries.push(ManifestEntry::draft(slide, plan, slots));
        out.violations.extend(violations);

        if let Some(cb) = &client.config().progress_callback {
            cb.on_slide_written(slide, total, plan.role);
        }
    }

    info!(
        "Wrote {} slides ({} density corrections)",
        total,
        out.violations.len()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationConfig;
    use crate::pipeline::llm::{Completion, GenerationRequest, ServiceError, TextGenerator};
    use crate::registry::{Density, Geometry, ShapeDescriptor};
    use std::sync::Arc;

    fn policy() -> DensityPolicy {
        DensityPolicy::default()
    }

    fn plan(role: SlideRole, facts: &[&str]) -> SlidePlan {
        SlidePlan {
            role,
            intent: "test".into(),
            layout_id: 2,
            topic: Some("Rollout".into()),
            facts: facts.iter().map(|f| f.to_string()).collect(),
        }
    }

    fn shape(id: u32, kind: ShapeKind, default_text: Option<&str>) -> ShapeDescriptor {
        ShapeDescriptor {
            placeholder_id: id,
            name: String::new(),
            kind,
            geometry: Geometry::default(),
            default_text: default_text.map(String::from),
            max_chars: None,
            alignment: None,
        }
    }

    fn layout(shapes: Vec<ShapeDescriptor>) -> LayoutMetadata {
        LayoutMetadata {
            layout_id: 2,
            name: "Content".into(),
            layout_role: Some(SlideRole::Content),
            layout_purpose: None,
            supports_background_image: false,
            density: Density::Medium,
            shapes,
        }
    }

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn content_budget_violations_found() {
        let copy = SlideCopy {
            title: "Why it matters".into(),
            subtitle: String::new(),
            items: (0..7).map(|_| words(15)).collect(),
        };
        let v = check_density(&copy, SlideRole::Content, 3, &policy());
        assert!(v.contains(&DensityViolation::TooManyItems {
            slide: 3,
            role: SlideRole::Content,
            found: 7,
            max: 5
        }));
        assert_eq!(
            v.iter()
                .filter(|v| matches!(v, DensityViolation::TooManyWords { .. }))
                .count(),
            7
        );
    }

    #[test]
    fn enforce_meets_content_ceilings_and_strict_floor() {
        let mut items: Vec<String> = (0..6).map(|_| words(15)).collect();
        items.push("Too short".into());
        let copy = SlideCopy {
            title: words(12),
            subtitle: String::new(),
            items,
        };
        let fixed = enforce_density(copy, SlideRole::Content, &policy());
        assert_eq!(fixed.items.len(), 5);
        for item in &fixed.items {
            let n = word_count(item);
            assert!((8..=12).contains(&n), "{item}");
        }
        assert_eq!(word_count(&fixed.title), 8);
        assert!(check_density(&fixed, SlideRole::Content, 1, &policy()).is_empty());
    }

    #[test]
    fn title_slide_budget() {
        let copy = SlideCopy {
            title: "Aurora".into(),
            subtitle: words(20),
            items: vec!["ignored".into()],
        };
        let v = check_density(&copy, SlideRole::Title, 1, &policy());
        assert_eq!(v.len(), 2);
        let fixed = enforce_density(copy, SlideRole::Title, &policy());
        assert_eq!(word_count(&fixed.subtitle), 15);
        assert!(fixed.items.is_empty());
    }

    #[test]
    fn agenda_is_padded_from_topics() {
        let p = plan(SlideRole::Agenda, &["Why Aurora", "Platform", "Rollout", "Next steps"]);
        let copy = SlideCopy {
            title: "Agenda".into(),
            subtitle: String::new(),
            items: vec!["Why Aurora".into()],
        };
        let ready = prepare(copy, &p, &policy());
        assert_eq!(ready.items, vec!["Why Aurora", "Platform", "Rollout"]);
    }

    #[test]
    fn timeline_has_three_labelled_phases() {
        let items = vec![
            "**Now**: pilot in Lisbon".to_string(),
            "next - open Berlin".to_string(),
            "Later: all of Europe".to_string(),
            "Much later: the moon".to_string(),
        ];
        let out = normalise_timeline(&items, &[]);
        assert_eq!(
            out,
            vec![
                "Now: pilot in Lisbon",
                "Next: open Berlin",
                "Later: all of Europe"
            ]
        );

        let short = normalise_timeline(&["ship beta".to_string()], &["Hire team".to_string()]);
        assert_eq!(short, vec!["Now: ship beta", "Next: Hire team", "Later: To be confirmed"]);
    }

    #[test]
    fn items_are_tidied_and_repaired() {
        let p = plan(SlideRole::Content, &[]);
        let copy = SlideCopy {
            title: "Results".into(),
            subtitle: String::new(),
            items: vec!["- revenue grew due to** strong demand".into(), "   ".into()],
        };
        let ready = prepare(copy, &p, &policy());
        assert_eq!(ready.items, vec!["revenue grew due to **strong demand**"]);
    }

    #[test]
    fn fallback_uses_facts() {
        let p = plan(SlideRole::Closing, &["Approve the budget", "Brief the sales team"]);
        let copy = fallback_copy(&p, &policy());
        assert_eq!(copy.title, "Rollout");
        assert_eq!(copy.items.len(), 2);

        let mut t = plan(SlideRole::Title, &["Aurora launch", "Shipping to three markets"]);
        t.topic = None;
        let copy = fallback_copy(&t, &policy());
        assert_eq!(copy.title, "Aurora launch");
        assert_eq!(copy.subtitle, "Shipping to three markets");
    }

    #[test]
    fn single_body_gets_one_item_per_line() {
        let l = layout(vec![
            shape(0, ShapeKind::Title, None),
            shape(1, ShapeKind::Body, None),
            shape(10, ShapeKind::Footer, Some("Presentation title Page 3")),
            shape(11, ShapeKind::SlideNumber, None),
        ]);
        let copy = SlideCopy {
            title: "Rollout".into(),
            subtitle: String::new(),
            items: vec!["one".into(), "two".into()],
        };
        let slots = assign_slots(&copy, &l);
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[&1].text, "one\ntwo");
        assert_eq!(slots[&10].kind, ShapeKind::Footer);
        assert!(!slots.contains_key(&11));
    }

    #[test]
    fn several_bodies_get_one_item_each() {
        let l = layout(vec![
            shape(0, ShapeKind::Title, None),
            shape(1, ShapeKind::Body, None),
            shape(2, ShapeKind::Body, None),
        ]);
        let copy = SlideCopy {
            title: "Compare".into(),
            subtitle: String::new(),
            items: vec!["a".into(), "b".into(), "c".into()],
        };
        let slots = assign_slots(&copy, &l);
        assert_eq!(slots[&1].text, "a");
        assert_eq!(slots[&2].text, "b\nc");
        assert!(slots.len() <= l.shapes.len());
    }

    #[test]
    fn title_slide_subtitle_uses_spare_body() {
        let l = layout(vec![shape(0, ShapeKind::Title, None), shape(1, ShapeKind::Body, None)]);
        let copy = SlideCopy {
            title: "Aurora".into(),
            subtitle: "Three markets".into(),
            items: vec![],
        };
        let slots = assign_slots(&copy, &l);
        assert_eq!(slots[&1].text, "Three markets");
    }

    #[test]
    fn missing_title_shape_moves_title_into_body() {
        let l = layout(vec![shape(1, ShapeKind::Body, None)]);
        let copy = SlideCopy {
            title: "Rollout".into(),
            subtitle: String::new(),
            items: vec!["one".into()],
        };
        let slots = assign_slots(&copy, &l);
        assert_eq!(slots[&1].text, "**Rollout**\none");
    }

    fn title_only_closing() -> LayoutMetadata {
        LayoutMetadata {
            layout_id: 5,
            name: "Closing".into(),
            layout_role: Some(SlideRole::Closing),
            layout_purpose: None,
            supports_background_image: true,
            density: Density::Low,
            shapes: vec![shape(0, ShapeKind::Title, None)],
        }
    }

    #[test]
    fn title_only_layout_reports_unplaced_items() {
        let copy = SlideCopy {
            title: "Ready to ship".into(),
            subtitle: String::new(),
            items: vec!["Pilot in May".into(), "Review weekly".into()],
        };
        let (slots, unplaced) = place_copy(&copy, &title_only_closing());
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[&0].text, "Ready to ship");
        assert_eq!(unplaced, vec!["Pilot in May", "Review weekly"]);
    }

    struct Fixed(&'static str);

    #[async_trait::async_trait]
    impl TextGenerator for Fixed {
        async fn complete(&self, _r: &GenerationRequest) -> Result<Completion, ServiceError> {
            Ok(Completion {
                content: self.0.into(),
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn dropped_items_are_recorded_as_a_violation() {
        let config = GenerationConfig::default();
        let client = ServiceClient::new(
            Arc::new(Fixed(
                r#"{"title": "Aurora is ready", "subtitle": "", "items": ["Pilot with three customers", "Review launch metrics weekly"]}"#,
            )),
            &config,
        );
        let registry = TemplateRegistry::new("corp", vec![title_only_closing()]);
        let mut closing = plan(SlideRole::Closing, &["pilot", "metrics"]);
        closing.layout_id = 5;

        let out = write_deck(&[closing], &registry, "Aurora", &client).await.unwrap();

        assert_eq!(out.entries.len(), 1);
        assert_eq!(
            out.violations,
            vec![DensityViolation::ItemsNotPlaced {
                slide: 1,
                layout_id: 5,
                items: 2,
            }]
        );
    }
}
