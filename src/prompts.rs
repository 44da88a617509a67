//! Prompts for the three stages that call the generative-text service.
//!
//! Every prompt lives here so behaviour changes happen in one place and unit
//! tests can inspect prompts without a live model. Callers can override the
//! Extractor's system prompt via
//! [`crate::config::GenerationConfig::extractor_prompt`]; the Writer's role
//! rules are rendered from the active [`DensityPolicy`] so the numbers the
//! model sees are the numbers the validator enforces.

use crate::config::DensityPolicy;
use crate::model::{ContentMap, SlidePlan, SlideRole};
use crate::registry::LayoutMetadata;

/// System prompt for condensing raw text into a content map.
pub const EXTRACTOR_SYSTEM_PROMPT: &str = r#"You are a presentation analyst. Condense the user's text into a compact content map for a slide deck.

Rules:
1. Identify 3-6 distinct topics in reading order.
2. For each topic list 2-5 key facts. Facts are short, concrete statements taken from the text; never invent numbers.
3. Tag each topic with ONE purpose: narrative, data, comparison, structure, process, timeline, summary.
   - process or timeline: phases, steps, roadmaps, schedules
   - comparison, structure or data: options side by side, components, metrics
   - summary: conclusions, takeaways, calls to action
4. Give the deck a title (at most 10 words) and a one-sentence summary.

Respond with JSON only, no commentary, no code fences:
{"title": "...", "summary": "...", "topics": [{"name": "...", "purpose": "...", "facts": ["...", "..."]}]}"#;

/// System prompt for proposing a slide sequence.
pub const ARCHITECT_SYSTEM_PROMPT: &str = r#"You are a presentation architect. Turn a content map into an ordered slide plan that uses the template's layouts.

Rules:
1. Slide 1 is always role TITLE. Slide 2 is always role AGENDA. No other slide uses TITLE or AGENDA.
2. Every later slide covers one topic, in the order given, with a role from CONTENT, DIAGRAM, TIMELINE, CLOSING.
3. Process or timeline topics are TIMELINE; comparisons, structures and data are DIAGRAM; the final summary is CLOSING.
4. Choose a layout_id from the list whose role matches the slide role. Avoid the same layout on consecutive slides.
5. The intent is one sentence saying what the slide must achieve.

Respond with JSON only, no commentary, no code fences:
{"slides": [{"role": "TITLE", "intent": "...", "layout_id": 0}]}"#;

/// System prompt for writing one slide.
pub const WRITER_SYSTEM_PROMPT: &str = r#"You are a presentation copywriter. Write the text of ONE slide.

General rules:
- Slides are not documents: short phrases, no paragraphs.
- Use only the facts provided; do not invent figures.
- Emphasis uses **bold** or *italic* and each span has exactly one space before and after it, e.g. "grew **40%** last year".
- Count words carefully. Limits are hard limits.

Respond with JSON only, no commentary, no code fences:
{"title": "...", "subtitle": "...", "items": ["...", "..."]}
Omit "subtitle" unless the rules ask for one."#;

/// User message for the Architect.
pub fn architect_request(
    map: &ContentMap,
    layouts: &[LayoutMetadata],
    min_slides: usize,
    max_slides: usize,
) -> String {
    let mut out = format!(
        "Deck title: {}\nSlides: between {} and {}.\n\nTopics:\n",
        map.title, min_slides, max_slides
    );
    for (i, topic) in map.topics.iter().enumerate() {
        out.push_str(&format!(
            "{}. {} [purpose: {:?}] ({} facts)\n",
            i + 1,
            topic.name,
            topic.purpose,
            topic.facts.len()
        ));
    }
    out.push_str("\nLayouts:\n");
    for layout in layouts {
        out.push_str(&format!(
            "- layout_id {}: \"{}\" role {} density {:?}, {} placeholders\n",
            layout.layout_id,
            layout.name,
            layout.effective_role(),
            layout.density,
            layout.shapes.len()
        ));
    }
    out
}

/// Role-specific writing rules rendered from the density policy.
pub fn role_rules(role: SlideRole, policy: &DensityPolicy) -> String {
    let h = policy.headline;
    match role {
        SlideRole::Title => format!(
            "TITLE SLIDE\n- title: {}-{} words, punchy and memorable\n- subtitle: {}-{} words, context or tagline\n- items: []",
            policy.title.min, policy.title.max, policy.subtitle.min, policy.subtitle.max
        ),
        SlideRole::Agenda => {
            let r = policy.agenda;
            format!(
                "AGENDA SLIDE\n- title: at most {} words\n- items: {}-{} section labels, {}-{} words each, parallel structure, no descriptions",
                h.max, r.min_items, r.max_items, r.words.min, r.words.max
            )
        }
        SlideRole::Content => {
            let r = policy.content;
            format!(
                "CONTENT SLIDE\n- title: at most {} words\n- items: at most {} bullets, each {}-{} words, one idea per bullet, action verbs",
                h.max, r.max_items, r.words.min, r.words.max
            )
        }
        SlideRole::Diagram => {
            let r = policy.diagram;
            format!(
                "DIAGRAM SLIDE\n- title: at most {} words\n- items: {}-{} component labels, {}-{} words each, as they would appear on a diagram",
                h.max, r.min_items, r.max_items, r.words.min, r.words.max
            )
        }
        SlideRole::Timeline => {
            let r = policy.timeline;
            format!(
                "TIMELINE SLIDE\n- title: at most {} words\n- items: exactly 3 phases in order Now, Next, Later; each item starts with the phase name and a colon, at most {} words in total",
                h.max, r.words.max
            )
        }
        SlideRole::Closing => {
            let r = policy.closing;
            format!(
                "CLOSING SLIDE\n- title: at most {} words\n- items: {}-{} key takeaways, at most {} words each, forward-looking",
                h.max, r.min_items, r.max_items, r.words.max
            )
        }
    }
}

/// User message for the Writer.
pub fn writer_request(
    plan: &SlidePlan,
    slide_number: usize,
    deck_title: &str,
    policy: &DensityPolicy,
) -> String {
    let mut out = format!(
        "Deck: {}\nSlide {} role {}\nIntent: {}\n",
        deck_title, slide_number, plan.role, plan.intent
    );
    if let Some(topic) = &plan.topic {
        out.push_str(&format!("Topic: {}\n", topic));
    }
    if !plan.facts.is_empty() {
        out.push_str("Facts:\n");
        for fact in &plan.facts {
            out.push_str(&format!("- {}\n", fact));
        }
    }
    out.push('\n');
    out.push_str(&role_rules(plan.role, policy));
    out
}

/// Follow-up message for the single regeneration after a density violation.
pub fn writer_retry_suffix(violations: &[String]) -> String {
    let mut out = String::from(
        "\n\nYour previous answer broke these limits. Rewrite the slide so that every limit holds:\n",
    );
    for v in violations {
        out.push_str(&format!("- {}\n", v));
    }
    out
}
