//! Architect: turn a content map into an ordered, layout-bound slide plan.
//!
//! ## Rules
//!
//! 1. Slide 1 is TITLE, slide 2 is AGENDA, always. A model proposal that
//!    disagrees is overridden, not rejected.
//! 2. Every topic becomes one body slide whose role comes from
//!    [`PurposeTag::role`](crate::model::PurposeTag::role); TITLE/AGENDA results are demoted to CONTENT.
//!    Exactly one CLOSING slide ends the deck: the last closing topic is moved
//!    to the end, or the last topic is promoted when none maps to CLOSING.
//! 3. Deck length stays within `[min_slides, max_slides]`: the lightest
//!    adjacent topics are merged while there are too many, the richest topic
//!    is split while there are too few (as long as one has ≥ 2 facts).
//! 4. Layouts are chosen in tiers. Exact role match, then a compatible
//!    layout, then any layout not reserved for TITLE/AGENDA; within each
//!    tier the least-used layout wins. Repeating the previous slide's layout
//!    or exceeding `max_layout_reuse` is avoided while any alternative exists.
//!
//! The model's proposal contributes intents and layout choices. Roles always
//! come from the mapping table.

use crate::config::GenerationConfig;
use crate::error::{DeckError, PlanningError};
use crate::model::{ContentMap, LayoutId, SlidePlan, SlideRole, Topic};
use crate::pipeline::llm::{decode_json, ServiceClient};
use crate::pipeline::Stage;
use crate::prompts::{architect_request, ARCHITECT_SYSTEM_PROMPT};
use crate::registry::{LayoutMetadata, TemplateRegistry};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

// ── Proposal ─────────────────────────────────────────────────────────────

/// One slide of a model-proposed plan.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProposedSlide {
    pub role: String,
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub layout_id: Option<LayoutId>,
}

/// A model-proposed plan, used only when it passes [`Proposal::is_valid`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Proposal {
    pub slides: Vec<ProposedSlide>,
}

impl Proposal {
    /// Non-empty and every role names a known [`SlideRole`].
    pub fn is_valid(&self) -> bool {
        !self.slides.is_empty()
            && self
                .slides
                .iter()
                .all(|s| s.role.parse::<SlideRole>().is_ok())
    }

    fn at(&self, index: usize) -> Option<&ProposedSlide> {
        self.slides.get(index)
    }
}

async fn request_proposal(
    map: &ContentMap,
    registry: &TemplateRegistry,
    client: &ServiceClient<'_>,
) -> Result<Option<Proposal>, DeckError> {
    let config = client.config();
    let user = architect_request(map, &registry.layouts, config.min_slides, config.max_slides);
    let raw = client
        .call(Stage::Architect, ARCHITECT_SYSTEM_PROMPT, &user, config.temperature)
        .await?;

    match decode_json::<Proposal>(&raw) {
        Ok(p) if p.is_valid() => {
            debug!("Architect proposal: {} slides", p.slides.len());
            Ok(Some(p))
        }
        Ok(_) => {
            warn!("Architect proposal has unknown roles; using deterministic plan");
            Ok(None)
        }
        Err(e) => {
            warn!("Architect proposal unparseable ({}); using deterministic plan", e);
            Ok(None)
        }
    }
}

/// Run the Architect.
pub async fn architect(
    map: &ContentMap,
    registry: &TemplateRegistry,
    client: &ServiceClient<'_>,
) -> Result<Vec<SlidePlan>, DeckError> {
    check_inputs(map, registry)?;
    let config = client.config();
    let proposal = if config.use_plan_proposal {
        request_proposal(map, registry, client).await?
    } else {
        None
    };
    let plans = plan_slides(map, registry, config, proposal.as_ref())?;
    validate_plan(&plans, registry)?;
    info!(
        "Planned {} slides: {}",
        plans.len(),
        plans
            .iter()
            .map(|p| p.role.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(plans)
}

fn check_inputs(map: &ContentMap, registry: &TemplateRegistry) -> Result<(), PlanningError> {
    if registry.layouts.len() < 2 {
        return Err(PlanningError::InsufficientLayouts {
            available: registry.layouts.len(),
        });
    }
    if map.is_empty() {
        return Err(PlanningError::EmptyContent);
    }
    Ok(())
}

// ── Role assignment ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
struct BodySlide {
    role: SlideRole,
    topic: String,
    facts: Vec<String>,
}

/// Map topics to body roles and leave exactly one CLOSING slide, last.
fn assign_roles(topics: &[Topic]) -> Vec<BodySlide> {
    let mut body: Vec<BodySlide> = topics
        .iter()
        .map(|t| BodySlide {
            role: match t.purpose.role() {
                SlideRole::Title | SlideRole::Agenda => SlideRole::Content,
                r => r,
            },
            topic: t.name.clone(),
            facts: t.facts.clone(),
        })
        .collect();

    match body.iter().rposition(|b| b.role == SlideRole::Closing) {
        Some(pos) => {
            let closing = body.remove(pos);
            for b in body.iter_mut().filter(|b| b.role == SlideRole::Closing) {
                b.role = SlideRole::Content;
            }
            body.push(closing);
        }
        None => {
            if let Some(last) = body.last_mut() {
                last.role = SlideRole::Closing;
            }
        }
    }
    body
}

/// Merge the lightest adjacent pair (closing slide excluded) until `max` remain.
fn merge_to(body: &mut Vec<BodySlide>, max: usize) {
    while body.len() > max.max(1) {
        let mergeable = body.len() - 1;
        if mergeable < 2 {
            // Only the closing slide and one other remain: fold into closing.
            let mut first = body.remove(0);
            first.facts.append(&mut body[0].facts);
            body[0].facts = first.facts;
            continue;
        }
        let i = (0..mergeable - 1)
            .min_by_key(|&i| body[i].facts.len() + body[i + 1].facts.len())
            .unwrap_or(0);
        let second = body.remove(i + 1);
        let first = &mut body[i];
        if second.facts.len() > first.facts.len() {
            first.role = second.role;
        }
        first.topic = format!("{} & {}", first.topic, second.topic);
        first.facts.extend(second.facts);
    }
}

/// Split the richest topic until `min` body slides exist or nothing splits.
fn split_to(body: &mut Vec<BodySlide>, min: usize) {
    while body.len() < min {
        let candidate = body
            .iter()
            .enumerate()
            .filter(|(_, b)| b.facts.len() >= 2)
            .max_by_key(|(i, b)| {
                (
                    b.role != SlideRole::Closing,
                    b.facts.len(),
                    std::cmp::Reverse(*i),
                )
            })
            .map(|(i, _)| i);
        let Some(i) = candidate else {
            break;
        };

        let slide = &mut body[i];
        let keep = slide.facts.len().div_ceil(2);
        let rest = slide.facts.split_off(keep);
        let continuation = BodySlide {
            role: slide.role,
            topic: format!("{} (cont.)", slide.topic),
            facts: rest,
        };
        if slide.role == SlideRole::Closing {
            slide.role = SlideRole::Content;
        }
        body.insert(i + 1, continuation);
    }
}

// ── Layout selection ─────────────────────────────────────────────────────

/// Whether `layout` can host a slide of `role`.
///
/// Body roles always need a body placeholder, even on an exact role match.
pub fn is_compatible(layout: &LayoutMetadata, role: SlideRole) -> bool {
    let eff = layout.effective_role();
    match role {
        SlideRole::Title => eff == SlideRole::Title,
        SlideRole::Agenda => eff == SlideRole::Agenda || eff == SlideRole::Content,
        _ if !layout.has_body() => false,
        _ if eff == role => true,
        _ => eff.is_body() && layout.density.suits(role),
    }
}

struct LayoutPicker<'a> {
    layouts: &'a [LayoutMetadata],
    uses: HashMap<LayoutId, usize>,
    previous: Option<LayoutId>,
    max_reuse: usize,
}

impl<'a> LayoutPicker<'a> {
    fn new(layouts: &'a [LayoutMetadata], max_reuse: usize) -> Self {
        Self {
            layouts,
            uses: HashMap::new(),
            previous: None,
            max_reuse,
        }
    }

    fn uses(&self, id: LayoutId) -> usize {
        self.uses.get(&id).copied().unwrap_or(0)
    }

    fn commit(&mut self, id: LayoutId) -> LayoutId {
        *self.uses.entry(id).or_insert(0) += 1;
        self.previous = Some(id);
        id
    }

    fn fresh(&self, l: &LayoutMetadata) -> bool {
        Some(l.layout_id) != self.previous && self.uses(l.layout_id) < self.max_reuse
    }

    fn least_used<F>(&self, accept: F) -> Option<LayoutId>
    where
        F: Fn(&LayoutMetadata) -> bool,
    {
        self.layouts
            .iter()
            .enumerate()
            .filter(|(_, l)| accept(l))
            .min_by_key(|(i, l)| (self.uses(l.layout_id), *i))
            .map(|(_, l)| l.layout_id)
    }

    fn pick_title(&mut self, proposed: Option<LayoutId>) -> LayoutId {
        let layouts = self.layouts;
        let chosen = proposed
            .filter(|id| {
                layouts
                    .iter()
                    .any(|l| l.layout_id == *id && l.effective_role() == SlideRole::Title)
            })
            .or_else(|| self.least_used(|l| l.effective_role() == SlideRole::Title))
            .unwrap_or(layouts[0].layout_id);
        self.commit(chosen)
    }

    fn pick_agenda(&mut self, proposed: Option<LayoutId>) -> LayoutId {
        let title = self.previous;
        let not_title = |l: &LayoutMetadata| Some(l.layout_id) != title;
        let chosen = proposed
            .filter(|id| {
                self.layouts.iter().any(|l| {
                    l.layout_id == *id && not_title(l) && is_compatible(l, SlideRole::Agenda)
                })
            })
            .or_else(|| {
                self.least_used(|l| not_title(l) && l.effective_role() == SlideRole::Agenda)
            })
            .or_else(|| {
                self.least_used(|l| not_title(l) && is_compatible(l, SlideRole::Agenda))
            })
            .or_else(|| {
                self.layouts
                    .iter()
                    .find(|l| not_title(l) && self.uses(l.layout_id) == 0)
                    .map(|l| l.layout_id)
            })
            .or_else(|| self.layouts.iter().find(|l| not_title(l)).map(|l| l.layout_id))
            .unwrap_or(self.layouts[0].layout_id);
        self.commit(chosen)
    }

    fn pick_body(
        &mut self,
        role: SlideRole,
        proposed: Option<LayoutId>,
    ) -> Result<LayoutId, PlanningError> {
        let compatible =
            |l: &LayoutMetadata| !l.effective_role().is_reserved() && is_compatible(l, role);
        let exact = |l: &LayoutMetadata| l.effective_role() == role && compatible(l);

        if let Some(id) = proposed {
            let honoured = self
                .layouts
                .iter()
                .any(|l| l.layout_id == id && compatible(l) && self.fresh(l));
            if honoured {
                return Ok(self.commit(id));
            }
        }

        // Freshness only orders candidates within a tier.
        let tiers: [&dyn Fn(&LayoutMetadata) -> bool; 2] = [&exact, &compatible];
        for tier in tiers {
            for fresh_only in [true, false] {
                if let Some(id) = self.least_used(|l| tier(l) && (!fresh_only || self.fresh(l))) {
                    return Ok(self.commit(id));
                }
            }
        }
        Err(PlanningError::NoCompatibleLayout { role })
    }
}

// ── Planning ─────────────────────────────────────────────────────────────

fn default_intent(role: SlideRole, topic: &str) -> String {
    match role {
        SlideRole::Title => format!("Introduce {}", topic),
        SlideRole::Agenda => format!("Preview the {} sections of the deck", topic),
        SlideRole::Content => format!("Explain the key points of {}", topic),
        SlideRole::Diagram => format!("Show how the parts of {} relate", topic),
        SlideRole::Timeline => format!("Lay out {} as Now, Next and Later", topic),
        SlideRole::Closing => format!("Close with the takeaways on {}", topic),
    }
}

fn proposed_intent(proposal: Option<&Proposal>, index: usize) -> Option<String> {
    proposal
        .and_then(|p| p.at(index))
        .map(|s| s.intent.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn proposed_layout(proposal: Option<&Proposal>, index: usize) -> Option<LayoutId> {
    proposal.and_then(|p| p.at(index)).and_then(|s| s.layout_id)
}

/// Deterministic planning, optionally guided by a validated proposal.
pub fn plan_slides(
    map: &ContentMap,
    registry: &TemplateRegistry,
    config: &GenerationConfig,
    proposal: Option<&Proposal>,
) -> Result<Vec<SlidePlan>, PlanningError> {
    check_inputs(map, registry)?;

    let mut body = assign_roles(&map.topics);
    let max_body = config.max_slides.saturating_sub(2).max(1);
    let min_body = config.min_slides.saturating_sub(2);
    merge_to(&mut body, max_body);
    split_to(&mut body, min_body);

    if let Some(p) = proposal {
        for (i, s) in p.slides.iter().enumerate() {
            let expected = match i {
                0 => SlideRole::Title,
                1 => SlideRole::Agenda,
                _ => body.get(i - 2).map_or(SlideRole::Content, |b| b.role),
            };
            if s.role.parse::<SlideRole>().ok() != Some(expected) {
                debug!(
                    "Slide {}: proposal says {}, mapping table says {}",
                    i + 1,
                    s.role,
                    expected
                );
            }
        }
    }

    let mut picker = LayoutPicker::new(&registry.layouts, config.max_layout_reuse);
    let mut plans = Vec::with_capacity(body.len() + 2);

    let deck_title = if map.title.is_empty() {
        body[0].topic.clone()
    } else {
        map.title.clone()
    };
    let mut title_facts = vec![deck_title.clone()];
    if !map.summary.is_empty() {
        title_facts.push(map.summary.clone());
    }
    plans.push(SlidePlan {
        role: SlideRole::Title,
        intent: proposed_intent(proposal, 0)
            .unwrap_or_else(|| default_intent(SlideRole::Title, &deck_title)),
        layout_id: picker.pick_title(proposed_layout(proposal, 0)),
        topic: None,
        facts: title_facts,
    });

    plans.push(SlidePlan {
        role: SlideRole::Agenda,
        intent: proposed_intent(proposal, 1)
            .unwrap_or_else(|| default_intent(SlideRole::Agenda, &body.len().to_string())),
        layout_id: picker.pick_agenda(proposed_layout(proposal, 1)),
        topic: None,
        facts: body.iter().map(|b| b.topic.clone()).collect(),
    });

    for (i, slide) in body.into_iter().enumerate() {
        let index = i + 2;
        let layout_id = picker.pick_body(slide.role, proposed_layout(proposal, index))?;
        plans.push(SlidePlan {
            role: slide.role,
            intent: proposed_intent(proposal, index)
                .unwrap_or_else(|| default_intent(slide.role, &slide.topic)),
            layout_id,
            topic: Some(slide.topic),
            facts: slide.facts,
        });
    }

    Ok(plans)
}

/// Post-condition check run before the plan leaves the Architect.
pub fn validate_plan(plans: &[SlidePlan], registry: &TemplateRegistry) -> Result<(), PlanningError> {
    if plans.len() < 2 {
        return Err(PlanningError::InvalidPlan(format!(
            "{} slides; TITLE and AGENDA are mandatory",
            plans.len()
        )));
    }
    if plans[0].role != SlideRole::Title {
        return Err(PlanningError::InvalidPlan(format!(
            "slide 1 is {}, expected TITLE",
            plans[0].role
        )));
    }
    if plans[1].role != SlideRole::Agenda {
        return Err(PlanningError::InvalidPlan(format!(
            "slide 2 is {}, expected AGENDA",
            plans[1].role
        )));
    }
    for (i, plan) in plans.iter().enumerate() {
        let layout = registry.layout(plan.layout_id).ok_or_else(|| {
            PlanningError::InvalidPlan(format!(
                "slide {} uses unknown layout {}",
                i + 1,
                plan.layout_id
            ))
        })?;
        if i >= 2 {
            if plan.role.is_reserved() {
                return Err(PlanningError::InvalidPlan(format!(
                    "slide {} has reserved role {}",
                    i + 1,
                    plan.role
                )));
            }
            if layout.effective_role().is_reserved() || !is_compatible(layout, plan.role) {
                return Err(PlanningError::InvalidPlan(format!(
                    "slide {} ({}) uses incompatible {} layout {}",
                    i + 1,
                    plan.role,
                    layout.effective_role(),
                    layout.layout_id
                )));
            }
        }
    }
    Ok(())
}
