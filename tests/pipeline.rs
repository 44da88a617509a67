//! Whole-pipeline tests against a scripted generator.
//!
//! The generator answers by system prompt, and for the Writer by the slide
//! role named in the request, so every run is deterministic and offline.

use async_trait::async_trait;
use deckwright::pipeline::boilerplate::DEFAULT_PATTERNS;
use deckwright::pipeline::injector::Injector;
use deckwright::pipeline::writer::{assign_slots, SlideCopy};
use deckwright::prompts::{ARCHITECT_SYSTEM_PROMPT, EXTRACTOR_SYSTEM_PROMPT, WRITER_SYSTEM_PROMPT};
use deckwright::{
    generate, generate_to_file, history, CancelToken, Completion, Deck, DeckError,
    ExtractionError, GenerationConfig, GenerationProgressCallback, GenerationRequest,
    InjectionError, ManifestEntry, ServiceError, SlidePlan, SlideRole, Slot, Stage,
    TemplateRegistry, TextGenerator, VerticalAnchor,
};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};

// ── Scripted generator ───────────────────────────────────────────────────────

/// How the generator answers CONTENT slides.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
enum ContentAnswers {
    #[default]
    Compliant,
    /// Too many bullets first, compliant once the limits are quoted back.
    VerboseOnce,
    VerboseAlways,
}

#[derive(Default)]
struct ScriptedGenerator {
    log: Mutex<Vec<String>>,
    fail_writer: bool,
    content: ContentAnswers,
}

impl ScriptedGenerator {
    fn failing_writer() -> Self {
        Self {
            fail_writer: true,
            ..Self::default()
        }
    }

    fn with_content(content: ContentAnswers) -> Self {
        Self {
            content,
            ..Self::default()
        }
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

/// Role named on the "Slide N role X" line of a writer request.
fn requested_role(user: &str) -> SlideRole {
    user.lines()
        .find(|l| l.starts_with("Slide "))
        .and_then(|l| l.split_whitespace().last())
        .and_then(|r| r.parse().ok())
        .expect("writer request names a role")
}

fn content_map() -> Value {
    json!({
        "title": "Aurora launch plan",
        "summary": "How Aurora brings live analytics to every team this year",
        "topics": [
            {
                "name": "Why Aurora matters",
                "purpose": "narrative",
                "facts": [
                    "Onboarding time drops by 40% for enterprise customers",
                    "Three legacy reporting tools are replaced",
                    "Support teams get live dashboards"
                ]
            },
            {
                "name": "Platform architecture",
                "purpose": "structure",
                "facts": [
                    "Ingestion gateway accepts events from every product",
                    "Streaming query engine answers in under a second",
                    "Shared workspace UI sits on top"
                ]
            },
            {
                "name": "Rollout plan",
                "purpose": "process",
                "facts": [
                    "Private beta with design partners this quarter",
                    "General availability in EMEA next quarter",
                    "Self-serve tier later in the year"
                ]
            },
            {
                "name": "Key takeaways",
                "purpose": "summary",
                "facts": [
                    "Aurora unifies analytics for every team",
                    "Beta feedback shapes the GA release"
                ]
            }
        ]
    })
}

fn proposal() -> Value {
    json!({
        "slides": [
            {"role": "TITLE", "intent": "Open the Aurora launch briefing", "layout_id": 0},
            {"role": "AGENDA", "intent": "Preview the four sections", "layout_id": 1},
            {"role": "CONTENT", "intent": "Explain why Aurora matters to customers", "layout_id": 2},
            {"role": "DIAGRAM", "intent": "Show how the platform components connect", "layout_id": 3},
            {"role": "TIMELINE", "intent": "Walk through the rollout phases", "layout_id": 4},
            {"role": "CLOSING", "intent": "Leave the audience with clear takeaways", "layout_id": 5}
        ]
    })
}

fn verbose_content() -> Value {
    let bullets: Vec<String> = (1..=7)
        .map(|i| format!("Point {i} explains one more reason why customers will adopt Aurora quickly"))
        .collect();
    json!({"title": "Why Aurora matters", "items": bullets})
}

fn slide_copy(role: SlideRole) -> Value {
    match role {
        SlideRole::Title => json!({
            "title": "Aurora brings real time analytics to every team",
            "subtitle": "A product launch briefing for sales, support and engineering leaders this quarter",
            "items": []
        }),
        SlideRole::Agenda => json!({
            "title": "Agenda",
            "items": [
                "Why Aurora matters now",
                "How the platform fits together",
                "Rollout plan and phases",
                "Key takeaways for teams"
            ]
        }),
        SlideRole::Content => json!({
            "title": "Why Aurora matters",
            "items": [
                "Cuts onboarding time by**40%**for new enterprise customers",
                "- Replaces three legacy reporting tools with one shared workspace",
                "Gives support teams live dashboards instead of weekly exports"
            ]
        }),
        SlideRole::Diagram => json!({
            "title": "Platform architecture",
            "items": ["Ingestion gateway", "Streaming query engine", "Shared workspace UI"]
        }),
        SlideRole::Timeline => json!({
            "title": "Rollout plan",
            "items": [
                "Now: Private beta with design partners",
                "Next: General availability in EMEA",
                "Later: Self-serve tier and marketplace"
            ]
        }),
        SlideRole::Closing => json!({
            "title": "Key takeaways",
            "items": [
                "Aurora unifies analytics for every team",
                "Beta feedback shapes the GA release"
            ]
        }),
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn complete(&self, request: &GenerationRequest) -> Result<Completion, ServiceError> {
        let answer = if request.system == EXTRACTOR_SYSTEM_PROMPT {
            self.record("extract".into());
            content_map()
        } else if request.system == ARCHITECT_SYSTEM_PROMPT {
            self.record("architect".into());
            proposal()
        } else if request.system == WRITER_SYSTEM_PROMPT {
            let role = requested_role(&request.user);
            self.record(format!("writer:{role}"));
            if self.fail_writer {
                return Err(ServiceError::Backend("503 service unavailable".into()));
            }
            let retry = request.user.contains("Your previous answer broke these limits");
            match (role, self.content) {
                (SlideRole::Content, ContentAnswers::VerboseAlways) => verbose_content(),
                (SlideRole::Content, ContentAnswers::VerboseOnce) if !retry => verbose_content(),
                _ => slide_copy(role),
            }
        } else {
            return Err(ServiceError::Backend("unexpected prompt".into()));
        };
        Ok(Completion {
            content: answer.to_string(),
            ..Completion::default()
        })
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

fn shape(id: u32, kind: &str, rect: [f32; 4], default_text: Option<&str>) -> Value {
    json!({
        "placeholder_id": id,
        "name": format!("{kind} {id}"),
        "kind": kind,
        "geometry": {"left": rect[0], "top": rect[1], "width": rect[2], "height": rect[3]},
        "default_text": default_text
    })
}

fn footer(id: u32, text: &str) -> Value {
    shape(id, "footer", [330.0, 500.0, 300.0, 24.0], Some(text))
}

fn slide_number(id: u32) -> Value {
    shape(id, "slide_number", [860.0, 500.0, 60.0, 24.0], Some("‹#›"))
}

const TITLE_BOX: [f32; 4] = [60.0, 30.0, 840.0, 70.0];
const BODY_BOX: [f32; 4] = [60.0, 120.0, 840.0, 360.0];

/// Seven layouts: one per role plus a second CONTENT layout.
/// `legacy` swaps `layout_role` for the free-text `layout_purpose`.
fn layouts(legacy: bool) -> Vec<Value> {
    let specs: Vec<(u32, &str, &str, &str, bool, &str, Vec<Value>)> = vec![
        (0, "Title Slide", "TITLE", "TITLE_SLIDE", true, "low", vec![
            shape(0, "title", [80.0, 170.0, 800.0, 110.0], Some("Click to add title")),
            shape(1, "subtitle", [80.0, 300.0, 800.0, 60.0], None),
            footer(10, "Presentation title Page 1"),
            slide_number(12),
        ]),
        (1, "Agenda", "AGENDA", "AGENDA_SLIDE", false, "medium", vec![
            shape(0, "title", TITLE_BOX, None),
            shape(1, "body", BODY_BOX, None),
            footer(10, "Presentation title Page 2"),
        ]),
        (2, "Title and Content", "CONTENT", "CONTENT_SLIDE", true, "medium", vec![
            shape(0, "title", TITLE_BOX, None),
            shape(1, "body", BODY_BOX, None),
            footer(10, "Presentation title Page 3"),
            slide_number(12),
        ]),
        (3, "Diagram", "DIAGRAM", "STRUCTURE_SLIDE", false, "high", vec![
            shape(0, "title", TITLE_BOX, None),
            shape(1, "body", BODY_BOX, None),
        ]),
        (4, "Three Phases", "TIMELINE", "TIMELINE_SLIDE", false, "medium", vec![
            shape(0, "title", TITLE_BOX, None),
            shape(1, "body", [60.0, 140.0, 270.0, 320.0], None),
            shape(2, "body", [345.0, 140.0, 270.0, 320.0], None),
            shape(3, "body", [630.0, 140.0, 270.0, 320.0], None),
        ]),
        (5, "Closing", "CLOSING", "CLOSING_SLIDE", true, "low", vec![
            shape(0, "title", [80.0, 150.0, 800.0, 90.0], None),
            shape(1, "body", [80.0, 260.0, 800.0, 180.0], None),
            footer(10, "12 March 2024"),
        ]),
        (6, "Two Content", "CONTENT", "content", false, "medium", vec![
            shape(0, "title", TITLE_BOX, None),
            shape(1, "body", [60.0, 120.0, 410.0, 360.0], None),
            shape(2, "body", [490.0, 120.0, 410.0, 360.0], None),
        ]),
    ];

    specs
        .into_iter()
        .map(|(id, name, role, purpose, bg, density, shapes)| {
            let mut layout = json!({
                "layout_id": id,
                "name": name,
                "supports_background_image": bg,
                "density": density,
                "shapes": shapes,
            });
            if legacy {
                layout["layout_purpose"] = json!(purpose);
            } else {
                layout["layout_role"] = json!(role);
            }
            layout
        })
        .collect()
}

fn registry_with(legacy: bool) -> TemplateRegistry {
    let doc = json!({
        "template_id": "corp",
        "slide_width": 960.0,
        "slide_height": 540.0,
        "layouts": layouts(legacy),
    });
    TemplateRegistry::from_json(&doc.to_string(), Path::new("corp.json")).unwrap()
}

fn registry() -> TemplateRegistry {
    registry_with(false)
}

/// About six hundred words of launch notes.
fn launch_notes() -> String {
    let paragraph = "Aurora is our new analytics platform and it launches this year. \
        Enterprise customers told us onboarding takes too long and that reporting is split \
        across three legacy tools. Aurora ingests events from every product through one gateway, \
        answers queries in under a second with a streaming engine, and puts the results in a \
        shared workspace that sales, support and engineering can all use.";
    std::iter::repeat(paragraph).take(10).collect::<Vec<_>>().join("\n\n")
}

fn config_with(generator: Arc<ScriptedGenerator>) -> GenerationConfig {
    GenerationConfig::builder()
        .generator(generator)
        .retry_backoff_ms(1)
        .build()
        .unwrap()
}

fn words(text: &str) -> usize {
    text.split_whitespace()
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .count()
}

fn slide_of(deck: &Deck, role: SlideRole) -> &deckwright::RenderedSlide {
    deck.slides.iter().find(|s| s.role == role).unwrap()
}

// ── Full pipeline ────────────────────────────────────────────────────────────

#[tokio::test]
async fn launch_notes_become_six_slide_deck() {
    let generator = Arc::new(ScriptedGenerator::default());
    let config = config_with(generator.clone());

    let output = generate(launch_notes(), &registry(), &config).await.unwrap();

    assert_eq!(
        output.deck.roles(),
        vec![
            SlideRole::Title,
            SlideRole::Agenda,
            SlideRole::Content,
            SlideRole::Diagram,
            SlideRole::Timeline,
            SlideRole::Closing,
        ]
    );
    let layouts: Vec<_> = output.deck.slides.iter().map(|s| s.layout_id).collect();
    assert_eq!(layouts, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(output.deck.title, "Aurora brings real time analytics to every team");
    assert_eq!(output.deck.template_id, "corp");

    // One call each for extraction and planning, one per slide, no retries.
    assert_eq!(output.stats.service_calls, 8);
    assert_eq!(output.stats.retries, 0);
    assert_eq!(output.stats.slide_count, 6);
    assert_eq!(output.stats.stage_durations_ms.len(), 6);
    assert!(output.density_violations.is_empty());
    assert_eq!(generator.log().iter().filter(|e| e.starts_with("writer:")).count(), 6);
}

#[tokio::test]
async fn title_and_agenda_lead_the_deck() {
    let generator = Arc::new(ScriptedGenerator::default());
    let config = GenerationConfig::builder()
        .generator(generator.clone())
        .use_plan_proposal(false)
        .build()
        .unwrap();

    let output = generate(launch_notes(), &registry(), &config).await.unwrap();
    let roles = output.deck.roles();

    assert_eq!(roles[0], SlideRole::Title);
    assert_eq!(roles[1], SlideRole::Agenda);
    assert!(roles[2..].iter().all(|r| !r.is_reserved()));
    assert_eq!(roles.iter().filter(|r| **r == SlideRole::Closing).count(), 1);
    assert_eq!(roles.last(), Some(&SlideRole::Closing));
    assert!(!generator.log().contains(&"architect".to_string()));

    let agenda = slide_of(&output.deck, SlideRole::Agenda);
    let items = agenda.placeholder(1).unwrap().plain_text();
    assert_eq!(items.lines().count(), 4);

    let title = slide_of(&output.deck, SlideRole::Title);
    assert_eq!(
        title.placeholder(0).unwrap().vertical_anchor,
        Some(VerticalAnchor::Middle)
    );
    assert_eq!(agenda.placeholder(0).unwrap().vertical_anchor, None);
}

#[tokio::test]
async fn content_bullets_respect_density() {
    let config = config_with(Arc::new(ScriptedGenerator::default()));
    let output = generate(launch_notes(), &registry(), &config).await.unwrap();

    let content = slide_of(&output.deck, SlideRole::Content);
    let body = content.placeholder(1).unwrap().plain_text();
    let bullets: Vec<&str> = body.lines().collect();
    assert!(!bullets.is_empty() && bullets.len() <= 5);
    for bullet in &bullets {
        let n = words(bullet);
        assert!((8..=12).contains(&n), "{n} words in {bullet:?}");
    }
    // List markers are stripped.
    assert_eq!(
        bullets[1],
        "Replaces three legacy reporting tools with one shared workspace"
    );

    let title = slide_of(&output.deck, SlideRole::Title);
    assert!((6..=10).contains(&words(&title.placeholder(0).unwrap().plain_text())));
    assert!((10..=15).contains(&words(&title.placeholder(1).unwrap().plain_text())));
}

#[tokio::test]
async fn glued_emphasis_is_repaired_into_runs() {
    let config = config_with(Arc::new(ScriptedGenerator::default()));
    let output = generate(launch_notes(), &registry(), &config).await.unwrap();

    let content = slide_of(&output.deck, SlideRole::Content);
    let first = &content.placeholder(1).unwrap().paragraphs[0];
    assert_eq!(
        first.plain_text(),
        "Cuts onboarding time by 40% for new enterprise customers"
    );
    let bold: Vec<_> = first.runs.iter().filter(|r| r.bold).collect();
    assert_eq!(bold.len(), 1);
    assert_eq!(bold[0].text, "40%");
    assert!(first.runs.iter().all(|r| !r.text.contains('*')));
}

#[tokio::test]
async fn timeline_items_follow_phases() {
    let config = config_with(Arc::new(ScriptedGenerator::default()));
    let output = generate(launch_notes(), &registry(), &config).await.unwrap();

    let timeline = slide_of(&output.deck, SlideRole::Timeline);
    let phases: Vec<String> = (1..=3)
        .map(|id| timeline.placeholder(id).unwrap().plain_text())
        .collect();
    assert!(phases[0].starts_with("Now: "));
    assert!(phases[1].starts_with("Next: "));
    assert!(phases[2].starts_with("Later: "));
}

#[tokio::test]
async fn boilerplate_placeholders_are_cleared() {
    let config = config_with(Arc::new(ScriptedGenerator::default()));
    let output = generate(launch_notes(), &registry(), &config).await.unwrap();

    let chrome: Vec<_> = output
        .deck
        .slides
        .iter()
        .flat_map(|s| &s.placeholders)
        .filter(|p| p.kind.is_chrome())
        .collect();
    assert!(!chrome.is_empty());
    for p in chrome {
        assert!(p.cleared, "placeholder {} kept boilerplate", p.placeholder_id);
        assert!(p.plain_text().is_empty());
    }
    // Generated copy survives the filter.
    let content = slide_of(&output.deck, SlideRole::Content);
    assert!(!content.placeholder(1).unwrap().cleared);
}

#[test]
fn boilerplate_filtering_is_idempotent() {
    let registry = registry();
    let layout = registry.layout(2).unwrap();
    let plan = SlidePlan {
        role: SlideRole::Content,
        intent: "Explain the launch".into(),
        layout_id: 2,
        topic: Some("Launch".into()),
        facts: vec![],
    };
    let copy = SlideCopy {
        title: "Launch".into(),
        subtitle: String::new(),
        items: vec!["Revenue grew 40% in 2024 across every region we serve".into()],
    };
    let entry = ManifestEntry::draft(3, &plan, assign_slots(&copy, layout));
    let injector = Injector::new(DEFAULT_PATTERNS).unwrap();

    let once = injector.filter_boilerplate(entry, layout);
    let twice = injector.filter_boilerplate(once.clone(), layout);
    assert_eq!(once, twice);
    assert!(once.slot(10).unwrap().cleared);
    assert!(once.slot(12).unwrap().cleared);
    assert!(!once.slot(1).unwrap().cleared);
}

#[tokio::test]
async fn backgrounds_only_on_title_and_closing() {
    let config = config_with(Arc::new(ScriptedGenerator::default()));
    let output = generate(launch_notes(), &registry(), &config).await.unwrap();

    for slide in &output.deck.slides {
        match slide.role {
            SlideRole::Title | SlideRole::Closing => {
                let notes = slide.notes.as_deref().unwrap();
                assert!(notes.starts_with("Background Image Specification:"));
            }
            // Layout 2 supports a background, but CONTENT never gets one.
            _ => assert_eq!(slide.notes, None, "slide {}", slide.slide_index),
        }
    }
    let title = slide_of(&output.deck, SlideRole::Title);
    assert!(title.notes.as_deref().unwrap().contains("Overlay Opacity: 35%"));
    let closing = slide_of(&output.deck, SlideRole::Closing);
    assert!(closing.notes.as_deref().unwrap().contains("Overlay Opacity: 40%"));
}

#[tokio::test]
async fn legacy_registry_yields_same_deck() {
    let explicit = generate(
        launch_notes(),
        &registry_with(false),
        &config_with(Arc::new(ScriptedGenerator::default())),
    )
    .await
    .unwrap();
    let legacy = generate(
        launch_notes(),
        &registry_with(true),
        &config_with(Arc::new(ScriptedGenerator::default())),
    )
    .await
    .unwrap();

    assert_eq!(explicit.deck, legacy.deck);
}

#[tokio::test]
async fn violating_copy_is_regenerated_once() {
    let generator = Arc::new(ScriptedGenerator::with_content(ContentAnswers::VerboseOnce));
    let config = config_with(generator.clone());

    let output = generate(launch_notes(), &registry(), &config).await.unwrap();

    let content_calls = generator
        .log()
        .iter()
        .filter(|e| *e == "writer:CONTENT")
        .count();
    assert_eq!(content_calls, 2);
    assert_eq!(output.stats.service_calls, 9);
    assert!(output.density_violations.is_empty());
    let body = slide_of(&output.deck, SlideRole::Content)
        .placeholder(1)
        .unwrap()
        .plain_text();
    assert_eq!(body.lines().count(), 3);
}

#[tokio::test]
async fn persistent_violations_are_truncated_and_recorded() {
    let generator = Arc::new(ScriptedGenerator::with_content(ContentAnswers::VerboseAlways));
    let config = config_with(generator.clone());

    let output = generate(launch_notes(), &registry(), &config).await.unwrap();

    assert!(!output.density_violations.is_empty());
    let body = slide_of(&output.deck, SlideRole::Content)
        .placeholder(1)
        .unwrap()
        .plain_text();
    let bullets: Vec<&str> = body.lines().collect();
    assert_eq!(bullets.len(), 5);
    for bullet in bullets {
        assert!(words(bullet) <= 12, "{bullet:?}");
    }
}

// ── Failures ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn short_input_fails_before_any_call() {
    let generator = Arc::new(ScriptedGenerator::default());
    let config = config_with(generator.clone());

    let err = generate("Launch Aurora next week.", &registry(), &config)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DeckError::Extraction(ExtractionError::InputTooShort { words: 4, min: 20 })
    ));
    assert!(generator.log().is_empty());
}

#[test]
fn slot_overflow_is_rejected() {
    let registry = registry();
    // Layout 4 has four shapes.
    let plan = SlidePlan {
        role: SlideRole::Timeline,
        intent: "Phases".into(),
        layout_id: 4,
        topic: None,
        facts: vec![],
    };
    let slots = (0..5)
        .map(|id| (id, Slot::new(deckwright::ShapeKind::Body, "text")))
        .collect();
    let entry = ManifestEntry::draft(5, &plan, slots);

    let err = Injector::new(DEFAULT_PATTERNS)
        .unwrap()
        .inject(vec![entry], &registry, "Deck")
        .unwrap_err();
    assert!(matches!(
        err,
        DeckError::Injection(InjectionError::SlotOverflow {
            slide: 5,
            layout_id: 4,
            slots: 5,
            shapes: 4,
        })
    ));
}

#[tokio::test]
async fn failed_generation_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let generator = Arc::new(ScriptedGenerator::failing_writer());
    let config = config_with(generator.clone());

    let err = generate_to_file(launch_notes(), &registry(), dir.path(), &config)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DeckError::GenerationFailed {
            stage: Stage::Writer,
            attempts: 2,
            ..
        }
    ));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    assert!(history(dir.path()).await.unwrap().is_empty());
}

// ── Progress and cancellation ────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
    cancel_after: Option<(Stage, CancelToken)>,
}

impl Recorder {
    fn push(&self, e: String) {
        self.events.lock().unwrap().push(e);
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl GenerationProgressCallback for Recorder {
    fn on_generation_start(&self) {
        self.push("start".into());
    }

    fn on_stage_complete(&self, stage: Stage, _elapsed_ms: u64) {
        self.push(format!("done {stage}"));
        if let Some((after, token)) = &self.cancel_after {
            if *after == stage {
                token.cancel();
            }
        }
    }

    fn on_plan_ready(&self, total_slides: usize) {
        self.push(format!("plan {total_slides}"));
    }

    fn on_slide_written(&self, slide_index: usize, total_slides: usize, role: SlideRole) {
        self.push(format!("slide {slide_index}/{total_slides} {role}"));
    }

    fn on_generation_error(&self, stage: Stage, _error: &str) {
        self.push(format!("error {stage}"));
    }

    fn on_generation_complete(&self, total_slides: usize, _total_ms: u64) {
        self.push(format!("complete {total_slides}"));
    }
}

#[tokio::test]
async fn progress_events_arrive_in_order() {
    let recorder = Arc::new(Recorder::default());
    let config = GenerationConfig::builder()
        .generator(Arc::new(ScriptedGenerator::default()))
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    generate(launch_notes(), &registry(), &config).await.unwrap();

    assert_eq!(
        recorder.events(),
        vec![
            "start",
            "done extract",
            "plan 6",
            "done architect",
            "slide 1/6 TITLE",
            "slide 2/6 AGENDA",
            "slide 3/6 CONTENT",
            "slide 4/6 DIAGRAM",
            "slide 5/6 TIMELINE",
            "slide 6/6 CLOSING",
            "done writer",
            "done image director",
            "done beautifier",
            "done injector",
            "complete 6",
        ]
    );
}

#[tokio::test]
async fn cancellation_stops_between_stages() {
    let token = CancelToken::new();
    let recorder = Arc::new(Recorder {
        cancel_after: Some((Stage::Architect, token.clone())),
        ..Recorder::default()
    });
    let generator = Arc::new(ScriptedGenerator::default());
    let config = GenerationConfig::builder()
        .generator(generator.clone())
        .progress_callback(recorder.clone())
        .cancel_token(token)
        .build()
        .unwrap();

    let err = generate(launch_notes(), &registry(), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, DeckError::Cancelled { after: Stage::Architect }));
    assert!(generator.log().iter().all(|e| !e.starts_with("writer:")));
    assert!(!recorder.events().contains(&"complete 6".to_string()));
}

// ── Artifacts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn artifact_written_atomically_and_listed() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_with(Arc::new(ScriptedGenerator::default()));

    let artifact = generate_to_file(launch_notes(), &registry(), dir.path(), &config)
        .await
        .unwrap();

    let name = artifact.path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("deck_") && name.ends_with(".deck.json"));

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec![name.clone()]);

    let written: Deck = serde_json::from_slice(&std::fs::read(&artifact.path).unwrap()).unwrap();
    assert_eq!(written, artifact.output.deck);

    let entries = history(dir.path()).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].filename, name);
    assert_eq!(entries[0].size, artifact.bytes);
}

#[tokio::test]
async fn explicit_output_path_is_used() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("decks").join("aurora.deck.json");
    let config = config_with(Arc::new(ScriptedGenerator::default()));

    let artifact = generate_to_file(launch_notes(), &registry(), &target, &config)
        .await
        .unwrap();
    assert_eq!(artifact.path, target);
    assert!(target.is_file());
    assert!(!dir.path().join("decks").join("aurora.deck.json.tmp").exists());
}
