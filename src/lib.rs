//! # deckwright
//!
//! Turn prose into a presentation deck that respects a corporate template.
//!
//! ## Why this crate?
//!
//! Asking a language model for "a deck about X" yields walls of text that
//! ignore the template: the wrong layouts, ten bullets per slide, footer
//! placeholders still reading "Presentation title Page 3". Here the model only
//! writes; every structural decision (slide order, layout choice, word
//! budget, font size, what to clear) is made by deterministic rules, so the
//! same content map always lands on the template the same way.
//!
//! ## Pipeline Overview
//!
//! ```text
//! text / .md / .docx / .pptx
//!  │
//!  ├─ 1. Extract         condense into topics and key facts      (model)
//!  ├─ 2. Architect       order slides, assign roles and layouts  (model proposal + rules)
//!  ├─ 3. Writer          per-slide copy within a density budget  (model + rules)
//!  ├─ 4. Image Director  background specs for TITLE/CLOSING      (rules)
//!  ├─ 5. Beautifier      font sizes and alignment from geometry  (rules)
//!  └─ 6. Injector        bind to placeholders, clear boilerplate (rules)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use deckwright::{generate_to_file, GenerationConfig, RegistryStore};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let store = RegistryStore::load_dir("registries").await?;
//!     let registry = store.get("corporate")?;
//!     let config = GenerationConfig::default();
//!     let input = Path::new("notes/launch.md");
//!     let artifact = generate_to_file(input, &registry, "out", &config).await?;
//!     eprintln!("{} slides → {}", artifact.output.deck.slides.len(), artifact.path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `deckwright` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! deckwright = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod cancel;
pub mod config;
pub mod error;
pub mod generate;
pub mod history;
pub mod manifest;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod registry;
pub mod render;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use cancel::CancelToken;
pub use config::{
    DensityPolicy, DensityRule, GenerationConfig, GenerationConfigBuilder, TypographyPolicy,
    WordRange,
};
pub use error::{DeckError, DensityViolation, ExtractionError, InjectionError, PlanningError};
pub use generate::{generate, generate_sync, generate_to_file, inspect_template};
pub use history::{history, HistoryEntry};
pub use manifest::{BackgroundImageSpec, ManifestEntry, Slot, SlotStyle};
pub use model::{ContentMap, LayoutId, PlaceholderId, PurposeTag, SlidePlan, SlideRole, Topic};
pub use output::{
    Deck, DeckArtifact, DeckOutput, GenerationStats, Paragraph, RenderedPlaceholder,
    RenderedSlide, TextRun,
};
pub use pipeline::input::DeckInput;
pub use pipeline::llm::{Completion, GenerationRequest, LlmGenerator, ServiceError, TextGenerator};
pub use pipeline::Stage;
pub use progress::{GenerationProgressCallback, NoopProgressCallback, ProgressCallback};
pub use registry::{
    Alignment, Density, Geometry, LayoutMetadata, LayoutSummary, RegistryStore, ShapeDescriptor,
    ShapeKind, TemplateRegistry, VerticalAnchor,
};
pub use render::{DeckRenderer, JsonDeckRenderer};
