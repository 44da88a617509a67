//! Configuration types for deck generation.
//!
//! All generation behaviour is controlled through [`GenerationConfig`], built
//! via its [`GenerationConfigBuilder`]. The sizing and density tables are
//! plain immutable structs ([`DensityPolicy`], [`TypographyPolicy`]) held by
//! the config and handed to each stage; no stage reads global state.

use crate::cancel::CancelToken;
use crate::error::DeckError;
use crate::model::SlideRole;
use crate::pipeline::boilerplate::DEFAULT_PATTERNS;
use crate::pipeline::llm::TextGenerator;
use crate::progress::ProgressCallback;
use crate::render::DeckRenderer;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Configuration for one deck-generation request.
///
/// Built via [`GenerationConfig::builder()`] or using
/// [`GenerationConfig::default()`].
///
/// # Example
/// ```rust
/// use deckwright::GenerationConfig;
///
/// let config = GenerationConfig::builder()
///     .model("gpt-4.1-mini")
///     .slide_bounds(5, 7)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// LLM model identifier, e.g. "gpt-4.1-mini". If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is auto-detected.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed text generator. Takes precedence over every provider
    /// setting; used for custom backends and tests.
    pub generator: Option<Arc<dyn TextGenerator>>,

    /// Sampling temperature for extraction and planning. Default: 0.2.
    pub temperature: f32,

    /// Sampling temperature for the Writer. Default: 0.7.
    pub writer_temperature: f32,

    /// Maximum tokens per service call. Default: 2048.
    pub max_tokens: usize,

    /// Automatic retries on a transient service failure. Default: 1.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Inputs with fewer words are rejected before any service call. Default: 20.
    pub min_input_words: usize,

    /// Lower bound on deck length, TITLE and AGENDA included. Default: 5.
    pub min_slides: usize,

    /// Upper bound on deck length. Default: 8.
    pub max_slides: usize,

    /// How many slides may share one layout. Default: 2.
    pub max_layout_reuse: usize,

    /// Ask the model for a slide-plan proposal before planning. Default: true.
    ///
    /// When false (or when the proposal is unusable) the plan comes from the
    /// deterministic purpose → role table alone.
    pub use_plan_proposal: bool,

    /// Per-role word and item budgets.
    pub density: DensityPolicy,

    /// Font-size tables and geometry constants.
    pub typography: TypographyPolicy,

    /// Boilerplate patterns in the placeholder pattern language.
    pub boilerplate_patterns: Vec<String>,

    /// Custom Extractor system prompt. If None, uses the built-in default.
    pub extractor_prompt: Option<String>,

    /// Progress events. Default: none.
    pub progress_callback: Option<ProgressCallback>,

    /// Cooperative cancellation, checked after every stage.
    pub cancel: Option<CancelToken>,

    /// Artifact encoder for `generate_to_file`. Default: JSON.
    pub renderer: Option<Arc<dyn DeckRenderer>>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            generator: None,
            temperature: 0.2,
            writer_temperature: 0.7,
            max_tokens: 2048,
            max_retries: 1,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            min_input_words: 20,
            min_slides: 5,
            max_slides: 8,
            max_layout_reuse: 2,
            use_plan_proposal: true,
            density: DensityPolicy::default(),
            typography: TypographyPolicy::default(),
            boilerplate_patterns: DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect(),
            extractor_prompt: None,
            progress_callback: None,
            cancel: None,
            renderer: None,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("generator", &self.generator.as_ref().map(|_| "<dyn TextGenerator>"))
            .field("temperature", &self.temperature)
            .field("writer_temperature", &self.writer_temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("min_input_words", &self.min_input_words)
            .field("min_slides", &self.min_slides)
            .field("max_slides", &self.max_slides)
            .field("max_layout_reuse", &self.max_layout_reuse)
            .field("use_plan_proposal", &self.use_plan_proposal)
            .field("boilerplate_patterns", &self.boilerplate_patterns.len())
            .finish()
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

/// Builder for [`GenerationConfig`].
#[derive(Debug)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.config.generator = Some(generator);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn writer_temperature(mut self, t: f32) -> Self {
        self.config.writer_temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn min_input_words(mut self, n: usize) -> Self {
        self.config.min_input_words = n;
        self
    }

    /// Deck length bounds, TITLE and AGENDA included.
    pub fn slide_bounds(mut self, min: usize, max: usize) -> Self {
        self.config.min_slides = min;
        self.config.max_slides = max;
        self
    }

    pub fn max_layout_reuse(mut self, n: usize) -> Self {
        self.config.max_layout_reuse = n.max(1);
        self
    }

    pub fn use_plan_proposal(mut self, v: bool) -> Self {
        self.config.use_plan_proposal = v;
        self
    }

    pub fn density(mut self, policy: DensityPolicy) -> Self {
        self.config.density = policy;
        self
    }

    pub fn typography(mut self, policy: TypographyPolicy) -> Self {
        self.config.typography = policy;
        self
    }

    /// Replace the boilerplate pattern list.
    pub fn boilerplate_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.boilerplate_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Append one boilerplate pattern to the current list.
    pub fn boilerplate_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.boilerplate_patterns.push(pattern.into());
        self
    }

    pub fn extractor_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.extractor_prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.config.cancel = Some(token);
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn DeckRenderer>) -> Self {
        self.config.renderer = Some(renderer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, DeckError> {
        let c = &self.config;
        if c.min_slides < 2 {
            return Err(DeckError::InvalidConfig(format!(
                "min_slides must be ≥ 2 (TITLE and AGENDA), got {}",
                c.min_slides
            )));
        }
        if c.max_slides < c.min_slides {
            return Err(DeckError::InvalidConfig(format!(
                "max_slides ({}) must be ≥ min_slides ({})",
                c.max_slides, c.min_slides
            )));
        }
        if c.max_slides < 3 {
            return Err(DeckError::InvalidConfig(
                "max_slides must leave room for at least one topic slide".into(),
            ));
        }
        c.density.validate()?;
        c.typography.validate()?;
        for pattern in &c.boilerplate_patterns {
            crate::pipeline::boilerplate::compile(pattern).map_err(|e| {
                DeckError::InvalidConfig(format!("boilerplate pattern '{}': {}", pattern, e))
            })?;
        }
        Ok(self.config)
    }
}

// ── Density policy ───────────────────────────────────────────────────────

/// Inclusive word-count range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordRange {
    pub min: usize,
    pub max: usize,
}

impl WordRange {
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, words: usize) -> bool {
        (self.min..=self.max).contains(&words)
    }
}

/// Item and word budget for the list part of one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DensityRule {
    pub min_items: usize,
    pub max_items: usize,
    /// Words per item.
    pub words: WordRange,
    /// Items below `words.min` are dropped rather than tolerated.
    pub strict_floor: bool,
}

/// Per-role density budgets. Ceilings are always hard limits.
///
/// | Role | Items | Words per item |
/// |------|-------|----------------|
/// | TITLE | title + subtitle | 6–10 / 10–15 |
/// | AGENDA | 3–5 | 3–6 |
/// | CONTENT | ≤ 5 | 8–12 (strict) |
/// | DIAGRAM | 2–6 | 2–4 |
/// | TIMELINE | exactly 3 | ≤ 8 |
/// | CLOSING | 2–3 | ≤ 8 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DensityPolicy {
    /// Title-slide headline.
    pub title: WordRange,
    /// Title-slide subtitle.
    pub subtitle: WordRange,
    /// Headline of every other slide.
    pub headline: WordRange,
    pub agenda: DensityRule,
    pub content: DensityRule,
    pub diagram: DensityRule,
    pub timeline: DensityRule,
    pub closing: DensityRule,
}

impl Default for DensityPolicy {
    fn default() -> Self {
        Self {
            title: WordRange::new(6, 10),
            subtitle: WordRange::new(10, 15),
            headline: WordRange::new(1, 8),
            agenda: DensityRule {
                min_items: 3,
                max_items: 5,
                words: WordRange::new(3, 6),
                strict_floor: false,
            },
            content: DensityRule {
                min_items: 1,
                max_items: 5,
                words: WordRange::new(8, 12),
                strict_floor: true,
            },
            diagram: DensityRule {
                min_items: 2,
                max_items: 6,
                words: WordRange::new(2, 4),
                strict_floor: false,
            },
            timeline: DensityRule {
                min_items: 3,
                max_items: 3,
                words: WordRange::new(1, 8),
                strict_floor: false,
            },
            closing: DensityRule {
                min_items: 2,
                max_items: 3,
                words: WordRange::new(1, 8),
                strict_floor: false,
            },
        }
    }
}

impl DensityPolicy {
    /// List budget for `role`; `None` for TITLE, which has no list.
    pub fn rule(&self, role: SlideRole) -> Option<&DensityRule> {
        match role {
            SlideRole::Title => None,
            SlideRole::Agenda => Some(&self.agenda),
            SlideRole::Content => Some(&self.content),
            SlideRole::Diagram => Some(&self.diagram),
            SlideRole::Timeline => Some(&self.timeline),
            SlideRole::Closing => Some(&self.closing),
        }
    }

    fn validate(&self) -> Result<(), DeckError> {
        let ranges = [
            ("title", self.title),
            ("subtitle", self.subtitle),
            ("headline", self.headline),
        ];
        for (name, r) in ranges {
            if r.min > r.max || r.max == 0 {
                return Err(DeckError::InvalidConfig(format!(
                    "density.{name}: invalid word range {}–{}",
                    r.min, r.max
                )));
            }
        }
        for role in SlideRole::ALL {
            if let Some(rule) = self.rule(role) {
                if rule.min_items > rule.max_items
                    || rule.max_items == 0
                    || rule.words.min > rule.words.max
                    || rule.words.max == 0
                {
                    return Err(DeckError::InvalidConfig(format!(
                        "density rule for {role} is inconsistent"
                    )));
                }
            }
        }
        if self.timeline.max_items != 3 || self.timeline.min_items != 3 {
            return Err(DeckError::InvalidConfig(
                "TIMELINE slides have exactly 3 phases".into(),
            ));
        }
        Ok(())
    }
}

// ── Typography policy ────────────────────────────────────────────────────

/// Base font sizes (points) and the geometry constants used to clamp them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TypographyPolicy {
    pub title_slide_title: u16,
    pub title_slide_body: u16,
    pub title_slide_footer: u16,
    pub title_large: u16,
    pub title_small: u16,
    pub body_large: u16,
    pub body_small: u16,
    pub supporting_large: u16,
    pub supporting_small: u16,
    pub footer: u16,
    /// Area ratio (placeholder / slide) above which titles use `title_large`.
    pub title_area_threshold: f32,
    pub body_area_threshold: f32,
    pub supporting_area_threshold: f32,
    /// Floor of the geometry clamp.
    pub min_font_size: u16,
    /// Average glyph width as a fraction of the font size.
    pub char_width_ratio: f32,
    /// Line height as a multiple of the font size.
    pub line_height_ratio: f32,
    /// Inset of circular shapes, as a fraction of the radius.
    pub circle_padding_ratio: f32,
}

impl Default for TypographyPolicy {
    fn default() -> Self {
        Self {
            title_slide_title: 44,
            title_slide_body: 28,
            title_slide_footer: 11,
            title_large: 32,
            title_small: 28,
            body_large: 22,
            body_small: 18,
            supporting_large: 16,
            supporting_small: 14,
            footer: 10,
            title_area_threshold: 0.05,
            body_area_threshold: 0.30,
            supporting_area_threshold: 0.15,
            min_font_size: 10,
            char_width_ratio: 0.6,
            line_height_ratio: 1.2,
            circle_padding_ratio: 0.1,
        }
    }
}

impl TypographyPolicy {
    fn validate(&self) -> Result<(), DeckError> {
        if self.min_font_size == 0 {
            return Err(DeckError::InvalidConfig(
                "typography.min_font_size must be ≥ 1".into(),
            ));
        }
        if self.char_width_ratio <= 0.0 || self.line_height_ratio <= 0.0 {
            return Err(DeckError::InvalidConfig(
                "typography ratios must be positive".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.circle_padding_ratio) {
            return Err(DeckError::InvalidConfig(
                "typography.circle_padding_ratio must be in [0, 1)".into(),
            ));
        }
        Ok(())
    }
}
