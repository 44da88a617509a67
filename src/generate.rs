//! Generation entry points.
//!
//! The six stages run strictly in sequence inside one task. Each stage's
//! output is validated by the stage itself before the next one starts, and
//! the cancel token is checked between stages. Nothing is written to disk
//! until the Injector has accepted every slide.

use crate::config::GenerationConfig;
use crate::error::DeckError;
use crate::output::{DeckArtifact, DeckOutput, GenerationStats};
use crate::pipeline::injector::Injector;
use crate::pipeline::input::{resolve_input, DeckInput};
use crate::pipeline::llm::{resolve_generator, ServiceClient};
use crate::pipeline::{architect, beautifier, extract, image_director, writer, Stage};
use crate::registry::{LayoutSummary, TemplateRegistry};
use crate::render::{artifact_filename, DeckRenderer, JsonDeckRenderer};
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Stage bookkeeping: timings, progress events, cancellation.
struct StageClock<'a> {
    config: &'a GenerationConfig,
    durations: BTreeMap<Stage, u64>,
}

impl<'a> StageClock<'a> {
    fn new(config: &'a GenerationConfig) -> Self {
        Self {
            config,
            durations: BTreeMap::new(),
        }
    }

    fn start(&self, stage: Stage) -> Instant {
        debug!("Stage {} started", stage);
        if let Some(cb) = &self.config.progress_callback {
            cb.on_stage_start(stage);
        }
        Instant::now()
    }

    fn finish(&mut self, stage: Stage, started: Instant) -> Result<(), DeckError> {
        let ms = started.elapsed().as_millis() as u64;
        self.durations.insert(stage, ms);
        info!("Stage {} done in {}ms", stage, ms);
        if let Some(cb) = &self.config.progress_callback {
            cb.on_stage_complete(stage, ms);
        }
        if self.config.is_cancelled() {
            info!("Cancelled after {} stage", stage);
            return Err(DeckError::Cancelled { after: stage });
        }
        Ok(())
    }

    fn fail(&self, stage: Stage, err: DeckError) -> DeckError {
        if let Some(cb) = &self.config.progress_callback {
            cb.on_generation_error(stage, &err.to_string());
        }
        err
    }
}

/// Generate a deck from text or a document.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input` — prose, or a [`DeckInput::File`] (`.txt`, `.md`, `.docx`, `.pptx`)
/// * `registry` — layout registry of the target template
/// * `config` — generation configuration
///
/// # Errors
/// Any stage failure is fatal; a request never yields a partial deck.
/// Density corrections are not errors and are reported in
/// [`DeckOutput::density_violations`].
///
/// # Example
/// ```rust,no_run
/// use deckwright::{generate, GenerationConfig, TemplateRegistry};
///
/// # async fn run() -> Result<(), deckwright::DeckError> {
/// let registry = TemplateRegistry::load("registries/corporate.json").await?;
/// let config = GenerationConfig::default();
/// let output = generate("Our Q3 launch of Aurora ...", &registry, &config).await?;
/// println!("{} slides", output.deck.slides.len());
/// # Ok(())
/// # }
/// ```
pub async fn generate(
    input: impl Into<DeckInput>,
    registry: &TemplateRegistry,
    config: &GenerationConfig,
) -> Result<DeckOutput, DeckError> {
    let total_start = Instant::now();
    let input = input.into();
    info!("Generating deck on template '{}'", registry.template_id);
    if let Some(cb) = &config.progress_callback {
        cb.on_generation_start();
    }

    // Fail on bad patterns or a missing provider before any service call.
    let injector = Injector::new(&config.boilerplate_patterns)?;
    let generator = resolve_generator(config)?;
    let client = ServiceClient::new(generator, config);
    let mut clock = StageClock::new(config);

    // ── Stage 1: Extract ─────────────────────────────────────────────────
    let t = clock.start(Stage::Extract);
    let text = resolve_input(&input)
        .await
        .map_err(|e| clock.fail(Stage::Extract, e.into()))?;
    let map = extract::extract(&text, &client)
        .await
        .map_err(|e| clock.fail(Stage::Extract, e))?;
    clock.finish(Stage::Extract, t)?;

    // ── Stage 2: Architect ───────────────────────────────────────────────
    let t = clock.start(Stage::Architect);
    let plans = architect::architect(&map, registry, &client)
        .await
        .map_err(|e| clock.fail(Stage::Architect, e))?;
    if let Some(cb) = &config.progress_callback {
        cb.on_plan_ready(plans.len());
    }
    clock.finish(Stage::Architect, t)?;

    // ── Stage 3: Writer ──────────────────────────────────────────────────
    let t = clock.start(Stage::Writer);
    let written = writer::write_deck(&plans, registry, &map.title, &client)
        .await
        .map_err(|e| clock.fail(Stage::Writer, e))?;
    clock.finish(Stage::Writer, t)?;

    // ── Stage 4: Image Director ──────────────────────────────────────────
    let t = clock.start(Stage::ImageDirector);
    let entries = image_director::direct_images(written.entries, registry);
    clock.finish(Stage::ImageDirector, t)?;

    // ── Stage 5: Beautifier ──────────────────────────────────────────────
    let t = clock.start(Stage::Beautifier);
    let entries = beautifier::beautify(entries, registry, &config.typography);
    clock.finish(Stage::Beautifier, t)?;

    // ── Stage 6: Injector ────────────────────────────────────────────────
    let t = clock.start(Stage::Injector);
    let deck = injector
        .inject(entries, registry, &map.title)
        .map_err(|e| clock.fail(Stage::Injector, e))?;
    clock.finish(Stage::Injector, t)?;

    let stats = GenerationStats {
        slide_count: deck.slides.len(),
        stage_durations_ms: clock.durations,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        service_calls: client.calls(),
        retries: client.retries(),
    };
    info!(
        "Deck '{}' ready: {} slides, {} service calls, {}ms",
        deck.title, stats.slide_count, stats.service_calls, stats.total_duration_ms
    );
    if let Some(cb) = &config.progress_callback {
        cb.on_generation_complete(stats.slide_count, stats.total_duration_ms);
    }

    Ok(DeckOutput {
        deck,
        stats,
        density_violations: written.violations,
    })
}

/// Where an artifact for `output` lands: `output` itself, or a timestamped
/// file inside it when `output` is an existing directory.
async fn artifact_path(output: &Path, renderer: &dyn DeckRenderer) -> PathBuf {
    let is_dir = tokio::fs::metadata(output)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if is_dir {
        output.join(artifact_filename(&Utc::now(), renderer.extension()))
    } else {
        output.to_path_buf()
    }
}

/// Generate a deck and write the rendered artifact.
///
/// Uses atomic write (temp file + rename) to prevent partial files. Nothing
/// is written when any stage fails.
pub async fn generate_to_file(
    input: impl Into<DeckInput>,
    registry: &TemplateRegistry,
    output: impl AsRef<Path>,
    config: &GenerationConfig,
) -> Result<DeckArtifact, DeckError> {
    let deck_output = generate(input, registry, config).await?;

    let renderer: Arc<dyn DeckRenderer> = config
        .renderer
        .clone()
        .unwrap_or_else(|| Arc::new(JsonDeckRenderer));
    let bytes = renderer.render(&deck_output.deck)?;
    let path = artifact_path(output.as_ref(), renderer.as_ref()).await;
    let write_err = |e: std::io::Error| DeckError::OutputWriteFailed {
        path: path.clone(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp = path.clone().into_os_string();
    tmp.push(".tmp");
    let tmp_path = PathBuf::from(tmp);
    tokio::fs::write(&tmp_path, &bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, &path).await.map_err(write_err)?;

    info!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(DeckArtifact {
        path,
        bytes: bytes.len() as u64,
        output: deck_output,
    })
}

/// Synchronous wrapper around [`generate`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(
    input: impl Into<DeckInput>,
    registry: &TemplateRegistry,
    config: &GenerationConfig,
) -> Result<DeckOutput, DeckError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DeckError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate(input, registry, config))
}

/// Load a registry file and summarise its layouts with their effective roles.
///
/// Does not require an LLM provider or API key.
pub async fn inspect_template(path: impl AsRef<Path>) -> Result<Vec<LayoutSummary>, DeckError> {
    let registry = TemplateRegistry::load(path).await?;
    Ok(registry.summary())
}
