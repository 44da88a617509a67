//! CLI binary for deckwright.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `GenerationConfig` and prints results.

use anyhow::{bail, Context, Result};
use clap::Parser;
use deckwright::{
    generate_to_file, history, inspect_template, CancelToken, DeckInput, GenerationConfig,
    GenerationProgressCallback, ProgressCallback, RegistryStore, SlideRole, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one bar step per pipeline stage; the message tracks
/// the slide being written.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:30.green/238}] {pos}/{len} stages  {msg}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        let bar = ProgressBar::new(Stage::ALL.len() as u64);
        bar.set_style(style);
        bar.set_prefix("Generating");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl GenerationProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_message(stage.to_string());
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<15} {}",
            green("✓"),
            stage.to_string(),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_plan_ready(&self, total_slides: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Planned {total_slides} slides"))
        ));
    }

    fn on_slide_written(&self, slide_index: usize, total_slides: usize, role: SlideRole) {
        self.bar
            .set_message(format!("writer: slide {slide_index}/{total_slides} ({role})"));
    }

    fn on_generation_error(&self, stage: Stage, error: &str) {
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar
            .println(format!("  {} {:<15} {}", red("✗"), stage.to_string(), red(&msg)));
        self.bar.finish_and_clear();
    }

    fn on_generation_complete(&self, total_slides: usize, total_ms: u64) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} slides generated in {}",
            green("✔"),
            bold(&total_slides.to_string()),
            dim(&format!("{:.1}s", total_ms as f64 / 1000.0))
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Deck from a Markdown file, written to ./output/deck_<timestamp>.deck.json
  deckwright notes/launch.md --template corporate

  # Deck from a Word document into a chosen file
  deckwright brief.docx --template corporate -o decks/brief.deck.json

  # Deck from stdin
  cat notes.txt | deckwright - --template corporate

  # Shorter decks, one model call fewer per request
  deckwright notes.md --template corporate --min-slides 4 --max-slides 6 --no-proposal

  # Show a template's layouts and the roles inferred for them (no API key needed)
  deckwright --inspect-only --template corporate

  # List previous decks, newest first
  deckwright --history -o output

REGISTRIES:
  A registry is a JSON file describing one template's layouts and their
  placeholder shapes. Every *.json file in --registry-dir is loaded and
  addressed by its file stem: registries/corporate.json → --template corporate.
  Layouts without an explicit `layout_role` get one inferred from their
  legacy `layout_purpose`.

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY            OpenAI API key
  ANTHROPIC_API_KEY         Anthropic API key
  GEMINI_API_KEY            Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER    Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL           Override model ID
  DECKWRIGHT_REGISTRY_DIR   Default for --registry-dir
  DECKWRIGHT_OUTPUT         Default for --output
"#;

/// Turn prose into template-constrained slide decks.
#[derive(Parser, Debug)]
#[command(
    name = "deckwright",
    version,
    about = "Turn prose into template-constrained slide decks",
    long_about = "Turn unstructured prose (text, Markdown, .docx or .pptx) into a slide deck that \
follows a corporate template's layouts, word budgets and typography. Supports OpenAI, Anthropic, \
Google Gemini, Azure OpenAI, and any OpenAI-compatible endpoint (Ollama, vLLM, LiteLLM, etc.).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Text, a .txt/.md/.docx/.pptx path, or "-" for stdin.
    input: Option<String>,

    /// Template id: the file stem of a registry in --registry-dir.
    #[arg(short, long, env = "DECKWRIGHT_TEMPLATE")]
    template: Option<String>,

    /// Directory of template registries (*.json).
    #[arg(long, env = "DECKWRIGHT_REGISTRY_DIR", default_value = "registries")]
    registry_dir: PathBuf,

    /// Output file, or a directory for a timestamped file.
    #[arg(short, long, env = "DECKWRIGHT_OUTPUT", default_value = "output")]
    output: PathBuf,

    /// LLM model ID (e.g. gpt-4.1-mini, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// Fewest slides, TITLE and AGENDA included.
    #[arg(long, env = "DECKWRIGHT_MIN_SLIDES", default_value_t = 5)]
    min_slides: usize,

    /// Most slides, TITLE and AGENDA included.
    #[arg(long, env = "DECKWRIGHT_MAX_SLIDES", default_value_t = 8)]
    max_slides: usize,

    /// Temperature for extraction and planning (0.0–2.0).
    #[arg(long, env = "DECKWRIGHT_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Temperature for slide copy (0.0–2.0).
    #[arg(long, env = "DECKWRIGHT_WRITER_TEMPERATURE", default_value_t = 0.7)]
    writer_temperature: f32,

    /// Automatic retries per service call.
    #[arg(long, env = "DECKWRIGHT_MAX_RETRIES", default_value_t = 1)]
    max_retries: u32,

    /// Per-call timeout in seconds.
    #[arg(long, env = "DECKWRIGHT_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Extra boilerplate pattern, e.g. "confidential {year}". Repeatable.
    #[arg(long = "boilerplate", value_name = "PATTERN")]
    boilerplate: Vec<String>,

    /// Plan from the purpose table only, without a model proposal.
    #[arg(long)]
    no_proposal: bool,

    /// Print a JSON summary (path, stats, density corrections) on stdout.
    #[arg(long, env = "DECKWRIGHT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "DECKWRIGHT_NO_PROGRESS")]
    no_progress: bool,

    /// Print the template's layouts and exit.
    #[arg(long)]
    inspect_only: bool,

    /// List generated decks in --output and exit.
    #[arg(long)]
    history: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DECKWRIGHT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DECKWRIGHT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless -v is given.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── History mode ─────────────────────────────────────────────────────
    if cli.history {
        let entries = history(&cli.output).await.context("Failed to read history")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&entries).context("Failed to serialise history")?
            );
        } else if entries.is_empty() {
            eprintln!("No decks in {}", cli.output.display());
        } else {
            for e in &entries {
                println!(
                    "{}  {:>9}  {}",
                    e.created.format("%Y-%m-%d %H:%M:%S"),
                    format!("{} B", e.size),
                    e.filename
                );
            }
        }
        return Ok(());
    }

    let Some(template) = cli.template.as_deref() else {
        bail!("--template is required (a registry file stem in {})", cli.registry_dir.display());
    };

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let path = cli.registry_dir.join(format!("{template}.json"));
        let layouts = inspect_template(&path)
            .await
            .with_context(|| format!("Failed to inspect {}", path.display()))?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&layouts).context("Failed to serialise layouts")?
            );
        } else {
            println!("Template:     {}", template);
            println!("Layouts:      {}", layouts.len());
            for l in &layouts {
                println!(
                    "  {:>3}  {:<28} {:<9}{} density={:?} shapes={}{}",
                    l.layout_id,
                    l.name,
                    l.effective_role.as_str(),
                    if l.role_inferred { "*" } else { " " },
                    l.density,
                    l.shape_count,
                    if l.supports_background_image { " bg" } else { "" }
                );
            }
            println!("{}", dim("* role inferred from layout_purpose"));
        }
        return Ok(());
    }

    // ── Input ────────────────────────────────────────────────────────────
    let Some(raw) = cli.input.as_deref() else {
        bail!("No input given; pass text, a file path, or - for stdin");
    };
    let input = if raw == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        DeckInput::Text(text)
    } else {
        DeckInput::detect(raw)
    };

    let store = RegistryStore::load_dir(&cli.registry_dir)
        .await
        .with_context(|| format!("Failed to load registries from {}", cli.registry_dir.display()))?;
    let registry = store.get(template)?;

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn GenerationProgressCallback>)
    } else {
        None
    };

    let cancel = CancelToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{} cancelling after the current stage…", cyan("⚠"));
            on_ctrl_c.cancel();
        }
    });

    let config = build_config(&cli, progress_cb, cancel)?;

    // ── Run generation ───────────────────────────────────────────────────
    let artifact = generate_to_file(input, &registry, &cli.output, &config)
        .await
        .context("Generation failed")?;

    if cli.json {
        let summary = serde_json::json!({
            "path": artifact.path,
            "bytes": artifact.bytes,
            "title": artifact.output.deck.title,
            "roles": artifact.output.deck.roles(),
            "stats": artifact.output.stats,
            "density_violations": artifact.output.density_violations,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !cli.quiet {
        let stats = &artifact.output.stats;
        eprintln!(
            "{}  {} slides  {}ms  →  {}",
            green("✔"),
            stats.slide_count,
            stats.total_duration_ms,
            bold(&artifact.path.display().to_string()),
        );
        eprintln!(
            "   {} service calls  /  {} retries  /  {} density corrections",
            dim(&stats.service_calls.to_string()),
            dim(&stats.retries.to_string()),
            dim(&artifact.output.density_violations.len().to_string()),
        );
    }

    Ok(())
}

/// Map CLI args to `GenerationConfig`.
fn build_config(
    cli: &Cli,
    progress: Option<ProgressCallback>,
    cancel: CancelToken,
) -> Result<GenerationConfig> {
    let mut builder = GenerationConfig::builder()
        .slide_bounds(cli.min_slides, cli.max_slides)
        .temperature(cli.temperature)
        .writer_temperature(cli.writer_temperature)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .use_plan_proposal(!cli.no_proposal)
        .cancel_token(cancel);

    for pattern in &cli.boilerplate {
        builder = builder.boilerplate_pattern(pattern.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
