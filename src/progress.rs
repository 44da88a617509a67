//! Progress-callback trait for per-stage and per-slide generation events.
//!
//! Inject an [`Arc<dyn GenerationProgressCallback>`] via
//! [`crate::config::GenerationConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves through its six stages.
//!
//! Callers forward events wherever they like (a terminal progress bar, a
//! channel, a log) without the library knowing how the host application
//! communicates.
//!
//! # Example
//!
//! ```rust
//! use deckwright::{GenerationConfig, GenerationProgressCallback, Stage};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct StageCounter {
//!     done: AtomicUsize,
//! }
//!
//! impl GenerationProgressCallback for StageCounter {
//!     fn on_stage_complete(&self, stage: Stage, _elapsed_ms: u64) {
//!         let n = self.done.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{stage} done ({n}/6)");
//!     }
//! }
//!
//! let config = GenerationConfig::builder()
//!     .progress_callback(Arc::new(StageCounter { done: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::model::SlideRole;
use crate::pipeline::Stage;
use std::sync::Arc;

/// Called by the pipeline as it processes a request.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait GenerationProgressCallback: Send + Sync {
    /// Called once before extraction starts.
    fn on_generation_start(&self) {}

    /// Called when a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage has validated its output.
    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// Called once the Architect has fixed the slide count.
    fn on_plan_ready(&self, total_slides: usize) {
        let _ = total_slides;
    }

    /// Called after the Writer finishes a slide.
    ///
    /// # Arguments
    /// * `slide_index`  — 1-based position
    /// * `total_slides` — deck length
    /// * `role`         — the slide's role
    fn on_slide_written(&self, slide_index: usize, total_slides: usize, role: SlideRole) {
        let _ = (slide_index, total_slides, role);
    }

    /// Called when the request fails; `stage` is where it failed.
    fn on_generation_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }

    /// Called once after the Injector succeeds.
    fn on_generation_complete(&self, total_slides: usize, total_ms: u64) {
        let _ = (total_slides, total_ms);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl GenerationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::GenerationConfig`].
pub type ProgressCallback = Arc<dyn GenerationProgressCallback>;
