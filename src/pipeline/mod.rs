//! Pipeline stages for deck generation.
//!
//! Each submodule implements exactly one transformation step; the stages
//! compose strictly in sequence and each validates its own output before
//! handing it on.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ architect ──▶ writer ──▶ image_director ──▶ beautifier ──▶ injector
//! (text)   ContentMap   SlidePlan[]   Manifest    + background       + fonts        Deck
//! ```
//!
//! 1. [`input`]     — read raw text or a `.txt/.md/.docx/.pptx` file
//! 2. [`extract`]   — condense the text into a topic → facts content map
//! 3. [`architect`] — order slides, assign roles, pick layouts
//! 4. [`writer`]    — write each slide within its density budget
//! 5. [`image_director`] — declare background images for TITLE/CLOSING
//! 6. [`beautifier`] — font sizes and alignment from role and geometry
//! 7. [`injector`]  — map onto placeholders, filter boilerplate, write notes
//!
//! [`llm`] is the generative-service seam used by stages 2–4; [`markup`]
//! and [`boilerplate`] hold the deterministic text rules.

pub mod architect;
pub mod beautifier;
pub mod boilerplate;
pub mod extract;
pub mod image_director;
pub mod injector;
pub mod input;
pub mod llm;
pub mod markup;
pub mod writer;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The six stages of a generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extract,
    Architect,
    Writer,
    ImageDirector,
    Beautifier,
    Injector,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Extract,
        Stage::Architect,
        Stage::Writer,
        Stage::ImageDirector,
        Stage::Beautifier,
        Stage::Injector,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Extract => "extract",
            Stage::Architect => "architect",
            Stage::Writer => "writer",
            Stage::ImageDirector => "image director",
            Stage::Beautifier => "beautifier",
            Stage::Injector => "injector",
        })
    }
}
