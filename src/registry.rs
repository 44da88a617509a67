//! Template registry: the read-only layout catalogue of one template.
//!
//! Registries are produced by an indexing step that lives outside this crate
//! and stored as one JSON file per template. Records written by older
//! indexers omit `layout_role`, `supports_background_image` and `density`;
//! they deserialise with the defaults and their role is inferred from the
//! free-text `layout_purpose` through [`PurposeTag`].
//!
//! A registry is loaded once and shared as `Arc<TemplateRegistry>` between
//! concurrent generation requests. Nothing in the pipeline mutates it.

use crate::error::DeckError;
use crate::model::{LayoutId, PlaceholderId, PurposeTag, SlideRole};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

// ── Shape vocabulary ─────────────────────────────────────────────────────

/// Text alignment of a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Alignment {
    #[default]
    #[serde(alias = "left")]
    Left,
    #[serde(alias = "center", alias = "CENTRE", alias = "centre")]
    Center,
    #[serde(alias = "right")]
    Right,
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Alignment::Left => "LEFT",
            Alignment::Center => "CENTER",
            Alignment::Right => "RIGHT",
        })
    }
}

/// Vertical anchoring of text inside a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerticalAnchor {
    #[serde(alias = "top")]
    Top,
    #[serde(alias = "middle")]
    Middle,
    #[serde(alias = "bottom")]
    Bottom,
}

/// Qualitative content capacity of a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Density {
    #[serde(alias = "LOW")]
    Low,
    #[default]
    #[serde(alias = "MEDIUM")]
    Medium,
    #[serde(alias = "HIGH")]
    High,
}

impl Density {
    /// Whether a layout of this density can carry a slide of `role`.
    pub fn suits(&self, role: SlideRole) -> bool {
        match role {
            SlideRole::Title | SlideRole::Closing => *self != Density::High,
            SlideRole::Diagram | SlideRole::Timeline => *self != Density::Low,
            SlideRole::Agenda | SlideRole::Content => true,
        }
    }
}

/// Placeholder kind as reported by the indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    #[serde(alias = "TITLE", alias = "CENTER_TITLE", alias = "center_title")]
    Title,
    #[serde(alias = "SUBTITLE")]
    Subtitle,
    #[serde(alias = "BODY", alias = "OBJECT", alias = "object")]
    Body,
    #[serde(alias = "FOOTER")]
    Footer,
    #[serde(alias = "DATE")]
    Date,
    #[serde(alias = "SLIDE_NUMBER")]
    SlideNumber,
    #[serde(alias = "PICTURE")]
    Picture,
    #[default]
    #[serde(other)]
    Other,
}

impl ShapeKind {
    /// Footer, date and slide number: template chrome rather than content.
    pub fn is_chrome(&self) -> bool {
        matches!(self, ShapeKind::Footer | ShapeKind::Date | ShapeKind::SlideNumber)
    }

    /// Shapes the Writer may fill with generated text.
    pub fn accepts_text(&self) -> bool {
        matches!(self, ShapeKind::Title | ShapeKind::Subtitle | ShapeKind::Body)
    }
}

/// Placeholder box in points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Geometry {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
    /// Oval or circular outline; text wraps inside the inscribed circle.
    #[serde(default, alias = "is_circular")]
    pub circular: bool,
}

impl Geometry {
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Radius of the inscribed circle, for circular shapes with a size.
    pub fn radius(&self) -> Option<f32> {
        let r = self.width.min(self.height) / 2.0;
        (self.circular && r > 0.0).then_some(r)
    }
}

/// One placeholder shape of a layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeDescriptor {
    #[serde(alias = "idx")]
    pub placeholder_id: PlaceholderId,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "placeholder_type")]
    pub kind: ShapeKind,
    #[serde(default)]
    pub geometry: Geometry,
    /// Text the template ships in this placeholder ("Click to add title", "‹#›" …).
    #[serde(default)]
    pub default_text: Option<String>,
    /// Capacity hint from the indexer.
    #[serde(default)]
    pub max_chars: Option<usize>,
    /// Intrinsic alignment declared by the template.
    #[serde(default)]
    pub alignment: Option<Alignment>,
}

// ── Layout ───────────────────────────────────────────────────────────────

/// Geometry and capability description of one template layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutMetadata {
    #[serde(alias = "layout_index")]
    pub layout_id: LayoutId,
    #[serde(default, alias = "layout_name")]
    pub name: String,
    /// Explicit role affinity; absent in legacy records.
    #[serde(default)]
    pub layout_role: Option<SlideRole>,
    /// Legacy free-text purpose, e.g. `"COMPARISON_SLIDE"`.
    #[serde(default)]
    pub layout_purpose: Option<String>,
    #[serde(default)]
    pub supports_background_image: bool,
    #[serde(default)]
    pub density: Density,
    #[serde(default, alias = "slots")]
    pub shapes: Vec<ShapeDescriptor>,
}

impl LayoutMetadata {
    /// `layout_role` when present, else the role of the legacy purpose.
    pub fn effective_role(&self) -> SlideRole {
        match self.layout_role {
            Some(role) => role,
            None => self
                .layout_purpose
                .as_deref()
                .map(PurposeTag::parse)
                .unwrap_or_default()
                .role(),
        }
    }

    pub fn shape(&self, id: PlaceholderId) -> Option<&ShapeDescriptor> {
        self.shapes.iter().find(|s| s.placeholder_id == id)
    }

    pub fn shapes_of(&self, kind: ShapeKind) -> impl Iterator<Item = &ShapeDescriptor> {
        self.shapes.iter().filter(move |s| s.kind == kind)
    }

    pub fn has_body(&self) -> bool {
        self.shapes_of(ShapeKind::Body).next().is_some()
    }

    pub fn has_title(&self) -> bool {
        self.shapes_of(ShapeKind::Title).next().is_some()
    }
}

// ── Registry ─────────────────────────────────────────────────────────────

fn default_slide_width() -> f32 {
    960.0
}

fn default_slide_height() -> f32 {
    540.0
}

/// All layouts of one template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRegistry {
    #[serde(default)]
    pub template_id: String,
    /// Slide width in points. Default: 960 (16:9).
    #[serde(default = "default_slide_width")]
    pub slide_width: f32,
    /// Slide height in points. Default: 540.
    #[serde(default = "default_slide_height")]
    pub slide_height: f32,
    pub layouts: Vec<LayoutMetadata>,
}

impl TemplateRegistry {
    pub fn new(template_id: impl Into<String>, layouts: Vec<LayoutMetadata>) -> Self {
        Self {
            template_id: template_id.into(),
            slide_width: default_slide_width(),
            slide_height: default_slide_height(),
            layouts,
        }
    }

    pub fn layout(&self, id: LayoutId) -> Option<&LayoutMetadata> {
        self.layouts.iter().find(|l| l.layout_id == id)
    }

    pub fn slide_area(&self) -> f32 {
        (self.slide_width * self.slide_height).max(1.0)
    }

    /// Parse a registry from JSON, rejecting duplicate ids.
    pub fn from_json(json: &str, path: &Path) -> Result<Self, DeckError> {
        let registry: TemplateRegistry =
            serde_json::from_str(json).map_err(|e| DeckError::RegistryLoad {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
        registry.check_ids().map_err(|detail| DeckError::RegistryLoad {
            path: path.to_path_buf(),
            detail,
        })?;
        Ok(registry)
    }

    fn check_ids(&self) -> Result<(), String> {
        let mut layout_ids = HashSet::new();
        for layout in &self.layouts {
            if !layout_ids.insert(layout.layout_id) {
                return Err(format!("duplicate layout id {}", layout.layout_id));
            }
            let mut shape_ids = HashSet::new();
            for shape in &layout.shapes {
                if !shape_ids.insert(shape.placeholder_id) {
                    return Err(format!(
                        "layout {} has duplicate placeholder id {}",
                        layout.layout_id, shape.placeholder_id
                    ));
                }
            }
        }
        Ok(())
    }

    /// Read a single registry file. The file stem is the fallback template id.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DeckError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DeckError::RegistryLoad {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
        let mut registry = Self::from_json(&json, path)?;
        if registry.template_id.is_empty() {
            registry.template_id = file_stem(path);
        }
        Ok(registry)
    }

    /// Per-layout summary used by `inspect_template`.
    pub fn summary(&self) -> Vec<LayoutSummary> {
        self.layouts
            .iter()
            .map(|l| LayoutSummary {
                layout_id: l.layout_id,
                name: l.name.clone(),
                effective_role: l.effective_role(),
                role_inferred: l.layout_role.is_none(),
                density: l.density,
                supports_background_image: l.supports_background_image,
                shape_count: l.shapes.len(),
            })
            .collect()
    }
}

/// What `inspect_template` reports for one layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSummary {
    pub layout_id: LayoutId,
    pub name: String,
    pub effective_role: SlideRole,
    /// `true` when the role came from the legacy purpose field.
    pub role_inferred: bool,
    pub density: Density,
    pub supports_background_image: bool,
    pub shape_count: usize,
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

// ── Store ────────────────────────────────────────────────────────────────

/// Registries indexed by template id.
#[derive(Debug, Default, Clone)]
pub struct RegistryStore {
    registries: BTreeMap<String, Arc<TemplateRegistry>>,
}

impl RegistryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.json` file in `dir`, keyed by file stem.
    ///
    /// Unreadable or invalid files are skipped with a warning; a missing
    /// directory is an error.
    pub async fn load_dir(dir: impl AsRef<Path>) -> Result<Self, DeckError> {
        let dir = dir.as_ref();
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| DeckError::RegistryLoad {
                path: dir.to_path_buf(),
                detail: e.to_string(),
            })?;

        let mut paths: Vec<PathBuf> = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("json")) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut store = Self::new();
        for path in paths {
            match TemplateRegistry::load(&path).await {
                Ok(mut registry) => {
                    let key = file_stem(&path);
                    registry.template_id = key.clone();
                    debug!(
                        "Loaded registry '{}' ({} layouts)",
                        key,
                        registry.layouts.len()
                    );
                    store.registries.insert(key, Arc::new(registry));
                }
                Err(e) => warn!("Skipping registry {}: {}", path.display(), e),
            }
        }

        info!("Loaded {} template registries from {}", store.len(), dir.display());
        Ok(store)
    }

    pub fn insert(&mut self, registry: TemplateRegistry) -> Arc<TemplateRegistry> {
        let registry = Arc::new(registry);
        self.registries
            .insert(registry.template_id.clone(), Arc::clone(&registry));
        registry
    }

    pub fn get(&self, template_id: &str) -> Result<Arc<TemplateRegistry>, DeckError> {
        self.registries
            .get(template_id)
            .cloned()
            .ok_or_else(|| DeckError::TemplateNotFound {
                template: template_id.to_string(),
            })
    }

    pub fn template_ids(&self) -> impl Iterator<Item = &str> {
        self.registries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.registries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registries.is_empty()
    }
}
