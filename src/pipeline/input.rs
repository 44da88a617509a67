//! Input resolution: turn a user-supplied string or path into plain text.
//!
//! Raw text passes straight through. Files are read by extension: `.txt`
//! and `.md` as UTF-8, `.docx` and `.pptx` by unzipping the Office Open XML
//! package and collecting its text runs. Zip and XML parsing are blocking,
//! so they run on `spawn_blocking`.

use crate::error::ExtractionError;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::ZipArchive;

/// What the caller wants a deck made from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeckInput {
    /// Prose supplied directly.
    Text(String),
    /// A `.txt`, `.md`, `.docx` or `.pptx` file.
    File(PathBuf),
}

impl DeckInput {
    /// Treat `arg` as a file when it names an existing file, else as text.
    pub fn detect(arg: &str) -> Self {
        let path = Path::new(arg.trim());
        if !arg.contains('\n') && path.is_file() {
            DeckInput::File(path.to_path_buf())
        } else {
            DeckInput::Text(arg.to_string())
        }
    }
}

impl From<&str> for DeckInput {
    fn from(s: &str) -> Self {
        DeckInput::Text(s.to_string())
    }
}

impl From<String> for DeckInput {
    fn from(s: String) -> Self {
        DeckInput::Text(s)
    }
}

impl From<PathBuf> for DeckInput {
    fn from(p: PathBuf) -> Self {
        DeckInput::File(p)
    }
}

impl From<&Path> for DeckInput {
    fn from(p: &Path) -> Self {
        DeckInput::File(p.to_path_buf())
    }
}

/// Resolve the input to plain text.
pub async fn resolve_input(input: &DeckInput) -> Result<String, ExtractionError> {
    match input {
        DeckInput::Text(text) => Ok(text.clone()),
        DeckInput::File(path) => read_file(path).await,
    }
}

async fn read_file(path: &Path) -> Result<String, ExtractionError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let unreadable = |detail: String| ExtractionError::Unreadable {
        path: path.to_path_buf(),
        detail,
    };

    let text = match ext.as_str() {
        "txt" | "md" | "markdown" => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| unreadable(e.to_string()))?,
        "docx" | "pptx" => {
            let owned = path.to_path_buf();
            let is_docx = ext == "docx";
            tokio::task::spawn_blocking(move || {
                let file = std::fs::File::open(&owned).map_err(|e| e.to_string())?;
                if is_docx {
                    docx_text(file)
                } else {
                    pptx_text(file)
                }
            })
            .await
            .map_err(|e| unreadable(format!("reader task failed: {e}")))?
            .map_err(unreadable)?
        }
        other => {
            return Err(ExtractionError::UnsupportedFormat {
                extension: other.to_string(),
            })
        }
    };

    debug!("Read {} chars from {}", text.len(), path.display());
    Ok(text)
}

// ── Office Open XML ──────────────────────────────────────────────────────

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String, String> {
    let mut entry = archive
        .by_name(name)
        .map_err(|e| format!("missing {name}: {e}"))?;
    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| format!("reading {name}: {e}"))?;
    Ok(xml)
}

/// Concatenate `text_tag` runs, one line per `para_tag`.
fn xml_paragraphs(xml: &str, text_tag: &[u8], para_tag: &[u8]) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == text_tag => in_text = true,
            Ok(Event::End(ref e)) if e.name().as_ref() == text_tag => in_text = false,
            Ok(Event::Text(ref t)) if in_text => {
                let text = t.unescape().map_err(|e| e.to_string())?;
                current.push_str(&text);
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == para_tag => {
                let line = current.trim();
                if !line.is_empty() {
                    paragraphs.push(line.to_string());
                }
                current.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("XML error: {e}")),
            _ => {}
        }
    }
    Ok(paragraphs)
}

fn docx_text<R: Read + Seek>(reader: R) -> Result<String, String> {
    let mut archive = ZipArchive::new(reader).map_err(|e| format!("not a .docx package: {e}"))?;
    let xml = read_entry(&mut archive, "word/document.xml")?;
    Ok(xml_paragraphs(&xml, b"w:t", b"w:p")?.join("\n"))
}

fn pptx_text<R: Read + Seek>(reader: R) -> Result<String, String> {
    let mut archive = ZipArchive::new(reader).map_err(|e| format!("not a .pptx package: {e}"))?;

    let mut slides: Vec<(usize, String)> = archive
        .file_names()
        .filter_map(|name| {
            let num = name
                .strip_prefix("ppt/slides/slide")?
                .strip_suffix(".xml")?
                .parse::<usize>()
                .ok()?;
            Some((num, name.to_string()))
        })
        .collect();
    slides.sort();

    let mut out = Vec::new();
    for (_, name) in slides {
        let xml = read_entry(&mut archive, &name)?;
        out.extend(xml_paragraphs(&xml, b"a:t", b"a:p")?);
    }
    Ok(out.join("\n"))
}
