//! Corpus ingestion: source files to one raw text.

use colloquy_core::{AppError, AppResult};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Separator placed between documents of a directory corpus.
pub const DOCUMENT_SEPARATOR: &str = "\n\n";

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Markdown,
    Html,
    PlainText,
    Unknown,
}

impl ContentType {
    /// Detect content type from file extension.
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("md") | Some("markdown") => Self::Markdown,
            Some("html") | Some("htm") => Self::Html,
            Some("txt") | Some("text") => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::PlainText => "text",
            Self::Unknown => "unknown",
        }
    }
}

/// Load the corpus at `path`.
///
/// A file is parsed on its own. A directory is walked in file-name order,
/// skipping hidden entries and files that cannot be read as text, and its
/// documents are joined with a blank line.
pub fn load_corpus(path: &Path) -> AppResult<String> {
    if path.is_file() {
        return parse_file(path);
    }
    if !path.is_dir() {
        return Err(AppError::Indexing(format!(
            "Corpus path does not exist: {:?}",
            path
        )));
    }

    let mut documents = Vec::new();
    let walker = WalkDir::new(path)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

    for entry in walker {
        let entry = entry.map_err(|e| AppError::Indexing(format!("Failed to walk corpus: {}", e)))?;
        if !entry.file_type().is_file() {
            continue;
        }

        match parse_file(entry.path()) {
            Ok(text) if text.trim().is_empty() => {
                tracing::debug!("Skipping empty document: {:?}", entry.path());
            }
            Ok(text) => documents.push(text),
            Err(e) => tracing::warn!("Skipping {:?}: {}", entry.path(), e),
        }
    }

    tracing::info!("Loaded {} documents from {:?}", documents.len(), path);
    Ok(documents.join(DOCUMENT_SEPARATOR))
}

/// Parse a source file and extract clean text.
pub fn parse_file(path: &Path) -> AppResult<String> {
    let content_type = ContentType::from_path(path);

    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Indexing(format!("Failed to read {:?}: {}", path, e)))?;

    let cleaned = match content_type {
        ContentType::Markdown => clean_markdown(&raw),
        ContentType::Html => clean_html(&raw),
        ContentType::PlainText => raw,
        ContentType::Unknown if raw.contains('\0') => {
            return Err(AppError::Indexing(format!(
                "Binary file not supported: {:?}",
                path
            )));
        }
        ContentType::Unknown => raw,
    };

    tracing::debug!(
        "Parsed {:?} as {} ({} bytes)",
        path,
        content_type.as_str(),
        cleaned.len()
    );
    Ok(cleaned)
}

/// Strip heading markers, rules and code fences.
fn clean_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for line in text.lines() {
        let trimmed = line.trim_start_matches('#').trim();

        if trimmed.starts_with("---") || trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            continue;
        }

        if !trimmed.is_empty() {
            result.push_str(trimmed);
            result.push('\n');
        }
    }

    result.trim().to_string()
}

fn starts_with_tag(rest: &str, tag: &str) -> bool {
    rest.get(..tag.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(tag))
}

/// Strip tags plus script and style bodies, then collapse whitespace.
fn clean_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;
    let mut in_script = false;
    let mut in_style = false;

    for (i, ch) in text.char_indices() {
        match ch {
            '<' => {
                in_tag = true;
                let rest = &text[i..];
                if starts_with_tag(rest, "<script") {
                    in_script = true;
                } else if starts_with_tag(rest, "</script") {
                    in_script = false;
                } else if starts_with_tag(rest, "<style") {
                    in_style = true;
                } else if starts_with_tag(rest, "</style") {
                    in_style = false;
                }
            }
            '>' => {
                in_tag = false;
                result.push(' ');
            }
            _ if !in_tag && !in_script && !in_style => result.push(ch),
            _ => {}
        }
    }

    result.split_whitespace().collect::<Vec<_>>().join(" ")
}
