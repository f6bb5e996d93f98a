//! Text cleaning and overlapping token-window chunking.
//!
//! Chunks are the unit of embedding and retrieval: whitespace-joined token
//! windows of at most `chunk_size` tokens, consecutive windows sharing
//! `overlap` tokens. Chunk ids are the 0-based emission order within one
//! document; re-chunking a document regenerates all of them.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::{ParsedDocument, ProcessedDocument};

// Patterns are fixed; compiled once on first use.
static PAGE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*Page\s+\d+\s*$").expect("static regex"));
static DASH_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*-\s*$").expect("static regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

/// Remove page furniture and normalize whitespace in raw page text.
///
/// Strips standalone page-number lines ("Page 12") and stray dash-only
/// lines left behind by PDF extraction, then collapses runs of whitespace
/// into single spaces.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = PAGE_MARKER.replace_all(text, "");
    let text = DASH_LINE.replace_all(&text, "");
    let text = WHITESPACE.replace_all(&text, " ");
    text.trim().to_string()
}

/// Split cleaned text into overlapping token-bounded chunks.
///
/// Windows cover `[i, min(i + chunk_size, N))` and advance by
/// `chunk_size - overlap`; the walk stops once a window reaches the end of
/// the token sequence. When the document exceeds `chunk_size` tokens, one
/// extra chunk covering the last `chunk_size` tokens is appended so the
/// tail is never under-represented by a short final window; it is skipped
/// only when identical to the chunk just emitted. Duplication with earlier
/// chunks is accepted.
///
/// Empty or whitespace-only input yields no chunks.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    if chunk_size == 0 || overlap >= chunk_size {
        return Err(Error::InvalidConfig(format!(
            "overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
        )));
    }

    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    let step = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + chunk_size).min(tokens.len());
        chunks.push(tokens[start..end].join(" "));
        if end == tokens.len() {
            break;
        }
        start += step;
    }

    if tokens.len() > chunk_size {
        let tail = tokens[tokens.len() - chunk_size..].join(" ");
        if chunks.last().map(String::as_str) != Some(tail.as_str()) {
            chunks.push(tail);
        }
    }

    Ok(chunks)
}

/// Clean and chunk every page of a parsed document.
///
/// Pages are chunked independently; the document's chunk ids run across
/// the concatenation in emission order. Pages that clean down to nothing
/// are dropped with a warning.
pub fn chunk_document(doc: &ParsedDocument, cfg: &ChunkingConfig) -> Result<ProcessedDocument> {
    let mut chunks = Vec::new();
    for (page_no, page_text) in doc.pages.iter().enumerate() {
        let cleaned = clean_text(page_text);
        if cleaned.is_empty() {
            tracing::warn!(doc_name = %doc.doc_name, page = page_no, "no clean text on page");
            continue;
        }
        chunks.extend(chunk_text(&cleaned, cfg.chunk_size, cfg.overlap)?);
    }

    Ok(ProcessedDocument {
        doc_name: doc.doc_name.clone(),
        page_count: doc.pages.len(),
        chunks,
    })
}
