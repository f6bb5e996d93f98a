//! Corpus directory ingestion.
//!
//! Turns source files into [`ParsedDocument`]s for the pipeline. Two input
//! shapes are understood: plain `.txt` files (form-feed characters mark
//! page boundaries, as emitted by `pdftotext`) and `.json` files carrying
//! the raw extraction handoff `{"doc_name", "page_count", "pages"}`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::ParsedDocument;

#[derive(Debug, Deserialize)]
struct RawDocumentFile {
    doc_name: String,
    #[serde(default)]
    #[allow(dead_code)]
    page_count: usize,
    pages: Vec<String>,
}

/// List ingestible files under `root`, sorted for deterministic order.
pub fn list_source_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        match path.extension().and_then(|s| s.to_str()) {
            Some("txt") | Some("json") => files.push(path.to_path_buf()),
            _ => {}
        }
    }
    files.sort();
    files
}

/// Parse one source file into a document.
pub fn load_document(path: &Path) -> Result<ParsedDocument> {
    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            let data = fs::read_to_string(path)?;
            let raw: RawDocumentFile = serde_json::from_str(&data)
                .map_err(|e| Error::Chunking(format!("{}: {}", path.display(), e)))?;
            Ok(ParsedDocument {
                doc_name: raw.doc_name,
                pages: raw.pages,
            })
        }
        _ => {
            let content = match fs::read_to_string(path) {
                Ok(content) => content,
                Err(_) => String::from_utf8_lossy(&fs::read(path)?).to_string(),
            };
            let doc_name = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .ok_or_else(|| Error::Chunking(format!("no file stem: {}", path.display())))?;
            // pdftotext separates pages with form feeds; a plain text file
            // without them is a single page.
            let pages: Vec<String> = content.split('\u{c}').map(|p| p.to_string()).collect();
            Ok(ParsedDocument { doc_name, pages })
        }
    }
}

/// Load every source file under `root`, skipping unreadable ones with a
/// logged error so a single bad file never stops corpus ingestion.
pub fn load_corpus(root: &Path) -> Vec<ParsedDocument> {
    let files = list_source_files(root);
    if files.is_empty() {
        tracing::warn!(dir = %root.display(), "no source files found");
        return Vec::new();
    }

    let mut docs = Vec::new();
    for path in &files {
        match load_document(path) {
            Ok(doc) => docs.push(doc),
            Err(e) => {
                tracing::error!(file = %path.display(), error = %e, "skipping unreadable source");
            }
        }
    }
    docs
}
