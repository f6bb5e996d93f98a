//! Per-document artifact files: chunk text and embedding rows.
//!
//! The indexing stage writes both before appending to the store, so a
//! corrupt index can always be rebuilt from them. Chunk files are JSON
//! (`{"doc_name", "page_count", "chunks"}`, array order == chunk_id
//! order); embedding files are bincode matrices with rows in the same
//! order.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use chunkdb_core::error::{Error, Result};
use chunkdb_core::types::ProcessedDocument;

/// 2-D float rows for one document, chunk_id order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingMatrix {
    pub dim: usize,
    pub rows: Vec<Vec<f32>>,
}

pub fn chunk_file_path(chunks_dir: &Path, doc_name: &str) -> PathBuf {
    chunks_dir.join(format!("{doc_name}_chunks.json"))
}

pub fn embedding_file_path(embeddings_dir: &Path, doc_name: &str) -> PathBuf {
    embeddings_dir.join(format!("{doc_name}_embeddings.bin"))
}

/// Write (or fully replace) a document's chunk file.
pub fn write_chunk_file(chunks_dir: &Path, doc: &ProcessedDocument) -> Result<PathBuf> {
    fs::create_dir_all(chunks_dir)?;
    let path = chunk_file_path(chunks_dir, &doc.doc_name);
    let data = serde_json::to_string_pretty(doc).map_err(|e| Error::Serialization(e.to_string()))?;
    fs::write(&path, data)?;
    Ok(path)
}

pub fn read_chunk_file(path: &Path) -> Result<ProcessedDocument> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|e| Error::Serialization(format!("{}: {e}", path.display())))
}

/// Load every chunk file in the directory into a doc_name -> chunk texts
/// map for query-time text resolution. Unreadable files are skipped with
/// a logged error.
pub fn load_chunk_files(chunks_dir: &Path) -> Result<HashMap<String, Vec<String>>> {
    let mut by_doc = HashMap::new();
    if !chunks_dir.exists() {
        return Ok(by_doc);
    }
    for entry in fs::read_dir(chunks_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        match read_chunk_file(&path) {
            Ok(doc) => {
                by_doc.insert(doc.doc_name, doc.chunks);
            }
            Err(e) => {
                tracing::error!(file = %path.display(), error = %e, "skipping unreadable chunk file");
            }
        }
    }
    Ok(by_doc)
}

/// Write (or fully replace) a document's embedding matrix.
pub fn write_embedding_file(
    embeddings_dir: &Path,
    doc_name: &str,
    rows: &[Vec<f32>],
) -> Result<PathBuf> {
    fs::create_dir_all(embeddings_dir)?;
    let dim = rows.first().map_or(0, Vec::len);
    let matrix = EmbeddingMatrix {
        dim,
        rows: rows.to_vec(),
    };
    let path = embedding_file_path(embeddings_dir, doc_name);
    let bytes = bincode::serialize(&matrix).map_err(|e| Error::Serialization(e.to_string()))?;
    fs::write(&path, bytes)?;
    Ok(path)
}

pub fn read_embedding_file(path: &Path) -> Result<EmbeddingMatrix> {
    let bytes = fs::read(path)?;
    bincode::deserialize(&bytes)
        .map_err(|e| Error::Serialization(format!("{}: {e}", path.display())))
}
