//! Domain types shared by the chunking, indexing and query stages.

use serde::{Deserialize, Serialize};

/// A parsed source document as handed over by the ingestion stage.
///
/// - `doc_name`: stable document identity (file stem or external id)
/// - `pages`: ordered page texts; a document is immutable once parsed and
///   is fully replaced on re-ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub doc_name: String,
    pub pages: Vec<String>,
}

/// Chunking output for one document, persisted as the chunk artifact file.
///
/// `chunks` order is the chunk_id order: the chunk at array position `i`
/// has document-local id `i`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedDocument {
    pub doc_name: String,
    pub page_count: usize,
    pub chunks: Vec<String>,
}

/// Provenance row stored in the metadata side-table, one per global index
/// position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub doc_name: String,
    pub chunk_id: usize,
}

/// One ranked retrieval hit. `distance` is squared Euclidean, lower is
/// closer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedResult {
    pub doc_name: String,
    pub chunk_id: usize,
    pub distance: f32,
    pub chunk_text: String,
}
