//! The corpus engine: document processing on one side, ranked retrieval
//! on the other.
//!
//! One engine owns one corpus: its embedder handle, its vector index
//! store, and the chunk texts needed to resolve hits back into readable
//! results.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chunkdb_core::chunker::chunk_document;
use chunkdb_core::config::ChunkingConfig;
use chunkdb_core::error::{Error, Result};
use chunkdb_core::traits::Embedder;
use chunkdb_core::types::{ParsedDocument, RankedResult};
use chunkdb_index::files::{load_chunk_files, write_chunk_file, write_embedding_file};
use chunkdb_index::VectorIndexStore;

/// Substituted when a hit's chunk_id no longer resolves into the
/// document's chunk array (stale metadata after reprocessing).
pub const CHUNK_NOT_FOUND: &str = "Chunk not found";

pub struct CorpusEngine {
    embedder: Box<dyn Embedder>,
    store: VectorIndexStore,
    chunking: ChunkingConfig,
    chunks_dir: PathBuf,
    embeddings_dir: PathBuf,
    chunk_texts: HashMap<String, Vec<String>>,
}

impl CorpusEngine {
    /// Open (or create) the corpus rooted at the given directories. The
    /// embedder is constructed once by the caller and handed in; its model
    /// identity is checked against the restored index and a mismatch is
    /// logged, since distances across models are meaningless.
    pub fn open(
        embedder: Box<dyn Embedder>,
        index_dir: &Path,
        chunks_dir: &Path,
        embeddings_dir: &Path,
        chunking: ChunkingConfig,
    ) -> Result<Self> {
        let store = VectorIndexStore::open(index_dir)?;
        if let Some(model) = store.model() {
            if model != embedder.embedder_id() {
                tracing::warn!(
                    index_model = %model,
                    embedder = %embedder.embedder_id(),
                    "index was built with a different embedding model; distances are not comparable"
                );
            }
        }
        let chunk_texts = load_chunk_files(chunks_dir)?;

        Ok(Self {
            embedder,
            store,
            chunking,
            chunks_dir: chunks_dir.to_path_buf(),
            embeddings_dir: embeddings_dir.to_path_buf(),
            chunk_texts,
        })
    }

    pub fn store(&self) -> &VectorIndexStore {
        &self.store
    }

    /// Chunk, persist artifacts, embed and index one document. Embedding
    /// is all-or-nothing: a failed batch aborts before anything reaches
    /// the store, so no partial append can happen. Returns the number of
    /// vectors appended.
    ///
    /// Reprocessing a document replaces its chunk and embedding files and
    /// appends fresh index entries; earlier positions stay behind as
    /// stale provenance and are resolved defensively at query time.
    pub fn process_document(&mut self, doc: &ParsedDocument) -> Result<usize> {
        let processed = chunk_document(doc, &self.chunking)?;
        write_chunk_file(&self.chunks_dir, &processed)?;
        if processed.chunks.is_empty() {
            tracing::warn!(doc_name = %doc.doc_name, "document produced no chunks");
            self.chunk_texts
                .insert(processed.doc_name.clone(), Vec::new());
            return Ok(0);
        }

        let vectors = self
            .embedder
            .embed_batch(&processed.chunks)
            .map_err(|e| Error::Embedding(e.to_string()))?;
        write_embedding_file(&self.embeddings_dir, &processed.doc_name, &vectors)?;

        if self.store.model().is_none() {
            self.store.set_model(self.embedder.embedder_id());
        }
        let provenance: Vec<(String, usize)> = (0..vectors.len())
            .map(|chunk_id| (processed.doc_name.clone(), chunk_id))
            .collect();
        let appended = self.store.append(&vectors, &provenance)?;

        tracing::info!(
            doc_name = %processed.doc_name,
            chunks = appended,
            "indexed document"
        );
        self.chunk_texts
            .insert(processed.doc_name.clone(), processed.chunks);
        Ok(appended)
    }

    /// Process a whole corpus with per-document failure isolation: one
    /// bad document logs an error and is skipped, the rest still index.
    /// Returns the number of documents successfully processed.
    pub fn process_corpus(&mut self, docs: &[ParsedDocument]) -> usize {
        let mut processed = 0usize;
        for doc in docs {
            match self.process_document(doc) {
                Ok(_) => processed += 1,
                Err(e) => {
                    tracing::error!(doc_name = %doc.doc_name, error = %e, "skipping document");
                }
            }
        }
        tracing::info!(processed, total = docs.len(), "corpus processing done");
        processed
    }

    /// Embed the query and return the `top_k` closest chunks, ascending
    /// by distance. Best effort by design: embedding failures and an
    /// empty index both yield an empty result, logged but never raised,
    /// so a query cannot take down the surrounding service.
    pub fn retrieve(&self, query: &str, top_k: usize) -> Vec<RankedResult> {
        let query_vector = match self.embedder.embed_batch(&[query.to_string()]) {
            Ok(mut batch) if !batch.is_empty() => batch.remove(0),
            Ok(_) => return Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "query embedding failed");
                return Vec::new();
            }
        };
        if query_vector.is_empty() {
            return Vec::new();
        }

        let hits = match self.store.search(&query_vector, top_k) {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(error = %e, "index search failed");
                return Vec::new();
            }
        };

        let mut results = Vec::with_capacity(hits.len());
        for (position, distance) in hits {
            // A missing entry means index/metadata drift; drop the hit
            // rather than the whole query.
            let Some(entry) = self.store.entry(position) else {
                tracing::warn!(position, "search hit has no metadata entry");
                continue;
            };
            let chunk_text = self
                .chunk_texts
                .get(&entry.doc_name)
                .and_then(|chunks| chunks.get(entry.chunk_id))
                .cloned()
                .unwrap_or_else(|| CHUNK_NOT_FOUND.to_string());
            results.push(RankedResult {
                doc_name: entry.doc_name.clone(),
                chunk_id: entry.chunk_id,
                distance,
                chunk_text,
            });
        }
        tracing::info!(hits = results.len(), "query resolved");
        results
    }
}
