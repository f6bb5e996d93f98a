//! The vector index store: flat index + metadata side-table, persisted as
//! a matched pair.

use std::cell::Cell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use chunkdb_core::error::{Error, Result};
use chunkdb_core::types::IndexEntry;

use crate::flat::FlatIndex;

pub const INDEX_FILE: &str = "index.bin";
pub const METADATA_FILE: &str = "metadata.json";

const BLOB_VERSION: u32 = 1;

/// Lifecycle of the store. `Building` and `Ready` accept the same
/// operations; the split only records that the first append has fixed the
/// vector dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    Empty,
    Building,
    Ready,
}

/// On-disk form of the vector index. Opaque to everything but this store.
#[derive(Serialize, Deserialize)]
struct IndexBlob {
    version: u32,
    model: Option<String>,
    index: FlatIndex,
}

/// Owns the growing vector index and its metadata table behind a single
/// append/search/persist surface.
///
/// Global index positions are dense from 0 in append order and are never
/// reused, even when a document is reprocessed; reprocessing appends fresh
/// entries and leaves the stale ones behind (resolved defensively at query
/// time). After any completed append the index and the metadata table have
/// equal lengths; persisted state where they disagree is corrupt and is
/// never auto-repaired.
#[derive(Debug)]
pub struct VectorIndexStore {
    index: Option<FlatIndex>,
    metadata: Vec<IndexEntry>,
    model: Option<String>,
    index_dir: PathBuf,
    state: Cell<IndexState>,
}

impl VectorIndexStore {
    /// Open the store rooted at `index_dir`, restoring a persisted pair if
    /// one exists. A half-missing pair or any size disagreement fails with
    /// `IndexCorrupt`; rebuilding from the source artifacts is the only
    /// recovery.
    pub fn open(index_dir: &Path) -> Result<Self> {
        fs::create_dir_all(index_dir)?;
        let index_path = index_dir.join(INDEX_FILE);
        let metadata_path = index_dir.join(METADATA_FILE);

        match (index_path.exists(), metadata_path.exists()) {
            (false, false) => Ok(Self {
                index: None,
                metadata: Vec::new(),
                model: None,
                index_dir: index_dir.to_path_buf(),
                state: Cell::new(IndexState::Empty),
            }),
            (true, true) => Self::restore(index_dir, &index_path, &metadata_path),
            _ => Err(Error::IndexCorrupt(format!(
                "index/metadata pair incomplete in {}",
                index_dir.display()
            ))),
        }
    }

    fn restore(index_dir: &Path, index_path: &Path, metadata_path: &Path) -> Result<Self> {
        let blob_bytes = fs::read(index_path)?;
        let blob: IndexBlob = bincode::deserialize(&blob_bytes)
            .map_err(|e| Error::IndexCorrupt(format!("unreadable index blob: {e}")))?;
        if blob.version != BLOB_VERSION {
            return Err(Error::IndexCorrupt(format!(
                "unsupported index blob version {}",
                blob.version
            )));
        }

        let metadata_text = fs::read_to_string(metadata_path)?;
        let keyed: HashMap<String, IndexEntry> = serde_json::from_str(&metadata_text)
            .map_err(|e| Error::IndexCorrupt(format!("unreadable metadata table: {e}")))?;

        if keyed.len() != blob.index.len() {
            return Err(Error::IndexCorrupt(format!(
                "index holds {} vectors but metadata has {} entries",
                blob.index.len(),
                keyed.len()
            )));
        }

        // Keys must be dense "0".."N-1"; anything else means drift.
        let mut metadata = Vec::with_capacity(keyed.len());
        for position in 0..keyed.len() {
            match keyed.get(&position.to_string()) {
                Some(entry) => metadata.push(entry.clone()),
                None => {
                    return Err(Error::IndexCorrupt(format!(
                        "metadata table is missing position {position}"
                    )))
                }
            }
        }

        let state = if blob.index.is_empty() {
            IndexState::Empty
        } else {
            IndexState::Ready
        };
        tracing::info!(
            vectors = blob.index.len(),
            dim = blob.index.dim(),
            dir = %index_dir.display(),
            "restored vector index"
        );

        Ok(Self {
            index: Some(blob.index),
            metadata,
            model: blob.model,
            index_dir: index_dir.to_path_buf(),
            state: Cell::new(state),
        })
    }

    pub fn state(&self) -> IndexState {
        self.state.get()
    }

    /// Number of stored vectors (== number of metadata entries).
    pub fn len(&self) -> usize {
        self.index.as_ref().map_or(0, FlatIndex::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metadata_len(&self) -> usize {
        self.metadata.len()
    }

    /// Vector dimension, fixed by the first append. `None` while `Empty`.
    pub fn dim(&self) -> Option<usize> {
        self.index.as_ref().map(FlatIndex::dim)
    }

    /// Embedding model identity recorded at first append.
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn set_model(&mut self, id: &str) {
        self.model = Some(id.to_string());
    }

    pub fn entry(&self, position: usize) -> Option<&IndexEntry> {
        self.metadata.get(position)
    }

    /// Metadata positions recorded for one document, in append order.
    pub fn positions_for(&self, doc_name: &str) -> Vec<usize> {
        self.metadata
            .iter()
            .enumerate()
            .filter(|(_, e)| e.doc_name == doc_name)
            .map(|(position, _)| position)
            .collect()
    }

    /// Append a batch of vectors with their provenance. The first
    /// non-empty batch fixes the index dimension. Positions are assigned
    /// densely from the current size, metadata rows are written alongside,
    /// and both structures are persisted together as the final step.
    /// Returns the number of vectors appended.
    pub fn append(&mut self, vectors: &[Vec<f32>], provenance: &[(String, usize)]) -> Result<usize> {
        if vectors.len() != provenance.len() {
            return Err(Error::InvalidConfig(format!(
                "append got {} vectors but {} provenance rows",
                vectors.len(),
                provenance.len()
            )));
        }
        if vectors.is_empty() {
            return Ok(0);
        }

        let first_append = self.index.is_none();
        if first_append {
            self.index = Some(FlatIndex::new(vectors[0].len())?);
        }
        let index = self
            .index
            .as_mut()
            .ok_or_else(|| Error::IndexCorrupt("index missing after init".to_string()))?;

        index.add(vectors)?;
        for (doc_name, chunk_id) in provenance {
            self.metadata.push(IndexEntry {
                doc_name: doc_name.clone(),
                chunk_id: *chunk_id,
            });
        }
        debug_assert_eq!(self.metadata.len(), index.len());

        self.state.set(if first_append {
            IndexState::Building
        } else {
            IndexState::Ready
        });

        self.persist()?;
        Ok(vectors.len())
    }

    /// Exact k-nearest-neighbor search. An empty store returns an empty
    /// result, not an error.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        let Some(index) = self.index.as_ref() else {
            return Ok(Vec::new());
        };
        let hits = index.search(query, k)?;
        if self.state.get() == IndexState::Building {
            self.state.set(IndexState::Ready);
        }
        Ok(hits)
    }

    /// Write the index blob and the metadata table as a matched pair.
    pub fn persist(&self) -> Result<()> {
        let Some(index) = self.index.as_ref() else {
            return Ok(());
        };

        let blob = IndexBlob {
            version: BLOB_VERSION,
            model: self.model.clone(),
            index: index.clone(),
        };
        let blob_bytes = bincode::serialize(&blob).map_err(|e| Error::Serialization(e.to_string()))?;
        fs::write(self.index_dir.join(INDEX_FILE), blob_bytes)?;

        let mut keyed = serde_json::Map::new();
        for (position, entry) in self.metadata.iter().enumerate() {
            keyed.insert(
                position.to_string(),
                serde_json::json!({
                    "doc_name": entry.doc_name,
                    "chunk_id": entry.chunk_id,
                }),
            );
        }
        let metadata_text = serde_json::to_string_pretty(&keyed)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        fs::write(self.index_dir.join(METADATA_FILE), metadata_text)?;

        tracing::debug!(
            vectors = index.len(),
            dir = %self.index_dir.display(),
            "persisted index and metadata"
        );
        Ok(())
    }
}
