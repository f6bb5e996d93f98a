//! Exact-search vector index with its metadata side-table and on-disk
//! artifacts.
//!
//! The store is the one component allowed to touch the vector index and
//! the metadata table, so their "same length, same order" invariant is
//! enforced in a single place rather than by caller discipline.

pub mod files;
pub mod flat;
pub mod store;

pub use flat::FlatIndex;
pub use store::{IndexState, VectorIndexStore};
