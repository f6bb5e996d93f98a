use std::fs;

use tempfile::TempDir;

use chunkdb_core::error::Error;
use chunkdb_index::store::{IndexState, VectorIndexStore, INDEX_FILE, METADATA_FILE};

fn prov(doc: &str, ids: &[usize]) -> Vec<(String, usize)> {
    ids.iter().map(|&i| (doc.to_string(), i)).collect()
}

#[test]
fn two_batches_assign_dense_positions() {
    let tmp = TempDir::new().expect("tmp");
    let mut store = VectorIndexStore::open(tmp.path()).expect("open");
    assert_eq!(store.state(), IndexState::Empty);
    assert_eq!(store.dim(), None);

    let batch1 = vec![vec![1.0, 0.0, 0.0, 0.0], vec![0.0, 1.0, 0.0, 0.0]];
    let batch2 = vec![
        vec![0.0, 0.0, 1.0, 0.0],
        vec![0.0, 0.0, 0.0, 1.0],
        vec![0.5, 0.5, 0.5, 0.5],
    ];

    assert_eq!(store.append(&batch1, &prov("doc_a", &[0, 1])).expect("append"), 2);
    assert_eq!(store.state(), IndexState::Building);
    assert_eq!(store.dim(), Some(4));

    assert_eq!(
        store.append(&batch2, &prov("doc_b", &[0, 1, 2])).expect("append"),
        3
    );
    assert_eq!(store.state(), IndexState::Ready);

    // Positions 0,1 then 2,3,4; metadata for position 4 is the third
    // vector of the second batch.
    assert_eq!(store.len(), 5);
    assert_eq!(store.metadata_len(), store.len());
    let entry = store.entry(4).expect("entry 4");
    assert_eq!(entry.doc_name, "doc_b");
    assert_eq!(entry.chunk_id, 2);
    assert!(store.entry(5).is_none());
}

#[test]
fn empty_store_query_returns_empty() {
    let tmp = TempDir::new().expect("tmp");
    let store = VectorIndexStore::open(tmp.path()).expect("open");
    let hits = store.search(&[1.0, 2.0, 3.0], 5).expect("search");
    assert!(hits.is_empty());
}

#[test]
fn k_larger_than_store_returns_all() {
    let tmp = TempDir::new().expect("tmp");
    let mut store = VectorIndexStore::open(tmp.path()).expect("open");
    let vectors = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]];
    store.append(&vectors, &prov("doc", &[0, 1, 2])).expect("append");

    let hits = store.search(&[0.0, 0.0], 10).expect("search");
    assert_eq!(hits.len(), 3);
}

#[test]
fn exact_match_ranks_first_with_zero_distance() {
    let tmp = TempDir::new().expect("tmp");
    let mut store = VectorIndexStore::open(tmp.path()).expect("open");
    let vectors = vec![vec![3.0, 4.0], vec![1.0, 1.0], vec![9.0, 9.0]];
    store.append(&vectors, &prov("doc", &[0, 1, 2])).expect("append");

    let hits = store.search(&[1.0, 1.0], 3).expect("search");
    assert_eq!(hits[0].0, 1);
    assert!(hits[0].1.abs() < 1e-6);
    // Ascending distance order.
    assert!(hits[0].1 <= hits[1].1 && hits[1].1 <= hits[2].1);
}

#[test]
fn ties_break_by_insertion_order() {
    let tmp = TempDir::new().expect("tmp");
    let mut store = VectorIndexStore::open(tmp.path()).expect("open");
    // Positions 1 and 2 are equidistant from the query.
    let vectors = vec![vec![5.0, 5.0], vec![2.0, 2.0], vec![2.0, 2.0]];
    store.append(&vectors, &prov("doc", &[0, 1, 2])).expect("append");

    let hits = store.search(&[2.0, 2.0], 3).expect("search");
    assert_eq!(hits[0].0, 1, "earlier position wins the tie");
    assert_eq!(hits[1].0, 2);
    assert_eq!(hits[0].1, hits[1].1);
}

#[test]
fn dimension_mismatch_is_rejected() {
    let tmp = TempDir::new().expect("tmp");
    let mut store = VectorIndexStore::open(tmp.path()).expect("open");
    store
        .append(&[vec![1.0, 2.0, 3.0]], &prov("doc", &[0]))
        .expect("append");

    let err = store
        .append(&[vec![1.0, 2.0]], &prov("doc", &[1]))
        .expect_err("short vector");
    assert!(matches!(
        err,
        Error::DimensionMismatch {
            expected: 3,
            actual: 2
        }
    ));
    // A failed batch leaves both structures untouched.
    assert_eq!(store.len(), 1);
    assert_eq!(store.metadata_len(), 1);

    let err = store.search(&[1.0], 1).expect_err("short query");
    assert!(matches!(err, Error::DimensionMismatch { .. }));
}

#[test]
fn provenance_length_must_match() {
    let tmp = TempDir::new().expect("tmp");
    let mut store = VectorIndexStore::open(tmp.path()).expect("open");
    let err = store
        .append(&[vec![1.0, 2.0]], &prov("doc", &[0, 1]))
        .expect_err("length mismatch");
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[test]
fn empty_append_is_a_noop() {
    let tmp = TempDir::new().expect("tmp");
    let mut store = VectorIndexStore::open(tmp.path()).expect("open");
    assert_eq!(store.append(&[], &[]).expect("append"), 0);
    assert_eq!(store.state(), IndexState::Empty);
    assert_eq!(store.dim(), None);
}

#[test]
fn persist_restore_round_trip_preserves_search() {
    let tmp = TempDir::new().expect("tmp");
    let query = vec![0.2, 0.4, 0.6];
    let before = {
        let mut store = VectorIndexStore::open(tmp.path()).expect("open");
        store.set_model("fake:xxhash:d3");
        let vectors = vec![
            vec![0.1, 0.2, 0.3],
            vec![0.9, 0.8, 0.7],
            vec![0.2, 0.4, 0.6],
            vec![0.5, 0.5, 0.5],
        ];
        store
            .append(&vectors, &prov("doc_a", &[0, 1, 2, 3]))
            .expect("append");
        store.search(&query, 4).expect("search")
    };

    let restored = VectorIndexStore::open(tmp.path()).expect("reopen");
    assert_eq!(restored.len(), 4);
    assert_eq!(restored.metadata_len(), 4);
    assert_eq!(restored.state(), IndexState::Ready);
    assert_eq!(restored.model(), Some("fake:xxhash:d3"));

    let after = restored.search(&query, 4).expect("search");
    assert_eq!(before, after, "same positions, distances and order");
}

#[test]
fn restore_rejects_size_divergence() {
    let tmp = TempDir::new().expect("tmp");
    {
        let mut store = VectorIndexStore::open(tmp.path()).expect("open");
        store
            .append(
                &[vec![1.0, 0.0], vec![0.0, 1.0]],
                &prov("doc", &[0, 1]),
            )
            .expect("append");
    }

    // Drop one metadata entry; the pair no longer matches.
    let metadata_path = tmp.path().join(METADATA_FILE);
    fs::write(
        &metadata_path,
        r#"{"0": {"doc_name": "doc", "chunk_id": 0}}"#,
    )
    .expect("tamper");

    let err = VectorIndexStore::open(tmp.path()).expect_err("must refuse");
    assert!(matches!(err, Error::IndexCorrupt(_)));
}

#[test]
fn restore_rejects_unknown_blob_version() {
    let tmp = TempDir::new().expect("tmp");
    {
        let mut store = VectorIndexStore::open(tmp.path()).expect("open");
        store
            .append(&[vec![1.0, 0.0]], &prov("doc", &[0]))
            .expect("append");
    }

    // The blob starts with a little-endian u32 version; bump it past
    // anything this build understands.
    let index_path = tmp.path().join(INDEX_FILE);
    let mut bytes = fs::read(&index_path).expect("read");
    bytes[0] = 99;
    fs::write(&index_path, bytes).expect("tamper");

    let err = VectorIndexStore::open(tmp.path()).expect_err("must refuse");
    assert!(matches!(err, Error::IndexCorrupt(_)));
}

#[test]
fn restore_rejects_non_dense_metadata() {
    let tmp = TempDir::new().expect("tmp");
    {
        let mut store = VectorIndexStore::open(tmp.path()).expect("open");
        store
            .append(
                &[vec![1.0, 0.0], vec![0.0, 1.0]],
                &prov("doc", &[0, 1]),
            )
            .expect("append");
    }

    // Right size, but a gap at position 1.
    fs::write(
        tmp.path().join(METADATA_FILE),
        r#"{"0": {"doc_name": "doc", "chunk_id": 0}, "2": {"doc_name": "doc", "chunk_id": 2}}"#,
    )
    .expect("tamper");

    let err = VectorIndexStore::open(tmp.path()).expect_err("must refuse");
    assert!(matches!(err, Error::IndexCorrupt(_)));
}

#[test]
fn restore_rejects_half_missing_pair() {
    let tmp = TempDir::new().expect("tmp");
    {
        let mut store = VectorIndexStore::open(tmp.path()).expect("open");
        store
            .append(&[vec![1.0, 0.0]], &prov("doc", &[0]))
            .expect("append");
    }
    fs::remove_file(tmp.path().join(METADATA_FILE)).expect("remove");

    let err = VectorIndexStore::open(tmp.path()).expect_err("must refuse");
    assert!(matches!(err, Error::IndexCorrupt(_)));
}
