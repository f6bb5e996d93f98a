use tempfile::TempDir;

use chunkdb_core::types::ProcessedDocument;
use chunkdb_index::files::{
    load_chunk_files, read_embedding_file, write_chunk_file, write_embedding_file,
};

#[test]
fn chunk_files_round_trip_by_doc_name() {
    let tmp = TempDir::new().expect("tmp");
    let doc = ProcessedDocument {
        doc_name: "unit1".to_string(),
        page_count: 3,
        chunks: vec!["a b c".to_string(), "c d e".to_string()],
    };
    write_chunk_file(tmp.path(), &doc).expect("write");

    let by_doc = load_chunk_files(tmp.path()).expect("load");
    assert_eq!(by_doc.len(), 1);
    assert_eq!(by_doc["unit1"], doc.chunks);
}

#[test]
fn unreadable_chunk_file_is_skipped() {
    let tmp = TempDir::new().expect("tmp");
    let doc = ProcessedDocument {
        doc_name: "good".to_string(),
        page_count: 1,
        chunks: vec!["text".to_string()],
    };
    write_chunk_file(tmp.path(), &doc).expect("write");
    std::fs::write(tmp.path().join("bad_chunks.json"), "{broken").expect("write");

    let by_doc = load_chunk_files(tmp.path()).expect("load");
    assert_eq!(by_doc.len(), 1);
    assert!(by_doc.contains_key("good"));
}

#[test]
fn embedding_matrix_round_trip() {
    let tmp = TempDir::new().expect("tmp");
    let rows = vec![vec![0.1f32, 0.2, 0.3], vec![0.4, 0.5, 0.6]];
    let path = write_embedding_file(tmp.path(), "unit1", &rows).expect("write");

    let matrix = read_embedding_file(&path).expect("read");
    assert_eq!(matrix.dim, 3);
    assert_eq!(matrix.rows, rows);
}
