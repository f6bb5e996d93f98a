use std::path::Path;

use chunkdb_core::config::{expand_path, resolve_with_base, RetrievalConfig};

#[test]
fn defaults_cover_missing_sections() {
    let cfg = RetrievalConfig::default();
    assert_eq!(cfg.chunking.chunk_size, 512);
    assert_eq!(cfg.chunking.overlap, 50);
    assert_eq!(cfg.search.top_k, 10);
    assert_eq!(cfg.data.index_dir, "indexes");
}

#[test]
fn expand_path_handles_env_vars() {
    std::env::set_var("CHUNKDB_TEST_DIR", "/tmp/chunkdb");
    let p = expand_path("${CHUNKDB_TEST_DIR}/data");
    assert_eq!(p, Path::new("/tmp/chunkdb/data"));
}

#[test]
fn resolve_with_base_keeps_absolute_paths() {
    let base = Path::new("/srv/app");
    assert_eq!(resolve_with_base(base, "/var/data"), Path::new("/var/data"));
    assert_eq!(
        resolve_with_base(base, "data/raw"),
        Path::new("/srv/app/data/raw")
    );
}
