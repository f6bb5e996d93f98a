use std::env;
use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};

use chunkdb_core::config::{expand_path, Config};
use chunkdb_core::ingest::load_corpus;
use chunkdb_embed::default_embedder;
use chunkdb_engine::CorpusEngine;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let retrieval = config.retrieval();

    let args: Vec<String> = env::args().skip(1).collect();
    let mut corpus_dir: Option<PathBuf> = None;
    let mut limit: Option<usize> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--limit" | "-l" => {
                if let Some(n) = args.get(i + 1).and_then(|v| v.parse::<usize>().ok()) {
                    limit = Some(n);
                    i += 1;
                } else {
                    eprintln!("Error: --limit requires a number");
                    std::process::exit(1);
                }
            }
            arg if !arg.starts_with('-') => corpus_dir = Some(PathBuf::from(arg)),
            _ => {}
        }
        i += 1;
    }
    let corpus_dir = corpus_dir.unwrap_or_else(|| expand_path(&retrieval.data.corpus_dir));

    println!("chunkdb Indexer\n===============");
    println!("Corpus directory: {}", corpus_dir.display());

    let mut docs = load_corpus(&corpus_dir);
    if let Some(limit) = limit {
        println!("🔢 Limiting indexing to {} documents", limit);
        docs.truncate(limit);
    }
    if docs.is_empty() {
        println!("⚠️  No documents found, nothing to index");
        return Ok(());
    }

    let embedder = default_embedder()?;
    let mut engine = CorpusEngine::open(
        embedder,
        &expand_path(&retrieval.data.index_dir),
        &expand_path(&retrieval.data.chunks_dir),
        &expand_path(&retrieval.data.embeddings_dir),
        retrieval.chunking.clone(),
    )?;

    let bar = ProgressBar::new(docs.len() as u64);
    bar.set_style(ProgressStyle::with_template(
        "{bar:40.cyan/blue} {pos}/{len} {msg}",
    )?);
    let mut chunks_indexed = 0usize;
    let mut failed = 0usize;
    for doc in &docs {
        bar.set_message(doc.doc_name.clone());
        match engine.process_document(doc) {
            Ok(n) => chunks_indexed += n,
            Err(e) => {
                failed += 1;
                tracing::error!(doc_name = %doc.doc_name, error = %e, "skipping document");
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    println!("\n✅ Indexing completed successfully!");
    println!(
        "📊 Indexed {} documents ({} chunks)",
        docs.len() - failed,
        chunks_indexed
    );
    if failed > 0 {
        println!("⚠️  {} documents failed, see logs", failed);
    }
    println!("📦 Index now holds {} vectors", engine.store().len());
    println!("\n💡 To search, use: cargo run --bin chunkdb-search '<query>'");
    Ok(())
}
