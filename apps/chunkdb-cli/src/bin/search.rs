use std::env;

use chunkdb_core::config::{expand_path, Config};
use chunkdb_embed::default_embedder;
use chunkdb_engine::CorpusEngine;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <query> [--limit N] [index_dir]", args[0]);
        eprintln!("Example: {} 'how to purify water' --limit 5", args[0]);
        std::process::exit(1);
    }
    let query = &args[1];

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let retrieval = config.retrieval();

    let mut limit = retrieval.search.top_k;
    let mut index_dir = expand_path(&retrieval.data.index_dir);
    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--limit" | "-k" => {
                if let Some(n) = args.get(i + 1).and_then(|v| v.parse::<usize>().ok()) {
                    limit = n;
                    i += 1;
                } else {
                    eprintln!("Error: --limit requires a number");
                    std::process::exit(1);
                }
            }
            arg if !arg.starts_with('-') => index_dir = expand_path(arg),
            _ => {}
        }
        i += 1;
    }

    println!("🔍 chunkdb-search\n================");
    println!("Query: {}", query);

    let embedder = default_embedder()?;
    let engine = CorpusEngine::open(
        embedder,
        &index_dir,
        &expand_path(&retrieval.data.chunks_dir),
        &expand_path(&retrieval.data.embeddings_dir),
        retrieval.chunking.clone(),
    )?;

    let results = engine.retrieve(query, limit);
    if results.is_empty() {
        println!("\nNo results (is the index built? run chunkdb-indexer first)");
        return Ok(());
    }

    println!("\n🔍 Found {} results for: \"{}\"", results.len(), query);
    for (i, result) in results.iter().enumerate() {
        println!(
            "\n  {}. distance={:.4}  doc={}  chunk={}",
            i + 1,
            result.distance,
            result.doc_name,
            result.chunk_id
        );
        println!("     📝 {}", result.chunk_text);
    }
    Ok(())
}
