use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tutor_core::config::{ChunkingSettings, Config, EmbeddingSettings, LexicalSettings, RetrievalSettings, StoreSettings};
use tutor_core::data_processor::{DataProcessor, TextSplitter};
use tutor_core::traits::VectorStore;
use tutor_embed::get_default_embedder;
use tutor_hybrid::context::context_or_placeholder;
use tutor_hybrid::HybridRetriever;
use tutor_vector::{DenseIndex, LanceStore};

/// Course-material retrieval: ingest notes, then search them with BM25 and
/// embeddings fused by reciprocal rank.
#[derive(Parser)]
#[command(name = "tutor", version, about)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Chunk, embed and store every .txt/.md file under a directory
    Ingest {
        /// Source directory (default: `data.dir` from config)
        dir: Option<PathBuf>,
        /// Empty the table before inserting
        #[arg(long)]
        clear: bool,
        /// Only read the first N files
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Retrieve the chunks most relevant to a question
    Query {
        text: String,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Skip the lexical index even when hybrid retrieval is configured
        #[arg(long, conflicts_with = "hybrid")]
        dense_only: bool,
        /// Force hybrid retrieval even when disabled in config
        #[arg(long)]
        hybrid: bool,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show how many chunks the store holds
    Status,
}

fn open_store(config: &Config) -> Result<LanceStore> {
    let store: StoreSettings = config.section("store")?;
    let path = store.resolved_path(&std::env::current_dir()?);
    LanceStore::open(&path, &store.table)
}

fn ingest(config: &Config, dir: Option<PathBuf>, clear: bool, limit: Option<usize>) -> Result<()> {
    let data_dir = dir.unwrap_or_else(|| PathBuf::from(config.get::<String>("data.dir").unwrap_or_else(|_| "./data".to_string())));
    let chunking: ChunkingSettings = config.section("chunking")?;
    let embedding: EmbeddingSettings = config.section("embedding")?;

    println!("Data directory: {}", data_dir.display());
    let processor = DataProcessor::with_splitter(TextSplitter::from_settings(&chunking));
    let records = match limit {
        Some(n) => processor.process_directory_limited(&data_dir, n)?,
        None => processor.process_directory(&data_dir)?,
    };
    if records.is_empty() {
        println!("No text found; nothing to ingest");
        return Ok(());
    }

    let store = open_store(config)?;
    if clear {
        store.clear()?;
        println!("Cleared table '{}'", store.table_name());
    }
    let dense = DenseIndex::new(get_default_embedder(&embedding)?, store);

    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")?.progress_chars("#>-"));
    let written = dense.add_documents(&records, embedding.batch_size, Some(&pb))?;
    pb.finish_with_message("done");

    println!("Stored {} chunks; table now holds {}", written, dense.store().count()?);
    Ok(())
}

fn query(config: &Config, text: &str, top_k: Option<usize>, dense_only: bool, force_hybrid: bool, json: bool) -> Result<()> {
    let retrieval: RetrievalSettings = config.section("retrieval")?;
    let lexical: LexicalSettings = config.section("lexical")?;
    let embedding: EmbeddingSettings = config.section("embedding")?;
    let top_k = top_k.unwrap_or(retrieval.top_k);
    let use_hybrid = !dense_only && (force_hybrid || retrieval.hybrid);

    let dense = DenseIndex::new(get_default_embedder(&embedding)?, open_store(config)?);
    let retriever = HybridRetriever::new(dense, retrieval, lexical);
    if use_hybrid {
        let n = retriever.rebuild_from_dense()?;
        info!(documents = n, "lexical index ready");
    }
    let results = retriever.query(text, top_k)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    println!("Query: {} ({} mode)", text, if use_hybrid { "hybrid" } else { "dense" });
    for (i, r) in results.iter().enumerate() {
        let id = r.meta.identifier.as_deref().unwrap_or(&r.meta.filepath);
        println!("\n  {}. score={:.4}  origin={}  id={}", i + 1, r.score, r.origin, id);
        let snippet: String = r.content.chars().take(160).collect();
        println!("     {}", snippet.replace('\n', " "));
    }
    println!("\n--- context ---\n{}", context_or_placeholder(&results));
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    match cli.command {
        Command::Ingest { dir, clear, limit } => ingest(&config, dir, clear, limit),
        Command::Query { text, top_k, dense_only, hybrid, json } => query(&config, &text, top_k, dense_only, hybrid, json),
        Command::Status => {
            let store = open_store(&config)?;
            println!("Table '{}' holds {} chunks", store.table_name(), store.count()?);
            Ok(())
        }
    }
}
