mod corpus;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docsearch_core::persist::{load_index, load_meta, save_index, save_meta, Encoding, IndexPaths, MetaFile, FORMAT_VERSION};
use docsearch_core::{parse_top_k, Config, SearchEngine};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build, inspect and query documentation search indexes", long_about = None)]
struct Cli {
    /// TOML config file; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from a corpus file (JSON, JSONL, search_index.js) or directory
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: PathBuf,
        /// Output index directory
        #[arg(long)]
        output: PathBuf,
        /// binary or json
        #[arg(long, default_value = "binary")]
        format: Encoding,
        /// Fold repeated page records that share a location into one
        #[arg(long, default_value_t = false)]
        merge_page_blocks: bool,
        #[arg(long)]
        min_token_length: Option<usize>,
        /// Build workers (0 = one per core)
        #[arg(long)]
        threads: Option<usize>,
    },
    /// Print summary statistics for an index
    Inspect {
        #[arg(long)]
        index: PathBuf,
        /// How many of the most common terms to list
        #[arg(long, default_value_t = 20)]
        top_terms: usize,
    },
    /// Run a query against an index
    Search {
        #[arg(long)]
        index: PathBuf,
        #[arg(long)]
        query: String,
        /// Maximum number of results
        #[arg(long, allow_hyphen_values = true)]
        k: Option<String>,
        #[arg(long, default_value_t = false)]
        group_by_page: bool,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Build { input, output, format, merge_page_blocks, min_token_length, threads } => {
            if let Some(n) = min_token_length { config.min_token_length = n; }
            if let Some(n) = threads { config.threads = n; }
            config.validate()?;
            build_index(&config, &input, &output, format, merge_page_blocks)
        }
        Commands::Inspect { index, top_terms } => inspect_index(&index, top_terms),
        Commands::Search { index, query, k, group_by_page } => {
            if group_by_page { config.group_by_page = true; }
            search_index(&config, &index, &query, k.as_deref())
        }
    }
}

fn build_index(config: &Config, input: &Path, output: &Path, format: Encoding, merge_page_blocks: bool) -> Result<()> {
    let mut docs = corpus::load(input).with_context(|| format!("reading corpus {}", input.display()))?;
    tracing::info!(records = docs.len(), "ingested records");
    if merge_page_blocks {
        docs = corpus::merge_page_blocks(docs);
    }

    let index = config.builder().build(&docs).context("building index")?;
    let out_paths = IndexPaths::new(output);
    let written = save_index(&out_paths, &index, format)?;

    let meta = MetaFile {
        num_docs: index.num_docs() as u32,
        num_terms: index.num_terms() as u32,
        created_at: time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339).unwrap_or_default(),
        version: FORMAT_VERSION,
        encoding: format,
    };
    save_meta(&out_paths, &meta)?;

    tracing::info!(output = %written.display(), "index build complete");
    Ok(())
}

fn inspect_index(dir: &Path, top_terms: usize) -> Result<()> {
    let paths = IndexPaths::new(dir);
    let index = load_index(&paths)?;
    if let Ok(meta) = load_meta(&paths) {
        println!("created:   {} ({:?}, format v{})", meta.created_at, meta.encoding, meta.version);
    }
    let anchored = index.docs().iter().filter(|d| !d.category.is_page()).count();
    let orphans = index.docs().iter().filter(|d| !d.category.is_page() && d.parent.is_none()).count();
    println!("documents: {} ({} anchored, {} without a page record)", index.num_docs(), anchored, orphans);
    println!("terms:     {}", index.num_terms());
    println!("avg len:   {:.2}", index.avg_doc_len());

    let mut by_df: Vec<(&str, usize)> = index.terms().map(|(t, p)| (t, p.len())).collect();
    by_df.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    for (term, df) in by_df.into_iter().take(top_terms) {
        println!("  {df:>6}  {term}");
    }
    Ok(())
}

fn search_index(config: &Config, dir: &Path, query: &str, k: Option<&str>) -> Result<()> {
    let index = load_index(&IndexPaths::new(dir))?;
    let engine = SearchEngine::new(Arc::new(index), config.search_options());
    let hits = match k {
        Some(raw) => engine.search(query, parse_top_k(raw)?)?,
        None => engine.search_default(query)?,
    };
    for hit in hits {
        let line = serde_json::json!({
            "location": hit.location,
            "page": hit.page,
            "title": hit.title,
            "category": hit.category,
            "score": hit.score,
            "parent": hit.parent,
            "snippet": hit.snippet.to_string(),
        });
        println!("{line}");
    }
    Ok(())
}
