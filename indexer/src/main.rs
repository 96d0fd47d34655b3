use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use vecspace_core::config::{ScoringOptions, DEFAULT_SHARDS, DEFAULT_TOP_K};
use vecspace_core::normalizer::{Normalizer, StopWords};
use vecspace_core::persist::{load_meta, load_search_index, load_text_index, save_index, IndexPaths};
use vecspace_core::pipeline::{build, PipelineOptions};
use vecspace_core::scorer::QueryScorer;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "vecspace-indexer")]
#[command(about = "Build a TF-IDF vector-space index and query it", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from a corpus file or a directory of corpus files
    Build {
        /// Input path (file or directory), one `<tag> <doc_id> <text>` record per line
        #[arg(long)]
        input: PathBuf,
        /// Output index directory
        #[arg(long)]
        output: PathBuf,
        /// Stop-word list, one word per line (built-in English list if omitted)
        #[arg(long)]
        stopwords: Option<PathBuf>,
        /// Number of map shards
        #[arg(long, default_value_t = DEFAULT_SHARDS)]
        shards: usize,
        /// Fail on the first malformed record instead of skipping it
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
    /// Rank documents against a free-text query
    Query {
        /// Query text
        query: String,
        /// Posting file written by `build`
        #[arg(long, required_unless_present = "index", requires = "weights")]
        postings: Option<PathBuf>,
        /// Weighted index file written by `build`
        #[arg(long, requires = "postings")]
        weights: Option<PathBuf>,
        /// Index directory (alternative to --postings/--weights)
        #[arg(long, conflicts_with_all = ["postings", "weights"])]
        index: Option<PathBuf>,
        /// Stop-word list; must match the one used at build time
        #[arg(long)]
        stopwords: Option<PathBuf>,
        /// Number of results
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        k: usize,
        /// Abort scoring after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(io::stderr).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, stopwords, shards, strict } => {
            build_index(&input, &output, stopwords.as_deref(), PipelineOptions { shards, strict })
        }
        Commands::Query { query, postings, weights, index, stopwords, k, timeout_ms } => {
            let index = match (index, postings, weights) {
                (Some(dir), _, _) => {
                    let paths = IndexPaths::new(dir);
                    if let Ok(meta) = load_meta(&paths) {
                        tracing::debug!(num_docs = meta.num_docs, created_at = %meta.created_at, version = meta.version, "index metadata");
                    }
                    load_search_index(&paths)?
                }
                (None, Some(p), Some(w)) => load_text_index(p, w)?,
                _ => anyhow::bail!("either --index or both --postings and --weights are required"),
            };
            let mut options = ScoringOptions::with_top_k(k);
            options.timeout = timeout_ms.map(Duration::from_millis);
            let normalizer = load_normalizer(stopwords.as_deref())?;
            let ranking = QueryScorer::new(&index, &normalizer).search(&query, &options)?;
            tracing::info!(total_hits = ranking.total_hits, returned = ranking.hits.len(), "query done");

            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            for hit in &ranking.hits {
                writeln!(out, "{hit}")?;
            }
            out.flush()?;
            Ok(())
        }
    }
}

fn load_normalizer(stopwords: Option<&Path>) -> Result<Normalizer> {
    let words = match stopwords {
        Some(path) => StopWords::load(path).with_context(|| format!("reading stop words from {}", path.display()))?,
        None => StopWords::english(),
    };
    tracing::debug!(stop_words = words.len(), "normalizer ready");
    Ok(Normalizer::english(words))
}

fn corpus_files(input: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
            if entry.file_type().is_file() {
                files.push(entry.path().to_path_buf());
            }
        }
        files.sort();
    } else if input.is_file() {
        files.push(input.to_path_buf());
    }
    files
}

fn corpus_lines(files: Vec<PathBuf>) -> impl Iterator<Item = io::Result<String>> {
    files.into_iter().flat_map(|path| -> Box<dyn Iterator<Item = io::Result<String>>> {
        match File::open(&path) {
            Ok(f) => Box::new(BufReader::new(f).lines()),
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    })
}

fn build_index(input: &Path, output: &Path, stopwords: Option<&Path>, options: PipelineOptions) -> Result<()> {
    let files = corpus_files(input);
    if files.is_empty() {
        anyhow::bail!("no corpus files found under {}", input.display());
    }
    tracing::info!(files = files.len(), shards = options.shards, "building index");

    let normalizer = load_normalizer(stopwords)?;
    let (sealed, report) = build(corpus_lines(files), &normalizer, &options)?;
    if report.rejected > 0 {
        tracing::warn!(rejected = report.rejected, "some records were skipped");
    }

    let weighted = sealed.weigh()?;
    let paths = IndexPaths::new(output);
    let meta = save_index(&paths, &sealed, &weighted)
        .with_context(|| format!("writing index to {}", output.display()))?;

    tracing::info!(
        output = %output.display(),
        num_docs = meta.num_docs,
        num_terms = meta.num_terms,
        records = report.records,
        "index build complete"
    );
    Ok(())
}
