use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use collocations::api::{create_router, AppState};
use collocations::export::{write_collocations_csv, write_corpus_csv};
use collocations::{
    CollocationEngine, CollocationParams, CorpusFilter, DocType, MemoryProvider, ParamsInput,
    RelevanceScale, SledCache, Tokenizer, WeightBasis,
};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

// CLI Arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Collocation analysis over a document library", long_about = None)]
struct Cli {
    /// JSON array of tokenized documents
    #[arg(short, long, global = true, default_value = "library.json")]
    library: PathBuf,

    /// Persist scored candidates in a sled database at this path
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute collocations for one word and print the table
    Query(QueryArgs),
    /// Serve the HTTP API
    Serve {
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: String,
    },
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// Target word
    word: String,

    #[arg(long)]
    doctype: Option<DocType>,
    #[arg(long, default_value_t = 1990)]
    from_year: i32,
    #[arg(long, default_value_t = 2020)]
    to_year: i32,
    /// Number of documents in the sample
    #[arg(long, default_value_t = 5000)]
    limit: usize,
    #[arg(long)]
    fulltext: Option<String>,
    #[arg(long)]
    freetext: Option<String>,
    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(long, allow_negative_numbers = true)]
    before: Option<i64>,
    #[arg(long, allow_negative_numbers = true)]
    after: Option<i64>,
    #[arg(long, allow_negative_numbers = true)]
    min_relevance: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    min_raw_count: Option<i64>,
    #[arg(long, allow_negative_numbers = true)]
    head: Option<i64>,
    /// Report the plain observed/expected ratio instead of log2
    #[arg(long)]
    ratio: bool,

    /// Write the collocation table as CSV
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Write the corpus definition as CSV
    #[arg(long)]
    corpus_csv: Option<PathBuf>,
}

impl QueryArgs {
    fn filter(&self) -> CorpusFilter {
        CorpusFilter {
            doctype: self.doctype,
            from_year: self.from_year,
            to_year: self.to_year,
            limit: self.limit,
            fulltext: self.fulltext.clone(),
            freetext: self.freetext.clone(),
            seed: self.seed,
        }
    }

    fn params(&self) -> Result<CollocationParams> {
        let input = ParamsInput {
            target: self.word.clone(),
            before: self.before,
            after: self.after,
            min_relevance: self.min_relevance,
            min_raw_count: self.min_raw_count,
            head: self.head,
            scale: Some(if self.ratio {
                RelevanceScale::Ratio
            } else {
                RelevanceScale::Log2
            }),
            cloud_basis: Some(WeightBasis::RawCount),
        };
        Ok(CollocationParams::try_from(input)?)
    }
}

fn load_library(path: &PathBuf) -> Result<MemoryProvider> {
    let start = Instant::now();
    let file = File::open(path).with_context(|| format!("Failed to open library {}", path.display()))?;
    let provider = MemoryProvider::from_reader(BufReader::new(file), Tokenizer::new())?;
    tracing::info!("Loaded {} documents in {:?}", provider.len(), start.elapsed());
    Ok(provider)
}

fn build_engine(cache: Option<&PathBuf>) -> Result<CollocationEngine> {
    let engine = CollocationEngine::new();
    Ok(match cache {
        Some(path) => engine.with_cache(Arc::new(SledCache::open(path)?)),
        None => engine,
    })
}

fn run_query(cli: &Cli, args: &QueryArgs) -> Result<()> {
    let provider = load_library(&cli.library)?;
    let engine = build_engine(cli.cache.as_ref())?;
    let params = args.params()?;

    let start = Instant::now();
    let (corpus, report) = engine.run(&provider, &args.filter(), &params)?;
    tracing::info!("Computed collocations in {:?}", start.elapsed());

    println!(
        "Corpus size: {} documents, '{}' found {} times",
        report.corpus_size, report.target, report.occurrences
    );
    println!();

    if report.is_empty() {
        println!("No collocates above the thresholds.");
    } else {
        println!("{:<24} {:>12} {:>12}", "collocate", "raw_frequency", "relevance");
        for candidate in &report.collocations {
            println!(
                "{:<24} {:>12} {:>12.4}",
                candidate.token(),
                candidate.raw_count(),
                candidate.relevance()
            );
        }
    }

    if let Some(path) = &args.csv {
        let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        write_collocations_csv(file, &report.collocations)?;
        tracing::info!("Wrote collocation table to {}", path.display());
    }
    if let Some(path) = &args.corpus_csv {
        let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        write_corpus_csv(file, &corpus)?;
        tracing::info!("Wrote corpus definition to {}", path.display());
    }

    Ok(())
}

async fn serve(cli: &Cli, addr: &str) -> Result<()> {
    let provider = if cli.library.exists() {
        Some(Box::new(load_library(&cli.library)?) as Box<dyn collocations::CorpusProvider>)
    } else {
        tracing::warn!(
            "Library {} not found, /query is disabled",
            cli.library.display()
        );
        None
    };

    let state = Arc::new(AppState {
        engine: build_engine(cli.cache.as_ref())?,
        provider,
    });

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on {}", addr);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Command::Query(args) => run_query(&cli, args),
        Command::Serve { addr } => serve(&cli, addr).await,
    }
}
