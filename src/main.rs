//! `intent` command-line entrypoint.

use std::collections::BTreeMap;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use serde::Serialize;

use intent::config::{HybridConfig, ServiceConfig};
use intent::intent::DetectionContext;
use intent::service::{HybridIntentService, HybridIntentServiceBuilder, service_embedder};
use intent::text::TextNormalizer;
use intent::vectordb::{IntentCorpus, QdrantIndex, index_corpus};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Hybrid rule + vector intent detection for university queries.
#[derive(Parser, Debug)]
#[command(name = "intent")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Rule-set JSON file (overrides INTENT_RULES_PATH)
    #[arg(long, global = true, value_name = "FILE")]
    rules: Option<PathBuf>,

    /// Qdrant endpoint (overrides INTENT_QDRANT_URL)
    #[arg(long, global = true, value_name = "URL")]
    qdrant_url: Option<String>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect the intent of one or more queries
    Detect {
        #[arg(required = true, value_name = "QUERY")]
        queries: Vec<String>,

        #[arg(long)]
        user: Option<String>,

        #[arg(long)]
        session: Option<String>,
    },

    /// Detect every line of a file ("-" reads stdin)
    Batch {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Overrides INTENT_MAX_CONCURRENT
        #[arg(long)]
        max_concurrent: Option<usize>,
    },

    /// Embed an intent example corpus and upsert it into Qdrant
    Index {
        #[arg(value_name = "CORPUS")]
        corpus: PathBuf,
    },

    /// Show normalization, language and relevance details for a query
    Analyze {
        #[arg(value_name = "QUERY")]
        query: String,
    },

    /// Show rule, index, cache and reranker status
    Stats,
}

#[derive(Serialize)]
struct BatchReport {
    count: usize,
    elapsed_ms: f64,
    queries_per_second: f64,
    by_method: BTreeMap<&'static str, usize>,
    results: Vec<intent::IntentResult>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut service_config = ServiceConfig::from_env()?;
    if let Some(path) = &args.rules {
        service_config.rules_path = Some(path.clone());
    }
    if let Some(url) = &args.qdrant_url {
        service_config.qdrant_url = Some(url.clone());
    }
    let config = HybridConfig::from_env()?;

    match args.command {
        Command::Detect {
            queries,
            user,
            session,
        } => {
            let service = build_service(&service_config, config)?;
            for query in queries {
                let mut context = DetectionContext::new(query);
                if let Some(user) = &user {
                    context = context.with_user(user.clone());
                }
                if let Some(session) = &session {
                    context = context.with_session(session.clone());
                }
                let result = service.detect_intent(&context).await;
                print_json(&result, args.pretty)?;
            }
        }
        Command::Batch {
            file,
            max_concurrent,
        } => {
            let max_concurrent = max_concurrent.unwrap_or(config.max_concurrent());
            let service = build_service(&service_config, config)?;
            let queries = read_queries(&file)?;

            let started = Instant::now();
            let results = service.detect_batch(queries, max_concurrent).await;
            let elapsed = started.elapsed().as_secs_f64();

            let mut by_method = BTreeMap::new();
            for result in &results {
                *by_method.entry(result.method.as_str()).or_insert(0) += 1;
            }
            tracing::info!(
                count = results.len(),
                elapsed_ms = elapsed * 1000.0,
                "Batch detection complete"
            );

            let report = BatchReport {
                count: results.len(),
                elapsed_ms: elapsed * 1000.0,
                queries_per_second: if elapsed > 0.0 {
                    results.len() as f64 / elapsed
                } else {
                    0.0
                },
                by_method,
                results,
            };
            print_json(&report, args.pretty)?;
        }
        Command::Index { corpus } => {
            let Some(url) = service_config.qdrant_url.clone() else {
                bail!("indexing requires a Qdrant endpoint (INTENT_QDRANT_URL or --qdrant-url)");
            };
            service_config.validate()?;

            let corpus = IntentCorpus::load(&corpus)?;
            let embedder = service_embedder(&service_config)?;
            let index = QdrantIndex::new(&url, service_config.collection.clone())?;
            let normalizer = TextNormalizer::new();

            tracing::info!(
                url = %url,
                collection = %service_config.collection,
                examples = corpus.example_count(),
                "Indexing intent examples"
            );
            let report = index_corpus(&corpus, embedder.as_ref(), &index, &normalizer).await?;
            print_json(&report, args.pretty)?;
        }
        Command::Analyze { query } => {
            let normalizer = TextNormalizer::new();
            print_json(&normalizer.text_statistics(&query), args.pretty)?;
        }
        Command::Stats => {
            let service = build_service(&service_config, config)?;
            print_json(&service.get_stats().await, args.pretty)?;
        }
    }

    Ok(())
}

fn build_service(
    service_config: &ServiceConfig,
    config: HybridConfig,
) -> anyhow::Result<HybridIntentService> {
    let service = HybridIntentServiceBuilder::from_service_config(service_config, config)?
        .build()
        .context("failed to build intent service")?;
    Ok(service)
}

/// Non-blank lines of `path`, or of stdin for `-`.
fn read_queries(path: &Path) -> anyhow::Result<Vec<String>> {
    let reader: Box<dyn BufRead> = if path.as_os_str() == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        Box::new(BufReader::new(file))
    };

    let mut queries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            queries.push(line.to_string());
        }
    }
    Ok(queries)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}
