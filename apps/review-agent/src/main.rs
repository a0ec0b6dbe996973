//! review-agent CLI
//!
//! Thin shell over the review pipeline:
//!
//! - `analyze` - review uploaded `.docx` files and write the report
//! - `index` - fetch references and (re)build the vector index
//! - `query` - inspect what the index returns for a query
//! - `checklist` - print required documents per process

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use corpus_core::{load_embedder, CorpusConfig, EmbeddingBackend, VectorIndex};
use review_agent::{analyze_documents, open_reference_index, ProcessHint, RunConfig};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for the review agent
#[derive(Parser, Debug)]
#[command(name = "review-agent")]
#[command(version, about = "ADGM submission review: checklist, red flags and annotated copies")]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Skip reference downloads and use the hashing embedder
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Review .docx files against a process checklist
    Analyze {
        /// Documents to review
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Process name, or "auto" to detect it from filenames
        #[arg(long, default_value = "auto")]
        process: String,

        /// Rebuild the reference index before analysing
        #[arg(long)]
        force_rebuild: bool,
    },

    /// Fetch reference documents and build the vector index
    Index {
        #[arg(long)]
        force_rebuild: bool,
    },

    /// Show the reference chunks closest to a query
    Query {
        text: String,

        /// Number of hits
        #[arg(short, default_value = "4")]
        k: usize,
    },

    /// List required documents for one or all processes
    Checklist { process: Option<String> },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut corpus = CorpusConfig::from_env()?;
    if args.offline {
        corpus = corpus
            .with_reference_urls(Vec::new())
            .with_embedding(EmbeddingBackend::hashing());
    }

    match args.command {
        Command::Analyze {
            files,
            process,
            force_rebuild,
        } => {
            let run = RunConfig::from_env();
            run.ensure_dirs()?;

            let index = open_index(&corpus, force_rebuild).await?;

            let uploads: Vec<(String, PathBuf)> = files
                .into_iter()
                .map(|path| {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string());
                    (name, path)
                })
                .collect();
            let hint: ProcessHint = process.parse()?;

            info!("Analysing {} document(s)", uploads.len());
            // Citation lookups run embedding inference; keep them off the runtime threads
            let report = tokio::task::spawn_blocking(move || {
                let report = analyze_documents(&uploads, &index, &hint, &run);
                index.close();
                report
            })
            .await
            .context("analysis task panicked")??;

            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Command::Index { force_rebuild } => {
            let index = open_index(&corpus, force_rebuild).await?;
            let manifest = index.manifest();
            println!(
                "{} chunks, model {} ({} dims), built {}, stored at {}",
                manifest.chunk_count,
                manifest.model_id,
                manifest.dimension,
                manifest.built_at.to_rfc3339(),
                index.path().display()
            );
            index.close();
        }

        Command::Query { text, k } => {
            let index = open_index(&corpus, false).await?;
            let hits = index.retrieve(&text, k).context("query failed")?;

            for (rank, hit) in hits.iter().enumerate() {
                let snippet: String = hit.text.chars().take(200).collect();
                println!(
                    "{}. [{:.3} {:?}] {}\n   {}",
                    rank + 1,
                    hit.score,
                    hit.match_type(),
                    hit.source().unwrap_or("(unknown source)"),
                    snippet.replace('\n', " ")
                );
            }
            index.close();
        }

        Command::Checklist { process } => {
            let processes: Vec<String> = match process {
                Some(name) => vec![name],
                None => compliance_engine::checklist::processes()
                    .map(str::to_string)
                    .collect(),
            };

            for name in processes {
                let docs = compliance_engine::required_documents(&name);
                println!("{} ({} required)", name, docs.len());
                for doc in docs {
                    println!("  - {}", doc);
                }
            }
        }
    }

    Ok(())
}

async fn open_index(corpus: &CorpusConfig, force_rebuild: bool) -> anyhow::Result<VectorIndex> {
    let embedder = load_embedder(&corpus.embedding)
        .await
        .context("embedding model could not be loaded")?;
    Ok(open_reference_index(corpus, embedder, force_rebuild).await?)
}
