//! docindex CLI
//!
//! Command-line interface over the index engine:
//! - Build an index over a JSON document file and query it
//! - Describe an index and its memory footprint
//! - Generate a default config file

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use docindex::config::{generate_default_config, Config, LoggingConfig};
use docindex::document::{parse_documents, AttributeShaper, Document, DocumentHandle};
use docindex::index::{
    IndexDefinition, IndexId, IndexKind, IndexManager, IndexOperator, SecondaryIndex,
};
use docindex::query::compile;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "docindex")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Secondary indexes over JSON documents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format (table, json)
    #[arg(long, default_value = "table", global = true)]
    format: String,
}

#[derive(Args)]
struct IndexArgs {
    /// JSON array or JSON-lines file; every document needs a "_key"
    file: PathBuf,

    /// Indexed attribute paths, in key order
    #[arg(short, long = "field", required = true)]
    fields: Vec<String>,

    /// Index type (hash, skiplist)
    #[arg(short, long, default_value = "skiplist")]
    kind: String,

    /// Reject duplicate keys
    #[arg(long)]
    unique: bool,

    /// Leave out documents missing an indexed attribute
    #[arg(long)]
    sparse: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index and run a condition against it
    Query {
        #[command(flatten)]
        index: IndexArgs,

        /// Condition, e.g. "age >= 5 AND age <= 10"
        #[arg(short, long)]
        query: String,

        /// Maximum number of documents to print
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Build an index and print its description
    Describe {
        #[command(flatten)]
        index: IndexArgs,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_logging(&config.logging);

    match cli.command {
        Commands::Query {
            index,
            query,
            limit,
        } => {
            let documents = load_documents(&index.file)?;
            let (manager, id) = build_index(&index, &documents, config)?;
            let target = manager.index(id)?;

            let operator = compile(&query, &index.fields)?;
            tracing::debug!(operator = %operator, "query compiled");

            let handles = run(target, &operator, limit)?;

            print_documents(&handles, &documents, &cli.format)?;
        }

        Commands::Describe { index } => {
            let documents = load_documents(&index.file)?;
            let (manager, _) = build_index(&index, &documents, config)?;

            let stats = manager.stats();
            let descriptions = manager.describe_all();

            if cli.format == "json" {
                let body = serde_json::json!({
                    "indexes": descriptions,
                    "entries": stats.entries,
                    "memory_bytes": stats.memory_bytes,
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                for d in &descriptions {
                    println!(
                        "index {}: {} unique={} sparse={} fields=[{}]",
                        d.id,
                        d.kind,
                        d.unique,
                        d.sparse,
                        d.fields.join(", ")
                    );
                }
                println!("entries: {}", stats.entries);
                println!("memory:  {} bytes", stats.memory_bytes);
            }
        }

        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Config written to {}", path.display());
                }
                None => print!("{}", content),
            }
        }
    }

    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("docindex={}", logging.level)));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_documents(path: &Path) -> anyhow::Result<Vec<Document>> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let documents =
        parse_documents(&text).with_context(|| format!("parsing {}", path.display()))?;

    tracing::info!(count = documents.len(), "documents loaded");
    Ok(documents)
}

fn build_index(
    args: &IndexArgs,
    documents: &[Document],
    config: Config,
) -> anyhow::Result<(IndexManager, IndexId)> {
    let kind: IndexKind = args.kind.parse()?;

    let mut shaper = AttributeShaper::new();
    let paths = shaper.register_all(args.fields.iter().map(String::as_str))?;

    let definition = IndexDefinition::new(kind, paths)
        .unique(args.unique)
        .sparse(args.sparse);

    let mut manager = IndexManager::with_config(Arc::new(shaper), config);
    let id = manager
        .create_index_from(definition, documents)
        .context("building index")?;

    let stats = manager.stats();
    tracing::info!(
        index = %id,
        entries = stats.entries,
        memory_bytes = stats.memory_bytes,
        "index built"
    );

    Ok((manager, id))
}

/// Run an operator, stopping after `limit` documents
///
/// Hash indexes answer full-key equality only.
fn run(
    index: &SecondaryIndex,
    operator: &IndexOperator,
    limit: Option<usize>,
) -> anyhow::Result<Vec<DocumentHandle>> {
    let limit = limit.unwrap_or(usize::MAX);

    match (index.kind(), operator) {
        (IndexKind::Hash, IndexOperator::Eq(key)) => {
            let mut handles = index.find(key)?;
            handles.truncate(limit);
            Ok(handles)
        }
        (IndexKind::Hash, _) => bail!("hash indexes only answer equality on every indexed field"),
        (IndexKind::Skiplist, _) => Ok(index.scan(operator)?.take(limit).cloned().collect()),
    }
}

fn print_documents(
    handles: &[DocumentHandle],
    documents: &[Document],
    format: &str,
) -> anyhow::Result<()> {
    let document_of =
        |handle: &DocumentHandle| documents.get((handle.id().0 as usize).saturating_sub(1));

    if format == "json" {
        let rows: Vec<serde_json::Value> = handles
            .iter()
            .filter_map(document_of)
            .map(|d| serde_json::Value::from(d.body()))
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for handle in handles {
            let body = document_of(handle)
                .map(|d| d.body().to_string())
                .unwrap_or_default();
            println!("{:<16} {}", handle.key(), body);
        }
        println!("({} documents)", handles.len());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docindex::index::SearchKey;
    use serde_json::json;

    fn age_index(kind: IndexKind) -> (IndexManager, IndexId) {
        let mut shaper = AttributeShaper::new();
        let age = shaper.register("age").unwrap();

        let documents: Vec<Document> = (0..20)
            .map(|i| Document::new(i + 1, format!("d{:02}", i), json!({ "age": i % 4 })))
            .collect();

        let mut manager = IndexManager::new(Arc::new(shaper));
        let id = manager
            .create_index_from(IndexDefinition::new(kind, vec![age]), &documents)
            .unwrap();
        (manager, id)
    }

    #[test]
    fn test_run_stops_at_limit() {
        let (manager, id) = age_index(IndexKind::Skiplist);
        let index = manager.index(id).unwrap();
        let operator = IndexOperator::Ge(SearchKey::single(1));

        let all = run(index, &operator, None).unwrap();
        assert_eq!(all.len(), 15);

        let first = run(index, &operator, Some(4)).unwrap();
        let keys: Vec<&str> = first.iter().map(|h| h.key()).collect();
        assert_eq!(keys, vec!["d01", "d05", "d09", "d13"]);

        assert!(run(index, &operator, Some(0)).unwrap().is_empty());
    }

    #[test]
    fn test_run_hash_equality_only() {
        let (manager, id) = age_index(IndexKind::Hash);
        let index = manager.index(id).unwrap();

        let equal = IndexOperator::Eq(SearchKey::single(2));
        assert_eq!(run(index, &equal, None).unwrap().len(), 5);
        assert_eq!(run(index, &equal, Some(2)).unwrap().len(), 2);

        let range = IndexOperator::Ge(SearchKey::single(2));
        assert!(run(index, &range, None).is_err());
    }
}
