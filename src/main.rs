//! # vecstash — embedded vector store CLI
//!
//! Usage:
//!   vecstash add "some text" --meta category=notes   # Embed and store
//!   vecstash search "query" -k 3                      # Top-k similar texts
//!   vecstash stats                                    # Size vs. budget
//!   vecstash reset                                    # Drop every document
//!   vecstash init-config                              # Write ~/.vecstash/config.toml

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vecstash_core::{FilterCriteria, FilterOptions, SearchParams, TextMatch, VecStashConfig};
use vecstash_store::{VectorStore, open_table};

#[derive(Parser)]
#[command(
    name = "vecstash",
    version,
    about = "📚 vecstash — size-bounded vector store with hit-aware eviction"
)]
struct Cli {
    /// Config file (default: ~/.vecstash/config.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Embed and store one or more texts
    Add {
        #[arg(required = true)]
        texts: Vec<String>,
        /// Metadata shared by every text, as key=value (value may be JSON)
        #[arg(short, long = "meta")]
        meta: Vec<String>,
    },
    /// Find the stored texts most similar to a query
    Search {
        query: String,
        /// Number of results
        #[arg(short, default_value_t = vecstash_core::types::DEFAULT_K)]
        k: usize,
        /// Only documents whose metadata has key=value
        #[arg(long)]
        include: Vec<String>,
        /// Skip documents with exactly this text
        #[arg(long)]
        exclude_text: Vec<String>,
        /// Include vectors in the output
        #[arg(long)]
        values: bool,
    },
    /// Remove every stored document
    Reset,
    /// Show document count and size against the budget
    Stats,
    /// Write the default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn config_path(cli: &Cli) -> PathBuf {
    match &cli.config {
        Some(p) => PathBuf::from(shellexpand::tilde(p).to_string()),
        None => VecStashConfig::default_path(),
    }
}

fn load_config(path: &Path) -> Result<VecStashConfig> {
    let config = if path.exists() {
        VecStashConfig::load_from(path)?
    } else {
        tracing::debug!("No config at {}, using defaults", path.display());
        VecStashConfig::default()
    };
    Ok(config)
}

/// Parse `key=value`; the value is taken as JSON when it parses, else as a string.
fn parse_pairs(pairs: &[String]) -> Result<Map<String, Value>> {
    let mut map = Map::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .with_context(|| format!("expected key=value, got '{pair}'"))?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        map.insert(key.trim().to_string(), value);
    }
    Ok(map)
}

fn build_filter(include: &[String], exclude_text: &[String]) -> Result<Option<FilterOptions>> {
    let mut filter = FilterOptions::default();
    if !include.is_empty() {
        filter.include = Some(FilterCriteria {
            metadata: Some(parse_pairs(include)?),
            text: None,
        });
    }
    if !exclude_text.is_empty() {
        filter.exclude = Some(FilterCriteria::default().text(TextMatch::Many(exclude_text.to_vec())));
    }
    Ok((filter != FilterOptions::default()).then_some(filter))
}

fn open_store(config: &VecStashConfig) -> Result<VectorStore<Value>> {
    let embedder = vecstash_providers::create_embedder(config)?;
    let table = open_table::<Value>(&config.storage)?;
    Ok(VectorStore::new(Arc::from(embedder), table, config.store.clone())?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "vecstash=debug,vecstash_store=debug,vecstash_providers=debug"
    } else {
        "vecstash=info,vecstash_store=warn,vecstash_providers=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let path = config_path(&cli);

    match &cli.command {
        Command::InitConfig { force } => {
            if path.exists() && !force {
                println!("⚠️  Config already exists: {} (use --force)", path.display());
                return Ok(());
            }
            VecStashConfig::default().save_to(&path)?;
            println!("✅ Config written: {}", path.display());
        }
        Command::Add { texts, meta } => {
            let config = load_config(&path)?;
            let store = open_store(&config)?;
            let metadata = Value::Object(parse_pairs(meta)?);
            let metadatas = vec![metadata; texts.len()];
            let added = store.add_texts(texts.clone(), metadatas).await?;
            println!(
                "✅ Added {} text(s), skipped {} duplicate(s)",
                added.len(),
                texts.len() - added.len()
            );
            if !store.last_flush().is_persisted() {
                println!("⚠️  Not persisted: {:?}", store.last_flush());
            }
        }
        Command::Search { query, k, include, exclude_text, values } => {
            let config = load_config(&path)?;
            let store = open_store(&config)?;
            let mut params = SearchParams::new(query.clone()).with_k(*k).with_values(*values);
            if let Some(filter) = build_filter(include, exclude_text)? {
                params = params.with_filter(filter);
            }
            let response = store.similarity_search(params).await?;
            println!("{}", serde_json::to_string_pretty(&response.similar_items)?);
        }
        Command::Reset => {
            let config = load_config(&path)?;
            let store = open_store(&config)?;
            let outcome = store.reset_db().await?;
            println!("🗑️  Store cleared ({outcome:?})");
        }
        Command::Stats => {
            let config = load_config(&path)?;
            let store = open_store(&config)?;
            println!("📚 {store}");
            println!("   📄 Documents: {}", store.len().await?);
            println!(
                "   💾 Size:      {:.4} MB / {} MB",
                store.size_in_mb().await?,
                store.max_size_in_mb()
            );
            println!("   🗄️  Backend:   {}", store.table_name());
        }
    }

    Ok(())
}
