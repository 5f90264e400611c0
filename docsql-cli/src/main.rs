use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use docsql_core::fingerprint::Fingerprint;
use docsql_core::{
    Filter, QueryEngine, QueryOptions, SchemaCatalog, SqlFragment, TranslatorConfig,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod table;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    /// Table format (default)
    Table,
    /// Pretty JSON
    Json,
}

#[derive(Parser)]
#[command(name = "docsql")]
#[command(about = "DocSQL filter-to-SQL translator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate filters into a parameterized SQLite WHERE clause
    Translate {
        /// Collection schema as JSON (`{"fields": [...]}`); defaults to no fields
        #[arg(short, long)]
        schema: Option<PathBuf>,
        /// Filter as JSON. Repeat to translate several filters through one cache.
        #[arg(short, long, required = true)]
        filter: Vec<String>,
        /// Sort/limit/skip options as JSON
        #[arg(long)]
        options: Option<String>,
        /// Bypass the plan cache
        #[arg(long)]
        no_cache: bool,
        /// Reject unknown operators instead of ignoring them
        #[arg(long)]
        strict: bool,
        /// Maximum filter nesting depth
        #[arg(long, default_value = "32")]
        max_depth: usize,
        /// Output format (table, json)
        #[arg(short, long, value_enum, default_value = "table")]
        output: OutputFormat,
    },
    /// Show a filter's structural fingerprint
    Fingerprint {
        /// Filter as JSON
        #[arg(short, long)]
        filter: String,
        /// Maximum filter nesting depth
        #[arg(long, default_value = "32")]
        max_depth: usize,
    },
}

fn main() -> Result<()> {
    // Default to warn, override with RUST_LOG (e.g. RUST_LOG=docsql_core=debug)
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Translate {
            schema,
            filter,
            options,
            no_cache,
            strict,
            max_depth,
            output,
        } => {
            let catalog = match schema {
                Some(path) => load_schema(&path)?,
                None => SchemaCatalog::empty(),
            };

            let mut config = TranslatorConfig::new().with_max_depth(max_depth);
            if no_cache {
                config = config.without_cache();
            }
            if strict {
                config = config.with_strict_operators();
            }

            let engine = QueryEngine::new(Arc::new(catalog), config)
                .context("Invalid translator configuration")?;

            let options = match options {
                Some(json) => QueryOptions::parse(&json).context("Invalid options")?,
                None => QueryOptions::new(),
            };

            let mut fragments = Vec::with_capacity(filter.len());
            for json in &filter {
                let parsed = Filter::parse(json)
                    .with_context(|| format!("Invalid filter: {}", json))?;
                let fragment = if options.is_empty() {
                    engine.translate(&parsed)
                } else {
                    engine.translate_find(&parsed, &options)
                }
                .with_context(|| format!("Failed to translate filter: {}", json))?;
                fragments.push(fragment);
            }

            let stats = engine.cache_stats();
            debug!(
                "Translated {} filters (cache hits: {}, misses: {}, size: {})",
                fragments.len(),
                stats.hits,
                stats.misses,
                engine.cache_size()
            );

            match output {
                OutputFormat::Table => {
                    for fragment in &fragments {
                        print_fragment(fragment);
                    }
                    if filter.len() > 1 && engine.is_cache_enabled() {
                        println!("{}", table::format_stats_table(&engine.cache_stats()));
                    }
                }
                OutputFormat::Json => {
                    let json = if fragments.len() == 1 {
                        serde_json::to_value(&fragments[0])?
                    } else {
                        serde_json::to_value(&fragments)?
                    };
                    println!("{}", serde_json::to_string_pretty(&json)?);
                }
            }
        }

        Commands::Fingerprint { filter, max_depth } => {
            let parsed = Filter::parse(&filter).context("Invalid filter")?;

            match Fingerprint::compute(&parsed, max_depth).context("Failed to fingerprint filter")? {
                Some(fingerprint) => {
                    println!("{}", fingerprint);
                    println!("cacheable: yes");
                }
                None => {
                    println!("cacheable: no ($all, $elemMatch, or $index present)");
                }
            }
        }
    }

    Ok(())
}

fn load_schema(path: &Path) -> Result<SchemaCatalog> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema file {}", path.display()))?;
    SchemaCatalog::from_json(&text).context("Invalid schema")
}

fn print_fragment(fragment: &SqlFragment) {
    println!("{}", fragment.sql);
    println!();
    println!("{}", table::format_params_table(&fragment.params));
    println!();
}
