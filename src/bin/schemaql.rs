//! schemaql: schema discovery and mutation compiler CLI
//!
//! # Usage
//!
//! ```bash
//! # Discover a schema and save the snapshot
//! schemaql discover --database-url postgres://localhost/app --out app.json
//!
//! # Compile a mutation against a saved snapshot
//! schemaql compile --snapshot app.json --query insert.json --vars vars.json
//!
//! # Inspect one table without a full discovery
//! schemaql table public users
//!
//! # Check a name against block-list patterns
//! schemaql blocked password 'pass.*' 'secret_.*'
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use schemaql::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schemaql")]
#[command(version)]
#[command(about = "Schema discovery and JSON mutation compiler", long_about = None)]
struct Cli {
    /// Config file (defaults to <config dir>/schemaql/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database connection URL
    #[arg(long, env = "SCHEMAQL_DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover the schema of a live database
    Discover {
        /// Extra block-list patterns
        #[arg(short, long)]
        block: Vec<String>,

        /// Write the snapshot as JSON
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Compile a mutation against a saved snapshot
    Compile {
        /// Snapshot written by `discover --out`
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Query as JSON
        #[arg(short, long)]
        query: PathBuf,

        /// Bound variables as a JSON object
        #[arg(long)]
        vars: Option<PathBuf>,
    },
    /// Fetch the columns of a single table
    Table {
        schema: String,
        name: String,
    },
    /// Check whether a name matches block-list patterns
    Blocked {
        name: String,
        patterns: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Commands::Discover { block, out } => discover(&cli, block, out.as_ref()).await,
        Commands::Compile {
            snapshot,
            query,
            vars,
        } => compile(snapshot, query, vars.as_ref()),
        Commands::Table { schema, name } => table(&cli, schema, name).await,
        Commands::Blocked { name, patterns } => {
            blocked(name, patterns);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "schemaql=debug" } else { "schemaql=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn connect(cli: &Cli, block: &[String]) -> Result<(CatalogDb, Config)> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(url) = &cli.database_url {
        config.database_url = Some(url.clone());
    }
    config.block_list.extend(block.iter().cloned());

    let engine = config.resolve_engine()?;
    let url = config
        .database_url
        .as_deref()
        .context("no database URL configured")?;

    if cli.verbose {
        println!("{} {}", "→ Connecting to:".dimmed(), url.yellow());
    }
    let db = CatalogDb::connect(url, engine, config.max_connections).await?;
    Ok((db, config))
}

async fn discover(cli: &Cli, block: &[String], out: Option<&PathBuf>) -> Result<()> {
    let (db, config) = connect(cli, block).await?;
    let engine = db.engine();
    let info = discover_schema(&db, engine, &config.block_list).await?;

    println!("{}", "✓ Schema discovered".green().bold());
    println!("  Engine:    {} v{}", info.engine(), info.version());
    println!("  Database:  {} (schema {})", info.name(), info.schema());
    println!(
        "  Tables:    {} ({} blocked)",
        info.tables().len(),
        info.tables().iter().filter(|t| t.blocked).count()
    );
    println!("  Functions: {}", info.functions().len());
    println!("  Hash:      {}", format!("{:016x}", info.hash()).cyan());

    if let Some(path) = out {
        std::fs::write(path, info.to_json()?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("{} Wrote snapshot to {}", "✓".green(), path.display().to_string().cyan());
    }
    Ok(())
}

async fn table(cli: &Cli, schema: &str, name: &str) -> Result<()> {
    let (db, config) = connect(cli, &[]).await?;
    let t = discover_table(&db, db.engine(), schema, name, &config.block_list).await?;

    let title = if t.blocked { " (blocked)" } else { "" };
    println!("{}{}", t.qualified_name().cyan().bold(), title.red());
    for c in &t.columns {
        let mut flags = Vec::new();
        if c.primary_key {
            flags.push("PK");
        } else if c.unique_key {
            flags.push("UNIQUE");
        }
        if c.not_null {
            flags.push("NOT NULL");
        }
        if c.blocked {
            flags.push("blocked");
        }
        println!("  {:<24} {:<16} {}", c.name, c.col_type.yellow(), flags.join(", ").dimmed());
    }
    Ok(())
}

fn compile(snapshot: &PathBuf, query: &PathBuf, vars: Option<&PathBuf>) -> Result<()> {
    let info = DBInfo::from_json(&read(snapshot)?)?;
    let mut qc: QCode = serde_json::from_str(&read(query)?)
        .with_context(|| format!("invalid query in {}", query.display()))?;
    let vars: Variables = match vars {
        Some(path) => serde_json::from_str(&read(path)?)
            .with_context(|| format!("invalid variables in {}", path.display()))?,
        None => Variables::new(),
    };

    let mut w = SqlBuilder::new();
    let plan = Compiler::new(Arc::new(info)).compile_mutation(&mut qc, &mut w, &vars)?;

    println!("{}", "Generated SQL:".green().bold());
    println!("{}", w.as_str().white());
    println!();
    println!(
        "{} {} into CTE {}",
        "Plan:".cyan(),
        plan.action,
        format!("\"{}\"", plan.cte).yellow()
    );
    Ok(())
}

fn blocked(name: &str, patterns: &[String]) {
    if matches_block_list(name, patterns) {
        println!("{} '{}' is blocked", "✓".green(), name);
    } else {
        println!("{} '{}' is not blocked", "✗".dimmed(), name);
    }
}

fn read(path: &PathBuf) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
