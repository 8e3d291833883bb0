//! Quoteload CLI - load quote CSV exports into PostgreSQL
//!
//! ```bash
//! quoteload load quotes.csv          # Parse, then load in one transaction
//! quoteload parse quotes.csv         # Dry run: print normalized records as JSON
//! quoteload init-schema              # Create the destination table if absent
//! quoteload ping                     # Check the database connection
//! quoteload serve                    # Start HTTP server (port 3000)
//! ```
//!
//! Connection settings come from `DATABASE_URL` or `PGHOST`/`PGPORT`/...;
//! see [`quoteload::DatabaseSettings`].

use clap::{Parser, Subcommand};
use quoteload::{
    ingest, parse_path, shutdown_signal, DatabaseSettings, Loader, PgQuoteStore, QuoteStore,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "quoteload")]
#[command(about = "Load daily quote CSV exports into PostgreSQL", long_about = None)]
struct Cli {
    /// Connection URL (overrides DATABASE_URL / PG* variables)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Destination table (overrides QUOTELOAD_TABLE)
    #[arg(long, global = true)]
    table: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a CSV file; all rows or none
    Load {
        /// Input CSV file
        input: PathBuf,
    },

    /// Parse a CSV file and print normalized records as JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Create the destination table if it does not exist
    InitSchema,

    /// Check connectivity and print the server time
    Ping,

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse { ref input, ref output } => cmd_parse(input, output.as_deref()).await,
        ref command => match settings(&cli) {
            Ok(settings) => with_store(&settings, command).await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn settings(cli: &Cli) -> Result<DatabaseSettings, Box<dyn std::error::Error>> {
    let mut settings = DatabaseSettings::from_env()?;
    if let Some(url) = &cli.database_url {
        settings = settings.with_url(url.as_str());
    }
    if let Some(table) = &cli.table {
        settings = settings.with_table(table.as_str())?;
    }
    Ok(settings)
}

/// Connect, run `command`, and close the pool whatever the outcome.
async fn with_store(
    settings: &DatabaseSettings,
    command: &Commands,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = PgQuoteStore::connect(settings).await?;

    let result = match command {
        Commands::Load { input } => cmd_load(&store, input).await,
        Commands::InitSchema => cmd_init_schema(&store).await,
        Commands::Ping => cmd_ping(&store).await,
        Commands::Serve { port } => quoteload::server::start_server(Arc::new(store.clone()), *port).await,
        Commands::Parse { .. } => Ok(()),
    };

    Loader::new(&store).release().await;
    result
}

async fn cmd_load(store: &PgQuoteStore, input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Loading: {} into table '{}'", input.display(), store.table());

    let batch = parse_path(input).await?;
    let report = ingest(store, batch, shutdown_signal()).await?;

    eprintln!("\n✨ Loaded {} rows", report.committed);
    Ok(())
}

async fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing: {}", input.display());

    let batch = parse_path(input).await?;
    let json = serde_json::to_string_pretty(&batch.records)?;
    write_output(&json, output)?;

    Ok(())
}

async fn cmd_init_schema(store: &PgQuoteStore) -> Result<(), Box<dyn std::error::Error>> {
    Loader::new(store).ensure_schema().await?;
    eprintln!("✅ Table '{}' is ready", store.table());
    Ok(())
}

async fn cmd_ping(store: &PgQuoteStore) -> Result<(), Box<dyn std::error::Error>> {
    let now = store.ping().await?;
    eprintln!("✅ Connected to PostgreSQL");
    println!("Server time: {}", now);
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
