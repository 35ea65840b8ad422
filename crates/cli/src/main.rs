//! La Vega CLI - database and spreadsheet tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! vega-cli migrate
//!
//! # Import a Shopify orders export
//! vega-cli import orders_export.csv
//!
//! # Write the shopping list and pick sheet for a delivery date
//! vega-cli shopping-list 2026-03-10
//! vega-cli pick-list 2026-03-10 -o armado.xlsx
//!
//! # Back up and restore
//! vega-cli backup
//! vega-cli restore backup_vega_2026-03-10_0800.xlsx --no-auto-complete
//!
//! # Complete pending orders whose delivery date has passed
//! vega-cli auto-complete
//! ```
//!
//! The database is taken from `DATABASE_URL` (default `sqlite://vega.db`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "vega-cli")]
#[command(author, version, about = "La Vega order management tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Import a Shopify orders CSV export
    Import {
        /// Path to the CSV file
        file: PathBuf,
    },
    /// Write the shopping list for a delivery date
    ShoppingList {
        /// Delivery date (YYYY-MM-DD)
        date: NaiveDate,
        /// Output file (default: lista_compras_<date>.xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write the pick sheet for a delivery date
    PickList {
        /// Delivery date (YYYY-MM-DD)
        date: NaiveDate,
        /// Output file (default: pedidos_armado_<date>.xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Export every table to an xlsx backup
    Backup {
        /// Output file (default: backup_vega_<timestamp>.xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Restore an xlsx backup
    Restore {
        /// Path to the backup workbook
        file: PathBuf,
        /// Keep restored pending orders pending even if their date has passed
        #[arg(long)]
        no_auto_complete: bool,
    },
    /// Complete pending orders whose delivery date has passed
    AutoComplete,
}

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vega_cli=info,vega_admin=info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    // Every command runs against an up-to-date schema.
    let pool = commands::connect().await?;
    commands::migrate::run(&pool).await?;

    match cli.command {
        Commands::Migrate => tracing::info!("Database is up to date"),
        Commands::Import { file } => commands::orders::import(&pool, &file).await?,
        Commands::ShoppingList { date, output } => {
            commands::reports::shopping_list(&pool, date, output).await?;
        }
        Commands::PickList { date, output } => {
            commands::reports::pick_list(&pool, date, output).await?;
        }
        Commands::Backup { output } => commands::backup::backup(&pool, output).await?,
        Commands::Restore {
            file,
            no_auto_complete,
        } => commands::backup::restore(&pool, &file, !no_auto_complete).await?,
        Commands::AutoComplete => commands::orders::auto_complete(&pool).await?,
    }
    Ok(())
}
