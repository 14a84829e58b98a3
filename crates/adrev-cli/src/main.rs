mod run;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "adrev-cli")]
#[command(about = "MAX ad revenue ingestion command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Ingest one day: every registered app's user-level report plus both
    /// aggregate variants
    Daily {
        /// Report date (YYYY-MM-DD); defaults to yesterday UTC
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Replace partitions that already hold rows instead of skipping them
        #[arg(long)]
        force: bool,
    },
    /// Re-ingest a trailing window of days, oldest first, filling gaps only
    Backfill {
        /// Number of days to sweep, ending with yesterday
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Re-ingest yesterday, replacing whatever is already in the warehouse
    ForceUpdate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Daily { date, force }) => run::daily(date, force).await,
        Some(Commands::Backfill { days }) => run::backfill(days).await,
        Some(Commands::ForceUpdate) => run::daily(None, true).await,
        None => {
            println!("adrev-cli: use `daily`, `backfill`, or `force-update` (see --help)");
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
