use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use fundflow::AppCommand;
use fundflow::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Ingest today's prices and estimate flows inside the quarterly window
    Run {
        /// Treat this date as today (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Estimate flows for a past quarter from stored prices
    Estimate {
        /// Quarter end to estimate (YYYY-MM-DD, a month end)
        #[arg(long)]
        quarter_end: NaiveDate,
    },
    /// Display recorded quarterly flows
    Flows {
        /// Only show this quarter
        #[arg(long)]
        quarter_end: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let command = match cli.command {
        Some(Commands::Setup) => None,
        Some(Commands::Run { date }) => Some(AppCommand::Run { today: date }),
        Some(Commands::Estimate { quarter_end }) => Some(AppCommand::Estimate { quarter_end }),
        Some(Commands::Flows { quarter_end }) => Some(AppCommand::Flows { quarter_end }),
        None => Some(AppCommand::Run { today: None }),
    };

    let result = match command {
        Some(cmd) => fundflow::run_command(cmd, cli.config_path.as_deref()).await,
        None => fundflow::cli::setup::setup(),
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
