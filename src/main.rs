use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fxview::core::log::init_logging;

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

impl From<Commands> for fxview::AppCommand {
    fn from(cmd: Commands) -> fxview::AppCommand {
        match cmd {
            Commands::Ingest { repeat, seconds } => fxview::AppCommand::Ingest { repeat, seconds },
            Commands::Show => fxview::AppCommand::Show,
            Commands::Convert { amount, from, to } => {
                fxview::AppCommand::Convert { amount, from, to }
            }
            Commands::Watch { ingest_every } => fxview::AppCommand::Watch {
                ingest_seconds: ingest_every,
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch the latest rates and store a snapshot
    Ingest {
        /// Keep fetching on a fixed interval
        #[arg(long)]
        repeat: bool,
        /// Seconds between fetches with --repeat
        #[arg(long, default_value_t = 300)]
        seconds: u64,
    },
    /// Display the latest rates
    Show,
    /// Convert an amount between two currencies
    Convert {
        /// Amount to convert
        #[arg(allow_negative_numbers = true)]
        amount: f64,
        /// Source currency (defaults to the base currency)
        #[arg(long)]
        from: Option<String>,
        /// Target currency (defaults to the first other known currency)
        #[arg(long)]
        to: Option<String>,
    },
    /// Display the latest rates and refresh them periodically
    Watch {
        /// Also ingest a snapshot every given number of seconds
        #[arg(long, value_name = "SECONDS")]
        ingest_every: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => fxview::cli::setup::setup(),
        Some(cmd) => fxview::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
