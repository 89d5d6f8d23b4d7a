use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;

use error::CliError;

/// drover - agentless infrastructure automation over SSH
#[derive(Parser)]
#[command(name = "drover")]
#[command(version, about, long_about = None)]
#[command(author = "Drover Contributors")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose diagnostics on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow against an inventory
    Run(commands::run::RunArgs),

    /// Enumerate workflow documents under a directory
    List(commands::list::ListArgs),

    /// Show a workflow's name, path, and description
    Describe(commands::describe::DescribeArgs),

    /// Query the execution log database
    Logs(commands::logs::LogsArgs),

    /// Serve a log database to other processes
    LogServe(commands::serve::ServeArgs),

    /// Merge log databases, renumbering sessions
    LogMerge(commands::merge::MergeArgs),

    /// Delete a log database after checking no service holds it
    DbClear(commands::clear::ClearArgs),
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with_writer(std::io::stderr)
        .init();

    let result: Result<(), CliError> = match cli.command {
        Commands::Run(args) => commands::run::execute(args).await,
        Commands::List(args) => commands::list::execute(args).await,
        Commands::Describe(args) => commands::describe::execute(args).await,
        Commands::Logs(args) => commands::logs::execute(args).await,
        Commands::LogServe(args) => commands::serve::execute(args).await,
        Commands::LogMerge(args) => commands::merge::execute(args).await,
        Commands::DbClear(args) => commands::clear::execute(args).await,
    };

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("drover: {error}");
            std::process::ExitCode::from(error.exit_code())
        }
    }
}
