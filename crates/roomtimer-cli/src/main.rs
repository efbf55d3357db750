use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "roomtimer-cli", version, about = "Room timer device runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the devices declared in a configuration file
    Run(commands::run::RunArgs),
    /// Drive a single countdown to completion and print its event stream
    Countdown(commands::countdown::CountdownArgs),
    /// Drive a count-up for a fixed span and print its event stream
    Countup(commands::countup::CountupArgs),
    /// Validate a configuration file
    Check(commands::check::CheckArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args).await,
        Commands::Countdown(args) => commands::countdown::run(args).await,
        Commands::Countup(args) => commands::countup::run(args).await,
        Commands::Check(args) => commands::check::run(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
