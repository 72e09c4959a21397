//! Command line entry point for lumicycle.

use std::path::PathBuf;

use clap::Parser;

mod cli;

#[derive(Parser)]
#[command(
    name = "lumicycle",
    version,
    about = "Keeps a WebSocket-connected lamp on a cyclic color schedule"
)]
struct Args {
    /// Path to the configuration file (default: the platform config directory)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output as JSON where supported (get, config)
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: cli::Command,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .init();

    let args = Args::parse();

    if let Err(e) = cli::run(args.command, args.config.as_deref(), args.json).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
