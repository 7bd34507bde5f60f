mod commands;
mod config;
mod render;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{init, replay, thread, InitArgs, ReplayArgs, ThreadArgs};
use config::Config;

/// Pin CLI - Inspect comment threads and replay optimistic updates
#[derive(Parser, Debug)]
#[command(name = "pin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default pin.config.json
    Init(InitArgs),

    /// Assemble a flat comment listing and print the thread
    Thread(ThreadArgs),

    /// Replay scripted inserts, likes and server outcomes over a thread
    Replay(ReplayArgs),
}

fn init_tracing(cwd: &str) {
    let level = Config::load(cwd)
        .map(|c| c.log_level)
        .unwrap_or_else(|_| "warn".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?.display().to_string();
    init_tracing(&cwd);

    match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Thread(args) => thread(args, &cwd),
        Command::Replay(args) => replay(args, &cwd),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
