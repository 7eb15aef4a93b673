//! earfx CLI - Block-based Audio Effects
//!
//! Command-line interface for rendering test material through effect chains.

use clap::Parser;
use env_logger::Env;
use log::info;

use earfx::cli::{commands, Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    info!("earfx v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => handle_command(cmd),
        None => {
            println!("earfx v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Render {
            source,
            chain,
            engine,
        } => commands::render(&source, &chain, &engine),
        Commands::Describe {
            chain,
            engine,
            json,
        } => commands::describe(&chain, &engine, json),
        Commands::Level { value, ratio } => commands::level(value, ratio),
        Commands::Transpose { freq, semitones } => commands::transpose(freq, semitones),
    }
}
