//! Shapewatch CLI: the `shapewatch` command.

mod cli;
mod commands;
mod config;
mod logging;
mod outbox;
mod support;

use clap::Parser;
use cli::{Cli, Commands};
use config::Config;

fn main() {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())
        .unwrap_or_else(|e| {
            eprintln!("error: {e}");
            std::process::exit(1);
        })
        .with_store_path(cli.store);
    logging::init(&config.log.level);

    match cli.command {
        Commands::Vocab { json } => commands::vocab::run(json),
        Commands::Constraint { command } => commands::constraint::run(command, &config),
        Commands::Filter { command } => commands::filter::run(command, &config),
        Commands::Subscriber { command } => commands::subscriber::run(command, &config),
    }
}
