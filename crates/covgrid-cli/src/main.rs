//! covgrid CLI: the `covgrid` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    support::init_tracing();

    match cli.command {
        Commands::Audit {
            spatial_map,
            assignments,
            source_document,
            page,
            timestamp,
            allow_review,
            json,
        } => commands::audit::run(commands::audit::Args {
            spatial_map,
            assignments,
            config: cli.config,
            source_document,
            page,
            timestamp,
            allow_review,
            json,
        }),

        Commands::Geometer {
            spatial_map,
            allow_review,
            json,
        } => commands::geometer::run(spatial_map, cli.config, allow_review, json),

        Commands::Normalize { text, key, json } => commands::normalize::run(text, key, json),

        Commands::Canonize {
            blocks,
            row,
            options,
            json,
        } => commands::canonize::run(commands::canonize::Args {
            blocks,
            row,
            options,
            config: cli.config,
            json,
        }),
    }
}
