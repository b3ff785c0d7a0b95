// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Console output filtered by `RUST_LOG` (or `-v`), plus a full debug log
/// next to the configuration file when it can be created
fn init_tracing(configfile: &Path, verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let console = fmt::layer().with_target(false).with_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
    );

    let mut log_name = configfile.as_os_str().to_owned();
    log_name.push(".log");
    let file_layer = File::create(&log_name).ok().map(|file| {
        fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .with_filter(LevelFilter::DEBUG)
    });

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.configfile, cli.verbose);

    match cli.command {
        Commands::Compose {
            destpath,
            depsolve,
            manifest,
        } => commands::cmd_compose(
            &cli.configfile,
            destpath.as_deref(),
            depsolve,
            manifest.as_deref(),
        ),
        Commands::Check => commands::cmd_check(&cli.configfile),
        Commands::Graph { output } => commands::cmd_graph(&cli.configfile, &output),
    }
}
