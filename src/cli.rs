// src/cli.rs
//! CLI definitions for mcconf
//!
//! Global options select the project configuration and verbosity; the
//! command decides what to do with the loaded catalog:
//! - `compose` - select modules, install files, write Makefile and graph
//! - `check` - catalog and configuration consistency report
//! - `graph` - export the whole catalog as a Graphviz graph

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mcconf")]
#[command(author = "mcconf Contributors")]
#[command(version)]
#[command(about = "Compose a source tree from reusable modules", long_about = None)]
pub struct Cli {
    /// Project configuration file
    #[arg(short = 'i', long, global = true, default_value = mcconf::config::DEFAULT_CONFIG_FILE)]
    pub configfile: PathBuf,

    /// Show debug output on the console
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Select modules and build the destination tree
    Compose {
        /// Destination directory (overrides destdir from the configuration)
        #[arg(short, long)]
        destpath: Option<PathBuf>,

        /// Add modules from the search path to satisfy missing requirements
        #[arg(long)]
        depsolve: bool,

        /// Also write the file manifest as JSON
        #[arg(long)]
        manifest: Option<PathBuf>,
    },

    /// Report inconsistencies in the module catalog and configuration
    Check,

    /// Write the dependency graph of all known modules
    Graph {
        /// Output file
        #[arg(short, long, default_value = "dependencies.dot")]
        output: PathBuf,
    },
}
