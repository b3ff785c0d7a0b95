// src/commands/mod.rs
//! Command handlers for the mcconf CLI

mod check;
mod compose;
mod graph;

pub use check::cmd_check;
pub use compose::cmd_compose;
pub use graph::cmd_graph;

use anyhow::{Context, Result};
use mcconf::{IncludeScanner, ModuleCatalog, ProjectConfig, load_config};
use std::path::Path;
use tracing::info;

/// A loaded configuration together with the modules it can see
pub(crate) struct Project {
    pub config: ProjectConfig,
    pub catalog: ModuleCatalog,
}

/// Load the configuration file and every module in its module directories
pub(crate) fn load_project(configfile: &Path) -> Result<Project> {
    info!("processing configuration {}", configfile.display());
    let config = load_config(configfile)
        .with_context(|| format!("loading configuration {}", configfile.display()))?;

    let mut catalog = ModuleCatalog::new();
    let strategy = config.default_strategy()?;
    let diagnostics = catalog
        .load_from_paths(&config.module_dirs(), &IncludeScanner::new(), strategy)
        .context("loading module files")?;
    diagnostics.log();

    info!("loaded {} modules", catalog.len());
    Ok(Project { config, catalog })
}
