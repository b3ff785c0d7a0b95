// src/commands/graph.rs

//! Dependency graph export

use super::load_project;
use anyhow::{Context, Result};
use mcconf::ModuleGraph;
use std::fs;
use std::path::Path;
use tracing::info;

/// Write the Graphviz graph of every known module to `output`
pub fn cmd_graph(configfile: &Path, output: &Path) -> Result<()> {
    let project = load_project(configfile)?;
    let graph = ModuleGraph::for_catalog(&project.catalog);

    fs::write(output, graph.to_dot())
        .with_context(|| format!("writing graph to {}", output.display()))?;
    info!("wrote dependency graph to {}", output.display());

    println!(
        "Wrote {} modules and {} edges to {}",
        graph.nodes().count(),
        graph.edges().len(),
        output.display()
    );
    Ok(())
}
