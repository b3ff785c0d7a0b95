// src/commands/check.rs

//! Consistency check command

use super::load_project;
use anyhow::Result;
use mcconf::{CompositionEngine, Configuration};
use std::path::Path;

/// Report catalog problems and requested modules that could be dropped
pub fn cmd_check(configfile: &Path) -> Result<()> {
    let project = load_project(configfile)?;

    let mut diagnostics = project.catalog.consistency_report();
    let engine = CompositionEngine::new(
        &project.catalog,
        Configuration::from_project(&project.config),
    );
    diagnostics.append(engine.check_consistency());
    diagnostics.log();

    println!(
        "Checked {} modules: {} warning(s), {} note(s)",
        project.catalog.len(),
        diagnostics.warnings(),
        diagnostics.len() - diagnostics.warnings()
    );
    Ok(())
}
