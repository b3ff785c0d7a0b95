// src/commands/compose.rs

//! Compose command: select modules and build the destination tree

use super::load_project;
use anyhow::{Context, Result};
use mcconf::makefile::write_makefile;
use mcconf::{CompositionEngine, Configuration, FileInstaller, ModuleGraph};
use std::fs;
use std::path::Path;
use tracing::info;

/// Compose the configured modules into the destination directory
///
/// Nothing is written unless composition finishes without a fatal error.
pub fn cmd_compose(
    configfile: &Path,
    destpath: Option<&Path>,
    depsolve: bool,
    manifest_path: Option<&Path>,
) -> Result<()> {
    let project = load_project(configfile)?;
    let catalog = &project.catalog;
    let mut config = project.config;
    if let Some(dest) = destpath {
        config.set_dest_dir(std::path::absolute(dest)?);
    }

    let mut engine = CompositionEngine::new(catalog, Configuration::from_project(&config));
    if let Err(e) = engine.process_modules(depsolve) {
        engine.diagnostics().log();
        return Err(e).context("composition failed, nothing was installed");
    }
    let composition = engine.into_composition()?;
    composition.diagnostics.log();

    let dest = config.dest_dir();
    let installer = FileInstaller::new(&dest, config.vars.clone())?;
    let installed = installer.install_manifest(&composition.manifest)?;

    let graph = ModuleGraph::for_selection(catalog, &composition.accepted, &composition.targets);
    fs::write(dest.join("config.dot"), graph.to_dot())
        .with_context(|| format!("writing {}", dest.join("config.dot").display()))?;
    write_makefile(&dest, &composition, catalog, &config.vars)
        .with_context(|| format!("writing Makefile in {}", dest.display()))?;

    if let Some(path) = manifest_path {
        fs::write(path, composition.manifest.to_json()?)
            .with_context(|| format!("writing manifest {}", path.display()))?;
        info!("wrote manifest to {}", path.display());
    }

    println!(
        "Composed {} modules ({} added by dependency solving), {} files into {}",
        composition.accepted.len(),
        composition.added.len(),
        installed,
        dest.display()
    );
    if composition.diagnostics.warnings() > 0 {
        println!("{} warning(s), see log for details", composition.diagnostics.warnings());
    }
    Ok(())
}
