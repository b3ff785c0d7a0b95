// src/compose.rs

//! Composition engine
//!
//! Turns a set of target modules into an accepted, conflict-free module set
//! and a manifest of files to install. Three phases:
//!
//! 1. Closure ([`CompositionEngine::apply_modules`]): accept the named
//!    modules and their hard includes, failing on unknown names and on any
//!    tag that would be provided twice.
//! 2. Dependency solving ([`CompositionEngine::resolve_dependencies`]):
//!    repeatedly add the unique viable provider of each missing tag until a
//!    pass adds nothing. Greedy and non-backtracking; tags with zero or
//!    several candidates are left alone.
//! 3. Redundancy check ([`CompositionEngine::check_consistency`]): advisory
//!    only.
//!
//! All set iteration is in lexicographic order, so identical inputs give
//! identical selections and diagnostics.

use crate::catalog::ModuleCatalog;
use crate::config::ProjectConfig;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{Error, Result};
use crate::manifest::{Manifest, ManifestEntry};
use crate::module::Tag;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Lifecycle of a [`Configuration`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigState {
    /// Still accepting modules
    #[default]
    Open,
    /// Fully processed; the manifest may be installed
    Resolved,
    /// A fatal error stopped processing; the partial selection must not be used
    Aborted,
}

/// Selection state of one composition run
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    targets: BTreeSet<String>,
    requires: BTreeSet<Tag>,
    provides: BTreeSet<Tag>,
    accepted: BTreeSet<String>,
    manifest: Manifest,
    state: ConfigState,
}

impl Configuration {
    /// Fresh configuration selecting `targets`
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Add requirements that no module declares (e.g. top-level build needs)
    pub fn with_requires<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Tag>,
    {
        self.requires.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Add capabilities that no module declares
    pub fn with_provides<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Tag>,
    {
        self.provides.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn from_project(config: &ProjectConfig) -> Self {
        Self::new(config.modules.iter().cloned())
            .with_requires(config.requires.iter().cloned())
            .with_provides(config.provides.iter().cloned())
    }

    pub fn targets(&self) -> &BTreeSet<String> {
        &self.targets
    }

    pub fn requires(&self) -> &BTreeSet<Tag> {
        &self.requires
    }

    pub fn provides(&self) -> &BTreeSet<Tag> {
        &self.provides
    }

    pub fn accepted(&self) -> &BTreeSet<String> {
        &self.accepted
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn state(&self) -> ConfigState {
        self.state
    }

    /// Required tags that nothing accepted provides
    pub fn missing_requires(&self) -> BTreeSet<Tag> {
        self.requires.difference(&self.provides).cloned().collect()
    }
}

/// Result of a successfully processed configuration
#[derive(Debug, Clone)]
pub struct Composition {
    pub targets: BTreeSet<String>,
    pub accepted: BTreeSet<String>,
    /// Modules added by dependency solving
    pub added: BTreeSet<String>,
    pub requires: BTreeSet<Tag>,
    pub provides: BTreeSet<Tag>,
    pub manifest: Manifest,
    pub diagnostics: Diagnostics,
}

/// Runs the composition phases for one configuration against a catalog
#[derive(Debug)]
pub struct CompositionEngine<'a> {
    catalog: &'a ModuleCatalog,
    config: Configuration,
    diagnostics: Diagnostics,
    added: BTreeSet<String>,
    solver_passes: usize,
}

impl<'a> CompositionEngine<'a> {
    pub fn new(catalog: &'a ModuleCatalog, config: Configuration) -> Self {
        Self {
            catalog,
            config,
            diagnostics: Diagnostics::new(),
            added: BTreeSet::new(),
            solver_passes: 0,
        }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Modules added so far by dependency solving
    pub fn added(&self) -> &BTreeSet<String> {
        &self.added
    }

    /// Solver passes run so far, including the final one that added nothing
    pub fn solver_passes(&self) -> usize {
        self.solver_passes
    }

    fn ensure_open(&self) -> Result<()> {
        match self.config.state {
            ConfigState::Open => Ok(()),
            state => Err(Error::InvalidConfig(format!(
                "configuration is {:?} and accepts no further modules",
                state
            ))),
        }
    }

    /// Accept `names` and everything they hard-include
    ///
    /// Already accepted modules are skipped. Returns the newly accepted
    /// names in acceptance order. Fails with [`Error::NotFound`] or
    /// [`Error::Conflict`], after which the configuration is aborted.
    pub fn apply_modules<I, S>(&mut self, names: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ensure_open()?;
        let pending: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        let result = self.apply_pending(pending);
        if result.is_err() {
            self.config.state = ConfigState::Aborted;
        }
        result
    }

    fn apply_pending(&mut self, mut pending: BTreeSet<String>) -> Result<Vec<String>> {
        let catalog = self.catalog;
        let mut newly_accepted = Vec::new();

        while let Some(name) = pending.pop_first() {
            let module = catalog
                .get(&name)
                .ok_or_else(|| Error::NotFound(name.clone()))?;
            if self.config.accepted.contains(&name) {
                continue;
            }

            let conflicts: BTreeSet<&Tag> = self
                .config
                .provides
                .intersection(module.effective_provides())
                .collect();
            if !conflicts.is_empty() {
                let providers: BTreeSet<&String> = conflicts
                    .iter()
                    .flat_map(|tag| catalog.providers(tag))
                    .filter(|provider| self.config.accepted.contains(*provider))
                    .collect();
                return Err(Error::Conflict {
                    module: name,
                    tags: conflicts.into_iter().cloned().collect(),
                    providers: providers.into_iter().cloned().collect(),
                });
            }

            debug!("selecting module {}", name);
            self.config.accepted.insert(name.clone());
            self.config
                .requires
                .extend(module.effective_requires().iter().cloned());
            self.config
                .provides
                .extend(module.effective_provides().iter().cloned());

            for (role, file) in module.all_files() {
                if let Some(previous) = self.config.manifest.insert(role, ManifestEntry::from(file)) {
                    self.diagnostics.push(Diagnostic::DuplicateDestination {
                        dest_path: file.dest_path.clone(),
                        module: module.name.clone(),
                        previous: previous.module,
                    });
                }
            }

            pending.extend(
                module
                    .includes
                    .iter()
                    .filter(|include| !self.config.accepted.contains(*include))
                    .cloned(),
            );
            newly_accepted.push(name);
        }

        Ok(newly_accepted)
    }

    /// Greedily add unique providers for missing requirements
    ///
    /// Each pass walks the missing tags in order. A tag is satisfied only
    /// when exactly one resolvable provider exists and it conflicts with
    /// nothing already selected; conflicting candidates are skipped, not
    /// reported. Stops when a pass adds nothing or nothing is missing.
    /// Returns the modules added by this call.
    pub fn resolve_dependencies(&mut self) -> Result<BTreeSet<String>> {
        self.ensure_open()?;
        let catalog = self.catalog;
        let mut added = BTreeSet::new();
        let mut missing = self.config.missing_requires();

        while !missing.is_empty() {
            self.solver_passes += 1;
            let mut count = 0;
            for tag in &missing {
                if self.config.provides.contains(tag) {
                    continue;
                }

                let candidates = catalog.resolvable_providers(tag, &self.config.provides);
                if candidates.len() != 1 {
                    debug!("{} candidate(s) for {}, skipping", candidates.len(), tag);
                    continue;
                }
                let Some(candidate) = candidates.into_iter().next() else {
                    continue;
                };
                let Some(module) = catalog.get(&candidate) else {
                    continue;
                };
                if !self.config.provides.is_disjoint(module.effective_provides()) {
                    debug!("candidate {} for {} conflicts with selection", candidate, tag);
                    continue;
                }

                debug!("satisfy dependency {} with module {}", tag, candidate);
                let accepted = self.apply_modules([candidate.as_str()])?;
                added.extend(accepted);
                count += 1;
            }

            missing = self.config.missing_requires();
            debug!(
                "solver pass {} added {} module(s), {} tag(s) missing",
                self.solver_passes,
                count,
                missing.len()
            );
            if count == 0 {
                break;
            }
        }

        self.added.extend(added.iter().cloned());
        Ok(added)
    }

    /// Run closure over the targets, optionally solve, then report leftovers
    ///
    /// On success the configuration is resolved. Unsatisfied requirements
    /// become diagnostics and never fail the run.
    pub fn process_modules(&mut self, solve: bool) -> Result<()> {
        let targets: Vec<String> = self.config.targets.iter().cloned().collect();
        self.apply_modules(targets)?;

        if solve {
            let added = self.resolve_dependencies()?;
            let names: Vec<&str> = added.iter().map(String::as_str).collect();
            info!("added modules to resolve dependencies: {}", names.join(", "));
        }

        self.report_missing(solve);
        self.config.state = ConfigState::Resolved;
        Ok(())
    }

    fn report_missing(&mut self, solved: bool) {
        for tag in self.config.missing_requires() {
            let required_by: BTreeSet<String> = self
                .catalog
                .requirers(&tag)
                .intersection(&self.config.accepted)
                .cloned()
                .collect();
            let candidates: BTreeSet<String> = self
                .catalog
                .providers(&tag)
                .difference(&self.config.accepted)
                .cloned()
                .collect();

            if solved {
                let viable = self.catalog.resolvable_providers(&tag, &self.config.provides);
                if viable.len() > 1 {
                    self.diagnostics.push(Diagnostic::AmbiguousRequirement {
                        tag: tag.clone(),
                        candidates: viable,
                    });
                }
            }

            self.diagnostics.push(Diagnostic::UnresolvedRequirement {
                tag,
                required_by,
                candidates,
            });
        }
    }

    /// Flag requested modules that nothing else in the selection needs
    ///
    /// A requested module is reported when no other catalog module provides
    /// any of its tags and none of its tags is required by another selected
    /// module. Never changes the selection.
    pub fn check_consistency(&self) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        let selected: BTreeSet<&String> = self
            .config
            .targets
            .iter()
            .chain(self.config.accepted.iter())
            .collect();

        for name in &self.config.targets {
            let Some(module) = self.catalog.get(name) else {
                continue;
            };
            if !self.catalog.conflicts_of(module).is_empty() {
                continue;
            }

            let needed = module.effective_provides().iter().any(|tag| {
                self.catalog
                    .requirers(tag)
                    .iter()
                    .any(|requirer| requirer != name && selected.contains(requirer))
            });
            if !needed {
                diagnostics.push(Diagnostic::RemovableModule {
                    module: name.clone(),
                });
            }
        }

        diagnostics
    }

    /// Consume a resolved engine into its result
    pub fn into_composition(self) -> Result<Composition> {
        if self.config.state != ConfigState::Resolved {
            return Err(Error::InvalidConfig(format!(
                "configuration is {:?}, not resolved",
                self.config.state
            )));
        }

        Ok(Composition {
            targets: self.config.targets,
            accepted: self.config.accepted,
            added: self.added,
            requires: self.config.requires,
            provides: self.config.provides,
            manifest: self.config.manifest,
            diagnostics: self.diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{FileDescriptor, InstallStrategy, ModuleDescriptor};
    use std::path::Path;

    fn module(name: &str) -> ModuleDescriptor {
        ModuleDescriptor::new(name, format!("/mods/{}/mcconf.toml", name))
    }

    fn catalog(modules: Vec<ModuleDescriptor>) -> ModuleCatalog {
        let mut catalog = ModuleCatalog::new();
        assert!(catalog.insert_all(modules).is_empty());
        catalog
    }

    fn names(set: &BTreeSet<String>) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_apply_is_idempotent() {
        let catalog = catalog(vec![module("X").with_provides(["x"])]);
        let mut engine = CompositionEngine::new(&catalog, Configuration::default());

        assert_eq!(engine.apply_modules(["X"]).unwrap(), vec!["X"]);
        assert!(engine.apply_modules(["X", "X"]).unwrap().is_empty());
        assert_eq!(names(engine.configuration().accepted()), vec!["X"]);
    }

    #[test]
    fn test_apply_follows_hard_includes() {
        let catalog = catalog(vec![
            module("app").with_includes(["libc"]),
            module("libc").with_includes(["app", "crt0"]),
            module("crt0"),
        ]);
        let mut engine = CompositionEngine::new(&catalog, Configuration::default());

        engine.apply_modules(["app"]).unwrap();
        assert_eq!(names(engine.configuration().accepted()), vec!["app", "crt0", "libc"]);
    }

    #[test]
    fn test_unknown_module_aborts() {
        let catalog = catalog(vec![module("A").with_includes(["ghost"])]);
        let mut engine = CompositionEngine::new(&catalog, Configuration::default());

        let err = engine.apply_modules(["A"]).unwrap_err();
        assert!(matches!(err, Error::NotFound(ref n) if n == "ghost"));
        assert_eq!(engine.configuration().state(), ConfigState::Aborted);
        assert!(engine.apply_modules(["A"]).is_err());
    }

    #[test]
    fn test_conflict_names_tag_and_provider() {
        let catalog = catalog(vec![
            module("B").with_provides(["net"]),
            module("C").with_provides(["net"]),
        ]);
        let mut engine = CompositionEngine::new(&catalog, Configuration::default());

        match engine.apply_modules(["C", "B"]) {
            Err(Error::Conflict {
                module,
                tags,
                providers,
            }) => {
                assert_eq!(module, "C");
                assert_eq!(tags, vec!["net"]);
                assert_eq!(providers, vec!["B"]);
            }
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[test]
    fn test_global_provides_block_conflicting_module() {
        let catalog = catalog(vec![module("B").with_provides(["net"])]);
        let config = Configuration::new(["B"]).with_provides(["net"]);
        let mut engine = CompositionEngine::new(&catalog, config);

        let err = engine.process_modules(false).unwrap_err();
        assert!(matches!(err, Error::Conflict { ref providers, .. } if providers.is_empty()));
    }

    #[test]
    fn test_duplicate_destination_is_last_write_wins() {
        let dup = |m: &str| {
            FileDescriptor::new(m, Path::new("/mods").join(m).as_path(), "", "io.h", InstallStrategy::Link)
        };
        // Destination paths are provides, so identical files in two modules
        // only collide when one of them declares the file twice.
        let catalog = catalog(vec![
            module("A")
                .with_file("INCFILES", dup("A"))
                .with_file("SRCFILES", dup("A")),
        ]);
        let mut engine = CompositionEngine::new(&catalog, Configuration::new(["A"]));
        engine.process_modules(false).unwrap();

        let composition = engine.into_composition().unwrap();
        assert_eq!(composition.manifest.len(), 1);
        assert_eq!(composition.manifest.roles().collect::<Vec<_>>(), vec!["SRCFILES"]);
        assert!(matches!(
            composition.diagnostics.iter().next(),
            Some(Diagnostic::DuplicateDestination { dest_path, .. }) if dest_path == "io.h"
        ));
    }

    #[test]
    fn test_solver_follows_chains() {
        let catalog = catalog(vec![
            module("app").with_requires(["net"]),
            module("tcp").with_provides(["net"]).with_requires(["ip"]),
            module("ip").with_provides(["ip"]).with_requires(["eth"]),
            module("eth").with_provides(["eth"]),
        ]);
        let mut engine = CompositionEngine::new(&catalog, Configuration::new(["app"]));
        engine.process_modules(true).unwrap();

        assert_eq!(names(engine.added()), vec!["eth", "ip", "tcp"]);
        assert!(engine.diagnostics().is_empty());
        // one pass per link of the chain
        assert_eq!(engine.solver_passes(), 3);
    }

    #[test]
    fn test_solver_skips_conflicting_unique_candidate() {
        let catalog = catalog(vec![
            module("app").with_requires(["net"]).with_provides(["log"]),
            module("B").with_provides(["net", "log"]),
        ]);
        let mut engine = CompositionEngine::new(&catalog, Configuration::new(["app"]));
        engine.process_modules(true).unwrap();

        assert_eq!(names(engine.configuration().accepted()), vec!["app"]);
        let diags: Vec<&Diagnostic> = engine.diagnostics().iter().collect();
        assert_eq!(diags.len(), 1);
        assert!(matches!(diags[0], Diagnostic::UnresolvedRequirement { candidates, .. }
            if names(candidates) == vec!["B"]));
    }

    #[test]
    fn test_solver_skips_unresolvable_provider() {
        let catalog = catalog(vec![
            module("app").with_requires(["net"]),
            module("B").with_provides(["net"]),
            module("C").with_provides(["net"]).with_requires(["nowhere"]),
        ]);
        let mut engine = CompositionEngine::new(&catalog, Configuration::new(["app"]));
        engine.process_modules(true).unwrap();

        assert_eq!(names(engine.configuration().accepted()), vec!["B", "app"]);
    }

    #[test]
    fn test_global_requires_are_solved() {
        let catalog = catalog(vec![module("K").with_provides(["kernel"])]);
        let config = Configuration::new(Vec::<String>::new()).with_requires(["kernel"]);
        let mut engine = CompositionEngine::new(&catalog, config);
        engine.process_modules(true).unwrap();

        assert_eq!(names(engine.configuration().accepted()), vec!["K"]);
    }

    #[test]
    fn test_without_solving_requirements_stay_missing() {
        let catalog = catalog(vec![
            module("A").with_requires(["net"]),
            module("B").with_provides(["net"]),
        ]);
        let mut engine = CompositionEngine::new(&catalog, Configuration::new(["A"]));
        engine.process_modules(false).unwrap();

        assert_eq!(names(engine.configuration().accepted()), vec!["A"]);
        assert_eq!(engine.diagnostics().len(), 1);
    }

    #[test]
    fn test_into_composition_requires_resolved() {
        let catalog = catalog(vec![module("A")]);
        let engine = CompositionEngine::new(&catalog, Configuration::new(["A"]));
        assert!(engine.into_composition().is_err());
    }

    #[test]
    fn test_removable_modules() {
        let catalog = catalog(vec![
            module("A").with_requires(["net"]),
            module("B").with_provides(["net"]),
            module("C").with_provides(["dns"]),
            module("D").with_provides(["dns"]),
        ]);
        let engine = CompositionEngine::new(&catalog, Configuration::new(["A", "B", "C"]));

        let flagged: Vec<String> = engine
            .check_consistency()
            .into_iter()
            .map(|d| match d {
                Diagnostic::RemovableModule { module } => module,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        // B is needed by A; C conflicts with D
        assert_eq!(flagged, vec!["A"]);
    }
}
