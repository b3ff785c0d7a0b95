// src/catalog.rs

//! Module catalog
//!
//! Holds every known module and two indices, tag -> providers and
//! tag -> requirers. The indices are only ever updated by [`ModuleCatalog::insert`]
//! and always equal the union of the registered modules' effective
//! provides/requires. Modules are never removed.
//!
//! Conflict and consistency queries are brute force over the providers of
//! each tag, which is fine for catalogs of a few hundred modules.

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::Result;
use crate::module::{InstallStrategy, ModuleDescriptor, ReferenceScanner, Tag, parse_module_file};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

static NO_MODULES: BTreeSet<String> = BTreeSet::new();

/// File names recognized as module declarations
const MODULE_FILE_NAME: &str = "mcconf.toml";
const MODULE_FILE_SUFFIXES: [&str; 2] = [".module", ".mcconf"];

/// All known modules indexed by provided and required tags
#[derive(Debug, Default)]
pub struct ModuleCatalog {
    modules: BTreeMap<String, ModuleDescriptor>,
    providers: BTreeMap<Tag, BTreeSet<String>>,
    requirers: BTreeMap<Tag, BTreeSet<String>>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module
    ///
    /// The module is finished first if the caller hasn't done so. A name
    /// that is already registered is rejected with a diagnostic and the
    /// first registration stays.
    pub fn insert(&mut self, mut module: ModuleDescriptor) -> Option<Diagnostic> {
        if let Some(existing) = self.modules.get(&module.name) {
            return Some(Diagnostic::DuplicateModule {
                name: module.name,
                origin: module.origin,
                existing: existing.origin.clone(),
            });
        }

        module.finish();
        debug!("loaded {} from {}", module.name, module.origin.display());

        for tag in module.effective_provides() {
            self.providers
                .entry(tag.clone())
                .or_default()
                .insert(module.name.clone());
        }
        for tag in module.effective_requires() {
            self.requirers
                .entry(tag.clone())
                .or_default()
                .insert(module.name.clone());
        }

        self.modules.insert(module.name.clone(), module);
        None
    }

    /// Register several modules, collecting duplicate diagnostics
    pub fn insert_all<I>(&mut self, modules: I) -> Diagnostics
    where
        I: IntoIterator<Item = ModuleDescriptor>,
    {
        let mut diagnostics = Diagnostics::new();
        diagnostics.extend(modules.into_iter().filter_map(|m| self.insert(m)));
        diagnostics
    }

    /// Parse and register every module file found below `dirs`
    ///
    /// Directories are searched recursively and files visited in name order,
    /// so the first-registration-wins rule is deterministic.
    pub fn load_from_paths<P: AsRef<Path>>(
        &mut self,
        dirs: &[P],
        scanner: &dyn ReferenceScanner,
        default_strategy: InstallStrategy,
    ) -> Result<Diagnostics> {
        let mut diagnostics = Diagnostics::new();
        for dir in dirs {
            for file in find_module_files(dir.as_ref()) {
                let modules = parse_module_file(&file, scanner, default_strategy)?;
                diagnostics.append(self.insert_all(modules));
            }
        }
        Ok(diagnostics)
    }

    pub fn get(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.modules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Modules in name order
    pub fn modules(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.modules.values()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Every tag that is provided or required by some module
    pub fn tags(&self) -> BTreeSet<&Tag> {
        self.providers.keys().chain(self.requirers.keys()).collect()
    }

    /// Names of modules providing `tag`; empty for unknown tags
    pub fn providers(&self, tag: &str) -> &BTreeSet<String> {
        self.providers.get(tag).unwrap_or(&NO_MODULES)
    }

    /// Names of modules requiring `tag`; empty for unknown tags
    pub fn requirers(&self, tag: &str) -> &BTreeSet<String> {
        self.requirers.get(tag).unwrap_or(&NO_MODULES)
    }

    /// One-hop check that each requirement is already provided or has a provider
    ///
    /// Passing this doesn't prove the module's own dependencies resolve.
    pub fn is_resolvable(&self, module: &ModuleDescriptor, provided: &BTreeSet<Tag>) -> bool {
        for tag in module.effective_requires() {
            if !provided.contains(tag) && self.providers(tag).is_empty() {
                debug!(
                    "discarded module {} because of unresolvable dependency on {}",
                    module.name, tag
                );
                return false;
            }
        }
        true
    }

    /// Providers of `tag` that pass [`Self::is_resolvable`]
    pub fn resolvable_providers(&self, tag: &str, provided: &BTreeSet<Tag>) -> BTreeSet<String> {
        self.providers(tag)
            .iter()
            .filter(|name| {
                self.get(name)
                    .is_some_and(|module| self.is_resolvable(module, provided))
            })
            .cloned()
            .collect()
    }

    /// Other modules providing any of `module`'s tags, with the shared tags
    pub fn conflicts_of(&self, module: &ModuleDescriptor) -> BTreeMap<String, BTreeSet<Tag>> {
        let mut conflicts: BTreeMap<String, BTreeSet<Tag>> = BTreeMap::new();
        for tag in module.effective_provides() {
            for other in self.providers(tag) {
                if *other == module.name {
                    continue;
                }
                conflicts.entry(other.clone()).or_default().insert(tag.clone());
            }
        }
        conflicts
    }

    /// Modules satisfying at least one of `module`'s requirements, with those tags
    pub fn solution_candidates(&self, module: &ModuleDescriptor) -> BTreeMap<String, BTreeSet<Tag>> {
        let mut candidates: BTreeMap<String, BTreeSet<Tag>> = BTreeMap::new();
        for tag in module.effective_requires() {
            for provider in self.providers(tag) {
                candidates
                    .entry(provider.clone())
                    .or_default()
                    .insert(tag.clone());
            }
        }
        candidates
    }

    /// Advisory catalog check
    ///
    /// Reports explicit requirements that the module's files already imply,
    /// then tags required somewhere that nothing provides. Requirements the
    /// module satisfies itself are not reported as redundant.
    pub fn consistency_report(&self) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();

        for module in self.modules() {
            let redundant: BTreeSet<Tag> = module
                .requires
                .intersection(module.implicit_requires())
                .filter(|tag| !module.effective_provides().contains(*tag))
                .cloned()
                .collect();
            if !redundant.is_empty() {
                diagnostics.push(Diagnostic::RedundantRequirement {
                    module: module.name.clone(),
                    origin: module.origin.clone(),
                    tags: redundant,
                });
            }
        }

        for (tag, required_by) in &self.requirers {
            if !self.providers.contains_key(tag) {
                diagnostics.push(Diagnostic::DeadRequirement {
                    tag: tag.clone(),
                    required_by: required_by.clone(),
                });
            }
        }

        diagnostics
    }
}

/// Module declaration files below `dir`, in sorted order
pub fn find_module_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable entry below {}: {}", dir.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name == MODULE_FILE_NAME || MODULE_FILE_SUFFIXES.iter().any(|s| name.ends_with(s)) {
            files.push(entry.into_path());
        }
    }
    files
}
