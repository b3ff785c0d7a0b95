// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use mcconf::{IncludeScanner, InstallStrategy, ModuleCatalog, ModuleDescriptor};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch project: module sources below `modules/`, output below `out/`.
///
/// Keep the struct alive for as long as the files are needed.
pub struct ProjectTree {
    pub temp_dir: TempDir,
}

impl ProjectTree {
    pub fn new() -> Self {
        Self {
            temp_dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn modules_dir(&self) -> PathBuf {
        self.root().join("modules")
    }

    pub fn out_dir(&self) -> PathBuf {
        self.root().join("out")
    }

    /// Write `content` to `relative`, creating parent directories
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    /// Write a module file into `modules/<dir>/mcconf.toml`
    pub fn module_file(&self, dir: &str, content: &str) -> PathBuf {
        self.write(&format!("modules/{}/mcconf.toml", dir), content)
    }

    /// Write `project.config` at the root and return its path
    pub fn config(&self, content: &str) -> PathBuf {
        self.write("project.config", content)
    }

    /// Load every module below `modules/` with the default link strategy
    pub fn catalog(&self) -> ModuleCatalog {
        let mut catalog = ModuleCatalog::new();
        let diagnostics = catalog
            .load_from_paths(&[self.modules_dir()], &IncludeScanner::new(), InstallStrategy::Link)
            .unwrap();
        assert!(diagnostics.is_empty(), "unexpected load diagnostics: {:?}", diagnostics);
        catalog
    }
}

/// Build an in-memory catalog from `(name, requires, provides)` triples.
pub fn catalog_of(specs: &[(&str, &[&str], &[&str])]) -> ModuleCatalog {
    let mut catalog = ModuleCatalog::new();
    for (name, requires, provides) in specs {
        let module = ModuleDescriptor::new(*name, format!("/mods/{}/mcconf.toml", name))
            .with_requires(requires.iter().copied())
            .with_provides(provides.iter().copied());
        assert!(catalog.insert(module).is_none());
    }
    catalog
}
