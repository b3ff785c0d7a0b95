// src/manifest.rs

//! Composition output: which file goes where, and how
//!
//! Entries are keyed by role, then by destination path. A destination path
//! appears under at most one role; inserting it again replaces the earlier
//! entry wherever it was.

use crate::module::{FileDescriptor, InstallStrategy};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One file to materialize
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    pub source_path: PathBuf,
    pub dest_path: String,
    pub strategy: InstallStrategy,
    /// Module that contributed the file
    pub module: String,
}

impl From<&FileDescriptor> for ManifestEntry {
    fn from(file: &FileDescriptor) -> Self {
        Self {
            source_path: file.source_path.clone(),
            dest_path: file.dest_path.clone(),
            strategy: file.strategy,
            module: file.module.clone(),
        }
    }
}

/// Role -> destination path -> entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Manifest {
    roles: BTreeMap<String, BTreeMap<String, ManifestEntry>>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry under `role`, returning the entry it replaced
    pub fn insert(&mut self, role: &str, entry: ManifestEntry) -> Option<ManifestEntry> {
        let mut previous = None;
        for files in self.roles.values_mut() {
            if let Some(old) = files.remove(&entry.dest_path) {
                previous = Some(old);
            }
        }
        self.roles.retain(|_, files| !files.is_empty());

        self.roles
            .entry(role.to_string())
            .or_default()
            .insert(entry.dest_path.clone(), entry);
        previous
    }

    pub fn get(&self, dest_path: &str) -> Option<&ManifestEntry> {
        self.roles.values().find_map(|files| files.get(dest_path))
    }

    /// Role names in order
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }

    /// Entries of one role in destination order
    pub fn role(&self, role: &str) -> impl Iterator<Item = &ManifestEntry> {
        self.roles.get(role).into_iter().flat_map(|files| files.values())
    }

    /// All entries, ordered by role then destination
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ManifestEntry)> {
        self.roles
            .iter()
            .flat_map(|(role, files)| files.values().map(move |e| (role.as_str(), e)))
    }

    pub fn len(&self) -> usize {
        self.roles.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
