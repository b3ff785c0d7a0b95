// src/module/mod.rs

//! Module and file descriptors
//!
//! A module bundles a set of source files with the capability tags it
//! provides and requires. Tags are opaque strings; every destination path
//! of a module's files is also a tag the module provides, so a file that
//! includes `include/io.h` can be satisfied by whichever module installs
//! that header.
//!
//! Descriptors are built once by the loader (or programmatically), then
//! [`ModuleDescriptor::finish`] derives the effective provides/requires.
//! After insertion into a [`crate::ModuleCatalog`] a descriptor is only
//! reachable through shared references.

pub mod parser;
pub mod scanner;

pub use parser::{find_files, parse_module_file, parse_module_str};
pub use scanner::{IncludeScanner, ReferenceScanner};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Capability or file-identity label shared by provides and requires
pub type Tag = String;

/// File names starting with this prefix are rendered as templates
pub const TEMPLATE_PREFIX: &str = "template.";

/// How a file is materialized in the destination tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallStrategy {
    /// Relative symlink to the source file
    #[default]
    Link,
    /// Hard link to the source file
    Hardlink,
    /// A one-line file that `#include`s the source
    LiteralInclude,
    /// Byte copy of the source
    Copy,
    /// Source rendered as a template
    Template,
}

impl InstallStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallStrategy::Link => "link",
            InstallStrategy::Hardlink => "hardlink",
            InstallStrategy::LiteralInclude => "literal-include",
            InstallStrategy::Copy => "copy",
            InstallStrategy::Template => "template",
        }
    }

    /// Parse a strategy name; `include` and `cinclude` are accepted for literal-include
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "link" => Some(InstallStrategy::Link),
            "hardlink" => Some(InstallStrategy::Hardlink),
            "literal-include" | "include" | "cinclude" => Some(InstallStrategy::LiteralInclude),
            "copy" => Some(InstallStrategy::Copy),
            "template" => Some(InstallStrategy::Template),
            _ => None,
        }
    }
}

impl fmt::Display for InstallStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source file contributed by a module and where it lands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Name of the owning module
    pub module: String,
    /// Path relative to the owning module's directory
    pub source_ref: String,
    /// Full path to the source content
    pub source_path: PathBuf,
    /// Path relative to the destination root
    pub dest_path: String,
    pub strategy: InstallStrategy,
    /// Tags derived from reference tokens in the source content
    pub implicit_requires: BTreeSet<Tag>,
}

impl FileDescriptor {
    /// Create a descriptor for `source_ref` inside `module_dir`
    ///
    /// Template-prefixed files drop the prefix from their destination name
    /// and get [`InstallStrategy::Template`]; everything else starts with
    /// `default_strategy`.
    pub fn new(
        module: &str,
        module_dir: &Path,
        dest_dir: &str,
        source_ref: &str,
        default_strategy: InstallStrategy,
    ) -> Self {
        let (dest_name, strategy) = match split_template_prefix(source_ref) {
            Some(stripped) => (stripped, InstallStrategy::Template),
            None => (source_ref.to_string(), default_strategy),
        };

        Self {
            module: module.to_string(),
            source_ref: source_ref.to_string(),
            source_path: module_dir.join(source_ref),
            dest_path: join_dest(dest_dir, &dest_name),
            strategy,
            implicit_requires: BTreeSet::new(),
        }
    }

    pub fn with_strategy(mut self, strategy: InstallStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_requires<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Tag>,
    {
        self.implicit_requires.extend(tags.into_iter().map(Into::into));
        self
    }
}

/// Strip the template prefix from the file name component, if present
fn split_template_prefix(source_ref: &str) -> Option<String> {
    let (dir, file) = match source_ref.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, source_ref),
    };
    let stripped = file.strip_prefix(TEMPLATE_PREFIX)?;
    if stripped.is_empty() {
        return None;
    }
    Some(match dir {
        Some(dir) => format!("{}/{}", dir, stripped),
        None => stripped.to_string(),
    })
}

/// Join a destination subdirectory and a relative name with `/`
pub fn join_dest(dest_dir: &str, name: &str) -> String {
    let dest_dir = dest_dir.trim_matches('/');
    if dest_dir.is_empty() || dest_dir == "." {
        name.to_string()
    } else {
        format!("{}/{}", dest_dir, name)
    }
}

/// Tags computed by [`ModuleDescriptor::finish`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct DerivedTags {
    provides: BTreeSet<Tag>,
    requires: BTreeSet<Tag>,
    implicit_requires: BTreeSet<Tag>,
}

/// A named unit of files, requirements and capabilities
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    pub name: String,
    /// File the module was declared in
    pub origin: PathBuf,
    /// Directory that relative source paths are resolved against
    pub module_dir: PathBuf,
    /// Destination subdirectory override ("" for the root)
    pub dest_dir: String,
    pub requires: BTreeSet<Tag>,
    pub provides: BTreeSet<Tag>,
    /// Modules always selected together with this one
    pub includes: BTreeSet<String>,
    /// Source names forced to the copy strategy
    pub copy_files: BTreeSet<String>,
    /// Role label -> files in declaration order
    pub files: BTreeMap<String, Vec<FileDescriptor>>,
    pub makefile_head: Option<String>,
    pub makefile_body: Option<String>,
    /// Unrecognized declaration fields, passed through to renderers
    pub extra: BTreeMap<String, toml::Value>,
    derived: DerivedTags,
    finished: bool,
}

impl ModuleDescriptor {
    /// Create an empty module declared in `origin`
    pub fn new(name: impl Into<String>, origin: impl Into<PathBuf>) -> Self {
        let origin = origin.into();
        let module_dir = origin
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Self {
            name: name.into(),
            origin,
            module_dir,
            dest_dir: String::new(),
            requires: BTreeSet::new(),
            provides: BTreeSet::new(),
            includes: BTreeSet::new(),
            copy_files: BTreeSet::new(),
            files: BTreeMap::new(),
            makefile_head: None,
            makefile_body: None,
            extra: BTreeMap::new(),
            derived: DerivedTags::default(),
            finished: false,
        }
    }

    pub fn with_requires<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Tag>,
    {
        self.requires.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_provides<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Tag>,
    {
        self.provides.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_includes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.includes.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_dest_dir(mut self, dest_dir: impl Into<String>) -> Self {
        self.dest_dir = dest_dir.into();
        self
    }

    pub fn with_file(mut self, role: &str, file: FileDescriptor) -> Self {
        self.files.entry(role.to_string()).or_default().push(file);
        self
    }

    /// Add files under `role`, relative to the module directory
    pub fn add_files<I, S>(&mut self, role: &str, names: I, default_strategy: InstallStrategy)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let files: Vec<FileDescriptor> = names
            .into_iter()
            .map(|name| {
                FileDescriptor::new(
                    &self.name,
                    &self.module_dir,
                    &self.dest_dir,
                    name.as_ref(),
                    default_strategy,
                )
            })
            .collect();
        self.files.entry(role.to_string()).or_default().extend(files);
    }

    /// Fill every file's implicit requirements from its reference tokens
    pub fn scan_references(&mut self, scanner: &dyn ReferenceScanner) {
        for files in self.files.values_mut() {
            for file in files.iter_mut() {
                let tags = scanner::file_references(scanner, file, &self.module_dir, &self.dest_dir);
                file.implicit_requires.extend(tags);
            }
        }
    }

    /// Derive effective provides and requires
    ///
    /// Runs once; later calls leave the derived sets untouched. Also applies
    /// the copy list to file strategies.
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }

        let mut derived = DerivedTags {
            provides: self.provides.clone(),
            ..DerivedTags::default()
        };

        for files in self.files.values_mut() {
            for file in files.iter_mut() {
                if self.copy_files.contains(&file.source_ref) {
                    file.strategy = InstallStrategy::Copy;
                }
                derived.provides.insert(file.dest_path.clone());
                derived
                    .implicit_requires
                    .extend(file.implicit_requires.iter().cloned());
            }
        }

        derived.requires = self
            .requires
            .union(&derived.implicit_requires)
            .filter(|tag| !derived.provides.contains(*tag))
            .cloned()
            .collect();

        self.derived = derived;
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Declared provides plus every owned destination path
    pub fn effective_provides(&self) -> &BTreeSet<Tag> {
        &self.derived.provides
    }

    /// Declared and file-derived requirements not satisfied by the module itself
    pub fn effective_requires(&self) -> &BTreeSet<Tag> {
        &self.derived.requires
    }

    /// Union of the files' implicit requirements, before self-satisfied ones are dropped
    pub fn implicit_requires(&self) -> &BTreeSet<Tag> {
        &self.derived.implicit_requires
    }

    /// Iterate `(role, file)` pairs in role order
    pub fn all_files(&self) -> impl Iterator<Item = (&str, &FileDescriptor)> {
        self.files
            .iter()
            .flat_map(|(role, files)| files.iter().map(move |f| (role.as_str(), f)))
    }
}

impl fmt::Display for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
