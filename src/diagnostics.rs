// src/diagnostics.rs

//! Non-fatal findings from loading, composition and consistency checks
//!
//! The library never reports these through logging alone: every phase
//! returns or accumulates [`Diagnostic`] values and the caller decides how
//! to present them. [`Diagnostics::log`] is the rendering the CLI uses.

use crate::module::Tag;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};

/// How prominently a diagnostic should be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
}

/// A single non-fatal finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A module name was declared twice; the first declaration was kept
    DuplicateModule {
        name: String,
        origin: PathBuf,
        existing: PathBuf,
    },
    /// Two selected files target the same destination; the later one wins
    DuplicateDestination {
        dest_path: String,
        module: String,
        previous: String,
    },
    /// Explicit requirements that the module's files already imply
    RedundantRequirement {
        module: String,
        origin: PathBuf,
        tags: BTreeSet<Tag>,
    },
    /// A tag required somewhere in the catalog that no module provides
    DeadRequirement {
        tag: Tag,
        required_by: BTreeSet<String>,
    },
    /// A requirement of the configuration left unsatisfied
    UnresolvedRequirement {
        tag: Tag,
        required_by: BTreeSet<String>,
        candidates: BTreeSet<String>,
    },
    /// Several viable providers exist, so none was picked automatically
    AmbiguousRequirement {
        tag: Tag,
        candidates: BTreeSet<String>,
    },
    /// A requested module that nothing else in the selection depends on
    RemovableModule { module: String },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::DeadRequirement { .. } | Diagnostic::RemovableModule { .. } => {
                Severity::Info
            }
            _ => Severity::Warning,
        }
    }
}

fn join(names: &BTreeSet<String>) -> String {
    names.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DuplicateModule {
                name,
                origin,
                existing,
            } => write!(
                f,
                "ignoring duplicate module {} from {} (already loaded from {})",
                name,
                origin.display(),
                existing.display()
            ),
            Diagnostic::DuplicateDestination {
                dest_path,
                module,
                previous,
            } => write!(
                f,
                "duplicate file {} from module {} and {}",
                dest_path, module, previous
            ),
            Diagnostic::RedundantRequirement {
                module,
                origin,
                tags,
            } => write!(
                f,
                "module {}({}) contains unnecessary requires: [{}]",
                module,
                origin.display(),
                join(tags)
            ),
            Diagnostic::DeadRequirement { tag, required_by } => write!(
                f,
                "tag {} required by [{}] not provided by any module",
                tag,
                join(required_by)
            ),
            Diagnostic::UnresolvedRequirement {
                tag,
                required_by,
                candidates,
            } => write!(
                f,
                "unresolved dependency {} required by [{}] provided by [{}]",
                tag,
                join(required_by),
                join(candidates)
            ),
            Diagnostic::AmbiguousRequirement { tag, candidates } => write!(
                f,
                "dependency {} has several providers [{}], select one explicitly",
                tag,
                join(candidates)
            ),
            Diagnostic::RemovableModule { module } => write!(
                f,
                "module {} is not needed by any other selected module",
                module
            ),
        }
    }
}

/// Ordered collection of diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn append(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of warnings (info-level findings excluded)
    pub fn warnings(&self) -> usize {
        self.items
            .iter()
            .filter(|d| d.severity() == Severity::Warning)
            .count()
    }

    /// Emit every diagnostic through tracing
    pub fn log(&self) {
        for diagnostic in &self.items {
            match diagnostic.severity() {
                Severity::Warning => warn!("{}", diagnostic),
                Severity::Info => info!("{}", diagnostic),
            }
        }
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
