// src/lib.rs

//! mcconf - module-based source tree composition
//!
//! Composes a project's source tree from reusable modules. Each module
//! declares the tags it provides and requires and the files it contributes;
//! file destinations and `#include` references found in the files become
//! tags as well.
//!
//! # Architecture
//!
//! - Catalog: every known module, indexed by provided and required tag
//! - Composition: closure over hard includes with eager conflict detection,
//!   then an optional greedy solver that only picks unique providers
//! - Diagnostics: non-fatal findings are values, never just log lines
//! - Manifest: destination-keyed file records for the installer, makefile
//!   generator and graph export

pub mod catalog;
pub mod compose;
pub mod config;
pub mod diagnostics;
mod error;
pub mod graph;
pub mod install;
pub mod makefile;
pub mod manifest;
pub mod module;
pub mod template;

pub use catalog::ModuleCatalog;
pub use compose::{Composition, CompositionEngine, ConfigState, Configuration};
pub use config::{ProjectConfig, load_config};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{Error, Result};
pub use graph::ModuleGraph;
pub use install::FileInstaller;
pub use manifest::{Manifest, ManifestEntry};
pub use module::{
    FileDescriptor, IncludeScanner, InstallStrategy, ModuleDescriptor, ReferenceScanner, Tag,
};
