// src/config.rs

//! Project configuration file
//!
//! ```toml
//! [config]
//! moduledirs = ["../modules"]
//! modules = ["boot", "uart"]
//! requires = ["console"]
//! provides = ["platform"]
//! destdir = "build"
//! linkmode = "link"
//!
//! [config.vars]
//! arch = "x86_64"
//! ```
//!
//! Relative `moduledirs` and `destdir` are resolved against the directory
//! holding the configuration file.

use crate::error::{Error, Result};
use crate::module::{InstallStrategy, Tag};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "project.config";

#[derive(Debug, Deserialize)]
struct ConfigFile {
    config: ProjectConfig,
}

/// The `[config]` table of a project configuration file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectConfig {
    /// Directories searched for module files
    #[serde(default)]
    pub moduledirs: Vec<PathBuf>,

    /// Target module names
    #[serde(default)]
    pub modules: BTreeSet<String>,

    /// Requirements not tied to any module
    #[serde(default)]
    pub requires: BTreeSet<Tag>,

    /// Capabilities not tied to any module
    #[serde(default)]
    pub provides: BTreeSet<Tag>,

    /// Destination root
    #[serde(default = "default_destdir")]
    pub destdir: PathBuf,

    /// Variables for templates and makefile fragments
    #[serde(default)]
    pub vars: BTreeMap<String, toml::Value>,

    /// Strategy for files not forced to copy or template
    #[serde(default)]
    pub linkmode: Option<String>,

    #[serde(flatten)]
    unknown: BTreeMap<String, toml::Value>,

    #[serde(skip)]
    base_dir: PathBuf,
}

fn default_destdir() -> PathBuf {
    PathBuf::from(".")
}

impl ProjectConfig {
    /// Directory relative paths are resolved against
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn module_dirs(&self) -> Vec<PathBuf> {
        self.moduledirs
            .iter()
            .map(|dir| self.base_dir.join(dir))
            .collect()
    }

    pub fn dest_dir(&self) -> PathBuf {
        self.base_dir.join(&self.destdir)
    }

    /// Override the destination root (e.g. from the command line)
    pub fn set_dest_dir(&mut self, dest: impl Into<PathBuf>) {
        self.destdir = dest.into();
    }

    /// Install strategy for plain files
    pub fn default_strategy(&self) -> Result<InstallStrategy> {
        let Some(mode) = self.linkmode.as_deref() else {
            return Ok(InstallStrategy::Link);
        };
        match InstallStrategy::parse(mode) {
            Some(
                strategy @ (InstallStrategy::Link
                | InstallStrategy::Hardlink
                | InstallStrategy::LiteralInclude),
            ) => Ok(strategy),
            _ => Err(Error::InvalidConfig(format!(
                "linkmode must be link, hardlink or include, got {}",
                mode
            ))),
        }
    }
}

/// Load and validate a project configuration file
pub fn load_config(path: &Path) -> Result<ProjectConfig> {
    let content = fs::read_to_string(path)?;
    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    parse_config_str(&content, path, base_dir)
}

/// Parse configuration text; `base_dir` anchors relative paths
pub fn parse_config_str(content: &str, path: &Path, base_dir: PathBuf) -> Result<ProjectConfig> {
    let file: ConfigFile = toml::from_str(content).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let mut config = file.config;
    config.base_dir = base_dir;

    for field in config.unknown.keys() {
        warn!("ignoring unknown configuration field {} in {}", field, path.display());
    }
    config.default_strategy()?;
    Ok(config)
}
