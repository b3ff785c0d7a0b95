// src/install.rs

//! Materializes a manifest into the destination tree
//!
//! Only run this on a resolved composition. Every entry's destination is
//! validated to stay inside the destination root, parent directories are
//! created, and whatever already sits at the destination (file or symlink)
//! is removed before the new file is written.

use crate::error::{Error, Result};
use crate::manifest::{Manifest, ManifestEntry};
use crate::module::InstallStrategy;
use crate::template::{Vars, render_template, vars_context};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// Installs manifest entries below a destination root
#[derive(Debug)]
pub struct FileInstaller {
    dest_root: PathBuf,
    vars: Vars,
}

impl FileInstaller {
    /// Create an installer, creating the destination root if needed
    pub fn new(dest_root: impl AsRef<Path>, vars: Vars) -> Result<Self> {
        let dest_root = dest_root.as_ref();
        if !dest_root.exists() {
            fs::create_dir_all(dest_root)?;
            debug!("Created destination root: {}", dest_root.display());
        }
        let dest_root = std::path::absolute(dest_root)?;
        Ok(Self { dest_root, vars })
    }

    pub fn dest_root(&self) -> &Path {
        &self.dest_root
    }

    /// Install every entry, returning how many files were written
    pub fn install_manifest(&self, manifest: &Manifest) -> Result<usize> {
        let mut count = 0;
        for (_, entry) in manifest.entries() {
            self.install_entry(entry)?;
            count += 1;
        }
        info!("installed {} files into {}", count, self.dest_root.display());
        Ok(count)
    }

    /// Install one entry and return its target path
    pub fn install_entry(&self, entry: &ManifestEntry) -> Result<PathBuf> {
        let source = std::path::absolute(&entry.source_path)?;
        let target = self.safe_target_path(&entry.dest_path)?;

        debug!(
            "installing file {} to {} mode {} from module {}",
            source.display(),
            target.display(),
            entry.strategy,
            entry.module
        );
        if !source.is_file() {
            warn!(
                "file {} is missing or not a regular file, provided by {}",
                source.display(),
                entry.module
            );
        }

        let parent = target
            .parent()
            .ok_or_else(|| Error::InvalidPath(entry.dest_path.clone()))?;
        fs::create_dir_all(parent)?;

        if target.symlink_metadata().is_ok() {
            fs::remove_file(&target)?;
        }

        match entry.strategy {
            InstallStrategy::Link => symlink(&relative_path(parent, &source), &target)?,
            InstallStrategy::Hardlink => fs::hard_link(&source, &target)?,
            InstallStrategy::LiteralInclude => {
                let include = relative_path(parent, &source);
                fs::write(&target, format!("#include \"{}\"\n", include.display()))?;
            }
            InstallStrategy::Template => {
                let text = fs::read_to_string(&source)?;
                let rendered = render_template(&entry.dest_path, &text, vars_context(&self.vars))?;
                fs::write(&target, rendered)?;
            }
            InstallStrategy::Copy => {
                fs::copy(&source, &target)?;
            }
        }

        Ok(target)
    }

    /// Join `dest` onto the root, rejecting `..` and empty paths
    fn safe_target_path(&self, dest: &str) -> Result<PathBuf> {
        let mut normalized = PathBuf::new();
        for component in Path::new(dest.trim_start_matches('/')).components() {
            match component {
                Component::Normal(c) => normalized.push(c),
                Component::CurDir => {}
                Component::ParentDir => {
                    warn!("Path traversal attempt detected: {}", dest);
                    return Err(Error::InvalidPath(format!("path traversal in {}", dest)));
                }
                Component::Prefix(_) | Component::RootDir => {}
            }
        }

        if normalized.as_os_str().is_empty() {
            return Err(Error::InvalidPath(format!("empty destination {:?}", dest)));
        }
        Ok(self.dest_root.join(normalized))
    }
}

#[cfg(unix)]
fn symlink(original: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(not(unix))]
fn symlink(original: &Path, link: &Path) -> std::io::Result<()> {
    let resolved = link.parent().map(|p| p.join(original)).unwrap_or_default();
    fs::copy(resolved, link).map(|_| ())
}

/// Path from directory `from` to `to`, both absolute
fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from: Vec<Component> = from.components().collect();
    let to: Vec<Component> = to.components().collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut relative = PathBuf::new();
    for _ in common..from.len() {
        relative.push("..");
    }
    for component in &to[common..] {
        relative.push(component.as_os_str());
    }
    relative
}
