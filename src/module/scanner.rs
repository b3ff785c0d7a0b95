// src/module/scanner.rs

//! Reference scanning for source files
//!
//! Extracts include-style reference tokens from a file and turns them into
//! requirement tags. A token naming a file next to the referencing source
//! is rewritten into the owning module's destination namespace, so it
//! matches the tag the module (or another module installing the same path)
//! provides. Tokens that don't resolve locally are kept verbatim and
//! treated as paths relative to the destination root.

use super::{FileDescriptor, TEMPLATE_PREFIX, Tag, join_dest};
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use tracing::warn;

static INCLUDE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"#include\s+[<"]([\w./-]+)[>"]"#).expect("include pattern is valid")
});

/// Extracts reference tokens from a source file
pub trait ReferenceScanner {
    fn scan(&self, path: &Path) -> io::Result<Vec<String>>;
}

/// Scanner for C/C++ `#include` directives
#[derive(Debug, Default, Clone, Copy)]
pub struct IncludeScanner;

impl IncludeScanner {
    pub fn new() -> Self {
        Self
    }

    /// Tokens in text order, duplicates kept
    pub fn scan_str(content: &str) -> Vec<String> {
        INCLUDE_RE
            .captures_iter(content)
            .filter_map(|cap| cap.get(1))
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

impl ReferenceScanner for IncludeScanner {
    fn scan(&self, path: &Path) -> io::Result<Vec<String>> {
        let bytes = fs::read(path)?;
        Ok(Self::scan_str(&String::from_utf8_lossy(&bytes)))
    }
}

/// Requirement tags of one file; unreadable files contribute nothing
pub(crate) fn file_references(
    scanner: &dyn ReferenceScanner,
    file: &FileDescriptor,
    module_dir: &Path,
    dest_dir: &str,
) -> BTreeSet<Tag> {
    let tokens = match scanner.scan(&file.source_path) {
        Ok(tokens) => tokens,
        Err(e) => {
            warn!(
                "could not scan {} from module {}: {}",
                file.source_path.display(),
                file.module,
                e
            );
            return BTreeSet::new();
        }
    };

    let source_dir = file.source_path.parent().unwrap_or(module_dir);
    tokens
        .iter()
        .map(|token| normalize_reference(token, source_dir, module_dir, dest_dir))
        .collect()
}

/// Map a reference token to a tag
///
/// If `source_dir/token` exists and stays inside `module_dir`, the result is
/// its module-relative path under `dest_dir`; otherwise the raw token. A
/// template-prefixed sibling counts as the file it renders to.
pub fn normalize_reference(token: &str, source_dir: &Path, module_dir: &Path, dest_dir: &str) -> Tag {
    let candidate = source_dir.join(token);
    if (candidate.exists() || template_source(&candidate).is_some_and(|t| t.exists()))
        && let Ok(relative) = candidate.strip_prefix(module_dir)
        && let Some(normalized) = normalize_relative(relative)
    {
        return join_dest(dest_dir, &normalized);
    }
    token.to_string()
}

/// `dir/template.<name>` for `dir/<name>`
fn template_source(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    Some(path.with_file_name(format!("{}{}", TEMPLATE_PREFIX, name)))
}

/// Lexically resolve `.` and `..`; `None` if the path climbs above its base
pub(crate) fn normalize_relative(path: &Path) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(c) => parts.push(c.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
