// src/module/parser.rs

//! Parser for module declaration files
//!
//! A module file holds one `[module.<name>]` table per module:
//!
//! ```toml
//! [module.uart]
//! incfiles = ["include/*.h"]
//! srcfiles = ["src/*.cc"]
//! copy = ["include/uart-config.h"]
//! requires = ["platform"]
//! provides = ["console"]
//! modules = ["uart-common"]
//! dstdir = "drivers"
//! makefile_body = "uart: ${TARGETS}"
//! ```
//!
//! Fields ending in `files` are glob lists whose matches become files under
//! the upper-cased field name as role. Unrecognized fields are kept as-is.

use super::{InstallStrategy, ModuleDescriptor, ReferenceScanner};
use crate::error::{Error, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use toml::Value;
use tracing::warn;

/// Parse every module declared in `path`
pub fn parse_module_file(
    path: &Path,
    scanner: &dyn ReferenceScanner,
    default_strategy: InstallStrategy,
) -> Result<Vec<ModuleDescriptor>> {
    let content = fs::read_to_string(path)?;
    parse_module_str(&content, path, scanner, default_strategy)
}

/// Parse module declarations from a string; `path` locates the module directory
pub fn parse_module_str(
    content: &str,
    path: &Path,
    scanner: &dyn ReferenceScanner,
    default_strategy: InstallStrategy,
) -> Result<Vec<ModuleDescriptor>> {
    let doc: toml::Table = toml::from_str(content).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let modules = doc
        .get("module")
        .and_then(Value::as_table)
        .ok_or_else(|| invalid(path, "missing [module] table"))?;

    let mut parsed = Vec::with_capacity(modules.len());
    for (name, fields) in modules {
        let fields = fields
            .as_table()
            .ok_or_else(|| invalid(path, &format!("module {} is not a table", name)))?;
        parsed.push(build_module(name, fields, path, scanner, default_strategy)?);
    }
    Ok(parsed)
}

fn build_module(
    name: &str,
    fields: &toml::Table,
    path: &Path,
    scanner: &dyn ReferenceScanner,
    default_strategy: InstallStrategy,
) -> Result<ModuleDescriptor> {
    let mut module = ModuleDescriptor::new(name, path);
    let mut file_fields = Vec::new();

    for (field, value) in fields {
        match field.as_str() {
            f if f.ends_with("files") => {
                file_fields.push((f.to_uppercase(), string_list(value, path, name, f)?));
            }
            "copy" => module.copy_files = string_list(value, path, name, field)?.into_iter().collect(),
            "requires" => module.requires = string_list(value, path, name, field)?.into_iter().collect(),
            "provides" => module.provides = string_list(value, path, name, field)?.into_iter().collect(),
            "modules" => module.includes = string_list(value, path, name, field)?.into_iter().collect(),
            "dstdir" => module.dest_dir = string_value(value, path, name, field)?,
            "makefile_head" => module.makefile_head = Some(string_value(value, path, name, field)?),
            "makefile_body" => module.makefile_body = Some(string_value(value, path, name, field)?),
            _ => {
                module.extra.insert(field.clone(), value.clone());
            }
        }
    }

    // Files are added last so dstdir applies regardless of field order
    for (role, patterns) in file_fields {
        let names = find_files(&module.module_dir, &patterns)?;
        if names.is_empty() {
            warn!("module {} role {} matched no files in {}", name, role, path.display());
        }
        module.add_files(&role, names, default_strategy);
    }

    module.scan_references(scanner);
    module.finish();
    Ok(module)
}

/// Find files below `base_dir` matching any of the glob `patterns`
///
/// Returns `/`-separated paths relative to `base_dir`. Directories are skipped.
pub fn find_files<S: AsRef<str>>(base_dir: &Path, patterns: &[S]) -> Result<BTreeSet<String>> {
    let base = glob::Pattern::escape(&base_dir.to_string_lossy());
    let mut files = BTreeSet::new();

    for pattern in patterns {
        let pattern = pattern.as_ref();
        let full = format!("{}/{}", base.trim_end_matches('/'), pattern);
        let entries = glob::glob(&full)
            .map_err(|e| Error::InvalidPattern(format!("{}: {}", pattern, e)))?;

        for entry in entries {
            let found = match entry {
                Ok(found) => found,
                Err(e) => {
                    warn!("skipping unreadable match for {}: {}", pattern, e);
                    continue;
                }
            };
            if !found.is_file() {
                continue;
            }
            if let Ok(relative) = found.strip_prefix(base_dir) {
                let parts: Vec<String> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                files.insert(parts.join("/"));
            }
        }
    }

    Ok(files)
}

fn invalid(path: &Path, message: &str) -> Error {
    Error::InvalidModule {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

fn string_value(value: &Value, path: &Path, module: &str, field: &str) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid(path, &format!("module {} field {} must be a string", module, field)))
}

fn string_list(value: &Value, path: &Path, module: &str, field: &str) -> Result<Vec<String>> {
    let err = || invalid(path, &format!("module {} field {} must be a list of strings", module, field));
    value
        .as_array()
        .ok_or_else(err)?
        .iter()
        .map(|v| v.as_str().map(str::to_string).ok_or_else(err))
        .collect()
}
