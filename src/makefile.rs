// src/makefile.rs

//! Makefile generation for a composed tree
//!
//! Each manifest role becomes a make variable listing its destination
//! files (`SRCFILES = a.cc b.cc`) plus derived object and dependency lists.
//! Module `makefile_head`/`makefile_body` fragments are rendered as
//! templates and pasted in module name order. `.cc` and `.S` files get
//! compile rules using role-prefixed tool variables, so `KERNELFILES`
//! compiles with `$(KERNEL_CXX)`.

use crate::catalog::ModuleCatalog;
use crate::compose::Composition;
use crate::error::Result;
use crate::template::{Vars, module_context, render_template};
use std::fs;
use std::path::Path;

/// Render the makefile text for a resolved composition
pub fn generate_makefile(
    composition: &Composition,
    catalog: &ModuleCatalog,
    vars: &Vars,
) -> Result<String> {
    let manifest = &composition.manifest;
    let roles: Vec<&str> = manifest.roles().collect();
    let mut out = String::new();

    for role in &roles {
        let files: Vec<&str> = manifest.role(role).map(|e| e.dest_path.as_str()).collect();
        out.push_str(&format!("{} = {}\n", role, files.join(" ")));
        out.push_str(&format!("{}_OBJ = $(addsuffix .o, $(basename $({})))\n", role, role));
        out.push_str(&format!("DEP += $(addsuffix .d, $(basename $({})))\n", role));
    }
    out.push('\n');

    out.push_str("DEPFLAGS += -MP -MMD -pipe\n");
    out.push_str(".PHONY: all clean cleanall\n\n");

    let modules: Vec<_> = composition
        .accepted
        .iter()
        .filter_map(|name| catalog.get(name))
        .collect();

    for module in &modules {
        if let Some(head) = &module.makefile_head {
            let name = format!("{}.makefile_head", module.name);
            out.push_str(&render_template(&name, head, module_context(vars, module))?);
            out.push('\n');
        }
    }
    out.push('\n');

    out.push_str("all: $(TARGETS)\n\n");

    for module in &modules {
        if let Some(body) = &module.makefile_body {
            let name = format!("{}.makefile_body", module.name);
            out.push_str(&render_template(&name, body, module_context(vars, module))?);
            out.push('\n');
        }
    }

    for role in &roles {
        let prefix = tool_prefix(role);
        for entry in manifest.role(role) {
            let file = entry.dest_path.as_str();
            if let Some(stem) = file.strip_suffix(".cc") {
                out.push_str(&format!("{}.o: {}\n", stem, file));
                out.push_str(&format!(
                    "\t$({p}CXX) $({p}CXXFLAGS) $({p}CPPFLAGS) $(DEPFLAGS) -c -o $@ $<\n",
                    p = prefix
                ));
            } else if let Some(stem) = file.strip_suffix(".S") {
                out.push_str(&format!("{}.o: {}\n", stem, file));
                out.push_str(&format!(
                    "\t$({p}AS) $({p}ASFLAGS) $({p}CPPFLAGS) $(DEPFLAGS) -c -o $@ $<\n",
                    p = prefix
                ));
            }
        }
    }
    out.push('\n');

    out.push_str("clean:\n");
    for role in &roles {
        out.push_str(&format!("\t- $(RM) $({}_OBJ)\n", role));
    }
    out.push_str("\t- $(RM) $(TARGETS) $(EXTRATARGETS)\n\n");

    out.push_str("cleanall: clean\n\t- $(RM) $(DEP)\n\n");
    out.push_str("ifneq ($(MAKECMDGOALS),clean)\n");
    out.push_str("ifneq ($(MAKECMDGOALS),cleanall)\n");
    out.push_str("-include $(DEP)\n");
    out.push_str("endif\nendif\n\n");

    Ok(out)
}

/// Render and write `Makefile` into `dest_dir`
pub fn write_makefile(
    dest_dir: &Path,
    composition: &Composition,
    catalog: &ModuleCatalog,
    vars: &Vars,
) -> Result<()> {
    let text = generate_makefile(composition, catalog, vars)?;
    fs::write(dest_dir.join("Makefile"), text)?;
    Ok(())
}

/// `KERNELFILES` -> `KERNEL_`
fn tool_prefix(role: &str) -> String {
    format!("{}_", role.strip_suffix("FILES").unwrap_or(role))
}
