// tests/loading.rs

//! Loading project configurations and module declaration files.

mod common;

use common::ProjectTree;
use mcconf::diagnostics::Diagnostic;
use mcconf::{
    CompositionEngine, Configuration, Error, IncludeScanner, InstallStrategy, ModuleCatalog,
    load_config,
};

#[test]
fn test_load_config_resolves_relative_paths() {
    let tree = ProjectTree::new();
    let path = tree.config(
        r#"
[config]
moduledirs = ["modules"]
modules = ["app"]
destdir = "out"
linkmode = "include"

[config.vars]
board = "stm32"
"#,
    );

    let config = load_config(&path).unwrap();
    assert_eq!(config.module_dirs(), vec![tree.modules_dir()]);
    assert_eq!(config.dest_dir(), tree.out_dir());
    assert_eq!(config.default_strategy().unwrap(), InstallStrategy::LiteralInclude);
    assert_eq!(config.vars["board"].as_str(), Some("stm32"));
}

#[test]
fn test_load_config_rejects_bad_linkmode() {
    let tree = ProjectTree::new();
    let path = tree.config("[config]\nlinkmode = \"teleport\"\n");
    assert!(matches!(load_config(&path), Err(Error::InvalidConfig(_))));
}

#[test]
fn test_load_config_reports_toml_errors() {
    let tree = ProjectTree::new();
    let path = tree.config("[config\nmodules = [");
    assert!(matches!(load_config(&path), Err(Error::Parse { .. })));
}

#[test]
fn test_module_fields_are_parsed() {
    let tree = ProjectTree::new();
    tree.module_file(
        "uart",
        r#"
[module.uart]
incfiles = ["include/*.h"]
srcfiles = ["src/*.cc", "template.uart-config.h"]
copy = ["include/regs.h"]
requires = ["platform"]
modules = ["uart-common"]
dstdir = "drivers"
makefile_body = "uart.o: drivers/src/uart.cc"
baudrate = 115200

[module.uart-common]
provides = ["serial"]
"#,
    );
    tree.write("modules/uart/include/uart.h", "#pragma once\n");
    tree.write("modules/uart/include/regs.h", "#define BASE 0x4000\n");
    tree.write("modules/uart/src/uart.cc", "#include \"../include/uart.h\"\n");
    tree.write("modules/uart/template.uart-config.h", "#define BAUD {{ baud }}\n");

    let catalog = tree.catalog();
    assert_eq!(catalog.len(), 2);

    let uart = catalog.get("uart").unwrap();
    assert_eq!(uart.dest_dir, "drivers");
    assert!(uart.includes.contains("uart-common"));
    assert_eq!(uart.extra["baudrate"].as_integer(), Some(115200));
    assert_eq!(uart.makefile_body.as_deref(), Some("uart.o: drivers/src/uart.cc"));

    let provides: Vec<_> = uart.effective_provides().iter().map(String::as_str).collect();
    assert_eq!(
        provides,
        vec![
            "drivers/include/regs.h",
            "drivers/include/uart.h",
            "drivers/src/uart.cc",
            "drivers/uart-config.h",
        ]
    );
    // The local include resolves to a file the module provides itself
    assert_eq!(
        uart.effective_requires().iter().collect::<Vec<_>>(),
        vec!["platform"]
    );

    let strategies: Vec<_> = uart
        .all_files()
        .map(|(_, file)| (file.dest_path.as_str(), file.strategy))
        .collect();
    assert!(strategies.contains(&("drivers/include/regs.h", InstallStrategy::Copy)));
    assert!(strategies.contains(&("drivers/include/uart.h", InstallStrategy::Link)));
    assert!(strategies.contains(&("drivers/uart-config.h", InstallStrategy::Template)));

    assert_eq!(catalog.providers("serial").iter().collect::<Vec<_>>(), vec!["uart-common"]);
    assert_eq!(catalog.requirers("platform").iter().collect::<Vec<_>>(), vec!["uart"]);
}

#[test]
fn test_duplicate_module_keeps_first() {
    let tree = ProjectTree::new();
    tree.write("modules/a/first.module", "[module.dup]\nprovides = [\"one\"]\n");
    tree.write("modules/b/second.module", "[module.dup]\nprovides = [\"two\"]\n");
    tree.write("modules/b/notes.txt", "[module.ignored]\n");

    let mut catalog = ModuleCatalog::new();
    let diagnostics = catalog
        .load_from_paths(&[tree.modules_dir()], &IncludeScanner::new(), InstallStrategy::Link)
        .unwrap();

    assert_eq!(catalog.len(), 1);
    assert!(catalog.providers("one").contains("dup"));
    assert!(catalog.providers("two").is_empty());
    assert!(matches!(
        diagnostics.iter().next(),
        Some(Diagnostic::DuplicateModule { name, .. }) if name == "dup"
    ));
}

#[test]
fn test_invalid_module_file_fails_loading() {
    let tree = ProjectTree::new();
    tree.module_file("bad", "[module.bad]\nrequires = \"not-a-list\"\n");

    let mut catalog = ModuleCatalog::new();
    let result =
        catalog.load_from_paths(&[tree.modules_dir()], &IncludeScanner::new(), InstallStrategy::Link);
    assert!(matches!(result, Err(Error::InvalidModule { .. })));
}

#[test]
fn test_redundant_requirement_is_reported() {
    let tree = ProjectTree::new();
    tree.module_file(
        "m",
        r#"
[module.M]
requires = ["util.h", "clock"]
srcfiles = ["*.cc"]
"#,
    );
    tree.write("modules/m/main.cc", "#include \"util.h\"\n");

    let catalog = tree.catalog();
    let report = catalog.consistency_report();

    let redundant: Vec<_> = report
        .iter()
        .filter_map(|d| match d {
            Diagnostic::RedundantRequirement { module, tags, .. } => Some((module.clone(), tags.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(redundant.len(), 1);
    assert_eq!(redundant[0].0, "M");
    assert_eq!(redundant[0].1.iter().collect::<Vec<_>>(), vec!["util.h"]);

    // Nothing provides either tag
    let dead: Vec<_> = report
        .iter()
        .filter_map(|d| match d {
            Diagnostic::DeadRequirement { tag, .. } => Some(tag.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(dead, vec!["clock", "util.h"]);
}

#[test]
fn test_include_of_own_template_is_self_satisfied() {
    let tree = ProjectTree::new();
    tree.module_file(
        "boot",
        r#"
[module.boot]
srcfiles = ["main.cc"]
incfiles = ["template.config.h"]
dstdir = "boot"
"#,
    );
    tree.write("modules/boot/main.cc", "#include \"config.h\"\n");
    tree.write("modules/boot/template.config.h", "#define BOARD \"{{ board }}\"\n");

    tree.module_file(
        "gen",
        r#"
[module.gen]
srcfiles = ["src/main.cc"]
incfiles = ["src/template.config.h"]
"#,
    );
    tree.write("modules/gen/src/main.cc", "#include \"config.h\"\n");
    tree.write("modules/gen/src/template.config.h", "#define GEN 1\n");

    // installs a root-level config.h that must not be pulled in
    tree.module_file("root", "[module.root-config]\nincfiles = [\"config.h\"]\n");
    tree.write("modules/root/config.h", "#define ROOT 1\n");

    let catalog = tree.catalog();

    let boot = catalog.get("boot").unwrap();
    assert!(boot.effective_provides().contains("boot/config.h"));
    assert!(boot.implicit_requires().contains("boot/config.h"));
    assert!(boot.effective_requires().is_empty());

    let gen_module = catalog.get("gen").unwrap();
    assert!(gen_module.effective_provides().contains("src/config.h"));
    assert!(gen_module.effective_requires().is_empty());

    assert!(catalog.requirers("config.h").is_empty());
    let mut engine = CompositionEngine::new(&catalog, Configuration::new(["boot", "gen"]));
    engine.process_modules(true).unwrap();
    let composition = engine.into_composition().unwrap();
    assert_eq!(composition.accepted.iter().collect::<Vec<_>>(), vec!["boot", "gen"]);
    assert!(composition.diagnostics.is_empty());
}
