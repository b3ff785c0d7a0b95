// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("mcconf")
        .version(env!("CARGO_PKG_VERSION"))
        .author("mcconf Contributors")
        .about("Compose a source tree from reusable modules")
        .subcommand_required(true)
        .arg(
            Arg::new("configfile")
                .short('i')
                .long("configfile")
                .global(true)
                .default_value("project.config")
                .help("Project configuration file"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Show debug output on the console"),
        )
        .subcommand(
            Command::new("compose")
                .about("Select modules and build the destination tree")
                .arg(
                    Arg::new("destpath")
                        .short('d')
                        .long("destpath")
                        .help("Destination directory (overrides destdir from the configuration)"),
                )
                .arg(
                    Arg::new("depsolve")
                        .long("depsolve")
                        .action(ArgAction::SetTrue)
                        .help("Add modules from the search path to satisfy missing requirements"),
                )
                .arg(
                    Arg::new("manifest")
                        .long("manifest")
                        .value_name("FILE")
                        .help("Also write the file manifest as JSON"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Report inconsistencies in the module catalog and configuration"),
        )
        .subcommand(
            Command::new("graph")
                .about("Write the dependency graph of all known modules")
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .default_value("dependencies.dot")
                        .help("Output file"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src/cli.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();
    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    if let Err(e) = fs::write(man_dir.join("mcconf.1"), buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
