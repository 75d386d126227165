use std::fs;
use std::path::Path;

use clap::CommandFactory;

// Compiled against the build-dependency copies of clap and clap_complete.
#[path = "src/cli.rs"]
mod cli;

fn main() {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let out_dir = std::env::var_os("OUT_DIR").expect("OUT_DIR not set by Cargo");
    let man_dir = Path::new(&out_dir).join("man");
    fs::create_dir_all(&man_dir).expect("failed to create man output directory");

    let mut pages = Vec::new();
    collect_pages(cli::Cli::command(), &mut pages);
    for page in pages {
        write_page(&page, &man_dir);
    }
}

/// `questcast`, then `questcast-watch`, `questcast-wireless-connect` and so
/// on. Hidden subcommands get no page.
fn collect_pages(cmd: clap::Command, pages: &mut Vec<clap::Command>) {
    let prefix = cmd.get_name().to_owned();
    let children: Vec<clap::Command> = cmd
        .get_subcommands()
        .filter(|sub| !sub.is_hide_set())
        .map(|sub| sub.clone().name(format!("{prefix}-{}", sub.get_name())))
        .collect();
    pages.push(cmd);
    for child in children {
        collect_pages(child, pages);
    }
}

fn write_page(cmd: &clap::Command, dir: &Path) {
    let path = dir.join(format!("{}.1", cmd.get_name()));
    let mut roff = Vec::new();
    clap_mangen::Man::new(cmd.clone())
        .render(&mut roff)
        .unwrap_or_else(|e| panic!("rendering {}: {e}", path.display()));
    fs::write(&path, roff).unwrap_or_else(|e| panic!("writing {}: {e}", path.display()));
}
