//! Spec listing: `auto-build --list`.

use anyhow::Result;
use auto_build::spec::{SpecInfo, list_specs};
use console::style;
use std::path::Path;

fn print_spec(spec: &SpecInfo) {
    let symbol = spec.status.symbol();
    let symbol = if spec.progress.is_complete() {
        style(symbol).green()
    } else {
        style(symbol).dim()
    };
    println!("  {} {}", symbol, style(&spec.folder).bold());
    println!(
        "       Status: {} | Progress: {}",
        spec.status,
        spec.progress_label()
    );
    println!();
}

pub fn print_specs_list(project_dir: &Path) {
    let specs = list_specs(project_dir);

    if specs.is_empty() {
        println!("\nNo specs found.");
        println!("\nCreate your first spec in:");
        println!("  auto-build/specs/001-<name>/spec.md");
        return;
    }

    println!("\n{}", "=".repeat(70));
    println!("  AVAILABLE SPECS");
    println!("{}", "=".repeat(70));
    println!();

    for spec in &specs {
        print_spec(spec);
    }

    println!("{}", "-".repeat(70));
    println!("\nTo run a spec:");
    println!("  auto-build --spec 001");
    println!("  auto-build --spec 001-feature-name");
    println!();
}

pub fn cmd_list(project_dir: &Path) -> Result<()> {
    print_specs_list(project_dir);
    Ok(())
}
