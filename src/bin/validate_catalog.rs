//! Validate a weapon catalog against the registered legendary strategies.
//! Run: cargo run --bin validate_catalog [-- path/to/weapons.json]

use std::path::Path;

use dpsim::combat::LegendaryRegistry;
use dpsim::data::{
    load_weapon_catalog, validate_weapon_catalog, ValidationSeverity, DEFAULT_WEAPONS_PATH,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let path = std::env::args().nth(1).unwrap_or_else(|| {
        Path::new(&manifest_dir)
            .join(DEFAULT_WEAPONS_PATH)
            .display()
            .to_string()
    });

    if !Path::new(&path).exists() {
        eprintln!("Catalog not found: {path}");
        std::process::exit(1);
    }

    let catalog = load_weapon_catalog(&path)?;
    let report = validate_weapon_catalog(&catalog, &LegendaryRegistry::builtin());
    for diag in &report.diagnostics {
        if diag.severity == ValidationSeverity::Info {
            println!("{diag}");
        } else {
            eprintln!("{diag}");
        }
    }

    println!(
        "Validated {}: {} errors, {} warnings",
        path,
        report.count(ValidationSeverity::Error),
        report.count(ValidationSeverity::Warning)
    );
    if report.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}
