use std::fmt::Write as _;
use std::fs::File;

use crate::combat::engine::SimulationReport;
use crate::combat::legendary::LegendaryRegistry;
use crate::combat::progression::{ProgressionCatalog, ProgressionStep};
use crate::data::catalog::{load_weapon_catalog, WeaponCatalog};
use crate::data::config::{load_build_config, PreparedBuild};
use crate::data::error::ConfigError;
use crate::parallel::{compare_builds, rank_reports, WorkerPool};
use crate::report::{format_report_table, write_slots_csv, write_summary_csv};

const USAGE: &str = "usage: dpsim <simulate|compare|weapons|progressions>";

/// Flags that take a value; their values are not positional arguments.
const VALUE_FLAGS: &[&str] = &["--catalog", "--csv", "--seed", "--rounds", "--workers"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Simulate,
    Compare,
    Weapons,
    Progressions,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("simulate") => Some(Command::Simulate),
        Some("compare") => Some(Command::Compare),
        Some("weapons") => Some(Command::Weapons),
        Some("progressions") => Some(Command::Progressions),
        _ => None,
    }
}

pub fn run_with_args(args: &[String]) -> i32 {
    match parse_command(args) {
        Some(Command::Simulate) => handle_simulate(args),
        Some(Command::Compare) => handle_compare(args),
        Some(Command::Weapons) => handle_weapons(args),
        Some(Command::Progressions) => handle_progressions(),
        None => {
            eprintln!("{USAGE}");
            2
        }
    }
}

fn handle_simulate(args: &[String]) -> i32 {
    let positional = positional_args(args);
    let Some(path) = positional.first() else {
        eprintln!(
            "usage: dpsim simulate <build.yaml|build.json> [--table] [--seed N] [--rounds N] \
             [--csv out.csv] [--catalog weapons.json]"
        );
        return 2;
    };
    let overrides = match parse_overrides(args) {
        Ok(overrides) => overrides,
        Err(message) => {
            eprintln!("{message}");
            return 2;
        }
    };

    let prepared = match prepare(path, args, overrides) {
        Ok(prepared) => prepared,
        Err(err) => {
            eprintln!("invalid build {path}: {err}");
            return 1;
        }
    };
    let report = prepared.run();
    emit_reports(args, std::slice::from_ref(&report), false)
}

fn handle_compare(args: &[String]) -> i32 {
    let paths = positional_args(args);
    if paths.len() < 2 {
        eprintln!(
            "usage: dpsim compare <build> <build> [...] [--workers N] [--table] [--csv out.csv]"
        );
        return 2;
    }
    let overrides = match parse_overrides(args) {
        Ok(overrides) => overrides,
        Err(message) => {
            eprintln!("{message}");
            return 2;
        }
    };

    let mut builds = Vec::with_capacity(paths.len());
    for path in &paths {
        match prepare(path, args, overrides) {
            Ok(prepared) => builds.push(prepared),
            Err(err) => {
                eprintln!("invalid build {path}: {err}");
                return 1;
            }
        }
    }

    let pool = match overrides.workers {
        Some(workers) => WorkerPool::with_workers(workers),
        None => WorkerPool::default_workers(),
    };
    let reports = compare_builds(&builds, &pool);
    emit_reports(args, &reports, true)
}

fn handle_weapons(args: &[String]) -> i32 {
    let catalog = match catalog_for(args) {
        Ok(catalog) => catalog,
        Err(err) => {
            eprintln!("failed to load weapon catalog: {err}");
            return 1;
        }
    };
    println!("name\tdamage\tsize\tthreat\tmultiplier\ttype\tlegendary");
    for weapon in catalog.iter() {
        println!(
            "{}\t{}\t{}\t{}-20\tx{}\t{}\t{}",
            weapon.name,
            weapon.damage,
            weapon.size.as_str(),
            weapon.critical_threat,
            weapon.critical_multiplier,
            weapon.damage_type,
            if weapon.legendary.is_some() { "yes" } else { "no" }
        );
    }
    0
}

fn handle_progressions() -> i32 {
    let catalog = ProgressionCatalog::builtin();
    for progression in catalog.iter() {
        let mut line = String::new();
        for (index, step) in progression.steps.iter().enumerate() {
            if index > 0 {
                line.push(' ');
            }
            let _ = match step {
                ProgressionStep::Offset(offset) => write!(&mut line, "{offset:+}"),
                ProgressionStep::Special(kind) => write!(&mut line, "{}", kind.as_str()),
            };
        }
        println!("{}\t{line}", progression.name);
    }
    0
}

fn emit_reports(args: &[String], reports: &[SimulationReport], ranked: bool) -> i32 {
    if let Some(path) = flag_value(args, "--csv") {
        if let Err(err) = write_csv_pair(path, reports) {
            eprintln!("failed to write csv {path}: {err}");
            return 1;
        }
    }

    if args.iter().any(|arg| arg == "--table") {
        let ordered: Vec<&SimulationReport> = if ranked {
            rank_reports(reports)
        } else {
            reports.iter().collect()
        };
        for report in ordered {
            println!("{}", format_report_table(report));
        }
        return 0;
    }

    let payload = if reports.len() == 1 && !ranked {
        serde_json::to_string_pretty(&reports[0])
    } else {
        serde_json::to_string_pretty(reports)
    };
    match payload {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => {
            eprintln!("failed to serialize simulation report: {err}");
            1
        }
    }
}

/// Summary goes to `path`, the per-slot table next to it as `<stem>.slots.csv`.
fn write_csv_pair(
    path: &str,
    reports: &[SimulationReport],
) -> Result<(), Box<dyn std::error::Error>> {
    write_summary_csv(File::create(path)?, reports)?;
    let slots_path = match path.strip_suffix(".csv") {
        Some(stem) => format!("{stem}.slots.csv"),
        None => format!("{path}.slots.csv"),
    };
    write_slots_csv(File::create(slots_path)?, reports)?;
    Ok(())
}

fn prepare(
    path: &str,
    args: &[String],
    overrides: Overrides,
) -> Result<PreparedBuild, ConfigError> {
    let mut config = load_build_config(path)?;
    if let Some(seed) = overrides.seed {
        config.simulation.seed = seed;
    }
    if let Some(rounds) = overrides.rounds {
        config.simulation.round_cap = rounds;
    }
    PreparedBuild::from_config(
        &config,
        &catalog_for(args)?,
        &ProgressionCatalog::builtin(),
        &LegendaryRegistry::builtin(),
    )
}

fn catalog_for(args: &[String]) -> Result<WeaponCatalog, ConfigError> {
    match flag_value(args, "--catalog") {
        Some(path) => load_weapon_catalog(path),
        None => WeaponCatalog::builtin(),
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a String> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|index| args.get(index + 1))
}

/// Arguments after the command that are neither flags nor flag values.
fn positional_args(args: &[String]) -> Vec<&str> {
    let mut positional = Vec::new();
    let mut skip_next = false;
    for arg in args.iter().skip(2) {
        if skip_next {
            skip_next = false;
            continue;
        }
        if VALUE_FLAGS.contains(&arg.as_str()) {
            skip_next = true;
            continue;
        }
        if arg.starts_with("--") {
            continue;
        }
        positional.push(arg.as_str());
    }
    positional
}

/// Numeric flag overrides, parsed before any build is loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Overrides {
    seed: Option<u64>,
    rounds: Option<u64>,
    workers: Option<usize>,
}

fn parse_overrides(args: &[String]) -> Result<Overrides, String> {
    let workers = parse_u64_flag(args, "--workers")?
        .map(|workers| {
            usize::try_from(workers).map_err(|_| format!("--workers value {workers} is too large"))
        })
        .transpose()?;
    Ok(Overrides {
        seed: parse_u64_flag(args, "--seed")?,
        rounds: parse_u64_flag(args, "--rounds")?,
        workers,
    })
}

/// `Ok(None)` when the flag is absent; a present flag must carry a non-negative integer.
fn parse_u64_flag(args: &[String], flag: &str) -> Result<Option<u64>, String> {
    if !args.iter().any(|arg| arg == flag) {
        return Ok(None);
    }
    let Some(raw) = flag_value(args, flag) else {
        return Err(format!("{flag} needs a value"));
    };
    raw.parse::<u64>()
        .map(Some)
        .map_err(|_| format!("invalid {flag} value '{raw}': expected a non-negative integer"))
}
