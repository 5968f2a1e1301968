//! Run simulator benchmark and optionally append one line to a log file for trend tracking.
//!
//! Usage:
//!   cargo run --release --bin benchmark_simulator
//!   cargo run --release --bin benchmark_simulator -- --log
//!
//! --log  Append one row to benchmark_log.csv
//!        (date, runs_per_sec, rounds_per_sec, attacks_per_sec, rounds_per_run).

use std::fs::OpenOptions;
use std::io::Write;
use std::time::Instant;

use dpsim::combat::SimulationConfig;
use dpsim::data::{BuildConfig, PreparedBuild};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let log = std::env::args().any(|a| a == "--log");

    let mut config = BuildConfig::default();
    config.weapon.name = "Warlord's Falchion".to_string();
    config.weapon.enhancement = 7;
    config.attack.bonus = 60;
    config.attack.progression = "hasted".to_string();
    config.character.strength_modifier = 18;
    config.character.two_handed = true;
    config.feats.keen = true;
    config.feats.overwhelming_critical = true;
    config.target.ac = 62;
    let prepared = PreparedBuild::from_config_builtin(&config)?;

    let rounds_per_run = 1_000u64;
    // thresholds too tight to converge, so every run plays the full round cap
    let sim_config = SimulationConfig {
        round_cap: rounds_per_run,
        stdev_threshold: 1e-12,
        range_threshold: 1e-12,
        ..SimulationConfig::default()
    };
    let attacks_per_round = prepared.build.attacks_per_round() as f64;

    const MIN_DURATION_MS: u128 = 2000;
    const MIN_RUNS: u64 = 50;

    let start = Instant::now();
    let mut runs: u64 = 0;
    while start.elapsed().as_millis() < MIN_DURATION_MS || runs < MIN_RUNS {
        let engine = dpsim::combat::SimulationEngine::new(
            &prepared.build,
            SimulationConfig {
                seed: runs,
                ..sim_config
            },
        );
        std::hint::black_box(engine.run());
        runs += 1;
    }
    let elapsed_secs = start.elapsed().as_secs_f64();

    let runs_per_sec = runs as f64 / elapsed_secs;
    let rounds_per_sec = runs_per_sec * rounds_per_run as f64;
    let attacks_per_sec = rounds_per_sec * attacks_per_round;

    println!("Simulator benchmark ({rounds_per_run} rounds/run):");
    println!("  Runs:        {runs}");
    println!("  Duration:    {elapsed_secs:.2} s");
    println!("  Runs/s:      {runs_per_sec:.2}");
    println!("  Rounds/s:    {rounds_per_sec:.2}");
    println!("  Attacks/s:   {attacks_per_sec:.2}");

    if log {
        let date = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        let line = format!(
            "{date},{runs_per_sec:.4},{rounds_per_sec:.4},{attacks_per_sec:.4},{rounds_per_run}\n"
        );
        let path = "benchmark_log.csv";
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        if file.metadata().map(|m| m.len() == 0).unwrap_or(true) {
            file.write_all(b"date,runs_per_sec,rounds_per_sec,attacks_per_sec,rounds_per_run\n")?;
        }
        file.write_all(line.as_bytes())?;
        file.flush()?;
        println!("Appended to {path}");
    }
    Ok(())
}
