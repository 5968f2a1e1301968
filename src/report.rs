//! Plain-text and CSV renderings of simulation reports.

use std::fmt::Write as _;
use std::io;

use serde::Serialize;

use crate::combat::engine::SimulationReport;

/// One row of the per-slot table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotRow<'a> {
    pub build: &'a str,
    pub slot: usize,
    pub kind: String,
    pub attack_bonus: i32,
    pub attempts: u64,
    pub hit_rate: f64,
    pub crit_rate: f64,
    pub proc_rate: f64,
}

/// One row of the summary table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow<'a> {
    pub build: &'a str,
    pub mean_dps: f64,
    pub ci_half_width: f64,
    pub mean_dps_no_crit: f64,
    pub ci_half_width_no_crit: f64,
    pub confidence: u8,
    pub damage_per_round: f64,
    pub legendary_burst_damage: f64,
    pub rounds: u64,
    pub hit_rate: f64,
    pub crit_rate: f64,
    pub proc_rate: f64,
    pub stop_reason: String,
    pub illegal_dual_wield: bool,
}

impl<'a> From<&'a SimulationReport> for SummaryRow<'a> {
    fn from(report: &'a SimulationReport) -> Self {
        Self {
            build: &report.build,
            mean_dps: report.mean_dps,
            ci_half_width: report.ci_half_width,
            mean_dps_no_crit: report.mean_dps_no_crit,
            ci_half_width_no_crit: report.ci_half_width_no_crit,
            confidence: report.confidence,
            damage_per_round: report.damage_per_round,
            legendary_burst_damage: report.legendary_burst_damage,
            rounds: report.rounds,
            hit_rate: report.hit_rate,
            crit_rate: report.crit_rate,
            proc_rate: report.proc_rate,
            stop_reason: report.stop_reason.to_string(),
            illegal_dual_wield: report.illegal_dual_wield,
        }
    }
}

pub fn slot_rows(report: &SimulationReport) -> impl Iterator<Item = SlotRow<'_>> {
    report.slots.iter().map(move |slot| SlotRow {
        build: &report.build,
        slot: slot.index,
        kind: slot.kind.to_string(),
        attack_bonus: slot.attack_bonus,
        attempts: slot.attempts,
        hit_rate: slot.hit_rate,
        crit_rate: slot.crit_rate,
        proc_rate: slot.proc_rate,
    })
}

pub fn write_slots_csv<W: io::Write>(
    writer: W,
    reports: &[SimulationReport],
) -> Result<(), csv::Error> {
    let mut csv = csv::Writer::from_writer(writer);
    for report in reports {
        for row in slot_rows(report) {
            csv.serialize(row)?;
        }
    }
    csv.flush()?;
    Ok(())
}

pub fn write_summary_csv<W: io::Write>(
    writer: W,
    reports: &[SimulationReport],
) -> Result<(), csv::Error> {
    let mut csv = csv::Writer::from_writer(writer);
    for report in reports {
        csv.serialize(SummaryRow::from(report))?;
    }
    csv.flush()?;
    Ok(())
}

pub fn slots_csv_string(reports: &[SimulationReport]) -> Result<String, csv::Error> {
    let mut buffer = Vec::new();
    write_slots_csv(&mut buffer, reports)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

pub fn summary_csv_string(reports: &[SimulationReport]) -> Result<String, csv::Error> {
    let mut buffer = Vec::new();
    write_summary_csv(&mut buffer, reports)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Human-readable block for one report.
pub fn format_report_table(report: &SimulationReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "build: {}", report.build);
    if report.illegal_dual_wield {
        let _ = writeln!(out, "illegal dual-wield configuration, all results zero");
        return out;
    }
    let _ = writeln!(
        out,
        "dps: {:.2} +/- {:.2} ({}%)",
        report.mean_dps, report.ci_half_width, report.confidence
    );
    let _ = writeln!(
        out,
        "dps vs crit immune: {:.2} +/- {:.2}",
        report.mean_dps_no_crit, report.ci_half_width_no_crit
    );
    let _ = writeln!(
        out,
        "rounds: {} ({}), damage/round: {:.2}",
        report.rounds, report.stop_reason, report.damage_per_round
    );
    let _ = writeln!(out, "slot  kind       ab    hit%   crit%");
    for slot in &report.slots {
        let _ = writeln!(
            out,
            "{:<5} {:<10} {:<5} {:>5.1} {:>6.1}",
            slot.index,
            slot.kind.to_string(),
            slot.attack_bonus,
            slot.hit_rate * 100.0,
            slot.crit_rate * 100.0
        );
    }
    if report.legendary_burst_damage > 0.0 {
        let _ = writeln!(out, "legendary burst damage: {:.0}", report.legendary_burst_damage);
    }
    for (outcome, count) in &report.legendary_outcomes {
        let _ = writeln!(out, "legendary {outcome}: {count}");
    }
    out
}
