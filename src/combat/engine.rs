//! Round/attack loop, convergence detection and final DPS statistics.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::combat::attack::{AttackOutcome, AttackResolver};
use crate::combat::damage::{DamageMap, DamageType, TargetProfile, TypedDamage};
use crate::combat::error::ValueError;
use crate::combat::legendary::{
    LegendContext, LegendaryContribution, LegendaryEffect, LegendarySpec, ProcTrigger,
};
use crate::combat::progression::{AttackBonusProgression, SlotKind};
use crate::combat::rng::{DiceRoller, Rng};
use crate::combat::stacking::{duplicate_for_critical, extract_non_stackable};
use crate::combat::stats::{RollingWindow, RunningStats, StatsAccumulator};
use crate::combat::weapon::{WeaponProfile, TENACIOUS_BLOW};

pub const SECONDS_PER_ROUND: f64 = 6.0;
pub const CONVERGENCE_WINDOW: usize = 15;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ConfidenceLevel {
    Ninety,
    #[default]
    NinetyFive,
    NinetyNine,
}

impl ConfidenceLevel {
    pub const fn z(self) -> f64 {
        match self {
            Self::Ninety => 1.645,
            Self::NinetyFive => 1.96,
            Self::NinetyNine => 2.576,
        }
    }

    pub const fn percent(self) -> u8 {
        match self {
            Self::Ninety => 90,
            Self::NinetyFive => 95,
            Self::NinetyNine => 99,
        }
    }
}

impl TryFrom<u8> for ConfidenceLevel {
    type Error = ValueError;

    fn try_from(percent: u8) -> Result<Self, Self::Error> {
        match percent {
            90 => Ok(Self::Ninety),
            95 => Ok(Self::NinetyFive),
            99 => Ok(Self::NinetyNine),
            other => Err(ValueError::UnsupportedConfidence(other)),
        }
    }
}

impl From<ConfidenceLevel> for u8 {
    fn from(level: ConfidenceLevel) -> Self {
        level.percent()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub round_cap: u64,
    pub damage_cap: Option<f64>,
    /// Stop when window stdev / mean drops below this...
    pub stdev_threshold: f64,
    /// ...and window (max - min) / mean drops below this.
    pub range_threshold: f64,
    pub confidence: ConfidenceLevel,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            round_cap: 20_000,
            damage_cap: None,
            stdev_threshold: 0.002,
            range_threshold: 0.005,
            confidence: ConfidenceLevel::NinetyFive,
            seed: 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Converged,
    DamageCap,
    RoundCap,
    Cancelled,
    IllegalBuild,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Converged => "converged",
            Self::DamageCap => "damage_cap",
            Self::RoundCap => "round_cap",
            Self::Cancelled => "cancelled",
            Self::IllegalBuild => "illegal_build",
        };
        f.write_str(label)
    }
}

/// Everything fixed about one build: weapon, round layout, target, legendary strategy.
#[derive(Debug, Clone)]
pub struct CombatBuild {
    pub name: String,
    pub weapon: WeaponProfile,
    pub progression: AttackBonusProgression,
    pub target: TargetProfile,
    pub legendary: Option<(Arc<dyn LegendaryEffect>, LegendarySpec)>,
    pub tenacious_blow: bool,
}

impl CombatBuild {
    pub fn attacks_per_round(&self) -> usize {
        self.progression.len()
    }

    fn legend_context(&self) -> Option<LegendContext> {
        self.legendary.as_ref().map(|(effect, spec)| {
            LegendContext::new(Arc::clone(effect), spec.clone(), self.attacks_per_round())
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotReport {
    pub index: usize,
    pub kind: SlotKind,
    pub attack_bonus: i32,
    pub attempts: u64,
    pub hit_rate: f64,
    pub crit_rate: f64,
    pub proc_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    pub build: String,
    pub mean_dps: f64,
    pub mean_dps_no_crit: f64,
    pub stdev_dps: f64,
    pub stdev_dps_no_crit: f64,
    pub ci_half_width: f64,
    pub ci_half_width_no_crit: f64,
    pub confidence: u8,
    pub total_damage: f64,
    pub total_damage_no_crit: f64,
    /// Legendary burst damage rolled on proc attacks, before immunities.
    pub legendary_burst_damage: f64,
    pub damage_per_round: f64,
    pub rounds: u64,
    pub hit_rate: f64,
    pub crit_rate: f64,
    pub proc_rate: f64,
    pub slots: Vec<SlotReport>,
    pub legendary_outcomes: BTreeMap<String, u64>,
    pub stop_reason: StopReason,
    pub illegal_dual_wield: bool,
}

/// Damage of one attack against a normal target and a critical-immune one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttackDamage {
    pub with_crit: i64,
    pub no_crit: i64,
}

/// Running totals for one run. Discarded once the report is built.
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub total_damage: f64,
    pub total_damage_no_crit: f64,
    pub rounds: u64,
    window: RollingWindow,
    dps: RunningStats,
    dps_no_crit: RunningStats,
}

impl Default for SimulationState {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationState {
    pub fn new() -> Self {
        Self {
            total_damage: 0.0,
            total_damage_no_crit: 0.0,
            rounds: 0,
            window: RollingWindow::new(CONVERGENCE_WINDOW),
            dps: RunningStats::default(),
            dps_no_crit: RunningStats::default(),
        }
    }

    pub fn push_round(&mut self, damage: i64, damage_no_crit: i64) {
        self.rounds += 1;
        self.total_damage += damage as f64;
        self.total_damage_no_crit += damage_no_crit as f64;
        self.dps.push(damage as f64 / SECONDS_PER_ROUND);
        self.dps_no_crit.push(damage_no_crit as f64 / SECONDS_PER_ROUND);
        self.window.push(self.running_dps());
    }

    /// Cumulative damage over elapsed time.
    pub fn running_dps(&self) -> f64 {
        if self.rounds == 0 {
            return 0.0;
        }
        self.total_damage / (self.rounds as f64 * SECONDS_PER_ROUND)
    }

    pub fn window(&self) -> &RollingWindow {
        &self.window
    }

    pub fn is_converged(&self, stdev_threshold: f64, range_threshold: f64) -> bool {
        window_converged(&self.window, stdev_threshold, range_threshold)
    }
}

/// Full window with relative stdev and relative range both under threshold. A zero-mean
/// window counts as converged only when it is flat.
pub fn window_converged(
    window: &RollingWindow,
    stdev_threshold: f64,
    range_threshold: f64,
) -> bool {
    if !window.is_full() {
        return false;
    }
    let mean = window.mean();
    let range = window.max() - window.min();
    if mean <= 0.0 {
        return range == 0.0;
    }
    window.stdev() / mean < stdev_threshold && range / mean < range_threshold
}

pub fn confidence_half_width(stdev: f64, samples: u64, confidence: ConfidenceLevel) -> f64 {
    if samples == 0 {
        return 0.0;
    }
    confidence.z() * stdev / (samples as f64).sqrt()
}

pub struct SimulationEngine<'a> {
    build: &'a CombatBuild,
    config: SimulationConfig,
}

impl<'a> SimulationEngine<'a> {
    pub fn new(build: &'a CombatBuild, config: SimulationConfig) -> Self {
        Self { build, config }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Runs with a fresh generator seeded from the config.
    pub fn run(&self) -> SimulationReport {
        let mut rng = Rng::new(self.config.seed);
        self.run_with_roller(&mut rng, None)
    }

    /// Like [run](Self::run) but stops between rounds once `cancel` is set.
    pub fn run_with_cancel(&self, cancel: &AtomicBool) -> SimulationReport {
        let mut rng = Rng::new(self.config.seed);
        self.run_with_roller(&mut rng, Some(cancel))
    }

    pub fn run_with_roller<R: DiceRoller>(
        &self,
        roller: &mut R,
        cancel: Option<&AtomicBool>,
    ) -> SimulationReport {
        let build = self.build;
        if build.progression.illegal_dual_wield {
            tracing::warn!(
                build = %build.name,
                "illegal dual-wield size combination, reporting zero"
            );
            return self.zeroed_report();
        }

        let resolver = AttackResolver::new(&build.target, build.weapon.critical_threat);
        let mut legend = build.legend_context();
        let mut stats = StatsAccumulator::new(build.attacks_per_round());
        let mut state = SimulationState::new();

        let stop_reason = loop {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                break StopReason::Cancelled;
            }
            if state.rounds >= self.config.round_cap {
                break StopReason::RoundCap;
            }

            let (round, round_no_crit) =
                self.simulate_round(&resolver, legend.as_mut(), &mut stats, roller);
            state.push_round(round, round_no_crit);

            if let Some(cap) = self.config.damage_cap {
                if state.total_damage > cap {
                    break StopReason::DamageCap;
                }
            }
            if state.is_converged(self.config.stdev_threshold, self.config.range_threshold) {
                tracing::debug!(
                    build = %build.name,
                    rounds = state.rounds,
                    dps = state.running_dps(),
                    "converged"
                );
                break StopReason::Converged;
            }
        };

        let report = self.report(&state, &stats, stop_reason);
        tracing::info!(
            build = %build.name,
            rounds = report.rounds,
            mean_dps = report.mean_dps,
            half_width = report.ci_half_width,
            stop = %stop_reason,
            "simulation finished"
        );
        report
    }

    /// Plays every attack slot once. Returns (damage, damage against a crit-immune target).
    pub fn simulate_round<R: DiceRoller>(
        &self,
        resolver: &AttackResolver<'_>,
        mut legend: Option<&mut LegendContext>,
        stats: &mut StatsAccumulator,
        roller: &mut R,
    ) -> (i64, i64) {
        let mut round = AttackDamage::default();
        for (index, slot) in self.build.progression.slots.iter().enumerate() {
            let damage = self.resolve_slot(
                index,
                slot.bonus,
                resolver,
                legend.as_deref_mut(),
                stats,
                roller,
            );
            round.with_crit += damage.with_crit;
            round.no_crit += damage.no_crit;
        }
        tracing::trace!(damage = round.with_crit, no_crit = round.no_crit, "round");
        (round.with_crit, round.no_crit)
    }

    fn resolve_slot<R: DiceRoller>(
        &self,
        index: usize,
        attack_bonus: i32,
        resolver: &AttackResolver<'_>,
        legend: Option<&mut LegendContext>,
        stats: &mut StatsAccumulator,
        roller: &mut R,
    ) -> AttackDamage {
        let weapon = &self.build.weapon;
        let (bonus_delta, ac_delta) = legend
            .as_ref()
            .map_or((0, 0), |ctx| (ctx.attack_bonus_delta(), ctx.ac_delta()));
        let roll = resolver.attack(roller, attack_bonus + bonus_delta, ac_delta);
        stats.record_attack(index, roll.outcome);

        let mut critical_only_legend = false;
        let contribution = match legend {
            Some(ctx) => {
                critical_only_legend = ctx.trigger() == ProcTrigger::OnCritical;
                ctx.on_attack(roll.outcome, weapon.critical_multiplier, stats, roller)
            }
            None => LegendaryContribution::default(),
        };
        if contribution.procced {
            stats.record_proc(index);
        }

        if roll.outcome == AttackOutcome::Miss {
            if self.build.tenacious_blow && weapon.is_double_sided() {
                let mut tick = TypedDamage::default();
                tick.add(DamageType::Pure, TENACIOUS_BLOW.roll(roller));
                let dealt = resolver.mitigate(&tick, &BTreeMap::new());
                return AttackDamage {
                    with_crit: dealt,
                    no_crit: dealt,
                };
            }
            return AttackDamage::default();
        }

        let legend_damage = legend_damage(&contribution, roller);
        let shift = &contribution.persistent.immunity_delta;

        let normal = roll_hit_damage(resolver, weapon, false, roller);
        let mut with_crit = if roll.outcome.is_critical() {
            roll_hit_damage(resolver, weapon, true, roller)
        } else {
            normal.clone()
        };
        with_crit.merge(&legend_damage);
        let dealt = resolver.mitigate(&with_crit, shift);

        let dealt_no_crit = if critical_only_legend {
            resolver.mitigate(&normal, &BTreeMap::new())
        } else {
            let mut no_crit = normal;
            no_crit.merge(&legend_damage);
            resolver.mitigate(&no_crit, shift)
        };

        AttackDamage {
            with_crit: dealt,
            no_crit: dealt_no_crit,
        }
    }

    fn report(
        &self,
        state: &SimulationState,
        stats: &StatsAccumulator,
        stop_reason: StopReason,
    ) -> SimulationReport {
        let rounds = state.rounds;
        let seconds = rounds as f64 * SECONDS_PER_ROUND;
        let per_second = |total: f64| if rounds == 0 { 0.0 } else { total / seconds };
        let overall = stats.overall();
        let confidence = self.config.confidence;
        let half_width = |stdev: f64| confidence_half_width(stdev, rounds, confidence);

        SimulationReport {
            build: self.build.name.clone(),
            mean_dps: per_second(state.total_damage),
            mean_dps_no_crit: per_second(state.total_damage_no_crit),
            stdev_dps: state.dps.stdev(),
            stdev_dps_no_crit: state.dps_no_crit.stdev(),
            ci_half_width: half_width(state.dps.stdev()),
            ci_half_width_no_crit: half_width(state.dps_no_crit.stdev()),
            confidence: confidence.percent(),
            total_damage: state.total_damage,
            total_damage_no_crit: state.total_damage_no_crit,
            legendary_burst_damage: stats.burst_damage() as f64,
            damage_per_round: if rounds == 0 { 0.0 } else { state.total_damage / rounds as f64 },
            rounds,
            hit_rate: overall.hit_rate(),
            crit_rate: overall.crit_rate(),
            proc_rate: overall.proc_rate(),
            slots: self
                .build
                .progression
                .slots
                .iter()
                .enumerate()
                .map(|(index, slot)| {
                    let counters = stats.slot(index);
                    SlotReport {
                        index,
                        kind: slot.kind,
                        attack_bonus: slot.bonus,
                        attempts: counters.attempts,
                        hit_rate: counters.hit_rate(),
                        crit_rate: counters.crit_rate(),
                        proc_rate: counters.proc_rate(),
                    }
                })
                .collect(),
            legendary_outcomes: stats.legendary_outcomes().clone(),
            stop_reason,
            illegal_dual_wield: false,
        }
    }

    fn zeroed_report(&self) -> SimulationReport {
        let stats = StatsAccumulator::new(self.build.attacks_per_round());
        SimulationReport {
            illegal_dual_wield: true,
            ..self.report(&SimulationState::new(), &stats, StopReason::IllegalBuild)
        }
    }
}

/// Scratch copy of the template for one hit: non-stackables pulled out, stackable dice
/// duplicated on a critical, critical feat bonuses appended, non-stackables put back once.
pub fn hit_damage_map(weapon: &WeaponProfile, critical: bool) -> DamageMap {
    let mut scratch = weapon.template().clone();
    let non_stackable = extract_non_stackable(&mut scratch);
    if critical {
        duplicate_for_critical(&mut scratch, weapon.critical_multiplier);
        scratch.extend_from(weapon.critical_bonus());
    }
    non_stackable.reinsert_into(&mut scratch, critical);
    scratch
}

fn roll_hit_damage<R: DiceRoller>(
    resolver: &AttackResolver<'_>,
    weapon: &WeaponProfile,
    critical: bool,
    roller: &mut R,
) -> TypedDamage {
    resolver.roll_damage(&hit_damage_map(weapon, critical), roller)
}

fn legend_damage<R: DiceRoller>(
    contribution: &LegendaryContribution,
    roller: &mut R,
) -> TypedDamage {
    let mut damage = contribution.burst.damage_sums.clone();
    if let Some(common) = contribution.persistent.common_damage {
        damage.add(common.kind, common.dice.roll(roller));
    }
    damage
}
