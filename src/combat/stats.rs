//! Counters and running statistics collected while a simulation runs.

use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;

use crate::combat::attack::AttackOutcome;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SlotCounters {
    pub attempts: u64,
    pub hits: u64,
    pub crits: u64,
    pub procs: u64,
}

impl SlotCounters {
    pub fn record(&mut self, outcome: AttackOutcome) {
        self.attempts += 1;
        if outcome.is_hit() {
            self.hits += 1;
        }
        if outcome.is_critical() {
            self.crits += 1;
        }
    }

    pub fn add_from(&mut self, other: &SlotCounters) {
        self.attempts += other.attempts;
        self.hits += other.hits;
        self.crits += other.crits;
        self.procs += other.procs;
    }

    pub fn hit_rate(&self) -> f64 {
        ratio(self.hits, self.attempts)
    }

    pub fn crit_rate(&self) -> f64 {
        ratio(self.crits, self.attempts)
    }

    /// Procs per hit.
    pub fn proc_rate(&self) -> f64 {
        ratio(self.procs, self.hits)
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Attempt/hit/crit/proc counts, overall and per attack slot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsAccumulator {
    slots: Vec<SlotCounters>,
    legendary_outcomes: BTreeMap<String, u64>,
    burst_damage: i64,
}

impl StatsAccumulator {
    pub fn new(slot_count: usize) -> Self {
        Self {
            slots: vec![SlotCounters::default(); slot_count],
            ..Self::default()
        }
    }

    pub fn record_attack(&mut self, slot: usize, outcome: AttackOutcome) {
        self.slot_mut(slot).record(outcome);
    }

    pub fn record_proc(&mut self, slot: usize) {
        self.slot_mut(slot).procs += 1;
    }

    /// Labelled legendary outcome, e.g. which branch a random-outcome weapon picked.
    pub fn record_legendary_outcome(&mut self, label: &str) {
        *self.legendary_outcomes.entry(label.to_string()).or_insert(0) += 1;
    }

    /// Burst damage before immunities.
    pub fn record_burst_damage(&mut self, amount: i64) {
        self.burst_damage += amount;
    }

    fn slot_mut(&mut self, slot: usize) -> &mut SlotCounters {
        if slot >= self.slots.len() {
            self.slots.resize(slot + 1, SlotCounters::default());
        }
        &mut self.slots[slot]
    }

    pub fn slot(&self, slot: usize) -> SlotCounters {
        self.slots.get(slot).copied().unwrap_or_default()
    }

    pub fn slots(&self) -> &[SlotCounters] {
        &self.slots
    }

    pub fn overall(&self) -> SlotCounters {
        let mut total = SlotCounters::default();
        for slot in &self.slots {
            total.add_from(slot);
        }
        total
    }

    pub fn legendary_outcomes(&self) -> &BTreeMap<String, u64> {
        &self.legendary_outcomes
    }

    pub fn burst_damage(&self) -> i64 {
        self.burst_damage
    }
}

/// Welford running mean/variance.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample standard deviation; zero with fewer than two values.
    pub fn stdev(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        (self.m2 / (self.count - 1) as f64).sqrt()
    }
}

/// Fixed-capacity window over the most recent values.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    values: VecDeque<f64>,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            values: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Population standard deviation of the window.
    pub fn stdev(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let variance = self
            .values
            .iter()
            .map(|value| (value - mean).powi(2))
            .sum::<f64>()
            / self.values.len() as f64;
        variance.sqrt()
    }

    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}
