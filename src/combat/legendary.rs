//! Legendary weapon effects.
//!
//! A weapon either has a strategy registered under its name or it has no legendary
//! effect at all. Each proc yields a burst (one-shot damage on the proc attack) and a
//! persistent part that stays active for a window counted in attacks.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::combat::attack::AttackOutcome;
use crate::combat::damage::{DamageType, TypedDamage};
use crate::combat::dice::DiceRoll;
use crate::combat::rng::DiceRoller;
use crate::combat::stats::StatsAccumulator;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProcTrigger {
    /// Percentage roll on every hit.
    OnHit { chance: f64 },
    /// Fires on every critical hit.
    OnCritical,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TypedDice {
    #[serde(rename = "type")]
    pub kind: DamageType,
    pub dice: DiceRoll,
}

impl TypedDice {
    pub fn new(kind: DamageType, dice: DiceRoll) -> Self {
        Self { kind, dice }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcBranch {
    /// Percent chance of this branch; branches are checked in order against one draw.
    pub chance: f64,
    pub damage: TypedDice,
}

/// Numbers a legendary weapon carries in the catalog. Which fields matter depends on
/// the strategy registered for the weapon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendarySpec {
    pub trigger: ProcTrigger,
    #[serde(default)]
    pub damage: Vec<TypedDice>,
    #[serde(default)]
    pub window_rounds: u32,
    #[serde(default)]
    pub attack_bonus: i32,
    #[serde(default)]
    pub ac_reduction: i32,
    #[serde(default)]
    pub immunity_shift: BTreeMap<DamageType, f64>,
    #[serde(default)]
    pub persistent_damage: Option<TypedDice>,
    #[serde(default)]
    pub branches: Vec<ProcBranch>,
}

impl LegendarySpec {
    pub fn on_hit(chance: f64) -> Self {
        Self {
            trigger: ProcTrigger::OnHit { chance },
            damage: Vec::new(),
            window_rounds: 0,
            attack_bonus: 0,
            ac_reduction: 0,
            immunity_shift: BTreeMap::new(),
            persistent_damage: None,
            branches: Vec::new(),
        }
    }

    pub fn on_critical() -> Self {
        Self {
            trigger: ProcTrigger::OnCritical,
            ..Self::on_hit(0.0)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BurstEffect {
    pub damage_sums: TypedDamage,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistentEffect {
    pub common_damage: Option<TypedDice>,
    pub immunity_delta: BTreeMap<DamageType, f64>,
    pub attack_bonus_delta: i32,
    pub ac_delta: i32,
}

impl PersistentEffect {
    pub fn is_empty(&self) -> bool {
        self.common_damage.is_none()
            && self.immunity_delta.is_empty()
            && self.attack_bonus_delta == 0
            && self.ac_delta == 0
    }
}

/// Proc-handling strategy. Called only on the attack where the proc succeeded.
pub trait LegendaryEffect: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn apply(
        &self,
        spec: &LegendarySpec,
        stats: &mut StatsAccumulator,
        crit_multiplier: u32,
        roller: &mut dyn DiceRoller,
    ) -> (BurstEffect, PersistentEffect);
}

fn roll_burst(
    damage: &[TypedDice],
    times: u32,
    stats: &mut StatsAccumulator,
    roller: &mut dyn DiceRoller,
) -> BurstEffect {
    let mut sums = TypedDamage::default();
    for typed in damage {
        for _ in 0..times.max(1) {
            sums.add(typed.kind, typed.dice.roll(roller));
        }
    }
    stats.record_burst_damage(sums.total());
    BurstEffect { damage_sums: sums }
}

/// One-shot damage, nothing persistent.
#[derive(Debug, Clone, Copy, Default)]
pub struct BurstDamage;

impl LegendaryEffect for BurstDamage {
    fn name(&self) -> &'static str {
        "burst"
    }

    fn apply(
        &self,
        spec: &LegendarySpec,
        stats: &mut StatsAccumulator,
        _crit_multiplier: u32,
        roller: &mut dyn DiceRoller,
    ) -> (BurstEffect, PersistentEffect) {
        (roll_burst(&spec.damage, 1, stats, roller), PersistentEffect::default())
    }
}

/// Burst plus a flat attack-bonus window.
#[derive(Debug, Clone, Copy, Default)]
pub struct BurstWithAttackBonus;

impl LegendaryEffect for BurstWithAttackBonus {
    fn name(&self) -> &'static str {
        "burst_attack_bonus"
    }

    fn apply(
        &self,
        spec: &LegendarySpec,
        stats: &mut StatsAccumulator,
        _crit_multiplier: u32,
        roller: &mut dyn DiceRoller,
    ) -> (BurstEffect, PersistentEffect) {
        let persistent = PersistentEffect {
            attack_bonus_delta: spec.attack_bonus,
            ..PersistentEffect::default()
        };
        (roll_burst(&spec.damage, 1, stats, roller), persistent)
    }
}

/// Burst plus an armor-class reduction window on the target.
#[derive(Debug, Clone, Copy, Default)]
pub struct BurstWithArmorShred;

impl LegendaryEffect for BurstWithArmorShred {
    fn name(&self) -> &'static str {
        "burst_armor_shred"
    }

    fn apply(
        &self,
        spec: &LegendarySpec,
        stats: &mut StatsAccumulator,
        _crit_multiplier: u32,
        roller: &mut dyn DiceRoller,
    ) -> (BurstEffect, PersistentEffect) {
        let persistent = PersistentEffect {
            ac_delta: spec.ac_reduction,
            ..PersistentEffect::default()
        };
        (roll_burst(&spec.damage, 1, stats, roller), persistent)
    }
}

/// Burst plus a window that lowers the target's immunity fractions.
#[derive(Debug, Clone, Copy, Default)]
pub struct BurstWithVulnerability;

impl LegendaryEffect for BurstWithVulnerability {
    fn name(&self) -> &'static str {
        "burst_vulnerability"
    }

    fn apply(
        &self,
        spec: &LegendarySpec,
        stats: &mut StatsAccumulator,
        _crit_multiplier: u32,
        roller: &mut dyn DiceRoller,
    ) -> (BurstEffect, PersistentEffect) {
        let immunity_delta = spec
            .immunity_shift
            .iter()
            .map(|(kind, shift)| (kind.immunity_key(), -shift.abs()))
            .collect();
        let persistent = PersistentEffect {
            immunity_delta,
            ..PersistentEffect::default()
        };
        (roll_burst(&spec.damage, 1, stats, roller), persistent)
    }
}

/// No burst; flat damage added to every hit during the window.
#[derive(Debug, Clone, Copy, Default)]
pub struct PersistentDamage;

impl LegendaryEffect for PersistentDamage {
    fn name(&self) -> &'static str {
        "persistent_damage"
    }

    fn apply(
        &self,
        spec: &LegendarySpec,
        _stats: &mut StatsAccumulator,
        _crit_multiplier: u32,
        _roller: &mut dyn DiceRoller,
    ) -> (BurstEffect, PersistentEffect) {
        let persistent = PersistentEffect {
            common_damage: spec.persistent_damage,
            ..PersistentEffect::default()
        };
        (BurstEffect::default(), persistent)
    }
}

/// One draw per proc picks a branch (or nothing).
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomOutcome;

impl LegendaryEffect for RandomOutcome {
    fn name(&self) -> &'static str {
        "random_outcome"
    }

    fn apply(
        &self,
        spec: &LegendarySpec,
        stats: &mut StatsAccumulator,
        _crit_multiplier: u32,
        roller: &mut dyn DiceRoller,
    ) -> (BurstEffect, PersistentEffect) {
        let draw = roller.unit() * 100.0;
        let mut cumulative = 0.0;
        for branch in &spec.branches {
            cumulative += branch.chance;
            if draw < cumulative {
                stats.record_legendary_outcome(branch.damage.kind.as_str());
                let burst = roll_burst(&[branch.damage], 1, stats, roller);
                return (burst, PersistentEffect::default());
            }
        }
        stats.record_legendary_outcome("none");
        (BurstEffect::default(), PersistentEffect::default())
    }
}

/// Burst dice rolled once per point of critical multiplier.
#[derive(Debug, Clone, Copy, Default)]
pub struct CriticalBurst;

impl LegendaryEffect for CriticalBurst {
    fn name(&self) -> &'static str {
        "critical_burst"
    }

    fn apply(
        &self,
        spec: &LegendarySpec,
        stats: &mut StatsAccumulator,
        crit_multiplier: u32,
        roller: &mut dyn DiceRoller,
    ) -> (BurstEffect, PersistentEffect) {
        (
            roll_burst(&spec.damage, crit_multiplier, stats, roller),
            PersistentEffect::default(),
        )
    }
}

/// Weapon name -> strategy. Names are matched case- and whitespace-insensitively.
#[derive(Debug, Clone, Default)]
pub struct LegendaryRegistry {
    by_weapon: HashMap<String, Arc<dyn LegendaryEffect>>,
}

pub(crate) fn normalize_weapon_key(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

impl LegendaryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strategies for the legendary weapons shipped in the builtin catalog.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("Sunforged Greatsword", Arc::new(BurstDamage));
        registry.register("Stormcaller Longbow", Arc::new(BurstDamage));
        registry.register("Warlord's Falchion", Arc::new(BurstWithAttackBonus));
        registry.register("Sundering Maul", Arc::new(BurstWithArmorShred));
        registry.register("Voidtouched Rapier", Arc::new(BurstWithVulnerability));
        registry.register("Emberlash Scimitar", Arc::new(PersistentDamage));
        registry.register("Chaos Shard Dagger", Arc::new(RandomOutcome));
        registry.register("Executioner's Axe", Arc::new(CriticalBurst));
        registry
    }

    pub fn register(&mut self, weapon: &str, effect: Arc<dyn LegendaryEffect>) {
        self.by_weapon.insert(normalize_weapon_key(weapon), effect);
    }

    pub fn lookup(&self, weapon: &str) -> Option<Arc<dyn LegendaryEffect>> {
        self.by_weapon.get(&normalize_weapon_key(weapon)).cloned()
    }

    pub fn len(&self) -> usize {
        self.by_weapon.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_weapon.is_empty()
    }
}

/// What a legendary weapon adds to one attack.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegendaryContribution {
    pub procced: bool,
    pub burst: BurstEffect,
    pub persistent: PersistentEffect,
}

/// Per-run proc state for one weapon.
#[derive(Debug, Clone)]
pub struct LegendContext {
    effect: Arc<dyn LegendaryEffect>,
    spec: LegendarySpec,
    window_length: u32,
    remaining: u32,
    active: PersistentEffect,
}

impl LegendContext {
    pub fn new(
        effect: Arc<dyn LegendaryEffect>,
        spec: LegendarySpec,
        attacks_per_round: usize,
    ) -> Self {
        let window_length = spec.window_rounds.saturating_mul(attacks_per_round as u32);
        Self {
            effect,
            spec,
            window_length,
            remaining: 0,
            active: PersistentEffect::default(),
        }
    }

    pub fn effect_name(&self) -> &'static str {
        self.effect.name()
    }

    pub fn trigger(&self) -> ProcTrigger {
        self.spec.trigger
    }

    pub fn window_length(&self) -> u32 {
        self.window_length
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Attack-bonus delta for the attack about to be rolled.
    pub fn attack_bonus_delta(&self) -> i32 {
        if self.remaining > 0 {
            self.active.attack_bonus_delta
        } else {
            0
        }
    }

    /// AC reduction for the attack about to be rolled.
    pub fn ac_delta(&self) -> i32 {
        if self.remaining > 0 {
            self.active.ac_delta
        } else {
            0
        }
    }

    /// Resolves the proc for this attack and advances the window by one attack.
    /// Burst appears only when the proc fires; a fresh proc restarts the window.
    pub fn on_attack(
        &mut self,
        outcome: AttackOutcome,
        crit_multiplier: u32,
        stats: &mut StatsAccumulator,
        roller: &mut dyn DiceRoller,
    ) -> LegendaryContribution {
        let procced = outcome.is_hit()
            && match self.spec.trigger {
                ProcTrigger::OnHit { chance } => roller.chance(chance),
                ProcTrigger::OnCritical => outcome.is_critical(),
            };

        let contribution = if procced {
            let (burst, persistent) = self.effect.apply(&self.spec, stats, crit_multiplier, roller);
            if self.window_length > 0 && !persistent.is_empty() {
                self.remaining = self.window_length;
                self.active = persistent.clone();
            }
            LegendaryContribution {
                procced: true,
                burst,
                persistent,
            }
        } else if self.remaining > 0 {
            LegendaryContribution {
                procced: false,
                burst: BurstEffect::default(),
                persistent: self.active.clone(),
            }
        } else {
            LegendaryContribution::default()
        };

        if self.remaining > 0 {
            self.remaining -= 1;
            if self.remaining == 0 {
                self.active = PersistentEffect::default();
            }
        }
        contribution
    }
}
