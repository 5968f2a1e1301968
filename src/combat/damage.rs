//! Damage types, the per-type dice map, and target immunity.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::combat::dice::DiceRoll;
use crate::combat::error::ValueError;
use crate::combat::rng::DiceRoller;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    Physical,
    Slashing,
    Piercing,
    Bludgeoning,
    Fire,
    Cold,
    Acid,
    Sonic,
    Electrical,
    Positive,
    Negative,
    Divine,
    Magical,
    Pure,
    Sneak,
    Death,
    Massive,
    FlameWeapon,
}

impl DamageType {
    pub const ALL: [DamageType; 18] = [
        Self::Physical,
        Self::Slashing,
        Self::Piercing,
        Self::Bludgeoning,
        Self::Fire,
        Self::Cold,
        Self::Acid,
        Self::Sonic,
        Self::Electrical,
        Self::Positive,
        Self::Negative,
        Self::Divine,
        Self::Magical,
        Self::Pure,
        Self::Sneak,
        Self::Death,
        Self::Massive,
        Self::FlameWeapon,
    ];

    /// Keys that contribute only their single best entry per attack.
    pub const NON_STACKABLE: [DamageType; 4] =
        [Self::Sneak, Self::Death, Self::Massive, Self::FlameWeapon];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Physical => "physical",
            Self::Slashing => "slashing",
            Self::Piercing => "piercing",
            Self::Bludgeoning => "bludgeoning",
            Self::Fire => "fire",
            Self::Cold => "cold",
            Self::Acid => "acid",
            Self::Sonic => "sonic",
            Self::Electrical => "electrical",
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Divine => "divine",
            Self::Magical => "magical",
            Self::Pure => "pure",
            Self::Sneak => "sneak",
            Self::Death => "death",
            Self::Massive => "massive",
            Self::FlameWeapon => "flame_weapon",
        }
    }

    pub fn is_physical_subtype(&self) -> bool {
        matches!(self, Self::Slashing | Self::Piercing | Self::Bludgeoning)
    }

    pub fn is_non_stackable(&self) -> bool {
        Self::NON_STACKABLE.contains(self)
    }

    /// Key a damage map stores this type under. Physical sub-types collapse into `physical`.
    pub fn normalized(self) -> DamageType {
        if self.is_physical_subtype() {
            Self::Physical
        } else {
            self
        }
    }

    /// Key used to look up a target's immunity fraction.
    pub fn immunity_key(self) -> DamageType {
        match self {
            Self::Slashing | Self::Piercing | Self::Bludgeoning | Self::Sneak | Self::Massive => {
                Self::Physical
            }
            Self::FlameWeapon => Self::Fire,
            Self::Death => Self::Negative,
            other => other,
        }
    }
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DamageType {
    type Err = ValueError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| ValueError::UnknownDamageType(raw.to_string()))
    }
}

/// Per-type ordered dice lists. Built once per build as a read-only template; each
/// attack clones it into its own scratch copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DamageMap {
    entries: BTreeMap<DamageType, Vec<DiceRoll>>,
}

impl DamageMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends under the normalized key.
    pub fn push(&mut self, kind: DamageType, dice: DiceRoll) {
        self.entries.entry(kind.normalized()).or_default().push(dice);
    }

    pub fn extend_from(&mut self, other: &DamageMap) {
        for (kind, dice) in &other.entries {
            self.entries.entry(*kind).or_default().extend(dice.iter().copied());
        }
    }

    pub fn get(&self, kind: DamageType) -> &[DiceRoll] {
        self.entries
            .get(&kind.normalized())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn remove(&mut self, kind: DamageType) -> Vec<DiceRoll> {
        self.entries.remove(&kind.normalized()).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DamageType, &[DiceRoll])> {
        self.entries.iter().map(|(kind, dice)| (*kind, dice.as_slice()))
    }

    pub(crate) fn entries_mut(&mut self) -> &mut BTreeMap<DamageType, Vec<DiceRoll>> {
        &mut self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn average(&self) -> f64 {
        self.entries
            .values()
            .flat_map(|dice| dice.iter())
            .map(DiceRoll::average)
            .sum()
    }

    /// Rolls every entry and sums per type.
    pub fn roll<R: DiceRoller + ?Sized>(&self, roller: &mut R) -> TypedDamage {
        let mut rolled = TypedDamage::default();
        for (kind, dice) in &self.entries {
            let total: i64 = dice.iter().map(|d| d.roll(roller)).sum();
            if !dice.is_empty() {
                rolled.add(*kind, total);
            }
        }
        rolled
    }
}

/// Rolled damage per type for a single attack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypedDamage {
    sums: BTreeMap<DamageType, i64>,
}

impl TypedDamage {
    pub fn add(&mut self, kind: DamageType, value: i64) {
        *self.sums.entry(kind.normalized()).or_insert(0) += value;
    }

    pub fn merge(&mut self, other: &TypedDamage) {
        for (kind, value) in &other.sums {
            self.add(*kind, *value);
        }
    }

    pub fn get(&self, kind: DamageType) -> i64 {
        self.sums.get(&kind.normalized()).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DamageType, i64)> + '_ {
        self.sums.iter().map(|(kind, value)| (*kind, *value))
    }

    pub fn total(&self) -> i64 {
        self.sums.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }
}

/// Defender: armor class plus immunity fractions in `[-1, 1]` (negative = vulnerable).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetProfile {
    pub ac: i32,
    #[serde(default)]
    pub immunities: BTreeMap<DamageType, f64>,
}

impl TargetProfile {
    pub fn new(ac: i32) -> Self {
        Self {
            ac,
            immunities: BTreeMap::new(),
        }
    }

    pub fn with_immunity(mut self, kind: DamageType, fraction: f64) -> Self {
        self.immunities.insert(kind.immunity_key(), fraction.clamp(-1.0, 1.0));
        self
    }

    pub fn immunity(&self, kind: DamageType) -> f64 {
        self.immunities
            .get(&kind.immunity_key())
            .copied()
            .unwrap_or(0.0)
    }
}

/// Positive fraction: subtract `max(1, floor(d * f))`, never below zero.
/// Negative fraction: add `floor(d * |f|)` with no minimum.
pub fn apply_immunity(damage: i64, fraction: f64) -> i64 {
    if damage <= 0 || fraction == 0.0 {
        return damage.max(0);
    }
    let fraction = fraction.clamp(-1.0, 1.0);
    if fraction > 0.0 {
        let reduction = ((damage as f64 * fraction).floor() as i64).max(1);
        (damage - reduction).max(0)
    } else {
        let addition = (damage as f64 * -fraction).floor() as i64;
        damage + addition
    }
}

/// Applies per-type immunity, with `shift` added to the target's fraction for each type
/// (legendary vulnerability windows). Returns the post-immunity total.
pub fn apply_immunities(
    rolled: &TypedDamage,
    target: &TargetProfile,
    shift: &BTreeMap<DamageType, f64>,
) -> i64 {
    rolled
        .iter()
        .map(|(kind, value)| {
            let key = kind.immunity_key();
            let fraction = target.immunity(kind) + shift.get(&key).copied().unwrap_or(0.0);
            apply_immunity(value, fraction.clamp(-1.0, 1.0))
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::rng::ScriptedRoller;

    #[test]
    fn immunity_floor_rule() {
        assert_eq!(apply_immunity(3, 0.25), 2);
        assert_eq!(apply_immunity(50, 0.25), 38);
        assert_eq!(apply_immunity(1, 0.01), 0);
        assert_eq!(apply_immunity(10, 1.0), 0);
        assert_eq!(apply_immunity(57, 0.25), 43);
    }

    #[test]
    fn vulnerability_adds_floor_without_minimum() {
        assert_eq!(apply_immunity(50, -0.05), 52);
        assert_eq!(apply_immunity(10, -0.05), 10);
        assert_eq!(apply_immunity(10, -1.0), 20);
    }

    #[test]
    fn zero_fraction_and_zero_damage_are_untouched() {
        assert_eq!(apply_immunity(17, 0.0), 17);
        assert_eq!(apply_immunity(0, 0.5), 0);
        assert_eq!(apply_immunity(0, -0.5), 0);
    }

    #[test]
    fn physical_subtypes_normalize_into_physical() {
        let mut map = DamageMap::new();
        map.push(DamageType::Slashing, DiceRoll::dice(1, 8));
        map.push(DamageType::Bludgeoning, DiceRoll::flat(3));
        assert_eq!(map.get(DamageType::Physical).len(), 2);
        assert_eq!(map.iter().count(), 1);
    }

    #[test]
    fn immunity_lookup_maps_transient_keys() {
        let target = TargetProfile::new(10)
            .with_immunity(DamageType::Physical, 0.5)
            .with_immunity(DamageType::Fire, 0.25);
        assert_eq!(target.immunity(DamageType::Piercing), 0.5);
        assert_eq!(target.immunity(DamageType::Sneak), 0.5);
        assert_eq!(target.immunity(DamageType::FlameWeapon), 0.25);
        assert_eq!(target.immunity(DamageType::Cold), 0.0);
    }

    #[test]
    fn roll_sums_entries_per_type() {
        let mut map = DamageMap::new();
        map.push(DamageType::Physical, DiceRoll::dice(1, 8));
        map.push(DamageType::Physical, DiceRoll::flat(10));
        map.push(DamageType::Fire, DiceRoll::dice(1, 6));
        let mut roller = ScriptedRoller::new(vec![4, 6]);
        let rolled = map.roll(&mut roller);
        assert_eq!(rolled.get(DamageType::Physical), 14);
        assert_eq!(rolled.get(DamageType::Fire), 6);
        assert_eq!(rolled.total(), 20);
    }

    #[test]
    fn apply_immunities_uses_shift_per_type() {
        let mut rolled = TypedDamage::default();
        rolled.add(DamageType::Physical, 50);
        rolled.add(DamageType::Fire, 20);
        let target = TargetProfile::new(0).with_immunity(DamageType::Physical, 0.25);
        let mut shift = BTreeMap::new();
        shift.insert(DamageType::Physical, -0.30);
        // physical: 0.25 - 0.30 = -0.05 -> 52; fire untouched
        assert_eq!(apply_immunities(&rolled, &target, &shift), 72);
        assert_eq!(apply_immunities(&rolled, &target, &BTreeMap::new()), 58);
    }

    #[test]
    fn parses_damage_type_names() {
        assert_eq!("Flame Weapon".parse::<DamageType>(), Ok(DamageType::FlameWeapon));
        assert_eq!("ELECTRICAL".parse::<DamageType>(), Ok(DamageType::Electrical));
        assert_eq!(
            "banana".parse::<DamageType>(),
            Err(ValueError::UnknownDamageType("banana".to_string()))
        );
    }
}
