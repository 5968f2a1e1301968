//! Stacking rules for damage entries within one attack.
//!
//! Most entries stack: every dice entry under a type is rolled. Non-stackable keys
//! (sneak, death, massive, flame weapon) contribute only their single best entry,
//! and same-type flat bonuses that compete (enhancement vs. race bane) keep only the
//! highest average. Critical hits re-roll stackable dice, they never multiply a sum.

use std::collections::BTreeMap;

use crate::combat::damage::{DamageMap, DamageType};
use crate::combat::dice::DiceRoll;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackRule {
    /// Every entry contributes and is duplicated on critical hits.
    Stacking,
    /// Only the highest-average entry contributes, exactly once.
    HighestAverage,
}

impl StackRule {
    pub const fn for_type(kind: DamageType) -> Self {
        match kind {
            DamageType::Sneak
            | DamageType::Death
            | DamageType::Massive
            | DamageType::FlameWeapon => Self::HighestAverage,
            _ => Self::Stacking,
        }
    }
}

/// First entry with the strictly highest average; ties keep the earlier entry.
pub fn highest_average(dice: &[DiceRoll]) -> Option<DiceRoll> {
    dice.iter().copied().fold(None, |best, candidate| match best {
        Some(current) if current.average() >= candidate.average() => Some(current),
        _ => Some(candidate),
    })
}

/// Non-stackable entries pulled out of a scratch map, one winner per key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NonStackable {
    winners: BTreeMap<DamageType, DiceRoll>,
}

impl NonStackable {
    pub fn get(&self, kind: DamageType) -> Option<DiceRoll> {
        self.winners.get(&kind).copied()
    }

    pub fn len(&self) -> usize {
        self.winners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.winners.is_empty()
    }

    /// Puts each winner back exactly once. `massive` only lands on critical hits.
    pub fn reinsert_into(self, map: &mut DamageMap, critical: bool) {
        for (kind, dice) in self.winners {
            if kind == DamageType::Massive && !critical {
                continue;
            }
            map.push(kind, dice);
        }
    }
}

/// Removes every non-stackable key from `map`, keeping the best entry of each.
pub fn extract_non_stackable(map: &mut DamageMap) -> NonStackable {
    let mut winners = BTreeMap::new();
    for kind in DamageType::NON_STACKABLE {
        let entries = map.remove(kind);
        if let Some(best) = highest_average(&entries) {
            winners.insert(kind, best);
        }
    }
    NonStackable { winners }
}

/// Repeats every stackable entry `multiplier` times in place so each copy is rolled
/// independently. Must run after [extract_non_stackable].
pub fn duplicate_for_critical(map: &mut DamageMap, multiplier: u32) {
    let multiplier = multiplier.max(1) as usize;
    for (kind, dice) in map.entries_mut().iter_mut() {
        assert!(
            StackRule::for_type(*kind) == StackRule::Stacking || dice.is_empty(),
            "non-stackable {kind} entries reached critical duplication"
        );
        let original = std::mem::take(dice);
        dice.reserve(original.len() * multiplier);
        for _ in 0..multiplier {
            dice.extend(original.iter().copied());
        }
    }
}

/// Merges a candidate into a same-type competing slot: highest average wins, never summed.
pub fn merge_highest_average(current: Option<DiceRoll>, candidate: DiceRoll) -> DiceRoll {
    match current {
        Some(existing) if existing.average() >= candidate.average() => existing,
        _ => candidate,
    }
}
