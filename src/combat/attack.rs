//! d20 attack resolution plus the damage roll and immunity step for one attack.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::combat::damage::{apply_immunities, DamageMap, DamageType, TargetProfile, TypedDamage};
use crate::combat::rng::DiceRoller;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackOutcome {
    Miss,
    Hit,
    CriticalHit,
}

impl AttackOutcome {
    pub fn is_hit(&self) -> bool {
        !matches!(self, Self::Miss)
    }

    pub fn is_critical(&self) -> bool {
        matches!(self, Self::CriticalHit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackRoll {
    pub natural: u32,
    pub confirmation: Option<u32>,
    pub outcome: AttackOutcome,
}

/// Natural 1 always misses, natural 20 always hits, otherwise `roll + bonus >= ac`.
pub fn roll_hits(natural: u32, attack_bonus: i32, target_ac: i32) -> bool {
    match natural {
        1 => false,
        20 => true,
        _ => natural as i32 + attack_bonus >= target_ac,
    }
}

/// One attack: hit check, then a confirmation roll under the same rule when the
/// natural roll lands in the threat range.
pub fn resolve_attack<R: DiceRoller + ?Sized>(
    roller: &mut R,
    attack_bonus: i32,
    target_ac: i32,
    critical_threat: u32,
) -> AttackRoll {
    let natural = roller.d20();
    if !roll_hits(natural, attack_bonus, target_ac) {
        return AttackRoll {
            natural,
            confirmation: None,
            outcome: AttackOutcome::Miss,
        };
    }
    if natural < critical_threat {
        return AttackRoll {
            natural,
            confirmation: None,
            outcome: AttackOutcome::Hit,
        };
    }
    let confirmation = roller.d20();
    let outcome = if roll_hits(confirmation, attack_bonus, target_ac) {
        AttackOutcome::CriticalHit
    } else {
        AttackOutcome::Hit
    };
    AttackRoll {
        natural,
        confirmation: Some(confirmation),
        outcome,
    }
}

/// Resolves attacks against one target with a fixed threat value.
#[derive(Debug, Clone, Copy)]
pub struct AttackResolver<'a> {
    target: &'a TargetProfile,
    critical_threat: u32,
}

impl<'a> AttackResolver<'a> {
    pub fn new(target: &'a TargetProfile, critical_threat: u32) -> Self {
        Self {
            target,
            critical_threat,
        }
    }

    pub fn target(&self) -> &TargetProfile {
        self.target
    }

    pub fn critical_threat(&self) -> u32 {
        self.critical_threat
    }

    /// `ac_reduction` comes from an active armor-shred window.
    pub fn attack<R: DiceRoller + ?Sized>(
        &self,
        roller: &mut R,
        attack_bonus: i32,
        ac_reduction: i32,
    ) -> AttackRoll {
        resolve_attack(
            roller,
            attack_bonus,
            self.target.ac - ac_reduction,
            self.critical_threat,
        )
    }

    pub fn roll_damage<R: DiceRoller + ?Sized>(
        &self,
        map: &DamageMap,
        roller: &mut R,
    ) -> TypedDamage {
        map.roll(roller)
    }

    pub fn mitigate(&self, rolled: &TypedDamage, shift: &BTreeMap<DamageType, f64>) -> i64 {
        apply_immunities(rolled, self.target, shift)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::dice::DiceRoll;
    use crate::combat::rng::{Rng, ScriptedRoller};

    #[test]
    fn natural_one_misses_even_with_huge_bonus() {
        let mut roller = ScriptedRoller::new(vec![1]);
        let roll = resolve_attack(&mut roller, 1000, 10, 19);
        assert_eq!(roll.outcome, AttackOutcome::Miss);
    }

    #[test]
    fn natural_twenty_hits_even_when_total_is_short() {
        let mut roller = ScriptedRoller::new(vec![20, 1]);
        let roll = resolve_attack(&mut roller, -50, 100, 20);
        assert_eq!(roll.outcome, AttackOutcome::Hit);
        assert_eq!(roll.confirmation, Some(1));
    }

    #[test]
    fn hit_requires_total_at_least_ac() {
        assert!(roll_hits(10, 5, 15));
        assert!(!roll_hits(9, 5, 15));
    }

    #[test]
    fn threat_with_failed_confirmation_stays_normal_hit() {
        let mut roller = ScriptedRoller::new(vec![19, 2]);
        let roll = resolve_attack(&mut roller, 5, 20, 19);
        assert_eq!(roll.outcome, AttackOutcome::Hit);
        assert_eq!(roll.confirmation, Some(2));
    }

    #[test]
    fn confirmed_threat_is_critical() {
        let mut roller = ScriptedRoller::new(vec![18, 15]);
        let roll = resolve_attack(&mut roller, 10, 25, 17);
        assert_eq!(roll.outcome, AttackOutcome::CriticalHit);
    }

    #[test]
    fn no_confirmation_below_threat() {
        let mut roller = ScriptedRoller::new(vec![15, 20]);
        let roll = resolve_attack(&mut roller, 68, 65, 19);
        assert_eq!(roll.outcome, AttackOutcome::Hit);
        assert_eq!(roll.confirmation, None);
        assert_eq!(roller.dice_drawn(), 1);
    }

    #[test]
    fn hit_rate_matches_closed_form_over_many_rolls() {
        // need 11+ on the die: 10/20 hit chance
        let mut rng = Rng::new(5);
        let hits = (0..40_000)
            .filter(|_| resolve_attack(&mut rng, 4, 15, 21).outcome.is_hit())
            .count();
        let rate = hits as f64 / 40_000.0;
        assert!((rate - 0.5).abs() < 0.02, "rate={rate}");
    }

    #[test]
    fn resolver_applies_ac_reduction_and_immunities() {
        let target = TargetProfile::new(30).with_immunity(DamageType::Physical, 0.25);
        let resolver = AttackResolver::new(&target, 20);
        let mut roller = ScriptedRoller::new(vec![10]);
        assert_eq!(resolver.attack(&mut roller, 15, 5).outcome, AttackOutcome::Hit);

        let mut map = DamageMap::new();
        map.push(DamageType::Physical, DiceRoll::dice(1, 8));
        map.push(DamageType::Physical, DiceRoll::flat(10));
        map.push(DamageType::Physical, DiceRoll::flat(42));
        let mut dice = ScriptedRoller::new(vec![5]);
        let rolled = resolver.roll_damage(&map, &mut dice);
        assert_eq!(rolled.get(DamageType::Physical), 57);
        assert_eq!(resolver.mitigate(&rolled, &BTreeMap::new()), 43);
    }
}
