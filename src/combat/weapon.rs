//! Weapon facts and static damage aggregation.
//!
//! Produces the read-only `DamageMap` template every attack starts from, plus the
//! critical threat value, critical multiplier and the critical-only feat bonuses.

use serde::{Deserialize, Serialize};

use crate::combat::damage::{DamageMap, DamageType};
use crate::combat::dice::DiceRoll;
use crate::combat::legendary::LegendarySpec;
use crate::combat::progression::Size;
use crate::combat::stacking::merge_highest_average;
use crate::data::error::ConfigError;

/// Each threat-widening feat lowers the threat value by this much.
pub const THREAT_STEP_PER_FEAT: u32 = 3;
pub const MIN_CRITICAL_THREAT: u32 = 2;
pub const MAX_CRITICAL_THREAT: u32 = 20;

/// Pure tick dealt on a miss with a double-sided weapon.
pub const TENACIOUS_BLOW: DiceRoll = DiceRoll::flat(3);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponCategory {
    #[default]
    Melee,
    Ranged,
    /// Ranged weapons that always get the full strength bonus.
    Thrown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatStyle {
    #[default]
    Melee,
    Ranged,
}

/// Catalog facts about a weapon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponBase {
    pub name: String,
    pub damage: DiceRoll,
    #[serde(default)]
    pub size: Size,
    pub critical_threat: u32,
    pub critical_multiplier: u32,
    #[serde(default)]
    pub category: WeaponCategory,
    #[serde(default)]
    pub double_sided: bool,
    pub damage_type: DamageType,
    #[serde(default)]
    pub legendary: Option<LegendarySpec>,
}

/// Feats that change critical behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriticalFeats {
    pub keen: bool,
    pub improved_critical: bool,
    pub weaponmaster: bool,
    pub overwhelming_critical: bool,
    pub devastating_critical: bool,
}

/// A togglable damage source, e.g. a weapon enchantment or a buff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditionalDamage {
    pub name: String,
    pub enabled: bool,
    pub damage: Vec<(DamageType, DiceRoll)>,
}

/// Everything about the wielder and the weapon's enchantments that feeds damage.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeaponInputs {
    pub enhancement: i32,
    /// Defaults to the weapon's own physical type.
    pub enhancement_type: Option<DamageType>,
    pub vs_race: Option<DiceRoll>,
    pub race_weapon_bonus: Option<DiceRoll>,
    pub strength_modifier: i32,
    pub style: CombatStyle,
    pub two_handed: bool,
    pub mighty: Option<i32>,
    pub feats: CriticalFeats,
    pub additional: Vec<AdditionalDamage>,
}

pub fn critical_threat(base: u32, feats: &CriticalFeats) -> u32 {
    let feat_count = u32::from(feats.keen) + u32::from(feats.improved_critical);
    base.min(MAX_CRITICAL_THREAT)
        .saturating_sub(THREAT_STEP_PER_FEAT * feat_count)
        .clamp(MIN_CRITICAL_THREAT, MAX_CRITICAL_THREAT)
}

pub fn critical_multiplier(base: u32, feats: &CriticalFeats) -> u32 {
    base.max(1) + u32::from(feats.weaponmaster)
}

/// Full modifier one-handed, x1.5 (toward zero) two-handed, capped by mighty for
/// ranged weapons outside the thrown category.
pub fn strength_bonus(
    modifier: i32,
    style: CombatStyle,
    category: WeaponCategory,
    two_handed: bool,
    mighty: Option<i32>,
) -> i32 {
    match (style, category) {
        (CombatStyle::Ranged, WeaponCategory::Thrown) => modifier,
        (CombatStyle::Ranged, _) | (_, WeaponCategory::Ranged) => {
            modifier.min(mighty.unwrap_or(0))
        }
        _ if two_handed => modifier * 3 / 2,
        _ => modifier,
    }
}

/// Pure bonus dice for Devastating Critical by weapon size.
pub fn devastating_critical_dice(size: Size) -> DiceRoll {
    match size {
        Size::Tiny => DiceRoll::dice(1, 4),
        Size::Small => DiceRoll::dice(1, 6),
        Size::Medium => DiceRoll::dice(2, 6),
        Size::Large => DiceRoll::dice(3, 6),
    }
}

/// Physical flat for Overwhelming Critical, scaling with the multiplier.
pub fn overwhelming_critical_dice(crit_multiplier: u32) -> DiceRoll {
    let steps = crit_multiplier.saturating_sub(1).max(1) as i32;
    DiceRoll::flat(3 * steps)
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeaponProfile {
    pub base: WeaponBase,
    pub critical_threat: u32,
    pub critical_multiplier: u32,
    pub strength_bonus: i32,
    template: DamageMap,
    critical_bonus: DamageMap,
}

impl WeaponProfile {
    pub fn build(base: WeaponBase, inputs: &WeaponInputs) -> Result<Self, ConfigError> {
        if !base.damage_type.is_physical_subtype() {
            return Err(ConfigError::InvalidWeaponDamageType {
                weapon: base.name.clone(),
                kind: base.damage_type,
            });
        }
        let enhancement_type = inputs.enhancement_type.unwrap_or(base.damage_type);
        if !enhancement_type.is_physical_subtype() {
            return Err(ConfigError::InvalidEnhancementType(
                enhancement_type.as_str().to_string(),
            ));
        }

        let critical_threat = critical_threat(base.critical_threat, &inputs.feats);
        let critical_multiplier = critical_multiplier(base.critical_multiplier, &inputs.feats);
        let strength_bonus = strength_bonus(
            inputs.strength_modifier,
            inputs.style,
            base.category,
            inputs.two_handed,
            inputs.mighty,
        );

        let mut template = DamageMap::new();
        template.push(base.damage_type, base.damage);

        let enhancement = (inputs.enhancement != 0).then(|| DiceRoll::flat(inputs.enhancement));
        let competing = match (enhancement, inputs.vs_race) {
            (current, Some(bane)) => Some(merge_highest_average(current, bane)),
            (current, None) => current,
        };
        if let Some(bonus) = competing {
            template.push(enhancement_type, bonus);
        }
        if strength_bonus != 0 {
            template.push(DamageType::Physical, DiceRoll::flat(strength_bonus));
        }
        if let Some(race_bonus) = inputs.race_weapon_bonus {
            template.push(DamageType::Physical, race_bonus);
        }
        for source in inputs.additional.iter().filter(|source| source.enabled) {
            for (kind, dice) in &source.damage {
                template.push(*kind, *dice);
            }
        }

        let mut critical_bonus = DamageMap::new();
        if inputs.feats.overwhelming_critical {
            critical_bonus.push(
                DamageType::Physical,
                overwhelming_critical_dice(critical_multiplier),
            );
        }
        if inputs.feats.devastating_critical {
            critical_bonus.push(DamageType::Pure, devastating_critical_dice(base.size));
        }

        Ok(Self {
            base,
            critical_threat,
            critical_multiplier,
            strength_bonus,
            template,
            critical_bonus,
        })
    }

    /// Read-only template; attacks clone it.
    pub fn template(&self) -> &DamageMap {
        &self.template
    }

    /// Appended after critical duplication, never multiplied.
    pub fn critical_bonus(&self) -> &DamageMap {
        &self.critical_bonus
    }

    pub fn size(&self) -> Size {
        self.base.size
    }

    pub fn is_double_sided(&self) -> bool {
        self.base.double_sided
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn longsword() -> WeaponBase {
        WeaponBase {
            name: "Longsword".to_string(),
            damage: DiceRoll::dice(1, 8),
            size: Size::Medium,
            critical_threat: 19,
            critical_multiplier: 2,
            category: WeaponCategory::Melee,
            double_sided: false,
            damage_type: DamageType::Slashing,
            legendary: None,
        }
    }

    #[test]
    fn threat_widens_three_per_feat_and_stays_in_bounds() {
        let none = CriticalFeats::default();
        let keen = CriticalFeats {
            keen: true,
            ..none
        };
        let both = CriticalFeats {
            keen: true,
            improved_critical: true,
            ..none
        };
        assert_eq!(critical_threat(19, &none), 19);
        assert_eq!(critical_threat(19, &keen), 16);
        assert_eq!(critical_threat(19, &both), 13);
        assert_eq!(critical_threat(20, &both), 14);
        assert_eq!(critical_threat(4, &both), MIN_CRITICAL_THREAT);
        assert_eq!(critical_threat(25, &none), 20);
    }

    #[test]
    fn weaponmaster_adds_one_to_multiplier() {
        let feats = CriticalFeats {
            weaponmaster: true,
            ..CriticalFeats::default()
        };
        assert_eq!(critical_multiplier(3, &feats), 4);
        assert_eq!(critical_multiplier(2, &CriticalFeats::default()), 2);
    }

    #[test]
    fn strength_bonus_by_style() {
        use CombatStyle as S;
        use WeaponCategory as C;
        assert_eq!(strength_bonus(10, S::Melee, C::Melee, false, None), 10);
        assert_eq!(strength_bonus(7, S::Melee, C::Melee, true, None), 10);
        assert_eq!(strength_bonus(-3, S::Melee, C::Melee, true, None), -4);
        assert_eq!(strength_bonus(10, S::Ranged, C::Ranged, false, Some(4)), 4);
        assert_eq!(strength_bonus(2, S::Ranged, C::Ranged, false, Some(4)), 2);
        assert_eq!(strength_bonus(10, S::Ranged, C::Ranged, false, None), 0);
        assert_eq!(strength_bonus(10, S::Ranged, C::Thrown, false, Some(1)), 10);
    }

    #[test]
    fn enhancement_and_bane_keep_only_the_higher_average() {
        let inputs = WeaponInputs {
            enhancement: 5,
            vs_race: Some(DiceRoll::dice(2, 6)),
            ..WeaponInputs::default()
        };
        let profile = WeaponProfile::build(longsword(), &inputs).unwrap();
        assert_eq!(
            profile.template().get(DamageType::Physical),
            &[DiceRoll::dice(1, 8), DiceRoll::dice(2, 6)]
        );

        let stronger_enhancement = WeaponInputs {
            enhancement: 10,
            ..inputs
        };
        let profile = WeaponProfile::build(longsword(), &stronger_enhancement).unwrap();
        assert_eq!(
            profile.template().get(DamageType::Physical),
            &[DiceRoll::dice(1, 8), DiceRoll::flat(10)]
        );
    }

    #[test]
    fn template_aggregates_all_static_sources() {
        let inputs = WeaponInputs {
            enhancement: 10,
            strength_modifier: 42,
            race_weapon_bonus: Some(DiceRoll::flat(2)),
            additional: vec![
                AdditionalDamage {
                    name: "flaming".to_string(),
                    enabled: true,
                    damage: vec![(DamageType::Fire, DiceRoll::dice(1, 6))],
                },
                AdditionalDamage {
                    name: "disabled".to_string(),
                    enabled: false,
                    damage: vec![(DamageType::Cold, DiceRoll::dice(9, 6))],
                },
                AdditionalDamage {
                    name: "piercing rune".to_string(),
                    enabled: true,
                    damage: vec![(DamageType::Piercing, DiceRoll::flat(1))],
                },
            ],
            ..WeaponInputs::default()
        };
        let profile = WeaponProfile::build(longsword(), &inputs).unwrap();
        let template = profile.template();
        assert_eq!(template.get(DamageType::Physical).len(), 5);
        assert_eq!(template.get(DamageType::Fire), &[DiceRoll::dice(1, 6)]);
        assert!(template.get(DamageType::Cold).is_empty());
        assert_eq!(profile.critical_threat, 19);
    }

    #[test]
    fn non_physical_enhancement_type_is_a_config_error() {
        let inputs = WeaponInputs {
            enhancement: 5,
            enhancement_type: Some(DamageType::Fire),
            ..WeaponInputs::default()
        };
        let err = WeaponProfile::build(longsword(), &inputs).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnhancementType(ref kind) if kind == "fire"));
    }

    #[test]
    fn critical_feat_bonuses_live_outside_the_template() {
        let inputs = WeaponInputs {
            feats: CriticalFeats {
                overwhelming_critical: true,
                devastating_critical: true,
                weaponmaster: true,
                ..CriticalFeats::default()
            },
            ..WeaponInputs::default()
        };
        let profile = WeaponProfile::build(longsword(), &inputs).unwrap();
        assert_eq!(profile.critical_multiplier, 3);
        assert_eq!(profile.critical_bonus().get(DamageType::Physical), &[DiceRoll::flat(6)]);
        assert_eq!(profile.critical_bonus().get(DamageType::Pure), &[DiceRoll::dice(2, 6)]);
        assert_eq!(profile.template().get(DamageType::Pure).len(), 0);
    }
}
