//! Attack-bonus progressions: named per-round offset sequences, special-attack
//! markers, and the dual-wield penalty model.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Creature or weapon size class.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Size {
    Tiny,
    Small,
    #[default]
    Medium,
    Large,
}

impl Size {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tiny => "tiny",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }
}

/// Bonus attacks that are never subject to the dual-wield penalty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialAttack {
    Hasted,
    Flurry,
    Rapid,
    #[serde(rename = "bspeed")]
    BootsOfSpeed,
}

impl SpecialAttack {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hasted => "hasted",
            Self::Flurry => "flurry",
            Self::Rapid => "rapid",
            Self::BootsOfSpeed => "bspeed",
        }
    }
}

/// Offsets handed to special attacks by their order among special markers.
pub const SPECIAL_ATTACK_OFFSETS: [i32; 3] = [0, -5, -10];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgressionStep {
    Offset(i32),
    Special(SpecialAttack),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progression {
    pub name: String,
    pub steps: Vec<ProgressionStep>,
}

impl Progression {
    pub fn new(name: impl Into<String>, steps: Vec<ProgressionStep>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    /// Resolves each step to its offset, applying the 0/-5/-10 positional rule to
    /// special markers.
    pub fn offsets(&self) -> Vec<(i32, Option<SpecialAttack>)> {
        let mut specials_seen = 0usize;
        self.steps
            .iter()
            .map(|step| match *step {
                ProgressionStep::Offset(offset) => (offset, None),
                ProgressionStep::Special(kind) => {
                    let index = specials_seen.min(SPECIAL_ATTACK_OFFSETS.len() - 1);
                    specials_seen += 1;
                    (SPECIAL_ATTACK_OFFSETS[index], Some(kind))
                }
            })
            .collect()
    }
}

/// Fixed catalog of named progressions.
#[derive(Debug, Clone)]
pub struct ProgressionCatalog {
    by_name: BTreeMap<String, Progression>,
}

impl ProgressionCatalog {
    pub fn builtin() -> Self {
        use ProgressionStep::{Offset, Special};
        use SpecialAttack::*;

        let entries = [
            Progression::new("single", vec![Offset(0)]),
            Progression::new("standard", vec![Offset(0), Offset(-5), Offset(-10), Offset(-15)]),
            Progression::new(
                "hasted",
                vec![Offset(0), Special(Hasted), Offset(-5), Offset(-10), Offset(-15)],
            ),
            Progression::new(
                "bspeed",
                vec![Offset(0), Special(BootsOfSpeed), Offset(-5), Offset(-10), Offset(-15)],
            ),
            Progression::new(
                "flurry",
                vec![
                    Offset(0),
                    Special(Flurry),
                    Special(Flurry),
                    Offset(-5),
                    Offset(-10),
                    Offset(-15),
                ],
            ),
            Progression::new(
                "rapid",
                vec![Offset(0), Special(Rapid), Offset(-5), Offset(-10), Offset(-15)],
            ),
            Progression::new(
                "hasted_rapid",
                vec![
                    Offset(0),
                    Special(Hasted),
                    Special(Rapid),
                    Offset(-5),
                    Offset(-10),
                    Offset(-15),
                ],
            ),
            Progression::new(
                "hasted_flurry",
                vec![
                    Offset(0),
                    Special(Hasted),
                    Special(Flurry),
                    Special(Flurry),
                    Offset(-5),
                    Offset(-10),
                    Offset(-15),
                ],
            ),
        ];

        Self {
            by_name: entries
                .into_iter()
                .map(|progression| (progression.name.clone(), progression))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Progression> {
        self.by_name.get(name.trim().to_ascii_lowercase().as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Progression> {
        self.by_name.values()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    MainHand,
    Special(SpecialAttack),
    OffHand,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MainHand => f.write_str("main_hand"),
            Self::Special(kind) => f.write_str(kind.as_str()),
            Self::OffHand => f.write_str("off_hand"),
        }
    }
}

/// One attack in a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttackSlot {
    pub bonus: i32,
    pub kind: SlotKind,
}

/// Feats and sizes that shape the dual-wield penalties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DualWield {
    pub character_size: Size,
    pub weapon_size: Size,
    pub double_sided: bool,
    pub two_weapon_fighting: bool,
    pub ambidexterity: bool,
    pub improved_two_weapon_fighting: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DualWieldPenalties {
    pub primary: i32,
    pub off_hand: i32,
    pub off_hand_attacks: u32,
}

pub const BASE_PRIMARY_PENALTY: i32 = -6;
pub const BASE_OFF_HAND_PENALTY: i32 = -10;
pub const SECOND_OFF_HAND_OFFSET: i32 = -5;

impl DualWield {
    /// Whether the wielder can hold this weapon in both hands at once.
    pub fn is_legal(&self) -> bool {
        if self.weapon_size == Size::Large {
            return self.double_sided && self.character_size == Size::Medium;
        }
        match self.character_size {
            Size::Small => self.weapon_size <= Size::Small,
            Size::Large => self.weapon_size > Size::Tiny,
            Size::Medium | Size::Tiny => true,
        }
    }

    pub fn is_light(&self) -> bool {
        self.weapon_size < self.character_size
            || (self.double_sided && self.character_size == Size::Medium)
    }

    /// `None` when the size combination is illegal.
    pub fn penalties(&self) -> Option<DualWieldPenalties> {
        if !self.is_legal() {
            return None;
        }
        let mut primary = BASE_PRIMARY_PENALTY;
        let mut off_hand = BASE_OFF_HAND_PENALTY;
        if self.two_weapon_fighting {
            primary += 2;
            off_hand += 2;
        }
        if self.ambidexterity {
            off_hand += 4;
        }
        if self.is_light() {
            primary += 2;
            off_hand += 2;
        }
        Some(DualWieldPenalties {
            primary,
            off_hand,
            off_hand_attacks: if self.improved_two_weapon_fighting { 2 } else { 1 },
        })
    }
}

/// Per-attack bonuses for one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttackBonusProgression {
    pub slots: Vec<AttackSlot>,
    pub illegal_dual_wield: bool,
}

impl AttackBonusProgression {
    /// Combines the base attack bonus with a named progression and, when present,
    /// the dual-wield penalties and off-hand attacks. An illegal dual-wield setup
    /// yields the same slot layout with every bonus zeroed and the flag set.
    pub fn build(attack_bonus: i32, progression: &Progression, dual: Option<&DualWield>) -> Self {
        let offsets = progression.offsets();

        let Some(dual) = dual else {
            let slots = offsets
                .into_iter()
                .map(|(offset, special)| AttackSlot {
                    bonus: attack_bonus + offset,
                    kind: special.map_or(SlotKind::MainHand, SlotKind::Special),
                })
                .collect();
            return Self {
                slots,
                illegal_dual_wield: false,
            };
        };

        match dual.penalties() {
            Some(penalties) => {
                let mut slots: Vec<AttackSlot> = offsets
                    .into_iter()
                    .map(|(offset, special)| match special {
                        Some(kind) => AttackSlot {
                            bonus: attack_bonus + offset,
                            kind: SlotKind::Special(kind),
                        },
                        None => AttackSlot {
                            bonus: attack_bonus + offset + penalties.primary,
                            kind: SlotKind::MainHand,
                        },
                    })
                    .collect();
                for index in 0..penalties.off_hand_attacks {
                    let extra = if index == 0 { 0 } else { SECOND_OFF_HAND_OFFSET };
                    slots.push(AttackSlot {
                        bonus: attack_bonus + penalties.off_hand + extra,
                        kind: SlotKind::OffHand,
                    });
                }
                Self {
                    slots,
                    illegal_dual_wield: false,
                }
            }
            None => {
                let off_hand = if dual.improved_two_weapon_fighting { 2 } else { 1 };
                let mut slots: Vec<AttackSlot> = offsets
                    .into_iter()
                    .map(|(_, special)| AttackSlot {
                        bonus: 0,
                        kind: special.map_or(SlotKind::MainHand, SlotKind::Special),
                    })
                    .collect();
                slots.extend((0..off_hand).map(|_| AttackSlot {
                    bonus: 0,
                    kind: SlotKind::OffHand,
                }));
                Self {
                    slots,
                    illegal_dual_wield: true,
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn bonuses(&self) -> Vec<i32> {
        self.slots.iter().map(|slot| slot.bonus).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dual(character: Size, weapon: Size) -> DualWield {
        DualWield {
            character_size: character,
            weapon_size: weapon,
            ..DualWield::default()
        }
    }

    #[test]
    fn special_markers_follow_positional_offsets() {
        let catalog = ProgressionCatalog::builtin();
        let flurry = catalog.get("hasted_flurry").unwrap();
        let offsets: Vec<i32> = flurry.offsets().into_iter().map(|(o, _)| o).collect();
        assert_eq!(offsets, vec![0, 0, -5, -10, -5, -10, -15]);
    }

    #[test]
    fn plain_progression_adds_offsets_to_bonus() {
        let catalog = ProgressionCatalog::builtin();
        let built = AttackBonusProgression::build(20, catalog.get("hasted").unwrap(), None);
        assert_eq!(built.bonuses(), vec![20, 20, 15, 10, 5]);
        assert_eq!(built.slots[1].kind, SlotKind::Special(SpecialAttack::Hasted));
        assert!(!built.illegal_dual_wield);
    }

    #[test]
    fn base_dual_wield_penalties() {
        let penalties = dual(Size::Medium, Size::Medium).penalties().unwrap();
        assert_eq!((penalties.primary, penalties.off_hand), (-6, -10));
        assert_eq!(penalties.off_hand_attacks, 1);
    }

    #[test]
    fn feats_and_light_weapon_reduce_penalties() {
        let setup = DualWield {
            two_weapon_fighting: true,
            ambidexterity: true,
            improved_two_weapon_fighting: true,
            ..dual(Size::Medium, Size::Small)
        };
        let penalties = setup.penalties().unwrap();
        assert_eq!((penalties.primary, penalties.off_hand), (-2, -2));
        assert_eq!(penalties.off_hand_attacks, 2);
    }

    #[test]
    fn double_sided_is_light_for_medium_wielder() {
        let setup = DualWield {
            double_sided: true,
            ..dual(Size::Medium, Size::Large)
        };
        assert!(setup.is_legal());
        assert!(setup.is_light());
        assert_eq!(setup.penalties().unwrap().primary, -4);
    }

    #[test]
    fn size_legality_matrix() {
        assert!(!dual(Size::Small, Size::Medium).is_legal());
        assert!(!dual(Size::Large, Size::Tiny).is_legal());
        assert!(!dual(Size::Medium, Size::Large).is_legal());
        assert!(!dual(Size::Large, Size::Large).is_legal());
        assert!(dual(Size::Small, Size::Tiny).is_legal());
        assert!(dual(Size::Large, Size::Medium).is_legal());
        let double_small = DualWield {
            double_sided: true,
            ..dual(Size::Small, Size::Large)
        };
        assert!(!double_small.is_legal());
    }

    #[test]
    fn dual_wield_appends_off_hand_attacks_and_skips_specials() {
        let catalog = ProgressionCatalog::builtin();
        let setup = DualWield {
            two_weapon_fighting: true,
            improved_two_weapon_fighting: true,
            ..dual(Size::Medium, Size::Medium)
        };
        let built = AttackBonusProgression::build(30, catalog.get("hasted").unwrap(), Some(&setup));
        // primary -4, off-hand -8, second off-hand -13
        assert_eq!(built.bonuses(), vec![26, 30, 21, 16, 11, 22, 17]);
        assert_eq!(built.slots[5].kind, SlotKind::OffHand);
    }

    #[test]
    fn illegal_dual_wield_zeroes_every_bonus() {
        let catalog = ProgressionCatalog::builtin();
        let built = AttackBonusProgression::build(
            40,
            catalog.get("standard").unwrap(),
            Some(&dual(Size::Small, Size::Medium)),
        );
        assert!(built.illegal_dual_wield);
        assert_eq!(built.bonuses(), vec![0, 0, 0, 0, 0]);
    }

    #[test]
    fn catalog_lookup_is_case_insensitive_and_steps_deserialize() {
        let catalog = ProgressionCatalog::builtin();
        assert!(catalog.get(" Standard ").is_some());
        assert!(catalog.get("nonexistent").is_none());
        let steps: Vec<ProgressionStep> =
            serde_json::from_str(r#"[0, "hasted", -5, "bspeed"]"#).unwrap();
        assert_eq!(
            steps,
            vec![
                ProgressionStep::Offset(0),
                ProgressionStep::Special(SpecialAttack::Hasted),
                ProgressionStep::Offset(-5),
                ProgressionStep::Special(SpecialAttack::BootsOfSpeed),
            ]
        );
    }
}
