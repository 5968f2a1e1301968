pub mod attack;
pub mod damage;
pub mod dice;
pub mod engine;
pub mod error;
pub mod legendary;
pub mod progression;
pub mod rng;
pub mod stacking;
pub mod stats;
pub mod weapon;

pub use attack::{resolve_attack, roll_hits, AttackOutcome, AttackResolver, AttackRoll};
pub use damage::{
    apply_immunities, apply_immunity, DamageMap, DamageType, TargetProfile, TypedDamage,
};
pub use dice::{DiceRoll, ParseDiceError};
pub use engine::{
    confidence_half_width, hit_damage_map, window_converged, AttackDamage, CombatBuild,
    ConfidenceLevel, SimulationConfig, SimulationEngine, SimulationReport, SimulationState,
    SlotReport, StopReason, CONVERGENCE_WINDOW, SECONDS_PER_ROUND,
};
pub use error::ValueError;
pub use legendary::{
    BurstEffect, LegendContext, LegendaryContribution, LegendaryEffect, LegendaryRegistry,
    LegendarySpec, PersistentEffect, ProcBranch, ProcTrigger, TypedDice,
};
pub use progression::{
    AttackBonusProgression, AttackSlot, DualWield, DualWieldPenalties, Progression,
    ProgressionCatalog, ProgressionStep, Size, SlotKind, SpecialAttack,
};
pub use rng::{DiceRoller, Rng, ScriptedRoller};
pub use stacking::{
    duplicate_for_critical, extract_non_stackable, highest_average, NonStackable, StackRule,
};
pub use stats::{RollingWindow, RunningStats, SlotCounters, StatsAccumulator};
pub use weapon::{
    AdditionalDamage, CombatStyle, CriticalFeats, WeaponBase, WeaponCategory, WeaponInputs,
    WeaponProfile,
};
