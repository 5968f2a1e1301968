//! Build configuration: the user-facing YAML/JSON shape and its validation into a
//! ready-to-run [PreparedBuild].

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::combat::damage::{DamageType, TargetProfile};
use crate::combat::dice::DiceRoll;
use crate::combat::engine::{
    CombatBuild, ConfidenceLevel, SimulationConfig, SimulationEngine, SimulationReport,
};
use crate::combat::legendary::LegendaryRegistry;
use crate::combat::progression::{AttackBonusProgression, DualWield, ProgressionCatalog, Size};
use crate::combat::weapon::{
    AdditionalDamage, CombatStyle, CriticalFeats, WeaponInputs, WeaponProfile,
};
use crate::data::catalog::WeaponCatalog;
use crate::data::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub ac: i32,
    pub immunities: BTreeMap<DamageType, f64>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            ac: 50,
            immunities: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackConfig {
    pub bonus: i32,
    pub progression: String,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            bonus: 50,
            progression: "standard".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterConfig {
    pub strength_modifier: i32,
    pub style: CombatStyle,
    pub two_handed: bool,
    pub size: Size,
    pub mighty: Option<i32>,
    pub race_weapon_bonus: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponConfig {
    pub name: String,
    pub enhancement: i32,
    pub enhancement_type: Option<String>,
    pub vs_race: Option<String>,
}

impl Default for WeaponConfig {
    fn default() -> Self {
        Self {
            name: "Longsword".to_string(),
            enhancement: 0,
            enhancement_type: None,
            vs_race: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DualWieldConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatsConfig {
    pub keen: bool,
    pub improved_critical: bool,
    pub weaponmaster: bool,
    pub two_weapon_fighting: bool,
    pub ambidexterity: bool,
    pub improved_two_weapon_fighting: bool,
    pub overwhelming_critical: bool,
    pub devastating_critical: bool,
    pub tenacious_blow: bool,
}

impl FeatsConfig {
    fn critical(&self) -> CriticalFeats {
        CriticalFeats {
            keen: self.keen,
            improved_critical: self.improved_critical,
            weaponmaster: self.weaponmaster,
            overwhelming_critical: self.overwhelming_critical,
            devastating_critical: self.devastating_critical,
        }
    }
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalDamageConfig {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub damage: BTreeMap<DamageType, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSection {
    pub round_cap: u64,
    pub damage_cap: Option<f64>,
    pub stdev_threshold: f64,
    pub range_threshold: f64,
    pub confidence: u8,
    pub seed: u64,
}

impl Default for SimulationSection {
    fn default() -> Self {
        let defaults = SimulationConfig::default();
        Self {
            round_cap: defaults.round_cap,
            damage_cap: defaults.damage_cap,
            stdev_threshold: defaults.stdev_threshold,
            range_threshold: defaults.range_threshold,
            confidence: defaults.confidence.percent(),
            seed: defaults.seed,
        }
    }
}

impl SimulationSection {
    pub fn to_config(&self) -> Result<SimulationConfig, ConfigError> {
        let stdev_threshold = positive("stdev_threshold", self.stdev_threshold)?;
        let range_threshold = positive("range_threshold", self.range_threshold)?;
        let damage_cap = self
            .damage_cap
            .map(|cap| positive("damage_cap", cap))
            .transpose()?;
        let confidence = ConfidenceLevel::try_from(self.confidence)
            .map_err(|_| ConfigError::InvalidConfidence(self.confidence))?;
        Ok(SimulationConfig {
            round_cap: self.round_cap,
            damage_cap,
            stdev_threshold,
            range_threshold,
            confidence,
            seed: self.seed,
        })
    }
}

fn positive(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidThreshold { name, value })
    }
}

fn parse_dice(raw: &str) -> Result<DiceRoll, ConfigError> {
    raw.parse()
        .map_err(|_| ConfigError::InvalidDice(raw.to_string()))
}

fn parse_optional_dice(raw: Option<&String>) -> Result<Option<DiceRoll>, ConfigError> {
    raw.map(|raw| parse_dice(raw)).transpose()
}

/// One build as written by the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub name: Option<String>,
    pub target: TargetConfig,
    pub attack: AttackConfig,
    pub character: CharacterConfig,
    pub weapon: WeaponConfig,
    pub dual_wield: DualWieldConfig,
    pub feats: FeatsConfig,
    pub additional_damage: BTreeMap<String, AdditionalDamageConfig>,
    pub simulation: SimulationSection,
}

impl BuildConfig {
    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.weapon.name.clone())
    }
}

/// `.yaml`/`.yml` parse as YAML, anything else as JSON.
pub fn load_build_config(path: impl AsRef<Path>) -> Result<BuildConfig, ConfigError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    if is_yaml {
        BuildConfig::from_yaml_str(&raw)
    } else {
        BuildConfig::from_json_str(&raw)
    }
}

/// Validated build plus its run settings. Nothing here can fail at simulation time.
#[derive(Debug, Clone)]
pub struct PreparedBuild {
    pub build: CombatBuild,
    pub config: SimulationConfig,
}

impl PreparedBuild {
    pub fn from_config(
        config: &BuildConfig,
        catalog: &WeaponCatalog,
        progressions: &ProgressionCatalog,
        registry: &LegendaryRegistry,
    ) -> Result<Self, ConfigError> {
        let simulation = config.simulation.to_config()?;
        let base = catalog.require(&config.weapon.name)?.clone();
        let progression = progressions
            .get(&config.attack.progression)
            .ok_or_else(|| ConfigError::UnknownProgression(config.attack.progression.clone()))?;

        let enhancement_type = config
            .weapon
            .enhancement_type
            .as_deref()
            .map(|raw| {
                raw.parse::<DamageType>()
                    .map_err(|_| ConfigError::InvalidEnhancementType(raw.to_string()))
            })
            .transpose()?;

        let mut additional = Vec::with_capacity(config.additional_damage.len());
        for (name, source) in &config.additional_damage {
            let mut damage = Vec::with_capacity(source.damage.len());
            for (kind, raw) in &source.damage {
                damage.push((*kind, parse_dice(raw)?));
            }
            additional.push(AdditionalDamage {
                name: name.clone(),
                enabled: source.enabled,
                damage,
            });
        }

        let inputs = WeaponInputs {
            enhancement: config.weapon.enhancement,
            enhancement_type,
            vs_race: parse_optional_dice(config.weapon.vs_race.as_ref())?,
            race_weapon_bonus: parse_optional_dice(config.character.race_weapon_bonus.as_ref())?,
            strength_modifier: config.character.strength_modifier,
            style: config.character.style,
            two_handed: config.character.two_handed,
            mighty: config.character.mighty,
            feats: config.feats.critical(),
            additional,
        };

        let dual = config.dual_wield.enabled.then(|| DualWield {
            character_size: config.character.size,
            weapon_size: base.size,
            double_sided: base.double_sided,
            two_weapon_fighting: config.feats.two_weapon_fighting,
            ambidexterity: config.feats.ambidexterity,
            improved_two_weapon_fighting: config.feats.improved_two_weapon_fighting,
        });

        let legendary = match &base.legendary {
            Some(spec) => match registry.lookup(&base.name) {
                Some(effect) => {
                    tracing::debug!(
                        weapon = %base.name,
                        strategy = effect.name(),
                        "resolved legendary strategy"
                    );
                    Some((effect, spec.clone()))
                }
                None => {
                    tracing::debug!(weapon = %base.name, "no legendary strategy registered");
                    None
                }
            },
            None => None,
        };

        let target = config
            .target
            .immunities
            .iter()
            .fold(TargetProfile::new(config.target.ac), |target, (kind, fraction)| {
                target.with_immunity(*kind, *fraction)
            });

        let weapon = WeaponProfile::build(base, &inputs)?;
        let progression =
            AttackBonusProgression::build(config.attack.bonus, progression, dual.as_ref());

        Ok(Self {
            build: CombatBuild {
                name: config.display_name(),
                weapon,
                progression,
                target,
                legendary,
                tenacious_blow: config.feats.tenacious_blow,
            },
            config: simulation,
        })
    }

    /// Validates against the builtin catalogs.
    pub fn from_config_builtin(config: &BuildConfig) -> Result<Self, ConfigError> {
        Self::from_config(
            config,
            &WeaponCatalog::builtin()?,
            &ProgressionCatalog::builtin(),
            &LegendaryRegistry::builtin(),
        )
    }

    pub fn engine(&self) -> SimulationEngine<'_> {
        SimulationEngine::new(&self.build, self.config)
    }

    pub fn run(&self) -> SimulationReport {
        self.engine().run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::progression::{SlotKind, SpecialAttack};

    fn prepare(config: &BuildConfig) -> Result<PreparedBuild, ConfigError> {
        PreparedBuild::from_config_builtin(config)
    }

    #[test]
    fn empty_yaml_takes_every_default() {
        let config = BuildConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, BuildConfig::default());
        let prepared = prepare(&config).unwrap();
        assert_eq!(prepared.config, SimulationConfig::default());
        assert_eq!(prepared.build.name, "Longsword");
    }

    #[test]
    fn yaml_build_resolves_weapon_progression_and_dice() {
        let raw = r#"
name: haste falchion
target:
  ac: 60
  immunities:
    slashing: 0.1
attack:
  bonus: 60
  progression: hasted
character:
  strength_modifier: 20
  two_handed: true
weapon:
  name: warlord's falchion
  enhancement: 7
  vs_race: 2d6+2
feats:
  keen: true
  overwhelming_critical: true
additional_damage:
  flaming:
    damage:
      fire: 1d6
  frost:
    enabled: false
    damage:
      cold: 1d6
simulation:
  round_cap: 500
  confidence: 99
"#;
        let config = BuildConfig::from_yaml_str(raw).unwrap();
        let prepared = prepare(&config).unwrap();
        let build = &prepared.build;
        assert_eq!(build.name, "haste falchion");
        assert_eq!(build.progression.len(), 5);
        assert_eq!(build.progression.slots[1].kind, SlotKind::Special(SpecialAttack::Hasted));
        assert_eq!(build.weapon.critical_threat, 15);
        assert_eq!(build.weapon.strength_bonus, 30);
        assert_eq!(build.target.immunity(DamageType::Physical), 0.1);
        assert_eq!(build.weapon.template().get(DamageType::Fire).len(), 1);
        assert!(build.weapon.template().get(DamageType::Cold).is_empty());
        assert!(build.legendary.is_some());
        assert_eq!(prepared.config.round_cap, 500);
        assert_eq!(prepared.config.confidence, ConfidenceLevel::NinetyNine);
    }

    #[test]
    fn unknown_weapon_and_progression_fail_before_running() {
        let mut config = BuildConfig::default();
        config.weapon.name = "Vorpal Spoon".to_string();
        assert!(matches!(prepare(&config), Err(ConfigError::UnknownWeapon(_))));

        let mut config = BuildConfig::default();
        config.attack.progression = "triple haste".to_string();
        assert!(matches!(prepare(&config), Err(ConfigError::UnknownProgression(_))));
    }

    #[test]
    fn enhancement_type_must_be_physical() {
        let mut config = BuildConfig::default();
        config.weapon.enhancement = 5;
        config.weapon.enhancement_type = Some("fire".to_string());
        assert!(matches!(prepare(&config), Err(ConfigError::InvalidEnhancementType(_))));
        config.weapon.enhancement_type = Some("banana".to_string());
        assert!(matches!(
            prepare(&config),
            Err(ConfigError::InvalidEnhancementType(ref raw)) if raw == "banana"
        ));
        config.weapon.enhancement_type = Some("piercing".to_string());
        assert!(prepare(&config).is_ok());
    }

    #[test]
    fn bad_dice_and_thresholds_are_reported() {
        let mut config = BuildConfig::default();
        config.weapon.vs_race = Some("2x6".to_string());
        assert!(matches!(prepare(&config), Err(ConfigError::InvalidDice(ref raw)) if raw == "2x6"));

        let mut config = BuildConfig::default();
        config.simulation.stdev_threshold = 0.0;
        assert!(matches!(
            prepare(&config),
            Err(ConfigError::InvalidThreshold { name: "stdev_threshold", .. })
        ));

        let mut config = BuildConfig::default();
        config.simulation.confidence = 80;
        assert!(matches!(prepare(&config), Err(ConfigError::InvalidConfidence(80))));
    }

    #[test]
    fn dual_wield_uses_catalog_weapon_size() {
        let mut config = BuildConfig::default();
        config.weapon.name = "Greatsword".to_string();
        config.dual_wield.enabled = true;
        let prepared = prepare(&config).unwrap();
        assert!(prepared.build.progression.illegal_dual_wield);
        let report = prepared.run();
        assert!(report.illegal_dual_wield);
        assert_eq!(report.mean_dps, 0.0);
    }

    #[test]
    fn plain_weapon_has_no_legendary_effect() {
        let prepared = prepare(&BuildConfig::default()).unwrap();
        assert!(prepared.build.legendary.is_none());
    }

    #[test]
    fn json_config_parses() {
        let raw = r#"{"weapon": {"name": "Rapier"}, "simulation": {"seed": 99}}"#;
        let config = BuildConfig::from_json_str(raw).unwrap();
        assert_eq!(config.weapon.name, "Rapier");
        assert_eq!(config.simulation.seed, 99);
        assert_eq!(config.simulation.round_cap, 20_000);
    }
}
