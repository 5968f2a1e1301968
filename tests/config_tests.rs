use std::fs;

use dpsim::combat::{DamageType, DiceRoll, LegendaryRegistry, ProgressionCatalog};
use dpsim::data::{
    load_build_config, load_weapon_catalog, validate_weapon_catalog, ConfigError, PreparedBuild,
    WeaponCatalog,
};
use tempfile::TempDir;

#[test]
fn loader_picks_format_by_extension() {
    let dir = TempDir::new().unwrap();
    let yaml = dir.path().join("build.yml");
    fs::write(&yaml, "weapon:\n  name: Maul\ntarget:\n  ac: 40\n").unwrap();
    let json = dir.path().join("build.json");
    fs::write(&json, r#"{"weapon": {"name": "Maul"}, "target": {"ac": 40}}"#).unwrap();

    let from_yaml = load_build_config(&yaml).unwrap();
    let from_json = load_build_config(&json).unwrap();
    assert_eq!(from_yaml, from_json);
    assert_eq!(from_yaml.target.ac, 40);

    // YAML body under a JSON extension is a JSON error
    let wrong = dir.path().join("build.txt");
    fs::write(&wrong, "weapon:\n  name: Maul\n").unwrap();
    assert!(matches!(load_build_config(&wrong), Err(ConfigError::ParseJson(_))));
}

#[test]
fn missing_build_file_is_read_error() {
    let err = load_build_config("no/such/build.yaml").unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
    assert!(err.to_string().contains("no/such/build.yaml"));
}

#[test]
fn custom_catalog_file_feeds_prepared_build() {
    let dir = TempDir::new().unwrap();
    let catalog_path = dir.path().join("weapons.json");
    fs::write(
        &catalog_path,
        r#"{"weapons": [
            {"name": "Hooked Spear", "damage": "1d10+1", "size": "medium",
             "critical_threat": 20, "critical_multiplier": 3, "damage_type": "piercing"}
        ]}"#,
    )
    .unwrap();
    let catalog = load_weapon_catalog(&catalog_path).unwrap();
    assert_eq!(catalog.len(), 1);

    let config_path = dir.path().join("build.yaml");
    fs::write(&config_path, "weapon:\n  name: hooked spear\n  enhancement: 3\n").unwrap();
    let config = load_build_config(&config_path).unwrap();
    let prepared = PreparedBuild::from_config(
        &config,
        &catalog,
        &ProgressionCatalog::builtin(),
        &LegendaryRegistry::builtin(),
    )
    .unwrap();
    assert_eq!(
        prepared.build.weapon.template().get(DamageType::Physical),
        &[DiceRoll::new(1, 10, 1), DiceRoll::flat(3)]
    );
    assert!(prepared.build.legendary.is_none());
}

#[test]
fn additional_damage_with_bad_dice_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("build.yaml");
    fs::write(
        &path,
        "additional_damage:\n  holy:\n    damage:\n      divine: two d six\n",
    )
    .unwrap();
    let config = load_build_config(&path).unwrap();
    let err = PreparedBuild::from_config_builtin(&config).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidDice(ref raw) if raw == "two d six"));
}

#[test]
fn builtin_catalog_validates_clean() {
    let catalog = WeaponCatalog::builtin().unwrap();
    let report = validate_weapon_catalog(&catalog, &LegendaryRegistry::builtin());
    assert!(!report.has_errors(), "{:?}", report.diagnostics);
}
