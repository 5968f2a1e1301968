//! Read-only weapon catalog. Base weapons plus legendary weapons carrying their
//! proc specification. The builtin table is embedded from data/weapons.json.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::combat::legendary::normalize_weapon_key;
use crate::combat::weapon::WeaponBase;
use crate::data::error::ConfigError;

pub const DEFAULT_WEAPONS_PATH: &str = "data/weapons.json";

const BUILTIN_WEAPONS: &str = include_str!("../../data/weapons.json");

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CatalogFile {
    weapons: Vec<WeaponBase>,
}

#[derive(Debug, Clone, Default)]
pub struct WeaponCatalog {
    weapons: Vec<WeaponBase>,
    by_name: HashMap<String, usize>,
}

impl WeaponCatalog {
    pub fn new(weapons: Vec<WeaponBase>) -> Self {
        let by_name = weapons
            .iter()
            .enumerate()
            .map(|(index, weapon)| (normalize_weapon_key(&weapon.name), index))
            .collect();
        Self { weapons, by_name }
    }

    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_json_str(BUILTIN_WEAPONS)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let file: CatalogFile = serde_json::from_str(raw)?;
        Ok(Self::new(file.weapons))
    }

    /// Case- and whitespace-insensitive.
    pub fn get(&self, name: &str) -> Option<&WeaponBase> {
        self.by_name
            .get(&normalize_weapon_key(name))
            .map(|&index| &self.weapons[index])
    }

    pub fn require(&self, name: &str) -> Result<&WeaponBase, ConfigError> {
        self.get(name)
            .ok_or_else(|| ConfigError::UnknownWeapon(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &WeaponBase> {
        self.weapons.iter()
    }

    pub fn legendary(&self) -> impl Iterator<Item = &WeaponBase> {
        self.weapons.iter().filter(|weapon| weapon.legendary.is_some())
    }

    pub fn len(&self) -> usize {
        self.weapons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weapons.is_empty()
    }
}

pub fn load_weapon_catalog(path: impl AsRef<Path>) -> Result<WeaponCatalog, ConfigError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    WeaponCatalog::from_json_str(&raw)
}
