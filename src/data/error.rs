use std::path::PathBuf;

use thiserror::Error;

use crate::combat::damage::DamageType;

/// Problems found while loading or validating a build. All of these stop the run
/// before the first round is simulated.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown weapon '{0}'")]
    UnknownWeapon(String),

    #[error("unknown attack progression '{0}'")]
    UnknownProgression(String),

    #[error("enhancement damage type must be slashing, piercing or bludgeoning, got '{0}'")]
    InvalidEnhancementType(String),

    #[error("weapon '{weapon}' has non-physical base damage type {kind}")]
    InvalidWeaponDamageType { weapon: String, kind: DamageType },

    #[error("invalid dice '{0}'")]
    InvalidDice(String),

    #[error("{name} must be a positive finite number, got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("unsupported confidence level {0}% (expected 90, 95 or 99)")]
    InvalidConfidence(u8),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("failed to parse JSON: {0}")]
    ParseJson(#[from] serde_json::Error),
}
