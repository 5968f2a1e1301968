pub mod catalog;
pub mod config;
pub mod error;
pub mod validate;

pub use catalog::{load_weapon_catalog, WeaponCatalog, DEFAULT_WEAPONS_PATH};
pub use config::{load_build_config, BuildConfig, PreparedBuild};
pub use error::ConfigError;
pub use validate::{validate_weapon_catalog, ValidationReport, ValidationSeverity};
