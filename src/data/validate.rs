use std::fmt;

use crate::combat::legendary::{LegendaryRegistry, LegendarySpec, ProcTrigger};
use crate::combat::weapon::{WeaponBase, MAX_CRITICAL_THREAT, MIN_CRITICAL_THREAT};
use crate::data::catalog::WeaponCatalog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidationSeverity {
    Error,
    Warning,
    Info,
}

impl ValidationSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDiagnostic {
    pub severity: ValidationSeverity,
    pub context: String,
    pub message: String,
}

impl fmt::Display for ValidationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.context, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl ValidationReport {
    pub fn push(
        &mut self,
        severity: ValidationSeverity,
        context: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(ValidationDiagnostic {
            severity,
            context: context.into(),
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diag| diag.severity == ValidationSeverity::Error)
    }

    pub fn count(&self, severity: ValidationSeverity) -> usize {
        self.diagnostics
            .iter()
            .filter(|diag| diag.severity == severity)
            .count()
    }
}

/// Checks every catalog entry. Legendary weapons whose name has no registered strategy
/// are errors: they would silently simulate as plain weapons.
pub fn validate_weapon_catalog(
    catalog: &WeaponCatalog,
    registry: &LegendaryRegistry,
) -> ValidationReport {
    let mut report = ValidationReport::default();
    if catalog.is_empty() {
        report.push(ValidationSeverity::Error, "catalog", "no weapons defined");
        return report;
    }
    for weapon in catalog.iter() {
        validate_weapon(weapon, &mut report);
        if let Some(spec) = &weapon.legendary {
            if registry.lookup(&weapon.name).is_none() {
                report.push(
                    ValidationSeverity::Error,
                    &weapon.name,
                    "legendary spec present but no strategy is registered for this weapon",
                );
            }
            validate_legendary(&weapon.name, spec, &mut report);
        }
    }
    report.push(
        ValidationSeverity::Info,
        "catalog",
        format!(
            "{} weapons, {} legendary",
            catalog.len(),
            catalog.legendary().count()
        ),
    );
    report
}

fn validate_weapon(weapon: &WeaponBase, report: &mut ValidationReport) {
    if !weapon.damage_type.is_physical_subtype() {
        report.push(
            ValidationSeverity::Error,
            &weapon.name,
            format!(
                "base damage type {} is not slashing, piercing or bludgeoning",
                weapon.damage_type
            ),
        );
    }
    if !(MIN_CRITICAL_THREAT..=MAX_CRITICAL_THREAT).contains(&weapon.critical_threat) {
        report.push(
            ValidationSeverity::Error,
            &weapon.name,
            format!("critical threat {} outside 2..=20", weapon.critical_threat),
        );
    }
    if weapon.critical_multiplier < 2 {
        report.push(
            ValidationSeverity::Warning,
            &weapon.name,
            format!("critical multiplier {} below 2", weapon.critical_multiplier),
        );
    }
    if !weapon.damage.has_dice() {
        report.push(ValidationSeverity::Warning, &weapon.name, "base damage has no dice");
    }
}

fn validate_legendary(name: &str, spec: &LegendarySpec, report: &mut ValidationReport) {
    if let ProcTrigger::OnHit { chance } = spec.trigger {
        if !(chance > 0.0 && chance <= 100.0) {
            report.push(
                ValidationSeverity::Error,
                name,
                format!("proc chance {chance} outside (0, 100]"),
            );
        }
    }
    let has_window_effect = spec.attack_bonus != 0
        || spec.ac_reduction != 0
        || !spec.immunity_shift.is_empty()
        || spec.persistent_damage.is_some();
    if has_window_effect && spec.window_rounds == 0 {
        report.push(
            ValidationSeverity::Warning,
            name,
            "persistent effect configured with a zero-round window",
        );
    }
    let branch_total: f64 = spec.branches.iter().map(|branch| branch.chance).sum();
    if branch_total > 100.0 {
        report.push(
            ValidationSeverity::Error,
            name,
            format!("outcome branches sum to {branch_total}%"),
        );
    }
    if spec.damage.is_empty() && spec.branches.is_empty() && !has_window_effect {
        report.push(ValidationSeverity::Warning, name, "legendary spec does nothing");
    }
}
