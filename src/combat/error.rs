use thiserror::Error;

/// Rejected value while parsing a combat input (damage type names, confidence levels).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("unknown damage type '{0}'")]
    UnknownDamageType(String),

    #[error("unsupported confidence level {0}% (expected 90, 95 or 99)")]
    UnsupportedConfidence(u8),
}
