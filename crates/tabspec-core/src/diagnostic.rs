//! Coercion warnings
//!
//! IMPORTANT: Warning codes are stable.
//! NEVER rename or remove codes - they are part of the public API.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Warning code registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningCode {
    /// A type without a target equivalent was replaced by the fallback type
    TypeFallback,

    /// A handler adjusted a type parameter to one the target can hold
    TypeParameterCoerced,

    /// A dialect rule rewrote an AST node
    DialectLegalized,

    /// A construct with no equivalent was dropped
    FeatureDropped,
}

impl WarningCode {
    /// Get the warning code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TypeFallback => "TYPE_FALLBACK",
            Self::TypeParameterCoerced => "TYPE_PARAMETER_COERCED",
            Self::DialectLegalized => "DIALECT_LEGALIZED",
            Self::FeatureDropped => "FEATURE_DROPPED",
        }
    }
}

impl fmt::Display for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-fatal record of a lossy substitution made in coerce mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoercionWarning {
    pub code: WarningCode,

    /// Dot-joined location of the affected field (empty for table-level constructs)
    pub field_path: String,

    /// Human-readable explanation
    pub reason: String,

    pub source_type: String,

    pub resulting_type: String,
}

impl CoercionWarning {
    pub fn new(
        code: WarningCode,
        field_path: impl Into<String>,
        reason: impl Into<String>,
        source_type: impl Into<String>,
        resulting_type: impl Into<String>,
    ) -> Self {
        Self {
            code,
            field_path: field_path.into(),
            reason: reason.into(),
            source_type: source_type.into(),
            resulting_type: resulting_type.into(),
        }
    }
}

impl fmt::Display for CoercionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field_path.is_empty() {
            write!(f, "[{}] {}", self.code, self.reason)?;
        } else {
            write!(f, "[{}] {}: {}", self.code, self.field_path, self.reason)?;
        }
        write!(f, " ({} -> {})", self.source_type, self.resulting_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_serializes_stable_string() {
        let json = serde_json::to_string(&WarningCode::TypeFallback).unwrap();
        assert_eq!(json, "\"TYPE_FALLBACK\"");
        assert_eq!(WarningCode::DialectLegalized.as_str(), "DIALECT_LEGALIZED");
    }

    #[test]
    fn display_includes_path_and_types() {
        let warning = CoercionWarning::new(
            WarningCode::TypeFallback,
            "amt",
            "no handler for decimal",
            "decimal(5,2)",
            "string",
        );
        assert_eq!(
            warning.to_string(),
            "[TYPE_FALLBACK] amt: no handler for decimal (decimal(5,2) -> string)"
        );
    }
}
