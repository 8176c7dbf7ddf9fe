//! Project settings (tabspec.toml)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// How conversions treat constructs a target cannot express
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Fail the whole call
    Strict,

    /// Substitute a fallback and record a warning
    Coerce,
}

impl Default for Mode {
    fn default() -> Self {
        Self::Coerce
    }
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Coerce => "coerce",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "coerce" => Ok(Self::Coerce),
            _ => Err(crate::Error::validation(format!(
                "Invalid mode '{}'. Expected 'strict' or 'coerce'.",
                s
            ))),
        }
    }
}

/// DDL rendering settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlSettings {
    /// Multi-line output
    #[serde(default)]
    pub pretty: bool,

    #[serde(default)]
    pub if_not_exists: bool,

    #[serde(default)]
    pub or_replace: bool,

    /// Drop the catalog segment of qualified table names
    #[serde(default)]
    pub ignore_catalog: bool,

    /// Drop the database segment of qualified table names
    #[serde(default)]
    pub ignore_database: bool,
}

/// Columnar target settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnarSettings {
    /// Use 64-bit offsets for strings, binaries and lists
    #[serde(default)]
    pub large_types: bool,
}

/// Validation model settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Model name; the spec's table name when absent
    #[serde(default)]
    pub name: Option<String>,
}

/// Main settings structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub mode: Mode,

    /// SQL dialect name
    #[serde(default = "default_dialect")]
    pub dialect: String,

    #[serde(default)]
    pub sql: SqlSettings,

    #[serde(default)]
    pub columnar: ColumnarSettings,

    #[serde(default)]
    pub model: ModelSettings,
}

fn default_dialect() -> String {
    "generic".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            dialect: default_dialect(),
            sql: SqlSettings::default(),
            columnar: ColumnarSettings::default(),
            model: ModelSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from TOML file
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SettingsError::IoError(e.to_string()))?;

        Self::from_toml(&contents)
    }

    /// Load settings from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, SettingsError> {
        toml::from_str(toml).map_err(|e| SettingsError::ParseError(e.to_string()))
    }

    /// Save settings to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| SettingsError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml).map_err(|e| SettingsError::IoError(e.to_string()))?;

        Ok(())
    }
}

/// Settings error types
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.mode, Mode::Coerce);
        assert_eq!(settings.dialect, "generic");
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let settings = Settings::from_toml(
            r#"
            mode = "strict"

            [sql]
            pretty = true
            "#,
        )
        .unwrap();

        assert_eq!(settings.mode, Mode::Strict);
        assert!(settings.sql.pretty);
        assert!(!settings.sql.if_not_exists);
        assert_eq!(settings.dialect, "generic");
    }

    #[test]
    fn invalid_mode_rejected() {
        assert!(Settings::from_toml("mode = \"lenient\"").is_err());
        assert!("LENIENT".parse::<Mode>().is_err());
        assert_eq!("Strict".parse::<Mode>().unwrap(), Mode::Strict);
    }

    #[test]
    fn settings_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tabspec.toml");

        let mut settings = Settings::default();
        settings.dialect = "spark".to_string();
        settings.model.name = Some("Orders".to_string());
        settings.save_to_file(&path).unwrap();

        assert_eq!(Settings::from_file(&path).unwrap(), settings);
    }
}
