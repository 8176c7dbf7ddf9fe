//! tabspec text format
//!
//! Reads and writes specs as YAML or JSON documents. Both encodings share
//! one closed key set; see [`de`] for the accepted shape.

pub mod de;
pub mod ser;

use std::path::Path;

use tabspec_core::{Error, Result, Spec};

pub use de::{spec_from_value, spec_from_value as from_value};
pub use ser::{spec_to_value, spec_to_value as to_value};

/// Document encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Json,
    Yaml,
}

impl TextFormat {
    /// Pick an encoding from a file extension; anything but `.json` is YAML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// Parse a spec from a JSON document
pub fn from_json_str(text: &str) -> Result<Spec> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| Error::validation(format!("Failed to parse JSON spec: {}", e)))?;
    spec_from_value(&value)
}

/// Parse a spec from a YAML document
pub fn from_yaml_str(text: &str) -> Result<Spec> {
    let value: serde_json::Value = serde_yaml::from_str(text)
        .map_err(|e| Error::validation(format!("Failed to parse YAML spec: {}", e)))?;
    spec_from_value(&value)
}

pub fn from_str(text: &str, format: TextFormat) -> Result<Spec> {
    match format {
        TextFormat::Json => from_json_str(text),
        TextFormat::Yaml => from_yaml_str(text),
    }
}

/// Load a spec file, choosing the encoding by extension
pub fn from_path(path: &Path) -> Result<Spec> {
    tracing::debug!("Loading spec from {}", path.display());
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::validation(format!("Failed to read {}: {}", path.display(), e)))?;
    let spec = from_str(&text, TextFormat::from_path(path))?;
    tracing::info!(
        "Loaded spec '{}' v{} with {} columns",
        spec.name(),
        spec.version(),
        spec.columns().len()
    );
    Ok(spec)
}

pub fn to_json_string(spec: &Spec) -> Result<String> {
    serde_json::to_string_pretty(&spec_to_value(spec))
        .map_err(|e| Error::validation(format!("Failed to write JSON spec: {}", e)))
}

pub fn to_yaml_string(spec: &Spec) -> Result<String> {
    serde_yaml::to_string(&spec_to_value(spec))
        .map_err(|e| Error::validation(format!("Failed to write YAML spec: {}", e)))
}

pub fn to_string(spec: &Spec, format: TextFormat) -> Result<String> {
    match format {
        TextFormat::Json => to_json_string(spec),
        TextFormat::Yaml => to_yaml_string(spec),
    }
}
