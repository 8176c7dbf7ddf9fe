//! Load-direction engine
//!
//! Mirrors [`crate::engine`]: loaders walk an external schema, map each type
//! through a fixed table and report what they could not carry over.

use std::fmt;

use tabspec_core::{CoercionWarning, Error, LogicalType, Mode, Result, Spec, WarningCode};

use crate::engine::FieldPath;

/// Options for one load
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadConfig {
    pub mode: Mode,

    /// Canonical type for external types with no equivalent; `string` when unset
    pub fallback_type: Option<LogicalType>,

    /// Spec name, for sources that carry none
    pub name: Option<String>,

    pub version: Option<u32>,

    pub description: Option<String>,
}

impl LoadConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn fallback_type(mut self, ty: LogicalType) -> Self {
        self.fallback_type = Some(ty);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Configured name, or `default` when none was given
    pub fn name_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(default)
    }
}

/// Successful load
#[derive(Debug, Clone)]
pub struct Loaded {
    pub spec: Spec,
    pub warnings: Vec<CoercionWarning>,
}

/// A load-direction source
pub trait Loader {
    /// External schema representation
    type Source: ?Sized;

    fn name(&self) -> &'static str;

    fn load(&self, source: &Self::Source, config: &LoadConfig) -> Result<Loaded>;
}

/// Call-scoped load state
pub struct LoadContext {
    source: &'static str,
    mode: Mode,
    fallback: LogicalType,
    path: FieldPath,
    warnings: Vec<CoercionWarning>,
}

impl LoadContext {
    pub fn new(source: &'static str, config: &LoadConfig) -> Self {
        Self {
            source,
            mode: config.mode,
            fallback: config.fallback_type.clone().unwrap_or_else(LogicalType::string),
            path: FieldPath::new(),
            warnings: Vec::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    pub fn with_segment<R>(&mut self, segment: &str, f: impl FnOnce(&mut Self) -> R) -> R {
        self.path.push(segment);
        let result = f(self);
        self.path.pop();
        result
    }

    /// Resolve an external type with no canonical equivalent
    ///
    /// Strict mode fails; coerce mode returns the fallback type and records a
    /// [`WarningCode::TypeFallback`] warning.
    pub fn unsupported_type(&mut self, external: impl fmt::Display) -> Result<LogicalType> {
        let feature = format!("type '{}'", external);
        if self.mode == Mode::Strict {
            return Err(self.unsupported(feature));
        }
        let fallback = self.fallback.clone();
        self.warn(
            WarningCode::TypeFallback,
            format!("{} does not support {}", self.source, feature),
            external,
            &fallback,
        );
        Ok(fallback)
    }

    /// Skip a construct the canonical spec cannot hold
    pub fn drop_feature(&mut self, feature: impl Into<String>, external: impl fmt::Display) -> Result<()> {
        let feature = feature.into();
        if self.mode == Mode::Strict {
            return Err(self.unsupported(feature));
        }
        self.warn(
            WarningCode::FeatureDropped,
            format!("{} was dropped", feature),
            external,
            "(dropped)",
        );
        Ok(())
    }

    /// Adjust an external type parameter the canonical type cannot hold
    pub fn coerce(
        &mut self,
        reason: impl Into<String>,
        external: impl fmt::Display,
        result: impl fmt::Display,
    ) -> Result<()> {
        let reason = reason.into();
        if self.mode == Mode::Strict {
            return Err(self.unsupported(reason));
        }
        self.warn(WarningCode::TypeParameterCoerced, reason, external, result);
        Ok(())
    }

    pub fn warn(
        &mut self,
        code: WarningCode,
        reason: impl Into<String>,
        source: impl fmt::Display,
        result: impl fmt::Display,
    ) {
        let warning = CoercionWarning::new(
            code,
            self.path.to_string(),
            reason,
            source.to_string(),
            result.to_string(),
        );
        tracing::warn!(loader = self.source, "{}", warning);
        self.warnings.push(warning);
    }

    pub fn unsupported(&self, feature: impl Into<String>) -> Error {
        Error::unsupported(self.source, feature, self.path.to_string())
    }

    pub fn finish(self, spec: Spec) -> Loaded {
        Loaded {
            spec,
            warnings: self.warnings,
        }
    }
}
