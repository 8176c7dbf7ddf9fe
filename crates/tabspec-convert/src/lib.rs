//! tabspec conversion engine
//!
//! Target-agnostic conversion of a [`tabspec_core::Spec`] into a target
//! schema, and loading target schemas back into specs. Targets plug in by
//! implementing [`Target`]; loaders by implementing [`Loader`].

pub mod engine;
pub mod load;
pub mod model;

#[cfg(feature = "arrow")]
pub mod columnar;

use std::fmt;
use std::str::FromStr;

use tabspec_core::{Error, Result};

pub use engine::{
    ColumnOverride, ConversionContext, ConvertConfig, Converted, Converter, FieldPath, Handler, Target,
};
pub use load::{LoadConfig, LoadContext, Loaded, Loader};
pub use model::{HostType, ModelField, ModelTarget, ModelType, ValidationModel};

#[cfg(feature = "arrow")]
pub use columnar::{ArrowLoader, ArrowTarget, ArrowType};

/// Conversion targets known to the front ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// Arrow schema
    Columnar,
    /// Validation model / JSON Schema
    Model,
    /// `CREATE TABLE` statement
    Sql,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Columnar => "arrow",
            Self::Model => "model",
            Self::Sql => "sql",
        }
    }

    /// Fail when the target was compiled out of this build
    pub fn require(&self) -> Result<()> {
        if *self == Self::Columnar && !cfg!(feature = "arrow") {
            return Err(Error::dependency_missing(self.as_str(), "arrow-schema"));
        }
        Ok(())
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arrow" | "columnar" => Ok(Self::Columnar),
            "model" | "json-schema" => Ok(Self::Model),
            "sql" => Ok(Self::Sql),
            other => Err(Error::validation(format!(
                "Unknown target '{}'. Expected one of: arrow, model, sql.",
                other
            ))),
        }
    }
}
