//! tabspec core
//!
//! Canonical table-spec model: the logical type system, constraints, the
//! immutable [`Spec`] aggregate, the error taxonomy and coercion warnings.
//! Warning codes are stable - they are part of the public API.

pub mod constraint;
pub mod diagnostic;
pub mod error;
pub mod settings;
pub mod spec;
pub mod types;

pub use constraint::{ColumnConstraint, ConstraintKind, ForeignKeyReference, Identity, TableConstraint};
pub use diagnostic::{CoercionWarning, WarningCode};
pub use error::{Error, Result};
pub use settings::{ColumnarSettings, Mode, ModelSettings, Settings, SettingsError, SqlSettings};
pub use spec::{
    normalize, Column, GeneratedColumn, Metadata, PartitionColumn, Spec, SpecBuilder, Storage,
    SPEC_FORMAT_VERSION,
};
pub use types::{IntervalCategory, IntervalUnit, LogicalType, TimeUnit, TypeAlias, TypeTag, DEFAULT_TIMEZONE};
