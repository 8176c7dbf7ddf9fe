//! Convert-direction engine
//!
//! Shared orchestration for every target: column selection, per-column
//! overrides, mode resolution, field-path tracking and warnings. Targets only
//! supply a tag → handler table and know how to assemble their own fields.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tabspec_core::{
    CoercionWarning, Column, Error, LogicalType, Mode, Result, Spec, TypeTag, WarningCode,
};

/// Dot-joined location of a field inside nested structs
///
/// Pushed and popped around each descent, so a path never outlives the call
/// that built it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, segment: impl Into<String>) {
        self.segments.push(segment.into());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.segments.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// Converts one logical type for target `T`
pub type Handler<T> =
    fn(&mut ConversionContext<'_, T>, &LogicalType) -> Result<<T as Target>::Type>;

/// Replaces default dispatch for one named column
pub type ColumnOverride<T> =
    Arc<dyn Fn(&Column, &T) -> Result<<T as Target>::Field> + Send + Sync>;

/// A convert-direction target
///
/// Implementors describe how one representation spells each logical type;
/// traversal, filtering and diagnostics are handled by [`Converter`].
pub trait Target: Sized + Send + Sync {
    /// Target-side type
    type Type: Clone + fmt::Display + Send + Sync;

    /// Target-side column
    type Field;

    /// Finished target representation
    type Output;

    /// Name used in errors and warnings
    fn name(&self) -> &'static str;

    /// Static handler table; `None` means the target cannot express the tag
    fn handler(tag: TypeTag) -> Option<Handler<Self>>;

    /// Fallback used in coerce mode when the config names none
    fn default_fallback(&self) -> Option<Self::Type>;

    /// Wrap a converted type into a field carrying the column's name,
    /// nullability, description and metadata
    fn build_field(&self, column: &Column, ty: Self::Type) -> Result<Self::Field>;

    /// Assemble the selected fields, in spec order
    fn finish(&self, spec: &Spec, columns: &[&Column], fields: Vec<Self::Field>)
        -> Result<Self::Output>;
}

/// Call-scoped conversion state
pub struct ConversionContext<'a, T: Target> {
    target: &'a T,
    mode: Mode,
    fallback: Option<T::Type>,
    path: FieldPath,
    warnings: Vec<CoercionWarning>,
}

impl<'a, T: Target> ConversionContext<'a, T> {
    pub fn new(target: &'a T, mode: Mode, fallback: Option<T::Type>) -> Self {
        Self {
            target,
            mode,
            fallback,
            path: FieldPath::new(),
            warnings: Vec::new(),
        }
    }

    pub fn target(&self) -> &'a T {
        self.target
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// Run `f` with `segment` appended to the field path
    pub fn with_segment<R>(&mut self, segment: &str, f: impl FnOnce(&mut Self) -> R) -> R {
        self.path.push(segment);
        let result = f(self);
        self.path.pop();
        result
    }

    /// Dispatch `ty` through the target's handler table
    ///
    /// In coerce mode an unsupported type is replaced by the fallback at this
    /// nesting level and a [`WarningCode::TypeFallback`] warning is recorded.
    pub fn convert(&mut self, ty: &LogicalType) -> Result<T::Type> {
        let result = match T::handler(ty.tag()) {
            Some(handler) => handler(self, ty),
            None => Err(self.unsupported(format!("type '{}'", ty))),
        };

        match result {
            Err(err) if err.is_unsupported() && self.mode == Mode::Coerce => self.fall_back(ty, err),
            other => other,
        }
    }

    /// Convert a struct member into a target field under its own path segment
    pub fn convert_member(&mut self, member: &Column) -> Result<T::Field> {
        self.with_segment(&member.name, |ctx| {
            let ty = ctx.convert(&member.data_type)?;
            ctx.target.build_field(member, ty)
        })
    }

    /// Adjust a type parameter the target cannot hold as written
    ///
    /// Strict mode fails with [`Error::UnsupportedFeature`]; coerce mode
    /// records a [`WarningCode::TypeParameterCoerced`] warning.
    pub fn coerce(
        &mut self,
        reason: impl Into<String>,
        source: impl fmt::Display,
        result: impl fmt::Display,
    ) -> Result<()> {
        let reason = reason.into();
        if self.mode == Mode::Strict {
            return Err(self.unsupported(reason));
        }
        self.warn(WarningCode::TypeParameterCoerced, reason, source, result);
        Ok(())
    }

    /// Record a warning at the current path
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
        tracing::warn!(converter = self.target.name(), "{}", warning);
        self.warnings.push(warning);
    }

    /// An [`Error::UnsupportedFeature`] for the current path
    pub fn unsupported(&self, feature: impl Into<String>) -> Error {
        Error::unsupported(self.target.name(), feature, self.path.to_string())
    }

    pub fn into_warnings(self) -> Vec<CoercionWarning> {
        self.warnings
    }

    fn fall_back(&mut self, ty: &LogicalType, err: Error) -> Result<T::Type> {
        let Some(fallback) = self.fallback.clone() else {
            return Err(err);
        };
        let reason = match &err {
            Error::UnsupportedFeature { feature, .. } => {
                format!("{} does not support {}", self.target.name(), feature)
            }
            other => other.to_string(),
        };
        self.warn(WarningCode::TypeFallback, reason, ty, &fallback);
        Ok(fallback)
    }
}

/// Options for one conversion
pub struct ConvertConfig<T: Target> {
    pub mode: Mode,

    /// Emit only these columns, in spec order
    pub include_columns: Option<Vec<String>>,

    /// Emit every column except these
    pub ignore_columns: Option<Vec<String>>,

    pub column_overrides: BTreeMap<String, ColumnOverride<T>>,

    /// Substitute for unsupported types in coerce mode
    pub fallback_type: Option<T::Type>,
}

impl<T: Target> Default for ConvertConfig<T> {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            include_columns: None,
            ignore_columns: None,
            column_overrides: BTreeMap::new(),
            fallback_type: None,
        }
    }
}

impl<T: Target> Clone for ConvertConfig<T> {
    fn clone(&self) -> Self {
        Self {
            mode: self.mode,
            include_columns: self.include_columns.clone(),
            ignore_columns: self.ignore_columns.clone(),
            column_overrides: self.column_overrides.clone(),
            fallback_type: self.fallback_type.clone(),
        }
    }
}

impl<T: Target> fmt::Debug for ConvertConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvertConfig")
            .field("mode", &self.mode)
            .field("include_columns", &self.include_columns)
            .field("ignore_columns", &self.ignore_columns)
            .field("column_overrides", &self.column_overrides.keys().collect::<Vec<_>>())
            .field("fallback_type", &self.fallback_type.as_ref().map(ToString::to_string))
            .finish()
    }
}

impl<T: Target> ConvertConfig<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn include_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn ignore_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn column_override<F>(mut self, column: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Column, &T) -> Result<T::Field> + Send + Sync + 'static,
    {
        self.column_overrides.insert(column.into(), Arc::new(f));
        self
    }

    pub fn fallback_type(mut self, ty: T::Type) -> Self {
        self.fallback_type = Some(ty);
        self
    }

    /// Columns to emit, in spec order
    ///
    /// Fails when both filters are set or when a filter or override names a
    /// column the spec does not have.
    pub fn select_columns<'s>(&self, spec: &'s Spec) -> Result<Vec<&'s Column>> {
        if self.include_columns.is_some() && self.ignore_columns.is_some() {
            return Err(Error::validation(
                "Cannot use 'include_columns' and 'ignore_columns' together.",
            )
            .with_suggestion("Pass only one of the two column filters"));
        }

        let names = self
            .include_columns
            .iter()
            .chain(self.ignore_columns.iter())
            .flatten()
            .chain(self.column_overrides.keys());
        for name in names {
            if spec.column(name).is_none() {
                return Err(Error::validation(format!(
                    "Column '{}' not found in spec '{}'.",
                    name,
                    spec.name()
                ))
                .with_suggestion(format!("Available columns: {}", spec.column_names().join(", "))));
            }
        }

        let selected = match (&self.include_columns, &self.ignore_columns) {
            (Some(include), _) => {
                let include: HashSet<&str> = include.iter().map(String::as_str).collect();
                spec.columns()
                    .iter()
                    .filter(|c| include.contains(c.name.as_str()))
                    .collect()
            }
            (None, Some(ignore)) => {
                let ignore: HashSet<&str> = ignore.iter().map(String::as_str).collect();
                spec.columns()
                    .iter()
                    .filter(|c| !ignore.contains(c.name.as_str()))
                    .collect()
            }
            (None, None) => spec.columns().iter().collect(),
        };
        Ok(selected)
    }
}

/// Successful conversion
#[derive(Debug, Clone)]
pub struct Converted<O> {
    pub target: O,

    /// Coercions applied, in traversal order
    pub warnings: Vec<CoercionWarning>,
}

/// Immutable target plus configuration
///
/// `convert` takes `&self`, so one converter can serve many threads.
pub struct Converter<T: Target> {
    target: T,
    config: ConvertConfig<T>,
}

impl<T: Target + fmt::Debug> fmt::Debug for Converter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("target", &self.target)
            .field("config", &self.config)
            .finish()
    }
}

impl<T: Target> Converter<T> {
    pub fn new(target: T, config: ConvertConfig<T>) -> Self {
        Self { target, config }
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn config(&self) -> &ConvertConfig<T> {
        &self.config
    }

    pub fn convert(&self, spec: &Spec) -> Result<Converted<T::Output>> {
        self.convert_with_mode(spec, self.config.mode)
    }

    /// Convert with a per-call mode in place of the configured one
    pub fn convert_with_mode(&self, spec: &Spec, mode: Mode) -> Result<Converted<T::Output>> {
        let columns = self.config.select_columns(spec)?;

        let fallback = self
            .config
            .fallback_type
            .clone()
            .or_else(|| self.target.default_fallback());
        if mode == Mode::Coerce && fallback.is_none() {
            return Err(Error::validation(format!(
                "Target '{}' requires a fallback type in coerce mode.",
                self.target.name()
            )));
        }

        tracing::debug!(
            "Converting spec '{}' to {} ({} of {} columns, mode={})",
            spec.name(),
            self.target.name(),
            columns.len(),
            spec.columns().len(),
            mode
        );

        let mut ctx = ConversionContext::new(&self.target, mode, fallback);
        let mut fields = Vec::with_capacity(columns.len());
        for column in &columns {
            let field = match self.config.column_overrides.get(&column.name) {
                Some(column_override) => column_override(column, &self.target)?,
                None => ctx.with_segment(&column.name, |ctx| {
                    let ty = ctx.convert(&column.data_type)?;
                    ctx.target().build_field(column, ty)
                })?,
            };
            fields.push(field);
        }

        let output = self.target.finish(spec, &columns, fields)?;
        Ok(Converted {
            target: output,
            warnings: ctx.into_warnings(),
        })
    }
}
