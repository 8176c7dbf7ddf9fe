//! Canonical table spec
//!
//! A [`Spec`] is built once through [`SpecBuilder`] and never mutated
//! afterwards. Building validates every column, folds column-level primary
//! and foreign keys into table constraints, and fails before any spec is
//! returned when the draft is inconsistent.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};

use crate::constraint::{ColumnConstraint, ConstraintKind, TableConstraint};
use crate::error::{Error, Result};
use crate::types::LogicalType;

/// Free-form metadata, carried through conversions without interpretation
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Version of the spec text format produced by this crate
pub const SPEC_FORMAT_VERSION: &str = "0.0.2";

/// Dotted identifier such as `catalog.db.table`
static QUALIFIED_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^.\s]+(\.[^.\s]+)*$").unwrap());

/// Column whose value is computed from another column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedColumn {
    /// Column the value is derived from
    pub source_column: String,
    pub transform: Option<String>,
    #[serde(default)]
    pub transform_args: Vec<serde_json::Value>,
}

impl GeneratedColumn {
    pub fn new(source_column: impl Into<String>) -> Self {
        Self {
            source_column: source_column.into(),
            transform: None,
            transform_args: Vec::new(),
        }
    }

    pub fn with_transform(
        mut self,
        transform: impl Into<String>,
        args: Vec<serde_json::Value>,
    ) -> Self {
        self.transform = Some(transform.into());
        self.transform_args = args;
        self
    }
}

/// Column definition
///
/// Also used for struct members, which may only carry `NotNull` and
/// `Default` constraints and no generation clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name, unique within its enclosing scope
    pub name: String,

    /// Logical type
    pub data_type: LogicalType,

    pub description: Option<String>,

    /// At most one constraint per kind, in canonical kind order
    pub constraints: Vec<ColumnConstraint>,

    pub generated_as: Option<GeneratedColumn>,

    pub metadata: Metadata,
}

impl Column {
    /// Create a new unconstrained column
    pub fn new(name: impl Into<String>, data_type: LogicalType) -> Self {
        Self {
            name: name.into(),
            data_type,
            description: None,
            constraints: Vec::new(),
            generated_as: None,
            metadata: Metadata::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_constraint(mut self, constraint: ColumnConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Shorthand for adding [`ColumnConstraint::NotNull`]
    pub fn not_null(self) -> Self {
        self.with_constraint(ColumnConstraint::NotNull)
    }

    pub fn with_generated_as(mut self, generated: GeneratedColumn) -> Self {
        self.generated_as = Some(generated);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn is_nullable(&self) -> bool {
        !self.has_constraint(ConstraintKind::NotNull)
    }

    pub fn has_constraint(&self, kind: ConstraintKind) -> bool {
        self.constraints.iter().any(|c| c.kind() == kind)
    }

    /// The column's default literal, if any
    pub fn default_value(&self) -> Option<&serde_json::Value> {
        self.constraints.iter().find_map(|c| match c {
            ColumnConstraint::Default { value } => Some(value),
            _ => None,
        })
    }

    pub fn identity(&self) -> Option<&crate::constraint::Identity> {
        self.constraints.iter().find_map(|c| match c {
            ColumnConstraint::Identity(identity) => Some(identity),
            _ => None,
        })
    }
}

/// Physical storage settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storage {
    pub format: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

/// One partitioning expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionColumn {
    pub column: String,
    pub transform: Option<String>,
    #[serde(default)]
    pub transform_args: Vec<serde_json::Value>,
}

impl PartitionColumn {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            transform: None,
            transform_args: Vec::new(),
        }
    }

    pub fn with_transform(
        mut self,
        transform: impl Into<String>,
        args: Vec<serde_json::Value>,
    ) -> Self {
        self.transform = Some(transform.into());
        self.transform_args = args;
        self
    }
}

/// Immutable canonical table spec
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Spec {
    name: String,
    version: u32,
    spec_format_version: String,
    description: Option<String>,
    external: bool,
    columns: Vec<Column>,
    table_constraints: Vec<TableConstraint>,
    storage: Option<Storage>,
    partitioned_by: Vec<PartitionColumn>,
    metadata: Metadata,
}

impl Spec {
    /// Start a draft for table `name`
    pub fn builder(name: impl Into<String>) -> SpecBuilder {
        SpecBuilder::new(name)
    }

    /// Qualified table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last segment of the qualified name
    pub fn table_name(&self) -> &str {
        table_segment(&self.name)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn spec_format_version(&self) -> &str {
        &self.spec_format_version
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_external(&self) -> bool {
        self.external
    }

    /// Columns in physical order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Find a top-level column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn table_constraints(&self) -> &[TableConstraint] {
        &self.table_constraints
    }

    /// The table's primary key, if declared
    pub fn primary_key(&self) -> Option<&TableConstraint> {
        self.table_constraints.iter().find(|c| c.is_primary_key())
    }

    /// Whether `column` belongs to the primary key
    pub fn is_primary_key_column(&self, column: &str) -> bool {
        self.primary_key()
            .map(|pk| pk.columns().iter().any(|c| c == column))
            .unwrap_or(false)
    }

    pub fn storage(&self) -> Option<&Storage> {
        self.storage.as_ref()
    }

    pub fn partitioned_by(&self) -> &[PartitionColumn] {
        &self.partitioned_by
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// SHA-256 over the canonical JSON serialization
    ///
    /// Equal specs always share a fingerprint.
    pub fn fingerprint(&self) -> Result<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|e| Error::validation(format!("Failed to serialize spec '{}': {}", self.name, e)))?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}

/// Mutable draft of a [`Spec`]
#[derive(Debug, Clone)]
pub struct SpecBuilder {
    name: String,
    version: u32,
    spec_format_version: String,
    description: Option<String>,
    external: bool,
    columns: Vec<Column>,
    table_constraints: Vec<TableConstraint>,
    storage: Option<Storage>,
    partitioned_by: Vec<PartitionColumn>,
    metadata: Metadata,
}

impl SpecBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: 1,
            spec_format_version: SPEC_FORMAT_VERSION.to_string(),
            description: None,
            external: false,
            columns: Vec::new(),
            table_constraints: Vec::new(),
            storage: None,
            partitioned_by: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn spec_format_version(mut self, version: impl Into<String>) -> Self {
        self.spec_format_version = version.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn external(mut self, external: bool) -> Self {
        self.external = external;
        self
    }

    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn columns(mut self, columns: impl IntoIterator<Item = Column>) -> Self {
        self.columns.extend(columns);
        self
    }

    pub fn table_constraint(mut self, constraint: TableConstraint) -> Self {
        self.table_constraints.push(constraint);
        self
    }

    pub fn storage(mut self, storage: Storage) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn partition(mut self, partition: PartitionColumn) -> Self {
        self.partitioned_by.push(partition);
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn metadata_map(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Validate and normalize the draft
    pub fn build(self) -> Result<Spec> {
        normalize(self)
    }
}

/// Validate a draft and fold column-level keys into table constraints
///
/// A column `primary_key` becomes `pk_<table>` and a column `foreign_key`
/// becomes `fk_<table>_<column>` unless it is named. Declaring a primary key
/// both on a column and on the table is a [`Error::ConflictingConstraint`].
pub fn normalize(draft: SpecBuilder) -> Result<Spec> {
    let SpecBuilder {
        name,
        version,
        spec_format_version,
        description,
        external,
        mut columns,
        mut table_constraints,
        storage,
        partitioned_by,
        metadata,
    } = draft;

    if !QUALIFIED_NAME.is_match(&name) {
        return Err(Error::validation(format!(
            "Invalid table name '{}'. Expected a dotted identifier such as 'db.table'.",
            name
        )));
    }
    if version == 0 {
        return Err(Error::validation(format!(
            "Spec '{}' version must be a positive integer.",
            name
        )));
    }
    if columns.is_empty() {
        return Err(Error::validation(format!("Spec '{}' has no columns.", name)));
    }

    validate_columns(&columns, &name, true)?;

    let table = table_segment(&name).to_string();
    let explicit_pks = table_constraints.iter().filter(|c| c.is_primary_key()).count();
    if explicit_pks > 1 {
        return Err(Error::conflicting_constraint(format!(
            "Spec '{}' declares {} table-level primary keys.",
            name, explicit_pks
        )));
    }

    let mut folded = Vec::new();
    for column in &mut columns {
        let mut kept = Vec::with_capacity(column.constraints.len());
        for constraint in column.constraints.drain(..) {
            match constraint {
                ColumnConstraint::PrimaryKey => {
                    folded.push(TableConstraint::primary_key(
                        format!("pk_{}", table),
                        [column.name.clone()],
                    ));
                }
                ColumnConstraint::ForeignKey { name: fk_name, references } => {
                    let fk_name = fk_name.unwrap_or_else(|| format!("fk_{}_{}", table, column.name));
                    folded.push(TableConstraint::foreign_key(
                        fk_name,
                        [column.name.clone()],
                        references,
                    ));
                }
                other => kept.push(other),
            }
        }
        kept.sort_by_key(|c| c.kind());
        column.constraints = kept;
    }

    let folded_pks = folded.iter().filter(|c| c.is_primary_key()).count();
    if folded_pks > 0 && explicit_pks > 0 {
        return Err(Error::conflicting_constraint(format!(
            "Spec '{}' declares a primary key on a column and on the table.",
            name
        ))
        .with_suggestion("Declare the primary key in table_constraints only"));
    }
    if folded_pks > 1 {
        return Err(Error::conflicting_constraint(format!(
            "Spec '{}' declares primary_key on {} columns.",
            name, folded_pks
        ))
        .with_suggestion("Use a table-level primary key for composite keys"));
    }
    table_constraints.extend(folded);

    validate_table_constraints(&table_constraints, &columns, &name)?;
    validate_partitions(&partitioned_by, &columns, &name)?;

    tracing::debug!(
        spec = %name,
        columns = columns.len(),
        constraints = table_constraints.len(),
        "built spec"
    );

    Ok(Spec {
        name,
        version,
        spec_format_version,
        description,
        external,
        columns,
        table_constraints,
        storage,
        partitioned_by,
        metadata,
    })
}

fn table_segment(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

fn validate_columns(columns: &[Column], scope: &str, top_level: bool) -> Result<()> {
    let mut seen = HashSet::new();
    for column in columns {
        if column.name.trim().is_empty() {
            return Err(Error::validation(format!(
                "Column in '{}' has an empty name.",
                scope
            )));
        }
        if !seen.insert(column.name.as_str()) {
            return Err(Error::validation(format!(
                "Duplicate column name '{}' in '{}'.",
                column.name, scope
            )));
        }
        column.data_type.validate()?;

        let mut kinds = HashSet::new();
        for constraint in &column.constraints {
            let kind = constraint.kind();
            if !kinds.insert(kind) {
                return Err(Error::validation(format!(
                    "Column '{}' declares the '{}' constraint more than once.",
                    column.name, kind
                )));
            }
            if !top_level && !matches!(kind, ConstraintKind::NotNull | ConstraintKind::Default) {
                return Err(Error::validation(format!(
                    "Struct field '{}' in '{}' cannot declare the '{}' constraint.",
                    column.name, scope, kind
                )));
            }
        }
        if let Some(generated) = &column.generated_as {
            if !top_level {
                return Err(Error::validation(format!(
                    "Struct field '{}' in '{}' cannot be a generated column.",
                    column.name, scope
                )));
            }
            if generated.source_column == column.name {
                return Err(Error::validation(format!(
                    "Generated column '{}' cannot reference itself.",
                    column.name
                )));
            }
            if !columns.iter().any(|c| c.name == generated.source_column) {
                return Err(Error::validation(format!(
                    "Source column '{}' for generated column '{}' not found in schema.",
                    generated.source_column, column.name
                )));
            }
        }

        validate_nested(&column.data_type, &format!("{}.{}", scope, column.name))?;
    }
    Ok(())
}

/// Struct members are checked wherever they appear, including inside
/// array elements, map keys and values, and tensor elements.
fn validate_nested(data_type: &LogicalType, scope: &str) -> Result<()> {
    match data_type {
        LogicalType::Struct { fields } => validate_columns(fields, scope, false),
        LogicalType::Array { element, .. } | LogicalType::Tensor { element, .. } => {
            validate_nested(element, &format!("{}[]", scope))
        }
        LogicalType::Map { key, value, .. } => {
            validate_nested(key, &format!("{}.key", scope))?;
            validate_nested(value, &format!("{}.value", scope))
        }
        _ => Ok(()),
    }
}

fn validate_table_constraints(
    constraints: &[TableConstraint],
    columns: &[Column],
    spec: &str,
) -> Result<()> {
    let mut names = HashSet::new();
    for constraint in constraints {
        if !names.insert(constraint.name()) {
            return Err(Error::conflicting_constraint(format!(
                "Duplicate table constraint name '{}' in '{}'.",
                constraint.name(),
                spec
            )));
        }
        if constraint.columns().is_empty() {
            return Err(Error::validation(format!(
                "Table constraint '{}' has no columns.",
                constraint.name()
            )));
        }
        for column in constraint.columns() {
            if !columns.iter().any(|c| &c.name == column) {
                return Err(Error::validation(format!(
                    "Table constraint '{}' references undefined column '{}'.",
                    constraint.name(),
                    column
                )));
            }
        }
        if let TableConstraint::ForeignKey {
            name,
            columns: local,
            references,
        } = constraint
        {
            if references.table.trim().is_empty() {
                return Err(Error::validation(format!(
                    "Foreign key '{}' has no referenced table.",
                    name
                )));
            }
            if let Some(remote) = &references.columns {
                if remote.len() != local.len() {
                    return Err(Error::validation(format!(
                        "Foreign key '{}' maps {} column(s) to {} referenced column(s).",
                        name,
                        local.len(),
                        remote.len()
                    )));
                }
            }
        }
    }
    Ok(())
}

fn validate_partitions(partitions: &[PartitionColumn], columns: &[Column], spec: &str) -> Result<()> {
    for partition in partitions {
        if !columns.iter().any(|c| c.name == partition.column) {
            return Err(Error::validation(format!(
                "Partition column '{}' must be defined as a column in '{}'.",
                partition.column, spec
            )));
        }
    }
    Ok(())
}
