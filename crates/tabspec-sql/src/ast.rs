//! `CREATE TABLE` syntax tree
//!
//! A dialect-neutral tree that can hold everything a spec expresses. Dialect
//! rules rewrite it in place; the renderer turns it into text.

use std::fmt;

use tabspec_core::{Error, IntervalUnit, Result};

/// Possibly qualified object name such as `catalog.db.table`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectName {
    pub parts: Vec<String>,
}

impl ObjectName {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a dotted name into at most catalog, database and table,
    /// optionally dropping the catalog and database parts
    pub fn parse(name: &str, ignore_catalog: bool, ignore_database: bool) -> Result<Self> {
        let parts: Vec<&str> = name.split('.').collect();
        if parts.len() > 3 {
            return Err(Error::validation(format!(
                "Table name '{}' has {} parts; at most catalog.database.table is allowed.",
                name,
                parts.len()
            )));
        }
        if parts.iter().any(|part| part.is_empty()) {
            return Err(Error::validation(format!(
                "Table name '{}' has an empty part.",
                name
            )));
        }
        let count = parts.len();
        let kept = parts.into_iter().enumerate().filter(|(i, _)| match count - i {
            2 => !ignore_database,
            3 => !ignore_catalog,
            _ => true,
        });
        Ok(Self::new(kept.map(|(_, part)| part)))
    }

    /// Last part
    pub fn base(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or_default()
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parts.join("."))
    }
}

/// SQL column type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlType {
    Boolean,
    /// Integer of 8, 16, 32 or 64 bits
    Integer { bits: u16, signed: bool },
    /// Floating point of 32 or 64 bits
    Float { bits: u16 },
    Decimal { precision: Option<u32>, scale: Option<i32> },
    /// `VARCHAR(n)` when a length is set, the dialect's text type otherwise
    Text { length: Option<u32> },
    Binary { length: Option<u32> },
    Date,
    Time,
    Timestamp,
    TimestampTz,
    TimestampLtz,
    TimestampNtz,
    Interval { start: IntervalUnit, end: Option<IntervalUnit> },
    Array { element: Box<SqlType>, size: Option<u32> },
    Struct { fields: Vec<StructField> },
    Map { key: Box<SqlType>, value: Box<SqlType> },
    Json,
    Variant,
    Uuid,
    Void,
    Geometry { srid: Option<u32> },
    Geography { srid: Option<u32> },
}

impl SqlType {
    pub fn text() -> Self {
        Self::Text { length: None }
    }

    pub fn binary() -> Self {
        Self::Binary { length: None }
    }
}

/// Member of a `STRUCT` type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructField {
    pub name: String,
    pub data_type: SqlType,
}

/// Literal value
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    /// Numeric literal, kept as written
    Number(String),
    String(String),
}

impl Literal {
    /// Arrays and objects become their JSON text
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Boolean(*b),
            Value::Number(n) => Self::Number(n.to_string()),
            Value::String(s) => Self::String(s.clone()),
            other => Self::String(other.to_string()),
        }
    }
}

/// Expression used in partitioning and generated columns
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(String),
    Literal(Literal),
    /// `CAST(expr AS type)`; the type is kept as written
    Cast { expr: Box<Expr>, data_type: String },
    /// `DATE_TRUNC('unit', expr)`
    DateTrunc { unit: String, expr: Box<Expr> },
    /// `BUCKET(n, expr)`
    Bucket { count: Literal, expr: Box<Expr> },
    /// `TRUNCATE(width, expr)`
    Truncate { width: Literal, expr: Box<Expr> },
    Function { name: String, args: Vec<Expr> },
}

/// Identity generation clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityDef {
    pub always: bool,
    pub start: Option<i64>,
    pub increment: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: SqlType,
    /// `GENERATED ALWAYS AS (expr)`
    pub generated: Option<Expr>,
    pub not_null: bool,
    pub default: Option<Literal>,
    pub identity: Option<IdentityDef>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: SqlType) -> Self {
        Self {
            name: name.into(),
            data_type,
            generated: None,
            not_null: false,
            default: None,
            identity: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableConstraintDef {
    PrimaryKey {
        name: String,
        columns: Vec<String>,
    },
    ForeignKey {
        name: String,
        columns: Vec<String>,
        table: ObjectName,
        referred_columns: Vec<String>,
    },
}

/// Table-level clauses after the column list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Clause {
    External,
    FileFormat,
    PartitionBy,
    Location,
    Properties,
}

impl Clause {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::External => "EXTERNAL",
            Self::FileFormat => "file format",
            Self::PartitionBy => "PARTITIONED BY",
            Self::Location => "LOCATION",
            Self::Properties => "TBLPROPERTIES",
        }
    }
}

/// `CREATE TABLE` statement
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub name: ObjectName,
    pub or_replace: bool,
    pub if_not_exists: bool,
    pub external: bool,
    pub columns: Vec<ColumnDef>,
    pub constraints: Vec<TableConstraintDef>,
    pub partition_by: Vec<Expr>,
    pub file_format: Option<String>,
    pub location: Option<String>,
    /// `TBLPROPERTIES`, in key order
    pub properties: Vec<(String, String)>,
}

impl CreateTable {
    pub fn new(name: ObjectName) -> Self {
        Self {
            name,
            or_replace: false,
            if_not_exists: false,
            external: false,
            columns: Vec::new(),
            constraints: Vec::new(),
            partition_by: Vec::new(),
            file_format: None,
            location: None,
            properties: Vec::new(),
        }
    }

    pub fn has_clause(&self, clause: Clause) -> bool {
        match clause {
            Clause::External => self.external,
            Clause::FileFormat => self.file_format.is_some(),
            Clause::PartitionBy => !self.partition_by.is_empty(),
            Clause::Location => self.location.is_some(),
            Clause::Properties => !self.properties.is_empty(),
        }
    }

    pub fn remove_clause(&mut self, clause: Clause) {
        match clause {
            Clause::External => self.external = false,
            Clause::FileFormat => self.file_format = None,
            Clause::PartitionBy => self.partition_by.clear(),
            Clause::Location => self.location = None,
            Clause::Properties => self.properties.clear(),
        }
    }
}
