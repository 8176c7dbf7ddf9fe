//! Column and table constraints

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Target of a foreign key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyReference {
    /// Referenced table, possibly qualified
    pub table: String,

    /// Referenced columns; the referenced table's primary key when absent
    pub columns: Option<Vec<String>>,
}

impl ForeignKeyReference {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: None,
        }
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }
}

/// Identity generation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// `GENERATED ALWAYS` when true, `GENERATED BY DEFAULT` otherwise
    pub always: bool,
    pub start: Option<i64>,
    pub increment: Option<i64>,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            always: true,
            start: None,
            increment: None,
        }
    }
}

/// Constraint attached to a single column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnConstraint {
    NotNull,

    /// Column-level primary key; folded into a table constraint on build
    PrimaryKey,

    /// Literal default value
    Default { value: Value },

    Identity(Identity),

    /// Column-level foreign key; folded into a table constraint on build
    ForeignKey {
        name: Option<String>,
        references: ForeignKeyReference,
    },
}

/// Kind of a [`ColumnConstraint`], in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConstraintKind {
    NotNull,
    PrimaryKey,
    Default,
    Identity,
    ForeignKey,
}

impl ConstraintKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotNull => "not_null",
            Self::PrimaryKey => "primary_key",
            Self::Default => "default",
            Self::Identity => "identity",
            Self::ForeignKey => "foreign_key",
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ColumnConstraint {
    pub fn default_value(value: impl Into<Value>) -> Self {
        Self::Default {
            value: value.into(),
        }
    }

    pub fn foreign_key(references: ForeignKeyReference) -> Self {
        Self::ForeignKey {
            name: None,
            references,
        }
    }

    pub fn kind(&self) -> ConstraintKind {
        match self {
            Self::NotNull => ConstraintKind::NotNull,
            Self::PrimaryKey => ConstraintKind::PrimaryKey,
            Self::Default { .. } => ConstraintKind::Default,
            Self::Identity(_) => ConstraintKind::Identity,
            Self::ForeignKey { .. } => ConstraintKind::ForeignKey,
        }
    }
}

/// Constraint attached to the table as a whole
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TableConstraint {
    PrimaryKey {
        name: String,
        columns: Vec<String>,
    },
    ForeignKey {
        name: String,
        columns: Vec<String>,
        references: ForeignKeyReference,
    },
}

impl TableConstraint {
    pub fn primary_key<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::PrimaryKey {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn foreign_key<I, S>(
        name: impl Into<String>,
        columns: I,
        references: ForeignKeyReference,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::ForeignKey {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            references,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::PrimaryKey { name, .. } | Self::ForeignKey { name, .. } => name,
        }
    }

    /// Local columns covered by the constraint
    pub fn columns(&self) -> &[String] {
        match self {
            Self::PrimaryKey { columns, .. } | Self::ForeignKey { columns, .. } => columns,
        }
    }

    pub fn is_primary_key(&self) -> bool {
        matches!(self, Self::PrimaryKey { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_sort_canonically() {
        let mut kinds = vec![
            ConstraintKind::ForeignKey,
            ConstraintKind::NotNull,
            ConstraintKind::Identity,
            ConstraintKind::Default,
        ];
        kinds.sort();
        assert_eq!(
            kinds,
            vec![
                ConstraintKind::NotNull,
                ConstraintKind::Default,
                ConstraintKind::Identity,
                ConstraintKind::ForeignKey
            ]
        );
    }

    #[test]
    fn table_constraint_accessors() {
        let fk = TableConstraint::foreign_key(
            "fk_orders_customer",
            ["customer_id"],
            ForeignKeyReference::new("customers").with_columns(["id"]),
        );
        assert_eq!(fk.name(), "fk_orders_customer");
        assert_eq!(fk.columns().to_vec(), vec!["customer_id".to_string()]);
        assert!(!fk.is_primary_key());
    }

    #[test]
    fn identity_defaults_to_always() {
        assert!(Identity::default().always);
    }
}
