//! Legalization rules
//!
//! A rule finds nodes of a [`CreateTable`] the target dialect cannot express
//! and rewrites each one into something it can. Rules only ever see the tree;
//! mode handling and warnings live with the dialect that runs them.

use std::fmt;

use tabspec_core::WarningCode;

use crate::ast::{Clause, ColumnDef, CreateTable, SqlType};

/// One step from a type into a nested type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeStep {
    Element,
    Field(usize),
    Key,
    Value,
}

/// Location of an offending node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRef {
    /// Type of column `column`, or a type nested inside it
    Type { column: usize, steps: Vec<TypeStep> },
    Column(usize),
    Clause(Clause),
}

/// A node a rule wants to rewrite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub node: NodeRef,

    /// Dot-joined column and struct member names; empty for table clauses
    pub field_path: String,

    /// What the dialect lacks, used in warnings and strict-mode errors
    pub feature: String,

    /// The offending node as written
    pub source: String,
}

/// Outcome of rewriting one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Legalized {
    pub code: WarningCode,

    /// How the node was changed, e.g. `replaced with TEXT`
    pub action: String,

    /// The node after the rewrite
    pub result: String,
}

/// A legalization rule
///
/// `legalize` re-checks the node it is handed and returns `None` when an
/// earlier rewrite already removed or fixed it.
pub trait Rule: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn detect(&self, table: &CreateTable) -> Vec<Violation>;

    fn legalize(&self, table: &mut CreateTable, violation: &Violation) -> Option<Legalized>;
}

type Rewrite = Box<dyn Fn(&SqlType) -> Option<SqlType> + Send + Sync>;

/// Rewrites every type, at any depth, for which `rewrite` returns a replacement
pub struct TypeRule {
    name: String,
    feature: String,
    rewrite: Rewrite,
}

impl fmt::Debug for TypeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRule")
            .field("name", &self.name)
            .field("feature", &self.feature)
            .finish()
    }
}

impl TypeRule {
    pub fn new<F>(name: impl Into<String>, feature: impl Into<String>, rewrite: F) -> Self
    where
        F: Fn(&SqlType) -> Option<SqlType> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            feature: feature.into(),
            rewrite: Box::new(rewrite),
        }
    }

    /// Replace every type accepted by `matches` with `replacement`
    pub fn replace(label: &str, matches: fn(&SqlType) -> bool, replacement: SqlType) -> Self {
        Self::new(format!("replace-{}", label), label, move |ty| {
            matches(ty).then(|| replacement.clone())
        })
    }

    /// Unsigned integers become the next wider signed type; 64-bit values
    /// become `DECIMAL(20, 0)`
    pub fn widen_unsigned() -> Self {
        Self::new("widen-unsigned-integers", "unsigned integers", |ty| match ty {
            SqlType::Integer { bits, signed: false } => Some(match bits {
                8 => SqlType::Integer { bits: 16, signed: true },
                16 => SqlType::Integer { bits: 32, signed: true },
                32 => SqlType::Integer { bits: 64, signed: true },
                _ => SqlType::Decimal {
                    precision: Some(20),
                    scale: Some(0),
                },
            }),
            _ => None,
        })
    }

    pub fn strip_string_length() -> Self {
        Self::new("strip-string-length", "string length", |ty| match ty {
            SqlType::Text { length: Some(_) } => Some(SqlType::text()),
            _ => None,
        })
    }

    pub fn strip_binary_length() -> Self {
        Self::new("strip-binary-length", "binary length", |ty| match ty {
            SqlType::Binary { length: Some(_) } => Some(SqlType::binary()),
            _ => None,
        })
    }

    pub fn strip_array_size() -> Self {
        Self::new("strip-array-size", "fixed-size arrays", |ty| match ty {
            SqlType::Array {
                element,
                size: Some(_),
            } => Some(SqlType::Array {
                element: element.clone(),
                size: None,
            }),
            _ => None,
        })
    }

    pub fn strip_geometry_parameters() -> Self {
        Self::new("strip-geometry-parameters", "spatial reference ids", |ty| match ty {
            SqlType::Geometry { srid: Some(_) } => Some(SqlType::Geometry { srid: None }),
            SqlType::Geography { srid: Some(_) } => Some(SqlType::Geography { srid: None }),
            _ => None,
        })
    }

    fn visit(
        &self,
        ty: &SqlType,
        column: usize,
        steps: &mut Vec<TypeStep>,
        path: &mut Vec<String>,
        found: &mut Vec<Violation>,
    ) {
        if let Some(replacement) = (self.rewrite)(ty) {
            if replacement != *ty {
                found.push(Violation {
                    node: NodeRef::Type {
                        column,
                        steps: steps.clone(),
                    },
                    field_path: path.join("."),
                    feature: self.feature.clone(),
                    source: ty.to_string(),
                });
            }
        }

        match ty {
            SqlType::Array { element, .. } => {
                steps.push(TypeStep::Element);
                self.visit(element, column, steps, path, found);
                steps.pop();
            }
            SqlType::Struct { fields } => {
                for (i, field) in fields.iter().enumerate() {
                    steps.push(TypeStep::Field(i));
                    path.push(field.name.clone());
                    self.visit(&field.data_type, column, steps, path, found);
                    path.pop();
                    steps.pop();
                }
            }
            SqlType::Map { key, value } => {
                steps.push(TypeStep::Key);
                self.visit(key, column, steps, path, found);
                steps.pop();
                steps.push(TypeStep::Value);
                self.visit(value, column, steps, path, found);
                steps.pop();
            }
            _ => {}
        }
    }
}

fn type_at<'t>(columns: &'t mut [ColumnDef], column: usize, steps: &[TypeStep]) -> Option<&'t mut SqlType> {
    let mut ty = &mut columns.get_mut(column)?.data_type;
    for step in steps {
        ty = match (step, ty) {
            (TypeStep::Element, SqlType::Array { element, .. }) => element.as_mut(),
            (TypeStep::Field(i), SqlType::Struct { fields }) => &mut fields.get_mut(*i)?.data_type,
            (TypeStep::Key, SqlType::Map { key, .. }) => key.as_mut(),
            (TypeStep::Value, SqlType::Map { value, .. }) => value.as_mut(),
            _ => return None,
        };
    }
    Some(ty)
}

impl Rule for TypeRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn detect(&self, table: &CreateTable) -> Vec<Violation> {
        let mut found = Vec::new();
        for (i, column) in table.columns.iter().enumerate() {
            let mut path = vec![column.name.clone()];
            self.visit(&column.data_type, i, &mut Vec::new(), &mut path, &mut found);
        }
        found
    }

    fn legalize(&self, table: &mut CreateTable, violation: &Violation) -> Option<Legalized> {
        let NodeRef::Type { column, steps } = &violation.node else {
            return None;
        };
        let ty = type_at(&mut table.columns, *column, steps)?;
        let replacement = (self.rewrite)(ty).filter(|r| *r != *ty)?;
        let result = replacement.to_string();
        *ty = replacement;
        Some(Legalized {
            code: WarningCode::DialectLegalized,
            action: format!("replaced with {}", result),
            result,
        })
    }
}

/// Drops identity clauses
#[derive(Debug, Clone, Copy, Default)]
pub struct DropIdentity;

impl Rule for DropIdentity {
    fn name(&self) -> &str {
        "drop-identity"
    }

    fn detect(&self, table: &CreateTable) -> Vec<Violation> {
        table
            .columns
            .iter()
            .enumerate()
            .filter(|(_, column)| column.identity.is_some())
            .map(|(i, column)| Violation {
                node: NodeRef::Column(i),
                field_path: column.name.clone(),
                feature: "identity columns".to_string(),
                source: "IDENTITY".to_string(),
            })
            .collect()
    }

    fn legalize(&self, table: &mut CreateTable, violation: &Violation) -> Option<Legalized> {
        let NodeRef::Column(i) = violation.node else {
            return None;
        };
        table.columns.get_mut(i)?.identity.take()?;
        Some(Legalized {
            code: WarningCode::FeatureDropped,
            action: "dropped".to_string(),
            result: "(dropped)".to_string(),
        })
    }
}

/// Drops table-level clauses
#[derive(Debug, Clone)]
pub struct DropTableClause {
    pub clauses: Vec<Clause>,
}

impl DropTableClause {
    pub fn new(clauses: impl IntoIterator<Item = Clause>) -> Self {
        Self {
            clauses: clauses.into_iter().collect(),
        }
    }
}

impl Rule for DropTableClause {
    fn name(&self) -> &str {
        "drop-table-clause"
    }

    fn detect(&self, table: &CreateTable) -> Vec<Violation> {
        self.clauses
            .iter()
            .filter(|clause| table.has_clause(**clause))
            .map(|clause| Violation {
                node: NodeRef::Clause(*clause),
                field_path: String::new(),
                feature: format!("the {} clause", clause.keyword()),
                source: clause.keyword().to_string(),
            })
            .collect()
    }

    fn legalize(&self, table: &mut CreateTable, violation: &Violation) -> Option<Legalized> {
        let NodeRef::Clause(clause) = violation.node else {
            return None;
        };
        if !table.has_clause(clause) {
            return None;
        }
        table.remove_clause(clause);
        Some(Legalized {
            code: WarningCode::FeatureDropped,
            action: "dropped".to_string(),
            result: "(dropped)".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{IdentityDef, ObjectName, StructField};
    use pretty_assertions::assert_eq;

    fn table_with(data_type: SqlType) -> CreateTable {
        let mut table = CreateTable::new(ObjectName::new(["t"]));
        table.columns.push(ColumnDef::new("c", data_type));
        table
    }

    fn apply(rule: &dyn Rule, table: &mut CreateTable) -> Vec<Legalized> {
        rule.detect(table)
            .iter()
            .filter_map(|violation| rule.legalize(table, violation))
            .collect()
    }

    #[test]
    fn nested_types_report_member_paths() {
        let table = table_with(SqlType::Struct {
            fields: vec![StructField {
                name: "inner".into(),
                data_type: SqlType::Integer { bits: 32, signed: false },
            }],
        });
        let violations = TypeRule::widen_unsigned().detect(&table);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field_path, "c.inner");
        assert_eq!(
            violations[0].node,
            NodeRef::Type {
                column: 0,
                steps: vec![TypeStep::Field(0)]
            }
        );
    }

    #[test]
    fn replaced_parent_skips_stale_children() {
        let mut table = table_with(SqlType::Struct {
            fields: vec![StructField {
                name: "v".into(),
                data_type: SqlType::Variant,
            }],
        });
        let rule = TypeRule::new("json-everything", "nested types", |ty| match ty {
            SqlType::Struct { .. } | SqlType::Variant => Some(SqlType::Json),
            _ => None,
        });

        let applied = apply(&rule, &mut table);
        assert_eq!(applied.len(), 1);
        assert_eq!(table.columns[0].data_type, SqlType::Json);
    }

    #[test]
    fn second_pass_finds_nothing() {
        let mut table = table_with(SqlType::Array {
            element: Box::new(SqlType::Text { length: Some(10) }),
            size: Some(4),
        });
        for rule in [TypeRule::strip_array_size(), TypeRule::strip_string_length()] {
            assert_eq!(apply(&rule, &mut table).len(), 1);
            assert!(rule.detect(&table).is_empty());
        }
        assert_eq!(
            table.columns[0].data_type,
            SqlType::Array {
                element: Box::new(SqlType::text()),
                size: None
            }
        );
    }

    #[test]
    fn identity_and_clauses_dropped() {
        let mut table = table_with(SqlType::Integer { bits: 64, signed: true });
        table.columns[0].identity = Some(IdentityDef {
            always: true,
            start: None,
            increment: None,
        });
        table.location = Some("/tmp/t".into());

        let identity = apply(&DropIdentity, &mut table);
        assert_eq!(identity[0].code, WarningCode::FeatureDropped);
        assert!(table.columns[0].identity.is_none());

        let clauses = DropTableClause::new([Clause::Location, Clause::Properties]);
        assert_eq!(clauses.detect(&table).len(), 1);
        apply(&clauses, &mut table);
        assert!(table.location.is_none());
        assert!(clauses.detect(&table).is_empty());
    }
}
