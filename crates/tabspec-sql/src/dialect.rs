//! SQL dialects
//!
//! A dialect is a fixed pairing of a [`Grammar`] and an ordered rule list.
//! Rules in one list never produce a type another rule in the same list
//! matches, so running a list over already legalized output changes nothing.

use std::fmt;

use tabspec_core::{CoercionWarning, Error, Mode, Result};

use crate::ast::{Clause, CreateTable, SqlType};
use crate::render::{ArrayStyle, FileFormatStyle, Grammar, NestedStyle};
use crate::rules::{DropIdentity, DropTableClause, Rule, TypeRule};

const ALL_CLAUSES: [Clause; 5] = [
    Clause::External,
    Clause::FileFormat,
    Clause::PartitionBy,
    Clause::Location,
    Clause::Properties,
];

/// Named `(grammar, rules)` pair
pub struct Dialect {
    name: &'static str,
    grammar: Grammar,
    rules: Vec<Box<dyn Rule>>,
}

impl fmt::Debug for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dialect")
            .field("name", &self.name)
            .field("rules", &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl Dialect {
    /// Every dialect name accepted by [`Dialect::by_name`]
    pub fn names() -> &'static [&'static str] {
        &["generic", "spark", "duckdb", "postgres"]
    }

    /// Look up a dialect by name (case-insensitive)
    pub fn by_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "generic" => Ok(Self::generic()),
            "spark" | "databricks" => Ok(Self::spark()),
            "duckdb" => Ok(Self::duckdb()),
            "postgres" | "postgresql" => Ok(Self::postgres()),
            _ => Err(Error::validation(format!("Unknown SQL dialect '{}'.", name))
                .with_suggestion(format!("Available dialects: {}", Self::names().join(", ")))),
        }
    }

    /// Every construct the tree can hold except unsigned integers and
    /// fixed-size arrays
    pub fn generic() -> Self {
        Self {
            name: "generic",
            grammar: Grammar::generic(),
            rules: vec![
                Box::new(TypeRule::widen_unsigned()),
                Box::new(TypeRule::strip_array_size()),
            ],
        }
    }

    pub fn spark() -> Self {
        let grammar = Grammar {
            quote: '`',
            text: "STRING",
            timestamp_ltz: "TIMESTAMP_LTZ",
            timestamp_ntz: "TIMESTAMP_NTZ",
            nested: NestedStyle::AngleColon,
            file_format: FileFormatStyle::Using,
            ..Grammar::generic()
        };
        Self {
            name: "spark",
            grammar,
            rules: vec![
                Box::new(TypeRule::strip_string_length()),
                Box::new(TypeRule::widen_unsigned()),
                Box::new(TypeRule::strip_binary_length()),
                Box::new(TypeRule::strip_array_size()),
                Box::new(TypeRule::replace(
                    "uuid",
                    |ty| matches!(ty, SqlType::Uuid),
                    SqlType::text(),
                )),
                Box::new(TypeRule::replace(
                    "json",
                    |ty| matches!(ty, SqlType::Json),
                    SqlType::text(),
                )),
                Box::new(TypeRule::replace(
                    "time",
                    |ty| matches!(ty, SqlType::Time),
                    SqlType::text(),
                )),
                Box::new(TypeRule::replace(
                    "timestamptz",
                    |ty| matches!(ty, SqlType::TimestampTz),
                    SqlType::TimestampLtz,
                )),
                Box::new(TypeRule::replace(
                    "spatial",
                    |ty| matches!(ty, SqlType::Geometry { .. } | SqlType::Geography { .. }),
                    SqlType::binary(),
                )),
            ],
        }
    }

    pub fn duckdb() -> Self {
        let grammar = Grammar {
            int32: "INTEGER",
            text: "VARCHAR",
            binary: "BLOB",
            timestamp_tz: "TIMESTAMPTZ",
            interval_fields: false,
            nested: NestedStyle::Paren,
            array: ArrayStyle::Suffix,
            ..Grammar::generic()
        };
        Self {
            name: "duckdb",
            grammar,
            rules: vec![
                Box::new(TypeRule::replace(
                    "variant",
                    |ty| matches!(ty, SqlType::Variant),
                    SqlType::Json,
                )),
                Box::new(TypeRule::replace(
                    "void",
                    |ty| matches!(ty, SqlType::Void),
                    SqlType::text(),
                )),
                Box::new(TypeRule::replace(
                    "timestampltz",
                    |ty| matches!(ty, SqlType::TimestampLtz),
                    SqlType::TimestampTz,
                )),
                Box::new(TypeRule::replace(
                    "timestampntz",
                    |ty| matches!(ty, SqlType::TimestampNtz),
                    SqlType::Timestamp,
                )),
                Box::new(TypeRule::replace(
                    "geography",
                    |ty| matches!(ty, SqlType::Geography { .. }),
                    SqlType::binary(),
                )),
                Box::new(TypeRule::strip_binary_length()),
                Box::new(TypeRule::strip_geometry_parameters()),
                Box::new(DropIdentity),
                Box::new(DropTableClause::new(ALL_CLAUSES)),
            ],
        }
    }

    pub fn postgres() -> Self {
        let grammar = Grammar {
            int32: "INTEGER",
            float32: "REAL",
            float64: "DOUBLE PRECISION",
            binary: "BYTEA",
            json: "JSONB",
            generated_suffix: Some("STORED"),
            array: ArrayStyle::Suffix,
            ..Grammar::generic()
        };
        Self {
            name: "postgres",
            grammar,
            rules: vec![
                Box::new(TypeRule::replace(
                    "nested",
                    |ty| matches!(ty, SqlType::Struct { .. } | SqlType::Map { .. } | SqlType::Variant),
                    SqlType::Json,
                )),
                Box::new(TypeRule::replace(
                    "void",
                    |ty| matches!(ty, SqlType::Void),
                    SqlType::text(),
                )),
                Box::new(TypeRule::replace(
                    "tinyint",
                    |ty| matches!(ty, SqlType::Integer { bits: 8, signed: true }),
                    SqlType::Integer { bits: 16, signed: true },
                )),
                Box::new(TypeRule::replace(
                    "timestampltz",
                    |ty| matches!(ty, SqlType::TimestampLtz),
                    SqlType::TimestampTz,
                )),
                Box::new(TypeRule::replace(
                    "timestampntz",
                    |ty| matches!(ty, SqlType::TimestampNtz),
                    SqlType::Timestamp,
                )),
                Box::new(TypeRule::widen_unsigned()),
                Box::new(TypeRule::strip_binary_length()),
                Box::new(TypeRule::strip_geometry_parameters()),
                Box::new(DropTableClause::new(ALL_CLAUSES)),
            ],
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn rules(&self) -> &[Box<dyn Rule>] {
        &self.rules
    }

    /// Run every rule, in order, over `table`
    ///
    /// Strict mode fails on the first violation with
    /// [`Error::UnsupportedFeature`]; coerce mode rewrites the node and
    /// records one warning per rewrite.
    pub fn legalize(&self, table: &mut CreateTable, mode: Mode) -> Result<Vec<CoercionWarning>> {
        let mut warnings = Vec::new();
        for rule in &self.rules {
            let violations = rule.detect(table);
            if violations.is_empty() {
                continue;
            }
            tracing::debug!(
                "Rule {} found {} violation(s) for dialect {}",
                rule.name(),
                violations.len(),
                self.name
            );

            for violation in violations {
                if mode == Mode::Strict {
                    return Err(Error::unsupported(
                        self.name,
                        violation.feature.as_str(),
                        violation.field_path.as_str(),
                    ));
                }
                let Some(legalized) = rule.legalize(table, &violation) else {
                    continue;
                };
                let warning = CoercionWarning::new(
                    legalized.code,
                    violation.field_path.as_str(),
                    format!(
                        "{} does not support {}; {}",
                        self.name, violation.feature, legalized.action
                    ),
                    violation.source.as_str(),
                    legalized.result.as_str(),
                );
                tracing::warn!(dialect = self.name, "{}", warning);
                warnings.push(warning);
            }
        }
        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ColumnDef, ObjectName, StructField};
    use pretty_assertions::assert_eq;
    use tabspec_core::WarningCode;

    fn wide_table() -> CreateTable {
        let mut table = CreateTable::new(ObjectName::new(["t"]));
        table.columns.push(ColumnDef::new("flags", SqlType::Integer { bits: 64, signed: false }));
        table.columns.push(ColumnDef::new(
            "addr",
            SqlType::Struct {
                fields: vec![StructField {
                    name: "doc".into(),
                    data_type: SqlType::Variant,
                }],
            },
        ));
        table.columns.push(ColumnDef::new("seen", SqlType::TimestampNtz));
        table.location = Some("/data/t".into());
        table
    }

    #[test]
    fn unknown_dialect_lists_names() {
        let err = Dialect::by_name("oracle").unwrap_err();
        assert!(err.to_string().contains("generic, spark, duckdb, postgres"));
        assert_eq!(Dialect::by_name("PostgreSQL").unwrap().name(), "postgres");
    }

    #[test]
    fn postgres_collapses_nested_types_once() {
        let mut table = wide_table();
        let warnings = Dialect::postgres().legalize(&mut table, Mode::Coerce).unwrap();

        let paths: Vec<&str> = warnings.iter().map(|w| w.field_path.as_str()).collect();
        assert_eq!(paths, vec!["addr", "seen", "flags", ""]);
        assert_eq!(table.columns[0].data_type, SqlType::Decimal { precision: Some(20), scale: Some(0) });
        assert_eq!(table.columns[1].data_type, SqlType::Json);
        assert!(table.location.is_none());
        assert_eq!(warnings[3].code, WarningCode::FeatureDropped);
        assert_eq!(
            warnings[1].reason,
            "postgres does not support timestampntz; replaced with TIMESTAMP"
        );
    }

    #[test]
    fn legalizing_twice_is_a_no_op() {
        for name in Dialect::names() {
            let dialect = Dialect::by_name(name).unwrap();
            let mut table = wide_table();
            dialect.legalize(&mut table, Mode::Coerce).unwrap();
            let settled = table.clone();

            let warnings = dialect.legalize(&mut table, Mode::Coerce).unwrap();
            assert!(warnings.is_empty(), "{name} warned on a second pass");
            assert_eq!(table, settled);
        }
    }

    #[test]
    fn strict_names_dialect_and_path() {
        let mut table = wide_table();
        let err = Dialect::duckdb().legalize(&mut table, Mode::Strict).unwrap_err();
        assert_eq!(
            err,
            Error::unsupported("duckdb", "variant", "addr.doc")
        );
    }
}
