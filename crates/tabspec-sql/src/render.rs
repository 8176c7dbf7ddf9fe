//! DDL rendering
//!
//! Serializes a [`CreateTable`] into text using a dialect's [`Grammar`].
//! Rendering never makes semantic decisions; it only fails on trees that
//! cannot be written at all.

use std::fmt;

use tabspec_core::{Error, IntervalUnit, Result};

use crate::ast::{ColumnDef, CreateTable, Expr, IdentityDef, Literal, SqlType, TableConstraintDef};

/// How `STRUCT` and `MAP` members are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestedStyle {
    /// `STRUCT<a INT>`, `MAP<K, V>`
    Angle,
    /// `STRUCT<a: INT>`, `MAP<K, V>`
    AngleColon,
    /// `STRUCT(a INT)`, `MAP(K, V)`
    Paren,
}

/// How arrays are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayStyle {
    /// `ARRAY<INT>`
    Angle,
    /// `INT[]`, `INT[3]`
    Suffix,
}

/// How the storage format is declared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormatStyle {
    /// `STORED AS PARQUET`
    StoredAs,
    /// `USING parquet`
    Using,
}

/// Dialect spelling table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    /// Identifier quote character
    pub quote: char,
    pub int32: &'static str,
    pub float32: &'static str,
    pub float64: &'static str,
    /// Unbounded text
    pub text: &'static str,
    pub binary: &'static str,
    pub timestamp_tz: &'static str,
    pub timestamp_ltz: &'static str,
    pub timestamp_ntz: &'static str,
    pub json: &'static str,
    /// Write `INTERVAL YEAR TO MONTH` rather than a bare `INTERVAL`
    pub interval_fields: bool,
    /// Written after `GENERATED ALWAYS AS (expr)`, e.g. `STORED`
    pub generated_suffix: Option<&'static str>,
    pub nested: NestedStyle,
    pub array: ArrayStyle,
    pub file_format: FileFormatStyle,
}

impl Grammar {
    /// ANSI-leaning spelling with every construct available
    pub fn generic() -> Self {
        Self {
            quote: '"',
            int32: "INT",
            float32: "FLOAT",
            float64: "DOUBLE",
            text: "TEXT",
            binary: "BINARY",
            timestamp_tz: "TIMESTAMPTZ",
            timestamp_ltz: "TIMESTAMPLTZ",
            timestamp_ntz: "TIMESTAMPNTZ",
            json: "JSON",
            interval_fields: true,
            generated_suffix: None,
            nested: NestedStyle::Angle,
            array: ArrayStyle::Angle,
            file_format: FileFormatStyle::StoredAs,
        }
    }
}

impl Default for Grammar {
    fn default() -> Self {
        Self::generic()
    }
}

/// Words that must be quoted when used as identifiers
const RESERVED: &[&str] = &[
    "ALL", "AND", "ARRAY", "AS", "BETWEEN", "BY", "CASE", "CAST", "CHECK", "COLUMN", "CONSTRAINT",
    "CREATE", "CROSS", "DEFAULT", "DISTINCT", "ELSE", "END", "EXISTS", "FALSE", "FOREIGN", "FROM",
    "FULL", "GROUP", "HAVING", "IN", "INNER", "INTERVAL", "INTO", "IS", "JOIN", "KEY", "LEFT",
    "LIKE", "LIMIT", "NOT", "NULL", "ON", "OR", "ORDER", "OUTER", "PRIMARY", "REFERENCES", "RIGHT",
    "SELECT", "TABLE", "THEN", "TO", "TRUE", "UNION", "UNIQUE", "USER", "USING", "WHEN", "WHERE",
    "WITH",
];

/// Quote an identifier when it is not a plain word or is reserved
pub fn quote_ident(name: &str, grammar: &Grammar) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    let reserved = RESERVED.contains(&name.to_ascii_uppercase().as_str());
    if plain && !reserved {
        return name.to_string();
    }
    let q = grammar.quote;
    let escaped = name.replace(q, &format!("{q}{q}"));
    format!("{q}{escaped}{q}")
}

fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn interval_unit(unit: IntervalUnit) -> &'static str {
    match unit {
        IntervalUnit::Year => "YEAR",
        IntervalUnit::Month => "MONTH",
        IntervalUnit::Day => "DAY",
        IntervalUnit::Hour => "HOUR",
        IntervalUnit::Minute => "MINUTE",
        IntervalUnit::Second => "SECOND",
    }
}

/// Render a column type
pub fn render_type(ty: &SqlType, grammar: &Grammar) -> String {
    match ty {
        SqlType::Boolean => "BOOLEAN".to_string(),
        SqlType::Integer { bits, signed: true } => match bits {
            8 => "TINYINT".to_string(),
            16 => "SMALLINT".to_string(),
            64 => "BIGINT".to_string(),
            _ => grammar.int32.to_string(),
        },
        SqlType::Integer { bits, signed: false } => match bits {
            8 => "UTINYINT".to_string(),
            16 => "USMALLINT".to_string(),
            64 => "UBIGINT".to_string(),
            _ => "UINTEGER".to_string(),
        },
        SqlType::Float { bits: 64 } => grammar.float64.to_string(),
        SqlType::Float { .. } => grammar.float32.to_string(),
        SqlType::Decimal { precision: None, .. } => "DECIMAL".to_string(),
        SqlType::Decimal {
            precision: Some(precision),
            scale,
        } => format!("DECIMAL({}, {})", precision, scale.unwrap_or(0)),
        SqlType::Text { length: None } => grammar.text.to_string(),
        SqlType::Text { length: Some(length) } => format!("VARCHAR({})", length),
        SqlType::Binary { length: None } => grammar.binary.to_string(),
        SqlType::Binary { length: Some(length) } => format!("{}({})", grammar.binary, length),
        SqlType::Date => "DATE".to_string(),
        SqlType::Time => "TIME".to_string(),
        SqlType::Timestamp => "TIMESTAMP".to_string(),
        SqlType::TimestampTz => grammar.timestamp_tz.to_string(),
        SqlType::TimestampLtz => grammar.timestamp_ltz.to_string(),
        SqlType::TimestampNtz => grammar.timestamp_ntz.to_string(),
        SqlType::Interval { .. } if !grammar.interval_fields => "INTERVAL".to_string(),
        SqlType::Interval { start, end } => match end {
            Some(end) if end != start => {
                format!("INTERVAL {} TO {}", interval_unit(*start), interval_unit(*end))
            }
            _ => format!("INTERVAL {}", interval_unit(*start)),
        },
        SqlType::Array { element, size } => {
            let element = render_type(element, grammar);
            match grammar.array {
                ArrayStyle::Angle => format!("ARRAY<{}>", element),
                ArrayStyle::Suffix => match size {
                    Some(size) => format!("{}[{}]", element, size),
                    None => format!("{}[]", element),
                },
            }
        }
        SqlType::Struct { fields } => {
            let separator = match grammar.nested {
                NestedStyle::AngleColon => ": ",
                NestedStyle::Angle | NestedStyle::Paren => " ",
            };
            let members: Vec<String> = fields
                .iter()
                .map(|f| {
                    format!(
                        "{}{}{}",
                        quote_ident(&f.name, grammar),
                        separator,
                        render_type(&f.data_type, grammar)
                    )
                })
                .collect();
            match grammar.nested {
                NestedStyle::Paren => format!("STRUCT({})", members.join(", ")),
                NestedStyle::Angle | NestedStyle::AngleColon => {
                    format!("STRUCT<{}>", members.join(", "))
                }
            }
        }
        SqlType::Map { key, value } => {
            let key = render_type(key, grammar);
            let value = render_type(value, grammar);
            match grammar.nested {
                NestedStyle::Paren => format!("MAP({}, {})", key, value),
                NestedStyle::Angle | NestedStyle::AngleColon => format!("MAP<{}, {}>", key, value),
            }
        }
        SqlType::Json => grammar.json.to_string(),
        SqlType::Variant => "VARIANT".to_string(),
        SqlType::Uuid => "UUID".to_string(),
        SqlType::Void => "VOID".to_string(),
        SqlType::Geometry { srid: None } => "GEOMETRY".to_string(),
        SqlType::Geometry { srid: Some(srid) } => format!("GEOMETRY({})", srid),
        SqlType::Geography { srid: None } => "GEOGRAPHY".to_string(),
        SqlType::Geography { srid: Some(srid) } => format!("GEOGRAPHY({})", srid),
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_type(self, &Grammar::generic()))
    }
}

fn render_literal(literal: &Literal) -> String {
    match literal {
        Literal::Null => "NULL".to_string(),
        Literal::Boolean(true) => "TRUE".to_string(),
        Literal::Boolean(false) => "FALSE".to_string(),
        Literal::Number(n) => n.clone(),
        Literal::String(s) => quote_string(s),
    }
}

pub fn render_expr(expr: &Expr, grammar: &Grammar) -> String {
    match expr {
        Expr::Column(name) => quote_ident(name, grammar),
        Expr::Literal(literal) => render_literal(literal),
        Expr::Cast { expr, data_type } => {
            format!("CAST({} AS {})", render_expr(expr, grammar), data_type.to_ascii_uppercase())
        }
        Expr::DateTrunc { unit, expr } => {
            format!("DATE_TRUNC({}, {})", quote_string(unit), render_expr(expr, grammar))
        }
        Expr::Bucket { count, expr } => {
            format!("BUCKET({}, {})", render_literal(count), render_expr(expr, grammar))
        }
        Expr::Truncate { width, expr } => {
            format!("TRUNCATE({}, {})", render_literal(width), render_expr(expr, grammar))
        }
        Expr::Function { name, args } => {
            let args: Vec<String> = args.iter().map(|a| render_expr(a, grammar)).collect();
            format!("{}({})", name, args.join(", "))
        }
    }
}

fn render_identity(identity: &IdentityDef) -> String {
    let mut sql = if identity.always {
        "GENERATED ALWAYS AS IDENTITY".to_string()
    } else {
        "GENERATED BY DEFAULT AS IDENTITY".to_string()
    };
    let mut options = Vec::new();
    if let Some(start) = identity.start {
        options.push(format!("START WITH {}", start));
    }
    if let Some(increment) = identity.increment {
        options.push(format!("INCREMENT BY {}", increment));
    }
    if !options.is_empty() {
        sql.push_str(&format!(" ({})", options.join(" ")));
    }
    sql
}

fn render_column(column: &ColumnDef, grammar: &Grammar) -> Result<String> {
    if column.name.is_empty() {
        return Err(Error::render("column with an empty name"));
    }
    check_type(&column.data_type, &column.name)?;

    let mut parts = vec![
        quote_ident(&column.name, grammar),
        render_type(&column.data_type, grammar),
    ];
    if let Some(expr) = &column.generated {
        let mut generated = format!("GENERATED ALWAYS AS ({})", render_expr(expr, grammar));
        if let Some(suffix) = grammar.generated_suffix {
            generated.push(' ');
            generated.push_str(suffix);
        }
        parts.push(generated);
    }
    if column.not_null {
        parts.push("NOT NULL".to_string());
    }
    if let Some(default) = &column.default {
        parts.push(format!("DEFAULT {}", render_literal(default)));
    }
    if let Some(identity) = &column.identity {
        parts.push(render_identity(identity));
    }
    Ok(parts.join(" "))
}

fn check_type(ty: &SqlType, column: &str) -> Result<()> {
    match ty {
        SqlType::Struct { fields } if fields.is_empty() => {
            Err(Error::render(format!("struct type of column '{}' has no fields", column)))
        }
        SqlType::Struct { fields } => fields.iter().try_for_each(|f| check_type(&f.data_type, column)),
        SqlType::Array { element, .. } => check_type(element, column),
        SqlType::Map { key, value } => {
            check_type(key, column)?;
            check_type(value, column)
        }
        _ => Ok(()),
    }
}

fn ident_list(names: &[String], grammar: &Grammar) -> String {
    names
        .iter()
        .map(|n| quote_ident(n, grammar))
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_constraint(constraint: &TableConstraintDef, grammar: &Grammar) -> Result<String> {
    match constraint {
        TableConstraintDef::PrimaryKey { name, columns } => {
            if columns.is_empty() {
                return Err(Error::render(format!("primary key '{}' has no columns", name)));
            }
            Ok(format!(
                "CONSTRAINT {} PRIMARY KEY ({})",
                quote_ident(name, grammar),
                ident_list(columns, grammar)
            ))
        }
        TableConstraintDef::ForeignKey {
            name,
            columns,
            table,
            referred_columns,
        } => {
            if columns.is_empty() {
                return Err(Error::render(format!("foreign key '{}' has no columns", name)));
            }
            let mut sql = format!(
                "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}",
                quote_ident(name, grammar),
                ident_list(columns, grammar),
                render_name(&table.parts, grammar)?
            );
            if !referred_columns.is_empty() {
                sql.push_str(&format!(" ({})", ident_list(referred_columns, grammar)));
            }
            Ok(sql)
        }
    }
}

fn render_name(parts: &[String], grammar: &Grammar) -> Result<String> {
    if parts.is_empty() || parts.iter().any(String::is_empty) {
        return Err(Error::render(format!("invalid object name '{}'", parts.join("."))));
    }
    Ok(parts
        .iter()
        .map(|p| quote_ident(p, grammar))
        .collect::<Vec<_>>()
        .join("."))
}

/// Render a complete `CREATE TABLE` statement
///
/// Compact output is a single line; `pretty` puts each column and clause on
/// its own line.
pub fn render(table: &CreateTable, grammar: &Grammar, pretty: bool) -> Result<String> {
    if table.columns.is_empty() {
        return Err(Error::render(format!("table '{}' has no columns", table.name)));
    }

    let mut head = String::from("CREATE ");
    if table.or_replace {
        head.push_str("OR REPLACE ");
    }
    if table.external {
        head.push_str("EXTERNAL ");
    }
    head.push_str("TABLE ");
    if table.if_not_exists {
        head.push_str("IF NOT EXISTS ");
    }
    head.push_str(&render_name(&table.name.parts, grammar)?);

    let mut elements = Vec::with_capacity(table.columns.len() + table.constraints.len());
    for column in &table.columns {
        elements.push(render_column(column, grammar)?);
    }
    for constraint in &table.constraints {
        elements.push(render_constraint(constraint, grammar)?);
    }

    let mut clauses = Vec::new();
    if let Some(format) = &table.file_format {
        clauses.push(match grammar.file_format {
            FileFormatStyle::StoredAs => format!("STORED AS {}", format.to_ascii_uppercase()),
            FileFormatStyle::Using => format!("USING {}", format),
        });
    }
    if !table.partition_by.is_empty() {
        let exprs: Vec<String> = table
            .partition_by
            .iter()
            .map(|e| render_expr(e, grammar))
            .collect();
        clauses.push(format!("PARTITIONED BY ({})", exprs.join(", ")));
    }
    if let Some(location) = &table.location {
        clauses.push(format!("LOCATION {}", quote_string(location)));
    }
    if !table.properties.is_empty() {
        let props: Vec<String> = table
            .properties
            .iter()
            .map(|(k, v)| format!("{}={}", quote_string(k), quote_string(v)))
            .collect();
        clauses.push(format!("TBLPROPERTIES ({})", props.join(", ")));
    }

    let sql = if pretty {
        let mut sql = format!("{} (\n  {}\n)", head, elements.join(",\n  "));
        for clause in clauses {
            sql.push('\n');
            sql.push_str(&clause);
        }
        sql
    } else {
        let mut sql = format!("{} ({})", head, elements.join(", "));
        for clause in clauses {
            sql.push(' ');
            sql.push_str(&clause);
        }
        sql
    };
    Ok(sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ObjectName, StructField};
    use pretty_assertions::assert_eq;

    fn table() -> CreateTable {
        let mut table = CreateTable::new(ObjectName::new(["db", "orders"]));
        let mut id = ColumnDef::new("id", SqlType::Integer { bits: 64, signed: true });
        id.not_null = true;
        table.columns.push(id);
        table.constraints.push(TableConstraintDef::PrimaryKey {
            name: "pk_orders".into(),
            columns: vec!["id".into()],
        });
        table
    }

    #[test]
    fn quotes_only_when_needed() {
        let grammar = Grammar::generic();
        assert_eq!(quote_ident("order_id", &grammar), "order_id");
        assert_eq!(quote_ident("order", &grammar), "\"order\"");
        assert_eq!(quote_ident("first name", &grammar), "\"first name\"");
        assert_eq!(quote_ident("a\"b", &grammar), "\"a\"\"b\"");
        assert_eq!(quote_ident("1st", &grammar), "\"1st\"");
    }

    #[test]
    fn compact_and_pretty_layouts() {
        let grammar = Grammar::generic();
        let mut table = table();
        table.location = Some("s3://bucket/orders".into());

        assert_eq!(
            render(&table, &grammar, false).unwrap(),
            "CREATE TABLE db.orders (id BIGINT NOT NULL, CONSTRAINT pk_orders PRIMARY KEY (id)) \
             LOCATION 's3://bucket/orders'"
        );
        assert_eq!(
            render(&table, &grammar, true).unwrap(),
            "CREATE TABLE db.orders (\n  id BIGINT NOT NULL,\n  CONSTRAINT pk_orders PRIMARY KEY (id)\n)\n\
             LOCATION 's3://bucket/orders'"
        );
    }

    #[test]
    fn nested_type_styles() {
        let ty = SqlType::Array {
            element: Box::new(SqlType::Struct {
                fields: vec![StructField {
                    name: "city".into(),
                    data_type: SqlType::text(),
                }],
            }),
            size: Some(2),
        };
        assert_eq!(render_type(&ty, &Grammar::generic()), "ARRAY<STRUCT<city TEXT>>");

        let suffix = Grammar {
            nested: NestedStyle::Paren,
            array: ArrayStyle::Suffix,
            text: "VARCHAR",
            ..Grammar::generic()
        };
        assert_eq!(render_type(&ty, &suffix), "STRUCT(city VARCHAR)[2]");
    }

    #[test]
    fn identity_and_defaults() {
        let mut column = ColumnDef::new("n", SqlType::Integer { bits: 32, signed: true });
        column.default = Some(Literal::String("it's".into()));
        column.identity = Some(IdentityDef {
            always: false,
            start: Some(-1),
            increment: Some(2),
        });
        assert_eq!(
            render_column(&column, &Grammar::generic()).unwrap(),
            "n INT DEFAULT 'it''s' GENERATED BY DEFAULT AS IDENTITY (START WITH -1 INCREMENT BY 2)"
        );
    }

    #[test]
    fn generated_suffix_follows_the_grammar() {
        let mut column = ColumnDef::new("day", SqlType::Date);
        column.generated = Some(Expr::Cast {
            expr: Box::new(Expr::Column("at".into())),
            data_type: "date".into(),
        });
        assert_eq!(
            render_column(&column, &Grammar::generic()).unwrap(),
            "day DATE GENERATED ALWAYS AS (CAST(at AS DATE))"
        );

        let stored = Grammar {
            generated_suffix: Some("STORED"),
            ..Grammar::generic()
        };
        column.not_null = true;
        assert_eq!(
            render_column(&column, &stored).unwrap(),
            "day DATE GENERATED ALWAYS AS (CAST(at AS DATE)) STORED NOT NULL"
        );
    }

    #[test]
    fn malformed_trees_fail_to_render() {
        let mut empty = table();
        empty.columns.clear();
        assert!(matches!(
            render(&empty, &Grammar::generic(), false),
            Err(Error::Render { .. })
        ));

        let mut bad = table();
        bad.columns[0].data_type = SqlType::Struct { fields: vec![] };
        assert!(render(&bad, &Grammar::generic(), false).is_err());
    }
}
