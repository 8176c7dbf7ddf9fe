//! DDL → spec
//!
//! Parses a single `CREATE TABLE` statement with sqlparser and maps it onto
//! the canonical model. Types and options with no canonical equivalent go
//! through the load context, so they fail in strict mode and are replaced or
//! dropped with a warning in coerce mode.

use serde_json::Value;
use sqlparser::ast::{
    ArrayElemTypeDef, CharacterLength, ColumnDef as SqlColumnDef, ColumnOption, DataType,
    ExactNumberInfo, Expr as SqlExpr, FunctionArg, FunctionArgExpr, FunctionArguments,
    GeneratedAs, Ident, ObjectName as SqlObjectName, SequenceOptions, Statement,
    TableConstraint as SqlTableConstraint, TimezoneInfo, UnaryOperator, Value as SqlValue,
};
use sqlparser::dialect::{Dialect as ParserDialect, GenericDialect, PostgreSqlDialect};
use sqlparser::keywords::Keyword;
use sqlparser::parser::{Parser, ParserError};
use sqlparser::tokenizer::Token;
use tabspec_core::{
    Column, ColumnConstraint, Error, ForeignKeyReference, GeneratedColumn, Identity,
    IntervalUnit, LogicalType, PartitionColumn, Result, Spec, Storage, TableConstraint, TimeUnit,
    DEFAULT_TIMEZONE,
};
use tabspec_convert::{LoadConfig, LoadContext, Loaded, Loader};

use crate::dialect::Dialect;
use crate::normalize::prepare;

/// Loads specs from `CREATE TABLE` statements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlLoader {
    dialect: &'static str,
}

impl Default for SqlLoader {
    fn default() -> Self {
        Self { dialect: "generic" }
    }
}

impl SqlLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse with the grammar of the named dialect
    pub fn for_dialect(name: &str) -> Result<Self> {
        let dialect = Dialect::by_name(name)?;
        Ok(Self {
            dialect: dialect.name(),
        })
    }

    pub fn dialect(&self) -> &'static str {
        self.dialect
    }

    /// Nested types are rewritten to the generic spelling before parsing,
    /// so only postgres needs its own grammar
    fn parser_dialect(&self) -> Box<dyn ParserDialect> {
        match self.dialect {
            "postgres" => Box::new(PostgreSqlDialect {}),
            _ => Box::new(GenericDialect {}),
        }
    }
}

impl Loader for SqlLoader {
    type Source = str;

    fn name(&self) -> &'static str {
        "sql"
    }

    fn load(&self, source: &str, config: &LoadConfig) -> Result<Loaded> {
        let dialect = self.parser_dialect();
        let split = prepare(&*dialect, source)?;
        let statements = Parser::new(&*dialect)
            .with_tokens(split.head)
            .parse_statements()
            .map_err(parse_error)?;

        let create = match statements.as_slice() {
            [Statement::CreateTable(create)] if create.query.is_none() => create,
            [Statement::CreateTable(_)] => {
                return Err(Error::validation(
                    "CREATE TABLE ... AS SELECT cannot be loaded; list the columns instead.",
                ))
            }
            [_] => {
                return Err(Error::validation(
                    "Expected a CREATE TABLE statement.",
                ))
            }
            _ => {
                return Err(Error::validation(format!(
                    "Expected exactly one statement, found {}.",
                    statements.len()
                )))
            }
        };

        let table_name = object_name(&create.name);
        let name = config.name_or(&table_name).to_string();
        let short_name = name.rsplit('.').next().unwrap_or(&name).to_string();
        tracing::debug!(
            "Loading table {} ({} columns) from {} DDL",
            table_name,
            create.columns.len(),
            self.dialect
        );

        let mut ctx = LoadContext::new("sql", config);
        let mut builder = Spec::builder(name.as_str()).external(create.external);
        if let Some(version) = config.version {
            builder = builder.version(version);
        }
        if let Some(description) = &config.description {
            builder = builder.description(description.as_str());
        }

        for column in &create.columns {
            let column = ctx.with_segment(&column.name.value, |ctx| load_column(ctx, column))?;
            builder = builder.column(column);
        }

        for constraint in &create.constraints {
            match constraint {
                SqlTableConstraint::PrimaryKey { name, columns, .. } => {
                    let name = constraint_name(name.as_ref(), || format!("pk_{}", short_name));
                    builder = builder.table_constraint(TableConstraint::primary_key(name, idents(columns)));
                }
                SqlTableConstraint::ForeignKey {
                    name,
                    columns,
                    foreign_table,
                    referred_columns,
                    ..
                } => {
                    let local = idents(columns);
                    let name = constraint_name(name.as_ref(), || {
                        format!("fk_{}_{}", short_name, local.join("_"))
                    });
                    let mut references = ForeignKeyReference::new(object_name(foreign_table));
                    if !referred_columns.is_empty() {
                        references = references.with_columns(idents(referred_columns));
                    }
                    builder = builder.table_constraint(TableConstraint::foreign_key(name, local, references));
                }
                other => ctx.drop_feature("table constraint", other)?,
            }
        }

        let clauses = load_clauses(&mut ctx, &*dialect, split.clauses)?;
        if clauses.storage != Storage::default() {
            builder = builder.storage(clauses.storage);
        }
        for partition in clauses.partitions {
            builder = builder.partition(partition);
        }

        let spec = builder.build()?;
        Ok(ctx.finish(spec))
    }
}

fn parse_error(e: ParserError) -> Error {
    Error::validation(format!("Failed to parse DDL: {}", e))
}

/// Storage and partitioning read from the table clauses
#[derive(Debug, Default)]
struct TableClauses {
    storage: Storage,
    partitions: Vec<PartitionColumn>,
}

/// Reads `STORED AS`/`USING`, `PARTITIONED BY`, `LOCATION` and
/// `TBLPROPERTIES` in any order; anything after an unknown clause is dropped
fn load_clauses(
    ctx: &mut LoadContext,
    dialect: &dyn ParserDialect,
    tokens: Vec<Token>,
) -> Result<TableClauses> {
    let mut clauses = TableClauses::default();
    let mut parser = Parser::new(dialect).with_tokens(tokens);

    loop {
        if parser.peek_token().token == Token::EOF {
            break;
        }
        if parser.parse_keywords(&[Keyword::STORED, Keyword::AS]) || parser.parse_keyword(Keyword::USING) {
            let format = parser.parse_identifier(false).map_err(parse_error)?;
            clauses.storage.format = Some(format.value.to_ascii_lowercase());
        } else if parser.parse_keywords(&[Keyword::PARTITIONED, Keyword::BY]) {
            parser.expect_token(&Token::LParen).map_err(parse_error)?;
            let exprs = parser.parse_comma_separated(Parser::parse_expr).map_err(parse_error)?;
            parser.expect_token(&Token::RParen).map_err(parse_error)?;
            for expr in exprs {
                match column_transform(&expr) {
                    Some((column, None)) => clauses.partitions.push(PartitionColumn::new(column)),
                    Some((column, Some((transform, args)))) => clauses
                        .partitions
                        .push(PartitionColumn::new(column).with_transform(transform, args)),
                    None => ctx.drop_feature("partition expression", &expr)?,
                }
            }
        } else if parser.parse_keyword(Keyword::LOCATION) {
            clauses.storage.location = Some(parser.parse_literal_string().map_err(parse_error)?);
        } else if parser.parse_keyword(Keyword::TBLPROPERTIES) {
            parser.expect_token(&Token::LParen).map_err(parse_error)?;
            let properties = parser
                .parse_comma_separated(|p| {
                    let key = p.parse_literal_string()?;
                    p.expect_token(&Token::Eq)?;
                    Ok((key, p.parse_literal_string()?))
                })
                .map_err(parse_error)?;
            parser.expect_token(&Token::RParen).map_err(parse_error)?;
            clauses.storage.properties.extend(properties);
        } else {
            let mut rest = Vec::new();
            loop {
                let token = parser.next_token().token;
                if token == Token::EOF {
                    break;
                }
                rest.push(token.to_string());
            }
            ctx.drop_feature("table clause", rest.join(" "))?;
            break;
        }
    }
    Ok(clauses)
}

fn object_name(name: &SqlObjectName) -> String {
    name.0
        .iter()
        .map(|ident| ident.value.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

fn idents(idents: &[Ident]) -> Vec<String> {
    idents.iter().map(|ident| ident.value.clone()).collect()
}

fn constraint_name(name: Option<&Ident>, default: impl FnOnce() -> String) -> String {
    name.map(|ident| ident.value.clone()).unwrap_or_else(default)
}

fn load_column(ctx: &mut LoadContext, def: &SqlColumnDef) -> Result<Column> {
    let data_type = load_type(ctx, &def.data_type)?;
    let mut column = Column::new(def.name.value.as_str(), data_type);

    for option in &def.options {
        match &option.option {
            ColumnOption::Null => {}
            ColumnOption::NotNull => column = column.not_null(),
            ColumnOption::Default(expr) => match literal(expr) {
                Some(value) => column = column.with_constraint(ColumnConstraint::default_value(value)),
                None => ctx.drop_feature("non-literal default", expr)?,
            },
            ColumnOption::Unique {
                is_primary: true, ..
            } => column = column.with_constraint(ColumnConstraint::PrimaryKey),
            ColumnOption::ForeignKey {
                foreign_table,
                referred_columns,
                ..
            } => {
                let mut references = ForeignKeyReference::new(object_name(foreign_table));
                if !referred_columns.is_empty() {
                    references = references.with_columns(idents(referred_columns));
                }
                column = column.with_constraint(ColumnConstraint::ForeignKey {
                    name: option.name.as_ref().map(|ident| ident.value.clone()),
                    references,
                });
            }
            ColumnOption::Comment(comment) => column = column.with_description(comment.as_str()),
            ColumnOption::Generated {
                generated_as,
                sequence_options,
                generation_expr,
                ..
            } => match generation_expr {
                Some(expr) => match generated_from(expr) {
                    Some(generated) => column = column.with_generated_as(generated),
                    None => ctx.drop_feature("generated expression", expr)?,
                },
                None => {
                    let mut identity = Identity {
                        always: matches!(generated_as, GeneratedAs::Always),
                        start: None,
                        increment: None,
                    };
                    for sequence_option in sequence_options.iter().flatten() {
                        match sequence_option {
                            SequenceOptions::StartWith(expr, _) => {
                                identity.start = literal(expr).and_then(|v| v.as_i64());
                            }
                            SequenceOptions::IncrementBy(expr, _) => {
                                identity.increment = literal(expr).and_then(|v| v.as_i64());
                            }
                            _ => ctx.drop_feature("identity sequence option", "SEQUENCE OPTION")?,
                        }
                    }
                    column = column.with_constraint(ColumnConstraint::Identity(identity));
                }
            },
            other => ctx.drop_feature("column option", other)?,
        }
    }
    Ok(column)
}

/// Generated columns are kept when they copy or transform another column
fn generated_from(expr: &SqlExpr) -> Option<GeneratedColumn> {
    let (column, transform) = column_transform(expr)?;
    let generated = GeneratedColumn::new(column);
    Some(match transform {
        Some((name, args)) => generated.with_transform(name, args),
        None => generated,
    })
}

type Transform = (String, Vec<Value>);

/// Source column and transform of a partition or generation expression
///
/// Reads back `col`, `CAST(col AS t)`, `DATE_TRUNC('unit', col)`,
/// `BUCKET(n, col)`, `TRUNCATE(w, col)` and `name(col, literal...)`.
fn column_transform(expr: &SqlExpr) -> Option<(String, Option<Transform>)> {
    match expr {
        SqlExpr::Identifier(ident) => Some((ident.value.clone(), None)),
        SqlExpr::Nested(inner) => column_transform(inner),
        SqlExpr::Cast {
            expr, data_type, ..
        } => {
            let column = identifier(expr)?;
            let target = Value::String(data_type.to_string().to_ascii_lowercase());
            Some((column, Some(("cast".to_string(), vec![target]))))
        }
        SqlExpr::Function(function) => {
            let FunctionArguments::List(list) = &function.args else {
                return None;
            };
            let args = list
                .args
                .iter()
                .map(|arg| match arg {
                    FunctionArg::Unnamed(FunctionArgExpr::Expr(expr)) => Some(expr),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()?;
            let name = object_name(&function.name);
            match (name.to_ascii_lowercase().as_str(), args.as_slice()) {
                (transform @ ("date_trunc" | "bucket" | "truncate"), [arg, column]) => {
                    let transform = transform.to_string();
                    Some((identifier(column)?, Some((transform, vec![literal(arg)?]))))
                }
                (_, [column, rest @ ..]) => {
                    let rest = rest.iter().map(|arg| literal(arg)).collect::<Option<Vec<_>>>()?;
                    Some((identifier(column)?, Some((name, rest))))
                }
                _ => None,
            }
        }
        _ => None,
    }
}

fn identifier(expr: &SqlExpr) -> Option<String> {
    match expr {
        SqlExpr::Identifier(ident) => Some(ident.value.clone()),
        _ => None,
    }
}

fn literal(expr: &SqlExpr) -> Option<Value> {
    match expr {
        SqlExpr::Value(value) => match value {
            SqlValue::Null => Some(Value::Null),
            SqlValue::Boolean(b) => Some(Value::Bool(*b)),
            SqlValue::Number(n, _) => number(&n.to_string()),
            SqlValue::SingleQuotedString(s) => Some(Value::String(s.clone())),
            _ => None,
        },
        SqlExpr::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => match literal(expr)? {
            Value::Number(n) => number(&format!("-{}", n)),
            _ => None,
        },
        SqlExpr::Nested(inner) => literal(inner),
        _ => None,
    }
}

fn number(text: &str) -> Option<Value> {
    serde_json::from_str::<Value>(text).ok().filter(Value::is_number)
}

fn length(value: Option<u64>) -> Option<u32> {
    value.and_then(|v| u32::try_from(v).ok())
}

fn char_length(value: &Option<CharacterLength>) -> Option<u32> {
    match value {
        Some(CharacterLength::IntegerLength { length: n, .. }) => length(Some(*n)),
        _ => None,
    }
}

fn integer(bits: u16, signed: bool) -> LogicalType {
    LogicalType::Integer {
        bits: Some(bits),
        signed,
    }
}

fn float(bits: u16) -> LogicalType {
    LogicalType::Float { bits: Some(bits) }
}

fn decimal(info: &ExactNumberInfo) -> LogicalType {
    let (precision, scale) = match info {
        ExactNumberInfo::None => (None, None),
        ExactNumberInfo::Precision(p) => (length(Some(*p)), None),
        ExactNumberInfo::PrecisionAndScale(p, s) => (length(Some(*p)), i32::try_from(*s).ok()),
    };
    LogicalType::Decimal {
        precision,
        scale,
        bits: None,
    }
}

/// Explicit DDL type → logical type table
fn load_type(ctx: &mut LoadContext, data_type: &DataType) -> Result<LogicalType> {
    let ty = match data_type {
        DataType::Boolean | DataType::Bool => LogicalType::boolean(),

        DataType::TinyInt(_) => integer(8, true),
        DataType::SmallInt(_) | DataType::Int2(_) => integer(16, true),
        DataType::Int(_) | DataType::Integer(_) | DataType::Int4(_) => integer(32, true),
        DataType::BigInt(_) | DataType::Int8(_) => integer(64, true),
        DataType::UnsignedTinyInt(_) => integer(8, false),
        DataType::UnsignedSmallInt(_) => integer(16, false),
        DataType::UnsignedInt(_) | DataType::UnsignedInteger(_) => integer(32, false),
        DataType::UnsignedBigInt(_) => integer(64, false),

        DataType::Real | DataType::Float4 => float(32),
        DataType::Double | DataType::DoublePrecision | DataType::Float8 => float(64),
        DataType::Float(precision) => match precision {
            Some(p) if *p > 24 => float(64),
            _ => float(32),
        },

        DataType::Decimal(info) | DataType::Numeric(info) | DataType::Dec(info) => decimal(info),

        DataType::Text => LogicalType::string(),
        DataType::String(n) => LogicalType::String { length: length(*n) },
        DataType::Varchar(n)
        | DataType::Char(n)
        | DataType::Character(n)
        | DataType::CharacterVarying(n)
        | DataType::CharVarying(n) => LogicalType::String {
            length: char_length(n),
        },

        DataType::Binary(n) => LogicalType::Binary { length: length(*n) },
        DataType::Varbinary(_) | DataType::Blob(_) | DataType::Bytea => LogicalType::binary(),

        DataType::Date => LogicalType::date(),
        DataType::Time(..) => LogicalType::Time {
            unit: TimeUnit::Ms,
            bits: None,
        },
        DataType::Timestamp(_, TimezoneInfo::WithTimeZone | TimezoneInfo::Tz) => {
            LogicalType::timestamp_tz(DEFAULT_TIMEZONE)
        }
        DataType::Timestamp(..) | DataType::Datetime(_) => LogicalType::timestamp(),
        DataType::Interval => LogicalType::Interval {
            start: IntervalUnit::Day,
            end: Some(IntervalUnit::Second),
        },

        DataType::JSON | DataType::JSONB => LogicalType::Json,
        DataType::Uuid => LogicalType::Uuid,

        DataType::Array(element) => match element {
            ArrayElemTypeDef::AngleBracket(inner) | ArrayElemTypeDef::Parenthesis(inner) => {
                LogicalType::array(load_type(ctx, inner)?)
            }
            ArrayElemTypeDef::SquareBracket(inner, size) => {
                let element = load_type(ctx, inner)?;
                match length(*size) {
                    Some(size) => LogicalType::fixed_array(element, size)?,
                    None => LogicalType::array(element),
                }
            }
            ArrayElemTypeDef::None => return ctx.unsupported_type(data_type),
        },
        DataType::Map(key, value) => {
            let key = load_type(ctx, key)?;
            let value = load_type(ctx, value)?;
            LogicalType::map(key, value)
        }
        DataType::Struct(fields, ..) => {
            let mut members = Vec::with_capacity(fields.len());
            for (i, field) in fields.iter().enumerate() {
                let name = field
                    .field_name
                    .as_ref()
                    .map(|ident| ident.value.clone())
                    .unwrap_or_else(|| format!("_{}", i));
                let member_type = ctx.with_segment(&name, |ctx| load_type(ctx, &field.field_type))?;
                members.push(Column::new(name, member_type));
            }
            LogicalType::structure(members)?
        }

        DataType::Custom(name, modifiers) => return custom_type(ctx, data_type, name, modifiers),
        _ => return ctx.unsupported_type(data_type),
    };
    Ok(ty)
}

/// Types sqlparser only knows by name
fn custom_type(
    ctx: &mut LoadContext,
    data_type: &DataType,
    name: &SqlObjectName,
    modifiers: &[String],
) -> Result<LogicalType> {
    let type_name = object_name(name).to_ascii_uppercase();
    if type_name == "INTERVAL" {
        return interval_type(ctx, data_type, modifiers);
    }
    let srid = match modifiers {
        [] => None,
        [srid] => match srid.parse::<u32>() {
            Ok(srid) => Some(srid),
            Err(_) => return ctx.unsupported_type(data_type),
        },
        _ => return ctx.unsupported_type(data_type),
    };

    let ty = match type_name.as_str() {
        "UTINYINT" => integer(8, false),
        "USMALLINT" => integer(16, false),
        "UINTEGER" | "UINT" => integer(32, false),
        "UBIGINT" => integer(64, false),
        "STRING" => LogicalType::string(),
        "TIMESTAMPTZ" => LogicalType::timestamp_tz(DEFAULT_TIMEZONE),
        "TIMESTAMPLTZ" | "TIMESTAMP_LTZ" => LogicalType::TimestampLtz { unit: TimeUnit::Ns },
        "TIMESTAMPNTZ" | "TIMESTAMP_NTZ" => LogicalType::TimestampNtz { unit: TimeUnit::Ns },
        "VARIANT" => LogicalType::Variant,
        "VOID" => LogicalType::Void,
        "GEOMETRY" => LogicalType::Geometry { srid },
        "GEOGRAPHY" => LogicalType::Geography { srid },
        _ => return ctx.unsupported_type(data_type),
    };
    if srid.is_some() && !matches!(ty, LogicalType::Geometry { .. } | LogicalType::Geography { .. }) {
        return ctx.unsupported_type(data_type);
    }
    Ok(ty)
}

/// `INTERVAL(start[, end])`, the rewritten form of `INTERVAL start [TO end]`
fn interval_type(ctx: &mut LoadContext, data_type: &DataType, modifiers: &[String]) -> Result<LogicalType> {
    let units = modifiers
        .iter()
        .map(|unit| unit.parse::<IntervalUnit>())
        .collect::<Result<Vec<_>>>();
    let interval = match units.as_deref() {
        Ok([start]) => LogicalType::interval(*start, None),
        Ok([start, end]) => LogicalType::interval(*start, Some(*end)),
        _ => return ctx.unsupported_type(data_type),
    };
    match interval {
        Ok(interval) => Ok(interval),
        Err(_) => ctx.unsupported_type(data_type),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tabspec_core::{Mode, WarningCode};

    fn load(sql: &str) -> Result<Loaded> {
        SqlLoader::new().load(sql, &LoadConfig::new())
    }

    #[test]
    fn columns_and_keys() {
        let loaded = load(
            "CREATE TABLE shop.orders (
                id BIGINT NOT NULL PRIMARY KEY,
                customer_id INT REFERENCES shop.customers (id),
                total DECIMAL(10, 2) DEFAULT 0,
                note VARCHAR(200) DEFAULT 'none'
            )",
        )
        .unwrap();
        assert!(loaded.warnings.is_empty());

        let spec = loaded.spec;
        assert_eq!(spec.name(), "shop.orders");
        assert_eq!(spec.column("id").unwrap().data_type, LogicalType::int64());
        assert!(!spec.column("id").unwrap().is_nullable());
        assert_eq!(
            spec.column("note").unwrap().default_value(),
            Some(&Value::String("none".into()))
        );
        assert_eq!(
            spec.column("total").unwrap().data_type,
            LogicalType::decimal(10, 2).unwrap()
        );

        let names: Vec<&str> = spec.table_constraints().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["pk_orders", "fk_orders_customer_id"]);
    }

    #[test]
    fn table_level_keys_get_default_names() {
        let spec = load(
            "CREATE TABLE t (a INT, b INT, PRIMARY KEY (a, b), FOREIGN KEY (b) REFERENCES u (id))",
        )
        .unwrap()
        .spec;
        let constraints = spec.table_constraints();
        assert_eq!(constraints[0].name(), "pk_t");
        assert_eq!(constraints[0].columns(), ["a", "b"]);
        assert_eq!(constraints[1].name(), "fk_t_b");
    }

    #[test]
    fn negative_defaults_are_numbers() {
        let spec = load("CREATE TABLE t (n SMALLINT DEFAULT -5)").unwrap().spec;
        assert_eq!(
            spec.column("n").unwrap().default_value(),
            Some(&serde_json::json!(-5))
        );
    }

    #[test]
    fn unknown_types_follow_mode() {
        let sql = "CREATE TABLE t (id INT, h HUGEINT)";

        let loaded = load(sql).unwrap();
        assert_eq!(loaded.spec.column("h").unwrap().data_type, LogicalType::string());
        assert_eq!(loaded.warnings.len(), 1);
        assert_eq!(loaded.warnings[0].code, WarningCode::TypeFallback);
        assert_eq!(loaded.warnings[0].field_path, "h");

        let strict = SqlLoader::new().load(sql, &LoadConfig::new().mode(Mode::Strict));
        assert!(matches!(strict, Err(Error::UnsupportedFeature { .. })));
    }

    #[test]
    fn only_create_table_accepted() {
        assert!(load("SELECT 1").is_err());
        assert!(load("CREATE TABLE a (x INT); CREATE TABLE b (y INT)").is_err());
        assert!(load("CREATE TABLE (").is_err());
    }

    fn load_strict(dialect: &str, sql: &str) -> Spec {
        let loaded = SqlLoader::for_dialect(dialect)
            .unwrap()
            .load(sql, &LoadConfig::new().mode(Mode::Strict))
            .unwrap();
        assert!(loaded.warnings.is_empty(), "{}: {:?}", dialect, loaded.warnings);
        loaded.spec
    }

    #[test]
    fn map_spellings_of_every_dialect() {
        let expected = LogicalType::map(LogicalType::string(), integer(32, true));
        for (dialect, sql) in [
            ("generic", "CREATE TABLE t (m MAP<TEXT, INT>)"),
            ("spark", "CREATE TABLE t (m MAP<STRING, INT>)"),
            ("duckdb", "CREATE TABLE t (m MAP(VARCHAR, INTEGER))"),
        ] {
            let spec = load_strict(dialect, sql);
            assert_eq!(spec.column("m").unwrap().data_type, expected, "{}", dialect);
        }
    }

    #[test]
    fn struct_spellings_of_every_dialect() {
        let expected = LogicalType::structure(vec![
            Column::new("x", integer(32, true)),
            Column::new("tags", LogicalType::array(LogicalType::string())),
        ])
        .unwrap();
        for (dialect, sql) in [
            ("generic", "CREATE TABLE t (p STRUCT<x INT, tags ARRAY<TEXT>>)"),
            ("spark", "CREATE TABLE t (p STRUCT<x: INT, tags: ARRAY<STRING>>)"),
            ("duckdb", "CREATE TABLE t (p STRUCT(x INTEGER, tags VARCHAR[]))"),
        ] {
            let spec = load_strict(dialect, sql);
            assert_eq!(spec.column("p").unwrap().data_type, expected, "{}", dialect);
        }
    }

    #[test]
    fn interval_fields_are_recovered() {
        let spec = load_strict(
            "postgres",
            "CREATE TABLE t (a INTERVAL YEAR TO MONTH, b INTERVAL DAY, c INTERVAL)",
        );
        assert_eq!(
            spec.column("a").unwrap().data_type,
            LogicalType::interval(IntervalUnit::Year, Some(IntervalUnit::Month)).unwrap()
        );
        assert_eq!(
            spec.column("b").unwrap().data_type,
            LogicalType::interval(IntervalUnit::Day, None).unwrap()
        );
        assert_eq!(
            spec.column("c").unwrap().data_type,
            LogicalType::interval(IntervalUnit::Day, Some(IntervalUnit::Second)).unwrap()
        );

        let mixed = load("CREATE TABLE t (a INTERVAL YEAR TO SECOND)").unwrap();
        assert_eq!(mixed.spec.column("a").unwrap().data_type, LogicalType::string());
        assert_eq!(mixed.warnings[0].code, WarningCode::TypeFallback);
    }

    #[test]
    fn table_clauses_in_any_order() {
        let spec = load_strict(
            "spark",
            "CREATE EXTERNAL TABLE t (ts TIMESTAMP, id BIGINT, day DATE GENERATED ALWAYS AS (CAST(ts AS DATE))) \
             LOCATION 's3://bucket/t' USING parquet \
             PARTITIONED BY (DATE_TRUNC('month', ts), BUCKET(8, id)) \
             TBLPROPERTIES ('owner'='ops')",
        );
        assert!(spec.is_external());
        let storage = spec.storage().unwrap();
        assert_eq!(storage.format.as_deref(), Some("parquet"));
        assert_eq!(storage.location.as_deref(), Some("s3://bucket/t"));
        assert_eq!(storage.properties.get("owner").map(String::as_str), Some("ops"));
        assert_eq!(
            spec.partitioned_by().to_vec(),
            vec![
                PartitionColumn::new("ts").with_transform("date_trunc", vec![Value::from("month")]),
                PartitionColumn::new("id").with_transform("bucket", vec![serde_json::json!(8)]),
            ]
        );
        assert_eq!(
            spec.column("day").unwrap().generated_as,
            Some(GeneratedColumn::new("ts").with_transform("cast", vec![Value::from("date")]))
        );
    }

    #[test]
    fn unknown_table_clauses_follow_mode() {
        let sql = "CREATE TABLE t (x INT) WITH (fillfactor = 70)";

        let loaded = load(sql).unwrap();
        assert_eq!(loaded.warnings.len(), 1);
        assert_eq!(loaded.warnings[0].code, WarningCode::FeatureDropped);
        assert!(loaded.spec.storage().is_none());

        let strict = SqlLoader::new().load(sql, &LoadConfig::new().mode(Mode::Strict));
        assert!(matches!(strict, Err(Error::UnsupportedFeature { .. })));
    }

    #[test]
    fn configured_name_wins() {
        let loaded = SqlLoader::new()
            .load("CREATE TABLE raw_t (x INT)", &LoadConfig::new().name("clean.t"))
            .unwrap();
        assert_eq!(loaded.spec.name(), "clean.t");
    }
}
