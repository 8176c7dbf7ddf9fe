//! Spec → `CREATE TABLE` tree
//!
//! The builder is a conversion target like any other, aimed at the widest
//! tree the renderer can print. Dialect narrowing happens afterwards.

use std::collections::HashSet;

use serde_json::Value;
use tabspec_core::{Column, Error, LogicalType, Result, Spec, TableConstraint, TypeTag};
use tabspec_convert::{ConversionContext, Handler, Target};

use crate::ast::{
    ColumnDef, CreateTable, Expr, IdentityDef, Literal, ObjectName, SqlType, StructField,
    TableConstraintDef,
};

/// Statement-level switches
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    pub or_replace: bool,
    pub if_not_exists: bool,
    pub ignore_catalog: bool,
    pub ignore_database: bool,
}

/// Builds a dialect-neutral [`CreateTable`] from a spec
#[derive(Debug, Clone, Default)]
pub struct SqlTarget {
    pub options: BuildOptions,
}

impl SqlTarget {
    pub fn new(options: BuildOptions) -> Self {
        Self { options }
    }
}

impl Target for SqlTarget {
    type Type = SqlType;
    type Field = ColumnDef;
    type Output = CreateTable;

    fn name(&self) -> &'static str {
        "sql"
    }

    fn handler(tag: TypeTag) -> Option<Handler<Self>> {
        let handler: Handler<Self> = match tag {
            TypeTag::String => string,
            TypeTag::Binary => binary,
            TypeTag::Integer => integer,
            TypeTag::Float => float,
            TypeTag::Decimal => decimal,
            TypeTag::Interval => interval,
            TypeTag::Array => array,
            TypeTag::Struct => structure,
            TypeTag::Map => map,
            TypeTag::Boolean
            | TypeTag::Date
            | TypeTag::Time
            | TypeTag::Timestamp
            | TypeTag::TimestampTz
            | TypeTag::TimestampLtz
            | TypeTag::TimestampNtz
            | TypeTag::Json
            | TypeTag::Variant
            | TypeTag::Uuid
            | TypeTag::Void
            | TypeTag::Geometry
            | TypeTag::Geography => scalar,
            TypeTag::Duration | TypeTag::Tensor => return None,
        };
        Some(handler)
    }

    fn default_fallback(&self) -> Option<SqlType> {
        Some(SqlType::text())
    }

    fn build_field(&self, column: &Column, ty: SqlType) -> Result<ColumnDef> {
        let mut def = ColumnDef::new(column.name.as_str(), ty);
        def.not_null = !column.is_nullable();
        def.default = column.default_value().map(Literal::from_json);
        def.identity = column.identity().map(|identity| IdentityDef {
            always: identity.always,
            start: identity.start,
            increment: identity.increment,
        });
        if let Some(generated) = &column.generated_as {
            def.generated = Some(transform_expr(
                &generated.source_column,
                generated.transform.as_deref(),
                &generated.transform_args,
            )?);
        }
        Ok(def)
    }

    fn finish(&self, spec: &Spec, columns: &[&Column], fields: Vec<ColumnDef>) -> Result<CreateTable> {
        let selected: HashSet<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        let covered = |names: &[String]| names.iter().all(|n| selected.contains(n.as_str()));

        let mut table = CreateTable::new(ObjectName::parse(
            spec.name(),
            self.options.ignore_catalog,
            self.options.ignore_database,
        )?);
        table.or_replace = self.options.or_replace;
        table.if_not_exists = self.options.if_not_exists;
        table.external = spec.is_external();
        table.columns = fields;

        for constraint in spec.table_constraints() {
            if !covered(constraint.columns()) {
                tracing::debug!(
                    "Skipping constraint {} on unselected columns",
                    constraint.name()
                );
                continue;
            }
            table.constraints.push(match constraint {
                TableConstraint::PrimaryKey { name, columns } => TableConstraintDef::PrimaryKey {
                    name: name.clone(),
                    columns: columns.clone(),
                },
                TableConstraint::ForeignKey {
                    name,
                    columns,
                    references,
                } => TableConstraintDef::ForeignKey {
                    name: name.clone(),
                    columns: columns.clone(),
                    table: ObjectName::parse(&references.table, false, false)?,
                    referred_columns: references.columns.clone().unwrap_or_default(),
                },
            });
        }

        for partition in spec.partitioned_by() {
            if !selected.contains(partition.column.as_str()) {
                continue;
            }
            table.partition_by.push(transform_expr(
                &partition.column,
                partition.transform.as_deref(),
                &partition.transform_args,
            )?);
        }

        if let Some(storage) = spec.storage() {
            table.file_format = storage.format.clone();
            table.location = storage.location.clone();
            table.properties = storage
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
        }

        Ok(table)
    }
}

/// Expression for a partition or generated column
///
/// `bucket`, `truncate`, `cast` and `date_trunc` take exactly one argument;
/// any other transform becomes a plain function call on the column.
pub fn transform_expr(column: &str, transform: Option<&str>, args: &[Value]) -> Result<Expr> {
    let column_expr = Box::new(Expr::Column(column.to_string()));
    let Some(transform) = transform else {
        return Ok(*column_expr);
    };

    let name = transform.to_ascii_lowercase();
    let single = || match args {
        [arg] => Ok(arg),
        _ => Err(Error::validation(format!(
            "The '{}' transform requires exactly 1 argument(s). Got {}.",
            transform,
            args.len()
        ))),
    };

    Ok(match name.as_str() {
        "bucket" => Expr::Bucket {
            count: Literal::from_json(single()?),
            expr: column_expr,
        },
        "truncate" => Expr::Truncate {
            width: Literal::from_json(single()?),
            expr: column_expr,
        },
        "cast" => Expr::Cast {
            expr: column_expr,
            data_type: json_text(single()?),
        },
        "date_trunc" | "trunc" => Expr::DateTrunc {
            unit: json_text(single()?),
            expr: column_expr,
        },
        _ => Expr::Function {
            name: transform.to_string(),
            args: std::iter::once(*column_expr)
                .chain(args.iter().map(|a| Expr::Literal(Literal::from_json(a))))
                .collect(),
        },
    })
}

fn json_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

type Ctx<'a> = ConversionContext<'a, SqlTarget>;

fn string(_ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<SqlType> {
    let length = match ty {
        LogicalType::String { length } => *length,
        _ => None,
    };
    Ok(SqlType::Text { length })
}

fn binary(_ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<SqlType> {
    let length = match ty {
        LogicalType::Binary { length } => *length,
        _ => None,
    };
    Ok(SqlType::Binary { length })
}

fn integer(ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<SqlType> {
    let LogicalType::Integer { bits, signed } = ty else {
        return Err(ctx.unsupported(format!("type '{}'", ty)));
    };
    Ok(SqlType::Integer {
        bits: bits.unwrap_or(32),
        signed: *signed,
    })
}

fn float(ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<SqlType> {
    let LogicalType::Float { bits } = ty else {
        return Err(ctx.unsupported(format!("type '{}'", ty)));
    };
    match bits.unwrap_or(64) {
        16 => {
            let widened = SqlType::Float { bits: 32 };
            ctx.coerce("half-precision floats are widened to 32 bits", ty, &widened)?;
            Ok(widened)
        }
        bits => Ok(SqlType::Float { bits }),
    }
}

fn decimal(ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<SqlType> {
    let LogicalType::Decimal {
        precision, scale, ..
    } = ty
    else {
        return Err(ctx.unsupported(format!("type '{}'", ty)));
    };
    Ok(SqlType::Decimal {
        precision: *precision,
        scale: *scale,
    })
}

fn interval(ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<SqlType> {
    let LogicalType::Interval { start, end } = ty else {
        return Err(ctx.unsupported(format!("type '{}'", ty)));
    };
    Ok(SqlType::Interval {
        start: *start,
        end: *end,
    })
}

fn array(ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<SqlType> {
    let LogicalType::Array { element, size } = ty else {
        return Err(ctx.unsupported(format!("type '{}'", ty)));
    };
    Ok(SqlType::Array {
        element: Box::new(ctx.convert(element)?),
        size: *size,
    })
}

fn structure(ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<SqlType> {
    let LogicalType::Struct { fields } = ty else {
        return Err(ctx.unsupported(format!("type '{}'", ty)));
    };
    let fields = fields
        .iter()
        .map(|member| {
            ctx.convert_member(member).map(|def| StructField {
                name: def.name,
                data_type: def.data_type,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(SqlType::Struct { fields })
}

fn map(ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<SqlType> {
    let LogicalType::Map { key, value, .. } = ty else {
        return Err(ctx.unsupported(format!("type '{}'", ty)));
    };
    let key = ctx.convert(key)?;
    let value = ctx.convert(value)?;
    Ok(SqlType::Map {
        key: Box::new(key),
        value: Box::new(value),
    })
}

/// Types that map one-to-one
fn scalar(ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<SqlType> {
    Ok(match ty {
        LogicalType::Boolean => SqlType::Boolean,
        LogicalType::Date { .. } => SqlType::Date,
        LogicalType::Time { .. } => SqlType::Time,
        LogicalType::Timestamp { .. } => SqlType::Timestamp,
        LogicalType::TimestampTz { .. } => SqlType::TimestampTz,
        LogicalType::TimestampLtz { .. } => SqlType::TimestampLtz,
        LogicalType::TimestampNtz { .. } => SqlType::TimestampNtz,
        LogicalType::Json => SqlType::Json,
        LogicalType::Variant => SqlType::Variant,
        LogicalType::Uuid => SqlType::Uuid,
        LogicalType::Void => SqlType::Void,
        LogicalType::Geometry { srid } => SqlType::Geometry { srid: *srid },
        LogicalType::Geography { srid } => SqlType::Geography { srid: *srid },
        other => return Err(ctx.unsupported(format!("type '{}'", other))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tabspec_convert::{ConvertConfig, Converter};
    use tabspec_core::{
        ColumnConstraint, ForeignKeyReference, GeneratedColumn, Identity, Mode, PartitionColumn,
        Storage, WarningCode,
    };

    fn orders() -> Spec {
        Spec::builder("sales.orders")
            .column(
                Column::new("id", LogicalType::int64())
                    .with_constraint(ColumnConstraint::PrimaryKey)
                    .with_constraint(ColumnConstraint::Identity(Identity {
                        always: false,
                        start: Some(1),
                        increment: None,
                    })),
            )
            .column(
                Column::new("customer_id", LogicalType::int64()).with_constraint(
                    ColumnConstraint::foreign_key(
                        ForeignKeyReference::new("sales.customers").with_columns(["id"]),
                    ),
                ),
            )
            .column(Column::new("placed_at", LogicalType::timestamp()))
            .column(
                Column::new("placed_day", LogicalType::date()).with_generated_as(
                    GeneratedColumn::new("placed_at").with_transform("cast", vec![json!("date")]),
                ),
            )
            .column(
                Column::new("status", LogicalType::string())
                    .with_constraint(ColumnConstraint::default_value("new")),
            )
            .partition(PartitionColumn::new("customer_id").with_transform("bucket", vec![json!(16)]))
            .storage(Storage {
                format: Some("parquet".into()),
                location: None,
                properties: [("b".to_string(), "2".to_string()), ("a".to_string(), "1".to_string())]
                    .into_iter()
                    .collect(),
            })
            .build()
            .unwrap()
    }

    #[test]
    fn builds_columns_and_constraints() {
        let converter = Converter::new(SqlTarget::default(), ConvertConfig::new());
        let table = converter.convert(&orders()).unwrap().target;

        assert_eq!(table.name.parts, vec!["sales", "orders"]);
        assert_eq!(table.columns.len(), 5);
        assert_eq!(
            table.columns[0].identity,
            Some(IdentityDef {
                always: false,
                start: Some(1),
                increment: None
            })
        );
        assert_eq!(table.columns[4].default, Some(Literal::String("new".into())));
        assert_eq!(
            table.columns[3].generated,
            Some(Expr::Cast {
                expr: Box::new(Expr::Column("placed_at".into())),
                data_type: "date".into()
            })
        );
        assert_eq!(table.constraints.len(), 2);
        assert_eq!(
            table.partition_by,
            vec![Expr::Bucket {
                count: Literal::Number("16".into()),
                expr: Box::new(Expr::Column("customer_id".into()))
            }]
        );
        assert_eq!(
            table.properties,
            vec![("a".to_string(), "1".to_string()), ("b".to_string(), "2".to_string())]
        );
    }

    #[test]
    fn filtered_columns_drop_their_constraints() {
        let config = ConvertConfig::new().ignore_columns(["customer_id"]);
        let table = Converter::new(SqlTarget::default(), config)
            .convert(&orders())
            .unwrap()
            .target;

        assert_eq!(table.constraints.len(), 1);
        assert!(matches!(table.constraints[0], TableConstraintDef::PrimaryKey { .. }));
        assert!(table.partition_by.is_empty());
    }

    #[test]
    fn name_parts_dropped_on_request() {
        let target = SqlTarget::new(BuildOptions {
            ignore_database: true,
            ..BuildOptions::default()
        });
        let table = Converter::new(target, ConvertConfig::new())
            .convert(&orders())
            .unwrap()
            .target;
        assert_eq!(table.name.to_string(), "orders");
    }

    #[test]
    fn four_part_names_fail_to_build() {
        let spec = Spec::builder("lake.sales.eu.orders")
            .column(Column::new("id", LogicalType::int64()))
            .build()
            .unwrap();
        let err = Converter::new(SqlTarget::default(), ConvertConfig::new())
            .convert(&spec)
            .unwrap_err();
        assert!(err.to_string().contains("lake.sales.eu.orders"));
    }

    #[test]
    fn transforms_check_argument_counts() {
        let err = transform_expr("d", Some("bucket"), &[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The 'bucket' transform requires exactly 1 argument(s). Got 0."
        );
        assert_eq!(
            transform_expr("d", Some("hash"), &[json!(3)]).unwrap(),
            Expr::Function {
                name: "hash".into(),
                args: vec![
                    Expr::Column("d".into()),
                    Expr::Literal(Literal::Number("3".into()))
                ]
            }
        );
    }

    #[test]
    fn half_floats_and_durations() {
        let spec = Spec::builder("t")
            .column(Column::new("h", LogicalType::float(16).unwrap()))
            .column(Column::new(
                "d",
                LogicalType::Duration {
                    unit: tabspec_core::TimeUnit::Ms,
                },
            ))
            .build()
            .unwrap();

        let converted = Converter::new(SqlTarget::default(), ConvertConfig::new())
            .convert(&spec)
            .unwrap();
        assert_eq!(converted.target.columns[0].data_type, SqlType::Float { bits: 32 });
        assert_eq!(converted.target.columns[1].data_type, SqlType::text());
        let codes: Vec<WarningCode> = converted.warnings.iter().map(|w| w.code).collect();
        assert_eq!(codes, vec![WarningCode::TypeParameterCoerced, WarningCode::TypeFallback]);

        let strict = Converter::new(SqlTarget::default(), ConvertConfig::new().mode(Mode::Strict));
        assert!(strict.convert(&spec).is_err());
    }
}
