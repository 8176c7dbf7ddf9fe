//! Spec text deserialization
//!
//! Key sets are closed at every level. Unknown keys are reported sorted,
//! before any [`Spec`] is built.

use serde_json::{Map, Value};
use tabspec_core::{
    Column, ColumnConstraint, Error, ForeignKeyReference, GeneratedColumn, Identity, IntervalUnit,
    LogicalType, Metadata, PartitionColumn, Result, Spec, Storage, TableConstraint, TimeUnit,
    TypeAlias, TypeTag, DEFAULT_TIMEZONE,
};

const SPEC_KEYS: &[&str] = &[
    "name",
    "version",
    "yads_spec_version",
    "description",
    "external",
    "metadata",
    "storage",
    "partitioned_by",
    "table_constraints",
    "columns",
];
const COLUMN_KEYS: &[&str] = &[
    "name",
    "type",
    "params",
    "element",
    "fields",
    "key",
    "value",
    "description",
    "metadata",
    "constraints",
    "generated_as",
];
const FIELD_KEYS: &[&str] = &[
    "name",
    "type",
    "params",
    "element",
    "fields",
    "key",
    "value",
    "description",
    "metadata",
    "constraints",
];
const TYPE_KEYS: &[&str] = &["type", "params", "element", "fields", "key", "value"];
const STORAGE_KEYS: &[&str] = &["format", "location", "tbl_properties"];
const TRANSFORM_KEYS: &[&str] = &["column", "transform", "transform_args"];
const CONSTRAINT_KEYS: &[&str] = &["not_null", "primary_key", "default", "identity", "foreign_key"];
const IDENTITY_KEYS: &[&str] = &["always", "start", "increment"];
const FOREIGN_KEY_KEYS: &[&str] = &["name", "references"];
const REFERENCE_KEYS: &[&str] = &["table", "columns"];
const TABLE_CONSTRAINT_KEYS: &[&str] = &["type", "name", "columns", "references"];

/// Build a [`Spec`] from its parsed text form
pub fn spec_from_value(value: &Value) -> Result<Spec> {
    let map = as_object(value, "spec")?;
    check_keys(map, SPEC_KEYS, "spec")?;

    let name = required_str(map, "name", "spec")?;
    let mut builder = Spec::builder(name);

    if let Some(version) = map.get("version") {
        builder = builder.version(positive_u32(version, "version", "spec")?);
    }
    if let Some(version) = map.get("yads_spec_version") {
        builder = builder.spec_format_version(as_str(version, "yads_spec_version", "spec")?);
    }
    if let Some(description) = optional_str(map, "description", "spec")? {
        builder = builder.description(description);
    }
    if let Some(external) = optional_bool(map, "external", "spec")? {
        builder = builder.external(external);
    }
    if let Some(metadata) = map.get("metadata") {
        builder = builder.metadata_map(parse_metadata(metadata, "spec")?);
    }
    if let Some(storage) = map.get("storage") {
        builder = builder.storage(parse_storage(storage)?);
    }
    if let Some(partitions) = map.get("partitioned_by") {
        for item in as_array(partitions, "partitioned_by", "spec")? {
            builder = builder.partition(parse_partition(item)?);
        }
    }
    if let Some(constraints) = map.get("table_constraints") {
        for item in as_array(constraints, "table_constraints", "spec")? {
            builder = builder.table_constraint(parse_table_constraint(item)?);
        }
    }

    let columns = map
        .get("columns")
        .ok_or_else(|| Error::validation(format!("Spec '{}' is missing required key 'columns'.", name)))?;
    for item in as_array(columns, "columns", "spec")? {
        builder = builder.column(parse_column(item, true)?);
    }

    builder.build()
}

fn parse_column(value: &Value, top_level: bool) -> Result<Column> {
    let kind = if top_level { "column" } else { "field" };
    let map = as_object(value, kind)?;
    let name = required_str(map, "name", kind)?;
    let context = format!("{} '{}'", kind, name);
    check_keys(map, if top_level { COLUMN_KEYS } else { FIELD_KEYS }, &context)?;

    let mut column = Column::new(name, parse_type(map, &context)?);
    if let Some(description) = optional_str(map, "description", &context)? {
        column = column.with_description(description);
    }
    if let Some(metadata) = map.get("metadata") {
        column.metadata = parse_metadata(metadata, &context)?;
    }
    if let Some(constraints) = map.get("constraints") {
        column.constraints = parse_column_constraints(constraints, &context)?;
    }
    if let Some(generated) = map.get("generated_as") {
        column = column.with_generated_as(parse_generated(generated, &context)?);
    }
    Ok(column)
}

/// Parse `type` plus its `params` and nested type keys
fn parse_type(map: &Map<String, Value>, context: &str) -> Result<LogicalType> {
    let token = required_str(map, "type", context)?;
    let alias = TypeAlias::resolve(token)
        .ok_or_else(|| Error::validation(format!("Unknown type '{}' in {}.", token, context)))?;

    check_nested_keys(map, alias.tag, context)?;

    let empty = Map::new();
    let params_map = match map.get("params") {
        Some(params) => as_object(params, &format!("params of {}", context))?,
        None => &empty,
    };
    let mut params = Params::new(params_map, alias.tag, context);

    let ty = match alias.tag {
        TypeTag::String => LogicalType::String {
            length: params.u32("length")?,
        },
        TypeTag::Binary => LogicalType::Binary {
            length: params.u32("length")?,
        },
        TypeTag::Boolean => LogicalType::Boolean,
        TypeTag::Integer => LogicalType::Integer {
            bits: params.u16("bits")?.or(alias.bits),
            signed: params.bool("signed")?.unwrap_or(alias.signed),
        },
        TypeTag::Float => LogicalType::Float {
            bits: params.u16("bits")?.or(alias.bits),
        },
        TypeTag::Decimal => LogicalType::Decimal {
            precision: params.u32("precision")?,
            scale: params.i32("scale")?,
            bits: params.u16("bits")?,
        },
        TypeTag::Date => LogicalType::Date {
            bits: params.u16("bits")?,
        },
        TypeTag::Time => LogicalType::Time {
            unit: params.time_unit("unit")?.unwrap_or(TimeUnit::Ms),
            bits: params.u16("bits")?,
        },
        TypeTag::Timestamp => LogicalType::Timestamp {
            unit: params.time_unit("unit")?.unwrap_or(TimeUnit::Ns),
        },
        TypeTag::TimestampTz => LogicalType::TimestampTz {
            unit: params.time_unit("unit")?.unwrap_or(TimeUnit::Ns),
            tz: params
                .string("tz")?
                .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
        },
        TypeTag::TimestampLtz => LogicalType::TimestampLtz {
            unit: params.time_unit("unit")?.unwrap_or(TimeUnit::Ns),
        },
        TypeTag::TimestampNtz => LogicalType::TimestampNtz {
            unit: params.time_unit("unit")?.unwrap_or(TimeUnit::Ns),
        },
        TypeTag::Duration => LogicalType::Duration {
            unit: params.time_unit("unit")?.unwrap_or(TimeUnit::Ns),
        },
        TypeTag::Interval => LogicalType::Interval {
            start: params.interval_unit("interval_start")?.ok_or_else(|| {
                Error::invalid_type_parameters(format!(
                    "interval in {} requires the 'interval_start' parameter.",
                    context
                ))
            })?,
            end: params.interval_unit("interval_end")?,
        },
        TypeTag::Array => LogicalType::Array {
            element: Box::new(parse_nested(map, "element", context)?),
            size: params.u32("size")?,
        },
        TypeTag::Struct => {
            let fields = map.get("fields").ok_or_else(|| {
                Error::validation(format!("struct type in {} requires 'fields'.", context))
            })?;
            let fields = as_array(fields, "fields", context)?
                .iter()
                .map(|field| parse_column(field, false))
                .collect::<Result<Vec<_>>>()?;
            LogicalType::Struct { fields }
        }
        TypeTag::Map => LogicalType::Map {
            key: Box::new(parse_nested(map, "key", context)?),
            value: Box::new(parse_nested(map, "value", context)?),
            keys_sorted: params.bool("keys_sorted")?.unwrap_or(false),
        },
        TypeTag::Tensor => LogicalType::Tensor {
            element: Box::new(parse_nested(map, "element", context)?),
            shape: params.u32_list("shape")?.ok_or_else(|| {
                Error::invalid_type_parameters(format!(
                    "tensor in {} requires the 'shape' parameter.",
                    context
                ))
            })?,
        },
        TypeTag::Json => LogicalType::Json,
        TypeTag::Variant => LogicalType::Variant,
        TypeTag::Uuid => LogicalType::Uuid,
        TypeTag::Void => LogicalType::Void,
        TypeTag::Geometry => LogicalType::Geometry {
            srid: params.u32("srid")?,
        },
        TypeTag::Geography => LogicalType::Geography {
            srid: params.u32("srid")?,
        },
    };

    params.finish()?;
    ty.validate()?;
    Ok(ty)
}

fn check_nested_keys(map: &Map<String, Value>, tag: TypeTag, context: &str) -> Result<()> {
    let allowed: &[&str] = match tag {
        TypeTag::Array | TypeTag::Tensor => &["element"],
        TypeTag::Struct => &["fields"],
        TypeTag::Map => &["key", "value"],
        _ => &[],
    };
    for key in ["element", "fields", "key", "value"] {
        if map.contains_key(key) && !allowed.contains(&key) {
            return Err(Error::validation(format!(
                "'{}' is not valid for {} type in {}.",
                key, tag, context
            )));
        }
    }
    Ok(())
}

fn parse_nested(map: &Map<String, Value>, key: &str, context: &str) -> Result<LogicalType> {
    let value = map.get(key).ok_or_else(|| {
        Error::validation(format!("Type in {} is missing required key '{}'.", context, key))
    })?;
    let nested_context = format!("{} of {}", key, context);
    let nested = as_object(value, &nested_context)?;
    check_keys(nested, TYPE_KEYS, &nested_context)?;
    parse_type(nested, &nested_context)
}

fn parse_column_constraints(value: &Value, context: &str) -> Result<Vec<ColumnConstraint>> {
    let constraints_context = format!("constraints of {}", context);
    let map = as_object(value, &constraints_context)?;
    check_keys(map, CONSTRAINT_KEYS, &constraints_context)?;

    let mut constraints = Vec::new();
    if optional_bool(map, "not_null", &constraints_context)?.unwrap_or(false) {
        constraints.push(ColumnConstraint::NotNull);
    }
    if optional_bool(map, "primary_key", &constraints_context)?.unwrap_or(false) {
        constraints.push(ColumnConstraint::PrimaryKey);
    }
    if let Some(value) = map.get("default") {
        constraints.push(ColumnConstraint::default_value(value.clone()));
    }
    if let Some(identity) = map.get("identity") {
        let identity_context = format!("identity of {}", context);
        let identity = as_object(identity, &identity_context)?;
        check_keys(identity, IDENTITY_KEYS, &identity_context)?;
        constraints.push(ColumnConstraint::Identity(Identity {
            always: optional_bool(identity, "always", &identity_context)?.unwrap_or(true),
            start: optional_i64(identity, "start", &identity_context)?,
            increment: optional_i64(identity, "increment", &identity_context)?,
        }));
    }
    if let Some(foreign_key) = map.get("foreign_key") {
        let fk_context = format!("foreign_key of {}", context);
        let foreign_key = as_object(foreign_key, &fk_context)?;
        check_keys(foreign_key, FOREIGN_KEY_KEYS, &fk_context)?;
        let references = foreign_key.get("references").ok_or_else(|| {
            Error::validation(format!("{} is missing required key 'references'.", fk_context))
        })?;
        constraints.push(ColumnConstraint::ForeignKey {
            name: optional_str(foreign_key, "name", &fk_context)?.map(str::to_string),
            references: parse_reference(references, &fk_context)?,
        });
    }
    Ok(constraints)
}

fn parse_reference(value: &Value, context: &str) -> Result<ForeignKeyReference> {
    let reference_context = format!("references of {}", context);
    let map = as_object(value, &reference_context)?;
    check_keys(map, REFERENCE_KEYS, &reference_context)?;
    let mut reference = ForeignKeyReference::new(required_str(map, "table", &reference_context)?);
    if let Some(columns) = map.get("columns") {
        reference.columns = Some(string_list(columns, "columns", &reference_context)?);
    }
    Ok(reference)
}

fn parse_generated(value: &Value, context: &str) -> Result<GeneratedColumn> {
    let generated_context = format!("generated_as of {}", context);
    let map = as_object(value, &generated_context)?;
    check_keys(map, TRANSFORM_KEYS, &generated_context)?;
    Ok(GeneratedColumn {
        source_column: required_str(map, "column", &generated_context)?.to_string(),
        transform: optional_str(map, "transform", &generated_context)?.map(str::to_string),
        transform_args: transform_args(map, &generated_context)?,
    })
}

fn parse_partition(value: &Value) -> Result<PartitionColumn> {
    let map = as_object(value, "partitioned_by item")?;
    check_keys(map, TRANSFORM_KEYS, "partitioned_by item")?;
    Ok(PartitionColumn {
        column: required_str(map, "column", "partitioned_by item")?.to_string(),
        transform: optional_str(map, "transform", "partitioned_by item")?.map(str::to_string),
        transform_args: transform_args(map, "partitioned_by item")?,
    })
}

fn transform_args(map: &Map<String, Value>, context: &str) -> Result<Vec<Value>> {
    match map.get("transform_args") {
        Some(args) => Ok(as_array(args, "transform_args", context)?.clone()),
        None => Ok(Vec::new()),
    }
}

fn parse_storage(value: &Value) -> Result<Storage> {
    let map = as_object(value, "storage")?;
    check_keys(map, STORAGE_KEYS, "storage")?;
    let mut storage = Storage {
        format: optional_str(map, "format", "storage")?.map(str::to_string),
        location: optional_str(map, "location", "storage")?.map(str::to_string),
        ..Storage::default()
    };
    if let Some(properties) = map.get("tbl_properties") {
        for (key, value) in as_object(properties, "tbl_properties")? {
            let value = as_str(value, key, "tbl_properties")?;
            storage.properties.insert(key.clone(), value.to_string());
        }
    }
    Ok(storage)
}

fn parse_table_constraint(value: &Value) -> Result<TableConstraint> {
    let map = as_object(value, "table constraint")?;
    check_keys(map, TABLE_CONSTRAINT_KEYS, "table constraint")?;
    let kind = required_str(map, "type", "table constraint")?;
    let name = required_str(map, "name", "table constraint")?;
    let context = format!("table constraint '{}'", name);
    let columns = map
        .get("columns")
        .ok_or_else(|| Error::validation(format!("{} is missing required key 'columns'.", context)))
        .and_then(|columns| string_list(columns, "columns", &context))?;

    match kind.to_ascii_lowercase().as_str() {
        "primary_key" => {
            if map.contains_key("references") {
                return Err(Error::validation(format!(
                    "'references' is not valid for primary key {}.",
                    context
                )));
            }
            Ok(TableConstraint::primary_key(name, columns))
        }
        "foreign_key" => {
            let references = map.get("references").ok_or_else(|| {
                Error::validation(format!("{} is missing required key 'references'.", context))
            })?;
            Ok(TableConstraint::foreign_key(
                name,
                columns,
                parse_reference(references, &context)?,
            ))
        }
        other => Err(Error::validation(format!(
            "Unknown table constraint type '{}' in {}. Expected 'primary_key' or 'foreign_key'.",
            other, context
        ))),
    }
}

fn parse_metadata(value: &Value, context: &str) -> Result<Metadata> {
    Ok(as_object(value, &format!("metadata of {}", context))?.clone())
}

/// Type parameters with consumption tracking, so leftovers can be reported
struct Params<'a> {
    map: &'a Map<String, Value>,
    tag: TypeTag,
    context: &'a str,
    used: Vec<&'static str>,
}

impl<'a> Params<'a> {
    fn new(map: &'a Map<String, Value>, tag: TypeTag, context: &'a str) -> Self {
        Self {
            map,
            tag,
            context,
            used: Vec::new(),
        }
    }

    fn take(&mut self, key: &'static str) -> Option<&'a Value> {
        self.used.push(key);
        self.map.get(key).filter(|value| !value.is_null())
    }

    fn invalid(&self, key: &str, expected: &str, value: &Value) -> Error {
        Error::invalid_type_parameters(format!(
            "{} parameter '{}' in {} must be {}, got {}.",
            self.tag, key, self.context, expected, value
        ))
    }

    fn u32(&mut self, key: &'static str) -> Result<Option<u32>> {
        match self.take(key) {
            None => Ok(None),
            Some(value) => value
                .as_i64()
                .and_then(|n| u32::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| self.invalid(key, "a non-negative integer", value)),
        }
    }

    fn u16(&mut self, key: &'static str) -> Result<Option<u16>> {
        match self.take(key) {
            None => Ok(None),
            Some(value) => value
                .as_i64()
                .and_then(|n| u16::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| self.invalid(key, "a non-negative integer", value)),
        }
    }

    fn i32(&mut self, key: &'static str) -> Result<Option<i32>> {
        match self.take(key) {
            None => Ok(None),
            Some(value) => value
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| self.invalid(key, "an integer", value)),
        }
    }

    fn bool(&mut self, key: &'static str) -> Result<Option<bool>> {
        match self.take(key) {
            None => Ok(None),
            Some(value) => value
                .as_bool()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "a boolean", value)),
        }
    }

    fn string(&mut self, key: &'static str) -> Result<Option<String>> {
        match self.take(key) {
            None => Ok(None),
            Some(value) => value
                .as_str()
                .map(|s| Some(s.to_string()))
                .ok_or_else(|| self.invalid(key, "a string", value)),
        }
    }

    fn time_unit(&mut self, key: &'static str) -> Result<Option<TimeUnit>> {
        self.string(key)?.map(|unit| unit.parse()).transpose()
    }

    fn interval_unit(&mut self, key: &'static str) -> Result<Option<IntervalUnit>> {
        self.string(key)?.map(|unit| unit.parse()).transpose()
    }

    fn u32_list(&mut self, key: &'static str) -> Result<Option<Vec<u32>>> {
        match self.take(key) {
            None => Ok(None),
            Some(value) => value
                .as_array()
                .and_then(|items| {
                    items
                        .iter()
                        .map(|item| item.as_i64().and_then(|n| u32::try_from(n).ok()))
                        .collect::<Option<Vec<_>>>()
                })
                .map(Some)
                .ok_or_else(|| self.invalid(key, "a list of non-negative integers", value)),
        }
    }

    fn finish(self) -> Result<()> {
        let mut unknown: Vec<&str> = self
            .map
            .keys()
            .map(String::as_str)
            .filter(|key| !self.used.contains(key))
            .collect();
        if unknown.is_empty() {
            return Ok(());
        }
        unknown.sort_unstable();
        Err(Error::invalid_type_parameters(format!(
            "Unknown parameter(s) for {} in {}: {}.",
            self.tag,
            self.context,
            unknown.join(", ")
        )))
    }
}

fn check_keys(map: &Map<String, Value>, allowed: &[&str], context: &str) -> Result<()> {
    let mut unknown: Vec<&str> = map
        .keys()
        .map(String::as_str)
        .filter(|key| !allowed.contains(key))
        .collect();
    if unknown.is_empty() {
        return Ok(());
    }
    unknown.sort_unstable();
    Err(Error::validation(format!(
        "Unknown key(s) in {}: {}.",
        context,
        unknown.join(", ")
    )))
}

fn as_object<'a>(value: &'a Value, context: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| Error::validation(format!("Expected an object for {}, got {}.", context, value)))
}

fn as_array<'a>(value: &'a Value, key: &str, context: &str) -> Result<&'a Vec<Value>> {
    value.as_array().ok_or_else(|| {
        Error::validation(format!("'{}' in {} must be a list, got {}.", key, context, value))
    })
}

fn as_str<'a>(value: &'a Value, key: &str, context: &str) -> Result<&'a str> {
    value.as_str().ok_or_else(|| {
        Error::validation(format!("'{}' in {} must be a string, got {}.", key, context, value))
    })
}

fn required_str<'a>(map: &'a Map<String, Value>, key: &str, context: &str) -> Result<&'a str> {
    let value = map.get(key).ok_or_else(|| {
        Error::validation(format!("{} is missing required key '{}'.", context, key))
    })?;
    as_str(value, key, context)
}

fn optional_str<'a>(map: &'a Map<String, Value>, key: &str, context: &str) -> Result<Option<&'a str>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => as_str(value, key, context).map(Some),
    }
}

fn optional_bool(map: &Map<String, Value>, key: &str, context: &str) -> Result<Option<bool>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_bool().map(Some).ok_or_else(|| {
            Error::validation(format!("'{}' in {} must be a boolean, got {}.", key, context, value))
        }),
    }
}

fn optional_i64(map: &Map<String, Value>, key: &str, context: &str) -> Result<Option<i64>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_i64().map(Some).ok_or_else(|| {
            Error::validation(format!("'{}' in {} must be an integer, got {}.", key, context, value))
        }),
    }
}

fn positive_u32(value: &Value, key: &str, context: &str) -> Result<u32> {
    value
        .as_i64()
        .filter(|n| *n > 0)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| {
            Error::validation(format!(
                "'{}' in {} must be a positive integer, got {}.",
                key, context, value
            ))
        })
}

fn string_list(value: &Value, key: &str, context: &str) -> Result<Vec<String>> {
    as_array(value, key, context)?
        .iter()
        .map(|item| as_str(item, key, context).map(str::to_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn minimal_spec_defaults_version() {
        let spec = spec_from_value(&json!({
            "name": "t",
            "columns": [{"name": "id", "type": "bigint"}]
        }))
        .unwrap();

        assert_eq!(spec.version(), 1);
        assert_eq!(spec.spec_format_version(), "0.0.2");
        assert_eq!(spec.columns()[0].data_type, LogicalType::int64());
    }

    #[test]
    fn unknown_top_level_keys_sorted() {
        let err = spec_from_value(&json!({
            "name": "t",
            "zeta": 1,
            "alpha": 2,
            "columns": [{"name": "id", "type": "int"}]
        }))
        .unwrap_err();

        assert_eq!(err.to_string(), "Unknown key(s) in spec: alpha, zeta.");
    }

    #[test]
    fn unknown_column_key_rejected() {
        let err = spec_from_value(&json!({
            "name": "t",
            "columns": [{"name": "id", "type": "int", "nullable": false}]
        }))
        .unwrap_err();

        assert_eq!(err.to_string(), "Unknown key(s) in column 'id': nullable.");
    }

    #[test]
    fn struct_fields_cannot_be_generated() {
        let err = spec_from_value(&json!({
            "name": "t",
            "columns": [{
                "name": "s",
                "type": "struct",
                "fields": [{"name": "a", "type": "int", "generated_as": {"column": "b"}}]
            }]
        }))
        .unwrap_err();

        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn unknown_params_rejected() {
        let err = spec_from_value(&json!({
            "name": "t",
            "columns": [{"name": "s", "type": "string", "params": {"length": 10, "collation": "C"}}]
        }))
        .unwrap_err();

        assert!(matches!(err, Error::InvalidTypeParameters { .. }));
        assert!(err.to_string().contains("collation"));
    }

    #[test]
    fn negative_bits_rejected() {
        let err = spec_from_value(&json!({
            "name": "t",
            "columns": [{"name": "n", "type": "integer", "params": {"bits": -8}}]
        }))
        .unwrap_err();

        assert!(matches!(err, Error::InvalidTypeParameters { .. }));
    }

    #[test]
    fn unknown_unit_rejected() {
        let err = spec_from_value(&json!({
            "name": "t",
            "columns": [{"name": "ts", "type": "timestamp", "params": {"unit": "fortnight"}}]
        }))
        .unwrap_err();

        assert!(matches!(err, Error::InvalidTypeParameters { .. }));
    }

    #[test]
    fn type_tokens_case_insensitive() {
        let spec = spec_from_value(&json!({
            "name": "t",
            "columns": [{"name": "flag", "type": "BOOLEAN"}, {"name": "n", "type": "UInt8"}]
        }))
        .unwrap();

        assert_eq!(spec.columns()[0].data_type, LogicalType::Boolean);
        assert_eq!(
            spec.columns()[1].data_type,
            LogicalType::Integer {
                bits: Some(8),
                signed: false
            }
        );
    }

    #[test]
    fn nested_types_parsed() {
        let spec = spec_from_value(&json!({
            "name": "t",
            "columns": [
                {"name": "tags", "type": "array", "element": {"type": "string"}, "params": {"size": 3}},
                {"name": "attrs", "type": "map", "key": {"type": "string"}, "value": {"type": "int"}},
                {"name": "embedding", "type": "tensor", "element": {"type": "float32"}, "params": {"shape": [2, 3]}},
                {"name": "period", "type": "interval", "params": {"interval_start": "year", "interval_end": "month"}}
            ]
        }))
        .unwrap();

        assert_eq!(
            spec.columns()[0].data_type,
            LogicalType::fixed_array(LogicalType::string(), 3).unwrap()
        );
        assert_eq!(
            spec.columns()[1].data_type,
            LogicalType::map(LogicalType::string(), LogicalType::int32())
        );
        assert_eq!(spec.columns()[2].data_type.to_string(), "tensor<float(bits=32), shape=[2, 3]>");
        assert_eq!(spec.columns()[3].data_type.to_string(), "interval(YEAR to MONTH)");
    }

    #[test]
    fn element_on_scalar_rejected() {
        let err = spec_from_value(&json!({
            "name": "t",
            "columns": [{"name": "n", "type": "int", "element": {"type": "int"}}]
        }))
        .unwrap_err();

        assert!(err.to_string().contains("'element' is not valid"));
    }

    #[test]
    fn constraints_parsed() {
        let spec = spec_from_value(&json!({
            "name": "orders",
            "columns": [
                {"name": "id", "type": "bigint", "constraints": {
                    "not_null": true,
                    "primary_key": true,
                    "identity": {"always": false, "start": 10, "increment": 5}
                }},
                {"name": "status", "type": "string", "constraints": {"default": "new", "not_null": false}},
                {"name": "customer_id", "type": "bigint", "constraints": {
                    "foreign_key": {"references": {"table": "customers", "columns": ["id"]}}
                }}
            ]
        }))
        .unwrap();

        assert_eq!(
            spec.columns()[0].constraints,
            vec![
                ColumnConstraint::NotNull,
                ColumnConstraint::Identity(Identity {
                    always: false,
                    start: Some(10),
                    increment: Some(5)
                })
            ]
        );
        assert_eq!(spec.columns()[1].default_value(), Some(&json!("new")));
        assert!(spec.columns()[1].is_nullable());

        let names: Vec<&str> = spec.table_constraints().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["pk_orders", "fk_orders_customer_id"]);
    }

    #[test]
    fn unknown_table_constraint_type_rejected() {
        let err = spec_from_value(&json!({
            "name": "t",
            "columns": [{"name": "id", "type": "int"}],
            "table_constraints": [{"type": "unique", "name": "u", "columns": ["id"]}]
        }))
        .unwrap_err();

        assert!(err.to_string().contains("unique"));
    }

    #[test]
    fn missing_columns_rejected() {
        let err = spec_from_value(&json!({"name": "t"})).unwrap_err();
        assert!(err.to_string().contains("columns"));
    }

    #[test]
    fn zero_version_rejected() {
        let err = spec_from_value(&json!({
            "name": "t",
            "version": 0,
            "columns": [{"name": "id", "type": "int"}]
        }))
        .unwrap_err();

        assert!(matches!(err, Error::Validation { .. }));
    }
}
