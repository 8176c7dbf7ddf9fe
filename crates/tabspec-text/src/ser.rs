//! Spec text serialization
//!
//! Emits the same shape [`crate::de`] accepts. Folded column constraints come
//! out under `table_constraints`, so re-parsing yields an equal [`Spec`].

use serde_json::{json, Map, Value};
use tabspec_core::{
    Column, ColumnConstraint, ForeignKeyReference, LogicalType, PartitionColumn, Spec, Storage,
    TableConstraint,
};

/// Render a [`Spec`] into its text form
pub fn spec_to_value(spec: &Spec) -> Value {
    let mut map = Map::new();
    map.insert("name".to_string(), json!(spec.name()));
    map.insert("version".to_string(), json!(spec.version()));
    map.insert("yads_spec_version".to_string(), json!(spec.spec_format_version()));
    if let Some(description) = spec.description() {
        map.insert("description".to_string(), json!(description));
    }
    if spec.is_external() {
        map.insert("external".to_string(), Value::Bool(true));
    }
    if !spec.metadata().is_empty() {
        map.insert("metadata".to_string(), Value::Object(spec.metadata().clone()));
    }
    if let Some(storage) = spec.storage() {
        map.insert("storage".to_string(), storage_to_value(storage));
    }
    if !spec.partitioned_by().is_empty() {
        let partitions = spec.partitioned_by().iter().map(partition_to_value).collect();
        map.insert("partitioned_by".to_string(), Value::Array(partitions));
    }
    if !spec.table_constraints().is_empty() {
        let constraints = spec
            .table_constraints()
            .iter()
            .map(table_constraint_to_value)
            .collect();
        map.insert("table_constraints".to_string(), Value::Array(constraints));
    }
    let columns = spec.columns().iter().map(column_to_value).collect();
    map.insert("columns".to_string(), Value::Array(columns));
    Value::Object(map)
}

fn column_to_value(column: &Column) -> Value {
    let mut map = Map::new();
    map.insert("name".to_string(), json!(column.name));
    write_type(&mut map, &column.data_type);
    if let Some(description) = &column.description {
        map.insert("description".to_string(), json!(description));
    }
    if !column.metadata.is_empty() {
        map.insert("metadata".to_string(), Value::Object(column.metadata.clone()));
    }
    if !column.constraints.is_empty() {
        map.insert("constraints".to_string(), constraints_to_value(&column.constraints));
    }
    if let Some(generated) = &column.generated_as {
        let mut generated_map = Map::new();
        generated_map.insert("column".to_string(), json!(generated.source_column));
        write_transform(&mut generated_map, generated.transform.as_deref(), &generated.transform_args);
        map.insert("generated_as".to_string(), Value::Object(generated_map));
    }
    Value::Object(map)
}

fn type_to_value(ty: &LogicalType) -> Value {
    let mut map = Map::new();
    write_type(&mut map, ty);
    Value::Object(map)
}

fn write_type(map: &mut Map<String, Value>, ty: &LogicalType) {
    map.insert("type".to_string(), json!(ty.tag().as_str()));

    let mut params = Map::new();
    let mut param = |key: &str, value: Value| {
        params.insert(key.to_string(), value);
    };

    match ty {
        LogicalType::String { length } | LogicalType::Binary { length } => {
            if let Some(length) = length {
                param("length", json!(length));
            }
        }
        LogicalType::Integer { bits, signed } => {
            if let Some(bits) = bits {
                param("bits", json!(bits));
            }
            if !signed {
                param("signed", Value::Bool(false));
            }
        }
        LogicalType::Float { bits } | LogicalType::Date { bits } => {
            if let Some(bits) = bits {
                param("bits", json!(bits));
            }
        }
        LogicalType::Decimal {
            precision,
            scale,
            bits,
        } => {
            if let Some(precision) = precision {
                param("precision", json!(precision));
            }
            if let Some(scale) = scale {
                param("scale", json!(scale));
            }
            if let Some(bits) = bits {
                param("bits", json!(bits));
            }
        }
        LogicalType::Time { unit, bits } => {
            param("unit", json!(unit.as_str()));
            if let Some(bits) = bits {
                param("bits", json!(bits));
            }
        }
        LogicalType::Timestamp { unit }
        | LogicalType::TimestampLtz { unit }
        | LogicalType::TimestampNtz { unit }
        | LogicalType::Duration { unit } => param("unit", json!(unit.as_str())),
        LogicalType::TimestampTz { unit, tz } => {
            param("unit", json!(unit.as_str()));
            param("tz", json!(tz));
        }
        LogicalType::Interval { start, end } => {
            param("interval_start", json!(start.as_str()));
            if let Some(end) = end {
                param("interval_end", json!(end.as_str()));
            }
        }
        LogicalType::Array { size, .. } => {
            if let Some(size) = size {
                param("size", json!(size));
            }
        }
        LogicalType::Map { keys_sorted, .. } => {
            if *keys_sorted {
                param("keys_sorted", Value::Bool(true));
            }
        }
        LogicalType::Tensor { shape, .. } => param("shape", json!(shape)),
        LogicalType::Geometry { srid } | LogicalType::Geography { srid } => {
            if let Some(srid) = srid {
                param("srid", json!(srid));
            }
        }
        LogicalType::Boolean
        | LogicalType::Struct { .. }
        | LogicalType::Json
        | LogicalType::Variant
        | LogicalType::Uuid
        | LogicalType::Void => {}
    }

    if !params.is_empty() {
        map.insert("params".to_string(), Value::Object(params));
    }

    match ty {
        LogicalType::Array { element, .. } | LogicalType::Tensor { element, .. } => {
            map.insert("element".to_string(), type_to_value(element));
        }
        LogicalType::Struct { fields } => {
            let fields = fields.iter().map(column_to_value).collect();
            map.insert("fields".to_string(), Value::Array(fields));
        }
        LogicalType::Map { key, value, .. } => {
            map.insert("key".to_string(), type_to_value(key));
            map.insert("value".to_string(), type_to_value(value));
        }
        _ => {}
    }
}

fn constraints_to_value(constraints: &[ColumnConstraint]) -> Value {
    let mut map = Map::new();
    for constraint in constraints {
        match constraint {
            ColumnConstraint::NotNull => {
                map.insert("not_null".to_string(), Value::Bool(true));
            }
            ColumnConstraint::PrimaryKey => {
                map.insert("primary_key".to_string(), Value::Bool(true));
            }
            ColumnConstraint::Default { value } => {
                map.insert("default".to_string(), value.clone());
            }
            ColumnConstraint::Identity(identity) => {
                let mut identity_map = Map::new();
                identity_map.insert("always".to_string(), Value::Bool(identity.always));
                if let Some(start) = identity.start {
                    identity_map.insert("start".to_string(), json!(start));
                }
                if let Some(increment) = identity.increment {
                    identity_map.insert("increment".to_string(), json!(increment));
                }
                map.insert("identity".to_string(), Value::Object(identity_map));
            }
            ColumnConstraint::ForeignKey { name, references } => {
                let mut fk = Map::new();
                if let Some(name) = name {
                    fk.insert("name".to_string(), json!(name));
                }
                fk.insert("references".to_string(), reference_to_value(references));
                map.insert("foreign_key".to_string(), Value::Object(fk));
            }
        }
    }
    Value::Object(map)
}

fn reference_to_value(reference: &ForeignKeyReference) -> Value {
    let mut map = Map::new();
    map.insert("table".to_string(), json!(reference.table));
    if let Some(columns) = &reference.columns {
        map.insert("columns".to_string(), json!(columns));
    }
    Value::Object(map)
}

fn table_constraint_to_value(constraint: &TableConstraint) -> Value {
    match constraint {
        TableConstraint::PrimaryKey { name, columns } => json!({
            "type": "primary_key",
            "name": name,
            "columns": columns,
        }),
        TableConstraint::ForeignKey {
            name,
            columns,
            references,
        } => json!({
            "type": "foreign_key",
            "name": name,
            "columns": columns,
            "references": reference_to_value(references),
        }),
    }
}

fn storage_to_value(storage: &Storage) -> Value {
    let mut map = Map::new();
    if let Some(format) = &storage.format {
        map.insert("format".to_string(), json!(format));
    }
    if let Some(location) = &storage.location {
        map.insert("location".to_string(), json!(location));
    }
    if !storage.properties.is_empty() {
        map.insert("tbl_properties".to_string(), json!(storage.properties));
    }
    Value::Object(map)
}

fn partition_to_value(partition: &PartitionColumn) -> Value {
    let mut map = Map::new();
    map.insert("column".to_string(), json!(partition.column));
    write_transform(&mut map, partition.transform.as_deref(), &partition.transform_args);
    Value::Object(map)
}

fn write_transform(map: &mut Map<String, Value>, transform: Option<&str>, args: &[Value]) {
    if let Some(transform) = transform {
        map.insert("transform".to_string(), json!(transform));
    }
    if !args.is_empty() {
        map.insert("transform_args".to_string(), Value::Array(args.to_vec()));
    }
}
