//! Validation models
//!
//! [`ModelTarget`] turns a spec into a [`ValidationModel`]: typed fields with
//! JSON-Schema style annotations (bounds, lengths, digits), nested models for
//! structs, and constraint details under the `x-tabspec` key.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tabspec_core::{Column, LogicalType, Result, Spec, TableConstraint, TypeTag};

use crate::engine::{ConversionContext, Handler, Target};

/// Annotation key for constraint details the host type cannot express
pub const EXTENSION_KEY: &str = "x-tabspec";

/// Host-language value type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostType {
    Str,
    Int,
    Float,
    Decimal,
    Bool,
    Bytes,
    Date,
    Time,
    DateTime,
    TimeDelta,
    Uuid,
    /// Free-form JSON object
    Json,
    Any,
    /// Only ever null
    None,
    List { item: Box<HostType> },
    Dict { key: Box<HostType>, value: Box<HostType> },
    Model { model: Box<ValidationModel> },
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str => write!(f, "str"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::Decimal => write!(f, "Decimal"),
            Self::Bool => write!(f, "bool"),
            Self::Bytes => write!(f, "bytes"),
            Self::Date => write!(f, "date"),
            Self::Time => write!(f, "time"),
            Self::DateTime => write!(f, "datetime"),
            Self::TimeDelta => write!(f, "timedelta"),
            Self::Uuid => write!(f, "UUID"),
            Self::Json => write!(f, "dict"),
            Self::Any => write!(f, "Any"),
            Self::None => write!(f, "None"),
            Self::List { item } => write!(f, "list[{}]", item),
            Self::Dict { key, value } => write!(f, "dict[{}, {}]", key, value),
            Self::Model { model } => write!(f, "{}", model.name),
        }
    }
}

impl HostType {
    /// Bare JSON Schema for this type, registering nested models in `defs`
    fn json_schema(&self, defs: &mut Map<String, Value>) -> Value {
        match self {
            Self::Str => json!({"type": "string"}),
            Self::Int => json!({"type": "integer"}),
            Self::Float => json!({"type": "number"}),
            Self::Decimal => json!({"type": "string", "format": "decimal"}),
            Self::Bool => json!({"type": "boolean"}),
            Self::Bytes => json!({"type": "string", "format": "binary"}),
            Self::Date => json!({"type": "string", "format": "date"}),
            Self::Time => json!({"type": "string", "format": "time"}),
            Self::DateTime => json!({"type": "string", "format": "date-time"}),
            Self::TimeDelta => json!({"type": "string", "format": "duration"}),
            Self::Uuid => json!({"type": "string", "format": "uuid"}),
            Self::Json => json!({"type": "object"}),
            Self::Any => json!({}),
            Self::None => json!({"type": "null"}),
            Self::List { item } => json!({"type": "array", "items": item.json_schema(defs)}),
            Self::Dict { value, .. } => {
                json!({"type": "object", "additionalProperties": value.json_schema(defs)})
            }
            Self::Model { model } => {
                let schema = model.object_schema(defs);
                defs.insert(model.name.clone(), schema);
                json!({"$ref": format!("#/$defs/{}", model.name)})
            }
        }
    }
}

/// Converted type: host type plus its annotations
#[derive(Debug, Clone, PartialEq)]
pub struct ModelType {
    pub host: HostType,
    pub annotation: Map<String, Value>,
}

impl ModelType {
    pub fn new(host: HostType) -> Self {
        Self {
            host,
            annotation: Map::new(),
        }
    }

    pub fn annotate(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.annotation.insert(key.to_string(), value.into());
        self
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.host)
    }
}

/// One field of a [`ValidationModel`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelField {
    pub name: String,
    pub host_type: HostType,

    /// No default and not a null-only type
    pub required: bool,
    pub nullable: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
    pub annotation: Map<String, Value>,
}

impl ModelField {
    fn property_schema(&self, defs: &mut Map<String, Value>) -> Value {
        let mut schema = match self.host_type.json_schema(defs) {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in &self.annotation {
            if key == "items" {
                if let Some(Value::Object(items)) = schema.get_mut("items") {
                    if let Value::Object(extra) = value {
                        items.extend(extra.clone());
                    }
                }
                continue;
            }
            schema.insert(key.clone(), value.clone());
        }

        let mut property = if self.nullable && self.host_type != HostType::None {
            let mut wrapped = Map::new();
            wrapped.insert(
                "anyOf".to_string(),
                json!([Value::Object(schema), {"type": "null"}]),
            );
            wrapped
        } else {
            schema
        };
        if let Some(description) = &self.description {
            property.insert("description".to_string(), json!(description));
        }
        if let Some(default) = &self.default {
            property.insert("default".to_string(), default.clone());
        }
        Value::Object(property)
    }
}

/// Structured validation model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationModel {
    pub name: String,
    pub fields: Vec<ModelField>,

    /// Table-level details (constraints, metadata)
    pub extra: Map<String, Value>,
}

impl ValidationModel {
    pub fn field(&self, name: &str) -> Option<&ModelField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Export as a JSON Schema document; nested models land under `$defs`
    pub fn to_json_schema(&self) -> Value {
        let mut defs = Map::new();
        let mut schema = self.object_schema(&mut defs);
        if !defs.is_empty() {
            if let Value::Object(map) = &mut schema {
                map.insert("$defs".to_string(), Value::Object(defs));
            }
        }
        schema
    }

    fn object_schema(&self, defs: &mut Map<String, Value>) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in &self.fields {
            properties.insert(field.name.clone(), field.property_schema(defs));
            if field.required {
                required.push(json!(field.name));
            }
        }

        let mut schema = Map::new();
        schema.insert("title".to_string(), json!(self.name));
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), Value::Object(properties));
        schema.insert("required".to_string(), Value::Array(required));
        for (key, value) in &self.extra {
            schema.insert(key.clone(), value.clone());
        }
        Value::Object(schema)
    }
}

/// Converts specs into validation models
#[derive(Debug, Clone, Default)]
pub struct ModelTarget {
    /// Model name; the PascalCase table name when unset
    pub model_name: Option<String>,
}

impl ModelTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = Some(name.into());
        self
    }
}

impl Target for ModelTarget {
    type Type = ModelType;
    type Field = ModelField;
    type Output = ValidationModel;

    fn name(&self) -> &'static str {
        "model"
    }

    fn handler(tag: TypeTag) -> Option<Handler<Self>> {
        let handler: Handler<Self> = match tag {
            TypeTag::String => string,
            TypeTag::Binary => binary,
            TypeTag::Boolean => scalar,
            TypeTag::Integer => integer,
            TypeTag::Float => float,
            TypeTag::Decimal => decimal,
            TypeTag::Date
            | TypeTag::Time
            | TypeTag::Timestamp
            | TypeTag::TimestampTz
            | TypeTag::TimestampLtz
            | TypeTag::TimestampNtz
            | TypeTag::Duration
            | TypeTag::Json
            | TypeTag::Variant
            | TypeTag::Uuid
            | TypeTag::Void => scalar,
            TypeTag::Interval => interval,
            TypeTag::Array => array,
            TypeTag::Struct => structure,
            TypeTag::Map => map,
            TypeTag::Tensor | TypeTag::Geometry | TypeTag::Geography => return None,
        };
        Some(handler)
    }

    fn default_fallback(&self) -> Option<ModelType> {
        Some(ModelType::new(HostType::Str))
    }

    fn build_field(&self, column: &Column, ty: ModelType) -> Result<ModelField> {
        let default = column.default_value().cloned();
        let mut annotation = ty.annotation;

        let mut extension = Map::new();
        if let Some(identity) = column.identity() {
            let mut identity_map = Map::new();
            identity_map.insert("always".to_string(), json!(identity.always));
            if let Some(start) = identity.start {
                identity_map.insert("start".to_string(), json!(start));
            }
            if let Some(increment) = identity.increment {
                identity_map.insert("increment".to_string(), json!(increment));
            }
            extension.insert("identity".to_string(), Value::Object(identity_map));
        }
        if let Some(generated) = &column.generated_as {
            extension.insert("generated_as".to_string(), json!(generated));
        }
        if !column.metadata.is_empty() {
            extension.insert("metadata".to_string(), Value::Object(column.metadata.clone()));
        }
        if !extension.is_empty() {
            annotation.insert(EXTENSION_KEY.to_string(), Value::Object(extension));
        }

        Ok(ModelField {
            name: column.name.clone(),
            required: default.is_none() && ty.host != HostType::None,
            nullable: column.is_nullable(),
            host_type: ty.host,
            default,
            description: column.description.clone(),
            annotation,
        })
    }

    fn finish(&self, spec: &Spec, columns: &[&Column], mut fields: Vec<ModelField>) -> Result<ValidationModel> {
        let selected: HashSet<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        let mut extension = Map::new();
        let mut foreign_keys = Vec::new();

        for constraint in spec.table_constraints() {
            if !constraint.columns().iter().all(|c| selected.contains(c.as_str())) {
                continue;
            }
            match constraint {
                TableConstraint::PrimaryKey { name, columns } => {
                    extension.insert(
                        "primary_key".to_string(),
                        json!({"name": name, "columns": columns}),
                    );
                    for field in fields.iter_mut().filter(|f| columns.contains(&f.name)) {
                        mark_field(field, "primary_key", json!(true));
                    }
                }
                TableConstraint::ForeignKey {
                    name,
                    columns,
                    references,
                } => {
                    let fk = json!({"name": name, "columns": columns, "references": references});
                    if let [column] = columns.as_slice() {
                        if let Some(field) = fields.iter_mut().find(|f| &f.name == column) {
                            mark_field(field, "foreign_key", fk.clone());
                        }
                    }
                    foreign_keys.push(fk);
                }
            }
        }
        if !foreign_keys.is_empty() {
            extension.insert("foreign_keys".to_string(), Value::Array(foreign_keys));
        }
        if !spec.metadata().is_empty() {
            extension.insert("metadata".to_string(), Value::Object(spec.metadata().clone()));
        }

        let mut extra = Map::new();
        if let Some(description) = spec.description() {
            extra.insert("description".to_string(), json!(description));
        }
        if !extension.is_empty() {
            extra.insert(EXTENSION_KEY.to_string(), Value::Object(extension));
        }

        Ok(ValidationModel {
            name: self
                .model_name
                .clone()
                .unwrap_or_else(|| pascal_case([spec.table_name()])),
            fields,
            extra,
        })
    }
}

fn mark_field(field: &mut ModelField, key: &str, value: Value) {
    let entry = field
        .annotation
        .entry(EXTENSION_KEY.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(map) = entry {
        map.insert(key.to_string(), value);
    }
}

/// `["line_items", "price"]` → `LineItemsPrice`
fn pascal_case<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    segments
        .into_iter()
        .flat_map(|segment| segment.split(|c: char| !c.is_ascii_alphanumeric()))
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

type Ctx<'a> = ConversionContext<'a, ModelTarget>;

fn scalar(ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<ModelType> {
    let host = match ty {
        LogicalType::Boolean => HostType::Bool,
        LogicalType::Date { .. } => HostType::Date,
        LogicalType::Time { .. } => HostType::Time,
        LogicalType::Timestamp { .. }
        | LogicalType::TimestampTz { .. }
        | LogicalType::TimestampLtz { .. }
        | LogicalType::TimestampNtz { .. } => HostType::DateTime,
        LogicalType::Duration { .. } => HostType::TimeDelta,
        LogicalType::Json => HostType::Json,
        LogicalType::Variant => HostType::Any,
        LogicalType::Uuid => HostType::Uuid,
        LogicalType::Void => HostType::None,
        _ => return Err(ctx.unsupported(format!("type '{}'", ty))),
    };
    Ok(ModelType::new(host))
}

fn string(_ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<ModelType> {
    let ty_out = ModelType::new(HostType::Str);
    Ok(match ty {
        LogicalType::String { length: Some(length) } => ty_out.annotate("maxLength", *length),
        _ => ty_out,
    })
}

fn binary(_ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<ModelType> {
    let ty_out = ModelType::new(HostType::Bytes);
    Ok(match ty {
        LogicalType::Binary { length: Some(length) } => ty_out
            .annotate("minLength", *length)
            .annotate("maxLength", *length),
        _ => ty_out,
    })
}

fn integer(ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<ModelType> {
    let LogicalType::Integer { bits, signed } = ty else {
        return Err(ctx.unsupported(format!("type '{}'", ty)));
    };
    let ty_out = ModelType::new(HostType::Int);
    Ok(match (*bits, *signed) {
        (Some(bits), true) => {
            let max = i64::MAX >> (64 - bits);
            ty_out.annotate("minimum", -max - 1).annotate("maximum", max)
        }
        (Some(bits), false) => ty_out
            .annotate("minimum", 0)
            .annotate("maximum", u64::MAX >> (64 - bits)),
        (None, false) => ty_out.annotate("minimum", 0),
        (None, true) => ty_out,
    })
}

fn float(ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<ModelType> {
    if let LogicalType::Float { bits: Some(bits) } = ty {
        if *bits != 64 {
            ctx.coerce(
                format!("float(bits={}) cannot be represented exactly; host floats are 64-bit", bits),
                ty,
                HostType::Float,
            )?;
        }
    }
    Ok(ModelType::new(HostType::Float))
}

fn decimal(_ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<ModelType> {
    let mut ty_out = ModelType::new(HostType::Decimal);
    if let LogicalType::Decimal {
        precision: Some(precision),
        scale,
        ..
    } = ty
    {
        ty_out = ty_out.annotate("maxDigits", *precision);
        if let Some(scale) = scale {
            ty_out = ty_out.annotate("decimalPlaces", *scale);
        }
    }
    Ok(ty_out)
}

/// Calendar intervals become a months/days/nanoseconds model
fn interval(_ctx: &mut Ctx<'_>, _ty: &LogicalType) -> Result<ModelType> {
    let part = |name: &str| ModelField {
        name: name.to_string(),
        host_type: HostType::Int,
        required: true,
        nullable: false,
        default: None,
        description: None,
        annotation: Map::new(),
    };
    let model = ValidationModel {
        name: "MonthDayNanoInterval".to_string(),
        fields: vec![part("months"), part("days"), part("nanoseconds")],
        extra: Map::new(),
    };
    Ok(ModelType::new(HostType::Model {
        model: Box::new(model),
    }))
}

fn array(ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<ModelType> {
    let LogicalType::Array { element, size } = ty else {
        return Err(ctx.unsupported(format!("type '{}'", ty)));
    };
    let item = ctx.convert(element)?;
    let mut ty_out = ModelType::new(HostType::List {
        item: Box::new(item.host),
    });
    if !item.annotation.is_empty() {
        ty_out = ty_out.annotate("items", Value::Object(item.annotation));
    }
    if let Some(size) = size {
        ty_out = ty_out.annotate("minItems", *size).annotate("maxItems", *size);
    }
    Ok(ty_out)
}

fn structure(ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<ModelType> {
    let LogicalType::Struct { fields } = ty else {
        return Err(ctx.unsupported(format!("type '{}'", ty)));
    };
    let name = pascal_case(ctx.path().segments().iter().map(String::as_str));
    let fields = fields
        .iter()
        .map(|member| ctx.convert_member(member))
        .collect::<Result<Vec<_>>>()?;
    let model = ValidationModel {
        name,
        fields,
        extra: Map::new(),
    };
    Ok(ModelType::new(HostType::Model {
        model: Box::new(model),
    }))
}

fn map(ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<ModelType> {
    let LogicalType::Map { key, value, .. } = ty else {
        return Err(ctx.unsupported(format!("type '{}'", ty)));
    };
    let key = ctx.convert(key)?;
    let value = ctx.convert(value)?;
    Ok(ModelType::new(HostType::Dict {
        key: Box::new(key.host),
        value: Box::new(value.host),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ConvertConfig, Converter};
    use pretty_assertions::assert_eq;
    use tabspec_core::{ColumnConstraint, ForeignKeyReference, Mode, WarningCode};

    fn convert(spec: &Spec) -> ValidationModel {
        Converter::new(ModelTarget::new(), ConvertConfig::new().mode(Mode::Strict))
            .convert(spec)
            .unwrap()
            .target
    }

    #[test]
    fn pascal_case_joins_segments() {
        assert_eq!(pascal_case(["line_items", "price"]), "LineItemsPrice");
        assert_eq!(pascal_case(["orders"]), "Orders");
    }

    #[test]
    fn integer_bounds_annotated() {
        let spec = Spec::builder("t")
            .column(Column::new("small", LogicalType::integer(8, true).unwrap()))
            .column(Column::new("count", LogicalType::integer(16, false).unwrap()))
            .build()
            .unwrap();
        let model = convert(&spec);

        assert_eq!(model.fields[0].annotation["minimum"], json!(-128));
        assert_eq!(model.fields[0].annotation["maximum"], json!(127));
        assert_eq!(model.fields[1].annotation["minimum"], json!(0));
        assert_eq!(model.fields[1].annotation["maximum"], json!(65535));
    }

    #[test]
    fn required_follows_defaults() {
        let spec = Spec::builder("t")
            .column(Column::new("id", LogicalType::int64()).not_null())
            .column(
                Column::new("status", LogicalType::string())
                    .with_constraint(ColumnConstraint::default_value("new")),
            )
            .column(Column::new("nothing", LogicalType::Void))
            .build()
            .unwrap();
        let model = convert(&spec);

        assert!(model.fields[0].required);
        assert!(!model.fields[0].nullable);
        assert!(!model.fields[1].required);
        assert_eq!(model.fields[1].default, Some(json!("new")));
        assert!(!model.fields[2].required);
    }

    #[test]
    fn nested_struct_becomes_named_model() {
        let address = LogicalType::structure(vec![
            Column::new("city", LogicalType::varchar(64).unwrap()).not_null(),
        ])
        .unwrap();
        let spec = Spec::builder("customers")
            .column(Column::new("shipping_address", address))
            .build()
            .unwrap();
        let model = convert(&spec);

        assert_eq!(model.name, "Customers");
        match &model.fields[0].host_type {
            HostType::Model { model: nested } => {
                assert_eq!(nested.name, "ShippingAddress");
                assert_eq!(nested.fields[0].annotation["maxLength"], json!(64));
            }
            other => panic!("expected nested model, got {other}"),
        }

        let schema = model.to_json_schema();
        assert_eq!(
            schema["$defs"]["ShippingAddress"]["properties"]["city"]["maxLength"],
            json!(64)
        );
        assert_eq!(
            schema["properties"]["shipping_address"]["anyOf"][0]["$ref"],
            json!("#/$defs/ShippingAddress")
        );
    }

    #[test]
    fn constraints_recorded_under_extension_key() {
        let spec = Spec::builder("orders")
            .column(
                Column::new("id", LogicalType::int64())
                    .not_null()
                    .with_constraint(ColumnConstraint::PrimaryKey),
            )
            .column(Column::new("customer_id", LogicalType::int64()).with_constraint(
                ColumnConstraint::foreign_key(ForeignKeyReference::new("customers")),
            ))
            .build()
            .unwrap();
        let model = convert(&spec);

        assert_eq!(model.fields[0].annotation[EXTENSION_KEY]["primary_key"], json!(true));
        assert_eq!(
            model.fields[1].annotation[EXTENSION_KEY]["foreign_key"]["references"]["table"],
            json!("customers")
        );
        assert_eq!(
            model.extra[EXTENSION_KEY]["primary_key"],
            json!({"name": "pk_orders", "columns": ["id"]})
        );
    }

    #[test]
    fn narrow_float_coerces() {
        let spec = Spec::builder("t")
            .column(Column::new("ratio", LogicalType::float(32).unwrap()))
            .build()
            .unwrap();

        let converted = Converter::new(ModelTarget::new(), ConvertConfig::new())
            .convert(&spec)
            .unwrap();
        assert_eq!(converted.target.fields[0].host_type, HostType::Float);
        assert_eq!(converted.warnings[0].code, WarningCode::TypeParameterCoerced);

        let strict = Converter::new(ModelTarget::new(), ConvertConfig::new().mode(Mode::Strict));
        assert!(strict.convert(&spec).unwrap_err().is_unsupported());
    }

    #[test]
    fn geometry_falls_back_to_str() {
        let spec = Spec::builder("t")
            .column(Column::new("shape", LogicalType::Geometry { srid: None }))
            .build()
            .unwrap();
        let converted = Converter::new(ModelTarget::new(), ConvertConfig::new())
            .convert(&spec)
            .unwrap();

        assert_eq!(converted.target.fields[0].host_type, HostType::Str);
        assert_eq!(converted.warnings.len(), 1);
        assert_eq!(converted.warnings[0].resulting_type, "str");
    }
}
