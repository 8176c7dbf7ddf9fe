//! Columnar (Arrow) schemas
//!
//! [`ArrowTarget`] converts a spec into an [`arrow_schema::Schema`];
//! [`ArrowLoader`] reads one back. Tensors, UUIDs and JSON travel as Arrow
//! canonical extension types, identified through field metadata.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arrow_schema::{
    DataType, Field, Fields, IntervalUnit as ArrowIntervalUnit, Schema, TimeUnit as ArrowTimeUnit,
};
use serde_json::Value;
use tabspec_core::{
    Column, IntervalUnit, LogicalType, Metadata, Result, Spec, TimeUnit, TypeTag,
};

use crate::engine::{ConversionContext, Handler, Target};
use crate::load::{LoadConfig, LoadContext, Loaded, Loader};

pub const EXTENSION_NAME_KEY: &str = "ARROW:extension:name";
pub const EXTENSION_METADATA_KEY: &str = "ARROW:extension:metadata";

pub const UUID_EXTENSION: &str = "arrow.uuid";
pub const JSON_EXTENSION: &str = "arrow.json";
pub const TENSOR_EXTENSION: &str = "arrow.fixed_shape_tensor";

/// Field metadata key holding column descriptions
pub const DESCRIPTION_KEY: &str = "description";

const DEFAULT_DECIMAL_PRECISION: u32 = 38;
const MAX_DECIMAL_PRECISION: u32 = 76;
/// Widest precision a 128-bit decimal holds
const DECIMAL128_MAX_PRECISION: u32 = 38;

/// Canonical extension annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub name: &'static str,
    pub metadata: Option<String>,
}

/// Arrow storage type, possibly wrapped in an extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrowType {
    pub data_type: DataType,
    pub extension: Option<Extension>,
}

impl ArrowType {
    pub fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            extension: None,
        }
    }

    pub fn with_extension(mut self, name: &'static str, metadata: Option<String>) -> Self {
        self.extension = Some(Extension { name, metadata });
        self
    }

    /// Metadata entries announcing the extension, if any
    pub fn extension_metadata(&self) -> HashMap<String, String> {
        let mut metadata = HashMap::new();
        if let Some(extension) = &self.extension {
            metadata.insert(EXTENSION_NAME_KEY.to_string(), extension.name.to_string());
            if let Some(ext_metadata) = &extension.metadata {
                metadata.insert(EXTENSION_METADATA_KEY.to_string(), ext_metadata.clone());
            }
        }
        metadata
    }

    /// Anonymous child field (list items, map entries)
    pub fn into_field(self, name: &str, nullable: bool) -> Field {
        let metadata = self.extension_metadata();
        Field::new(name, self.data_type, nullable).with_metadata(metadata)
    }
}

impl fmt::Display for ArrowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.extension {
            Some(extension) => write!(f, "{}<{}>", extension.name, self.data_type),
            None => write!(f, "{}", self.data_type),
        }
    }
}

/// Converts specs into Arrow schemas
#[derive(Debug, Clone, Default)]
pub struct ArrowTarget {
    /// 64-bit offsets for variable-length strings, binaries and lists
    pub large_types: bool,
}

impl ArrowTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_large_types(mut self, large_types: bool) -> Self {
        self.large_types = large_types;
        self
    }
}

impl Target for ArrowTarget {
    type Type = ArrowType;
    type Field = Field;
    type Output = Schema;

    fn name(&self) -> &'static str {
        "arrow"
    }

    fn handler(tag: TypeTag) -> Option<Handler<Self>> {
        let handler: Handler<Self> = match tag {
            TypeTag::String => string,
            TypeTag::Binary => binary,
            TypeTag::Boolean => boolean,
            TypeTag::Integer => integer,
            TypeTag::Float => float,
            TypeTag::Decimal => decimal,
            TypeTag::Date => date,
            TypeTag::Time => time,
            TypeTag::Timestamp
            | TypeTag::TimestampTz
            | TypeTag::TimestampLtz
            | TypeTag::TimestampNtz => timestamp,
            TypeTag::Duration => duration,
            TypeTag::Interval => interval,
            TypeTag::Array => array,
            TypeTag::Struct => structure,
            TypeTag::Map => map,
            TypeTag::Tensor => tensor,
            TypeTag::Json => json,
            TypeTag::Uuid => uuid,
            TypeTag::Void => void,
            TypeTag::Variant | TypeTag::Geometry | TypeTag::Geography => return None,
        };
        Some(handler)
    }

    fn default_fallback(&self) -> Option<ArrowType> {
        Some(ArrowType::new(if self.large_types {
            DataType::LargeBinary
        } else {
            DataType::Binary
        }))
    }

    fn build_field(&self, column: &Column, ty: ArrowType) -> Result<Field> {
        let mut metadata = metadata_to_arrow(&column.metadata);
        if let Some(description) = &column.description {
            metadata.insert(DESCRIPTION_KEY.to_string(), description.clone());
        }
        metadata.extend(ty.extension_metadata());
        Ok(Field::new(column.name.as_str(), ty.data_type, column.is_nullable()).with_metadata(metadata))
    }

    fn finish(&self, spec: &Spec, _columns: &[&Column], fields: Vec<Field>) -> Result<Schema> {
        let mut metadata = metadata_to_arrow(spec.metadata());
        if let Some(description) = spec.description() {
            metadata.insert(DESCRIPTION_KEY.to_string(), description.to_string());
        }
        Ok(Schema::new_with_metadata(Fields::from(fields), metadata))
    }
}

type Ctx<'a> = ConversionContext<'a, ArrowTarget>;

fn string(ctx: &mut Ctx<'_>, _ty: &LogicalType) -> Result<ArrowType> {
    Ok(ArrowType::new(if ctx.target().large_types {
        DataType::LargeUtf8
    } else {
        DataType::Utf8
    }))
}

fn boolean(_ctx: &mut Ctx<'_>, _ty: &LogicalType) -> Result<ArrowType> {
    Ok(ArrowType::new(DataType::Boolean))
}

fn binary(ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<ArrowType> {
    match ty {
        LogicalType::Binary { length: Some(length) } => {
            let length = i32::try_from(*length)
                .map_err(|_| ctx.unsupported(format!("binary length {}", length)))?;
            Ok(ArrowType::new(DataType::FixedSizeBinary(length)))
        }
        _ if ctx.target().large_types => Ok(ArrowType::new(DataType::LargeBinary)),
        _ => Ok(ArrowType::new(DataType::Binary)),
    }
}

fn integer(ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<ArrowType> {
    let LogicalType::Integer { bits, signed } = ty else {
        return Err(ctx.unsupported(format!("type '{}'", ty)));
    };
    let data_type = match (bits.unwrap_or(32), *signed) {
        (8, true) => DataType::Int8,
        (16, true) => DataType::Int16,
        (32, true) => DataType::Int32,
        (64, true) => DataType::Int64,
        (8, false) => DataType::UInt8,
        (16, false) => DataType::UInt16,
        (32, false) => DataType::UInt32,
        (64, false) => DataType::UInt64,
        (bits, _) => return Err(ctx.unsupported(format!("integer bits {}", bits))),
    };
    Ok(ArrowType::new(data_type))
}

fn float(ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<ArrowType> {
    let LogicalType::Float { bits } = ty else {
        return Err(ctx.unsupported(format!("type '{}'", ty)));
    };
    let data_type = match bits.unwrap_or(64) {
        16 => DataType::Float16,
        32 => DataType::Float32,
        64 => DataType::Float64,
        bits => return Err(ctx.unsupported(format!("float bits {}", bits))),
    };
    Ok(ArrowType::new(data_type))
}

fn decimal(ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<ArrowType> {
    let LogicalType::Decimal {
        precision,
        scale,
        bits,
    } = ty
    else {
        return Err(ctx.unsupported(format!("type '{}'", ty)));
    };
    let precision = precision.unwrap_or(DEFAULT_DECIMAL_PRECISION);
    if precision > MAX_DECIMAL_PRECISION {
        return Err(ctx.unsupported(format!("decimal precision {} (maximum is 76)", precision)));
    }
    let scale = scale.unwrap_or(0);
    let arrow_scale = i8::try_from(scale)
        .map_err(|_| ctx.unsupported(format!("decimal scale {}", scale)))?;
    // precision <= 76 was checked above
    let arrow_precision = precision as u8;

    let wide = DataType::Decimal256(arrow_precision, arrow_scale);
    let data_type = match bits {
        None if precision > DECIMAL128_MAX_PRECISION => wide,
        None => DataType::Decimal128(arrow_precision, arrow_scale),
        Some(128) if precision > DECIMAL128_MAX_PRECISION => {
            ctx.coerce(
                format!(
                    "Precision {} is incompatible with decimal(bits=128); widened to 256 bits",
                    precision
                ),
                ty,
                &wide,
            )?;
            wide
        }
        Some(128) => DataType::Decimal128(arrow_precision, arrow_scale),
        Some(_) => wide,
    };
    Ok(ArrowType::new(data_type))
}

fn date(ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<ArrowType> {
    match ty {
        LogicalType::Date { bits: Some(64) } => Ok(ArrowType::new(DataType::Date64)),
        LogicalType::Date { bits: None | Some(32) } => Ok(ArrowType::new(DataType::Date32)),
        _ => Err(ctx.unsupported(format!("type '{}'", ty))),
    }
}

fn time(ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<ArrowType> {
    let LogicalType::Time { unit, bits } = ty else {
        return Err(ctx.unsupported(format!("type '{}'", ty)));
    };
    let coarse = matches!(unit, TimeUnit::S | TimeUnit::Ms);
    let arrow_unit = to_arrow_unit(*unit);
    let data_type = match bits {
        None if coarse => DataType::Time32(arrow_unit),
        None => DataType::Time64(arrow_unit),
        Some(32) if coarse => DataType::Time32(arrow_unit),
        Some(32) => {
            let result = DataType::Time64(arrow_unit);
            ctx.coerce(
                format!("time32 supports only 's' or 'ms' units (got '{}')", unit),
                ty,
                &result,
            )?;
            result
        }
        Some(_) if coarse => {
            let result = DataType::Time32(arrow_unit);
            ctx.coerce(
                format!("time64 supports only 'us' or 'ns' units (got '{}')", unit),
                ty,
                &result,
            )?;
            result
        }
        Some(_) => DataType::Time64(arrow_unit),
    };
    Ok(ArrowType::new(data_type))
}

fn timestamp(ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<ArrowType> {
    let data_type = match ty {
        LogicalType::TimestampTz { unit, tz } => {
            DataType::Timestamp(to_arrow_unit(*unit), Some(Arc::from(tz.as_str())))
        }
        LogicalType::Timestamp { unit }
        | LogicalType::TimestampLtz { unit }
        | LogicalType::TimestampNtz { unit } => DataType::Timestamp(to_arrow_unit(*unit), None),
        _ => return Err(ctx.unsupported(format!("type '{}'", ty))),
    };
    Ok(ArrowType::new(data_type))
}

fn duration(ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<ArrowType> {
    match ty {
        LogicalType::Duration { unit } => Ok(ArrowType::new(DataType::Duration(to_arrow_unit(*unit)))),
        _ => Err(ctx.unsupported(format!("type '{}'", ty))),
    }
}

/// Arrow only has a month/day/nanosecond layout for calendar intervals
fn interval(_ctx: &mut Ctx<'_>, _ty: &LogicalType) -> Result<ArrowType> {
    Ok(ArrowType::new(DataType::Interval(ArrowIntervalUnit::MonthDayNano)))
}

fn array(ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<ArrowType> {
    let LogicalType::Array { element, size } = ty else {
        return Err(ctx.unsupported(format!("type '{}'", ty)));
    };
    let item = Arc::new(ctx.convert(element)?.into_field("item", true));
    let data_type = match size {
        Some(size) => {
            let size = i32::try_from(*size)
                .map_err(|_| ctx.unsupported(format!("array size {}", size)))?;
            DataType::FixedSizeList(item, size)
        }
        None if ctx.target().large_types => DataType::LargeList(item),
        None => DataType::List(item),
    };
    Ok(ArrowType::new(data_type))
}

fn structure(ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<ArrowType> {
    let LogicalType::Struct { fields } = ty else {
        return Err(ctx.unsupported(format!("type '{}'", ty)));
    };
    let members = fields
        .iter()
        .map(|member| ctx.convert_member(member))
        .collect::<Result<Vec<_>>>()?;
    Ok(ArrowType::new(DataType::Struct(Fields::from(members))))
}

fn map(ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<ArrowType> {
    let LogicalType::Map {
        key,
        value,
        keys_sorted,
    } = ty
    else {
        return Err(ctx.unsupported(format!("type '{}'", ty)));
    };
    let key = ctx.convert(key)?.into_field("key", false);
    let value = ctx.convert(value)?.into_field("value", true);
    let entries = Field::new("entries", DataType::Struct(Fields::from(vec![key, value])), false);
    Ok(ArrowType::new(DataType::Map(Arc::new(entries), *keys_sorted)))
}

fn tensor(ctx: &mut Ctx<'_>, ty: &LogicalType) -> Result<ArrowType> {
    let LogicalType::Tensor { element, shape } = ty else {
        return Err(ctx.unsupported(format!("type '{}'", ty)));
    };
    let item = Arc::new(ctx.convert(element)?.into_field("item", true));
    let size = shape
        .iter()
        .try_fold(1i32, |acc, dim| i32::try_from(*dim).ok().and_then(|d| acc.checked_mul(d)))
        .ok_or_else(|| ctx.unsupported(format!("tensor shape {:?}", shape)))?;
    let metadata = serde_json::json!({ "shape": shape }).to_string();
    Ok(ArrowType::new(DataType::FixedSizeList(item, size)).with_extension(TENSOR_EXTENSION, Some(metadata)))
}

fn json(_ctx: &mut Ctx<'_>, _ty: &LogicalType) -> Result<ArrowType> {
    Ok(ArrowType::new(DataType::Utf8).with_extension(JSON_EXTENSION, None))
}

fn uuid(_ctx: &mut Ctx<'_>, _ty: &LogicalType) -> Result<ArrowType> {
    Ok(ArrowType::new(DataType::FixedSizeBinary(16)).with_extension(UUID_EXTENSION, None))
}

fn void(_ctx: &mut Ctx<'_>, _ty: &LogicalType) -> Result<ArrowType> {
    Ok(ArrowType::new(DataType::Null))
}

fn to_arrow_unit(unit: TimeUnit) -> ArrowTimeUnit {
    match unit {
        TimeUnit::S => ArrowTimeUnit::Second,
        TimeUnit::Ms => ArrowTimeUnit::Millisecond,
        TimeUnit::Us => ArrowTimeUnit::Microsecond,
        TimeUnit::Ns => ArrowTimeUnit::Nanosecond,
    }
}

fn from_arrow_unit(unit: &ArrowTimeUnit) -> TimeUnit {
    match unit {
        ArrowTimeUnit::Second => TimeUnit::S,
        ArrowTimeUnit::Millisecond => TimeUnit::Ms,
        ArrowTimeUnit::Microsecond => TimeUnit::Us,
        ArrowTimeUnit::Nanosecond => TimeUnit::Ns,
    }
}

/// String values pass through; everything else is stored as JSON text
fn metadata_to_arrow(metadata: &Metadata) -> HashMap<String, String> {
    metadata
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}

/// JSON text is decoded back; anything else stays a string
fn metadata_from_arrow(value: &str) -> Value {
    serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()))
}

/// Loads specs from Arrow schemas
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrowLoader;

impl ArrowLoader {
    /// Name given to specs when the config names none
    pub const DEFAULT_NAME: &'static str = "arrow_schema";
}

impl Loader for ArrowLoader {
    type Source = Schema;

    fn name(&self) -> &'static str {
        "arrow"
    }

    fn load(&self, schema: &Schema, config: &LoadConfig) -> Result<Loaded> {
        let mut ctx = LoadContext::new(self.name(), config);
        let mut builder = Spec::builder(config.name_or(Self::DEFAULT_NAME));
        if let Some(version) = config.version {
            builder = builder.version(version);
        }

        let mut metadata = schema.metadata().clone();
        let description = config
            .description
            .clone()
            .or_else(|| metadata.remove(DESCRIPTION_KEY));
        if let Some(description) = description {
            builder = builder.description(description);
        }
        let mut spec_metadata = Metadata::new();
        let mut keys: Vec<&String> = metadata.keys().collect();
        keys.sort();
        for key in keys {
            spec_metadata.insert(key.clone(), metadata_from_arrow(&metadata[key]));
        }
        builder = builder.metadata_map(spec_metadata);

        for field in schema.fields() {
            let column = ctx.with_segment(field.name(), |ctx| load_field(ctx, field))?;
            builder = builder.column(column);
        }

        let spec = builder.build()?;
        tracing::debug!("Loaded spec '{}' from Arrow schema", spec.name());
        Ok(ctx.finish(spec))
    }
}

fn load_field(ctx: &mut LoadContext, field: &Field) -> Result<Column> {
    let data_type = load_type(ctx, field)?;
    let mut column = Column::new(field.name().as_str(), data_type);
    if !field.is_nullable() {
        column = column.not_null();
    }

    let mut keys: Vec<&String> = field.metadata().keys().collect();
    keys.sort();
    for key in keys {
        let value = &field.metadata()[key];
        match key.as_str() {
            EXTENSION_NAME_KEY | EXTENSION_METADATA_KEY => {}
            DESCRIPTION_KEY => column.description = Some(value.clone()),
            _ => {
                column.metadata.insert(key.clone(), metadata_from_arrow(value));
            }
        }
    }
    Ok(column)
}

fn load_type(ctx: &mut LoadContext, field: &Field) -> Result<LogicalType> {
    if let Some(name) = field.metadata().get(EXTENSION_NAME_KEY) {
        match (name.as_str(), field.data_type()) {
            (UUID_EXTENSION, DataType::FixedSizeBinary(16)) => return Ok(LogicalType::Uuid),
            (JSON_EXTENSION, DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View) => {
                return Ok(LogicalType::Json)
            }
            (TENSOR_EXTENSION, DataType::FixedSizeList(item, _)) => {
                if let Some(shape) = tensor_shape(field) {
                    let element = load_type(ctx, item)?;
                    return Ok(LogicalType::Tensor {
                        element: Box::new(element),
                        shape,
                    });
                }
                ctx.drop_feature("fixed_shape_tensor extension without a valid shape", name)?;
            }
            _ => ctx.drop_feature(format!("extension type '{}'", name), field.data_type())?,
        }
    }

    let ty = match field.data_type() {
        DataType::Null => LogicalType::Void,
        DataType::Boolean => LogicalType::Boolean,
        DataType::Int8 => integer_type(8, true),
        DataType::Int16 => integer_type(16, true),
        DataType::Int32 => integer_type(32, true),
        DataType::Int64 => integer_type(64, true),
        DataType::UInt8 => integer_type(8, false),
        DataType::UInt16 => integer_type(16, false),
        DataType::UInt32 => integer_type(32, false),
        DataType::UInt64 => integer_type(64, false),
        DataType::Float16 => LogicalType::Float { bits: Some(16) },
        DataType::Float32 => LogicalType::Float { bits: Some(32) },
        DataType::Float64 => LogicalType::Float { bits: Some(64) },
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => LogicalType::string(),
        DataType::Binary | DataType::LargeBinary | DataType::BinaryView => LogicalType::binary(),
        DataType::FixedSizeBinary(length) => match u32::try_from(*length) {
            Ok(length) if length > 0 => LogicalType::Binary { length: Some(length) },
            _ => return ctx.unsupported_type(field.data_type()),
        },
        DataType::Decimal128(precision, scale) => decimal_type(*precision, *scale, 128),
        DataType::Decimal256(precision, scale) => decimal_type(*precision, *scale, 256),
        DataType::Date32 => LogicalType::date(),
        DataType::Date64 => LogicalType::Date { bits: Some(64) },
        // the unit alone decides between time32 and time64
        DataType::Time32(unit) | DataType::Time64(unit) => LogicalType::Time {
            unit: from_arrow_unit(unit),
            bits: None,
        },
        DataType::Timestamp(unit, None) => LogicalType::Timestamp {
            unit: from_arrow_unit(unit),
        },
        DataType::Timestamp(unit, Some(tz)) => LogicalType::TimestampTz {
            unit: from_arrow_unit(unit),
            tz: tz.to_string(),
        },
        DataType::Duration(unit) => LogicalType::Duration {
            unit: from_arrow_unit(unit),
        },
        DataType::Interval(ArrowIntervalUnit::YearMonth) => LogicalType::Interval {
            start: IntervalUnit::Year,
            end: Some(IntervalUnit::Month),
        },
        DataType::Interval(ArrowIntervalUnit::DayTime) => LogicalType::Interval {
            start: IntervalUnit::Day,
            end: Some(IntervalUnit::Second),
        },
        DataType::Interval(ArrowIntervalUnit::MonthDayNano) => LogicalType::Interval {
            start: IntervalUnit::Day,
            end: None,
        },
        DataType::List(item) | DataType::LargeList(item) => LogicalType::Array {
            element: Box::new(load_type(ctx, item)?),
            size: None,
        },
        DataType::FixedSizeList(item, size) => {
            let element = load_type(ctx, item)?;
            match u32::try_from(*size) {
                Ok(size) if size > 0 => LogicalType::Array {
                    element: Box::new(element),
                    size: Some(size),
                },
                _ => return ctx.unsupported_type(field.data_type()),
            }
        }
        DataType::Struct(members) => {
            if members.is_empty() {
                return ctx.unsupported_type(field.data_type());
            }
            let fields = members
                .iter()
                .map(|member| ctx.with_segment(member.name(), |ctx| load_field(ctx, member)))
                .collect::<Result<Vec<_>>>()?;
            LogicalType::Struct { fields }
        }
        DataType::Map(entries, keys_sorted) => match entries.data_type() {
            DataType::Struct(kv) if kv.len() == 2 => LogicalType::Map {
                key: Box::new(load_type(ctx, &kv[0])?),
                value: Box::new(load_type(ctx, &kv[1])?),
                keys_sorted: *keys_sorted,
            },
            _ => return ctx.unsupported_type(field.data_type()),
        },
        other => return ctx.unsupported_type(other),
    };
    Ok(ty)
}

fn integer_type(bits: u16, signed: bool) -> LogicalType {
    LogicalType::Integer {
        bits: Some(bits),
        signed,
    }
}

/// Storage width is kept only when it differs from the one the precision
/// implies, so a spec that left it unset loads back unchanged
fn decimal_type(precision: u8, scale: i8, bits: u16) -> LogicalType {
    let implied = if u32::from(precision) > DECIMAL128_MAX_PRECISION { 256 } else { 128 };
    LogicalType::Decimal {
        precision: Some(u32::from(precision)),
        scale: Some(i32::from(scale)),
        bits: (bits != implied).then_some(bits),
    }
}

fn tensor_shape(field: &Field) -> Option<Vec<u32>> {
    let metadata = field.metadata().get(EXTENSION_METADATA_KEY)?;
    let value: Value = serde_json::from_str(metadata).ok()?;
    let shape = value
        .get("shape")?
        .as_array()?
        .iter()
        .map(|dim| dim.as_u64().and_then(|d| u32::try_from(d).ok()).filter(|d| *d > 0))
        .collect::<Option<Vec<_>>>()?;
    (!shape.is_empty()).then_some(shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ConvertConfig, Converter};
    use pretty_assertions::assert_eq;
    use tabspec_core::{Mode, WarningCode};

    fn convert(spec: &Spec, mode: Mode) -> Result<crate::Converted<Schema>> {
        Converter::new(ArrowTarget::new(), ConvertConfig::new().mode(mode)).convert(spec)
    }

    fn single(ty: LogicalType) -> Spec {
        Spec::builder("t").column(Column::new("c", ty)).build().unwrap()
    }

    #[test]
    fn decimal_width_follows_precision() {
        let schema = convert(&single(LogicalType::decimal(40, 2).unwrap()), Mode::Strict)
            .unwrap()
            .target;
        assert_eq!(schema.field(0).data_type(), &DataType::Decimal256(40, 2));

        let schema = convert(&single(LogicalType::decimal(10, 2).unwrap()), Mode::Strict)
            .unwrap()
            .target;
        assert_eq!(schema.field(0).data_type(), &DataType::Decimal128(10, 2));
    }

    #[test]
    fn narrow_decimal_with_wide_precision_coerces() {
        let ty = LogicalType::Decimal {
            precision: Some(40),
            scale: Some(2),
            bits: Some(128),
        };
        let converted = convert(&single(ty.clone()), Mode::Coerce).unwrap();
        assert_eq!(converted.target.field(0).data_type(), &DataType::Decimal256(40, 2));
        assert_eq!(converted.warnings.len(), 1);
        assert_eq!(converted.warnings[0].source_type, "decimal(40,2,bits=128)");

        assert!(convert(&single(ty), Mode::Strict).unwrap_err().is_unsupported());
    }

    #[test]
    fn time32_with_fine_unit_coerces() {
        let ty = LogicalType::Time {
            unit: TimeUnit::Ns,
            bits: Some(32),
        };
        let converted = convert(&single(ty.clone()), Mode::Coerce).unwrap();
        assert_eq!(
            converted.target.field(0).data_type(),
            &DataType::Time64(ArrowTimeUnit::Nanosecond)
        );
        assert_eq!(converted.warnings.len(), 1);
        assert_eq!(converted.warnings[0].code, WarningCode::TypeParameterCoerced);

        assert!(convert(&single(ty), Mode::Strict).unwrap_err().is_unsupported());
    }

    #[test]
    fn geometry_falls_back_to_binary() {
        let converted = convert(&single(LogicalType::Geometry { srid: Some(4326) }), Mode::Coerce).unwrap();
        assert_eq!(converted.target.field(0).data_type(), &DataType::Binary);
        assert_eq!(converted.warnings[0].resulting_type, "Binary");
    }

    #[test]
    fn extension_types_annotated() {
        let converted = convert(&single(LogicalType::Uuid), Mode::Strict).unwrap();
        let field = converted.target.field(0);
        assert_eq!(field.data_type(), &DataType::FixedSizeBinary(16));
        assert_eq!(
            field.metadata().get(EXTENSION_NAME_KEY).map(String::as_str),
            Some(UUID_EXTENSION)
        );

        let tensor = LogicalType::tensor(LogicalType::float64(), vec![2, 3]).unwrap();
        let converted = convert(&single(tensor), Mode::Strict).unwrap();
        let field = converted.target.field(0);
        assert!(matches!(field.data_type(), DataType::FixedSizeList(_, 6)));
        assert_eq!(
            field.metadata().get(EXTENSION_METADATA_KEY).map(String::as_str),
            Some(r#"{"shape":[2,3]}"#)
        );
    }

    #[test]
    fn metadata_and_description_carried() {
        let spec = Spec::builder("t")
            .column(
                Column::new("c", LogicalType::string())
                    .with_description("customer email")
                    .with_metadata("pii", true)
                    .with_metadata("owner", "crm"),
            )
            .build()
            .unwrap();
        let schema = convert(&spec, Mode::Strict).unwrap().target;
        let metadata = schema.field(0).metadata();
        assert_eq!(metadata["description"], "customer email");
        assert_eq!(metadata["pii"], "true");
        assert_eq!(metadata["owner"], "crm");
    }

    #[test]
    fn loader_rejects_dictionary_in_strict_mode() {
        let schema = Schema::new(vec![Field::new(
            "d",
            DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8)),
            true,
        )]);
        let err = ArrowLoader
            .load(&schema, &LoadConfig::new().mode(Mode::Strict))
            .unwrap_err();
        assert!(err.is_unsupported());

        let loaded = ArrowLoader.load(&schema, &LoadConfig::new()).unwrap();
        assert_eq!(loaded.spec.columns()[0].data_type, LogicalType::string());
        assert_eq!(loaded.warnings.len(), 1);
        assert_eq!(loaded.warnings[0].field_path, "d");
    }

    #[test]
    fn loader_leaves_implied_widths_unset() {
        let schema = Schema::new(vec![
            Field::new("t", DataType::Time64(ArrowTimeUnit::Microsecond), true),
            Field::new("s", DataType::Time32(ArrowTimeUnit::Second), true),
            Field::new("d", DataType::Date32, true),
            Field::new("d64", DataType::Date64, true),
            Field::new("huge", DataType::Decimal256(50, 2), true),
            Field::new("small", DataType::Decimal128(10, 2), true),
            Field::new("padded", DataType::Decimal256(10, 2), true),
        ]);
        let loaded = ArrowLoader.load(&schema, &LoadConfig::new()).unwrap();
        let types: Vec<LogicalType> = loaded
            .spec
            .columns()
            .iter()
            .map(|c| c.data_type.clone())
            .collect();
        assert_eq!(
            types,
            vec![
                LogicalType::Time { unit: TimeUnit::Us, bits: None },
                LogicalType::Time { unit: TimeUnit::S, bits: None },
                LogicalType::date(),
                LogicalType::Date { bits: Some(64) },
                LogicalType::decimal(50, 2).unwrap(),
                LogicalType::decimal(10, 2).unwrap(),
                LogicalType::Decimal {
                    precision: Some(10),
                    scale: Some(2),
                    bits: Some(256),
                },
            ]
        );
    }

    #[test]
    fn loader_maps_nullability_and_timezone() {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new(
                "at",
                DataType::Timestamp(ArrowTimeUnit::Microsecond, Some(Arc::from("UTC"))),
                true,
            ),
        ]);
        let loaded = ArrowLoader.load(&schema, &LoadConfig::new().name("events")).unwrap();
        let spec = loaded.spec;

        assert_eq!(spec.name(), "events");
        assert!(!spec.columns()[0].is_nullable());
        assert_eq!(
            spec.columns()[1].data_type,
            LogicalType::TimestampTz {
                unit: TimeUnit::Us,
                tz: "UTC".to_string()
            }
        );
        assert!(loaded.warnings.is_empty());
    }
}
