//! Logical type system
//!
//! A closed set of parameterized type variants shared by every target.
//! Parameter combinations are checked by [`LogicalType::validate`], which the
//! checked constructors and the spec builder both run, so a built
//! [`Spec`](crate::Spec) never holds an inconsistent type.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::spec::Column;

/// Resolution of time, timestamp and duration values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    S,
    Ms,
    Us,
    Ns,
}

impl TimeUnit {
    /// Canonical lowercase spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S => "s",
            Self::Ms => "ms",
            Self::Us => "us",
            Self::Ns => "ns",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s" => Ok(Self::S),
            "ms" => Ok(Self::Ms),
            "us" => Ok(Self::Us),
            "ns" => Ok(Self::Ns),
            _ => Err(Error::invalid_type_parameters(format!(
                "Unknown time unit '{}'. Expected one of: s, ms, us, ns.",
                s
            ))),
        }
    }
}

/// Interval field, from most to least significant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IntervalUnit {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

/// The two families interval fields can never be mixed across
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntervalCategory {
    YearMonth,
    DayTime,
}

impl IntervalUnit {
    /// Canonical uppercase spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Year => "YEAR",
            Self::Month => "MONTH",
            Self::Day => "DAY",
            Self::Hour => "HOUR",
            Self::Minute => "MINUTE",
            Self::Second => "SECOND",
        }
    }

    pub fn category(&self) -> IntervalCategory {
        match self {
            Self::Year | Self::Month => IntervalCategory::YearMonth,
            _ => IntervalCategory::DayTime,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Year => 0,
            Self::Month => 1,
            Self::Day => 2,
            Self::Hour => 3,
            Self::Minute => 4,
            Self::Second => 5,
        }
    }
}

impl fmt::Display for IntervalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntervalUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "YEAR" => Ok(Self::Year),
            "MONTH" => Ok(Self::Month),
            "DAY" => Ok(Self::Day),
            "HOUR" => Ok(Self::Hour),
            "MINUTE" => Ok(Self::Minute),
            "SECOND" => Ok(Self::Second),
            _ => Err(Error::invalid_type_parameters(format!(
                "Unknown interval unit '{}'. Expected one of: YEAR, MONTH, DAY, HOUR, MINUTE, SECOND.",
                s
            ))),
        }
    }
}

/// Canonical tag of a [`LogicalType`] variant
///
/// Target adapters key their handler tables on this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeTag {
    String,
    Binary,
    Boolean,
    Integer,
    Float,
    Decimal,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    TimestampLtz,
    TimestampNtz,
    Duration,
    Interval,
    Array,
    Struct,
    Map,
    Tensor,
    Json,
    Variant,
    Uuid,
    Void,
    Geometry,
    Geography,
}

impl TypeTag {
    /// Every tag, in declaration order
    pub const ALL: [TypeTag; 24] = [
        Self::String,
        Self::Binary,
        Self::Boolean,
        Self::Integer,
        Self::Float,
        Self::Decimal,
        Self::Date,
        Self::Time,
        Self::Timestamp,
        Self::TimestampTz,
        Self::TimestampLtz,
        Self::TimestampNtz,
        Self::Duration,
        Self::Interval,
        Self::Array,
        Self::Struct,
        Self::Map,
        Self::Tensor,
        Self::Json,
        Self::Variant,
        Self::Uuid,
        Self::Void,
        Self::Geometry,
        Self::Geography,
    ];

    /// Canonical lowercase name, as written in spec text
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Binary => "binary",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Date => "date",
            Self::Time => "time",
            Self::Timestamp => "timestamp",
            Self::TimestampTz => "timestamptz",
            Self::TimestampLtz => "timestampltz",
            Self::TimestampNtz => "timestampntz",
            Self::Duration => "duration",
            Self::Interval => "interval",
            Self::Array => "array",
            Self::Struct => "struct",
            Self::Map => "map",
            Self::Tensor => "tensor",
            Self::Json => "json",
            Self::Variant => "variant",
            Self::Uuid => "uuid",
            Self::Void => "void",
            Self::Geometry => "geometry",
            Self::Geography => "geography",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A type token resolved at the parsing boundary
///
/// Aliases such as `bigint` or `uint16` pin a bit width and signedness that
/// explicit parameters may still override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeAlias {
    pub tag: TypeTag,
    pub bits: Option<u16>,
    pub signed: bool,
}

impl TypeAlias {
    /// Resolve a type token, case-insensitively
    pub fn resolve(token: &str) -> Option<Self> {
        let plain = |tag| Self { tag, bits: None, signed: true };
        let sized = |tag, bits| Self { tag, bits: Some(bits), signed: true };
        let unsigned = |bits| Self { tag: TypeTag::Integer, bits: Some(bits), signed: false };

        let alias = match token.trim().to_ascii_lowercase().as_str() {
            "string" | "text" | "varchar" | "char" => plain(TypeTag::String),
            "binary" | "blob" | "bytes" | "bytea" => plain(TypeTag::Binary),
            "bool" | "boolean" => plain(TypeTag::Boolean),
            "integer" => plain(TypeTag::Integer),
            "int" | "int32" => sized(TypeTag::Integer, 32),
            "int8" | "tinyint" | "byte" => sized(TypeTag::Integer, 8),
            "int16" | "smallint" | "short" => sized(TypeTag::Integer, 16),
            "int64" | "bigint" | "long" => sized(TypeTag::Integer, 64),
            "uint8" => unsigned(8),
            "uint16" => unsigned(16),
            "uint32" => unsigned(32),
            "uint64" => unsigned(64),
            "float16" | "half" => sized(TypeTag::Float, 16),
            "float" => plain(TypeTag::Float),
            "float32" | "real" => sized(TypeTag::Float, 32),
            "float64" | "double" => sized(TypeTag::Float, 64),
            "decimal" | "numeric" => plain(TypeTag::Decimal),
            "date" => plain(TypeTag::Date),
            "time" => plain(TypeTag::Time),
            "timestamp" | "datetime" => plain(TypeTag::Timestamp),
            "timestamptz" | "timestamp_tz" => plain(TypeTag::TimestampTz),
            "timestampltz" | "timestamp_ltz" => plain(TypeTag::TimestampLtz),
            "timestampntz" | "timestamp_ntz" => plain(TypeTag::TimestampNtz),
            "duration" => plain(TypeTag::Duration),
            "interval" => plain(TypeTag::Interval),
            "array" | "list" => plain(TypeTag::Array),
            "struct" | "record" => plain(TypeTag::Struct),
            "map" | "dictionary" => plain(TypeTag::Map),
            "tensor" => plain(TypeTag::Tensor),
            "json" => plain(TypeTag::Json),
            "variant" => plain(TypeTag::Variant),
            "uuid" => plain(TypeTag::Uuid),
            "void" | "null" => plain(TypeTag::Void),
            "geometry" => plain(TypeTag::Geometry),
            "geography" => plain(TypeTag::Geography),
            _ => return None,
        };
        Some(alias)
    }
}

/// Default zone for zoned timestamps
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// Canonical logical type
///
/// Types compare structurally: two `decimal(10,2)` values are equal
/// regardless of where they were built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogicalType {
    /// Variable-length text, optionally bounded
    String { length: Option<u32> },

    /// Byte string, optionally fixed-length
    Binary { length: Option<u32> },

    Boolean,

    /// Integer of 8, 16, 32 or 64 bits
    Integer { bits: Option<u16>, signed: bool },

    /// IEEE float of 16, 32 or 64 bits
    Float { bits: Option<u16> },

    /// Fixed-precision decimal. A negative scale rounds to the left of the point.
    Decimal {
        precision: Option<u32>,
        scale: Option<i32>,
        bits: Option<u16>,
    },

    /// Calendar date stored in 32 or 64 bits
    Date { bits: Option<u16> },

    /// Time of day
    Time { unit: TimeUnit, bits: Option<u16> },

    /// Wall-clock timestamp without zone semantics
    Timestamp { unit: TimeUnit },

    /// Instant pinned to an explicit zone
    TimestampTz { unit: TimeUnit, tz: String },

    /// Instant rendered in the session's local zone
    TimestampLtz { unit: TimeUnit },

    /// Timestamp that explicitly carries no zone
    TimestampNtz { unit: TimeUnit },

    Duration { unit: TimeUnit },

    /// Calendar interval spanning `start` to `end` (inclusive)
    Interval {
        start: IntervalUnit,
        end: Option<IntervalUnit>,
    },

    Array {
        element: Box<LogicalType>,
        size: Option<u32>,
    },

    /// Ordered named fields
    Struct { fields: Vec<Column> },

    Map {
        key: Box<LogicalType>,
        value: Box<LogicalType>,
        keys_sorted: bool,
    },

    /// Dense fixed-shape tensor
    Tensor {
        element: Box<LogicalType>,
        shape: Vec<u32>,
    },

    Json,

    /// Semi-structured value of any shape
    Variant,

    Uuid,

    /// Type of a column that only ever holds null
    Void,

    Geometry { srid: Option<u32> },

    Geography { srid: Option<u32> },
}

impl LogicalType {
    /// Unbounded string
    pub fn string() -> Self {
        Self::String { length: None }
    }

    /// Length-bounded string
    pub fn varchar(length: u32) -> Result<Self> {
        Self::String { length: Some(length) }.validated()
    }

    pub fn binary() -> Self {
        Self::Binary { length: None }
    }

    pub fn boolean() -> Self {
        Self::Boolean
    }

    /// Signed or unsigned integer with a checked bit width
    pub fn integer(bits: u16, signed: bool) -> Result<Self> {
        Self::Integer { bits: Some(bits), signed }.validated()
    }

    pub fn int32() -> Self {
        Self::Integer { bits: Some(32), signed: true }
    }

    pub fn int64() -> Self {
        Self::Integer { bits: Some(64), signed: true }
    }

    pub fn float(bits: u16) -> Result<Self> {
        Self::Float { bits: Some(bits) }.validated()
    }

    pub fn float64() -> Self {
        Self::Float { bits: Some(64) }
    }

    /// Decimal with precision and scale
    pub fn decimal(precision: u32, scale: i32) -> Result<Self> {
        Self::Decimal {
            precision: Some(precision),
            scale: Some(scale),
            bits: None,
        }
        .validated()
    }

    pub fn date() -> Self {
        Self::Date { bits: None }
    }

    pub fn timestamp() -> Self {
        Self::Timestamp { unit: TimeUnit::Ns }
    }

    pub fn timestamp_tz(tz: impl Into<String>) -> Self {
        Self::TimestampTz {
            unit: TimeUnit::Ns,
            tz: tz.into(),
        }
    }

    pub fn interval(start: IntervalUnit, end: Option<IntervalUnit>) -> Result<Self> {
        Self::Interval { start, end }.validated()
    }

    pub fn array(element: LogicalType) -> Self {
        Self::Array {
            element: Box::new(element),
            size: None,
        }
    }

    pub fn fixed_array(element: LogicalType, size: u32) -> Result<Self> {
        Self::Array {
            element: Box::new(element),
            size: Some(size),
        }
        .validated()
    }

    pub fn structure(fields: Vec<Column>) -> Result<Self> {
        Self::Struct { fields }.validated()
    }

    pub fn map(key: LogicalType, value: LogicalType) -> Self {
        Self::Map {
            key: Box::new(key),
            value: Box::new(value),
            keys_sorted: false,
        }
    }

    pub fn tensor(element: LogicalType, shape: Vec<u32>) -> Result<Self> {
        Self::Tensor {
            element: Box::new(element),
            shape,
        }
        .validated()
    }

    fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Canonical tag of this variant
    pub fn tag(&self) -> TypeTag {
        match self {
            Self::String { .. } => TypeTag::String,
            Self::Binary { .. } => TypeTag::Binary,
            Self::Boolean => TypeTag::Boolean,
            Self::Integer { .. } => TypeTag::Integer,
            Self::Float { .. } => TypeTag::Float,
            Self::Decimal { .. } => TypeTag::Decimal,
            Self::Date { .. } => TypeTag::Date,
            Self::Time { .. } => TypeTag::Time,
            Self::Timestamp { .. } => TypeTag::Timestamp,
            Self::TimestampTz { .. } => TypeTag::TimestampTz,
            Self::TimestampLtz { .. } => TypeTag::TimestampLtz,
            Self::TimestampNtz { .. } => TypeTag::TimestampNtz,
            Self::Duration { .. } => TypeTag::Duration,
            Self::Interval { .. } => TypeTag::Interval,
            Self::Array { .. } => TypeTag::Array,
            Self::Struct { .. } => TypeTag::Struct,
            Self::Map { .. } => TypeTag::Map,
            Self::Tensor { .. } => TypeTag::Tensor,
            Self::Json => TypeTag::Json,
            Self::Variant => TypeTag::Variant,
            Self::Uuid => TypeTag::Uuid,
            Self::Void => TypeTag::Void,
            Self::Geometry { .. } => TypeTag::Geometry,
            Self::Geography { .. } => TypeTag::Geography,
        }
    }

    /// Check this type's parameters, recursing into nested types
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::String { length } | Self::Binary { length } => {
                if *length == Some(0) {
                    return Err(Error::invalid_type_parameters(format!(
                        "{} length must be greater than 0.",
                        self.tag()
                    )));
                }
            }
            Self::Integer { bits, .. } => check_bits("integer", *bits, &[8, 16, 32, 64])?,
            Self::Float { bits } => check_bits("float", *bits, &[16, 32, 64])?,
            Self::Decimal {
                precision,
                scale,
                bits,
            } => validate_decimal(*precision, *scale, *bits)?,
            Self::Date { bits } => check_bits("date", *bits, &[32, 64])?,
            Self::Time { bits, .. } => check_bits("time", *bits, &[32, 64])?,
            Self::TimestampTz { tz, .. } => {
                if tz.trim().is_empty() {
                    return Err(Error::invalid_type_parameters(
                        "timestamptz requires a non-empty time zone.",
                    ));
                }
            }
            Self::Interval { start, end } => {
                if let Some(end) = end {
                    if start.category() != end.category() {
                        return Err(Error::invalid_type_parameters(format!(
                            "Invalid interval: end unit '{}' must belong to the same category as start unit '{}'.",
                            end, start
                        )));
                    }
                    if end.rank() < start.rank() {
                        return Err(Error::invalid_type_parameters(format!(
                            "Invalid interval: end unit '{}' cannot be more significant than start unit '{}'.",
                            end, start
                        )));
                    }
                }
            }
            Self::Array { element, size } => {
                if *size == Some(0) {
                    return Err(Error::invalid_type_parameters(
                        "array size must be greater than 0.",
                    ));
                }
                element.validate()?;
            }
            Self::Struct { fields } => {
                if fields.is_empty() {
                    return Err(Error::invalid_type_parameters(
                        "struct requires at least one field.",
                    ));
                }
                let mut seen = HashSet::new();
                for field in fields {
                    if !seen.insert(field.name.as_str()) {
                        return Err(Error::invalid_type_parameters(format!(
                            "Duplicate struct field name '{}'.",
                            field.name
                        )));
                    }
                    field.data_type.validate()?;
                }
            }
            Self::Map { key, value, .. } => {
                key.validate()?;
                value.validate()?;
            }
            Self::Tensor { element, shape } => {
                if shape.is_empty() {
                    return Err(Error::invalid_type_parameters(
                        "tensor shape must have at least one dimension.",
                    ));
                }
                if shape.contains(&0) {
                    return Err(Error::invalid_type_parameters(format!(
                        "tensor dimensions must be positive, got {:?}.",
                        shape
                    )));
                }
                element.validate()?;
            }
            Self::Boolean
            | Self::Timestamp { .. }
            | Self::TimestampLtz { .. }
            | Self::TimestampNtz { .. }
            | Self::Duration { .. }
            | Self::Json
            | Self::Variant
            | Self::Uuid
            | Self::Void
            | Self::Geometry { .. }
            | Self::Geography { .. } => {}
        }
        Ok(())
    }
}

fn check_bits(type_name: &str, bits: Option<u16>, allowed: &[u16]) -> Result<()> {
    match bits {
        Some(bits) if !allowed.contains(&bits) => {
            let allowed = allowed
                .iter()
                .map(|b| b.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            Err(Error::invalid_type_parameters(format!(
                "{} bits must be one of {{{}}}, not {}.",
                type_name, allowed, bits
            )))
        }
        _ => Ok(()),
    }
}

/// Widest precision a 256-bit decimal can hold
const DECIMAL_MAX_PRECISION: u32 = 76;

fn validate_decimal(precision: Option<u32>, scale: Option<i32>, bits: Option<u16>) -> Result<()> {
    check_bits("decimal", bits, &[128, 256])?;
    match (precision, scale) {
        (None, Some(_)) => {
            return Err(Error::invalid_type_parameters(
                "decimal scale requires a precision.",
            ))
        }
        (Some(0), _) => {
            return Err(Error::invalid_type_parameters(
                "decimal precision must be a positive integer.",
            ))
        }
        (Some(precision), Some(scale)) if i64::from(scale) > i64::from(precision) => {
            return Err(Error::invalid_type_parameters(format!(
                "decimal scale must be less than or equal to precision ({}), got {}.",
                precision, scale
            )))
        }
        _ => {}
    }
    if let (Some(precision), Some(256)) = (precision, bits) {
        if precision > DECIMAL_MAX_PRECISION {
            return Err(Error::invalid_type_parameters(format!(
                "decimal precision must be at most {} for 256 bits, got {}.",
                DECIMAL_MAX_PRECISION, precision
            )));
        }
    }
    Ok(())
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String { length: None } => write!(f, "string"),
            Self::String { length: Some(n) } => write!(f, "string({})", n),
            Self::Binary { length: None } => write!(f, "binary"),
            Self::Binary { length: Some(n) } => write!(f, "binary({})", n),
            Self::Boolean => write!(f, "boolean"),
            Self::Integer { bits, signed } => {
                let mut params = Vec::new();
                if let Some(bits) = bits {
                    params.push(format!("bits={}", bits));
                }
                if !signed {
                    params.push("signed=false".to_string());
                }
                write_params(f, "integer", &params)
            }
            Self::Float { bits } => match bits {
                Some(bits) => write!(f, "float(bits={})", bits),
                None => write!(f, "float"),
            },
            Self::Decimal {
                precision,
                scale,
                bits,
            } => {
                write!(f, "decimal")?;
                match (precision, scale, bits) {
                    (None, _, None) => Ok(()),
                    (None, _, Some(bits)) => write!(f, "(bits={})", bits),
                    (Some(p), None, None) => write!(f, "({})", p),
                    (Some(p), Some(s), None) => write!(f, "({},{})", p, s),
                    (Some(p), None, Some(bits)) => write!(f, "({},bits={})", p, bits),
                    (Some(p), Some(s), Some(bits)) => write!(f, "({},{},bits={})", p, s, bits),
                }
            }
            Self::Date { bits } => match bits {
                Some(bits) => write!(f, "date(bits={})", bits),
                None => write!(f, "date"),
            },
            Self::Time { unit, bits } => match bits {
                Some(bits) => write!(f, "time(unit={}, bits={})", unit, bits),
                None => write!(f, "time(unit={})", unit),
            },
            Self::Timestamp { unit } => write!(f, "timestamp(unit={})", unit),
            Self::TimestampTz { unit, tz } => write!(f, "timestamptz(unit={}, tz={})", unit, tz),
            Self::TimestampLtz { unit } => write!(f, "timestampltz(unit={})", unit),
            Self::TimestampNtz { unit } => write!(f, "timestampntz(unit={})", unit),
            Self::Duration { unit } => write!(f, "duration(unit={})", unit),
            Self::Interval { start, end } => match end {
                Some(end) if end != start => write!(f, "interval({} to {})", start, end),
                _ => write!(f, "interval({})", start),
            },
            Self::Array { element, size } => match size {
                Some(size) => write!(f, "array<{}, size={}>", element, size),
                None => write!(f, "array<{}>", element),
            },
            Self::Struct { fields } => {
                write!(f, "struct<")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.data_type)?;
                }
                write!(f, ">")
            }
            Self::Map {
                key,
                value,
                keys_sorted,
            } => {
                if *keys_sorted {
                    write!(f, "map<{}, {}, keys_sorted=true>", key, value)
                } else {
                    write!(f, "map<{}, {}>", key, value)
                }
            }
            Self::Tensor { element, shape } => {
                let dims = shape
                    .iter()
                    .map(|d| d.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "tensor<{}, shape=[{}]>", element, dims)
            }
            Self::Json => write!(f, "json"),
            Self::Variant => write!(f, "variant"),
            Self::Uuid => write!(f, "uuid"),
            Self::Void => write!(f, "void"),
            Self::Geometry { srid } => match srid {
                Some(srid) => write!(f, "geometry(srid={})", srid),
                None => write!(f, "geometry"),
            },
            Self::Geography { srid } => match srid {
                Some(srid) => write!(f, "geography(srid={})", srid),
                None => write!(f, "geography"),
            },
        }
    }
}

fn write_params(f: &mut fmt::Formatter<'_>, name: &str, params: &[String]) -> fmt::Result {
    if params.is_empty() {
        write!(f, "{}", name)
    } else {
        write!(f, "{}({})", name, params.join(", "))
    }
}
