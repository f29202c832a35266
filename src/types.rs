//! Scalar type converters.
//!
//! A [`TypeConverter`] turns XML text into a [`Scalar`] and back for one
//! scalar type identifier. Field mappings name their type by identifier and
//! the engines look the converter up in a [`TypeRegistry`].
//!
//! Built-in identifiers:
//!
//! | Identifier | Scalar | Text form |
//! |---|---|---|
//! | `string` | [`Scalar::Str`] | verbatim |
//! | `integer` | [`Scalar::Int`] | decimal |
//! | `float` | [`Scalar::Float`] | decimal |
//! | `boolean` | [`Scalar::Bool`] | `true`/`false` (`1`/`0` accepted) |
//! | `datetime` | [`Scalar::DateTime`] | RFC 3339 |
//! | `date` | [`Scalar::Date`] | `YYYY-MM-DD` |

use crate::error::{Error, Result};
use crate::value::Scalar;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Identifier of the built-in string type.
pub const STRING: &str = "string";
/// Identifier of the built-in integer type.
pub const INTEGER: &str = "integer";
/// Identifier of the built-in float type.
pub const FLOAT: &str = "float";
/// Identifier of the built-in boolean type.
pub const BOOLEAN: &str = "boolean";
/// Identifier of the built-in timestamp type.
pub const DATETIME: &str = "datetime";
/// Identifier of the built-in date type.
pub const DATE: &str = "date";

/// Bidirectional conversion between XML text and a scalar value.
pub trait TypeConverter: Send + Sync {
    /// Converts XML text into a native value.
    fn to_native(&self, text: &str) -> Result<Scalar>;

    /// Converts a native value into XML text.
    fn to_text(&self, value: &Scalar) -> Result<String>;
}

/// Converter for `string` fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringType;

impl TypeConverter for StringType {
    fn to_native(&self, text: &str) -> Result<Scalar> {
        Ok(Scalar::Str(text.to_string()))
    }

    fn to_text(&self, value: &Scalar) -> Result<String> {
        Ok(value.to_string())
    }
}

/// Converter for `integer` fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerType;

impl TypeConverter for IntegerType {
    fn to_native(&self, text: &str) -> Result<Scalar> {
        text.trim()
            .parse::<i64>()
            .map(Scalar::Int)
            .map_err(|e| Error::converter(INTEGER, format!("'{}': {}", text, e)))
    }

    fn to_text(&self, value: &Scalar) -> Result<String> {
        match value {
            Scalar::Int(i) => Ok(i.to_string()),
            other => Err(unexpected(INTEGER, other)),
        }
    }
}

/// Converter for `float` fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatType;

impl TypeConverter for FloatType {
    fn to_native(&self, text: &str) -> Result<Scalar> {
        text.trim()
            .parse::<f64>()
            .map(Scalar::Float)
            .map_err(|e| Error::converter(FLOAT, format!("'{}': {}", text, e)))
    }

    fn to_text(&self, value: &Scalar) -> Result<String> {
        match value {
            Scalar::Float(x) => Ok(x.to_string()),
            Scalar::Int(i) => Ok(i.to_string()),
            other => Err(unexpected(FLOAT, other)),
        }
    }
}

/// Converter for `boolean` fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanType;

impl TypeConverter for BooleanType {
    fn to_native(&self, text: &str) -> Result<Scalar> {
        parse_bool(text.trim())
            .map(Scalar::Bool)
            .ok_or_else(|| Error::converter(BOOLEAN, format!("'{}' is not a boolean", text)))
    }

    fn to_text(&self, value: &Scalar) -> Result<String> {
        match value {
            Scalar::Bool(b) => Ok(if *b { "true" } else { "false" }.to_string()),
            other => Err(unexpected(BOOLEAN, other)),
        }
    }
}

/// Converter for `datetime` fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeType;

impl TypeConverter for DateTimeType {
    fn to_native(&self, text: &str) -> Result<Scalar> {
        parse_iso8601(text.trim()).map(Scalar::DateTime)
    }

    fn to_text(&self, value: &Scalar) -> Result<String> {
        match value {
            Scalar::DateTime(dt) => Ok(dt.to_rfc3339()),
            other => Err(unexpected(DATETIME, other)),
        }
    }
}

/// Converter for `date` fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateType;

impl TypeConverter for DateType {
    fn to_native(&self, text: &str) -> Result<Scalar> {
        NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
            .map(Scalar::Date)
            .map_err(|e| Error::converter(DATE, format!("'{}': {}", text, e)))
    }

    fn to_text(&self, value: &Scalar) -> Result<String> {
        match value {
            Scalar::Date(d) => Ok(d.format("%Y-%m-%d").to_string()),
            other => Err(unexpected(DATE, other)),
        }
    }
}

fn unexpected(type_name: &str, value: &Scalar) -> Error {
    Error::converter(type_name, format!("cannot write a {} value", value.kind()))
}

/// Parses a boolean value from a string.
///
/// Accepts "1", "0", "true", "false" (case-insensitive).
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

/// Parses an ISO 8601 timestamp, assuming UTC when no offset is given.
pub fn parse_iso8601(s: &str) -> Result<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt);
    }

    let formats = [
        "%Y-%m-%dT%H:%M:%S%.f%:z",
        "%Y-%m-%dT%H:%M:%S%:z",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ];

    for fmt in formats {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&naive).fixed_offset());
        }
    }

    Err(Error::converter(
        DATETIME,
        format!("cannot parse timestamp '{}'", s),
    ))
}

/// Lookup table from scalar type identifiers to converters.
#[derive(Clone)]
pub struct TypeRegistry {
    converters: HashMap<String, Arc<dyn TypeConverter>>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    pub fn empty() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    /// Creates a registry holding the built-in converters.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(STRING, StringType);
        registry.register(INTEGER, IntegerType);
        registry.register(FLOAT, FloatType);
        registry.register(BOOLEAN, BooleanType);
        registry.register(DATETIME, DateTimeType);
        registry.register(DATE, DateType);
        registry
    }

    /// Registers a converter, replacing any previous one for the identifier.
    pub fn register(&mut self, type_name: impl Into<String>, converter: impl TypeConverter + 'static) {
        self.converters.insert(type_name.into(), Arc::new(converter));
    }

    /// Returns true if a converter is registered for the identifier.
    pub fn contains(&self, type_name: &str) -> bool {
        self.converters.contains_key(type_name)
    }

    /// Looks up the converter for a type identifier.
    pub fn get(&self, type_name: &str) -> Result<&dyn TypeConverter> {
        self.converters
            .get(type_name)
            .map(|c| c.as_ref())
            .ok_or_else(|| Error::converter(type_name, "no converter registered"))
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.converters.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("TypeRegistry").field("types", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("FALSE"), Some(false));
        assert_eq!(parse_bool("yes"), None);
    }

    #[test]
    fn test_integer_converter() {
        let types = TypeRegistry::with_builtins();
        let int = types.get(INTEGER).unwrap();
        assert_eq!(int.to_native(" 42 ").unwrap(), Scalar::Int(42));
        assert_eq!(int.to_text(&Scalar::Int(-7)).unwrap(), "-7");
        assert!(matches!(
            int.to_native("forty-two"),
            Err(Error::Converter { .. })
        ));
        assert!(int.to_text(&Scalar::Str("1".into())).is_err());
    }

    #[test]
    fn test_boolean_converter() {
        let types = TypeRegistry::with_builtins();
        let b = types.get(BOOLEAN).unwrap();
        assert_eq!(b.to_native("1").unwrap(), Scalar::Bool(true));
        assert_eq!(b.to_text(&Scalar::Bool(false)).unwrap(), "false");
    }

    #[test]
    fn test_datetime_converter() {
        let types = TypeRegistry::with_builtins();
        let dt = types.get(DATETIME).unwrap();

        let parsed = dt.to_native("2024-01-15T10:30:00Z").unwrap();
        let Scalar::DateTime(time) = &parsed else {
            panic!("expected a datetime");
        };
        assert_eq!(time.timestamp(), 1705314600);
        assert_eq!(dt.to_text(&parsed).unwrap(), "2024-01-15T10:30:00+00:00");

        let naive = parse_iso8601("2024-01-15T10:30:00").unwrap();
        assert_eq!(naive.timestamp(), 1705314600);
    }

    #[test]
    fn test_date_converter() {
        let types = TypeRegistry::with_builtins();
        let date = types.get(DATE).unwrap();
        let parsed = date.to_native("2001-09-11").unwrap();
        assert_eq!(date.to_text(&parsed).unwrap(), "2001-09-11");
        assert!(date.to_native("11/09/2001").is_err());
    }

    #[test]
    fn test_unknown_type() {
        let types = TypeRegistry::with_builtins();
        assert!(types.contains(STRING));
        assert!(matches!(types.get("money"), Err(Error::Converter { .. })));
    }

    #[test]
    fn test_custom_converter() {
        struct Upper;
        impl TypeConverter for Upper {
            fn to_native(&self, text: &str) -> Result<Scalar> {
                Ok(Scalar::Str(text.to_uppercase()))
            }
            fn to_text(&self, value: &Scalar) -> Result<String> {
                Ok(value.to_string().to_lowercase())
            }
        }

        let mut types = TypeRegistry::empty();
        types.register("upper", Upper);
        let conv = types.get("upper").unwrap();
        assert_eq!(conv.to_native("abc").unwrap(), Scalar::Str("ABC".into()));
    }
}
