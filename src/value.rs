//! Values exchanged between the engines and mapped objects.
//!
//! Mapped classes expose their fields through the [`MappedObject`] trait:
//! marshalling reads fields as borrowed [`ValueRef`]s and unmarshalling
//! assigns owned [`Value`]s. Leaf values are [`Scalar`]s, which the
//! [`TypeConverter`](crate::types::TypeConverter)s turn into XML text and back.

use crate::error::{Error, Result};
use chrono::{DateTime, FixedOffset, NaiveDate};
use std::any::Any;
use std::fmt;

/// Upcasting support for [`MappedObject`] trait objects.
///
/// Implemented for every `'static` type; mapped classes never implement it
/// by hand.
pub trait AsAny: Any {
    /// Returns `self` as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;

    /// Converts a boxed value into `Box<dyn Any>`.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// A class instance that can be bound to an XML element.
///
/// This is the field-access capability the engines depend on. Implementations
/// are written once per class, next to the class mapping:
///
/// ```rust
/// use oxm_rs::{MappedObject, Result, Value, ValueRef};
///
/// #[derive(Debug, Default)]
/// struct Tag {
///     name: Option<String>,
/// }
///
/// impl MappedObject for Tag {
///     fn class_id(&self) -> &'static str {
///         "Tag"
///     }
///
///     fn get_field(&self, field: &str) -> ValueRef<'_> {
///         match field {
///             "name" => ValueRef::scalar(&self.name),
///             _ => ValueRef::Null,
///         }
///     }
///
///     fn set_field(&mut self, field: &str, value: Value) -> Result<()> {
///         match field {
///             "name" => self.name = value.into_opt()?,
///             _ => {}
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait MappedObject: AsAny + fmt::Debug {
    /// The runtime class identifier, used to look up the class mapping.
    fn class_id(&self) -> &'static str;

    /// Reads a field. Unknown or unset fields return [`ValueRef::Null`].
    fn get_field(&self, field: &str) -> ValueRef<'_>;

    /// Assigns a field.
    fn set_field(&mut self, field: &str, value: Value) -> Result<()>;
}

impl dyn MappedObject {
    /// Returns true if the object is an instance of `T`.
    pub fn is<T: MappedObject>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Borrows the object as a `T`.
    pub fn downcast_ref<T: MappedObject>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Converts a boxed object into a `T`, returning the box unchanged on mismatch.
    pub fn downcast<T: MappedObject>(self: Box<Self>) -> std::result::Result<T, Box<Self>> {
        if self.is::<T>() {
            match self.into_any().downcast::<T>() {
                Ok(object) => Ok(*object),
                Err(_) => unreachable!("type checked above"),
            }
        } else {
            Err(self)
        }
    }
}

/// A leaf value handled by a type converter.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Scalar {
    /// Text
    Str(String),
    /// Signed integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Boolean
    Bool(bool),
    /// Timestamp with offset
    DateTime(DateTime<FixedOffset>),
    /// Calendar date
    Date(NaiveDate),
}

impl Scalar {
    /// Returns the variant name, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Scalar::Str(_) => "string",
            Scalar::Int(_) => "integer",
            Scalar::Float(_) => "float",
            Scalar::Bool(_) => "boolean",
            Scalar::DateTime(_) => "datetime",
            Scalar::Date(_) => "date",
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(s) => write!(f, "{}", s),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Scalar::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Conversion from a [`Scalar`] into a native field type.
pub trait FromScalar: Sized {
    /// Converts the scalar, or returns `None` if the variant does not fit.
    fn from_scalar(scalar: Scalar) -> Option<Self>;
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl FromScalar for String {
    fn from_scalar(scalar: Scalar) -> Option<Self> {
        match scalar {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }
}

macro_rules! int_scalar {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Scalar {
                fn from(v: $t) -> Self {
                    Scalar::Int(v as i64)
                }
            }

            impl FromScalar for $t {
                fn from_scalar(scalar: Scalar) -> Option<Self> {
                    match scalar {
                        Scalar::Int(i) => <$t>::try_from(i).ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

int_scalar!(i8, i16, i32, i64, u8, u16, u32);

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl FromScalar for f64 {
    fn from_scalar(scalar: Scalar) -> Option<Self> {
        match scalar {
            Scalar::Float(x) => Some(x),
            Scalar::Int(i) => Some(i as f64),
            _ => None,
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl FromScalar for bool {
    fn from_scalar(scalar: Scalar) -> Option<Self> {
        match scalar {
            Scalar::Bool(b) => Some(b),
            _ => None,
        }
    }
}

impl From<DateTime<FixedOffset>> for Scalar {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Scalar::DateTime(v)
    }
}

impl FromScalar for DateTime<FixedOffset> {
    fn from_scalar(scalar: Scalar) -> Option<Self> {
        match scalar {
            Scalar::DateTime(dt) => Some(dt),
            _ => None,
        }
    }
}

impl From<NaiveDate> for Scalar {
    fn from(v: NaiveDate) -> Self {
        Scalar::Date(v)
    }
}

impl FromScalar for NaiveDate {
    fn from_scalar(scalar: Scalar) -> Option<Self> {
        match scalar {
            Scalar::Date(d) => Some(d),
            _ => None,
        }
    }
}

/// An owned field value produced while unmarshalling.
#[derive(Debug)]
pub enum Value {
    /// No value
    Null,
    /// A leaf value
    Scalar(Scalar),
    /// A nested mapped object
    Object(Box<dyn MappedObject>),
    /// An ordered collection
    List(Vec<Value>),
}

impl Value {
    /// Returns the variant name, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Scalar(s) => s.kind(),
            Value::Object(_) => "object",
            Value::List(_) => "list",
        }
    }

    /// Converts a scalar value into `T`; `Null` becomes `None`.
    pub fn into_opt<T: FromScalar>(self) -> Result<Option<T>> {
        match self {
            Value::Null => Ok(None),
            Value::Scalar(s) => {
                let kind = s.kind();
                T::from_scalar(s).map(Some).ok_or_else(|| mismatch::<T>(kind))
            }
            other => Err(mismatch::<T>(other.kind())),
        }
    }

    /// Converts a list of scalars into a `Vec<T>`; `Null` becomes an empty vector.
    pub fn into_vec<T: FromScalar>(self) -> Result<Vec<T>> {
        match self {
            Value::Null => Ok(Vec::new()),
            Value::List(items) => items
                .into_iter()
                .filter_map(|item| item.into_opt::<T>().transpose())
                .collect(),
            other => Err(mismatch::<Vec<T>>(other.kind())),
        }
    }

    /// Converts a nested object into a `T`; `Null` becomes `None`.
    pub fn into_object<T: MappedObject>(self) -> Result<Option<T>> {
        match self {
            Value::Null => Ok(None),
            Value::Object(object) => object.downcast::<T>().map(Some).map_err(|object| {
                Error::UnexpectedType {
                    expected: std::any::type_name::<T>().to_string(),
                    found: object.class_id().to_string(),
                }
            }),
            other => Err(mismatch::<T>(other.kind())),
        }
    }

    /// Converts a list of nested objects into a `Vec<T>`.
    pub fn into_objects<T: MappedObject>(self) -> Result<Vec<T>> {
        match self {
            Value::Null => Ok(Vec::new()),
            Value::List(items) => items
                .into_iter()
                .filter_map(|item| item.into_object::<T>().transpose())
                .collect(),
            other => Err(mismatch::<Vec<T>>(other.kind())),
        }
    }

    /// Returns a nested object without downcasting, for polymorphic fields.
    pub fn into_boxed(self) -> Result<Option<Box<dyn MappedObject>>> {
        match self {
            Value::Null => Ok(None),
            Value::Object(object) => Ok(Some(object)),
            other => Err(mismatch::<Box<dyn MappedObject>>(other.kind())),
        }
    }

    /// Returns a list of nested objects without downcasting.
    pub fn into_boxed_list(self) -> Result<Vec<Box<dyn MappedObject>>> {
        match self {
            Value::Null => Ok(Vec::new()),
            Value::List(items) => items
                .into_iter()
                .filter_map(|item| item.into_boxed().transpose())
                .collect(),
            other => Err(mismatch::<Vec<Box<dyn MappedObject>>>(other.kind())),
        }
    }
}

fn mismatch<T>(found: &str) -> Error {
    Error::converter(
        std::any::type_name::<T>(),
        format!("cannot assign a {} value", found),
    )
}

/// A borrowed field value read while marshalling.
#[derive(Debug, Clone)]
pub enum ValueRef<'a> {
    /// No value
    Null,
    /// A leaf value
    Scalar(Scalar),
    /// A nested mapped object
    Object(&'a dyn MappedObject),
    /// An ordered collection
    List(Vec<ValueRef<'a>>),
}

impl<'a> ValueRef<'a> {
    /// Builds a scalar value from an optional field.
    pub fn scalar<T: Clone + Into<Scalar>>(value: &Option<T>) -> Self {
        match value {
            Some(v) => ValueRef::Scalar(v.clone().into()),
            None => ValueRef::Null,
        }
    }

    /// Builds a list of scalars from a slice.
    pub fn scalars<T: Clone + Into<Scalar>>(values: &[T]) -> Self {
        ValueRef::List(
            values
                .iter()
                .map(|v| ValueRef::Scalar(v.clone().into()))
                .collect(),
        )
    }

    /// Builds an object value from an optional nested object.
    pub fn object<T: MappedObject>(value: &'a Option<T>) -> Self {
        match value {
            Some(v) => ValueRef::Object(v),
            None => ValueRef::Null,
        }
    }

    /// Builds a list of objects from a slice.
    pub fn objects<T: MappedObject>(values: &'a [T]) -> Self {
        ValueRef::List(
            values
                .iter()
                .map(|v| ValueRef::Object(v as &dyn MappedObject))
                .collect(),
        )
    }

    /// Builds an object value from an optional boxed object.
    pub fn boxed(value: &'a Option<Box<dyn MappedObject>>) -> Self {
        match value {
            Some(v) => ValueRef::Object(v.as_ref()),
            None => ValueRef::Null,
        }
    }

    /// Builds a list of objects from boxed objects.
    pub fn boxed_list(values: &'a [Box<dyn MappedObject>]) -> Self {
        ValueRef::List(values.iter().map(|v| ValueRef::Object(v.as_ref())).collect())
    }

    /// Returns true for `Null` and for empty collections.
    pub fn is_absent(&self) -> bool {
        match self {
            ValueRef::Null => true,
            ValueRef::List(items) => items.is_empty(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Author;

    #[test]
    fn test_scalar_conversions() {
        assert_eq!(Value::Scalar(Scalar::Int(42)).into_opt::<u32>().unwrap(), Some(42));
        assert_eq!(Value::Null.into_opt::<String>().unwrap(), None);
        assert!(Value::Scalar(Scalar::Int(-1)).into_opt::<u32>().is_err());
        assert!(Value::Scalar(Scalar::Str("x".into())).into_opt::<bool>().is_err());
    }

    #[test]
    fn test_list_conversion_skips_nulls() {
        let list = Value::List(vec![
            Value::Scalar(Scalar::Int(1)),
            Value::Null,
            Value::Scalar(Scalar::Int(3)),
        ]);
        assert_eq!(list.into_vec::<i64>().unwrap(), vec![1, 3]);
    }

    #[test]
    fn test_object_downcast() {
        let author = Author {
            name: Some("Ursula".to_string()),
            ..Default::default()
        };
        let value = Value::Object(Box::new(author.clone()));
        assert_eq!(value.into_object::<Author>().unwrap(), Some(author));

        let value = Value::Object(Box::new(Author::default()));
        let err = value.into_object::<crate::testing::Book>().unwrap_err();
        assert!(matches!(err, Error::UnexpectedType { .. }));
    }

    #[test]
    fn test_value_ref_absence() {
        assert!(ValueRef::Null.is_absent());
        assert!(ValueRef::List(Vec::new()).is_absent());
        assert!(!ValueRef::scalar(&Some(0i64)).is_absent());
        assert!(ValueRef::scalar::<String>(&None).is_absent());
    }

    #[test]
    fn test_scalar_display() {
        assert_eq!(Scalar::Int(7).to_string(), "7");
        assert_eq!(Scalar::Bool(true).to_string(), "true");
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(Scalar::Date(date).to_string(), "2024-01-15");
    }
}
