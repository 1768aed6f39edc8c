//! Cell values and the conversion rules applied when they are read back.

use std::fmt;

use chrono::NaiveDateTime;

use crate::error::{CoercionFailure, Error, Result};

/// Declared type of a column or parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbType {
    Boolean,
    Int16,
    Int32,
    Int64,
    Double,
    String,
    Binary,
    DateTime,
    /// Unknown or mixed type. Any value can be read as `Object`.
    Object,
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DbType::Boolean => "Boolean",
            DbType::Int16 => "Int16",
            DbType::Int32 => "Int32",
            DbType::Int64 => "Int64",
            DbType::Double => "Double",
            DbType::String => "String",
            DbType::Binary => "Binary",
            DbType::DateTime => "DateTime",
            DbType::Object => "Object",
        };
        write!(f, "{name}")
    }
}

/// A single boxed cell or parameter value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
    DateTime(NaiveDateTime),
}

impl Value {
    /// Check if the value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The type this value is stored as, or `None` for NULL.
    pub fn db_type(&self) -> Option<DbType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(DbType::Boolean),
            Value::Int16(_) => Some(DbType::Int16),
            Value::Int32(_) => Some(DbType::Int32),
            Value::Int64(_) => Some(DbType::Int64),
            Value::Double(_) => Some(DbType::Double),
            Value::Text(_) => Some(DbType::String),
            Value::Bytes(_) => Some(DbType::Binary),
            Value::DateTime(_) => Some(DbType::DateTime),
        }
    }

    /// Converts the value to `target` the way a provider's typed getter would.
    ///
    /// NULL passes through unchanged. Reading a value as its stored type or
    /// as [`DbType::Object`] always succeeds, integers widen freely, and any
    /// narrowing conversion fails with [`CoercionFailure::Overflow`].
    pub fn coerce(&self, target: DbType) -> std::result::Result<Value, CoercionFailure> {
        if self.is_null() || target == DbType::Object || self.db_type() == Some(target) {
            return Ok(self.clone());
        }
        match (self, target) {
            (Value::Int16(v), DbType::Int32) => Ok(Value::Int32(i32::from(*v))),
            (Value::Int16(v), DbType::Int64) => Ok(Value::Int64(i64::from(*v))),
            (Value::Int32(v), DbType::Int64) => Ok(Value::Int64(i64::from(*v))),
            (Value::Int16(v), DbType::Double) => Ok(Value::Double(f64::from(*v))),
            (Value::Int32(v), DbType::Double) => Ok(Value::Double(f64::from(*v))),
            (Value::Int64(v), DbType::Double) => Ok(Value::Double(*v as f64)),
            (Value::Int32(_) | Value::Int64(_) | Value::Double(_), DbType::Int16)
            | (Value::Int64(_) | Value::Double(_), DbType::Int32)
            | (Value::Double(_), DbType::Int64) => Err(CoercionFailure::Overflow),
            _ => Err(CoercionFailure::Incompatible),
        }
    }

    /// Compares two values, treating numbers of different widths as equal
    /// when they hold the same magnitude.
    pub fn loosely_eq(&self, other: &Value) -> bool {
        if let (Some(l), Some(r)) = (self.as_i64(), other.as_i64()) {
            return l == r;
        }
        match (self, other) {
            (Value::Double(l), r) | (r, Value::Double(l)) => match r {
                Value::Double(r) => l == r,
                _ => r.as_i64().is_some_and(|r| *l == r as f64),
            },
            _ => self == other,
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int16(v) => Some(i64::from(*v)),
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "'{v}'"),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Value::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

macro_rules! impl_from_for_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_for_value! {
    bool => Bool,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f64 => Double,
    String => Text,
    Vec<u8> => Bytes,
    NaiveDateTime => DateTime,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// A Rust type that maps onto exactly one [`DbType`].
///
/// Used by typed getters, which are strict: NULL is an error.
pub trait ScalarType: Sized + Into<Value> {
    /// The column type this Rust type reads from and is described as.
    const DB_TYPE: DbType;

    /// Unwraps a value that has already been coerced to [`Self::DB_TYPE`].
    fn from_coerced(value: Value) -> Option<Self>;
}

macro_rules! impl_scalar_type {
    ($($ty:ty => $db_type:ident, $variant:ident);* $(;)?) => {
        $(
            impl ScalarType for $ty {
                const DB_TYPE: DbType = DbType::$db_type;

                fn from_coerced(value: Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }

            impl FromValue for $ty {
                fn from_value(value: Value, column: &str) -> Result<Self> {
                    if value.is_null() {
                        return Ok(<$ty>::default());
                    }
                    extract(value, column)
                }
            }
        )*
    };
}

impl_scalar_type! {
    bool => Boolean, Bool;
    i16 => Int16, Int16;
    i32 => Int32, Int32;
    i64 => Int64, Int64;
    f64 => Double, Double;
    String => String, Text;
    Vec<u8> => Binary, Bytes;
    NaiveDateTime => DateTime, DateTime;
}

impl ScalarType for Value {
    const DB_TYPE: DbType = DbType::Object;

    fn from_coerced(value: Value) -> Option<Self> {
        Some(value)
    }
}

/// Reads `value` as `T`, failing on NULL and on any conversion the provider
/// would refuse.
pub(crate) fn extract<T: ScalarType>(value: Value, column: &str) -> Result<T> {
    if T::DB_TYPE == DbType::Object {
        return T::from_coerced(value).ok_or_else(|| Error::NullValue {
            column: column.to_string(),
        });
    }
    let Some(from) = value.db_type() else {
        return Err(Error::NullValue {
            column: column.to_string(),
        });
    };
    let mismatch = |reason| Error::TypeCoercion {
        column: column.to_string(),
        from,
        to: T::DB_TYPE,
        reason,
    };
    let coerced = value.coerce(T::DB_TYPE).map_err(mismatch)?;
    T::from_coerced(coerced).ok_or_else(|| mismatch(CoercionFailure::Incompatible))
}

/// Conversion used when hydrating records from a reader.
///
/// Unlike typed getters, hydration tolerates NULL: a non-nullable target
/// receives its type's default, the way a non-nullable column would never
/// hand back NULL, and `Option<T>` receives `None`.
pub trait FromValue: Sized {
    fn from_value(value: Value, column: &str) -> Result<Self>;
}

impl FromValue for Value {
    fn from_value(value: Value, _column: &str) -> Result<Self> {
        Ok(value)
    }
}

impl<T: ScalarType> FromValue for Option<T> {
    fn from_value(value: Value, column: &str) -> Result<Self> {
        if value.is_null() {
            return Ok(None);
        }
        extract(value, column).map(Some)
    }
}
