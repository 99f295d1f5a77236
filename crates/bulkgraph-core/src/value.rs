//! Column values.

use std::fmt;

use crate::types::SemanticType;

/// A single database value as it travels to a bulk-transfer sink.
///
/// `Value::Null` is the "database null" sentinel: it is the only way a row
/// expresses SQL `NULL`. An absent field is represented by
/// [`FieldValue::Unset`] and only becomes `Null` through the materializer.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// 32-bit integer.
    Int(i32),
    /// 64-bit integer.
    BigInt(i64),
    /// UUID bytes (big-endian, RFC 4122 layout).
    Uuid([u8; 16]),
    /// Text.
    Text(String),
    /// Microseconds since the Unix epoch, UTC.
    Timestamp(i64),
    /// Decimal in canonical text form (e.g. `"12.50"`).
    Decimal(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Value for an `Other` column, already rendered as text.
    Other(String),
}

impl Value {
    /// Build a timestamp value from microseconds since the Unix epoch.
    #[must_use]
    pub const fn timestamp_micros(micros: i64) -> Self {
        Value::Timestamp(micros)
    }

    /// Build a decimal value from its text form.
    pub fn decimal(text: impl Into<String>) -> Self {
        Value::Decimal(text.into())
    }

    /// Whether this is SQL NULL.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The semantic type carried by this value, `None` for NULL.
    #[must_use]
    pub const fn semantic_type(&self) -> Option<SemanticType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(SemanticType::Bool),
            Value::Int(_) => Some(SemanticType::Int),
            Value::BigInt(_) => Some(SemanticType::Long),
            Value::Uuid(_) => Some(SemanticType::Guid),
            Value::Text(_) => Some(SemanticType::String),
            Value::Timestamp(_) => Some(SemanticType::DateTime),
            Value::Decimal(_) => Some(SemanticType::Decimal),
            Value::Bytes(_) => Some(SemanticType::Binary),
            Value::Other(_) => Some(SemanticType::Other),
        }
    }

    /// Text content, if this is a text-like value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Decimal(s) | Value::Other(s) => Some(s),
            _ => None,
        }
    }

    /// Integer content widened to `i64`.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v as i64),
            Value::BigInt(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::BigInt(v) => write!(f, "{v}"),
            Value::Uuid(bytes) => {
                for (i, b) in bytes.iter().enumerate() {
                    if matches!(i, 4 | 6 | 8 | 10) {
                        f.write_str("-")?;
                    }
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Value::Text(s) | Value::Decimal(s) | Value::Other(s) => f.write_str(s),
            Value::Timestamp(us) => write!(f, "{us}us"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<[u8; 16]> for Value {
    fn from(v: [u8; 16]) -> Self {
        Value::Uuid(v)
    }
}

/// The raw result of reading one field from an entity instance.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// The field holds no value (e.g. an `Option` that is `None`).
    Unset,
    /// The field holds a value.
    Set(Value),
}

impl FieldValue {
    /// Whether the field was unset.
    #[must_use]
    pub const fn is_unset(&self) -> bool {
        matches!(self, FieldValue::Unset)
    }
}

impl From<Value> for FieldValue {
    fn from(v: Value) -> Self {
        FieldValue::Set(v)
    }
}

/// Conversion from a field's Rust type into a [`FieldValue`].
///
/// Implemented for the primitive field types and for `Option<T>`, which maps
/// `None` to [`FieldValue::Unset`] and unwraps `Some`.
pub trait ToFieldValue {
    /// Read this field as a `FieldValue`.
    fn to_field_value(&self) -> FieldValue;
}

impl ToFieldValue for bool {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Set(Value::Bool(*self))
    }
}

impl ToFieldValue for i32 {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Set(Value::Int(*self))
    }
}

impl ToFieldValue for i64 {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Set(Value::BigInt(*self))
    }
}

impl ToFieldValue for String {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Set(Value::Text(self.clone()))
    }
}

impl ToFieldValue for str {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Set(Value::Text(self.to_string()))
    }
}

impl ToFieldValue for Vec<u8> {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Set(Value::Bytes(self.clone()))
    }
}

impl ToFieldValue for [u8; 16] {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Set(Value::Uuid(*self))
    }
}

impl ToFieldValue for Value {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Set(self.clone())
    }
}

impl<T: ToFieldValue> ToFieldValue for Option<T> {
    fn to_field_value(&self) -> FieldValue {
        match self {
            Some(inner) => inner.to_field_value(),
            None => FieldValue::Unset,
        }
    }
}
