//! Value type tags, numeric bounds and subset members.

use core::fmt;

use serde::Serialize;
use serde_json::Value;

/// Declared type of a parameter or field.
///
/// Drives every validation and help branch. Never inferred from stored
/// bytes, only from the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Null,
    Bool,
    Long,
    Double,
    String,
    Array,
    Object,
    /// Unconstrained: any JSON value passes.
    Any,
}

impl ValueType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Long => "long",
            Self::Double => "double",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
            Self::Any => "any",
        }
    }

    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Long | Self::Double)
    }

    /// Whether the type may be used as an array element type.
    pub const fn is_element_type(self) -> bool {
        !matches!(self, Self::Array | Self::Object)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A range bound or numeric value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Long(i64),
    Double(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Long(v) => v as f64,
            Self::Double(v) => v,
        }
    }

    /// The value type a bound of this kind implies.
    pub const fn value_type(self) -> ValueType {
        match self {
            Self::Long(_) => ValueType::Long,
            Self::Double(_) => ValueType::Double,
        }
    }

    pub fn to_json(self) -> Value {
        match self {
            Self::Long(v) => Value::from(v),
            Self::Double(v) => Value::from(v),
        }
    }

    /// Inclusive `min <= self <= max`. Integer bounds compare exactly.
    pub fn within(self, min: Number, max: Number) -> bool {
        match (min, self, max) {
            (Self::Long(lo), Self::Long(x), Self::Long(hi)) => lo <= x && x <= hi,
            _ => {
                let x = self.as_f64();
                min.as_f64() <= x && x <= max.as_f64()
            }
        }
    }
}

impl From<i64> for Number {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<i32> for Number {
    fn from(v: i32) -> Self {
        Self::Long(v.into())
    }
}

impl From<f64> for Number {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
        }
    }
}

/// One literal in a parameter's allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubsetMember {
    Long(i64),
    Str(&'static str),
}

impl SubsetMember {
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::Long(m) => json_as_long(value) == Some(m),
            Self::Str(s) => value.as_str() == Some(s),
        }
    }

    pub fn to_json(self) -> Value {
        match self {
            Self::Long(v) => Value::from(v),
            Self::Str(s) => Value::from(s),
        }
    }
}

impl From<i64> for SubsetMember {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<i32> for SubsetMember {
    fn from(v: i32) -> Self {
        Self::Long(v.into())
    }
}

impl From<&'static str> for SubsetMember {
    fn from(s: &'static str) -> Self {
        Self::Str(s)
    }
}

/// Integer view of a JSON number. Integral doubles are accepted.
pub(crate) fn json_as_long(value: &Value) -> Option<i64> {
    if let Some(v) = value.as_i64() {
        return Some(v);
    }
    let f = value.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}
