//! Parameter schema: type plus optional range, length range and subset.
//!
//! A `Parameter` is created once at registration and only mutated by the
//! constraint setters during device setup. Validation is side-effect free
//! and reports the first failing constraint.
//!
//! ```text
//!   value ──▶ type ──▶ range ──▶ subset          (scalars)
//!   value ──▶ array ──▶ length ──▶ per element   (arrays)
//! ```

use core::fmt;

use heapless::Vec;
use serde_json::{Map, Value};

use super::value::{Number, SubsetMember, ValueType, json_as_long};
use crate::config::{ERROR_DATA_LEN_MAX, SUBSET_COUNT_MAX};
use crate::error::{Error, Result};

/// Why a value failed validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValidationError {
    WrongType { expected: ValueType },
    OutOfRange { min: Number, max: Number },
    ElementOutOfRange { min: Number, max: Number },
    NotInSubset,
    ElementNotInSubset,
    LengthOutOfRange { min: usize, max: usize, len: usize },
    NotAnObject,
    NotAnArray,
}

impl ValidationError {
    /// Protocol `error.data` text for a parameter called `name`.
    pub fn render(&self, name: &str) -> heapless::String<ERROR_DATA_LEN_MAX> {
        let mut out = heapless::String::new();
        // Overlong names truncate the message rather than fail.
        let _ = self.write_message(&mut out, name);
        out
    }

    fn write_message(&self, out: &mut impl fmt::Write, name: &str) -> fmt::Result {
        match self {
            Self::WrongType { expected } => write!(out, "{name} must be {expected}"),
            Self::OutOfRange { min, max } => {
                write!(out, "Parameter value out of range: {min} <= {name} <= {max}")
            }
            Self::ElementOutOfRange { min, max } => write!(
                out,
                "Array parameter element value out of range: {min} <= {name} element <= {max}"
            ),
            Self::NotInSubset => write!(out, "Parameter value not in subset: {name}"),
            Self::ElementNotInSubset => {
                write!(out, "Array parameter element value not in subset: {name}")
            }
            Self::LengthOutOfRange { min, max, .. } => write!(
                out,
                "Array parameter length out of range: {min} <= {name} length <= {max}"
            ),
            Self::NotAnObject => write!(out, "{name} is not a valid JSON object"),
            Self::NotAnArray => write!(out, "{name} is not a valid JSON array"),
        }
    }
}

/// Type and constraints of one named value.
#[derive(Debug, Clone)]
pub struct Parameter {
    name: &'static str,
    units: &'static str,
    value_type: ValueType,
    element_type: Option<ValueType>,
    range: Option<(Number, Number)>,
    length_range: Option<(usize, usize)>,
    subset: Vec<SubsetMember, SUBSET_COUNT_MAX>,
}

impl Parameter {
    /// A new unconstrained parameter.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            units: "",
            value_type: ValueType::Any,
            element_type: None,
            range: None,
            length_range: None,
            subset: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn units(&self) -> &'static str {
        self.units
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn element_type(&self) -> Option<ValueType> {
        self.element_type
    }

    pub fn range(&self) -> Option<(Number, Number)> {
        self.range
    }

    pub fn array_length_range(&self) -> Option<(usize, usize)> {
        self.length_range
    }

    pub fn subset(&self) -> &[SubsetMember] {
        &self.subset
    }

    // ── Setup-time constraint setters ─────────────────────────

    pub fn set_units(&mut self, units: &'static str) -> &mut Self {
        self.units = units;
        self
    }

    /// Set a scalar type. Use [`set_array`](Self::set_array) for arrays.
    pub fn set_type(&mut self, value_type: ValueType) -> &mut Self {
        if value_type == ValueType::Array {
            return self.set_array(ValueType::Any);
        }
        self.value_type = value_type;
        self.element_type = None;
        self
    }

    /// Make this an array parameter. `Array`/`Object` element types are
    /// widened to `Any`.
    pub fn set_array(&mut self, element_type: ValueType) -> &mut Self {
        self.value_type = ValueType::Array;
        self.element_type = Some(if element_type.is_element_type() {
            element_type
        } else {
            ValueType::Any
        });
        self
    }

    /// Inclusive numeric range. A non-numeric type (or element type) is
    /// switched to the kind the bounds imply.
    pub fn set_range(&mut self, min: impl Into<Number>, max: impl Into<Number>) -> &mut Self {
        let (min, max) = (min.into(), max.into());
        let implied = match (min, max) {
            (Number::Long(_), Number::Long(_)) => ValueType::Long,
            _ => ValueType::Double,
        };
        if self.value_type == ValueType::Array {
            if !self.element_type.is_some_and(ValueType::is_numeric) {
                self.element_type = Some(implied);
            }
        } else if !self.value_type.is_numeric() {
            self.value_type = implied;
        }
        self.range = Some((min, max));
        self
    }

    pub fn remove_range(&mut self) -> &mut Self {
        self.range = None;
        self
    }

    /// Inclusive array length range; makes the parameter an array.
    pub fn set_array_length_range(&mut self, min: usize, max: usize) -> &mut Self {
        if self.value_type != ValueType::Array {
            self.set_array(ValueType::Any);
        }
        self.length_range = Some((min, max));
        self
    }

    pub fn remove_array_length_range(&mut self) -> &mut Self {
        self.length_range = None;
        self
    }

    /// Replace the allow-list.
    pub fn set_subset(&mut self, members: &[SubsetMember]) -> Result<&mut Self> {
        self.subset =
            Vec::from_slice(members).map_err(|_| Error::CapacityExceeded("parameter subset"))?;
        Ok(self)
    }

    pub fn remove_subset(&mut self) -> &mut Self {
        self.subset.clear();
        self
    }

    // ── Validation ────────────────────────────────────────────

    pub fn is_valid(&self, value: &Value) -> bool {
        self.validate(value).is_ok()
    }

    /// Check `value` against the declared type and constraints.
    pub fn validate(&self, value: &Value) -> core::result::Result<(), ValidationError> {
        self.check(self.value_type, value, false)
    }

    /// Check one array element against the element type and constraints.
    pub fn validate_element(&self, value: &Value) -> core::result::Result<(), ValidationError> {
        self.check(self.element_type.unwrap_or(ValueType::Any), value, true)
    }

    fn check(
        &self,
        value_type: ValueType,
        value: &Value,
        element: bool,
    ) -> core::result::Result<(), ValidationError> {
        let wrong = ValidationError::WrongType {
            expected: value_type,
        };
        match value_type {
            ValueType::Any => Ok(()),
            ValueType::Null => value.is_null().then_some(()).ok_or(wrong),
            ValueType::Bool => value.is_boolean().then_some(()).ok_or(wrong),
            ValueType::Long => {
                let n = json_as_long(value).ok_or(wrong)?;
                self.check_range(Number::Long(n), element)?;
                self.check_subset(value, element)
            }
            ValueType::Double => {
                let n = value.as_f64().ok_or(wrong)?;
                self.check_range(Number::Double(n), element)?;
                self.check_subset(value, element)
            }
            ValueType::String => {
                if !value.is_string() {
                    return Err(wrong);
                }
                self.check_subset(value, element)
            }
            ValueType::Object => value
                .is_object()
                .then_some(())
                .ok_or(ValidationError::NotAnObject),
            ValueType::Array => {
                let items = value.as_array().ok_or(ValidationError::NotAnArray)?;
                if let Some((min, max)) = self.length_range {
                    if items.len() < min || items.len() > max {
                        return Err(ValidationError::LengthOutOfRange {
                            min,
                            max,
                            len: items.len(),
                        });
                    }
                }
                items.iter().try_for_each(|item| self.validate_element(item))
            }
        }
    }

    fn check_range(&self, n: Number, element: bool) -> core::result::Result<(), ValidationError> {
        match self.range {
            Some((min, max)) if !n.within(min, max) => Err(if element {
                ValidationError::ElementOutOfRange { min, max }
            } else {
                ValidationError::OutOfRange { min, max }
            }),
            _ => Ok(()),
        }
    }

    fn check_subset(&self, value: &Value, element: bool) -> core::result::Result<(), ValidationError> {
        if self.subset.is_empty() || self.subset.iter().any(|m| m.matches(value)) {
            Ok(())
        } else if element {
            Err(ValidationError::ElementNotInSubset)
        } else {
            Err(ValidationError::NotInSubset)
        }
    }

    // ── Introspection ─────────────────────────────────────────

    /// Help object: name, units, type, element type, bounds, subset.
    pub fn describe(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("name".into(), Value::from(self.name));
        if !self.units.is_empty() {
            obj.insert("units".into(), Value::from(self.units));
        }
        obj.insert("type".into(), Value::from(self.value_type.as_str()));
        if let Some(element_type) = self.element_type {
            obj.insert("array_element_type".into(), Value::from(element_type.as_str()));
        }
        if let Some((min, max)) = self.range {
            obj.insert("min".into(), min.to_json());
            obj.insert("max".into(), max.to_json());
        }
        if let Some((min, max)) = self.length_range {
            obj.insert("array_length_min".into(), Value::from(min));
            obj.insert("array_length_max".into(), Value::from(max));
        }
        if !self.subset.is_empty() {
            let members = self.subset.iter().map(|m| m.to_json()).collect();
            obj.insert("subset".into(), Value::Array(members));
        }
        Value::Object(obj)
    }
}
