//! Typed field values and their fixed-width byte encoding.
//!
//! Every value encodes to a width fixed by its shape, so a persisted slot
//! never moves or grows:
//!
//! | Variant        | Width                     |
//! |----------------|---------------------------|
//! | `Long`         | 8 (i64 LE)                |
//! | `Double`       | 8 (f64 LE)                |
//! | `Bool`         | 1                         |
//! | `*Array`       | length × element width    |
//! | `Text`         | capacity (NUL padded)     |
//! | `Choice`       | 1 (index into constants)  |

use heapless::Vec;
use serde_json::Value;

use crate::config::{ARRAY_LENGTH_MAX, STRING_CAPACITY_MAX};
use crate::error::{Error, Result};
use crate::ports::StoreError;
use crate::schema::{ValueType, json_as_long};

// ── Bounded string ────────────────────────────────────────────

/// A char-array string: fixed capacity, explicit logical length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedString {
    text: heapless::String<STRING_CAPACITY_MAX>,
    capacity: usize,
}

impl BoundedString {
    /// Empty string of `capacity` bytes (clamped to [`STRING_CAPACITY_MAX`]).
    pub fn new(capacity: usize) -> Self {
        Self {
            text: heapless::String::new(),
            capacity: capacity.min(STRING_CAPACITY_MAX),
        }
    }

    /// `None` if `s` is longer than `capacity` or contains NUL.
    pub fn from_str(s: &str, capacity: usize) -> Option<Self> {
        let mut out = Self::new(capacity);
        if s.len() > out.capacity || s.contains('\0') {
            return None;
        }
        out.text.push_str(s).ok()?;
        Some(out)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Byte at `index`; positions past the logical end read as NUL.
    pub fn byte_at(&self, index: usize) -> Option<u8> {
        if index >= self.capacity {
            return None;
        }
        Some(self.text.as_bytes().get(index).copied().unwrap_or(0))
    }

    /// Replace the byte at `index`, or append when `index == len`.
    /// Only printable ASCII is accepted so the text stays valid UTF-8.
    pub fn set_byte(&mut self, index: usize, byte: u8) -> bool {
        if index >= self.capacity || index > self.len() || !byte.is_ascii() || byte == 0 {
            return false;
        }
        let mut bytes: Vec<u8, STRING_CAPACITY_MAX> = match Vec::from_slice(self.text.as_bytes()) {
            Ok(bytes) => bytes,
            Err(()) => return false,
        };
        if index == bytes.len() {
            if bytes.push(byte).is_err() {
                return false;
            }
        } else {
            bytes[index] = byte;
        }
        match heapless::String::from_utf8(bytes) {
            Ok(text) => {
                self.text = text;
                true
            }
            Err(_) => false,
        }
    }
}

// ── Constant-string choice ────────────────────────────────────

/// A string field that points at one of a fixed set of named constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantChoice {
    index: u8,
    choices: &'static [&'static str],
}

impl ConstantChoice {
    /// `None` if `selected` is not among `choices` (or there are more than 255).
    pub fn new(selected: &str, choices: &'static [&'static str]) -> Option<Self> {
        if choices.len() > usize::from(u8::MAX) {
            return None;
        }
        let index = choices.iter().position(|c| *c == selected)?;
        Some(Self {
            index: index as u8,
            choices,
        })
    }

    pub fn as_str(&self) -> &'static str {
        self.choices[usize::from(self.index)]
    }

    pub fn choices(&self) -> &'static [&'static str] {
        self.choices
    }

    fn select(&self, selected: &str) -> Option<Self> {
        Self::new(selected, self.choices)
    }
}

// ── Elements ──────────────────────────────────────────────────

/// One element of an array or char-array string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Element {
    Long(i64),
    Double(f64),
    Bool(bool),
    Char(u8),
}

impl Element {
    pub fn to_json(self) -> Value {
        match self {
            Self::Long(v) => Value::from(v),
            Self::Double(v) => Value::from(v),
            Self::Bool(v) => Value::from(v),
            Self::Char(0) => Value::from(""),
            Self::Char(c) => Value::from(char::from(c).to_string()),
        }
    }
}

// ── Field values ──────────────────────────────────────────────

/// A typed field value. The variant fixes the persisted shape.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Long(i64),
    Double(f64),
    Bool(bool),
    LongArray(Vec<i64, ARRAY_LENGTH_MAX>),
    DoubleArray(Vec<f64, ARRAY_LENGTH_MAX>),
    BoolArray(Vec<bool, ARRAY_LENGTH_MAX>),
    Text(BoundedString),
    Choice(ConstantChoice),
}

impl FieldValue {
    pub fn long_array(values: &[i64]) -> Result<Self> {
        Vec::from_slice(values)
            .map(Self::LongArray)
            .map_err(|_| Error::CapacityExceeded("array field"))
    }

    pub fn double_array(values: &[f64]) -> Result<Self> {
        Vec::from_slice(values)
            .map(Self::DoubleArray)
            .map_err(|_| Error::CapacityExceeded("array field"))
    }

    pub fn bool_array(values: &[bool]) -> Result<Self> {
        Vec::from_slice(values)
            .map(Self::BoolArray)
            .map_err(|_| Error::CapacityExceeded("array field"))
    }

    /// Char-array string with a fixed byte capacity.
    pub fn text(value: &str, capacity: usize) -> Result<Self> {
        if capacity > STRING_CAPACITY_MAX {
            return Err(Error::CapacityExceeded("string field"));
        }
        BoundedString::from_str(value, capacity)
            .map(Self::Text)
            .ok_or(Error::InvalidValue("string longer than its capacity"))
    }

    /// One of a fixed set of named constants.
    pub fn choice(selected: &str, choices: &'static [&'static str]) -> Result<Self> {
        ConstantChoice::new(selected, choices)
            .map(Self::Choice)
            .ok_or(Error::InvalidValue("default is not one of the choices"))
    }

    /// Declared schema type.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Long(_) => ValueType::Long,
            Self::Double(_) => ValueType::Double,
            Self::Bool(_) => ValueType::Bool,
            Self::LongArray(_) | Self::DoubleArray(_) | Self::BoolArray(_) => ValueType::Array,
            Self::Text(_) | Self::Choice(_) => ValueType::String,
        }
    }

    pub fn element_type(&self) -> Option<ValueType> {
        match self {
            Self::LongArray(_) => Some(ValueType::Long),
            Self::DoubleArray(_) => Some(ValueType::Double),
            Self::BoolArray(_) => Some(ValueType::Bool),
            _ => None,
        }
    }

    /// Declared element count: array length, or string capacity.
    /// Zero for values without elements.
    pub fn array_length(&self) -> usize {
        match self {
            Self::LongArray(v) => v.len(),
            Self::DoubleArray(v) => v.len(),
            Self::BoolArray(v) => v.len(),
            Self::Text(s) => s.capacity(),
            _ => 0,
        }
    }

    /// Bytes one element occupies in the encoding.
    pub fn element_width(&self) -> usize {
        match self {
            Self::LongArray(_) | Self::DoubleArray(_) => 8,
            Self::BoolArray(_) | Self::Text(_) => 1,
            _ => 0,
        }
    }

    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Long(_) | Self::Double(_) => 8,
            Self::Bool(_) | Self::Choice(_) => 1,
            _ => self.array_length() * self.element_width(),
        }
    }

    /// Same variant, same element count, same capacity.
    pub fn same_shape(&self, other: &Self) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
            && self.array_length() == other.array_length()
            && match (self, other) {
                (Self::Choice(a), Self::Choice(b)) => a.choices == b.choices,
                _ => true,
            }
    }

    pub fn element(&self, index: usize) -> Option<Element> {
        match self {
            Self::LongArray(v) => v.get(index).copied().map(Element::Long),
            Self::DoubleArray(v) => v.get(index).copied().map(Element::Double),
            Self::BoolArray(v) => v.get(index).copied().map(Element::Bool),
            Self::Text(s) => s.byte_at(index).map(Element::Char),
            _ => None,
        }
    }

    /// Replace one element in place. Fails on a kind mismatch or bad index.
    pub fn set_element(&mut self, index: usize, element: Element) -> bool {
        match (self, element) {
            (Self::LongArray(v), Element::Long(e)) => put(v, index, e),
            (Self::DoubleArray(v), Element::Double(e)) => put(v, index, e),
            (Self::BoolArray(v), Element::Bool(e)) => put(v, index, e),
            (Self::Text(s), Element::Char(c)) => s.set_byte(index, c),
            _ => false,
        }
    }

    /// Parse one element of this value's element kind from JSON.
    pub fn element_from_json(&self, value: &Value) -> Option<Element> {
        match self {
            Self::LongArray(_) => json_as_long(value).map(Element::Long),
            Self::DoubleArray(_) => value.as_f64().map(Element::Double),
            Self::BoolArray(_) => value.as_bool().map(Element::Bool),
            Self::Text(_) => {
                let s = value.as_str()?;
                match s.as_bytes() {
                    [c] if c.is_ascii() => Some(Element::Char(*c)),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// A value of this shape built from JSON.
    ///
    /// Arrays accept a prefix: the leading elements are replaced and the
    /// rest keep their current values. Longer input is rejected.
    pub fn merged_from_json(&self, value: &Value) -> Option<Self> {
        match self {
            Self::Long(_) => json_as_long(value).map(Self::Long),
            Self::Double(_) => value.as_f64().map(Self::Double),
            Self::Bool(_) => value.as_bool().map(Self::Bool),
            Self::Text(s) => BoundedString::from_str(value.as_str()?, s.capacity()).map(Self::Text),
            Self::Choice(c) => c.select(value.as_str()?).map(Self::Choice),
            _ => {
                let items = value.as_array()?;
                if items.len() > self.array_length() {
                    return None;
                }
                let mut next = self.clone();
                for (index, item) in items.iter().enumerate() {
                    let element = self.element_from_json(item)?;
                    if !next.set_element(index, element) {
                        return None;
                    }
                }
                Some(next)
            }
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Long(v) => Value::from(*v),
            Self::Double(v) => Value::from(*v),
            Self::Bool(v) => Value::from(*v),
            Self::LongArray(v) => v.iter().copied().map(Value::from).collect(),
            Self::DoubleArray(v) => v.iter().copied().map(Value::from).collect(),
            Self::BoolArray(v) => v.iter().copied().map(Value::from).collect(),
            Self::Text(s) => Value::from(s.as_str()),
            Self::Choice(c) => Value::from(c.as_str()),
        }
    }

    // ── Byte encoding ─────────────────────────────────────────

    /// Encode into `out`, which must be exactly [`encoded_len`](Self::encoded_len) bytes.
    pub fn encode(&self, out: &mut [u8]) {
        debug_assert_eq!(out.len(), self.encoded_len());
        match self {
            Self::Long(v) => out.copy_from_slice(&v.to_le_bytes()),
            Self::Double(v) => out.copy_from_slice(&v.to_le_bytes()),
            Self::Bool(v) => out[0] = u8::from(*v),
            Self::Choice(c) => out[0] = c.index,
            Self::LongArray(v) => {
                for (chunk, e) in out.chunks_exact_mut(8).zip(v) {
                    chunk.copy_from_slice(&e.to_le_bytes());
                }
            }
            Self::DoubleArray(v) => {
                for (chunk, e) in out.chunks_exact_mut(8).zip(v) {
                    chunk.copy_from_slice(&e.to_le_bytes());
                }
            }
            Self::BoolArray(v) => {
                for (b, e) in out.iter_mut().zip(v) {
                    *b = u8::from(*e);
                }
            }
            Self::Text(s) => {
                out.fill(0);
                out[..s.len()].copy_from_slice(s.as_str().as_bytes());
            }
        }
    }

    /// Encode one element (for single-element writes).
    pub fn encode_element(element: Element, out: &mut [u8]) {
        match element {
            Element::Long(v) => out.copy_from_slice(&v.to_le_bytes()),
            Element::Double(v) => out.copy_from_slice(&v.to_le_bytes()),
            Element::Bool(v) => out[0] = u8::from(v),
            Element::Char(c) => out[0] = c,
        }
    }

    /// Decode bytes laid out in this value's shape.
    pub fn decode_like(&self, bytes: &[u8]) -> core::result::Result<Self, StoreError> {
        if bytes.len() != self.encoded_len() {
            return Err(StoreError::Corrupted);
        }
        let decoded = match self {
            Self::Long(_) => Self::Long(i64::from_le_bytes(word(bytes))),
            Self::Double(_) => Self::Double(f64::from_le_bytes(word(bytes))),
            Self::Bool(_) => Self::Bool(bytes[0] != 0),
            Self::Choice(c) => {
                let index = bytes[0];
                if usize::from(index) >= c.choices.len() {
                    return Err(StoreError::Corrupted);
                }
                Self::Choice(ConstantChoice {
                    index,
                    choices: c.choices,
                })
            }
            Self::LongArray(_) => Self::LongArray(
                bytes
                    .chunks_exact(8)
                    .map(|c| i64::from_le_bytes(word(c)))
                    .collect(),
            ),
            Self::DoubleArray(_) => Self::DoubleArray(
                bytes
                    .chunks_exact(8)
                    .map(|c| f64::from_le_bytes(word(c)))
                    .collect(),
            ),
            Self::BoolArray(_) => Self::BoolArray(bytes.iter().map(|b| *b != 0).collect()),
            Self::Text(s) => {
                let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
                let text = core::str::from_utf8(&bytes[..end]).map_err(|_| StoreError::Corrupted)?;
                Self::Text(BoundedString::from_str(text, s.capacity()).ok_or(StoreError::Corrupted)?)
            }
        };
        Ok(decoded)
    }
}

fn put<T, const N: usize>(v: &mut Vec<T, N>, index: usize, value: T) -> bool {
    match v.get_mut(index) {
        Some(slot) => {
            *slot = value;
            true
        }
        None => false,
    }
}

fn word(bytes: &[u8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(&bytes[..8]);
    out
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Long(v.into())
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}
