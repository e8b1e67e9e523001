//! Fields: a named, schema-checked value with durable storage and hooks.
//!
//! ```text
//!   set_value(v)
//!     ├─ pre_set()
//!     ├─ Parameter::validate(v) ──✗──┐
//!     ├─ merge into current shape ─✗─┤
//!     ├─ Slot::write ──────────────✗─┤
//!     └─ post_set()  ◀───────────────┘   (always runs)
//! ```
//!
//! A [`Field`] lives in the registry arena; its [`Parameter`] lives in the
//! parameter arena. [`FieldView`] borrows both plus the store for the
//! duration of one operation.

use core::fmt;

use serde_json::Value;

use crate::config::{ERROR_DATA_LEN_MAX, STRING_CAPACITY_MAX};
use crate::error::Result;
use crate::ports::{ByteStore, StoreError};
use crate::registry::ParameterId;
use crate::schema::{Parameter, SubsetMember, ValidationError, ValueType};
use crate::storage::{Element, FieldValue, Slot};

/// Whole-value hook.
pub type Hook = Box<dyn FnMut()>;
/// Element hook; receives the element index.
pub type ElementHook = Box<dyn FnMut(usize)>;

// ── Errors ────────────────────────────────────────────────────

/// Why a field write was refused.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldError {
    /// The value failed the field's schema.
    Validation(ValidationError),
    /// Element index at or past the field's length.
    IndexOutOfRange,
    /// The field has no addressable elements (scalars, constant choices).
    NotElementMutable,
    /// The value passed the schema but does not fit the stored shape
    /// (string over capacity, too many elements, unknown choice).
    Shape,
    /// The store failed.
    Storage(StoreError),
}

impl FieldError {
    /// Protocol `error.data` text for a field called `name`.
    pub fn render(&self, name: &str) -> heapless::String<ERROR_DATA_LEN_MAX> {
        match self {
            Self::Validation(e) => e.render(name),
            other => {
                let mut out = heapless::String::new();
                let _ = other.write_message(&mut out, name);
                out
            }
        }
    }

    fn write_message(&self, out: &mut impl fmt::Write, name: &str) -> fmt::Result {
        match self {
            Self::Validation(_) => Ok(()),
            Self::IndexOutOfRange => write!(out, "Element index out of range: {name}"),
            Self::NotElementMutable => write!(out, "{name} has no settable elements"),
            Self::Shape => write!(out, "Value does not fit field: {name}"),
            Self::Storage(e) => write!(out, "Storage failure: {e}"),
        }
    }
}

impl From<ValidationError> for FieldError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<StoreError> for FieldError {
    fn from(e: StoreError) -> Self {
        Self::Storage(e)
    }
}

// ── Field ─────────────────────────────────────────────────────

#[derive(Default)]
struct Hooks {
    pre_set: Option<Hook>,
    post_set: Option<Hook>,
    pre_set_element: Option<ElementHook>,
    post_set_element: Option<ElementHook>,
}

fn fire(hook: &mut Option<Hook>) {
    if let Some(f) = hook {
        f();
    }
}

fn fire_element(hook: &mut Option<ElementHook>, index: usize) {
    if let Some(f) = hook {
        f(index);
    }
}

pub struct Field {
    parameter: ParameterId,
    slot: Slot,
    hooks: Hooks,
}

impl Field {
    pub(crate) fn new(parameter: ParameterId, slot: Slot) -> Self {
        Self {
            parameter,
            slot,
            hooks: Hooks::default(),
        }
    }

    pub fn parameter_id(&self) -> ParameterId {
        self.parameter
    }

    pub fn slot(&self) -> &Slot {
        &self.slot
    }

    pub(crate) fn slot_mut(&mut self) -> &mut Slot {
        &mut self.slot
    }

    pub fn set_pre_set_hook(&mut self, hook: impl FnMut() + 'static) -> &mut Self {
        self.hooks.pre_set = Some(Box::new(hook));
        self
    }

    pub fn set_post_set_hook(&mut self, hook: impl FnMut() + 'static) -> &mut Self {
        self.hooks.post_set = Some(Box::new(hook));
        self
    }

    pub fn set_pre_set_element_hook(&mut self, hook: impl FnMut(usize) + 'static) -> &mut Self {
        self.hooks.pre_set_element = Some(Box::new(hook));
        self
    }

    pub fn set_post_set_element_hook(&mut self, hook: impl FnMut(usize) + 'static) -> &mut Self {
        self.hooks.post_set_element = Some(Box::new(hook));
        self
    }

    pub fn remove_hooks(&mut self) -> &mut Self {
        self.hooks = Hooks::default();
        self
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("parameter", &self.parameter)
            .field("slot", &self.slot)
            .finish_non_exhaustive()
    }
}

/// Schema implied by a field's default value.
///
/// Arrays get a length range of `1..=len` so bulk writes may replace a
/// prefix; constant choices get their constants as the subset.
pub(crate) fn parameter_for(name: &'static str, default: &FieldValue) -> Result<Parameter> {
    let mut parameter = Parameter::new(name);
    match default {
        FieldValue::Long(_) => {
            parameter.set_type(ValueType::Long);
        }
        FieldValue::Double(_) => {
            parameter.set_type(ValueType::Double);
        }
        FieldValue::Bool(_) => {
            parameter.set_type(ValueType::Bool);
        }
        FieldValue::Text(_) => {
            parameter.set_type(ValueType::String);
        }
        FieldValue::Choice(c) => {
            let members: std::vec::Vec<SubsetMember> =
                c.choices().iter().copied().map(SubsetMember::Str).collect();
            parameter.set_type(ValueType::String).set_subset(&members)?;
        }
        FieldValue::LongArray(_) | FieldValue::DoubleArray(_) | FieldValue::BoolArray(_) => {
            let element_type = default.element_type().unwrap_or(ValueType::Any);
            parameter
                .set_array(element_type)
                .set_array_length_range(1, default.array_length());
        }
    }
    Ok(parameter)
}

// ── FieldView ─────────────────────────────────────────────────

/// One field, its schema, and the store, borrowed together.
pub struct FieldView<'a> {
    field: &'a mut Field,
    parameter: &'a Parameter,
    store: &'a mut dyn ByteStore,
}

impl<'a> FieldView<'a> {
    pub(crate) fn new(
        field: &'a mut Field,
        parameter: &'a Parameter,
        store: &'a mut dyn ByteStore,
    ) -> Self {
        Self {
            field,
            parameter,
            store,
        }
    }

    pub fn name(&self) -> &'static str {
        self.parameter.name()
    }

    pub fn parameter(&self) -> &Parameter {
        self.parameter
    }

    // ── Reads ─────────────────────────────────────────────────

    pub fn value(&self) -> core::result::Result<FieldValue, StoreError> {
        self.field.slot.value(&*self.store)
    }

    pub fn value_json(&self) -> core::result::Result<Value, StoreError> {
        self.value().map(|v| v.to_json())
    }

    pub fn default_value(&self) -> &FieldValue {
        self.field.slot.default_value()
    }

    pub fn default_value_json(&self) -> Value {
        self.default_value().to_json()
    }

    pub fn long(&self) -> Option<i64> {
        match self.value().ok()? {
            FieldValue::Long(v) => Some(v),
            _ => None,
        }
    }

    pub fn double(&self) -> Option<f64> {
        match self.value().ok()? {
            FieldValue::Double(v) => Some(v),
            FieldValue::Long(v) => Some(v as f64),
            _ => None,
        }
    }

    pub fn bool(&self) -> Option<bool> {
        match self.value().ok()? {
            FieldValue::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<heapless::String<STRING_CAPACITY_MAX>> {
        let mut out = heapless::String::new();
        match self.value().ok()? {
            FieldValue::Text(s) => out.push_str(s.as_str()).ok()?,
            FieldValue::Choice(c) => out.push_str(c.as_str()).ok()?,
            _ => return None,
        }
        Some(out)
    }

    /// Declared element count (array length or string capacity).
    pub fn array_length(&self) -> usize {
        self.field.slot.array_length()
    }

    /// Logical length of a string field.
    pub fn string_length(&self) -> Option<usize> {
        match self.value().ok()? {
            FieldValue::Text(s) => Some(s.len()),
            FieldValue::Choice(c) => Some(c.as_str().len()),
            _ => None,
        }
    }

    pub fn element_value(&self, index: usize) -> Option<Element> {
        self.field.slot.element(&*self.store, index)
    }

    pub fn default_element_value(&self, index: usize) -> Option<Element> {
        self.field.slot.default_element(index)
    }

    pub fn is_default(&self) -> bool {
        self.field.slot.is_default(&*self.store)
    }

    // ── Whole-value writes ────────────────────────────────────

    /// Validate and store `value`. Hooks fire whether or not it succeeds.
    pub fn try_set_value(&mut self, value: &Value) -> core::result::Result<(), FieldError> {
        fire(&mut self.field.hooks.pre_set);
        let result = self.write_value(value);
        fire(&mut self.field.hooks.post_set);
        result
    }

    pub fn set_value(&mut self, value: &Value) -> bool {
        self.try_set_value(value).is_ok()
    }

    /// Typed convenience over [`set_value`](Self::set_value).
    pub fn set(&mut self, value: impl Into<Value>) -> bool {
        self.set_value(&value.into())
    }

    fn write_value(&mut self, value: &Value) -> core::result::Result<(), FieldError> {
        self.parameter.validate(value)?;
        // Every supplied element is checked before any byte is written.
        let next = self
            .value()?
            .merged_from_json(value)
            .ok_or(FieldError::Shape)?;
        self.field.slot.write(self.store, &next)?;
        Ok(())
    }

    /// Set every element to `value`, as one write.
    pub fn try_set_all_element_values(
        &mut self,
        value: &Value,
    ) -> core::result::Result<(), FieldError> {
        self.element_kind()?;
        fire(&mut self.field.hooks.pre_set);
        let result = self.write_all_elements(value);
        fire(&mut self.field.hooks.post_set);
        result
    }

    pub fn set_all_element_values(&mut self, value: &Value) -> bool {
        self.try_set_all_element_values(value).is_ok()
    }

    fn write_all_elements(&mut self, value: &Value) -> core::result::Result<(), FieldError> {
        self.parameter.validate_element(value)?;
        let mut next = self.value()?;
        let element = next.element_from_json(value).ok_or(FieldError::Shape)?;
        for index in 0..next.array_length() {
            if !next.set_element(index, element) {
                return Err(FieldError::Shape);
            }
        }
        self.field.slot.write(self.store, &next)?;
        Ok(())
    }

    pub fn set_value_to_default(&mut self) -> bool {
        fire(&mut self.field.hooks.pre_set);
        let ok = self.field.slot.set_to_default(self.store);
        fire(&mut self.field.hooks.post_set);
        ok
    }

    // ── Element writes ────────────────────────────────────────

    /// Validate and store one element. A bad index fails before any hook.
    pub fn try_set_element_value(
        &mut self,
        index: usize,
        value: &Value,
    ) -> core::result::Result<(), FieldError> {
        self.check_index(index)?;
        fire_element(&mut self.field.hooks.pre_set_element, index);
        let result = self.write_element(index, value);
        fire_element(&mut self.field.hooks.post_set_element, index);
        result
    }

    pub fn set_element_value(&mut self, index: usize, value: &Value) -> bool {
        self.try_set_element_value(index, value).is_ok()
    }

    fn write_element(&mut self, index: usize, value: &Value) -> core::result::Result<(), FieldError> {
        self.parameter.validate_element(value)?;
        let element = self
            .default_value()
            .element_from_json(value)
            .ok_or(FieldError::Shape)?;
        if self.field.slot.set_element(self.store, index, element) {
            Ok(())
        } else {
            Err(FieldError::Shape)
        }
    }

    pub fn try_set_element_value_to_default(
        &mut self,
        index: usize,
    ) -> core::result::Result<(), FieldError> {
        self.check_index(index)?;
        fire_element(&mut self.field.hooks.pre_set_element, index);
        let ok = self.field.slot.set_element_to_default(self.store, index);
        fire_element(&mut self.field.hooks.post_set_element, index);
        if ok { Ok(()) } else { Err(FieldError::Shape) }
    }

    pub fn set_element_value_to_default(&mut self, index: usize) -> bool {
        self.try_set_element_value_to_default(index).is_ok()
    }

    fn element_kind(&self) -> core::result::Result<(), FieldError> {
        match self.default_value() {
            FieldValue::LongArray(_)
            | FieldValue::DoubleArray(_)
            | FieldValue::BoolArray(_)
            | FieldValue::Text(_) => Ok(()),
            _ => Err(FieldError::NotElementMutable),
        }
    }

    fn check_index(&self, index: usize) -> core::result::Result<(), FieldError> {
        self.element_kind()?;
        if index >= self.array_length() {
            return Err(FieldError::IndexOutOfRange);
        }
        Ok(())
    }
}
