//! Fixed-capacity arenas of methods, parameters and fields.
//!
//! Everything is addressed by a positional newtype id. Ids are handed out
//! in registration order and never change, so a client may cache the
//! result of `getMethodIds`.
//!
//! Naming rules:
//! - method names are unique among methods;
//! - parameter names are unique across the whole parameter arena, which
//!   also holds the schema of every field;
//! - a field may not share a name with a method (a request names one or
//!   the other).

use heapless::Vec;
use log::debug;

use crate::config::{FIELD_COUNT_MAX, METHOD_COUNT_MAX, PARAMETER_COUNT_MAX};
use crate::error::{Error, Result};
use crate::field::{Field, FieldView, parameter_for};
use crate::method::{Callback, Method};
use crate::ports::ByteStore;
use crate::schema::Parameter;
use crate::storage::Slot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParameterId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub(crate) usize);

impl MethodId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl ParameterId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl FieldId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    methods: Vec<Method, METHOD_COUNT_MAX>,
    parameters: Vec<Parameter, PARAMETER_COUNT_MAX>,
    fields: Vec<Field, FIELD_COUNT_MAX>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Registration ──────────────────────────────────────────

    pub fn create_method(&mut self, name: &'static str) -> Result<MethodId> {
        if self.find_method_index(name).is_some() || self.find_field_index(name).is_some() {
            return Err(Error::DuplicateName(name));
        }
        let id = MethodId(self.methods.len());
        self.methods
            .push(Method::new(name))
            .map_err(|_| Error::CapacityExceeded("methods"))?;
        debug!("Registry: method {} = {}", id.0, name);
        Ok(id)
    }

    pub fn create_parameter(&mut self, name: &'static str) -> Result<ParameterId> {
        if self.find_parameter_index(name).is_some() {
            return Err(Error::DuplicateName(name));
        }
        let id = ParameterId(self.parameters.len());
        self.parameters
            .push(Parameter::new(name))
            .map_err(|_| Error::CapacityExceeded("parameters"))?;
        Ok(id)
    }

    /// Check that a field called `name` could be registered, before any
    /// storage is allocated for it.
    pub fn check_field_name(&self, name: &'static str) -> Result<()> {
        if self.find_field_index(name).is_some()
            || self.find_method_index(name).is_some()
            || self.find_parameter_index(name).is_some()
        {
            return Err(Error::DuplicateName(name));
        }
        if self.fields.is_full() {
            return Err(Error::CapacityExceeded("fields"));
        }
        if self.parameters.is_full() {
            return Err(Error::CapacityExceeded("parameters"));
        }
        Ok(())
    }

    /// Register a field and append its schema to the parameter arena.
    pub fn create_field(&mut self, name: &'static str, slot: Slot) -> Result<FieldId> {
        self.check_field_name(name)?;
        let parameter = parameter_for(name, slot.default_value())?;
        let parameter_id = ParameterId(self.parameters.len());
        self.parameters
            .push(parameter)
            .map_err(|_| Error::CapacityExceeded("parameters"))?;
        let id = FieldId(self.fields.len());
        if self.fields.push(Field::new(parameter_id, slot)).is_err() {
            self.parameters.pop();
            return Err(Error::CapacityExceeded("fields"));
        }
        debug!("Registry: field {} = {}", id.0, name);
        Ok(id)
    }

    pub(crate) fn attach(&mut self, method: MethodId, callback: Callback) -> Result<()> {
        self.methods
            .get_mut(method.0)
            .ok_or(Error::InvalidValue("unknown method id"))?
            .attach(callback)
    }

    // ── Lookup ────────────────────────────────────────────────

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn method(&self, id: MethodId) -> Option<&Method> {
        self.methods.get(id.0)
    }

    pub fn method_mut(&mut self, id: MethodId) -> Option<&mut Method> {
        self.methods.get_mut(id.0)
    }

    pub fn parameter(&self, id: ParameterId) -> Option<&Parameter> {
        self.parameters.get(id.0)
    }

    pub fn parameter_mut(&mut self, id: ParameterId) -> Option<&mut Parameter> {
        self.parameters.get_mut(id.0)
    }

    pub fn field(&self, id: FieldId) -> Option<&Field> {
        self.fields.get(id.0)
    }

    pub fn field_mut(&mut self, id: FieldId) -> Option<&mut Field> {
        self.fields.get_mut(id.0)
    }

    pub fn field_name(&self, id: FieldId) -> Option<&'static str> {
        let field = self.fields.get(id.0)?;
        Some(self.parameters.get(field.parameter_id().0)?.name())
    }

    pub fn find_method_index(&self, name: &str) -> Option<MethodId> {
        self.methods
            .iter()
            .position(|m| m.name() == name)
            .map(MethodId)
    }

    pub fn find_parameter_index(&self, name: &str) -> Option<ParameterId> {
        self.parameters
            .iter()
            .position(|p| p.name() == name)
            .map(ParameterId)
    }

    pub fn find_field_index(&self, name: &str) -> Option<FieldId> {
        self.fields
            .iter()
            .position(|f| {
                self.parameters
                    .get(f.parameter_id().0)
                    .is_some_and(|p| p.name() == name)
            })
            .map(FieldId)
    }

    /// Position of the parameter called `name` in `method`'s argument list.
    pub fn find_method_parameter_index(&self, method: MethodId, name: &str) -> Option<usize> {
        self.method(method)?
            .parameter_ids()
            .iter()
            .position(|id| self.parameter(*id).is_some_and(|p| p.name() == name))
    }

    /// Borrow one field together with its schema and the store.
    pub fn field_view<'a>(
        &'a mut self,
        id: FieldId,
        store: &'a mut dyn ByteStore,
    ) -> Option<FieldView<'a>> {
        let field = self.fields.get_mut(id.0)?;
        let parameter = self.parameters.get(field.parameter_id().0)?;
        Some(FieldView::new(field, parameter, store))
    }

    pub(crate) fn slots_mut(&mut self) -> impl Iterator<Item = &mut Slot> {
        self.fields.iter_mut().map(Field::slot_mut)
    }
}
