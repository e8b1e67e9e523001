//! Methods: named callables with an ordered parameter list.
//!
//! A method's callback is a closed enum. Reserved operations are engine
//! built-ins; user callbacks are closures held by the server and
//! referenced here by [`HandlerId`].

use heapless::Vec;
use serde_json::{Map, Value};

use crate::config::METHOD_PARAMETER_COUNT_MAX;
use crate::error::{Error, Result};
use crate::registry::ParameterId;
use crate::schema::{Parameter, ValueType};

/// Index into the server's handler table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(pub(crate) usize);

/// Engine built-ins, registered first and in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservedOp {
    DeviceInfo,
    MethodIds,
    Parameters,
    Help,
    VerboseHelp,
    FieldDefaultValues,
    FieldValues,
    SetFieldsToDefaults,
}

impl ReservedOp {
    pub const ALL: [Self; 8] = [
        Self::DeviceInfo,
        Self::MethodIds,
        Self::Parameters,
        Self::Help,
        Self::VerboseHelp,
        Self::FieldDefaultValues,
        Self::FieldValues,
        Self::SetFieldsToDefaults,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::DeviceInfo => "getDeviceInfo",
            Self::MethodIds => "getMethodIds",
            Self::Parameters => "getParameters",
            Self::Help => "?",
            Self::VerboseHelp => "??",
            Self::FieldDefaultValues => "getFieldDefaultValues",
            Self::FieldValues => "getFieldValues",
            Self::SetFieldsToDefaults => "setFieldsToDefaults",
        }
    }

    pub const fn is_help(self) -> bool {
        matches!(self, Self::Help | Self::VerboseHelp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    None,
    Reserved(ReservedOp),
    User(HandlerId),
}

#[derive(Debug, Clone)]
pub struct Method {
    name: &'static str,
    parameters: Vec<ParameterId, METHOD_PARAMETER_COUNT_MAX>,
    result_type: ValueType,
    callback: Callback,
}

impl Method {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            parameters: Vec::new(),
            result_type: ValueType::Null,
            callback: Callback::None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parameter_ids(&self) -> &[ParameterId] {
        &self.parameters
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    pub fn result_type(&self) -> ValueType {
        self.result_type
    }

    pub fn callback(&self) -> Callback {
        self.callback
    }

    pub fn is_reserved(&self) -> bool {
        matches!(self.callback, Callback::Reserved(_))
    }

    /// Append a parameter. Order here is argument order on the wire.
    pub fn add_parameter(&mut self, parameter: ParameterId) -> Result<&mut Self> {
        self.parameters
            .push(parameter)
            .map_err(|_| Error::CapacityExceeded("method parameters"))?;
        Ok(self)
    }

    pub fn set_result_type(&mut self, result_type: ValueType) -> &mut Self {
        self.result_type = result_type;
        self
    }

    pub(crate) fn attach(&mut self, callback: Callback) -> Result<()> {
        if self.callback != Callback::None {
            return Err(Error::CallbackAlreadyAttached(self.name));
        }
        self.callback = callback;
        Ok(())
    }

    /// Help object: `{name, parameters, result_type}`. Verbose help
    /// expands parameter names into full schemas.
    ///
    /// `lookup` resolves this method's parameter ids.
    pub fn describe<'p>(
        &self,
        verbose: bool,
        lookup: impl Fn(ParameterId) -> Option<&'p Parameter>,
    ) -> Value {
        let parameters = self
            .parameters
            .iter()
            .filter_map(|id| lookup(*id))
            .map(|p| {
                if verbose {
                    p.describe()
                } else {
                    Value::from(p.name())
                }
            })
            .collect();
        let mut obj = Map::new();
        obj.insert("name".into(), Value::from(self.name));
        obj.insert("parameters".into(), Value::Array(parameters));
        obj.insert("result_type".into(), Value::from(self.result_type.as_str()));
        Value::Object(obj)
    }
}
