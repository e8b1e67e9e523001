//! Built-in methods: device info, method ids, parameter listing, help,
//! and field listings.

use serde_json::{Map, Value, json};

use super::Server;
use super::response::{Failure, Reply, error_data};
use crate::error::RpcErrorCode;
use crate::field::FieldError;
use crate::method::{Method, ReservedOp};
use crate::ports::ByteStore;
use crate::registry::MethodId;

impl<S: ByteStore> Server<S> {
    pub(super) fn run_reserved(&mut self, op: ReservedOp, args: &[Value]) -> Reply {
        match op {
            ReservedOp::DeviceInfo => Ok(self.device_info()),
            ReservedOp::MethodIds => Ok(self.method_ids()),
            ReservedOp::Parameters => Ok(json!({ "parameters": self.parameter_help() })),
            ReservedOp::Help => self.help(false, args),
            ReservedOp::VerboseHelp => self.help(true, args),
            ReservedOp::FieldDefaultValues => Ok(self.field_default_values()),
            ReservedOp::FieldValues => self.field_values(),
            ReservedOp::SetFieldsToDefaults => {
                if !self.set_fields_to_defaults() {
                    return Err(Failure::with_data(
                        RpcErrorCode::ServerError,
                        error_data("Could not reset every field"),
                    ));
                }
                self.field_values()
            }
        }
    }

    /// `{name, model_number, serial_number, firmware_version}`.
    pub fn device_info(&self) -> Value {
        let version = &self.config.firmware_version;
        json!({
            "name": self.config.name.as_str(),
            "model_number": self.config.model_number,
            "serial_number": self.serial_number(),
            "firmware_version": {
                "major": version.major,
                "minor": version.minor,
                "patch": version.patch,
            },
        })
    }

    fn method_ids(&self) -> Value {
        let ids = self
            .registry
            .methods()
            .iter()
            .enumerate()
            .filter(|(_, m)| !m.is_reserved())
            .map(|(i, m)| (m.name().into(), Value::from(i)))
            .collect::<Map<String, Value>>();
        Value::Object(ids)
    }

    fn parameter_help(&self) -> Value {
        self.registry
            .parameters()
            .iter()
            .map(|p| p.describe())
            .collect()
    }

    fn user_methods(&self) -> impl Iterator<Item = &Method> {
        self.registry.methods().iter().filter(|m| !m.is_reserved())
    }

    /// `?` / `??`.
    ///
    /// | Arguments          | Result                                     |
    /// |--------------------|--------------------------------------------|
    /// | none               | device info and method list                |
    /// | method             | `method_info` (+ `parameter_info` if unary)|
    /// | parameter          | `parameter_info` (any registered parameter)|
    /// | method, parameter  | `parameter_info` for that method's argument|
    fn help(&self, verbose: bool, args: &[Value]) -> Reply {
        match args {
            [] => {
                let mut out = Map::new();
                out.insert("device_info".into(), self.device_info());
                let methods: Value = if verbose {
                    self.user_methods()
                        .map(|m| m.describe(false, |id| self.registry.parameter(id)))
                        .collect()
                } else {
                    self.user_methods().map(|m| Value::from(m.name())).collect()
                };
                out.insert("methods".into(), methods);
                if verbose {
                    out.insert("parameters".into(), self.parameter_help());
                }
                Ok(Value::Object(out))
            }
            [target] => {
                if let Some(method) = self.resolve_method(target) {
                    return Ok(self.method_info(method, verbose));
                }
                target
                    .as_str()
                    .and_then(|name| self.registry.find_parameter_index(name))
                    .and_then(|id| self.registry.parameter(id))
                    .map(|p| json!({ "parameter_info": p.describe() }))
                    .ok_or(Failure::new(RpcErrorCode::InvalidParams))
            }
            [method, parameter] => self
                .resolve_method(method)
                .and_then(|m| self.method_parameter(m, parameter))
                .map(|p| json!({ "parameter_info": p.describe() }))
                .ok_or(Failure::new(RpcErrorCode::InvalidParams)),
            _ => Err(Failure::new(RpcErrorCode::InvalidParams)),
        }
    }

    /// `{"method_info": …}`, plus `parameter_info` for the sole argument of
    /// a one-parameter method.
    pub(super) fn method_info(&self, method: MethodId, verbose: bool) -> Value {
        let Some(m) = self.registry.method(method) else {
            return json!({ "method_info": Value::Null });
        };
        let mut out = Map::new();
        out.insert(
            "method_info".into(),
            m.describe(verbose, |id| self.registry.parameter(id)),
        );
        let sole = match m.parameter_ids() {
            [only] => self.registry.parameter(*only),
            _ => None,
        };
        if let Some(p) = sole {
            out.insert("parameter_info".into(), p.describe());
        }
        Value::Object(out)
    }

    fn field_default_values(&self) -> Value {
        let mut out = Map::new();
        for field in self.registry.fields() {
            if let Some(p) = self.registry.parameter(field.parameter_id()) {
                out.insert(p.name().into(), field.slot().default_value().to_json());
            }
        }
        Value::Object(out)
    }

    fn field_values(&self) -> Reply {
        let mut out = Map::new();
        for field in self.registry.fields() {
            let Some(p) = self.registry.parameter(field.parameter_id()) else {
                continue;
            };
            let value = field.slot().value(&self.store).map_err(|e| {
                Failure::with_data(
                    RpcErrorCode::ServerError,
                    FieldError::Storage(e).render(p.name()),
                )
            })?;
            out.insert(p.name().into(), value.to_json());
        }
        Ok(Value::Object(out))
    }
}
