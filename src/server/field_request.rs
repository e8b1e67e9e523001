//! Requests addressed to a field by name: `[field, op, args…]`.
//!
//! | Operation                   | Args     | Result              |
//! |-----------------------------|----------|---------------------|
//! | *(none)* / `getValue`       | –        | current value       |
//! | `getDefaultValue`           | –        | default value       |
//! | `setValue`                  | v        | new value           |
//! | `setValueToDefault`         | –        | new value           |
//! | `getElementValue`           | i        | element             |
//! | `getDefaultElementValue`    | i        | default element     |
//! | `setElementValue`           | i, v     | new value           |
//! | `setElementValueToDefault`  | i        | new value           |
//! | `setAllElementValues`       | v        | new value           |
//! | `?` / `??`                  | –        | `parameter_info`    |

use serde_json::{Value, json};

use super::response::{Failure, Reply};
use super::{Server, arity_message};
use crate::error::RpcErrorCode;
use crate::field::{FieldError, FieldView};
use crate::ports::ByteStore;
use crate::registry::FieldId;
use crate::schema::{ValidationError, ValueType, json_as_long};
use crate::storage::Element;

const GET_VALUE: &str = "getValue";
const GET_DEFAULT_VALUE: &str = "getDefaultValue";
const SET_VALUE: &str = "setValue";
const SET_VALUE_TO_DEFAULT: &str = "setValueToDefault";
const GET_ELEMENT_VALUE: &str = "getElementValue";
const GET_DEFAULT_ELEMENT_VALUE: &str = "getDefaultElementValue";
const SET_ELEMENT_VALUE: &str = "setElementValue";
const SET_ELEMENT_VALUE_TO_DEFAULT: &str = "setElementValueToDefault";
const SET_ALL_ELEMENT_VALUES: &str = "setAllElementValues";

/// Argument count each operation takes after its name.
fn arity(op: &str) -> Option<usize> {
    match op {
        GET_VALUE | GET_DEFAULT_VALUE | SET_VALUE_TO_DEFAULT | "?" | "??" => Some(0),
        SET_VALUE
        | GET_ELEMENT_VALUE
        | GET_DEFAULT_ELEMENT_VALUE
        | SET_ELEMENT_VALUE_TO_DEFAULT
        | SET_ALL_ELEMENT_VALUES => Some(1),
        SET_ELEMENT_VALUE => Some(2),
        _ => None,
    }
}

impl<S: ByteStore> Server<S> {
    pub(super) fn field_request(&mut self, id: FieldId, args: &[Value]) -> Reply {
        let (op, rest) = match args.split_first() {
            None => (GET_VALUE, args),
            Some((op, rest)) => (op.as_str().ok_or_else(Failure::method_not_found)?, rest),
        };
        let needed = arity(op).ok_or_else(Failure::method_not_found)?;
        if rest.len() != needed {
            return Err(Failure::with_data(
                RpcErrorCode::InvalidParams,
                arity_message(rest.len(), needed),
            ));
        }
        let Some(mut field) = self.registry.field_view(id, &mut self.store) else {
            return Err(Failure::method_not_found());
        };
        let name = field.name();
        let refused = |e: FieldError| field_failure(e, name);

        match op {
            GET_VALUE => current(&field),
            GET_DEFAULT_VALUE => Ok(field.default_value_json()),
            "?" | "??" => Ok(json!({ "parameter_info": field.parameter().describe() })),
            SET_VALUE => {
                field.try_set_value(&rest[0]).map_err(refused)?;
                current(&field)
            }
            SET_VALUE_TO_DEFAULT => {
                if !field.set_value_to_default() {
                    return Err(refused(FieldError::Shape));
                }
                current(&field)
            }
            GET_ELEMENT_VALUE => element(field.element_value(index(&rest[0], name)?), name),
            GET_DEFAULT_ELEMENT_VALUE => {
                element(field.default_element_value(index(&rest[0], name)?), name)
            }
            SET_ELEMENT_VALUE => {
                let i = index(&rest[0], name)?;
                field.try_set_element_value(i, &rest[1]).map_err(refused)?;
                current(&field)
            }
            SET_ELEMENT_VALUE_TO_DEFAULT => {
                let i = index(&rest[0], name)?;
                field.try_set_element_value_to_default(i).map_err(refused)?;
                current(&field)
            }
            SET_ALL_ELEMENT_VALUES => {
                field.try_set_all_element_values(&rest[0]).map_err(refused)?;
                current(&field)
            }
            _ => Err(Failure::method_not_found()),
        }
    }
}

fn current(field: &FieldView<'_>) -> Reply {
    field
        .value_json()
        .map_err(|e| field_failure(FieldError::Storage(e), field.name()))
}

fn element(element: Option<Element>, name: &str) -> Reply {
    element
        .map(Element::to_json)
        .ok_or_else(|| field_failure(FieldError::IndexOutOfRange, name))
}

fn index(value: &Value, name: &str) -> Result<usize, Failure> {
    let Some(i) = json_as_long(value) else {
        let wrong = ValidationError::WrongType {
            expected: ValueType::Long,
        };
        return Err(Failure::with_data(
            RpcErrorCode::InvalidParams,
            wrong.render("index"),
        ));
    };
    usize::try_from(i).map_err(|_| field_failure(FieldError::IndexOutOfRange, name))
}

fn field_failure(error: FieldError, name: &str) -> Failure {
    let code = match error {
        FieldError::Storage(_) => RpcErrorCode::ServerError,
        _ => RpcErrorCode::InvalidParams,
    };
    Failure::with_data(code, error.render(name))
}
