//! Schema descriptors: value types and parameter constraints.

mod parameter;
mod value;

pub use parameter::{Parameter, ValidationError};
pub use value::{Number, SubsetMember, ValueType};

pub(crate) use value::json_as_long;
