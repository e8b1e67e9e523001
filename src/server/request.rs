//! Per-request state and the accessor handed to user callbacks.

use core::fmt;

use serde_json::Value;

use super::response::ResponseBuilder;
use crate::error::RpcErrorCode;
use crate::field::FieldView;
use crate::ports::ByteStore;
use crate::registry::{MethodId, Registry};
use crate::schema::json_as_long;

/// Stages of one request, in order.
///
/// ```text
/// Idle → ReadingRequest → Parsed → Resolved → Validated → Dispatched
///                                                              │
///                    Idle ◀── ResponseWritten ◀────────────────┘
/// ```
///
/// A request that fails early jumps straight to `ResponseWritten`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    ReadingRequest,
    Parsed,
    Resolved,
    Validated,
    Dispatched,
    ResponseWritten,
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Everything the engine knows about the request in flight.
#[derive(Debug)]
pub(crate) struct RequestContext {
    /// The request array; element 0 is the method identifier.
    pub items: Vec<Value>,
    pub method: Option<MethodId>,
    pub response: ResponseBuilder,
    pub pretty: bool,
    state: RequestState,
    /// Furthest stage reached before the response was written.
    reached: RequestState,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            method: None,
            response: ResponseBuilder::new(),
            pretty: false,
            state: RequestState::Idle,
            reached: RequestState::Idle,
        }
    }

    pub fn reached(&self) -> RequestState {
        self.reached
    }

    pub fn advance(&mut self, next: RequestState) {
        log::debug!("RPC: {} -> {}", self.state, next);
        if !matches!(next, RequestState::ResponseWritten | RequestState::Idle) {
            self.reached = next;
        }
        self.state = next;
    }

    /// Arguments after the method identifier.
    pub fn args(&self) -> &[Value] {
        self.items.get(1..).unwrap_or(&[])
    }
}

/// A user callback's view of the request: its arguments, the response,
/// and the device's fields.
pub struct Request<'a> {
    ctx: &'a mut RequestContext,
    registry: &'a mut Registry,
    store: &'a mut dyn ByteStore,
}

impl<'a> Request<'a> {
    pub(crate) fn new(
        ctx: &'a mut RequestContext,
        registry: &'a mut Registry,
        store: &'a mut dyn ByteStore,
    ) -> Self {
        Self {
            ctx,
            registry,
            store,
        }
    }

    pub fn method_name(&self) -> &'static str {
        self.ctx
            .method
            .and_then(|id| self.registry.method(id))
            .map_or("", |m| m.name())
    }

    pub fn argument_count(&self) -> usize {
        self.ctx.args().len()
    }

    /// Argument bound to the method parameter called `name`.
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        let method = self.ctx.method?;
        let position = self.registry.find_method_parameter_index(method, name)?;
        self.ctx.args().get(position)
    }

    /// Argument at `position` (0 is the first argument after the method).
    pub fn parameter_at(&self, position: usize) -> Option<&Value> {
        self.ctx.args().get(position)
    }

    pub fn long(&self, name: &str) -> Option<i64> {
        json_as_long(self.parameter(name)?)
    }

    pub fn double(&self, name: &str) -> Option<f64> {
        self.parameter(name)?.as_f64()
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.parameter(name)?.as_bool()
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.parameter(name)?.as_str()
    }

    pub fn array(&self, name: &str) -> Option<&[Value]> {
        self.parameter(name)?.as_array().map(Vec::as_slice)
    }

    /// Set the result. Returns `false` if a response was already written.
    pub fn write_result(&mut self, value: impl Into<Value>) -> bool {
        self.ctx.response.write_result(value.into())
    }

    /// Report a server error with `data`. Returns `false` if a response was
    /// already written.
    pub fn write_error(&mut self, data: &str) -> bool {
        self.ctx
            .response
            .write_error(RpcErrorCode::ServerError, Some(Value::from(data)))
    }

    pub fn has_responded(&self) -> bool {
        self.ctx.response.has_responded()
    }

    /// A device field by name.
    pub fn field(&mut self, name: &str) -> Option<FieldView<'_>> {
        let id = self.registry.find_field_index(name)?;
        self.registry.field_view(id, &mut *self.store)
    }
}
