//! The RPC server: registry, handlers, store and channels behind one
//! polling loop.
//!
//! ```text
//!   Transport ─bytes─▶ LineDecoder ─line─▶ handle_line ─▶ response ─▶ Transport
//!                                             │
//!                        parse → resolve → validate → dispatch
//!                                             │
//!                     ReservedOp │ field request │ user handler(Request)
//! ```
//!
//! `poll()` services at most one request per call and rotates over the
//! registered channels, so no channel can starve another.

mod field_request;
mod framing;
mod parse;
mod request;
mod reserved;
mod response;

use core::fmt::Write as _;

use log::{debug, info, warn};
use serde_json::{Value, json};

pub use framing::{LineDecoder, LineEvent};
pub use request::{Request, RequestState};
pub use response::{ErrorData, ResponseBuilder};

use self::parse::{REQUEST_TOO_LONG, parse_request};
use self::request::RequestContext;
use self::response::{Failure, Reply, error_data};
use crate::config::{CHANNEL_COUNT_MAX, DeviceConfig, HANDLER_COUNT_MAX, REQUEST_LEN_MAX};
use crate::error::{Error, Result, RpcErrorCode};
use crate::field::{Field, FieldView};
use crate::method::{Callback, HandlerId, Method, ReservedOp};
use crate::ports::{ByteStore, Transport};
use crate::registry::{FieldId, MethodId, ParameterId, Registry};
use crate::schema::{Parameter, ValueType};
use crate::storage::{FieldValue, Slot, StorageLayout, provision, sentinel_slot};

type Handler = Box<dyn FnMut(&mut Request<'_>)>;

struct Channel {
    transport: Box<dyn Transport>,
    decoder: LineDecoder,
}

enum Polled {
    Line(heapless::Vec<u8, REQUEST_LEN_MAX>),
    Overflow,
}

impl Channel {
    /// Read buffered bytes until a non-blank line or an overflow shows up.
    fn read_line(&mut self, index: usize) -> Option<Polled> {
        let mut byte = [0u8; 1];
        while self.transport.available() {
            match self.transport.read(&mut byte) {
                Ok(1) => {}
                Ok(_) => break,
                Err(e) => {
                    warn!("RPC[{}]: read failed: {}", index, e);
                    break;
                }
            }
            match self.decoder.push(byte[0]) {
                Some(LineEvent::Line(line)) => {
                    if line.trim_ascii().is_empty() {
                        continue;
                    }
                    return Some(match heapless::Vec::from_slice(line) {
                        Ok(copy) => Polled::Line(copy),
                        Err(()) => Polled::Overflow,
                    });
                }
                Some(LineEvent::Overflow) => return Some(Polled::Overflow),
                None => {}
            }
        }
        None
    }
}

enum Target {
    Method(MethodId),
    Field(FieldId),
}

pub struct Server<S: ByteStore> {
    config: DeviceConfig,
    registry: Registry,
    handlers: heapless::Vec<Handler, HANDLER_COUNT_MAX>,
    store: S,
    layout: StorageLayout,
    sentinel: Slot,
    serial_number: Slot,
    channels: heapless::Vec<Channel, CHANNEL_COUNT_MAX>,
    current_channel: usize,
    running: bool,
    last_state: RequestState,
}

impl<S: ByteStore> Server<S> {
    /// Lay out the internal slots and register the reserved methods.
    ///
    /// Nothing is read from or written to `store` until [`start`](Self::start).
    pub fn new(config: DeviceConfig, store: S) -> Result<Self> {
        let mut layout = StorageLayout::new(store.capacity());
        let sentinel = sentinel_slot(&mut layout)?;
        let serial_number =
            layout.persistent_slot(FieldValue::Long(i64::from(config.serial_number_default)))?;

        let mut server = Self {
            config,
            registry: Registry::new(),
            handlers: heapless::Vec::new(),
            store,
            layout,
            sentinel,
            serial_number,
            channels: heapless::Vec::new(),
            current_channel: 0,
            running: false,
            last_state: RequestState::Idle,
        };
        for op in ReservedOp::ALL {
            let id = server.registry.create_method(op.name())?;
            server.registry.attach(id, Callback::Reserved(op))?;
            if let Some(method) = server.registry.method_mut(id) {
                method.set_result_type(ValueType::Object);
            }
        }
        Ok(server)
    }

    // ── Setup ─────────────────────────────────────────────────

    pub fn create_method(&mut self, name: &'static str) -> Result<MethodId> {
        self.registry.create_method(name)
    }

    pub fn create_parameter(&mut self, name: &'static str) -> Result<ParameterId> {
        self.registry.create_parameter(name)
    }

    pub fn method_mut(&mut self, id: MethodId) -> Option<&mut Method> {
        self.registry.method_mut(id)
    }

    pub fn parameter_mut(&mut self, id: ParameterId) -> Option<&mut Parameter> {
        self.registry.parameter_mut(id)
    }

    /// Give `method` a user callback. A method takes one callback, once.
    pub fn attach_callback(
        &mut self,
        method: MethodId,
        callback: impl FnMut(&mut Request<'_>) + 'static,
    ) -> Result<()> {
        let existing = self
            .registry
            .method(method)
            .ok_or(Error::InvalidValue("unknown method"))?;
        if existing.callback() != Callback::None {
            return Err(Error::CallbackAlreadyAttached(existing.name()));
        }
        let handler = HandlerId(self.handlers.len());
        self.handlers
            .push(Box::new(callback))
            .map_err(|_| Error::CapacityExceeded("handlers"))?;
        self.registry.attach(method, Callback::User(handler))
    }

    /// Register a persisted field. Its slot follows every earlier one in
    /// the store.
    pub fn create_field(&mut self, name: &'static str, default: FieldValue) -> Result<FieldId> {
        self.registry.check_field_name(name)?;
        let slot = self.layout.persistent_slot(default)?;
        debug!("Registry: field {} at offset {:?}", name, slot.offset());
        self.registry.create_field(name, slot)
    }

    /// Register a field that lives in RAM and resets on every boot.
    pub fn create_ram_field(&mut self, name: &'static str, default: FieldValue) -> Result<FieldId> {
        self.registry.create_field(name, Slot::ram(default))
    }

    /// Hook registration.
    pub fn field_mut(&mut self, id: FieldId) -> Option<&mut Field> {
        self.registry.field_mut(id)
    }

    /// The schema generated for a field, for tightening ranges or units.
    pub fn field_parameter_mut(&mut self, id: FieldId) -> Option<&mut Parameter> {
        let parameter = self.registry.field(id)?.parameter_id();
        self.registry.parameter_mut(parameter)
    }

    pub fn field(&mut self, name: &str) -> Option<FieldView<'_>> {
        let id = self.registry.find_field_index(name)?;
        self.registry.field_view(id, &mut self.store)
    }

    pub fn field_by_id(&mut self, id: FieldId) -> Option<FieldView<'_>> {
        self.registry.field_view(id, &mut self.store)
    }

    /// Add a transport to the polling rotation; returns its channel index.
    pub fn add_channel(&mut self, transport: impl Transport + 'static) -> Result<usize> {
        let index = self.channels.len();
        self.channels
            .push(Channel {
                transport: Box::new(transport),
                decoder: LineDecoder::new(),
            })
            .map_err(|_| Error::CapacityExceeded("channels"))?;
        info!("RPC[{}]: channel added", index);
        Ok(index)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Tear down and hand back the store, e.g. to simulate a reboot.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Store bytes claimed by the sentinel, serial number and fields.
    pub fn storage_used(&self) -> usize {
        self.layout.used()
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Provision the store if needed and begin serving.
    ///
    /// Returns `true` when this boot wrote defaults (fresh store).
    pub fn start(&mut self) -> Result<bool> {
        let provisioned = provision(
            &mut self.store,
            &mut self.sentinel,
            core::iter::once(&mut self.serial_number).chain(self.registry.slots_mut()),
        )?;
        self.running = true;
        info!(
            "RPC: serving {} methods, {} fields, {}/{} store bytes",
            self.registry.methods().len(),
            self.registry.fields().len(),
            self.layout.used(),
            self.layout.capacity()
        );
        Ok(provisioned)
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn serial_number(&self) -> u32 {
        match self.serial_number.value(&self.store) {
            Ok(FieldValue::Long(n)) => {
                u32::try_from(n).unwrap_or(self.config.serial_number_default)
            }
            _ => self.config.serial_number_default,
        }
    }

    pub fn set_serial_number(&mut self, serial_number: u32) -> Result<()> {
        self.serial_number
            .write(&mut self.store, &FieldValue::Long(i64::from(serial_number)))?;
        Ok(())
    }

    /// Reset every field; hooks fire. `false` if any field failed.
    pub fn set_fields_to_defaults(&mut self) -> bool {
        let mut ok = true;
        for index in 0..self.registry.fields().len() {
            ok &= self
                .registry
                .field_view(FieldId(index), &mut self.store)
                .is_some_and(|mut field| field.set_value_to_default());
        }
        ok
    }

    /// Furthest stage the most recent request reached before its response.
    pub fn last_state(&self) -> RequestState {
        self.last_state
    }

    // ── Serving ───────────────────────────────────────────────

    /// Service at most one request on the next channel in rotation.
    ///
    /// Returns `true` if a response was written.
    pub fn poll(&mut self) -> bool {
        if !self.running || self.channels.is_empty() {
            return false;
        }
        let index = self.current_channel % self.channels.len();
        self.current_channel = (index + 1) % self.channels.len();

        let Some(polled) = self
            .channels
            .get_mut(index)
            .and_then(|channel| channel.read_line(index))
        else {
            return false;
        };
        let response = match polled {
            Polled::Line(line) => self.handle_line(&line),
            Polled::Overflow => {
                warn!("RPC[{}]: request over {} bytes dropped", index, REQUEST_LEN_MAX);
                Some(self.reject(Failure::with_data(
                    RpcErrorCode::ServerError,
                    error_data(REQUEST_TOO_LONG),
                )))
            }
        };
        let Some(response) = response else {
            return false;
        };
        if let Some(channel) = self.channels.get_mut(index) {
            let written = channel
                .transport
                .write_all(response.as_bytes())
                .and_then(|()| channel.transport.flush());
            if let Err(e) = written {
                warn!("RPC[{}]: write failed: {}", index, e);
            }
        }
        true
    }

    /// Handle one request line and return the newline-terminated response.
    ///
    /// Blank lines produce no response.
    pub fn handle_line(&mut self, line: &[u8]) -> Option<String> {
        let Ok(text) = core::str::from_utf8(line) else {
            let lossy = String::from_utf8_lossy(line);
            return Some(self.reject(Failure::with_data(
                RpcErrorCode::ParseError,
                error_data(lossy.trim()),
            )));
        };
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if text.len() > REQUEST_LEN_MAX {
            return Some(self.reject(Failure::with_data(
                RpcErrorCode::ServerError,
                error_data(REQUEST_TOO_LONG),
            )));
        }

        let mut ctx = RequestContext::new();
        ctx.advance(RequestState::ReadingRequest);
        self.process(&mut ctx, text);
        Some(self.finish(ctx))
    }

    fn reject(&mut self, failure: Failure) -> String {
        let mut ctx = RequestContext::new();
        ctx.advance(RequestState::ReadingRequest);
        ctx.response.write_failure(failure);
        self.finish(ctx)
    }

    fn finish(&mut self, mut ctx: RequestContext) -> String {
        ctx.advance(RequestState::ResponseWritten);
        let out = ctx.response.render(ctx.pretty);
        ctx.advance(RequestState::Idle);
        self.last_state = ctx.reached();
        out
    }

    fn process(&mut self, ctx: &mut RequestContext, text: &str) {
        ctx.pretty = !text.starts_with(['[', '{']);
        let parsed = match parse_request(text) {
            Ok(parsed) => parsed,
            Err(failure) => {
                ctx.response.write_failure(failure);
                return;
            }
        };
        ctx.pretty = parsed.pretty;
        ctx.items = parsed.items;
        ctx.advance(RequestState::Parsed);

        let Some(head) = ctx.items.first() else {
            ctx.response.write_failure(Failure::method_not_found());
            return;
        };
        if let Some(id) = id_echo(head) {
            ctx.response.set_id(id);
        }
        let Some(target) = self.resolve(head) else {
            debug!("RPC: no method or field for {}", head);
            ctx.response.write_failure(Failure::method_not_found());
            return;
        };
        ctx.advance(RequestState::Resolved);

        match target {
            Target::Method(method) => self.dispatch_method(ctx, method),
            Target::Field(field) => {
                ctx.advance(RequestState::Dispatched);
                let items = core::mem::take(&mut ctx.items);
                let reply = self.field_request(field, items.get(1..).unwrap_or(&[]));
                ctx.items = items;
                ctx.response.write_reply(reply);
            }
        }
    }

    fn dispatch_method(&mut self, ctx: &mut RequestContext, method: MethodId) {
        ctx.method = Some(method);
        let Some(callback) = self.registry.method(method).map(Method::callback) else {
            ctx.response.write_failure(Failure::method_not_found());
            return;
        };

        let answers_help = matches!(callback, Callback::Reserved(op) if op.is_help());
        if !answers_help {
            if let Some(reply) = self.help_form(method, ctx.args()) {
                ctx.advance(RequestState::Dispatched);
                ctx.response.write_reply(reply);
                return;
            }
        }

        match callback {
            Callback::Reserved(op) => {
                ctx.advance(RequestState::Validated);
                ctx.advance(RequestState::Dispatched);
                let items = core::mem::take(&mut ctx.items);
                let reply = self.run_reserved(op, items.get(1..).unwrap_or(&[]));
                ctx.items = items;
                ctx.response.write_reply(reply);
            }
            Callback::User(handler) => {
                if let Err(failure) = self.validate_arguments(method, ctx.args()) {
                    ctx.response.write_failure(failure);
                    return;
                }
                ctx.advance(RequestState::Validated);
                ctx.advance(RequestState::Dispatched);
                let Self {
                    handlers,
                    registry,
                    store,
                    ..
                } = self;
                if let Some(handler) = handlers.get_mut(handler.0) {
                    let mut request = Request::new(ctx, registry, store);
                    handler(&mut request);
                }
            }
            Callback::None => {
                // No callback yet: arguments are still checked, result is null.
                if let Err(failure) = self.validate_arguments(method, ctx.args()) {
                    ctx.response.write_failure(failure);
                    return;
                }
                ctx.advance(RequestState::Validated);
                ctx.advance(RequestState::Dispatched);
            }
        }
    }

    /// `[m, "?"]` and `[m, param, "?"]`; `None` when the request is a call.
    fn help_form(&self, method: MethodId, args: &[Value]) -> Option<Reply> {
        match args {
            [last] => help_level(last).map(|verbose| Ok(self.method_info(method, verbose))),
            [parameter, last] => help_level(last).map(|_| {
                self.method_parameter(method, parameter)
                    .map(|p| json!({ "parameter_info": p.describe() }))
                    .ok_or_else(|| Failure::invalid_params("Parameter not found"))
            }),
            _ => None,
        }
    }

    fn validate_arguments(
        &self,
        method: MethodId,
        args: &[Value],
    ) -> core::result::Result<(), Failure> {
        let ids = self
            .registry
            .method(method)
            .ok_or_else(Failure::method_not_found)?
            .parameter_ids();
        if args.len() != ids.len() {
            return Err(Failure::with_data(
                RpcErrorCode::InvalidParams,
                arity_message(args.len(), ids.len()),
            ));
        }
        for (id, arg) in ids.iter().zip(args) {
            let Some(parameter) = self.registry.parameter(*id) else {
                continue;
            };
            parameter.validate(arg).map_err(|e| {
                Failure::with_data(RpcErrorCode::InvalidParams, e.render(parameter.name()))
            })?;
        }
        Ok(())
    }

    fn resolve(&self, head: &Value) -> Option<Target> {
        if let Some(method) = self.resolve_method(head) {
            return Some(Target::Method(method));
        }
        head.as_str()
            .and_then(|name| self.registry.find_field_index(name))
            .map(Target::Field)
    }

    /// Method by position (number or all-digit string) or by name.
    fn resolve_method(&self, value: &Value) -> Option<MethodId> {
        match value {
            Value::String(name) if !is_digits(name) => self.registry.find_method_index(name),
            other => {
                let index = position(other)?;
                (index < self.registry.methods().len()).then_some(MethodId(index))
            }
        }
    }

    /// One of `method`'s parameters, by position or by name.
    fn method_parameter(&self, method: MethodId, value: &Value) -> Option<&Parameter> {
        let ids = self.registry.method(method)?.parameter_ids();
        let index = match value {
            Value::String(name) if !is_digits(name) => {
                self.registry.find_method_parameter_index(method, name)?
            }
            other => position(other)?,
        };
        self.registry.parameter(*ids.get(index)?)
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Non-negative integer or all-digit string.
fn position(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => usize::try_from(n.as_u64()?).ok(),
        Value::String(s) if is_digits(s) => s.parse().ok(),
        _ => None,
    }
}

/// `Some(verbose)` for `"?"` / `"??"`.
fn help_level(value: &Value) -> Option<bool> {
    match value.as_str()? {
        "?" => Some(false),
        "??" => Some(true),
        _ => None,
    }
}

/// The response `id`: integers (including all-digit strings) as numbers,
/// other strings verbatim.
fn id_echo(head: &Value) -> Option<Value> {
    match head {
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(head.clone()),
        Value::String(s) if is_digits(s) => Some(
            s.parse::<u64>()
                .map_or_else(|_| head.clone(), Value::from),
        ),
        Value::String(_) => Some(head.clone()),
        _ => None,
    }
}

fn arity_message(given: usize, needed: usize) -> ErrorData {
    let mut out = ErrorData::new();
    let _ = write!(
        out,
        "Incorrect parameter number. {given} given. {needed} needed."
    );
    out
}
