//! Operation dispatch registry.
//!
//! # How routing works (for beginners)
//!
//! Every inbound [`Message`] names an operation (`head.operationCode`) and a
//! kind (`head.commandCode`).  The kind selects one of three independent
//! registries:
//!
//! | Command code           | Registry  |
//! |------------------------|-----------|
//! | `Request`, `Response`  | Request   |
//! | `Event`                | Event     |
//! | `Broadcast`            | Broadcast |
//!
//! A `Response` goes to the Request registry because the handler that sent
//! the request is the one waiting for the answer.
//!
//! Within a registry, the operation code selects a handler.  Handlers are
//! created on first use from a registered factory and then reused, so there
//! is at most one instance per `(category, operation code)` pair.  Codes with
//! no factory fall back to the registry's Default handler, which is always
//! present and logs what it receives.
//!
//! Handlers run with no registry lock held, so a handler may look up other
//! handlers or send requests from inside `on_receive`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use gamenet_core::{CommandCode, DispatchCategory, Message, OperationCode};
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::HandlerError;
use crate::infrastructure::network::TransportError;

// ── Handler contract ──────────────────────────────────────────────────────────

/// A category-specific object bound to one operation code.
#[cfg_attr(test, mockall::automock)]
pub trait OperationHandler: Send + Sync {
    /// Handles the payload of a message routed to this handler.
    ///
    /// # Errors
    ///
    /// Returning an error reports it to the category's Default handler; the
    /// connection and the rest of the drain are unaffected.
    fn on_receive(&self, payload: &str) -> Result<(), HandlerError>;

    /// Handles a message whose operation code has no registered handler.
    /// Only called on Default handlers.
    ///
    /// # Errors
    ///
    /// Same contract as [`OperationHandler::on_receive`].
    fn on_unrouted(&self, operation_code: OperationCode, payload: &str) -> Result<(), HandlerError> {
        let _ = operation_code;
        self.on_receive(payload)
    }

    /// Observes a failure raised by the handler for `operation_code`.
    /// Only called on Default handlers.
    fn on_failure(&self, operation_code: OperationCode, error: &HandlerError) {
        warn!("handler for {operation_code} failed: {error}");
    }
}

/// Where handlers put their outbound messages.
#[cfg_attr(test, mockall::automock)]
pub trait OutboundSink: Send + Sync {
    /// Stamps, encodes and sends one message.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the message could not be queued.
    fn send(
        &self,
        operation_code: OperationCode,
        command_code: CommandCode,
        payload: String,
    ) -> Result<(), TransportError>;
}

/// One-time binding handed to a handler factory.
///
/// Lets the handler issue its own requests without repeating its operation
/// code on every call.
#[derive(Clone)]
pub struct HandlerBinding {
    operation_code: OperationCode,
    category: DispatchCategory,
    outbound: Arc<dyn OutboundSink>,
}

impl HandlerBinding {
    pub fn operation_code(&self) -> OperationCode {
        self.operation_code
    }

    pub fn category(&self) -> DispatchCategory {
        self.category
    }

    /// Sends a `Request` for this binding's operation code.
    ///
    /// # Errors
    ///
    /// See [`OutboundSink::send`].
    pub fn send_request(&self, payload: impl Into<String>) -> Result<(), TransportError> {
        self.outbound
            .send(self.operation_code, CommandCode::Request, payload.into())
    }
}

impl fmt::Debug for HandlerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerBinding")
            .field("operation_code", &self.operation_code)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

/// Builds a handler the first time its key is looked up.
pub type HandlerFactory =
    Arc<dyn Fn(HandlerBinding) -> Arc<dyn OperationHandler> + Send + Sync>;

// ── Default handler ───────────────────────────────────────────────────────────

/// Fallback handler pre-registered in every category.
///
/// Never fails: it logs what it is given so unexpected traffic is visible
/// rather than silently dropped.
#[derive(Debug)]
pub struct DefaultHandler {
    category: DispatchCategory,
}

impl DefaultHandler {
    pub fn new(binding: HandlerBinding) -> Self {
        Self {
            category: binding.category(),
        }
    }

    /// Factory suitable for [`OperationRegistry::set_default`].
    pub fn factory() -> HandlerFactory {
        Arc::new(|binding: HandlerBinding| {
            Arc::new(DefaultHandler::new(binding)) as Arc<dyn OperationHandler>
        })
    }
}

impl OperationHandler for DefaultHandler {
    fn on_receive(&self, payload: &str) -> Result<(), HandlerError> {
        debug!(category = %self.category, "default handler received: {payload}");
        Ok(())
    }

    fn on_unrouted(&self, operation_code: OperationCode, payload: &str) -> Result<(), HandlerError> {
        warn!(
            category = %self.category,
            "no handler registered for {operation_code}; payload: {payload}"
        );
        Ok(())
    }

    fn on_failure(&self, operation_code: OperationCode, error: &HandlerError) {
        warn!(category = %self.category, "handler for {operation_code} failed: {error}");
    }
}

// ── Per-category registry ─────────────────────────────────────────────────────

struct CategoryState {
    factories: HashMap<OperationCode, HandlerFactory>,
    default_factory: HandlerFactory,
    instances: HashMap<OperationCode, Arc<dyn OperationHandler>>,
    /// Bumped by every `register`/`set_default`.  An instance built from a
    /// factory looked up under an older generation is never cached.
    generation: u64,
}

impl CategoryState {
    fn factory_for(&self, operation_code: OperationCode) -> Option<HandlerFactory> {
        if operation_code == OperationCode::DEFAULT {
            return Some(Arc::clone(&self.default_factory));
        }
        self.factories.get(&operation_code).cloned()
    }
}

/// Handler registry for one [`DispatchCategory`], guarded by its own mutex.
pub struct HandlerRegistry {
    category: DispatchCategory,
    outbound: Arc<dyn OutboundSink>,
    state: Mutex<CategoryState>,
}

impl HandlerRegistry {
    fn new(category: DispatchCategory, outbound: Arc<dyn OutboundSink>) -> Self {
        Self {
            category,
            outbound,
            state: Mutex::new(CategoryState {
                factories: HashMap::new(),
                default_factory: DefaultHandler::factory(),
                instances: HashMap::new(),
                generation: 0,
            }),
        }
    }

    pub fn category(&self) -> DispatchCategory {
        self.category
    }

    /// Registers `factory` for `operation_code`, replacing any earlier
    /// factory and discarding its instance.  Returns `true` if a factory was
    /// replaced.
    pub fn register(&self, operation_code: OperationCode, factory: HandlerFactory) -> bool {
        if operation_code == OperationCode::DEFAULT {
            return self.set_default(factory);
        }
        let mut state = self.state.lock();
        state.generation += 1;
        state.instances.remove(&operation_code);
        state.factories.insert(operation_code, factory).is_some()
    }

    /// Replaces the Default handler factory.  Always returns `true`, since a
    /// Default is always present.
    pub fn set_default(&self, factory: HandlerFactory) -> bool {
        let mut state = self.state.lock();
        state.generation += 1;
        state.instances.remove(&OperationCode::DEFAULT);
        state.default_factory = factory;
        true
    }

    /// Returns `true` if a handler (or factory) exists for `operation_code`.
    pub fn is_registered(&self, operation_code: OperationCode) -> bool {
        self.state.lock().factory_for(operation_code).is_some()
    }

    /// Returns the handler for `operation_code`, creating and binding it on
    /// first use.  Returns `None` if nothing is registered for the code.
    pub fn get_or_create(&self, operation_code: OperationCode) -> Option<Arc<dyn OperationHandler>> {
        loop {
            let (factory, generation) = {
                let state = self.state.lock();
                if let Some(handler) = state.instances.get(&operation_code) {
                    return Some(Arc::clone(handler));
                }
                (state.factory_for(operation_code)?, state.generation)
            };
            if let Some(handler) = self.instantiate(operation_code, factory, generation) {
                return Some(handler);
            }
        }
    }

    /// Returns the Default handler of this category.
    pub fn default_handler(&self) -> Arc<dyn OperationHandler> {
        loop {
            let (factory, generation) = {
                let state = self.state.lock();
                if let Some(handler) = state.instances.get(&OperationCode::DEFAULT) {
                    return Arc::clone(handler);
                }
                (Arc::clone(&state.default_factory), state.generation)
            };
            if let Some(handler) = self.instantiate(OperationCode::DEFAULT, factory, generation) {
                return handler;
            }
        }
    }

    /// Returns the handler for `operation_code`, or the Default handler.
    pub fn resolve(&self, operation_code: OperationCode) -> Arc<dyn OperationHandler> {
        self.get_or_create(operation_code)
            .unwrap_or_else(|| self.default_handler())
    }

    /// Number of handler instances created so far.
    pub fn instance_count(&self) -> usize {
        self.state.lock().instances.len()
    }

    /// Runs the factory outside the lock; if another thread won the race the
    /// first stored instance is kept.  Returns `None` if the registrations
    /// changed while the factory ran, so the caller retries with the current
    /// factory.
    fn instantiate(
        &self,
        operation_code: OperationCode,
        factory: HandlerFactory,
        generation: u64,
    ) -> Option<Arc<dyn OperationHandler>> {
        let binding = HandlerBinding {
            operation_code,
            category: self.category,
            outbound: Arc::clone(&self.outbound),
        };
        let handler = factory(binding);
        debug!(category = %self.category, "created handler for {operation_code}");

        let mut state = self.state.lock();
        if state.generation != generation {
            debug!(category = %self.category, "discarding stale handler for {operation_code}");
            return None;
        }
        Some(Arc::clone(state.instances.entry(operation_code).or_insert(handler)))
    }
}

// ── Top-level registry ────────────────────────────────────────────────────────

/// How [`OperationRegistry::dispatch`] handled a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A registered handler accepted the payload.
    Handled,
    /// No handler was registered; the Default handler observed the message.
    Fallback,
    /// The handler returned an error, which was reported to the Default
    /// handler.
    Failed,
}

/// The three independent handler registries (Request, Event, Broadcast).
pub struct OperationRegistry {
    request: HandlerRegistry,
    event: HandlerRegistry,
    broadcast: HandlerRegistry,
}

impl OperationRegistry {
    /// Creates the registries; every handler they create sends through
    /// `outbound`.
    pub fn new(outbound: Arc<dyn OutboundSink>) -> Self {
        Self {
            request: HandlerRegistry::new(DispatchCategory::Request, Arc::clone(&outbound)),
            event: HandlerRegistry::new(DispatchCategory::Event, Arc::clone(&outbound)),
            broadcast: HandlerRegistry::new(DispatchCategory::Broadcast, outbound),
        }
    }

    /// Returns the registry for `category`.
    pub fn registry(&self, category: DispatchCategory) -> &HandlerRegistry {
        match category {
            DispatchCategory::Request => &self.request,
            DispatchCategory::Event => &self.event,
            DispatchCategory::Broadcast => &self.broadcast,
        }
    }

    /// See [`HandlerRegistry::register`].
    pub fn register(
        &self,
        category: DispatchCategory,
        operation_code: OperationCode,
        factory: HandlerFactory,
    ) -> bool {
        self.registry(category).register(operation_code, factory)
    }

    /// See [`HandlerRegistry::set_default`].
    pub fn set_default(&self, category: DispatchCategory, factory: HandlerFactory) -> bool {
        self.registry(category).set_default(factory)
    }

    /// See [`HandlerRegistry::get_or_create`].
    pub fn get_or_create(
        &self,
        category: DispatchCategory,
        operation_code: OperationCode,
    ) -> Option<Arc<dyn OperationHandler>> {
        self.registry(category).get_or_create(operation_code)
    }

    /// See [`HandlerRegistry::resolve`].
    pub fn resolve(
        &self,
        category: DispatchCategory,
        operation_code: OperationCode,
    ) -> Arc<dyn OperationHandler> {
        self.registry(category).resolve(operation_code)
    }

    /// See [`HandlerRegistry::instance_count`].
    pub fn instance_count(&self, category: DispatchCategory) -> usize {
        self.registry(category).instance_count()
    }

    /// Routes `message` to its handler.
    ///
    /// Never fails: unroutable codes go to the Default handler and handler
    /// errors are reported to it, so a bad message cannot stop a drain.
    pub fn dispatch(&self, message: &Message) -> DispatchOutcome {
        let operation_code = message.operation_code();
        let registry = self.registry(message.category());

        let (result, outcome) = match registry.get_or_create(operation_code) {
            Some(handler) => (handler.on_receive(message.payload()), DispatchOutcome::Handled),
            None => (
                registry
                    .default_handler()
                    .on_unrouted(operation_code, message.payload()),
                DispatchOutcome::Fallback,
            ),
        };

        match result {
            Ok(()) => outcome,
            Err(error) => {
                registry.default_handler().on_failure(operation_code, &error);
                DispatchOutcome::Failed
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
