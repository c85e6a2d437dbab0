//! Handlers shipped with the client.
//!
//! - [`LoginHandler`] sends the login request and, when the response arrives,
//!   remembers the assigned entity id and announces the result on the bus.
//! - [`ForwardHandler`] republishes any JSON event or broadcast payload on the
//!   bus under a fixed [`ClientEvent`], for UI or gameplay code to consume.
//!
//! Both announce results with `publish_deferred`, so subscribers run during
//! the bus drain that follows the relay drain in the same tick.

use std::fmt;
use std::sync::{Arc, OnceLock};

use gamenet_core::protocol::{decode_payload, encode_payload};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use super::dispatch::{HandlerBinding, HandlerFactory, OperationHandler};
use super::{ClientEvent, ClientEventBus, HandlerError};
use crate::infrastructure::storage::KeyValueStore;

/// Store key under which the login handler saves the assigned entity id.
pub const ENTITY_ID_KEY: &str = "session.entity_id";

// ── Login ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    uid: &'a str,
}

/// Entity ids arrive as numbers from some servers and as strings from others.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum EntityId {
    Number(u64),
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Number(n) => write!(f, "{n}"),
            EntityId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    #[serde(default)]
    entity_id: Option<EntityId>,
    #[serde(default)]
    error: Option<String>,
}

/// Request handler for [`gamenet_core::OperationCode::LOGIN`].
///
/// Created by the application (so it can call [`LoginHandler::login`]) and
/// handed to the registry through [`LoginHandler::factory`]; the registry
/// binds it to its operation code on first lookup.
pub struct LoginHandler {
    binding: OnceLock<HandlerBinding>,
    store: Arc<dyn KeyValueStore>,
    bus: Arc<ClientEventBus>,
}

impl LoginHandler {
    pub fn new(store: Arc<dyn KeyValueStore>, bus: Arc<ClientEventBus>) -> Arc<Self> {
        Arc::new(Self {
            binding: OnceLock::new(),
            store,
            bus,
        })
    }

    /// Returns a factory that binds and hands out this instance.
    pub fn factory(self: &Arc<Self>) -> HandlerFactory {
        let handler = Arc::clone(self);
        Arc::new(move |binding: HandlerBinding| {
            if handler.binding.set(binding).is_err() {
                debug!("login handler already bound; keeping the first binding");
            }
            Arc::clone(&handler) as Arc<dyn OperationHandler>
        })
    }

    /// Returns `true` once the registry has bound the handler.
    pub fn is_bound(&self) -> bool {
        self.binding.get().is_some()
    }

    /// Sends the login request for player `uid`.
    ///
    /// # Errors
    ///
    /// - [`HandlerError::NotBound`] before the registry created the handler.
    /// - [`HandlerError::Transport`] if the request could not be queued.
    pub fn login(&self, uid: &str) -> Result<(), HandlerError> {
        let binding = self.binding.get().ok_or(HandlerError::NotBound)?;
        let payload = encode_payload(&LoginRequest { uid })?;
        binding.send_request(payload)?;
        info!("login requested for {uid}");
        Ok(())
    }
}

impl OperationHandler for LoginHandler {
    fn on_receive(&self, payload: &str) -> Result<(), HandlerError> {
        let response: LoginResponse = decode_payload(payload)?;

        if let Some(reason) = response.error {
            self.bus
                .publish_deferred(ClientEvent::LoginFailed, json!({ "reason": reason }));
            return Err(HandlerError::Rejected(reason));
        }

        let Some(entity_id) = response.entity_id else {
            return Err(HandlerError::Rejected(
                "login response carried neither entityId nor error".to_string(),
            ));
        };

        let entity_id = entity_id.to_string();
        if !self.store.set(ENTITY_ID_KEY, &entity_id) {
            warn!("could not persist entity id {entity_id}");
        }
        info!("logged in as entity {entity_id}");
        self.bus
            .publish_deferred(ClientEvent::LoginCompleted, json!({ "entityId": entity_id }));
        Ok(())
    }
}

// ── Forwarding ────────────────────────────────────────────────────────────────

/// Republishes each JSON payload it receives under a fixed event id.
pub struct ForwardHandler {
    event: ClientEvent,
    bus: Arc<ClientEventBus>,
}

impl ForwardHandler {
    pub fn new(event: ClientEvent, bus: Arc<ClientEventBus>) -> Self {
        Self { event, bus }
    }

    /// Factory that creates one forwarder per registry key.  When `event` is
    /// `None` the forwarder publishes under `ClientEvent::Operation(code)`
    /// for its bound code.
    pub fn factory(bus: Arc<ClientEventBus>, event: Option<ClientEvent>) -> HandlerFactory {
        Arc::new(move |binding: HandlerBinding| {
            let event = event
                .clone()
                .unwrap_or(ClientEvent::Operation(binding.operation_code()));
            Arc::new(ForwardHandler::new(event, Arc::clone(&bus))) as Arc<dyn OperationHandler>
        })
    }
}

impl OperationHandler for ForwardHandler {
    fn on_receive(&self, payload: &str) -> Result<(), HandlerError> {
        let value: serde_json::Value = decode_payload(payload)?;
        self.bus.publish_deferred(self.event.clone(), value);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
