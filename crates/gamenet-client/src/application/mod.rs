//! Application layer for the client: what happens to a message once it has
//! been taken off the wire.
//!
//! # Sub-modules
//!
//! - **`dispatch`** – The operation dispatch registry.  Routes each inbound
//!   [`gamenet_core::Message`] to the handler registered for its operation
//!   code, creating handlers lazily and falling back to a per-category
//!   Default handler for codes nobody registered.
//!
//! - **`handlers`** – Concrete handlers shipped with the client: login and
//!   a generic forwarder that republishes server events on the event bus.
//!
//! - **`service`** – [`service::NetworkService`], which owns the transport
//!   peer, the inbound relay and the registry, and drives them once per tick.

use gamenet_core::{EventBus, OperationCode, ProtocolError};
use thiserror::Error;

use crate::infrastructure::network::TransportError;

pub mod dispatch;
pub mod handlers;
pub mod service;

/// Errors raised by operation handlers.
///
/// None of these close the connection: the dispatch registry reports them to
/// the category's Default handler and continues with the next message.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The payload did not match the shape the handler expects.
    #[error("malformed payload: {0}")]
    Deserialization(#[from] ProtocolError),

    /// An outbound request could not be sent.
    #[error("send failed: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with an error, or the answer was unusable.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The handler was used before the registry bound it to an operation code.
    #[error("handler is not bound to an operation code yet")]
    NotBound,
}

/// Event ids published on the client's event bus.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientEvent {
    /// The transport connected to the server.
    Connected,
    /// The transport lost or closed its connection.
    Disconnected,
    /// Login succeeded; the argument carries `{"entityId": ...}`.
    LoginCompleted,
    /// Login was refused; the argument carries `{"reason": ...}`.
    LoginFailed,
    /// A server event or broadcast forwarded as-is, keyed by operation.
    Operation(OperationCode),
}

/// The event bus type shared by handlers, the service and UI code.
pub type ClientEventBus = EventBus<ClientEvent, serde_json::Value>;
