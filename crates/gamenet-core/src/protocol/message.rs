//! The message model exchanged with the game server.
//!
//! Every unit on the wire is one [`Message`]: a head that says *what* the
//! message is about ([`OperationCode`]) and *how* it must be routed
//! ([`CommandCode`]), an opaque string body, and a sender timestamp used for
//! duplicate suppression.
//!
//! The JSON shape is fixed by the server:
//!
//! ```json
//! {
//!   "head": { "operationCode": 10001, "commandCode": "Request" },
//!   "body": { "payload": "{\"uid\":\"x\"}" },
//!   "timestamp": 1700000000000000
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Operation codes ───────────────────────────────────────────────────────────

/// Identifies the logical network operation a message belongs to.
///
/// This is an *open* enumeration: the server may send codes this client was
/// built without.  A newtype over `u32` (rather than a Rust `enum`) lets such
/// codes deserialize successfully so they can be routed to the Default
/// handler instead of failing at the JSON layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationCode(pub u32);

impl OperationCode {
    /// Key of the fallback handler registered in every dispatch category.
    pub const DEFAULT: OperationCode = OperationCode(0);
    /// Account login; the response carries the player's entity id.
    pub const LOGIN: OperationCode = OperationCode(10001);
    /// Area-of-interest update (entities entering/leaving view).
    pub const AREA_OF_INTEREST: OperationCode = OperationCode(10002);
    /// Authoritative position synchronisation.
    pub const SYNC_POSITION: OperationCode = OperationCode(10003);
    /// Chat line.
    pub const CHAT: OperationCode = OperationCode(10004);
    /// Session logout.
    pub const LOGOUT: OperationCode = OperationCode(10005);

    /// Returns a human-readable label for known codes, used in log output.
    pub fn name(self) -> Option<&'static str> {
        match self {
            Self::DEFAULT => Some("Default"),
            Self::LOGIN => Some("Login"),
            Self::AREA_OF_INTEREST => Some("AreaOfInterest"),
            Self::SYNC_POSITION => Some("SyncPosition"),
            Self::CHAT => Some("Chat"),
            Self::LOGOUT => Some("Logout"),
            _ => None,
        }
    }
}

impl fmt::Display for OperationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}({})", self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

impl From<u32> for OperationCode {
    fn from(value: u32) -> Self {
        OperationCode(value)
    }
}

// ── Command codes ─────────────────────────────────────────────────────────────

/// The kind of message, which determines its dispatch category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandCode {
    /// Client → server call that expects a `Response`.
    Request,
    /// Server → client answer to a `Request`.
    Response,
    /// Server → client notification addressed to this client only.
    Event,
    /// Server → client notification fanned out to many clients.
    Broadcast,
}

impl CommandCode {
    /// Returns the handler registry that messages of this kind are routed to.
    ///
    /// A `Response` belongs to the handler that issued the matching
    /// `Request`, so it routes to the Request registry.
    pub fn category(self) -> DispatchCategory {
        match self {
            CommandCode::Request | CommandCode::Response => DispatchCategory::Request,
            CommandCode::Event => DispatchCategory::Event,
            CommandCode::Broadcast => DispatchCategory::Broadcast,
        }
    }
}

/// One of the three independent handler registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DispatchCategory {
    Request,
    Event,
    Broadcast,
}

impl DispatchCategory {
    /// All categories, in registry order.
    pub const ALL: [DispatchCategory; 3] = [
        DispatchCategory::Request,
        DispatchCategory::Event,
        DispatchCategory::Broadcast,
    ];
}

impl fmt::Display for DispatchCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DispatchCategory::Request => "request",
            DispatchCategory::Event => "event",
            DispatchCategory::Broadcast => "broadcast",
        };
        f.write_str(label)
    }
}

// ── Message ───────────────────────────────────────────────────────────────────

/// Routing header of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageHead {
    pub operation_code: OperationCode,
    pub command_code: CommandCode,
}

/// Opaque, protocol-defined body of a [`Message`] (commonly JSON text).
///
/// The transport never looks inside `payload`; only handlers interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub payload: String,
}

/// The sole unit exchanged across the wire and across threads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub head: MessageHead,
    pub body: MessageBody,
    /// Sender timestamp; the inbound relay drops messages whose timestamp is
    /// not strictly greater than the last accepted one.
    pub timestamp: u64,
}

impl Message {
    /// Builds a message from its parts.
    pub fn new(
        operation_code: OperationCode,
        command_code: CommandCode,
        payload: impl Into<String>,
        timestamp: u64,
    ) -> Self {
        Self {
            head: MessageHead {
                operation_code,
                command_code,
            },
            body: MessageBody {
                payload: payload.into(),
            },
            timestamp,
        }
    }

    /// Builds a `Request` message.
    pub fn request(op: OperationCode, payload: impl Into<String>, timestamp: u64) -> Self {
        Self::new(op, CommandCode::Request, payload, timestamp)
    }

    /// Builds a `Response` message.
    pub fn response(op: OperationCode, payload: impl Into<String>, timestamp: u64) -> Self {
        Self::new(op, CommandCode::Response, payload, timestamp)
    }

    /// Builds an `Event` message.
    pub fn event(op: OperationCode, payload: impl Into<String>, timestamp: u64) -> Self {
        Self::new(op, CommandCode::Event, payload, timestamp)
    }

    /// Builds a `Broadcast` message.
    pub fn broadcast(op: OperationCode, payload: impl Into<String>, timestamp: u64) -> Self {
        Self::new(op, CommandCode::Broadcast, payload, timestamp)
    }

    /// Shorthand for `self.head.operation_code`.
    pub fn operation_code(&self) -> OperationCode {
        self.head.operation_code
    }

    /// Shorthand for the dispatch category implied by the command code.
    pub fn category(&self) -> DispatchCategory {
        self.head.command_code.category()
    }

    /// Shorthand for `&self.body.payload`.
    pub fn payload(&self) -> &str {
        &self.body.payload
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_routes_to_request_category() {
        assert_eq!(CommandCode::Response.category(), DispatchCategory::Request);
        assert_eq!(CommandCode::Request.category(), DispatchCategory::Request);
    }

    #[test]
    fn test_event_and_broadcast_route_to_own_categories() {
        assert_eq!(CommandCode::Event.category(), DispatchCategory::Event);
        assert_eq!(CommandCode::Broadcast.category(), DispatchCategory::Broadcast);
    }

    #[test]
    fn test_operation_code_display_includes_name_for_known_codes() {
        assert_eq!(OperationCode::LOGIN.to_string(), "Login(10001)");
        assert_eq!(OperationCode(424242).to_string(), "424242");
    }

    #[test]
    fn test_operation_code_name_is_none_for_unknown_code() {
        assert_eq!(OperationCode(7).name(), None);
    }

    #[test]
    fn test_message_accessors_return_head_and_body_fields() {
        // Arrange
        let msg = Message::event(OperationCode::CHAT, "hello", 12);

        // Assert
        assert_eq!(msg.operation_code(), OperationCode::CHAT);
        assert_eq!(msg.category(), DispatchCategory::Event);
        assert_eq!(msg.payload(), "hello");
        assert_eq!(msg.timestamp, 12);
    }

    #[test]
    fn test_dispatch_category_all_lists_each_category_once() {
        assert_eq!(DispatchCategory::ALL.len(), 3);
        assert!(DispatchCategory::ALL.contains(&DispatchCategory::Request));
        assert!(DispatchCategory::ALL.contains(&DispatchCategory::Event));
        assert!(DispatchCategory::ALL.contains(&DispatchCategory::Broadcast));
    }
}
