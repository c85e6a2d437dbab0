//! # gamenet-core
//!
//! Shared, I/O-free building blocks of the gamenet client transport: the
//! message model, the JSON message codec, the length-prefixed frame codec,
//! the cross-thread inbound relay queue and the in-process event bus.
//!
//! This crate has no dependency on sockets or on an async runtime.  The
//! `gamenet-client` crate wires these pieces to a TCP connection.
//!
//! # Architecture overview (for beginners)
//!
//! A game client keeps one long-lived TCP connection to its server.  Bytes
//! arriving on that connection travel through the following pipeline:
//!
//! ```text
//! socket bytes ─▶ FrameCodec ─▶ decode_message ─▶ InboundRelay ─▶ (app tick) dispatch
//!   (I/O task)     whole frames    Message         thread hand-off
//! ```
//!
//! - **`protocol`** – What a [`Message`] looks like, how it is turned into
//!   JSON, and how JSON blobs are cut out of (and written into) a raw byte
//!   stream with a 4-byte little-endian length prefix.
//!
//! - **`relay`** – The hand-off buffer between the I/O side, which may run on
//!   any thread, and the single-threaded application loop.  It also drops
//!   duplicate or reordered deliveries by timestamp.
//!
//! - **`events`** – A publish/subscribe bus, independent of the network, used
//!   by handlers to tell UI and gameplay code that something happened.

pub mod events;
pub mod protocol;
pub mod relay;

// Re-export the most-used types at the crate root so callers can write
// `gamenet_core::Message` instead of `gamenet_core::protocol::message::Message`.
pub use events::{Callback, EventBus, OwnerId};
pub use protocol::codec::{decode_message, encode_message, ProtocolError};
pub use protocol::frame::{FrameCodec, FrameError};
pub use protocol::message::{
    CommandCode, DispatchCategory, Message, MessageBody, MessageHead, OperationCode,
};
pub use relay::{InboundRelay, PushOutcome};
