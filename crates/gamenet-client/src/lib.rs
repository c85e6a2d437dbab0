//! gamenet-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does gamenet-client do? (for beginners)
//!
//! A game client talks to its server over one persistent TCP connection.
//! This crate is the client side of that conversation:
//!
//! 1. Opens the connection and keeps a receive task reading from it
//!    ([`infrastructure::network::TransportPeer`]).
//! 2. Writes outbound frames strictly one at a time, queueing the rest
//!    ([`infrastructure::network::SendQueue`]).
//! 3. Hands every decoded inbound message to the single-threaded game loop
//!    through a relay queue ([`gamenet_core::InboundRelay`]).
//! 4. Once per tick, routes each message to the handler registered for its
//!    operation code ([`application::dispatch::OperationRegistry`]).
//! 5. Lets handlers announce results on an event bus that UI and gameplay
//!    code subscribe to ([`gamenet_core::EventBus`]).
//!
//! [`application::service::NetworkService`] ties all of the above together.

/// Application layer: handlers, dispatch registry and the network service.
pub mod application;

/// Infrastructure layer: TCP transport, configuration, and key-value store.
pub mod infrastructure;
