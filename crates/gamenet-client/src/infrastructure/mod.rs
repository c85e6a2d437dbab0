//! Infrastructure layer for the client application.
//!
//! Contains the adapters that touch the outside world: the TCP transport and
//! on-disk / in-memory storage.
//!
//! # Sub-modules
//!
//! - **`network`** – The transport peer: owns the socket, runs the receive
//!   loop, splits the byte stream into frames, and serializes writes through
//!   the backpressure send queue.
//!
//! - **`storage`** – TOML configuration persistence and the key-value store
//!   used by handlers to remember session data.

pub mod network;
pub mod storage;
