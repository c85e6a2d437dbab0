//! Network infrastructure for the client application.
//!
//! Owns the TCP connection to the game server and turns its byte stream into
//! whole frames (inbound) and serialized, ordered writes (outbound).
//!
//! Architecture:
//! - [`TransportPeer`] owns the socket.  A receive task reads from it,
//!   accumulates bytes, cuts frames with [`gamenet_core::FrameCodec`] and
//!   hands each frame to a [`PeerObserver`].
//! - [`SendQueue`] guarantees that at most one write is in flight; further
//!   frames wait in a FIFO and are written in call order.
//! - The peer never retries: once `Disconnected`, a new peer must be built.

use std::net::SocketAddr;

use gamenet_core::{FrameError, ProtocolError};
use thiserror::Error;

pub mod peer;
pub mod send_queue;

pub use peer::{PeerObserver, PeerState, TransportPeer};
pub use send_queue::{SendAction, SendQueue, WriteCompletion};

/// Errors that can occur in the client network layer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A send was attempted before the connection was established or after
    /// it was closed.  Nothing was queued.
    #[error("not connected")]
    NotConnected,

    /// TCP connection to the server failed.
    #[error("failed to connect to server at {addr}: {source}")]
    ConnectFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error occurred on the established connection.
    #[error("connection I/O error: {0}")]
    Connection(#[from] std::io::Error),

    /// A frame exceeded the configured maximum length.
    #[error("frame rejected: {0}")]
    FrameTooLarge(#[from] FrameError),

    /// A message could not be encoded or decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The bounded send queue is full; the frame was rejected, not dropped.
    #[error("send queue full ({capacity} frames already pending)")]
    SendQueueFull { capacity: usize },

    /// The operation is not valid in the peer's current state.
    #[error("operation not allowed while peer is {0:?}")]
    InvalidState(PeerState),

    /// The configured server address could not be parsed.
    #[error("invalid server address {0:?}")]
    InvalidAddress(String),

    /// The peer was used outside of a Tokio runtime.
    #[error("no Tokio runtime available to drive the connection")]
    NoRuntime,
}

/// Runtime settings of a [`TransportPeer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerConfig {
    /// Largest frame payload accepted or sent, in bytes.
    pub max_frame_length: usize,
    /// Size of the buffer handed to each socket `read()`.
    pub read_buffer_size: usize,
    /// Maximum number of frames waiting behind the in-flight write.
    /// `None` means unbounded.
    pub max_pending_writes: Option<usize>,
    /// Disable Nagle's algorithm on TCP sockets opened by `connect`.
    pub tcp_nodelay: bool,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            max_frame_length: gamenet_core::protocol::DEFAULT_MAX_FRAME_LENGTH,
            read_buffer_size: 8 * 1024,
            max_pending_writes: None,
            tcp_nodelay: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_config_default_is_unbounded_with_one_mebibyte_frames() {
        // Arrange / Act
        let cfg = PeerConfig::default();

        // Assert
        assert_eq!(cfg.max_frame_length, 1024 * 1024);
        assert_eq!(cfg.max_pending_writes, None);
        assert!(cfg.tcp_nodelay);
    }

    #[test]
    fn test_transport_error_messages_are_descriptive() {
        assert_eq!(TransportError::NotConnected.to_string(), "not connected");
        assert_eq!(
            TransportError::SendQueueFull { capacity: 4 }.to_string(),
            "send queue full (4 frames already pending)"
        );
        let too_large = TransportError::from(FrameError::TooLarge { length: 9, max: 8 });
        assert!(too_large.to_string().contains("exceeds the maximum of 8 bytes"));
    }
}
