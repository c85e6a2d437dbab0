//! The network service: one object that owns the connection and everything
//! downstream of it.
//!
//! # Threads and ticks (for beginners)
//!
//! Two execution contexts touch the service:
//!
//! - The **I/O side** (Tokio tasks) reads the socket.  For every frame it
//!   decodes a [`Message`] and pushes it into the [`InboundRelay`].  That is
//!   all it does: no handler ever runs on an I/O task.
//! - The **application loop** calls [`NetworkService::tick`] once per frame
//!   of the game.  A tick drains the relay, dispatching each message to its
//!   handler, and then drains the event bus so subscribers see whatever the
//!   handlers published.
//!
//! ```text
//!  I/O task                        application loop (tick)
//!  ────────                        ───────────────────────
//!  frame ─▶ decode ─▶ relay.push   relay.drain_once ─▶ registry.dispatch ─▶ handler
//!                                  bus.drain_once   ─▶ subscribers
//! ```
//!
//! Sending goes the other way: `send` stamps the message with the outbound
//! clock, encodes it and hands it to the current peer's send queue without
//! waiting for the write.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gamenet_core::protocol::MessageClock;
use gamenet_core::{
    decode_message, encode_message, CommandCode, InboundRelay, Message, OperationCode,
};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use super::dispatch::{DispatchOutcome, OperationRegistry, OutboundSink};
use super::{ClientEvent, ClientEventBus};
use crate::infrastructure::network::{PeerObserver, TransportError, TransportPeer};
use crate::infrastructure::storage::NetworkConfig;

/// What one [`NetworkService::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Messages taken from the relay and dispatched.
    pub messages: usize,
    /// Of those, how many fell through to a Default handler.
    pub fallbacks: usize,
    /// Of those, how many handlers reported an error.
    pub failures: usize,
    /// Deferred bus events delivered.
    pub events: usize,
}

// ── Outbound link ─────────────────────────────────────────────────────────────

/// The current peer plus the clock used to stamp outgoing messages.  Shared
/// with every handler binding as their [`OutboundSink`].
#[derive(Default)]
struct ServiceLink {
    peer: Mutex<Option<Arc<TransportPeer>>>,
    clock: MessageClock,
}

impl ServiceLink {
    fn current_peer(&self) -> Option<Arc<TransportPeer>> {
        self.peer.lock().clone()
    }
}

impl OutboundSink for ServiceLink {
    fn send(
        &self,
        operation_code: OperationCode,
        command_code: CommandCode,
        payload: String,
    ) -> Result<(), TransportError> {
        let peer = self.current_peer().ok_or(TransportError::NotConnected)?;
        let message = Message::new(operation_code, command_code, payload, self.clock.next());
        let bytes = encode_message(&message)?;
        peer.send_frame(&bytes)?;
        debug!("sent {command_code:?} {operation_code} ({} bytes)", bytes.len());
        Ok(())
    }
}

// ── Inbound observer ──────────────────────────────────────────────────────────

/// Peer observer that decodes frames into the relay and reports connection
/// changes on the bus.
///
/// Once retired, frames from its peer no longer reach the relay, which by
/// then belongs to the next connection.
struct RelayObserver {
    relay: Arc<InboundRelay>,
    bus: Arc<ClientEventBus>,
    retired: AtomicBool,
}

impl RelayObserver {
    fn new(relay: Arc<InboundRelay>, bus: Arc<ClientEventBus>) -> Self {
        Self {
            relay,
            bus,
            retired: AtomicBool::new(false),
        }
    }

    fn retire(&self) {
        self.retired.store(true, Ordering::SeqCst);
    }
}

impl PeerObserver for RelayObserver {
    fn on_connected(&self) {
        self.bus.publish_deferred(ClientEvent::Connected, Value::Null);
    }

    fn on_frame_received(&self, payload: Vec<u8>) {
        if self.retired.load(Ordering::SeqCst) {
            debug!("dropping frame from a replaced connection");
            return;
        }
        match decode_message(&payload) {
            Ok(message) => {
                self.relay.push(message);
            }
            Err(e) => warn!("dropping undecodable frame ({} bytes): {e}", payload.len()),
        }
    }

    fn on_disconnected(&self) {
        self.bus.publish_deferred(ClientEvent::Disconnected, Value::Null);
    }
}

// ── Service ───────────────────────────────────────────────────────────────────

/// Owns the transport peer, the inbound relay and the dispatch registry.
pub struct NetworkService {
    config: NetworkConfig,
    relay: Arc<InboundRelay>,
    registry: OperationRegistry,
    bus: Arc<ClientEventBus>,
    link: Arc<ServiceLink>,
    observer: Mutex<Option<Arc<RelayObserver>>>,
}

impl NetworkService {
    /// Creates a disconnected service.  Handlers created by the registry
    /// send through this service's current connection.
    pub fn new(config: NetworkConfig, bus: Arc<ClientEventBus>) -> Self {
        let link = Arc::new(ServiceLink::default());
        let outbound: Arc<dyn OutboundSink> = link.clone();
        Self {
            config,
            relay: Arc::new(InboundRelay::new()),
            registry: OperationRegistry::new(outbound),
            bus,
            link,
            observer: Mutex::new(None),
        }
    }

    /// Connects to the configured `server_address`.
    ///
    /// Any previous connection is closed first and the relay's duplicate
    /// high-water mark is reset.
    ///
    /// # Errors
    ///
    /// - [`TransportError::InvalidAddress`] if the address does not resolve.
    /// - [`TransportError::ConnectFailed`] if the TCP connect fails.
    pub async fn connect(&self) -> Result<(), TransportError> {
        let address = self.config.server_address.as_str();
        let addr = tokio::net::lookup_host(address)
            .await
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| TransportError::InvalidAddress(address.to_string()))?;

        let peer = self.replace_peer();
        peer.connect(addr).await
    }

    /// Uses an already-open stream as the connection.  Same replacement
    /// rules as [`NetworkService::connect`].
    ///
    /// # Errors
    ///
    /// See [`TransportPeer::attach`].
    pub fn attach<S>(&self, stream: S) -> Result<(), TransportError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        self.replace_peer().attach(stream)
    }

    /// Stamps and sends one message.
    ///
    /// # Errors
    ///
    /// [`TransportError::NotConnected`] without a live connection, or any
    /// error from [`TransportPeer::send_frame`].
    pub fn send(
        &self,
        operation_code: OperationCode,
        command_code: CommandCode,
        payload: impl Into<String>,
    ) -> Result<(), TransportError> {
        self.link.send(operation_code, command_code, payload.into())
    }

    /// Shorthand for `send(op, CommandCode::Request, payload)`.
    ///
    /// # Errors
    ///
    /// See [`NetworkService::send`].
    pub fn send_request(
        &self,
        operation_code: OperationCode,
        payload: impl Into<String>,
    ) -> Result<(), TransportError> {
        self.send(operation_code, CommandCode::Request, payload)
    }

    /// Runs one application tick: drain the relay with dispatch, then drain
    /// the event bus.
    pub fn tick(&self) -> TickReport {
        let mut fallbacks = 0;
        let mut failures = 0;
        let messages = self.relay.drain_once(|message| {
            match self.registry.dispatch(&message) {
                DispatchOutcome::Handled => {}
                DispatchOutcome::Fallback => fallbacks += 1,
                DispatchOutcome::Failed => failures += 1,
            }
        });
        let events = self.bus.drain_once();

        TickReport {
            messages,
            fallbacks,
            failures,
            events,
        }
    }

    /// Closes the current connection, if any.
    pub fn close(&self) {
        let peer = self.link.peer.lock().take();
        if let Some(peer) = peer {
            peer.close();
        }
    }

    /// Returns `true` while the current peer is connected.
    pub fn is_connected(&self) -> bool {
        self.link
            .current_peer()
            .map(|peer| peer.is_connected())
            .unwrap_or(false)
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub fn bus(&self) -> &Arc<ClientEventBus> {
        &self.bus
    }

    pub fn relay(&self) -> &Arc<InboundRelay> {
        &self.relay
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Installs a fresh peer, closing the old one and resetting the relay.
    fn replace_peer(&self) -> Arc<TransportPeer> {
        let observer = Arc::new(RelayObserver::new(
            Arc::clone(&self.relay),
            Arc::clone(&self.bus),
        ));
        let peer = TransportPeer::new(self.config.peer_config(), observer.clone());

        // The old observer is retired before the reset so none of its frames
        // can seed the new connection's high-water mark.
        if let Some(previous) = self.observer.lock().replace(observer) {
            previous.retire();
        }
        let previous = self.link.peer.lock().replace(Arc::clone(&peer));
        if let Some(previous) = previous {
            previous.close();
        }
        self.relay.reset();
        peer
    }
}

impl Drop for NetworkService {
    fn drop(&mut self) {
        self.close();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
