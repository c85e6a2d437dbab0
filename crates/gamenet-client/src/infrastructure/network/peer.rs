//! The transport peer: one TCP connection, its receive task and its writer.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──connect()/attach()──▶ Connecting ──success──▶ Connected ──close()/error/EOF──▶ Disconnected
//!                                  └──────failure──────────────────────────────────────▶ Disconnected
//! ```
//!
//! `Disconnected` is terminal.  Reconnecting means building a new peer.
//!
//! # Threading
//!
//! The receive task and write tasks run on the Tokio runtime; `send_frame`
//! and `close` may be called from any thread.  All mutable state lives behind
//! one [`parking_lot::Mutex`], which is never held across an `.await` nor
//! while calling the [`PeerObserver`].

use std::net::SocketAddr;
use std::sync::Arc;

use gamenet_core::{FrameCodec, FrameError};
use parking_lot::Mutex;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    runtime::Handle,
    sync::Mutex as AsyncMutex,
    task::JoinHandle,
};
use tracing::{debug, error, info, trace, warn};

use super::{PeerConfig, SendAction, SendQueue, TransportError, WriteCompletion};

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Connection state of a [`TransportPeer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    Idle,
    Connecting,
    Connected,
    Disconnected,
}

/// Receives connection notifications and complete inbound frames.
///
/// Implementations are called from the I/O task, never while the peer's
/// internal lock is held, and must not block.
#[cfg_attr(test, mockall::automock)]
pub trait PeerObserver: Send + Sync {
    /// The connection is established.  Called once per peer.
    fn on_connected(&self);

    /// A complete frame payload arrived.  Frames are delivered in wire order.
    fn on_frame_received(&self, payload: Vec<u8>);

    /// A previously connected peer was closed.  Called at most once.
    fn on_disconnected(&self);
}

struct PeerInner {
    state: PeerState,
    accumulator: Vec<u8>,
    send_queue: SendQueue,
    writer: Option<Arc<AsyncMutex<BoxedWriter>>>,
    receive_task: Option<JoinHandle<()>>,
    write_task: Option<JoinHandle<()>>,
    runtime: Option<Handle>,
}

/// Owns one client connection to the game server.
///
/// Always used through an `Arc` because the receive and write tasks keep the
/// peer alive while they run.
pub struct TransportPeer {
    config: PeerConfig,
    codec: FrameCodec,
    observer: Arc<dyn PeerObserver>,
    inner: Mutex<PeerInner>,
}

impl TransportPeer {
    /// Creates an `Idle` peer.
    pub fn new(config: PeerConfig, observer: Arc<dyn PeerObserver>) -> Arc<Self> {
        let codec = FrameCodec::new(config.max_frame_length);
        let send_queue = SendQueue::new(config.max_pending_writes);
        Arc::new(Self {
            config,
            codec,
            observer,
            inner: Mutex::new(PeerInner {
                state: PeerState::Idle,
                accumulator: Vec::new(),
                send_queue,
                writer: None,
                receive_task: None,
                write_task: None,
                runtime: None,
            }),
        })
    }

    /// Current connection state.
    pub fn state(&self) -> PeerState {
        self.inner.lock().state
    }

    /// Returns `true` while the peer is `Connected`.
    pub fn is_connected(&self) -> bool {
        self.state() == PeerState::Connected
    }

    /// Number of frames waiting behind the in-flight write.
    pub fn pending_writes(&self) -> usize {
        self.inner.lock().send_queue.pending_len()
    }

    /// Bytes received but not yet forming a complete frame.
    pub fn buffered_bytes(&self) -> usize {
        self.inner.lock().accumulator.len()
    }

    /// Opens a TCP connection to `addr` and starts receiving.
    ///
    /// # Errors
    ///
    /// - [`TransportError::InvalidState`] if the peer is not `Idle`.
    /// - [`TransportError::ConnectFailed`] if the TCP connect fails; the peer
    ///   is then `Disconnected` and no observer callback is made.
    pub async fn connect(self: &Arc<Self>, addr: SocketAddr) -> Result<(), TransportError> {
        self.begin_connecting()?;
        info!("connecting to game server at {addr}");

        let stream = match TcpStream::connect(addr).await {
            Ok(stream) => stream,
            Err(source) => {
                self.inner.lock().state = PeerState::Disconnected;
                warn!("could not connect to game server at {addr}: {source}");
                return Err(TransportError::ConnectFailed { addr, source });
            }
        };

        if self.config.tcp_nodelay {
            if let Err(e) = stream.set_nodelay(true) {
                debug!("failed to set TCP_NODELAY: {e}");
            }
        }

        self.establish(stream)?;
        info!("connected to game server at {addr}");
        Ok(())
    }

    /// Takes over an already-open byte stream and starts receiving.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`TransportError::InvalidState`] if the peer is not `Idle`.
    /// - [`TransportError::NoRuntime`] if no Tokio runtime is active.
    pub fn attach<S>(self: &Arc<Self>, stream: S) -> Result<(), TransportError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        self.begin_connecting()?;
        self.establish(stream)
    }

    /// Frames `payload` and sends it.
    ///
    /// Never blocks: if a write is already in flight the frame is queued and
    /// written after the earlier ones, in call order.
    ///
    /// # Errors
    ///
    /// - [`TransportError::FrameTooLarge`] if the payload exceeds the maximum
    ///   frame length.  The connection stays open.
    /// - [`TransportError::NotConnected`] unless the peer is `Connected`.
    /// - [`TransportError::SendQueueFull`] if the bounded queue is full.
    pub fn send_frame(self: &Arc<Self>, payload: &[u8]) -> Result<(), TransportError> {
        let frame = self.codec.encode(payload)?;

        let mut inner = self.inner.lock();
        if inner.state != PeerState::Connected {
            return Err(TransportError::NotConnected);
        }

        match inner.send_queue.enqueue(frame)? {
            SendAction::Issue(frame) => match (inner.writer.clone(), inner.runtime.clone()) {
                (Some(writer), Some(runtime)) => {
                    // The previous chain, if any, has already reported Idle.
                    let task = runtime.spawn(Arc::clone(self).write_chain(writer, frame));
                    inner.write_task = Some(task);
                }
                _ => {
                    inner.send_queue.clear();
                    return Err(TransportError::NotConnected);
                }
            },
            SendAction::Queued { depth } => {
                trace!("frame queued behind in-flight write ({depth} waiting)");
            }
        }
        Ok(())
    }

    /// Closes the connection.  Idempotent.
    ///
    /// Stops the receive task and any in-flight write, which releases the
    /// socket.  Discards buffered inbound bytes and queued outbound frames,
    /// and notifies the observer if the peer had been `Connected`.
    pub fn close(&self) {
        let (was_connected, receive_task, write_task) = {
            let mut inner = self.inner.lock();
            if inner.state == PeerState::Disconnected {
                return;
            }
            let was_connected = inner.state == PeerState::Connected;
            inner.state = PeerState::Disconnected;
            inner.accumulator.clear();
            inner.send_queue.clear();
            inner.writer = None;
            (
                was_connected,
                inner.receive_task.take(),
                inner.write_task.take(),
            )
        };

        for task in [receive_task, write_task].into_iter().flatten() {
            task.abort();
        }

        if was_connected {
            info!("connection closed");
            self.observer.on_disconnected();
        }
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    fn begin_connecting(&self) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        if inner.state != PeerState::Idle {
            return Err(TransportError::InvalidState(inner.state));
        }
        inner.state = PeerState::Connecting;
        Ok(())
    }

    fn establish<S>(self: &Arc<Self>, stream: S) -> Result<(), TransportError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let Ok(runtime) = Handle::try_current() else {
            self.inner.lock().state = PeerState::Disconnected;
            return Err(TransportError::NoRuntime);
        };

        let (reader, writer) = tokio::io::split(stream);
        {
            let mut inner = self.inner.lock();
            // close() may have run while the TCP connect was pending.
            if inner.state != PeerState::Connecting {
                return Err(TransportError::InvalidState(inner.state));
            }
            inner.state = PeerState::Connected;
            inner.writer = Some(Arc::new(AsyncMutex::new(Box::new(writer))));
            inner.runtime = Some(runtime.clone());
        }

        self.observer.on_connected();

        let task = runtime.spawn(Arc::clone(self).receive_loop(reader));
        let mut inner = self.inner.lock();
        if inner.state == PeerState::Connected {
            inner.receive_task = Some(task);
        } else {
            task.abort();
        }
        Ok(())
    }

    async fn receive_loop<R>(self: Arc<Self>, mut reader: R)
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = vec![0u8; self.config.read_buffer_size.max(1)];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => {
                    debug!("server closed the connection");
                    break;
                }
                Ok(n) => {
                    if !self.on_bytes_received(&buf[..n]) {
                        break;
                    }
                }
                Err(e) => {
                    warn!("receive failed: {e}");
                    break;
                }
            }
        }
        self.close();
    }

    /// Appends `bytes` to the accumulator and delivers every complete frame.
    /// Delivery stops as soon as the peer is closed.  Returns `false` when
    /// the connection must stop reading.
    fn on_bytes_received(&self, bytes: &[u8]) -> bool {
        let mut fatal: Option<FrameError> = None;
        let frames = {
            let mut inner = self.inner.lock();
            if inner.state != PeerState::Connected {
                return false;
            }
            inner.accumulator.extend_from_slice(bytes);

            let mut frames = Vec::new();
            loop {
                match self.codec.try_decode_one(&mut inner.accumulator) {
                    Ok(Some(frame)) => frames.push(frame),
                    Ok(None) => break,
                    Err(e) => {
                        fatal = Some(e);
                        break;
                    }
                }
            }
            frames
        };

        for frame in frames {
            if !self.is_connected() {
                return false;
            }
            self.observer.on_frame_received(frame);
        }

        match fatal {
            Some(e) => {
                error!("closing connection: {e}");
                false
            }
            None => true,
        }
    }

    /// Writes `first`, then keeps writing whatever the send queue releases
    /// until it reports `Idle` or a write fails.
    async fn write_chain(self: Arc<Self>, writer: Arc<AsyncMutex<BoxedWriter>>, first: Vec<u8>) {
        let mut writer = writer.lock().await;
        let mut frame = first;
        loop {
            if !self.is_connected() {
                return;
            }
            let result = match writer.write_all(&frame).await {
                Ok(()) => writer.flush().await,
                Err(e) => Err(e),
            };
            if let Err(e) = &result {
                warn!("write failed: {e}");
            }

            let completion = {
                let mut inner = self.inner.lock();
                if inner.state != PeerState::Connected {
                    return;
                }
                inner.send_queue.complete(result.is_ok())
            };

            match completion {
                WriteCompletion::Next(next) => frame = next,
                WriteCompletion::Idle => return,
                WriteCompletion::Failed => {
                    drop(writer);
                    self.close();
                    return;
                }
            }
        }
    }
}

impl std::fmt::Debug for TransportPeer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("TransportPeer")
            .field("state", &inner.state)
            .field("buffered_bytes", &inner.accumulator.len())
            .field("pending_writes", &inner.send_queue.pending_len())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
