//! gamenet client demo entry point.
//!
//! Connects to a game server, logs in, and runs the application tick loop,
//! logging whatever the server sends until Ctrl-C or disconnect.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ Cli::parse() + load config     -- file, then CLI/env overrides
//!  └─ NetworkService::new()          -- relay, registry, outbound clock
//!  └─ register handlers              -- Login (Request), forwarders (Event/Broadcast)
//!  └─ NetworkService::connect()      -- TCP connect, receive task starts
//!  └─ LoginHandler::login(uid)
//!  └─ tick loop at tick_rate_hz      -- relay drain + dispatch, bus drain
//! ```
//!
//! There is no reconnect: when the connection drops the loop ends and the
//! process exits.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use gamenet_core::{DispatchCategory, OperationCode, OwnerId};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use gamenet_client::application::handlers::{ForwardHandler, LoginHandler};
use gamenet_client::application::service::NetworkService;
use gamenet_client::application::{ClientEvent, ClientEventBus};
use gamenet_client::infrastructure::storage::config::{load_config, load_config_from};
use gamenet_client::infrastructure::storage::{ClientConfig, ConfigError, MemoryStore};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Headless gamenet client.
///
/// Values given on the command line (or through the matching environment
/// variables) override the configuration file.
#[derive(Debug, Parser)]
#[command(
    name = "gamenet-client",
    about = "Headless client for the gamenet game protocol",
    version
)]
struct Cli {
    /// Path to the TOML configuration file.  Defaults to the platform
    /// config directory.
    #[arg(long, env = "GAMENET_CONFIG")]
    config: Option<PathBuf>,

    /// Game server address as `host:port`.
    #[arg(long, env = "GAMENET_SERVER")]
    server: Option<String>,

    /// Player id sent in the login request.
    #[arg(long, env = "GAMENET_UID")]
    uid: Option<String>,

    /// Application ticks per second.
    #[arg(long, env = "GAMENET_TICK_RATE")]
    tick_rate: Option<u32>,
}

impl Cli {
    /// Loads the configuration file and applies the CLI overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    fn resolve_config(&self) -> anyhow::Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => load_config_from(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => match load_config() {
                Ok(config) => config,
                Err(ConfigError::NoPlatformConfigDir) => ClientConfig::default(),
                Err(e) => return Err(e).context("failed to load config"),
            },
        };

        if let Some(server) = &self.server {
            config.network.server_address = server.clone();
        }
        if let Some(uid) = &self.uid {
            config.client.player_uid = uid.clone();
        }
        if let Some(rate) = self.tick_rate {
            config.client.tick_rate_hz = rate;
        }
        Ok(config)
    }
}

/// Registers the handlers this client ships with.
fn register_handlers(service: &NetworkService, login: &Arc<LoginHandler>, bus: &Arc<ClientEventBus>) {
    let registry = service.registry();
    registry.register(DispatchCategory::Request, OperationCode::LOGIN, login.factory());

    for op in [
        OperationCode::AREA_OF_INTEREST,
        OperationCode::SYNC_POSITION,
        OperationCode::CHAT,
    ] {
        registry.register(DispatchCategory::Event, op, ForwardHandler::factory(Arc::clone(bus), None));
        registry.register(DispatchCategory::Broadcast, op, ForwardHandler::factory(Arc::clone(bus), None));
    }
}

/// Subscribes console logging for the events the demo cares about.
fn subscribe_console(bus: &ClientEventBus, console: OwnerId, running: &Arc<AtomicBool>) {
    bus.subscribe(
        ClientEvent::LoginCompleted,
        Arc::new(|args: &serde_json::Value| info!("login completed: {args}")),
        Some(console),
    );
    bus.subscribe(
        ClientEvent::LoginFailed,
        Arc::new(|args: &serde_json::Value| warn!("login failed: {args}")),
        Some(console),
    );
    bus.subscribe(
        ClientEvent::Operation(OperationCode::CHAT),
        Arc::new(|args: &serde_json::Value| info!("chat: {args}")),
        Some(console),
    );

    let running = Arc::clone(running);
    bus.subscribe(
        ClientEvent::Disconnected,
        Arc::new(move |_: &serde_json::Value| {
            warn!("disconnected from game server");
            running.store(false, Ordering::Relaxed);
        }),
        Some(console),
    );
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    // RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.client.log_level)),
        )
        .init();

    info!(
        "gamenet client starting: server={}, uid={}",
        config.network.server_address, config.client.player_uid
    );

    let bus = Arc::new(ClientEventBus::new());
    let store = Arc::new(MemoryStore::new());
    let service = NetworkService::new(config.network.clone(), Arc::clone(&bus));
    let login = LoginHandler::new(store, Arc::clone(&bus));
    register_handlers(&service, &login, &bus);

    let running = Arc::new(AtomicBool::new(true));
    let console = OwnerId::new();
    subscribe_console(&bus, console, &running);

    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    service
        .connect()
        .await
        .with_context(|| format!("could not connect to {}", config.network.server_address))?;

    // First lookup binds the login handler to its operation code.
    service
        .registry()
        .get_or_create(DispatchCategory::Request, OperationCode::LOGIN);
    login
        .login(&config.client.player_uid)
        .context("failed to send login request")?;

    // ── Tick loop ─────────────────────────────────────────────────────────────
    let period = Duration::from_secs_f64(1.0 / f64::from(config.client.tick_rate_hz.max(1)));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    while running.load(Ordering::Relaxed) {
        ticker.tick().await;
        let report = service.tick();
        if report.messages > 0 || report.events > 0 {
            debug!(
                "tick: {} messages ({} fallback, {} failed), {} events",
                report.messages, report.fallbacks, report.failures, report.events
            );
        }
    }

    bus.unsubscribe_by_target(console);
    service.close();
    info!("gamenet client stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
