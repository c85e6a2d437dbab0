//! TOML-based configuration persistence for the game client.
//!
//! Reads and writes [`ClientConfig`] to an explicit path, or to the
//! platform-appropriate default location:
//! - Windows:  `%APPDATA%\GameNet\client.toml`
//! - Linux:    `~/.config/gamenet/client.toml`
//! - macOS:    `~/Library/Application Support/GameNet/client.toml`
//!
//! Example file:
//!
//! ```toml
//! [client]
//! log_level = "debug"
//! tick_rate_hz = 60
//! player_uid = "alice"
//!
//! [network]
//! server_address = "10.0.0.5:9000"
//! max_pending_writes = 256
//! ```
//!
//! Every field has a serde default, so a partial file (or no file at all on
//! first run) still yields a usable configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::network::PeerConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level client configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    #[serde(default)]
    pub client: GeneralConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

/// General client behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// How many times per second the application loop drains the relay.
    #[serde(default = "default_tick_rate_hz")]
    pub tick_rate_hz: u32,
    /// Player identifier sent in the login request.
    #[serde(default = "default_player_uid")]
    pub player_uid: String,
}

/// Connection and framing settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// `host:port` of the game server.
    #[serde(default = "default_server_address")]
    pub server_address: String,
    /// Largest accepted frame payload in bytes.
    #[serde(default = "default_max_frame_length")]
    pub max_frame_length: usize,
    /// Size of each socket read in bytes.
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
    /// Bound on frames waiting behind the in-flight write.  Absent means
    /// unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pending_writes: Option<usize>,
    /// Disable Nagle's algorithm on the client socket.
    #[serde(default = "default_true")]
    pub tcp_nodelay: bool,
}

impl NetworkConfig {
    /// Builds the runtime settings for a transport peer.
    pub fn peer_config(&self) -> PeerConfig {
        PeerConfig {
            max_frame_length: self.max_frame_length,
            read_buffer_size: self.read_buffer_size,
            max_pending_writes: self.max_pending_writes,
            tcp_nodelay: self.tcp_nodelay,
        }
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_tick_rate_hz() -> u32 {
    30
}
fn default_player_uid() -> String {
    "guest".to_string()
}
fn default_server_address() -> String {
    "127.0.0.1:9000".to_string()
}
fn default_max_frame_length() -> usize {
    gamenet_core::protocol::DEFAULT_MAX_FRAME_LENGTH
}
fn default_read_buffer_size() -> usize {
    8 * 1024
}
fn default_true() -> bool {
    true
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            tick_rate_hz: default_tick_rate_hz(),
            player_uid: default_player_uid(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            server_address: default_server_address(),
            max_frame_length: default_max_frame_length(),
            read_buffer_size: default_read_buffer_size(),
            max_pending_writes: None,
            tcp_nodelay: default_true(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Loads `ClientConfig` from `path`, returning the defaults if the file does
/// not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<ClientConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ClientConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &ClientConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("client.toml"))
}

/// Loads the config from the default location.
///
/// # Errors
///
/// See [`config_file_path`] and [`load_config_from`].
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Saves the config to the default location.
///
/// # Errors
///
/// See [`config_file_path`] and [`save_config_to`].
pub fn save_config(config: &ClientConfig) -> Result<(), ConfigError> {
    save_config_to(&config_file_path()?, config)
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("GameNet"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("gamenet"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("GameNet")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path() -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir()
            .join(format!("gamenet_cfg_{}_{nanos}", std::process::id()))
            .join("client.toml")
    }

    #[test]
    fn test_client_config_default_values() {
        // Arrange / Act
        let cfg = ClientConfig::default();

        // Assert
        assert_eq!(cfg.client.log_level, "info");
        assert_eq!(cfg.client.tick_rate_hz, 30);
        assert_eq!(cfg.client.player_uid, "guest");
        assert_eq!(cfg.network.server_address, "127.0.0.1:9000");
        assert_eq!(cfg.network.max_frame_length, 1024 * 1024);
        assert_eq!(cfg.network.max_pending_writes, None);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let cfg: ClientConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg, ClientConfig::default());
    }

    #[test]
    fn test_partial_network_section_overrides_only_given_fields() {
        // Arrange
        let toml_str = r#"
[network]
server_address = "10.0.0.5:7777"
max_pending_writes = 64
"#;

        // Act
        let cfg: ClientConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.network.server_address, "10.0.0.5:7777");
        assert_eq!(cfg.network.max_pending_writes, Some(64));
        assert_eq!(cfg.network.read_buffer_size, 8 * 1024);
        assert!(cfg.network.tcp_nodelay);
        assert_eq!(cfg.client, GeneralConfig::default());
    }

    #[test]
    fn test_unbounded_queue_is_omitted_from_toml() {
        let toml_str = toml::to_string_pretty(&ClientConfig::default()).expect("serialize");
        assert!(!toml_str.contains("max_pending_writes"));
    }

    #[test]
    fn test_invalid_toml_returns_parse_error() {
        // Arrange
        let path = temp_config_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[[[ not valid toml").unwrap();

        // Act
        let result = load_config_from(&path);

        // Assert
        assert!(matches!(result, Err(ConfigError::Parse(_))));
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = PathBuf::from("/nonexistent/path/that/cannot/exist/client.toml");
        let cfg = load_config_from(&path).expect("missing file is not an error");
        assert_eq!(cfg, ClientConfig::default());
    }

    #[test]
    fn test_save_then_load_preserves_settings() {
        // Arrange
        let path = temp_config_path();
        let mut cfg = ClientConfig::default();
        cfg.client.player_uid = "alice".to_string();
        cfg.network.max_pending_writes = Some(8);

        // Act
        save_config_to(&path, &cfg).expect("save");
        let loaded = load_config_from(&path).expect("load");

        // Assert
        assert_eq!(loaded, cfg);
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_peer_config_mirrors_network_section() {
        let network = NetworkConfig {
            max_frame_length: 512,
            max_pending_writes: Some(3),
            tcp_nodelay: false,
            ..NetworkConfig::default()
        };

        let peer = network.peer_config();

        assert_eq!(peer.max_frame_length, 512);
        assert_eq!(peer.max_pending_writes, Some(3));
        assert!(!peer.tcp_nodelay);
    }

    #[test]
    fn test_config_file_path_ends_with_client_toml() {
        // NoPlatformConfigDir in a stripped environment is also acceptable.
        if let Ok(path) = config_file_path() {
            assert!(path.ends_with("client.toml"), "got {path:?}");
        }
    }
}
