//! Storage infrastructure: configuration file persistence and the key-value
//! store collaborator.
//!
//! - `config` reads and writes the TOML configuration file, with defaults
//!   for a missing file or missing fields.
//! - `kv_store` defines the [`KeyValueStore`] contract that handlers use to
//!   remember session data, plus an in-memory implementation.

pub mod config;
pub mod kv_store;

pub use config::{ClientConfig, ConfigError, GeneralConfig, NetworkConfig};
pub use kv_store::{KeyValueStore, MemoryStore};
