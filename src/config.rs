//! Configuration loading for NagaBridge

use crate::error::{BridgeError, Result};
use crate::protocol::ActionSet;
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Clone, Debug, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub reward: RewardConfig,
}

/// Network connection settings
#[derive(Clone, Debug, Deserialize)]
pub struct ConnectionConfig {
    /// Game server host (default: 127.0.0.1)
    #[serde(default = "default_host")]
    pub host: String,

    /// Game server UDP port (default: 3000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Socket send timeout in milliseconds (default: 1000)
    #[serde(default = "default_socket_timeout")]
    pub socket_timeout_ms: u64,

    /// Blocking-fetch timeout for reset/step in milliseconds (default: 5000)
    #[serde(default = "default_step_timeout")]
    pub step_timeout_ms: u64,

    /// Bounded wait for transport shutdown in milliseconds (default: 2000)
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_ms: u64,
}

/// Game/arena parameters
#[derive(Clone, Debug, Deserialize)]
pub struct GameConfig {
    /// Server arena side length in cells (default: 40)
    #[serde(default = "default_grid_size")]
    pub server_grid_size: usize,

    /// Action-encode policy (default: five)
    #[serde(default)]
    pub action_set: ActionSet,
}

/// Reward shaping constants
#[derive(Clone, Debug, Deserialize)]
pub struct RewardConfig {
    /// Reward per score point gained (default: 200)
    #[serde(default = "default_apple_bonus")]
    pub apple_bonus: i32,

    /// Penalty magnitude applied on a death frame (default: 100)
    #[serde(default = "default_death_penalty")]
    pub death_penalty: i32,
}

// Default value functions
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_socket_timeout() -> u64 {
    1000
}
fn default_step_timeout() -> u64 {
    5000
}
fn default_shutdown_timeout() -> u64 {
    2000
}
fn default_grid_size() -> usize {
    40
}
fn default_apple_bonus() -> i32 {
    200
}
fn default_death_penalty() -> i32 {
    100
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            socket_timeout_ms: default_socket_timeout(),
            step_timeout_ms: default_step_timeout(),
            shutdown_timeout_ms: default_shutdown_timeout(),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            server_grid_size: default_grid_size(),
            action_set: ActionSet::default(),
        }
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            apple_bonus: default_apple_bonus(),
            death_penalty: default_death_penalty(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            game: GameConfig::default(),
            reward: RewardConfig::default(),
        }
    }
}

impl ConnectionConfig {
    /// Get the full address string for connection
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl GameConfig {
    /// Observation side length: the server arena plus the wall border
    pub fn observation_size(&self) -> usize {
        self.server_grid_size + 2
    }
}

impl BridgeConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("Failed to read config file: {}", e)))?;
        let config: BridgeConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Get the full address string for connection
    pub fn address(&self) -> String {
        self.connection.address()
    }
}
