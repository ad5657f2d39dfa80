//! Agent configuration
//!
//! Settings are layered by [`ConfigLoader`]: built-in defaults, the platform
//! `settings.json`, an explicit settings file, then `MBOT_*` environment
//! variables (`__` separates nested keys, e.g. `MBOT_CONNECTION__USERNAME`).

pub mod facade;

pub use facade::ConfigLoader;

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete agent settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub connection: ConnectionConfig,
    /// Command table file; `commands.json` next to the settings when unset
    pub commands_file: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub health: HealthConfig,
    pub simulation: SimulationConfig,
}

/// Game server connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    /// Protocol version; negotiated when unset
    pub version: Option<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 25565,
            username: "mbot".to_string(),
            version: None,
        }
    }
}

/// Initial health module behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub auto_eat: bool,
    pub exit_before_death: bool,
    /// Health below which the bot leaves the game
    pub exit_threshold: f32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            auto_eat: true,
            exit_before_death: false,
            exit_threshold: 10.0,
        }
    }
}

/// In-memory world parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Physics tick length in milliseconds
    pub tick_ms: u64,
    /// Ticks needed to dig one block
    pub dig_ticks: u32,
    /// Longest path, in steps, the navigator will attempt
    pub max_path_length: u32,
    /// Seed a small demo area around the spawn point
    pub demo_world: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_ms: 50,
            dig_ticks: 6,
            max_path_length: 64,
            demo_world: true,
        }
    }
}
