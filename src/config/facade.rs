//! ConfigLoader: composes configuration sources and deserializes AgentSettings.

use super::AgentSettings;
use crate::error::BotError;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Platform settings file (`<config dir>/mbot/settings.json`)
    pub fn platform_settings_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "mbot", "mbot")
            .map(|dirs| dirs.config_dir().join("settings.json"))
    }

    /// Load settings.
    ///
    /// Precedence: defaults (lowest) -> platform file -> `settings` -> environment (highest).
    /// An explicit `settings` file must exist; the platform file is optional.
    pub fn load(settings: Option<&Path>) -> Result<AgentSettings, BotError> {
        let mut builder = Self::builder_with_defaults()?;

        if let Some(platform) = Self::platform_settings_path() {
            debug!(path = %platform.display(), "Platform settings source");
            builder = builder.add_source(
                File::from(platform)
                    .format(FileFormat::Json)
                    .required(false),
            );
        }

        if let Some(path) = settings {
            if !path.is_file() {
                return Err(BotError::ConfigError(format!(
                    "Settings file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path).format(FileFormat::Json).required(true));
        }

        let mut loaded: AgentSettings = Self::with_environment(builder).build()?.try_deserialize()?;

        // Relative command table paths are relative to the settings file.
        if let (Some(settings), Some(commands)) = (settings, loaded.commands_file.as_mut()) {
            if commands.is_relative() {
                if let Some(dir) = settings.parent() {
                    *commands = dir.join(&*commands);
                }
            }
        }
        Ok(loaded)
    }

    /// Command table location: configured path, else `commands.json` beside the settings file
    pub fn commands_path(loaded: &AgentSettings, settings: Option<&Path>) -> PathBuf {
        loaded.commands_file.clone().unwrap_or_else(|| {
            settings
                .and_then(Path::parent)
                .map(|dir| dir.join("commands.json"))
                .unwrap_or_else(|| PathBuf::from("commands.json"))
        })
    }

    /// Create default configuration.
    pub fn default() -> AgentSettings {
        AgentSettings::default()
    }

    fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, BotError> {
        let defaults = Config::try_from(&AgentSettings::default())?;
        Ok(Config::builder().add_source(defaults))
    }

    fn with_environment(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
        builder.add_source(
            Environment::with_prefix("MBOT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
    }
}
