/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::path::Path;
use std::time::Duration;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Configuration for deva agents.
///
/// Loaded from `config.toml` in the XDG config directory for the `deva` prefix
/// (for example `$XDG_CONFIG_HOME/deva/config.toml`). Every section and field is
/// optional; anything missing falls back to its default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DevaConfig {
    /// Timeout configuration
    pub timeouts: TimeoutConfig,
    /// Limits and capacity configuration
    pub limits: LimitsConfig,
    /// Question syntax defaults
    pub defaults: DefaultsConfig,
    /// Sentinel and confirmation strings
    pub messages: MessagesConfig,
    /// Output formats
    pub formats: FormatsConfig,
}

/// Timeout-related configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// How long a remote question waits for its correlated answer, in milliseconds
    pub ask_timeout_ms: u64,
}

/// Limits and capacity configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Listener count per topic above which the bus logs a warning. `0` disables it.
    pub max_listeners: usize,
}

/// Question syntax defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Prefix marking a question addressed to another agent
    pub ask_char: char,
    /// Prefix marking a command for the local agent
    pub cmd_char: char,
    /// Method invoked when a question names none
    pub question_method: String,
    /// Value the `hash` utility resets to
    pub hash_marker: String,
}

/// Sentinel and confirmation strings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagesConfig {
    /// Error text for a question without text
    pub no_text: String,
    /// Error text for operations on an inactive agent
    pub offline: String,
    /// Appended to a method name that is not in the method table
    pub invalid_method: String,
    /// Prefix of the status line
    pub online: String,
    /// Message carried by the default `done` result
    pub done: String,
    /// Confirmation returned once every child agent is initialized
    pub devas_init: String,
    /// Confirmation returned once every child agent is stopped
    pub devas_stop: String,
}

/// Output formats
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatsConfig {
    /// `chrono` format string for the activation time in the status line
    pub status_time: String,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            ask_timeout_ms: 30_000,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self { max_listeners: 0 }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            ask_char: '#',
            cmd_char: '!',
            question_method: "question".to_string(),
            hash_marker: "0x".to_string(),
        }
    }
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            no_text: "question has no text".to_string(),
            offline: "agent is offline".to_string(),
            invalid_method: "NOT a valid method".to_string(),
            online: "online since".to_string(),
            done: "done".to_string(),
            devas_init: "devas initialized".to_string(),
            devas_stop: "devas stopped".to_string(),
        }
    }
}

impl Default for FormatsConfig {
    fn default() -> Self {
        Self {
            status_time: "%Y-%m-%d %H:%M:%S %Z".to_string(),
        }
    }
}

impl DevaConfig {
    /// Ask timeout as a [`Duration`]
    pub const fn ask_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.ask_timeout_ms)
    }

    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns the parser's error when the text is not valid TOML or a field has the
    /// wrong type.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load configuration from XDG-compliant locations
    ///
    /// If no configuration file is found, returns the default configuration.
    /// If a configuration file exists but is malformed, logs an error and uses defaults.
    pub fn load() -> Self {
        let xdg_dirs = match xdg::BaseDirectories::with_prefix("deva") {
            Ok(dirs) => dirs,
            Err(e) => {
                error!("Failed to initialize XDG directories: {}", e);
                return Self::default();
            }
        };

        match xdg_dirs.find_config_file("config.toml") {
            Some(path) => Self::load_from(&path),
            None => {
                info!("No configuration file found, using defaults");
                Self::default()
            }
        }
    }

    fn load_from(path: &Path) -> Self {
        info!("Loading configuration from: {}", path.display());
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to read configuration file {}: {}", path.display(), e);
                return Self::default();
            }
        };
        match Self::from_toml_str(&text) {
            Ok(config) => {
                info!("Successfully loaded configuration");
                config
            }
            Err(e) => {
                error!("Failed to parse configuration file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

lazy_static! {
    /// Global configuration instance loaded from XDG-compliant locations
    pub static ref CONFIG: DevaConfig = DevaConfig::load();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_files_keep_remaining_defaults() -> anyhow::Result<()> {
        let config = DevaConfig::from_toml_str(
            r#"
            [timeouts]
            ask_timeout_ms = 250

            [defaults]
            ask_char = "@"
            "#,
        )?;
        assert_eq!(config.ask_timeout(), Duration::from_millis(250));
        assert_eq!(config.defaults.ask_char, '@');
        assert_eq!(config.defaults.cmd_char, '!');
        assert_eq!(config.messages.invalid_method, "NOT a valid method");
        assert_eq!(config.limits.max_listeners, 0);
        Ok(())
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(DevaConfig::from_toml_str("[timeouts]\nask_timeout_ms = \"soon\"").is_err());
    }
}
