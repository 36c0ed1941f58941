//! Layered configuration.
//!
//! Settings are resolved from three layers, later wins:
//!
//! 1. **Compiled defaults** — [`Settings::default()`]
//! 2. **JSON file** — `notewire.json` in the working directory, or the path
//!    named by `NOTEWIRE_SETTINGS`; partial files are fine, absent keys keep
//!    their defaults
//! 3. **Environment variables** — `NOTEWIRE_*` overrides

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("failed to read settings file {path}")]
    Read {
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid JSON for the settings shape.
    #[error("failed to parse settings file {path}")]
    Parse {
        /// Offending path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// An environment override holds an unusable value.
    #[error("invalid value in environment variable {var}")]
    InvalidEnv {
        /// Offending variable name.
        var: &'static str,
    },
}

/// Server endpoint settings, used by both the listener and the client dialer.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerSettings {
    /// Host to bind / connect to.
    pub host: String,
    /// Port to bind / connect to.
    pub port: u16,
}

impl ServerSettings {
    /// The `host:port` form used for binding the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The `ws://` URL clients dial.
    pub fn ws_url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8765,
        }
    }
}

/// Connection-manager timing knobs. Fixed values, not adaptive.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientSettings {
    /// Seconds between liveness probes while connected.
    pub ping_interval_secs: u64,
    /// Seconds to sleep after a failed reconnect attempt.
    pub reconnect_delay_secs: u64,
    /// Seconds allowed for a transport close (and a probe's pong).
    pub close_timeout_secs: u64,
}

impl ClientSettings {
    /// Liveness probe interval.
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    /// Delay between reconnect attempts while disconnected.
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    /// Bound on transport close and probe acknowledgement waits.
    pub fn close_timeout(&self) -> Duration {
        Duration::from_secs(self.close_timeout_secs)
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            ping_interval_secs: 30,
            reconnect_delay_secs: 3,
            close_timeout_secs: 5,
        }
    }
}

/// Storage collaborator settings.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageSettings {
    /// Path of the SQLite database file.
    pub db_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("notewire.db"),
        }
    }
}

/// Root settings object.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Endpoint the server binds and the client dials.
    pub server: ServerSettings,
    /// Connection-manager timing.
    pub client: ClientSettings,
    /// Storage collaborator.
    pub storage: StorageSettings,
    /// Passphrase the note cipher derives its key from.
    pub encryption_key: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            client: ClientSettings::default(),
            storage: StorageSettings::default(),
            encryption_key: "notewire-dev-key".to_string(),
        }
    }
}

impl Settings {
    /// Resolve settings from all three layers.
    ///
    /// The file layer is skipped silently when the default file does not
    /// exist; an explicit `NOTEWIRE_SETTINGS` path that fails to read or
    /// parse is an error.
    pub fn load() -> Result<Self, SettingsError> {
        let explicit = std::env::var("NOTEWIRE_SETTINGS").ok().map(PathBuf::from);
        let path = explicit
            .clone()
            .unwrap_or_else(|| PathBuf::from("notewire.json"));

        let mut settings = if path.exists() || explicit.is_some() {
            Self::load_from_path(&path)?
        } else {
            Self::default()
        };
        settings.apply_env(|var| std::env::var(var).ok())?;
        Ok(settings)
    }

    /// Parse the file layer only. Partial files keep defaults for absent keys.
    pub fn load_from_path(path: &Path) -> Result<Self, SettingsError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `NOTEWIRE_*` overrides through an injectable lookup.
    ///
    /// Production passes `|var| std::env::var(var).ok()`; tests pass a map
    /// so they never touch process state.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), SettingsError> {
        if let Some(host) = lookup("NOTEWIRE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("NOTEWIRE_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| SettingsError::InvalidEnv { var: "NOTEWIRE_PORT" })?;
        }
        if let Some(path) = lookup("NOTEWIRE_DB_PATH") {
            self.storage.db_path = PathBuf::from(path);
        }
        if let Some(key) = lookup("NOTEWIRE_ENCRYPTION_KEY") {
            self.encryption_key = key;
        }
        if let Some(secs) = lookup("NOTEWIRE_PING_INTERVAL_SECS") {
            self.client.ping_interval_secs = secs.parse().map_err(|_| SettingsError::InvalidEnv {
                var: "NOTEWIRE_PING_INTERVAL_SECS",
            })?;
        }
        if let Some(secs) = lookup("NOTEWIRE_RECONNECT_DELAY_SECS") {
            self.client.reconnect_delay_secs =
                secs.parse().map_err(|_| SettingsError::InvalidEnv {
                    var: "NOTEWIRE_RECONNECT_DELAY_SECS",
                })?;
        }
        if let Some(secs) = lookup("NOTEWIRE_CLOSE_TIMEOUT_SECS") {
            self.client.close_timeout_secs =
                secs.parse().map_err(|_| SettingsError::InvalidEnv {
                    var: "NOTEWIRE_CLOSE_TIMEOUT_SECS",
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_protocol_constants() {
        let settings = Settings::default();
        assert_eq!(settings.server.ws_url(), "ws://127.0.0.1:8765");
        assert_eq!(settings.client.ping_interval(), Duration::from_secs(30));
        assert_eq!(settings.client.reconnect_delay(), Duration::from_secs(3));
    }

    #[test]
    fn partial_file_keeps_defaults_for_absent_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"server": {{"port": 9100}}}}"#).unwrap();

        let settings = Settings::load_from_path(file.path()).unwrap();
        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.client, ClientSettings::default());
    }

    #[test]
    fn env_overrides_win_over_file_values() {
        let mut settings = Settings::default();
        settings.server.port = 9100;
        settings
            .apply_env(|var| match var {
                "NOTEWIRE_PORT" => Some("9200".to_string()),
                "NOTEWIRE_ENCRYPTION_KEY" => Some("prod-key".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(settings.server.port, 9200);
        assert_eq!(settings.encryption_key, "prod-key");
    }

    #[test]
    fn unparseable_env_port_is_an_error() {
        let mut settings = Settings::default();
        let err = settings
            .apply_env(|var| (var == "NOTEWIRE_PORT").then(|| "eight".to_string()))
            .unwrap_err();
        assert!(matches!(
            err,
            SettingsError::InvalidEnv { var: "NOTEWIRE_PORT" }
        ));
    }

    #[test]
    fn unreadable_file_is_an_error() {
        assert!(matches!(
            Settings::load_from_path(Path::new("/nonexistent/notewire.json")),
            Err(SettingsError::Read { .. })
        ));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            Settings::load_from_path(file.path()),
            Err(SettingsError::Parse { .. })
        ));
    }
}
