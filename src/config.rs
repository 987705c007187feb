//! Configuration Module
//!
//! This module provides the default settings for every paas process and the
//! TOML configuration file that overrides them. Every field has a default,
//! so a missing file or a partial file is always valid.

use crate::display::{AllocationPolicy, Geometry, SurfaceKind};
use crate::error::{PaasError, Result};
use crate::protocol::DEFAULT_NAMESPACE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Constants for default settings
pub const DEFAULT_CONFIG_PATH: &str = "/etc/paas/paas.toml";
pub const DEFAULT_CONTROL_ENDPOINT: &str = "ipc:///tmp/paas/control.sock";
pub const DEFAULT_BROADCAST_ENDPOINT: &str = "ipc:///tmp/paas/broadcast.sock";
pub const DEFAULT_QUERY_ENDPOINT: &str = "ipc:///tmp/paas/query.sock";
pub const DEFAULT_DB_FILE: &str = "/tmp/paas/pixels.json";
pub const DEFAULT_LOG_PATH: &str = "/tmp/paas/paas.log";
pub const DEFAULT_MIRROR_FILTER: &str = "paas_pixel";
pub const DEFAULT_DISPLAY_FILTER: &str = "paas_";
pub const DEFAULT_STRIP_LENGTH: u32 = 60;
/// Default timeout for client requests in milliseconds
pub const DEFAULT_TIMEOUT_MS: i32 = 5000;
/// Largest display a renderer will allocate a buffer for
pub const MAX_POSITIONS: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub endpoints: Endpoints,
    pub mirror: MirrorConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

/// Addresses of the three channels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Endpoints {
    /// Relay control channel (REQ/REP)
    pub control: String,
    /// Relay broadcast channel (PUB/SUB)
    pub broadcast: String,
    /// Mirror query channel (REQ/REP)
    pub query: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            control: DEFAULT_CONTROL_ENDPOINT.to_string(),
            broadcast: DEFAULT_BROADCAST_ENDPOINT.to_string(),
            query: DEFAULT_QUERY_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MirrorConfig {
    /// Byte prefix the mirror subscribes to
    pub topic_filter: String,
    /// JSON file backing the store
    pub db_file: PathBuf,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        MirrorConfig {
            topic_filter: DEFAULT_MIRROR_FILTER.to_string(),
            db_file: PathBuf::from(DEFAULT_DB_FILE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayConfig {
    /// Byte prefix the renderer subscribes to
    pub topic_filter: String,
    /// Namespace of the display topics (`<namespace>pixel`, ...)
    pub namespace: String,
    pub allocation: AllocationPolicy,
    pub surface: SurfaceKind,
    /// Output value a channel of 255 is scaled to
    pub max_brightness: u8,
    pub geometry: Geometry,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            topic_filter: DEFAULT_DISPLAY_FILTER.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            allocation: AllocationPolicy::Linear,
            surface: SurfaceKind::Ansi,
            max_brightness: 255,
            geometry: Geometry::Strip {
                length: DEFAULT_STRIP_LENGTH,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log file; `None` logs to stdout only
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            file: Some(PathBuf::from(DEFAULT_LOG_PATH)),
        }
    }
}

impl Config {
    /// Loads the configuration file, falling back to defaults when it does not exist
    ///
    /// # Arguments
    /// * `path` - Location of the TOML file
    ///
    /// # Returns
    /// * `Result<Config>` - The parsed configuration or a configuration error
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No configuration at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let text = fs::read_to_string(path)?;
        let config = Config::from_toml(&text)
            .map_err(|e| PaasError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Rejects settings no process could start with
    pub fn validate(&self) -> Result<()> {
        for (name, endpoint) in [
            ("control", &self.endpoints.control),
            ("broadcast", &self.endpoints.broadcast),
            ("query", &self.endpoints.query),
        ] {
            if !endpoint.contains("://") {
                return Err(PaasError::Config(format!(
                    "{} endpoint '{}' has no transport prefix",
                    name, endpoint
                )));
            }
        }
        if self.display.geometry.is_empty() {
            return Err(PaasError::Config("display geometry has no positions".to_string()));
        }
        if self.display.geometry.len() > MAX_POSITIONS {
            return Err(PaasError::Config(format!(
                "display geometry {} has {} positions (max: {})",
                self.display.geometry,
                self.display.geometry.len(),
                MAX_POSITIONS
            )));
        }
        Ok(())
    }
}

/// Filesystem path of an `ipc://` endpoint, `None` for other transports
pub fn ipc_path(endpoint: &str) -> Option<&Path> {
    endpoint.strip_prefix("ipc://").map(Path::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.endpoints.control, DEFAULT_CONTROL_ENDPOINT);
        assert_eq!(config.mirror.topic_filter, "paas_pixel");
        assert_eq!(config.display.topic_filter, "paas_");
        assert_eq!(config.display.allocation, AllocationPolicy::Linear);
        assert_eq!(config.display.geometry.len(), 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [display]
            allocation = "random"
            geometry = { kind = "grid", width = 8, height = 4 }
            "#,
        )
        .unwrap();
        assert_eq!(config.display.allocation, AllocationPolicy::Random);
        assert_eq!(config.display.geometry, Geometry::Grid { width: 8, height: 4 });
        assert_eq!(config.display.topic_filter, DEFAULT_DISPLAY_FILTER);
        assert_eq!(config.endpoints, Endpoints::default());
    }

    #[test]
    fn test_unknown_field_is_an_error() {
        let result = Config::from_toml("[mirror]\ntopic_filtre = \"x\"\n");
        assert!(matches!(result, Err(PaasError::Config(_))));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut config = Config::default();
        config.display.max_brightness = 50;
        config.logging.file = Some(PathBuf::from("/var/log/paas.log"));
        let text = config.to_toml().unwrap();
        assert_eq!(Config::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let config = Config::load(Path::new("/nonexistent/paas.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[endpoints]\ncontrol = \"tcp://127.0.0.1:5555\"").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.endpoints.control, "tcp://127.0.0.1:5555");
    }

    #[test]
    fn test_validate_rejects_bare_endpoint() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[endpoints]\nquery = \"localhost:5556\"").unwrap();
        assert!(matches!(Config::load(file.path()), Err(PaasError::Config(_))));
    }

    #[test]
    fn test_validate_caps_geometry_size() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[display]\ngeometry = {{ kind = \"grid\", width = 65536, height = 65536 }}").unwrap();
        assert!(matches!(Config::load(file.path()), Err(PaasError::Config(_))));

        let mut config = Config::default();
        config.display.geometry = Geometry::Strip { length: MAX_POSITIONS as u32 };
        assert!(config.validate().is_ok());
        config.display.geometry = Geometry::Strip { length: MAX_POSITIONS as u32 + 1 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ipc_path() {
        assert_eq!(ipc_path("ipc:///tmp/paas/a.sock"), Some(Path::new("/tmp/paas/a.sock")));
        assert_eq!(ipc_path("tcp://127.0.0.1:1"), None);
    }
}
