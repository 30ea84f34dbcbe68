use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const DEFAULT_PROTOCOL_NAME: &str = "Permavault";
pub const DEFAULT_PROTOCOL_VERSION: &str = "2.0";
pub const DEFAULT_BATCH_CHUNK_SIZE: usize = 50;
pub const DEFAULT_UPLOAD_CHUNK_SIZE: usize = 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Client-wide settings
///
/// Per-call options win over operation defaults, which win over these values.
/// Every field has a default, so a partial TOML file is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Written into the `Protocol-Name` tag of every transaction
    #[serde(default = "default_protocol_name")]
    pub protocol_name: String,
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,
    /// Items prepared concurrently per chunk in batch operations
    #[serde(default = "default_batch_chunk_size")]
    pub batch_chunk_size: usize,
    /// Bytes per upload chunk, the granularity of progress reports
    #[serde(default = "default_upload_chunk_size")]
    pub upload_chunk_size: usize,
    /// Open sealed fields when reading objects back
    #[serde(default = "default_decrypt_on_read")]
    pub decrypt_on_read: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_protocol_name() -> String {
    DEFAULT_PROTOCOL_NAME.to_string()
}

fn default_protocol_version() -> String {
    DEFAULT_PROTOCOL_VERSION.to_string()
}

fn default_batch_chunk_size() -> usize {
    DEFAULT_BATCH_CHUNK_SIZE
}

fn default_upload_chunk_size() -> usize {
    DEFAULT_UPLOAD_CHUNK_SIZE
}

fn default_decrypt_on_read() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            protocol_name: default_protocol_name(),
            protocol_version: default_protocol_version(),
            batch_chunk_size: default_batch_chunk_size(),
            upload_chunk_size: default_upload_chunk_size(),
            decrypt_on_read: default_decrypt_on_read(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml(&source)
    }

    /// Parsed `log_level`, unknown values fall back to INFO
    pub fn level(&self) -> tracing::Level {
        tracing::Level::from_str(&self.log_level).unwrap_or(tracing::Level::INFO)
    }

    /// Caller value, then the operation's own default, then `fallback`
    pub fn resolve<T>(caller: Option<T>, per_call: Option<T>, fallback: T) -> T {
        caller.or(per_call).unwrap_or(fallback)
    }

    pub fn resolve_batch_chunk_size(&self, caller: Option<usize>) -> usize {
        Self::resolve(caller, None, self.batch_chunk_size).max(1)
    }

    pub fn resolve_upload_chunk_size(&self, caller: Option<usize>) -> usize {
        Self::resolve(caller, None, self.upload_chunk_size).max(1)
    }

    pub fn resolve_decrypt(&self, caller: Option<bool>) -> bool {
        Self::resolve(caller, None, self.decrypt_on_read)
    }
}
