use crate::configs::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Reads `$WAVY_CONFIG` (default `config.toml`). A missing file yields
    /// the built-in defaults; a present but malformed file is an error.
    pub fn load() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let path = std::env::var("WAVY_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
        let config_str = std::fs::read_to_string(&path).unwrap_or_else(|_| "".to_string());
        if config_str.is_empty() {
            return Ok(Self::default());
        }
        let config: Config = toml::from_str(&config_str)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let cfg = Config::default();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.storage.upload_limit_mib, 200);
        assert_eq!(cfg.server.request_timeout_sec, 30);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg: Config = toml::from_str("[server]\nport = 9443\n").unwrap();
        assert_eq!(cfg.server.port, 9443);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.storage.root.to_str().unwrap(), "/tmp/wavy_storage");
    }
}
