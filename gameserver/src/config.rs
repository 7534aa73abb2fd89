use std::path::Path;

use serde::Deserialize;

use engine_core::TickConfig;
use net::protocol::DEFAULT_MAX_PAYLOAD;
use net::server::ListenerConfig;
use net::Channel;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetSection {
    pub client_addr: String,
    pub internal_addr: String,
    pub max_payload: usize,
}

impl Default for NetSection {
    fn default() -> Self {
        Self {
            client_addr: "0.0.0.0:3724".to_string(),
            internal_addr: "127.0.0.1:4500".to_string(),
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TickSection {
    pub tps: u32,
    pub parallel: bool,
    pub queue_warn_len: usize,
}

impl Default for TickSection {
    fn default() -> Self {
        Self {
            tps: 30,
            parallel: true,
            queue_warn_len: 1024,
        }
    }
}

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub net: NetSection,
    pub tick: TickSection,
}

impl ServerConfig {
    /// Load configuration from an optional TOML file path.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let config = match config_path {
            Some(path) if Path::new(path).exists() => {
                let content = std::fs::read_to_string(path)?;
                toml::from_str(&content)?
            }
            Some(path) => {
                tracing::warn!(path, "config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };
        Ok(config)
    }

    pub fn to_tick_config(&self) -> TickConfig {
        TickConfig {
            tps: self.tick.tps,
            max_ticks: 0,
            parallel: self.tick.parallel,
            queue_warn_len: self.tick.queue_warn_len,
        }
    }

    pub fn listener(&self, channel: Channel) -> ListenerConfig {
        let addr = match channel {
            Channel::Client => &self.net.client_addr,
            Channel::Internal => &self.net.internal_addr,
        };
        ListenerConfig {
            addr: addr.clone(),
            channel,
            max_payload: self.net.max_payload,
        }
    }
}

/// Parse CLI arguments and load config.
/// Supports: --config <path>
pub fn parse_cli_args() -> ServerConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<&str> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                if let Some(val) = args.get(i + 1) {
                    config_path = Some(val.as_str());
                    i += 2;
                } else {
                    eprintln!("--config requires a path argument");
                    std::process::exit(1);
                }
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                std::process::exit(1);
            }
        }
    }

    match ServerConfig::load(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.net.client_addr, "0.0.0.0:3724");
        assert_eq!(config.net.internal_addr, "127.0.0.1:4500");
        assert_eq!(config.net.max_payload, DEFAULT_MAX_PAYLOAD);
        assert_eq!(config.tick.tps, 30);
        assert!(config.tick.parallel);
    }

    #[test]
    fn to_tick_config() {
        let config = ServerConfig::default();
        let tc = config.to_tick_config();
        assert_eq!(tc.tps, 30);
        assert_eq!(tc.max_ticks, 0);
        assert_eq!(tc.queue_warn_len, 1024);
    }

    #[test]
    fn listener_per_channel() {
        let config = ServerConfig::default();
        let internal = config.listener(Channel::Internal);
        assert_eq!(internal.channel, Channel::Internal);
        assert_eq!(internal.addr, "127.0.0.1:4500");
        assert_eq!(config.listener(Channel::Client).addr, "0.0.0.0:3724");
    }

    #[test]
    fn load_none_returns_defaults() {
        let config = ServerConfig::load(None).unwrap();
        assert_eq!(config.tick.tps, 30);
    }

    #[test]
    fn load_nonexistent_file_returns_defaults() {
        let config = ServerConfig::load(Some("/tmp/nonexistent_gameserver_config_4821.toml")).unwrap();
        assert_eq!(config.net.max_payload, DEFAULT_MAX_PAYLOAD);
    }

    #[test]
    fn load_partial_toml() {
        let mut f = NamedTempFile::new().unwrap();
        write!(
            f,
            r#"
[tick]
tps = 60
parallel = false

[net]
internal_addr = "127.0.0.1:9000"
"#
        )
        .unwrap();

        let config = ServerConfig::load(Some(f.path().to_str().unwrap())).unwrap();
        assert_eq!(config.tick.tps, 60);
        assert!(!config.tick.parallel);
        assert_eq!(config.tick.queue_warn_len, 1024);
        assert_eq!(config.net.internal_addr, "127.0.0.1:9000");
        assert_eq!(config.net.client_addr, "0.0.0.0:3724");
    }

    #[test]
    fn load_invalid_toml_fails() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "[tick]\ntps = \"fast\"\n").unwrap();
        let err = ServerConfig::load(Some(f.path().to_str().unwrap())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
