use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;
use std::net::SocketAddr;

use crate::services::validator::UploadLimits;

fn default_max_file_size() -> usize {
    // 10 MB in bytes
    10 * 1024 * 1024
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub max_file_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_file_size: default_max_file_size(),
        }
    }
}

impl Config {
    pub fn new() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        Self::from_vars(
            std::env::var("CHURN_BIND_ADDR").ok(),
            std::env::var("CHURN_MAX_FILE_SIZE").ok(),
        )
    }

    fn from_vars(bind_addr: Option<String>, max_file_size: Option<String>) -> Result<Self> {
        let bind_addr = match bind_addr {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid CHURN_BIND_ADDR '{}': {}", raw, e))?,
            None => default_bind_addr(),
        };

        let max_file_size = match max_file_size {
            Some(raw) => {
                let size: usize = raw
                    .trim()
                    .parse()
                    .map_err(|e| anyhow::anyhow!("Invalid CHURN_MAX_FILE_SIZE '{}': {}", raw, e))?;
                if size == 0 {
                    anyhow::bail!("CHURN_MAX_FILE_SIZE must be greater than zero");
                }
                size
            }
            None => default_max_file_size(),
        };

        Ok(Config {
            bind_addr,
            max_file_size,
        })
    }

    pub fn upload_limits(&self) -> UploadLimits {
        UploadLimits {
            max_file_size: self.max_file_size,
        }
    }
}

pub fn load_config() -> Result<Config> {
    let config = Config::new()?;
    tracing::info!(
        "Configuration loaded: bind_addr={}, max_file_size={} bytes",
        config.bind_addr,
        config.max_file_size
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_vars(None, None).unwrap();
        assert_eq!(config.bind_addr, default_bind_addr());
        assert_eq!(config.max_file_size, 10 * 1024 * 1024);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_vars(
            Some("0.0.0.0:8000".to_string()),
            Some(" 2048 ".to_string()),
        )
        .unwrap();
        assert_eq!(config.bind_addr.port(), 8000);
        assert_eq!(config.upload_limits().max_file_size, 2048);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(Config::from_vars(Some("not-an-addr".to_string()), None).is_err());
        assert!(Config::from_vars(None, Some("ten megabytes".to_string())).is_err());
        assert!(Config::from_vars(None, Some("0".to_string())).is_err());
    }
}
