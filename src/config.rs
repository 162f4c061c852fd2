use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Disease Prediction";
pub const APP_TITLE: &str = "Disease Prediction using Patient Data";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_PORT: u16 = 8888;
pub const DEFAULT_MODELS_DIR: &str = "saved_models";

const ENV_HOST: &str = "PREDICT_HOST";
const ENV_PORT: &str = "PREDICT_PORT";
const ENV_DEBUG: &str = "PREDICT_DEBUG";
const ENV_MODELS_DIR: &str = "PREDICT_MODELS_DIR";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter(debug: bool) -> &'static str {
    if debug {
        "info,disease_predict_lib=debug,tower_http=debug"
    } else {
        "info,tower_http=warn"
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Process configuration, fixed at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub debug: bool,
    pub models_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            debug: false,
            models_dir: PathBuf::from(DEFAULT_MODELS_DIR),
        }
    }
}

impl ServerConfig {
    /// Read `PREDICT_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source. Unset or blank variables
    /// keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(value) = get(ENV_HOST) {
            config.host = value.trim().parse().map_err(|_| ConfigError::Invalid {
                var: ENV_HOST,
                value: value.clone(),
            })?;
        }
        if let Some(value) = get(ENV_PORT) {
            config.port = value.trim().parse().map_err(|_| ConfigError::Invalid {
                var: ENV_PORT,
                value: value.clone(),
            })?;
        }
        if let Some(value) = get(ENV_DEBUG) {
            config.debug = parse_flag(&value).ok_or(ConfigError::Invalid {
                var: ENV_DEBUG,
                value: value.clone(),
            })?;
        }
        if let Some(value) = get(ENV_MODELS_DIR) {
            config.models_dir = PathBuf::from(value.trim());
        }

        Ok(config)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
