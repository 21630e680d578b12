//! Server settings read from the environment (after `.env` is loaded by the binary).

use crate::error::ConfigError;
use crate::service::StoreFaultPolicy;
use std::net::SocketAddr;
use std::str::FromStr;

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/brews";
pub const DEFAULT_SCHEMA: &str = "brews";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Which store backs the resources.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StoreBackend {
    #[default]
    Postgres,
    /// Process-local tables, lost on exit.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(ConfigError::InvalidValue {
                key: "STORE_BACKEND",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub database_url: String,
    pub schema: String,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    pub fault_policy: StoreFaultPolicy,
    pub backend: StoreBackend,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. Unset or blank keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(v) => v
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::InvalidValue {
                    key: "DB_MAX_CONNECTIONS",
                    value: v,
                })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Settings {
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
            schema: get("BREWS_SCHEMA").unwrap_or_else(|| DEFAULT_SCHEMA.into()),
            bind_addr: get("BIND_ADDR")
                .as_deref()
                .unwrap_or(DEFAULT_BIND_ADDR)
                .trim()
                .parse()?,
            max_connections,
            fault_policy: get("STORE_FAULT_POLICY")
                .map(|v| v.trim().parse())
                .transpose()?
                .unwrap_or_default(),
            backend: get("STORE_BACKEND")
                .map(|v| v.trim().parse())
                .transpose()?
                .unwrap_or_default(),
        })
    }
}
