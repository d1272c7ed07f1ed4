use std::time::Duration;

use crate::credential::CredentialCodec;
use crate::models::BoardList;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} is not a valid number: {value:?}")]
    InvalidNumber { key: &'static str, value: String },
    #[error("BOARDS must name at least one board")]
    NoBoards,
    #[error("invalid credential cost: {0}")]
    CredentialCost(String),
}

/// Runtime settings, read from the process environment.
#[derive(Clone, Debug)]
pub struct Settings {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub boards: BoardList,
    pub store_timeout: Duration,
    pub db_max_connections: u32,
    pub argon2_cost: Option<(u32, u32, u32)>,
    pub frontend_url: Option<String>,
    pub enable_hsts: bool,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an arbitrary key lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        let num = |key: &'static str, default: u64| -> Result<u64, ConfigError> {
            match var(key) {
                Some(v) => v.trim().parse().map_err(|_| ConfigError::InvalidNumber { key, value: v }),
                None => Ok(default),
            }
        };
        let num_u32 = |key: &'static str, default: u32| -> Result<u32, ConfigError> {
            match var(key) {
                Some(v) => v.trim().parse().map_err(|_| ConfigError::InvalidNumber { key, value: v }),
                None => Ok(default),
            }
        };

        let boards = match var("BOARDS") {
            Some(list) => BoardList::new(list.split(',').map(str::trim).filter(|b| !b.is_empty())),
            None => BoardList::default(),
        };
        if boards.is_empty() {
            return Err(ConfigError::NoBoards);
        }

        let argon2_cost = match (var("ARGON2_M_COST"), var("ARGON2_T_COST"), var("ARGON2_P_COST")) {
            (None, None, None) => None,
            _ => {
                let defaults = argon2::Params::default();
                Some((
                    num_u32("ARGON2_M_COST", defaults.m_cost())?,
                    num_u32("ARGON2_T_COST", defaults.t_cost())?,
                    num_u32("ARGON2_P_COST", defaults.p_cost())?,
                ))
            }
        };

        let db_max_connections = num_u32("DB_MAX_CONNECTIONS", 5)?;
        if db_max_connections == 0 {
            return Err(ConfigError::InvalidNumber { key: "DB_MAX_CONNECTIONS", value: "0".into() });
        }

        Ok(Self {
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            database_url: var("DATABASE_URL"),
            boards,
            store_timeout: Duration::from_millis(num("STORE_TIMEOUT_MS", 5000)?),
            db_max_connections,
            argon2_cost,
            frontend_url: var("FRONTEND_URL"),
            enable_hsts: var("ENABLE_HSTS").map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false),
        })
    }

    pub fn credential_codec(&self) -> Result<CredentialCodec, ConfigError> {
        match self.argon2_cost {
            Some((m, t, p)) => CredentialCodec::with_cost(m, t, p).map_err(|e| ConfigError::CredentialCost(e.to_string())),
            None => Ok(CredentialCodec::default()),
        }
    }
}
