use std::env;
use std::str::FromStr;

use anyhow::{Context, anyhow};

/// Which [`Ledger`](crate::store::Ledger) backs the service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    MySql,
    Memory,
}

impl FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mysql" => Ok(StoreKind::MySql),
            "memory" => Ok(StoreKind::Memory),
            other => Err(anyhow!("unknown STORE '{other}', expected mysql or memory")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: String,
    pub store: StoreKind,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub log_level: tracing::Level,
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn parsed_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{key}='{raw}' is invalid: {e}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let store: StoreKind = parsed_or("STORE", StoreKind::MySql)?;
        let database_url = match store {
            StoreKind::MySql => Some(required("DATABASE_URL")?),
            StoreKind::Memory => env::var("DATABASE_URL").ok(),
        };

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            store,
            database_url,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parsed_or("ACCESS_TOKEN_TTL", 900)?, // default 15 min
            refresh_token_ttl: parsed_or("REFRESH_TOKEN_TTL", 604_800)?, // default 7 days

            rate_login_per_min: parsed_or("RATE_LOGIN_PER_MIN", 60)?,
            rate_register_per_min: parsed_or("RATE_REGISTER_PER_MIN", 30)?,
            rate_refresh_per_min: parsed_or("RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: parsed_or("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            log_level: parsed_or("LOG_LEVEL", tracing::Level::DEBUG)?,
        })
    }
}
