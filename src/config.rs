//! Runtime configuration, read from the environment (and `.env` if present).

use std::env;
use std::fmt::Display;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use tracing::info;

/// Which record store backs the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" => Ok(StoreKind::Postgres),
            "memory" => Ok(StoreKind::Memory),
            other => Err(format!("unknown store kind {:?}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub store: StoreKind,
    pub database_url: Option<String>,
    pub cors_origin: String,
    pub bcrypt_cost: u32,
    pub secure_cookies: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let store = try_load("PADDY_STORE", "postgres")?;
        let database_url = env::var("DATABASE_URL").ok();
        if store == StoreKind::Postgres && database_url.is_none() {
            return Err(anyhow!("No database URL provided"));
        }

        Ok(Self {
            port: try_load("PORT", "3000")?,
            store,
            database_url,
            cors_origin: try_load("CORS_ORIGIN", "http://localhost:5173")?,
            bcrypt_cost: try_load("BCRYPT_COST", "10")?,
            secure_cookies: try_load("SESSION_COOKIE_SECURE", "false")?,
        })
    }

    /// An in-memory setup with a cheap bcrypt cost, for tests and demos.
    pub fn in_memory() -> Self {
        Self {
            port: 0,
            store: StoreKind::Memory,
            database_url: None,
            cors_origin: "http://localhost:5173".to_owned(),
            bcrypt_cost: 4,
            secure_cookies: false,
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let value = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_owned()
    });

    value
        .parse()
        .map_err(|err| anyhow!("{}", err))
        .with_context(|| format!("Invalid {} value", key))
}
