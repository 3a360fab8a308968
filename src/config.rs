use std::{fmt, net::SocketAddr};

use anyhow::Context;
use serde::Deserialize;

#[derive(Clone, Deserialize)]
pub struct SuperuserConfig {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for SuperuserConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuperuserConfig")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub host: String,
    pub port: u16,
    pub superuser: Option<SuperuserConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: 10,
            host: "0.0.0.0".into(),
            port: 8080,
            superuser: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let database_url = get("DATABASE_URL").filter(|v| !v.is_empty());
        let max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(v) => v
                .parse::<u32>()
                .with_context(|| format!("DATABASE_MAX_CONNECTIONS={v}"))?,
            None => defaults.max_connections,
        };
        let host = get("APP_HOST").unwrap_or(defaults.host);
        let port = match get("APP_PORT") {
            Some(v) => v.parse::<u16>().with_context(|| format!("APP_PORT={v}"))?,
            None => defaults.port,
        };
        let superuser = match (get("SUPERUSER_EMAIL"), get("SUPERUSER_PASSWORD")) {
            (Some(email), Some(password)) => Some(SuperuserConfig { email, password }),
            (None, None) => None,
            _ => anyhow::bail!("SUPERUSER_EMAIL and SUPERUSER_PASSWORD must be set together"),
        };
        Ok(Self {
            database_url,
            max_connections,
            host,
            port,
            superuser,
        })
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
