use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use anyhow::{Context, Result};
use tracing::{info, warn};

const DEFAULT_SECRET: &str = "secret123string";

pub struct Config {
    pub ip: String,
    pub port: u16,
    pub secret: String,
    pub database_url: String,
    pub database_name: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        Ok(Self {
            ip: try_load("IP", "0.0.0.0")?,
            port: try_load("PORT", "5000")?,
            secret: load_secret("SECRET"),
            database_url: try_load("DATABASE_URL", "redis://127.0.0.1:6379")?,
            database_name: try_load("DATABASE_NAME", "cookbook")?,
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("Invalid {key} value: {raw}"))
}

/// Environment first, then a mounted secret file, then the development default.
fn load_secret(secret_name: &str) -> String {
    if let Some(secret) = var(secret_name) {
        return secret;
    }

    let path = format!("/run/secrets/{secret_name}");

    match read_to_string(&path) {
        Ok(secret) if !secret.trim().is_empty() => secret.trim().to_string(),
        _ => {
            warn!("{secret_name} not found in environment or {path}, using development default");
            DEFAULT_SECRET.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_used_when_unset() {
        let port: u16 = try_load("COOKBOOK_TEST_UNSET_PORT", "5000").unwrap();
        assert_eq!(port, 5000);
    }

    #[test]
    fn test_invalid_default_is_an_error() {
        let port: Result<u16> = try_load("COOKBOOK_TEST_UNSET_PORT", "not-a-port");
        assert!(port.is_err());
    }

    #[test]
    fn test_address() {
        let config = Config {
            ip: "127.0.0.1".to_string(),
            port: 8080,
            secret: DEFAULT_SECRET.to_string(),
            database_url: "memory://".to_string(),
            database_name: "cookbook".to_string(),
        };

        assert_eq!(config.address(), "127.0.0.1:8080");
    }
}
