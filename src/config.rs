use std::{env, str::FromStr};

use anyhow::{Context, anyhow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(StorageBackend::Memory),
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            other => Err(anyhow!("unsupported STORAGE_BACKEND '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub session_secure: bool,
    pub seed_demo_data: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let storage = match lookup("STORAGE_BACKEND") {
            Some(value) => value.parse()?,
            None => StorageBackend::Memory,
        };
        let database_url = lookup("DATABASE_URL").filter(|url| !url.is_empty());
        if storage == StorageBackend::Postgres && database_url.is_none() {
            return Err(anyhow!("DATABASE_URL is required for the postgres backend"));
        }
        let host = lookup("APP_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = lookup("APP_PORT")
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let session_secure = parse_flag(lookup("SESSION_SECURE"), false)
            .context("SESSION_SECURE must be a boolean")?;
        let seed_demo_data = parse_flag(lookup("SEED_DEMO_DATA"), true)
            .context("SEED_DEMO_DATA must be a boolean")?;

        Ok(Self {
            storage,
            database_url,
            host,
            port,
            session_secure,
            seed_demo_data,
        })
    }

    /// Config for tests and local runs: memory storage, no seeding.
    pub fn in_memory() -> Self {
        Self {
            storage: StorageBackend::Memory,
            database_url: None,
            host: "127.0.0.1".to_string(),
            port: 3000,
            session_secure: false,
            seed_demo_data: false,
        }
    }
}

fn parse_flag(value: Option<String>, default: bool) -> anyhow::Result<bool> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(anyhow!("invalid boolean '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_memory_backend() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
        assert!(!config.session_secure);
        assert!(config.seed_demo_data);
    }

    #[test]
    fn postgres_backend_requires_database_url() {
        assert!(config_from(&[("STORAGE_BACKEND", "postgres")]).is_err());

        let config = config_from(&[
            ("STORAGE_BACKEND", "Postgres"),
            ("DATABASE_URL", "postgres://localhost/shop"),
        ])
        .unwrap();
        assert_eq!(config.storage, StorageBackend::Postgres);
    }

    #[test]
    fn rejects_unknown_backend_and_bad_flags() {
        assert!(config_from(&[("STORAGE_BACKEND", "mongo")]).is_err());
        assert!(config_from(&[("SEED_DEMO_DATA", "maybe")]).is_err());
    }

    #[test]
    fn bad_port_falls_back_to_default() {
        let config = config_from(&[("APP_PORT", "not-a-port"), ("SESSION_SECURE", "true")]).unwrap();
        assert_eq!(config.port, 3000);
        assert!(config.session_secure);
    }
}
