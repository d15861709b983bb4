use anyhow::{bail, Context};
use serde::Deserialize;
use std::env;
use std::str::FromStr;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub store: StoreConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    /// LOG_FORMAT=json включает JSON-логи
    pub log_json: bool,
}

// Настройки базы данных
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub acquire_timeout_seconds: u64,
}

// Какое хранилище подключать
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => bail!("unknown store backend '{}', expected postgres or memory", other),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = var_or(key, default);
    raw.parse()
        .map_err(|e| anyhow::anyhow!("{} must be valid ('{}'): {}", key, raw, e))
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let backend: StoreBackend = parse_var("STORE_BACKEND", "postgres")?;

        // Без Postgres строка подключения не нужна
        let url = match backend {
            StoreBackend::Postgres => env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            StoreBackend::Memory => env::var("DATABASE_URL").unwrap_or_default(),
        };

        Ok(Config {
            app: AppConfig {
                host: var_or("HOST", "0.0.0.0"),
                port: parse_var("PORT", "4000")?,
                environment: var_or("ENVIRONMENT", "development"),
                rust_log: var_or("RUST_LOG", "guest_list=debug,tower_http=debug"),
                log_json: var_or("LOG_FORMAT", "pretty").eq_ignore_ascii_case("json"),
            },
            database: DatabaseConfig {
                url,
                pool_size: parse_var("DB_POOL_SIZE", "20")?,
                acquire_timeout_seconds: parse_var("DB_ACQUIRE_TIMEOUT_SECONDS", "5")?,
            },
            store: StoreConfig { backend },
        })
    }
}
