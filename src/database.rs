//! database.rs
//!
//! Пул соединений PostgreSQL для хранилища столов и гостей.
//!
//! Размер пула (`DB_POOL_SIZE`, по умолчанию 20) ограничивает число
//! одновременных транзакций `apply`; операции над разными столами идут
//! параллельно, над одним столом уже сериализованы мьютексом стола.
//! `DB_ACQUIRE_TIMEOUT_SECONDS` (по умолчанию 5) - сколько запрос ждёт
//! свободное соединение, после чего получает `StoreError::Unavailable`
//! и клиент видит 500 вместо зависшего запроса.

use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;

#[derive(Clone)]
pub struct Database {
    pub pool: Pool<Postgres>,
}

impl Database {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect(&config.url)
            .await?;

        info!(
            "Connected to PostgreSQL: pool of {} connections, acquire timeout {}s",
            config.pool_size, config.acquire_timeout_seconds
        );
        Ok(Database { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running guest list migrations...");
        sqlx::migrate!("./src/migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed");
        Ok(())
    }
}
