pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod store;
pub mod allocator;
pub mod controllers;

use std::sync::Arc;
use tracing::info;

use crate::allocator::Allocator;
use crate::config::{Config, StoreBackend};
use crate::store::{MemoryStore, PgStore, SeatingStore};

// Shared state для всего приложения
pub struct AppState {
    pub allocator: Allocator,
}

impl AppState {
    /// Подключает хранилище, выбранное в конфигурации.
    pub async fn new(config: &Config) -> anyhow::Result<Arc<Self>> {
        let store: Arc<dyn SeatingStore> = match config.store.backend {
            StoreBackend::Postgres => {
                let db = database::Database::new(&config.database).await?;
                info!("Database connected");

                db.run_migrations().await?;
                Arc::new(PgStore::new(&db))
            }
            StoreBackend::Memory => {
                info!("Using in-memory store, data is lost on restart");
                Arc::new(MemoryStore::new())
            }
        };

        Ok(Self::with_store(store))
    }

    pub fn with_store(store: Arc<dyn SeatingStore>) -> Arc<Self> {
        Arc::new(Self {
            allocator: Allocator::new(store),
        })
    }
}
