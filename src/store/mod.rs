//! store
//!
//! Контракт хранилища столов и гостей. Распределитель мест работает только
//! через эти трейты, поэтому конкретную реализацию (память или PostgreSQL)
//! подставляем при старте.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::models::{Guest, NewGuest, NewTable, Table};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait TableStore: Send + Sync {
    async fn get_table(&self, id: i64) -> StoreResult<Option<Table>>;

    async fn list_tables(&self) -> StoreResult<Vec<Table>>;

    async fn create_table(&self, table: NewTable) -> StoreResult<Table>;

    /// Last-write-wins: перезаписывает capacity целиком.
    async fn update_table(&self, table: &Table) -> StoreResult<()>;

    async fn delete_table(&self, table: &Table) -> StoreResult<()>;
}

#[async_trait]
pub trait GuestStore: Send + Sync {
    async fn get_guest(&self, id: i64) -> StoreResult<Option<Guest>>;

    async fn get_guest_by_name(&self, name: &str) -> StoreResult<Option<Guest>>;

    async fn list_guests(&self) -> StoreResult<Vec<Guest>>;

    /// Только гости с выставленным `arrival_time`.
    async fn list_arrived_guests(&self) -> StoreResult<Vec<Guest>>;

    /// `StoreError::Conflict`, если имя уже занято,
    /// `StoreError::MissingReference`, если стола нет.
    async fn create_guest(&self, guest: NewGuest) -> StoreResult<Guest>;

    async fn update_guest(&self, guest: &Guest) -> StoreResult<()>;

    async fn delete_guest(&self, guest: &Guest) -> StoreResult<()>;
}

/// Одна запись в пакете `SeatingStore::apply`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    UpdateTable(Table),
    UpdateGuest(Guest),
    DeleteGuest(Guest),
}

#[async_trait]
pub trait SeatingStore: TableStore + GuestStore {
    /// Применяет все изменения или ни одного.
    async fn apply(&self, batch: &[Mutation]) -> StoreResult<()>;
}
