//! postgres.rs
//!
//! Реализация хранилища поверх PostgreSQL. Пакет изменений `apply`
//! выполняется в одной транзакции.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use super::{GuestStore, Mutation, SeatingStore, TableStore};
use crate::database::Database;
use crate::error::{StoreError, StoreResult};
use crate::models::{Guest, NewGuest, NewTable, Table};

const GUEST_COLUMNS: &str = "id, name, table_id, accompanying_guests, arrival_time";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(db: &Database) -> Self {
        Self { pool: db.pool.clone() }
    }
}

// Нарушения ограничений схемы отдаём как конфликт (FK отдельно),
// остальное как ошибку БД
fn map_sqlx_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_foreign_key_violation() {
            return StoreError::MissingReference(db_err.message().to_string());
        }
        if db_err.is_unique_violation() || db_err.is_check_violation() {
            return StoreError::Conflict(db_err.message().to_string());
        }
    }
    if matches!(e, sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed) {
        return StoreError::Unavailable(e.to_string());
    }
    StoreError::Database(e)
}

fn expect_one_row(rows_affected: u64) -> StoreResult<()> {
    if rows_affected == 0 {
        Err(StoreError::NotFound)
    } else {
        Ok(())
    }
}

async fn write_table(conn: &mut PgConnection, table: &Table) -> StoreResult<()> {
    let res = sqlx::query("UPDATE tables SET capacity = $2 WHERE id = $1")
        .bind(table.id)
        .bind(table.capacity)
        .execute(conn)
        .await
        .map_err(map_sqlx_error)?;
    expect_one_row(res.rows_affected())
}

async fn write_guest(conn: &mut PgConnection, guest: &Guest) -> StoreResult<()> {
    let res = sqlx::query(
        r#"
        UPDATE guests
        SET name = $2, table_id = $3, accompanying_guests = $4, arrival_time = $5
        WHERE id = $1
        "#,
    )
    .bind(guest.id)
    .bind(&guest.name)
    .bind(guest.table_id)
    .bind(guest.accompanying_guests)
    .bind(guest.arrival_time)
    .execute(conn)
    .await
    .map_err(map_sqlx_error)?;
    expect_one_row(res.rows_affected())
}

async fn remove_guest(conn: &mut PgConnection, guest: &Guest) -> StoreResult<()> {
    let res = sqlx::query("DELETE FROM guests WHERE id = $1")
        .bind(guest.id)
        .execute(conn)
        .await
        .map_err(map_sqlx_error)?;
    expect_one_row(res.rows_affected())
}

#[async_trait]
impl TableStore for PgStore {
    async fn get_table(&self, id: i64) -> StoreResult<Option<Table>> {
        sqlx::query_as::<_, Table>("SELECT id, capacity FROM tables WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn list_tables(&self) -> StoreResult<Vec<Table>> {
        sqlx::query_as::<_, Table>("SELECT id, capacity FROM tables ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn create_table(&self, table: NewTable) -> StoreResult<Table> {
        sqlx::query_as::<_, Table>(
            "INSERT INTO tables (capacity) VALUES ($1) RETURNING id, capacity",
        )
        .bind(table.capacity)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn update_table(&self, table: &Table) -> StoreResult<()> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        write_table(&mut *conn, table).await
    }

    async fn delete_table(&self, table: &Table) -> StoreResult<()> {
        let res = sqlx::query("DELETE FROM tables WHERE id = $1")
            .bind(table.id)
            .execute(&self.pool)
            .await
            .map_err(|e| match map_sqlx_error(e) {
                // на стол ещё ссылаются гости
                StoreError::MissingReference(msg) => StoreError::Conflict(msg),
                other => other,
            })?;
        expect_one_row(res.rows_affected())
    }
}

#[async_trait]
impl GuestStore for PgStore {
    async fn get_guest(&self, id: i64) -> StoreResult<Option<Guest>> {
        sqlx::query_as::<_, Guest>(&format!("SELECT {GUEST_COLUMNS} FROM guests WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn get_guest_by_name(&self, name: &str) -> StoreResult<Option<Guest>> {
        sqlx::query_as::<_, Guest>(&format!("SELECT {GUEST_COLUMNS} FROM guests WHERE name = $1"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn list_guests(&self) -> StoreResult<Vec<Guest>> {
        sqlx::query_as::<_, Guest>(&format!("SELECT {GUEST_COLUMNS} FROM guests ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn list_arrived_guests(&self) -> StoreResult<Vec<Guest>> {
        sqlx::query_as::<_, Guest>(&format!(
            "SELECT {GUEST_COLUMNS} FROM guests WHERE arrival_time IS NOT NULL ORDER BY arrival_time, id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn create_guest(&self, guest: NewGuest) -> StoreResult<Guest> {
        sqlx::query_as::<_, Guest>(&format!(
            "INSERT INTO guests (name, table_id, accompanying_guests) VALUES ($1, $2, $3) RETURNING {GUEST_COLUMNS}"
        ))
        .bind(&guest.name)
        .bind(guest.table_id)
        .bind(guest.accompanying_guests)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn update_guest(&self, guest: &Guest) -> StoreResult<()> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        write_guest(&mut *conn, guest).await
    }

    async fn delete_guest(&self, guest: &Guest) -> StoreResult<()> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        remove_guest(&mut *conn, guest).await
    }
}

#[async_trait]
impl SeatingStore for PgStore {
    async fn apply(&self, batch: &[Mutation]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        for mutation in batch {
            let res = match mutation {
                Mutation::UpdateTable(t) => write_table(&mut *tx, t).await,
                Mutation::UpdateGuest(g) => write_guest(&mut *tx, g).await,
                Mutation::DeleteGuest(g) => remove_guest(&mut *tx, g).await,
            };
            if let Err(e) = res {
                tracing::error!("apply: rolling back batch of {} writes: {:?}", batch.len(), e);
                if let Err(rollback_err) = tx.rollback().await {
                    // соединение закроется и транзакция всё равно не применится
                    tracing::error!("apply: rollback failed: {:?}", rollback_err);
                }
                return Err(e);
            }
        }

        tx.commit().await.map_err(map_sqlx_error)
    }
}
