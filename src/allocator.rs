//! allocator.rs
//!
//! Распределитель мест: бронирование, заселение и уход гостей.
//!
//! Правила:
//! - Бронирование только *проверяет*, что компания помещается за стол,
//!   но места не занимает. Поэтому на один стол можно набрать броней
//!   больше, чем у него мест; жёсткая проверка происходит при заселении.
//! - Заселение занимает `accompanying_guests + 1` мест, уход возвращает
//!   ровно столько же.
//! - Гость проходит состояния Invited -> Arrived -> (удалён). Повторное
//!   заселение и уход без заселения отклоняются.
//! - Чтение-проверка-запись capacity одного стола выполняется под
//!   мьютексом этого стола; разные столы не блокируют друг друга.

use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, warn};

use crate::error::{AllocatorError, AllocatorResult, StoreError};
use crate::models::{seats_needed, Guest, GuestStatus, NewGuest, NewTable, Table};
use crate::store::{Mutation, SeatingStore};

/// Сумма свободных мест по всем столам.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemainingCapacity {
    pub seats_empty: i64,
    /// `false`, если столов нет вообще (а не просто все заняты).
    pub has_tables: bool,
}

/// Мьютексы по столам. Создаются лениво при первом обращении.
#[derive(Default)]
struct TableLocks {
    locks: RwLock<HashMap<i64, Arc<Mutex<()>>>>,
}

impl TableLocks {
    async fn lock(&self, table_id: i64) -> OwnedMutexGuard<()> {
        let existing = self.locks.read().await.get(&table_id).cloned();
        let lock = match existing {
            Some(lock) => lock,
            None => self
                .locks
                .write()
                .await
                .entry(table_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone(),
        };
        lock.lock_owned().await
    }
}

fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

fn validate_party(accompanying_guests: i64) -> AllocatorResult<i64> {
    if accompanying_guests < 0 {
        return Err(AllocatorError::Validation(
            "accompanying_guests must be >= 0".to_string(),
        ));
    }
    seats_needed(accompanying_guests)
        .ok_or_else(|| AllocatorError::Validation("accompanying_guests is too large".to_string()))
}

fn validate_name(name: &str) -> AllocatorResult<()> {
    if name.trim().is_empty() {
        return Err(AllocatorError::Validation("name must not be empty".to_string()));
    }
    Ok(())
}

pub struct Allocator {
    store: Arc<dyn SeatingStore>,
    locks: TableLocks,
    clock: fn() -> NaiveDateTime,
}

impl Allocator {
    pub fn new(store: Arc<dyn SeatingStore>) -> Self {
        Self {
            store,
            locks: TableLocks::default(),
            clock: local_now,
        }
    }

    /// Подменяет источник времени прибытия (для тестов).
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    /* ---------- TABLES ---------- */

    pub async fn create_table(&self, capacity: i64) -> AllocatorResult<Table> {
        if capacity < 0 {
            return Err(AllocatorError::Validation("capacity must be >= 0".to_string()));
        }
        let table = self.store.create_table(NewTable { capacity }).await?;
        info!("Table {} created with {} seats", table.id, table.capacity);
        Ok(table)
    }

    pub async fn list_tables(&self) -> AllocatorResult<Vec<Table>> {
        Ok(self.store.list_tables().await?)
    }

    pub async fn get_table(&self, id: i64) -> AllocatorResult<Table> {
        self.store
            .get_table(id)
            .await?
            .ok_or(AllocatorError::TableNotFound(id))
    }

    pub async fn total_remaining_capacity(&self) -> AllocatorResult<RemainingCapacity> {
        let tables = self.store.list_tables().await?;
        let seats_empty = tables
            .iter()
            .try_fold(0i64, |acc, t| acc.checked_add(t.capacity))
            .ok_or_else(|| AllocatorError::Validation("total capacity overflows".to_string()))?;

        Ok(RemainingCapacity {
            seats_empty,
            has_tables: !tables.is_empty(),
        })
    }

    /* ---------- GUEST LIST ---------- */

    pub async fn list_guests(&self) -> AllocatorResult<Vec<Guest>> {
        Ok(self.store.list_guests().await?)
    }

    pub async fn list_arrived_guests(&self) -> AllocatorResult<Vec<Guest>> {
        Ok(self.store.list_arrived_guests().await?)
    }

    async fn find_guest(&self, name: &str) -> AllocatorResult<Guest> {
        self.store
            .get_guest_by_name(name)
            .await?
            .ok_or_else(|| AllocatorError::GuestNotFound(name.to_string()))
    }

    /// Берёт мьютекс стола гостя и перечитывает гостя под ним.
    /// Пока ждали лок, имя могли освободить и забронировать за другим
    /// столом; тогда отпускаем лок и пробуем со свежим `table_id`.
    async fn lock_guest(&self, name: &str) -> AllocatorResult<(OwnedMutexGuard<()>, Guest)> {
        let mut table_id = self.find_guest(name).await?.table_id;
        loop {
            let guard = self.locks.lock(table_id).await;
            let guest = self.find_guest(name).await?;
            if guest.table_id == table_id {
                return Ok((guard, guest));
            }
            debug!(
                "Guest '{}' moved from table {} to {} while waiting, relocking",
                name, table_id, guest.table_id
            );
            table_id = guest.table_id;
        }
    }

    /// Добавляет гостя в список. Места не занимаются, только проверяется,
    /// что компания в принципе помещается за стол сейчас.
    pub async fn reserve(
        &self,
        name: &str,
        table_id: i64,
        accompanying_guests: i64,
    ) -> AllocatorResult<Guest> {
        validate_name(name)?;
        let requested = validate_party(accompanying_guests)?;

        let table = self.get_table(table_id).await?;
        if table.capacity < requested {
            warn!(
                "Reserve '{}' rejected: table {} has {} seats, {} requested",
                name, table.id, table.capacity, requested
            );
            return Err(AllocatorError::CapacityExceeded {
                requested,
                available: table.capacity,
            });
        }

        let guest = self
            .store
            .create_guest(NewGuest {
                name: name.to_string(),
                table_id,
                accompanying_guests,
            })
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => AllocatorError::GuestExists(name.to_string()),
                // стол удалили между проверкой и вставкой
                StoreError::MissingReference(_) => AllocatorError::TableNotFound(table_id),
                other => AllocatorError::Store(other),
            })?;

        info!(
            "Guest '{}' added to the guest list at table {} (+{})",
            guest.name, guest.table_id, guest.accompanying_guests
        );
        Ok(guest)
    }

    /// Убирает из списка гостя, который ещё не пришёл. Capacity не меняется.
    pub async fn cancel_reservation(&self, name: &str) -> AllocatorResult<()> {
        let (_guard, guest) = self.lock_guest(name).await?;
        if guest.status() != GuestStatus::Invited {
            warn!("Cancel '{}' rejected: guest already arrived", name);
            let status = guest.status();
            return Err(AllocatorError::InvalidState {
                name: guest.name,
                status,
            });
        }

        self.store.delete_guest(&guest).await?;
        info!("Reservation for '{}' cancelled", guest.name);
        Ok(())
    }

    /* ---------- DURING THE PARTY ---------- */

    /// Заселение: занимает `accompanying_guests + 1` мест за столом гостя.
    /// Стол и гость записываются одним пакетом.
    pub async fn check_in(&self, name: &str, accompanying_guests: i64) -> AllocatorResult<Guest> {
        let requested = validate_party(accompanying_guests)?;

        let (_guard, mut guest) = self.lock_guest(name).await?;
        if guest.status() == GuestStatus::Arrived {
            warn!("Check-in '{}' rejected: already arrived", name);
            return Err(AllocatorError::InvalidState {
                name: guest.name,
                status: GuestStatus::Arrived,
            });
        }

        let mut table = self.get_table(guest.table_id).await?;
        if table.capacity < requested {
            warn!(
                "Check-in '{}' rejected: table {} has {} seats, {} requested",
                name, table.id, table.capacity, requested
            );
            return Err(AllocatorError::CapacityExceeded {
                requested,
                available: table.capacity,
            });
        }

        table.capacity -= requested;
        guest.accompanying_guests = accompanying_guests;
        guest.arrival_time = Some((self.clock)());

        self.store
            .apply(&[
                Mutation::UpdateTable(table.clone()),
                Mutation::UpdateGuest(guest.clone()),
            ])
            .await?;

        info!(
            "Guest '{}' checked in at table {}, {} seats left",
            guest.name, table.id, table.capacity
        );
        Ok(guest)
    }

    /// Уход: возвращает столу места гостя и удаляет его запись.
    pub async fn check_out(&self, name: &str) -> AllocatorResult<()> {
        let (_guard, guest) = self.lock_guest(name).await?;
        if guest.status() != GuestStatus::Arrived {
            warn!("Check-out '{}' rejected: guest never checked in", name);
            let status = guest.status();
            return Err(AllocatorError::InvalidState {
                name: guest.name,
                status,
            });
        }

        let mut table = self.get_table(guest.table_id).await?;
        table.capacity = guest
            .seats_needed()
            .and_then(|seats| table.capacity.checked_add(seats))
            .ok_or_else(|| AllocatorError::Validation("table capacity overflows".to_string()))?;

        self.store
            .apply(&[
                Mutation::UpdateTable(table.clone()),
                Mutation::DeleteGuest(guest.clone()),
            ])
            .await?;

        info!(
            "Guest '{}' checked out of table {}, {} seats left",
            guest.name, table.id, table.capacity
        );
        Ok(())
    }
}
