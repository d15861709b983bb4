//! memory.rs
//!
//! Хранилище в памяти процесса. Используется в тестах и при
//! `STORE_BACKEND=memory`.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{GuestStore, Mutation, SeatingStore, TableStore};
use crate::error::{StoreError, StoreResult};
use crate::models::{Guest, NewGuest, NewTable, Table};

#[derive(Debug, Default)]
struct Inner {
    tables: BTreeMap<i64, Table>,
    guests: BTreeMap<i64, Guest>,
    next_table_id: i64,
    next_guest_id: i64,
}

impl Inner {
    fn guest_name_taken(&self, name: &str, except_id: Option<i64>) -> bool {
        self.guests
            .values()
            .any(|g| g.name == name && Some(g.id) != except_id)
    }

    // Проверка без изменений: пакет применяется, только если проходит целиком
    fn check(&self, mutation: &Mutation) -> StoreResult<()> {
        match mutation {
            Mutation::UpdateTable(t) => {
                if !self.tables.contains_key(&t.id) {
                    return Err(StoreError::NotFound);
                }
                if t.capacity < 0 {
                    return Err(StoreError::Conflict(format!("table {} capacity below zero", t.id)));
                }
            }
            Mutation::UpdateGuest(g) => {
                if !self.guests.contains_key(&g.id) {
                    return Err(StoreError::NotFound);
                }
                if self.guest_name_taken(&g.name, Some(g.id)) {
                    return Err(StoreError::Conflict(format!("guest name '{}' is taken", g.name)));
                }
            }
            Mutation::DeleteGuest(g) => {
                if !self.guests.contains_key(&g.id) {
                    return Err(StoreError::NotFound);
                }
            }
        }
        Ok(())
    }

    fn commit(&mut self, mutation: &Mutation) {
        match mutation {
            Mutation::UpdateTable(t) => {
                self.tables.insert(t.id, t.clone());
            }
            Mutation::UpdateGuest(g) => {
                self.guests.insert(g.id, g.clone());
            }
            Mutation::DeleteGuest(g) => {
                self.guests.remove(&g.id);
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn get_table(&self, id: i64) -> StoreResult<Option<Table>> {
        Ok(self.inner.read().await.tables.get(&id).cloned())
    }

    async fn list_tables(&self) -> StoreResult<Vec<Table>> {
        Ok(self.inner.read().await.tables.values().cloned().collect())
    }

    async fn create_table(&self, table: NewTable) -> StoreResult<Table> {
        let mut inner = self.inner.write().await;
        inner.next_table_id += 1;
        let table = Table {
            id: inner.next_table_id,
            capacity: table.capacity,
        };
        inner.tables.insert(table.id, table.clone());
        Ok(table)
    }

    async fn update_table(&self, table: &Table) -> StoreResult<()> {
        self.apply(&[Mutation::UpdateTable(table.clone())]).await
    }

    async fn delete_table(&self, table: &Table) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.guests.values().any(|g| g.table_id == table.id) {
            return Err(StoreError::Conflict(format!("table {} has guests", table.id)));
        }
        inner
            .tables
            .remove(&table.id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl GuestStore for MemoryStore {
    async fn get_guest(&self, id: i64) -> StoreResult<Option<Guest>> {
        Ok(self.inner.read().await.guests.get(&id).cloned())
    }

    async fn get_guest_by_name(&self, name: &str) -> StoreResult<Option<Guest>> {
        Ok(self
            .inner
            .read()
            .await
            .guests
            .values()
            .find(|g| g.name == name)
            .cloned())
    }

    async fn list_guests(&self) -> StoreResult<Vec<Guest>> {
        Ok(self.inner.read().await.guests.values().cloned().collect())
    }

    async fn list_arrived_guests(&self) -> StoreResult<Vec<Guest>> {
        Ok(self
            .inner
            .read()
            .await
            .guests
            .values()
            .filter(|g| g.arrival_time.is_some())
            .cloned()
            .collect())
    }

    async fn create_guest(&self, guest: NewGuest) -> StoreResult<Guest> {
        let mut inner = self.inner.write().await;
        if !inner.tables.contains_key(&guest.table_id) {
            return Err(StoreError::MissingReference(format!(
                "table {} does not exist",
                guest.table_id
            )));
        }
        if inner.guest_name_taken(&guest.name, None) {
            return Err(StoreError::Conflict(format!("guest name '{}' is taken", guest.name)));
        }
        inner.next_guest_id += 1;
        let guest = Guest {
            id: inner.next_guest_id,
            name: guest.name,
            table_id: guest.table_id,
            accompanying_guests: guest.accompanying_guests,
            arrival_time: None,
        };
        inner.guests.insert(guest.id, guest.clone());
        Ok(guest)
    }

    async fn update_guest(&self, guest: &Guest) -> StoreResult<()> {
        self.apply(&[Mutation::UpdateGuest(guest.clone())]).await
    }

    async fn delete_guest(&self, guest: &Guest) -> StoreResult<()> {
        self.apply(&[Mutation::DeleteGuest(guest.clone())]).await
    }
}

#[async_trait]
impl SeatingStore for MemoryStore {
    async fn apply(&self, batch: &[Mutation]) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        for mutation in batch {
            inner.check(mutation)?;
        }
        for mutation in batch {
            inner.commit(mutation);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ids_are_assigned_sequentially() {
        let store = MemoryStore::new();
        let a = store.create_table(NewTable { capacity: 10 }).await.unwrap();
        let b = store.create_table(NewTable { capacity: 4 }).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(store.list_tables().await.unwrap(), vec![a, b]);
    }

    #[tokio::test]
    async fn duplicate_guest_name_is_a_conflict() {
        let store = MemoryStore::new();
        let table = store.create_table(NewTable { capacity: 10 }).await.unwrap();
        let new_guest = NewGuest {
            name: "John".to_string(),
            table_id: table.id,
            accompanying_guests: 2,
        };

        store.create_guest(new_guest.clone()).await.unwrap();
        let err = store.create_guest(new_guest).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn guest_at_missing_table_is_a_missing_reference() {
        let store = MemoryStore::new();
        let err = store
            .create_guest(NewGuest {
                name: "John".to_string(),
                table_id: 7,
                accompanying_guests: 0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingReference(_)));
        assert!(store.list_guests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_batch_leaves_state_untouched() {
        let store = MemoryStore::new();
        let table = store.create_table(NewTable { capacity: 10 }).await.unwrap();
        let ghost = Guest {
            id: 42,
            name: "Ghost".to_string(),
            table_id: table.id,
            accompanying_guests: 0,
            arrival_time: None,
        };

        let err = store
            .apply(&[
                Mutation::UpdateTable(Table { id: table.id, capacity: 1 }),
                Mutation::UpdateGuest(ghost),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::NotFound));
        assert_eq!(store.get_table(table.id).await.unwrap(), Some(table));
    }

    #[tokio::test]
    async fn arrived_guests_are_filtered() {
        let store = MemoryStore::new();
        let table = store.create_table(NewTable { capacity: 10 }).await.unwrap();
        let mut john = store
            .create_guest(NewGuest {
                name: "John".to_string(),
                table_id: table.id,
                accompanying_guests: 1,
            })
            .await
            .unwrap();
        store
            .create_guest(NewGuest {
                name: "Sara".to_string(),
                table_id: table.id,
                accompanying_guests: 0,
            })
            .await
            .unwrap();

        john.arrival_time = Some(chrono::Local::now().naive_local());
        store.update_guest(&john).await.unwrap();

        assert_eq!(store.get_guest(john.id).await.unwrap(), Some(john.clone()));

        let arrived = store.list_arrived_guests().await.unwrap();
        assert_eq!(arrived, vec![john]);
        assert_eq!(store.list_guests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn table_with_guests_cannot_be_deleted() {
        let store = MemoryStore::new();
        let table = store.create_table(NewTable { capacity: 3 }).await.unwrap();
        let guest = store
            .create_guest(NewGuest {
                name: "Hannah".to_string(),
                table_id: table.id,
                accompanying_guests: 0,
            })
            .await
            .unwrap();

        assert!(matches!(
            store.delete_table(&table).await,
            Err(StoreError::Conflict(_))
        ));

        store.delete_guest(&guest).await.unwrap();
        store.delete_table(&table).await.unwrap();
        assert_eq!(store.get_table(table.id).await.unwrap(), None);
    }
}
