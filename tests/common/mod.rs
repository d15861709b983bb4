#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tower::ServiceExt;

use guest_list::error::{StoreError, StoreResult};
use guest_list::models::{Guest, NewGuest, NewTable, Table};
use guest_list::store::{GuestStore, MemoryStore, Mutation, SeatingStore, TableStore};
use guest_list::{controllers, AppState};

/// Router поверх хранилища в памяти.
pub fn test_app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let app = controllers::app(AppState::with_store(store.clone()));
    (app, store)
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

/// Хранилище, у которого можно "уронить" пакетную запись.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_apply: AtomicBool,
}

impl FlakyStore {
    pub fn fail_writes(&self, fail: bool) {
        self.fail_apply.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TableStore for FlakyStore {
    async fn get_table(&self, id: i64) -> StoreResult<Option<Table>> {
        self.inner.get_table(id).await
    }

    async fn list_tables(&self) -> StoreResult<Vec<Table>> {
        self.inner.list_tables().await
    }

    async fn create_table(&self, table: NewTable) -> StoreResult<Table> {
        self.inner.create_table(table).await
    }

    async fn update_table(&self, table: &Table) -> StoreResult<()> {
        self.inner.update_table(table).await
    }

    async fn delete_table(&self, table: &Table) -> StoreResult<()> {
        self.inner.delete_table(table).await
    }
}

#[async_trait]
impl GuestStore for FlakyStore {
    async fn get_guest(&self, id: i64) -> StoreResult<Option<Guest>> {
        self.inner.get_guest(id).await
    }

    async fn get_guest_by_name(&self, name: &str) -> StoreResult<Option<Guest>> {
        self.inner.get_guest_by_name(name).await
    }

    async fn list_guests(&self) -> StoreResult<Vec<Guest>> {
        self.inner.list_guests().await
    }

    async fn list_arrived_guests(&self) -> StoreResult<Vec<Guest>> {
        self.inner.list_arrived_guests().await
    }

    async fn create_guest(&self, guest: NewGuest) -> StoreResult<Guest> {
        self.inner.create_guest(guest).await
    }

    async fn update_guest(&self, guest: &Guest) -> StoreResult<()> {
        self.inner.update_guest(guest).await
    }

    async fn delete_guest(&self, guest: &Guest) -> StoreResult<()> {
        self.inner.delete_guest(guest).await
    }
}

#[async_trait]
impl SeatingStore for FlakyStore {
    async fn apply(&self, batch: &[Mutation]) -> StoreResult<()> {
        if self.fail_apply.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        self.inner.apply(batch).await
    }
}

/// Точка остановки: первый подходящий вызов сообщает `reached`
/// и ждёт `release`, прежде чем вернуть уже прочитанный результат.
struct Gate {
    reached: oneshot::Sender<()>,
    release: oneshot::Receiver<()>,
}

/// Хранилище, которое может придержать чтение гостя или стола,
/// чтобы тест успел поменять данные между чтением и локом.
#[derive(Default)]
pub struct GatedStore {
    pub inner: MemoryStore,
    guest_gate: Mutex<Option<(String, Gate)>>,
    table_gate: Mutex<Option<(i64, Gate)>>,
}

/// Ручки остановленного вызова.
pub struct Paused {
    pub reached: oneshot::Receiver<()>,
    pub release: oneshot::Sender<()>,
}

fn gate() -> (Gate, Paused) {
    let (reached_tx, reached_rx) = oneshot::channel();
    let (release_tx, release_rx) = oneshot::channel();
    (
        Gate { reached: reached_tx, release: release_rx },
        Paused { reached: reached_rx, release: release_tx },
    )
}

impl GatedStore {
    pub fn pause_guest_lookup(&self, name: &str) -> Paused {
        let (gate, paused) = gate();
        *self.guest_gate.lock().unwrap() = Some((name.to_string(), gate));
        paused
    }

    pub fn pause_table_lookup(&self, id: i64) -> Paused {
        let (gate, paused) = gate();
        *self.table_gate.lock().unwrap() = Some((id, gate));
        paused
    }
}

async fn hold(gate: Option<Gate>) {
    if let Some(gate) = gate {
        let _ = gate.reached.send(());
        let _ = gate.release.await;
    }
}

#[async_trait]
impl TableStore for GatedStore {
    async fn get_table(&self, id: i64) -> StoreResult<Option<Table>> {
        let result = self.inner.get_table(id).await;
        let gate = {
            let mut slot = self.table_gate.lock().unwrap();
            let hit = matches!(slot.as_ref(), Some((gated, _)) if *gated == id);
            if hit {
                slot.take().map(|(_, g)| g)
            } else {
                None
            }
        };
        hold(gate).await;
        result
    }

    async fn list_tables(&self) -> StoreResult<Vec<Table>> {
        self.inner.list_tables().await
    }

    async fn create_table(&self, table: NewTable) -> StoreResult<Table> {
        self.inner.create_table(table).await
    }

    async fn update_table(&self, table: &Table) -> StoreResult<()> {
        self.inner.update_table(table).await
    }

    async fn delete_table(&self, table: &Table) -> StoreResult<()> {
        self.inner.delete_table(table).await
    }
}

#[async_trait]
impl GuestStore for GatedStore {
    async fn get_guest(&self, id: i64) -> StoreResult<Option<Guest>> {
        self.inner.get_guest(id).await
    }

    async fn get_guest_by_name(&self, name: &str) -> StoreResult<Option<Guest>> {
        let result = self.inner.get_guest_by_name(name).await;
        let gate = {
            let mut slot = self.guest_gate.lock().unwrap();
            let hit = matches!(slot.as_ref(), Some((gated, _)) if gated.as_str() == name);
            if hit {
                slot.take().map(|(_, g)| g)
            } else {
                None
            }
        };
        hold(gate).await;
        result
    }

    async fn list_guests(&self) -> StoreResult<Vec<Guest>> {
        self.inner.list_guests().await
    }

    async fn list_arrived_guests(&self) -> StoreResult<Vec<Guest>> {
        self.inner.list_arrived_guests().await
    }

    async fn create_guest(&self, guest: NewGuest) -> StoreResult<Guest> {
        self.inner.create_guest(guest).await
    }

    async fn update_guest(&self, guest: &Guest) -> StoreResult<()> {
        self.inner.update_guest(guest).await
    }

    async fn delete_guest(&self, guest: &Guest) -> StoreResult<()> {
        self.inner.delete_guest(guest).await
    }
}

#[async_trait]
impl SeatingStore for GatedStore {
    async fn apply(&self, batch: &[Mutation]) -> StoreResult<()> {
        self.inner.apply(batch).await
    }
}
