//! error.rs
//!
//! Ошибки хранилища и распределителя мест.

use thiserror::Error;

use crate::models::GuestStatus;

/// Ошибки слоя хранения.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Record not found")]
    NotFound,

    /// Нарушение уникальности, например повторное имя гостя
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Запись ссылается на несуществующую, например гость на удалённый стол
    #[error("Missing reference: {0}")]
    MissingReference(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Ошибки операций над гостями и столами.
#[derive(Debug, Error)]
pub enum AllocatorError {
    #[error("Table {0} not found")]
    TableNotFound(i64),

    #[error("Guest '{0}' not found")]
    GuestNotFound(String),

    #[error("Guest '{0}' is already on the guest list")]
    GuestExists(String),

    #[error("Too many guests: {requested} seats requested, {available} available")]
    CapacityExceeded { requested: i64, available: i64 },

    #[error("Guest '{name}' is {status}")]
    InvalidState { name: String, status: GuestStatus },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AllocatorError {
    /// Стабильный код ошибки для клиентов и логов.
    pub fn kind(&self) -> &'static str {
        match self {
            AllocatorError::TableNotFound(_) | AllocatorError::GuestNotFound(_) => "not_found",
            AllocatorError::GuestExists(_) => "conflict",
            AllocatorError::CapacityExceeded { .. } => "capacity_exceeded",
            AllocatorError::InvalidState { .. } => "invalid_state",
            AllocatorError::Validation(_) => "validation",
            AllocatorError::Store(_) => "store",
        }
    }

    /// Сообщение для клиента, без деталей SQL.
    pub fn client_message(&self) -> String {
        match self {
            AllocatorError::Store(StoreError::Database(_)) => "Internal server error".to_string(),
            AllocatorError::Store(StoreError::Unavailable(_)) => "Storage unavailable".to_string(),
            _ => self.to_string(),
        }
    }
}

pub type AllocatorResult<T> = Result<T, AllocatorError>;
