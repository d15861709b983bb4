//! tables.rs
//!
//! Столы: создание, просмотр и подсчёт свободных мест.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use super::ApiError;
use crate::models::Table;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tables", get(get_tables).post(create_table))
        .route("/tables/{id}", get(get_table))
        .route("/seats_empty", get(get_seats_empty))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTableRequest {
    #[validate(range(min = 0))]
    pub capacity: i64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableResponse {
    pub id: i64,
    pub capacity: i64,
}

impl From<Table> for TableResponse {
    fn from(t: Table) -> Self {
        TableResponse { id: t.id, capacity: t.capacity }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SeatsEmptyResponse {
    pub seats_empty: i64,
}

// GET /tables
async fn get_tables(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let tables = state.allocator.list_tables().await?;
    let payload: Vec<TableResponse> = tables.into_iter().map(TableResponse::from).collect();
    Ok((StatusCode::OK, Json(payload)))
}

// GET /tables/{id}
async fn get_table(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let table = state.allocator.get_table(id).await?;
    Ok((StatusCode::OK, Json(TableResponse::from(table))))
}

// POST /tables
async fn create_table(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateTableRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    req.validate()?;

    let table = state.allocator.create_table(req.capacity).await?;
    Ok((StatusCode::CREATED, Json(TableResponse::from(table))))
}

// GET /seats_empty
async fn get_seats_empty(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let remaining = state.allocator.total_remaining_capacity().await?;
    if !remaining.has_tables {
        tracing::info!("seats_empty: no tables configured yet");
    }
    Ok((StatusCode::OK, Json(SeatsEmptyResponse { seats_empty: remaining.seats_empty })))
}
