//! guests.rs
//!
//! Список гостей до вечеринки и заселение/уход во время неё.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use super::ApiError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        // до вечеринки
        .route("/guest_list", get(get_guest_list))
        .route("/guest_list/{name}", post(add_to_guest_list).delete(cancel_reservation))
        // во время вечеринки
        .route("/guests", get(get_arrived_guests))
        .route("/guests/{name}", put(check_in).delete(check_out))
}

/* ---------- GUEST LIST ---------- */

#[derive(Debug, Serialize, Deserialize)]
pub struct GuestListItem {
    pub id: i64,
    pub name: String,
    pub table_id: i64,
    pub accompanying_guests: i64,
}

// GET /guest_list
async fn get_guest_list(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let guests = state.allocator.list_guests().await?;
    let payload: Vec<GuestListItem> = guests
        .into_iter()
        .map(|g| GuestListItem {
            id: g.id,
            name: g.name,
            table_id: g.table_id,
            accompanying_guests: g.accompanying_guests,
        })
        .collect();
    Ok((StatusCode::OK, Json(payload)))
}

// POST /guest_list/{name}
#[derive(Debug, Deserialize, Validate)]
pub struct ReserveRequest {
    // несуществующий стол (в том числе 0 и отрицательные id) - это 404 от распределителя
    pub table_id: i64,
    #[validate(range(min = 0))]
    pub accompanying_guests: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReserveResponse {
    pub name: String,
    pub accompanying_guests: i64,
}

async fn add_to_guest_list(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    payload: Result<Json<ReserveRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    req.validate()?;

    let guest = state
        .allocator
        .reserve(&name, req.table_id, req.accompanying_guests)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ReserveResponse {
            name: guest.name,
            accompanying_guests: guest.accompanying_guests,
        }),
    ))
}

// DELETE /guest_list/{name}
async fn cancel_reservation(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.allocator.cancel_reservation(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/* ---------- ARRIVED GUESTS ---------- */

#[derive(Debug, Serialize, Deserialize)]
pub struct ArrivedGuest {
    pub name: String,
    pub accompanying_guests: i64,
    pub time_arrived: String,
}

// GET /guests
async fn get_arrived_guests(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let guests = state.allocator.list_arrived_guests().await?;
    let payload: Vec<ArrivedGuest> = guests
        .into_iter()
        .filter_map(|g| {
            let time_arrived = g.time_arrived()?;
            Some(ArrivedGuest {
                name: g.name,
                accompanying_guests: g.accompanying_guests,
                time_arrived,
            })
        })
        .collect();
    Ok((StatusCode::OK, Json(payload)))
}

// PUT /guests/{name}
#[derive(Debug, Deserialize, Validate)]
pub struct CheckInRequest {
    #[validate(range(min = 0))]
    pub accompanying_guests: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckInResponse {
    pub name: String,
}

async fn check_in(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    payload: Result<Json<CheckInRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    req.validate()?;

    let guest = state.allocator.check_in(&name, req.accompanying_guests).await?;
    Ok((StatusCode::OK, Json(CheckInResponse { name: guest.name })))
}

// DELETE /guests/{name}
async fn check_out(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.allocator.check_out(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}
