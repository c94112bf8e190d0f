use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use servio_domain::dayclose::{
    CreateDayCloseRequest, DayAggregates, DayCloseMasterShare, DayCloseSnapshot,
    UpdateDayCloseRequest,
};
use servio_store::dayclose_repo::DayCloseRepository;
use servio_store::settings_repo::SettingsRepository;

use crate::auth::Claims;
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/day-close", post(create_day_close))
        .route("/v1/day-close", get(get_day_close))
        .route("/v1/day-close/{id}", put(update_day_close))
}

#[derive(Debug, Serialize)]
struct DayCloseResponse {
    snapshot: DayCloseSnapshot,
    master_shares: Vec<DayCloseMasterShare>,
    aggregates: DayAggregates,
}

async fn create_day_close(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateDayCloseRequest>,
) -> Result<Json<DayCloseResponse>, AppError> {
    let settings = SettingsRepository::fetch(&state.db.pool, claims.service_id).await?;
    let bundle = DayCloseRepository::create(
        &state.db.pool,
        claims.service_id,
        claims.sub,
        &req,
        &settings,
    )
    .await?;

    Ok(Json(DayCloseResponse {
        snapshot: bundle.snapshot,
        master_shares: bundle.master_shares,
        aggregates: bundle.aggregates,
    }))
}

async fn update_day_close(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(snapshot_id): Path<Uuid>,
    Json(req): Json<UpdateDayCloseRequest>,
) -> Result<Json<DayCloseResponse>, AppError> {
    let settings = SettingsRepository::fetch(&state.db.pool, claims.service_id).await?;
    let bundle = DayCloseRepository::update(
        &state.db.pool,
        claims.service_id,
        snapshot_id,
        &req,
        &settings,
    )
    .await?;

    Ok(Json(DayCloseResponse {
        snapshot: bundle.snapshot,
        master_shares: bundle.master_shares,
        aggregates: bundle.aggregates,
    }))
}

#[derive(Debug, Deserialize)]
struct GetDayCloseQuery {
    date: NaiveDate,
    shift_index: Option<i32>,
}

#[derive(Debug, Serialize)]
struct DayCloseByDateResponse {
    aggregates: DayAggregates,
    shift_indices: Vec<i32>,
    snapshot: Option<DayCloseSnapshot>,
    master_shares: Vec<DayCloseMasterShare>,
}

async fn get_day_close(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<GetDayCloseQuery>,
) -> Result<Json<DayCloseByDateResponse>, AppError> {
    let day = DayCloseRepository::get_by_date(
        &state.db.pool,
        claims.service_id,
        query.date,
        query.shift_index,
    )
    .await?;

    Ok(Json(DayCloseByDateResponse {
        aggregates: day.aggregates,
        shift_indices: day.shift_indices,
        snapshot: day.snapshot,
        master_shares: day.master_shares,
    }))
}
