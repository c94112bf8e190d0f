use axum::{
    extract::State,
    routing::{get, put},
    Extension, Json, Router,
};

use servio_domain::settings::ShopSettings;
use servio_store::settings_repo::SettingsRepository;

use crate::auth::Claims;
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/settings", get(get_settings))
        .route("/v1/settings", put(put_settings))
}

async fn get_settings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ShopSettings>, AppError> {
    let settings = SettingsRepository::fetch(&state.db.pool, claims.service_id).await?;
    Ok(Json(settings))
}

/// The masters+owner=100 invariant is enforced inside the save, so bad
/// splits never reach the table.
async fn put_settings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(settings): Json<ShopSettings>,
) -> Result<Json<ShopSettings>, AppError> {
    SettingsRepository::save(&state.db.pool, claims.service_id, &settings).await?;
    Ok(Json(settings))
}
