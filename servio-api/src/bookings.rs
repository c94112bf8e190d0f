use axum::{
    extract::{Path, State},
    routing::post,
    Extension, Json, Router,
};
use uuid::Uuid;

use servio_domain::booking::{Booking, CompleteBookingRequest};
use servio_store::booking_repo::BookingRepository;

use crate::auth::Claims;
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/bookings/{id}/complete", post(complete_booking))
}

/// Transitions an in-progress booking to completed, recording payment,
/// materials, warranties and part sales in one transaction.
async fn complete_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
    Json(req): Json<CompleteBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking =
        BookingRepository::complete_booking(&state.db.pool, claims.service_id, booking_id, &req)
            .await?;
    Ok(Json(booking))
}
