use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use servio_core::period::Period;
use servio_core::report::{DailyRow, PeriodMetrics, ProductivityRow, WagesBreakdown};
use servio_domain::dayclose::DayCloseSnapshot;
use servio_store::analytics_repo::AnalyticsRepository;

use crate::auth::Claims;
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/analytics/summary", get(get_summary))
}

#[derive(Debug, Deserialize)]
struct SummaryQuery {
    period: String,
    date: NaiveDate,
}

#[derive(Debug, Serialize)]
struct SummaryResponse {
    period: Period,
    date: NaiveDate,
    metrics: PeriodMetrics,
    daily: Vec<DailyRow>,
    wages: WagesBreakdown,
    day_closes: Vec<DayCloseSnapshot>,
    productivity: Vec<ProductivityRow>,
}

async fn get_summary(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<SummaryResponse>, AppError> {
    let period = Period::parse(&query.period)?;
    let report =
        AnalyticsRepository::summary(&state.db.pool, claims.service_id, period, query.date)
            .await?;

    Ok(Json(SummaryResponse {
        period: report.period,
        date: report.anchor,
        metrics: report.metrics,
        daily: report.daily,
        wages: report.wages,
        day_closes: report.day_closes,
        productivity: report.productivity,
    }))
}
