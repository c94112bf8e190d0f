use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};

/// One persisted reconciliation ("shift") for a (service, date, shift_index)
/// triple. shift_index starts at 0 and increments per additional shift
/// closed the same day; snapshots are append-only and mutated only through
/// the reason-logged edit path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayCloseSnapshot {
    pub id: Uuid,
    pub service_id: Uuid,
    pub close_date: NaiveDate,
    pub shift_index: i32,

    // Raw aggregates at the time of the (re)computation.
    pub service_income: f64,
    pub part_sales_income: f64,
    pub material_expense: f64,

    // Declared payment split. kaspi + cash <= service + parts, always.
    pub kaspi_amount: f64,
    pub cash_amount: f64,

    pub opex_lunch: f64,
    pub opex_transport: f64,
    pub opex_rent: f64,

    pub kaspi_tax_percent: f64,
    pub kaspi_tax_amount: f64,

    pub charity_percent: f64,
    pub charity_raw: f64,
    pub charity_rounded: f64,

    pub net_before_charity: f64,
    pub distributable_after_charity: f64,

    pub manager_percent: f64,
    pub manager_amount: f64,
    pub masters_percent: f64,
    pub masters_pool: f64,
    pub owner_percent: f64,
    pub owner_service_dividend: f64,
    pub owner_parts_dividend: f64,

    pub edit_reason: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row per present worker per snapshot. A NULL percent means the
/// equal-split path produced the row; a non-NULL percent means a manual
/// distribution was supplied (and then every present worker has one).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayCloseMasterShare {
    pub id: Uuid,
    pub day_close_id: Uuid,
    pub master_id: Uuid,
    pub amount: f64,
    pub percent: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MasterPercent {
    pub master_id: Uuid,
    pub percent: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDayCloseRequest {
    pub date: NaiveDate,
    pub kaspi_amount: f64,
    /// Defaults to max(income_total - kaspi_amount, 0) when omitted.
    pub cash_amount: Option<f64>,
    #[serde(default)]
    pub opex_lunch: f64,
    #[serde(default)]
    pub opex_transport: f64,
    #[serde(default)]
    pub opex_rent: f64,
    #[serde(default)]
    pub present_master_ids: Vec<Uuid>,
    #[serde(default)]
    pub manual_master_distribution: bool,
    #[serde(default)]
    pub master_percents: Vec<MasterPercent>,
}

/// Edit payload: every field optional, stored values used as defaults.
/// The reason is mandatory and recorded on the snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDayCloseRequest {
    pub edit_reason: Option<String>,
    pub kaspi_amount: Option<f64>,
    pub cash_amount: Option<f64>,
    pub opex_lunch: Option<f64>,
    pub opex_transport: Option<f64>,
    pub opex_rent: Option<f64>,
    pub present_master_ids: Option<Vec<Uuid>>,
    pub manual_master_distribution: Option<bool>,
    pub master_percents: Option<Vec<MasterPercent>>,
}

/// Live aggregates for a date, always recomputed from the booking rows
/// regardless of any snapshot.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DayAggregates {
    pub service_income: f64,
    pub material_expense: f64,
    pub part_sales_income: f64,
}
