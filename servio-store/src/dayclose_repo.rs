//! Day-close snapshot persistence: append-only shift creation, the
//! reason-logged edit path, and the by-date read. Shift-index assignment is
//! serialized per (tenant, date) with an advisory transaction lock; the
//! unique index on the triple backs it up and surfaces as a conflict.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use servio_core::close::{
    compute_breakdown, distribute_masters, require_edit_reason, CloseBreakdown, CloseInputs,
};
use servio_core::CoreError;
use servio_domain::dayclose::{
    CreateDayCloseRequest, DayAggregates, DayCloseMasterShare, DayCloseSnapshot, MasterPercent,
    UpdateDayCloseRequest,
};
use servio_domain::settings::ShopSettings;

use crate::booking_repo::BookingRepository;
use crate::{conflict_on_unique, require_tenant, StoreResult};

pub struct DayCloseRepository;

#[derive(Debug, Clone)]
pub struct DayCloseBundle {
    pub snapshot: DayCloseSnapshot,
    pub master_shares: Vec<DayCloseMasterShare>,
    pub aggregates: DayAggregates,
}

/// Read result for a date: live aggregates plus the requested (or first)
/// snapshot, if any shift was closed.
#[derive(Debug, Clone)]
pub struct DayCloseByDate {
    pub aggregates: DayAggregates,
    pub shift_indices: Vec<i32>,
    pub snapshot: Option<DayCloseSnapshot>,
    pub master_shares: Vec<DayCloseMasterShare>,
}

#[derive(sqlx::FromRow)]
struct SnapshotRow {
    id: Uuid,
    service_id: Uuid,
    close_date: NaiveDate,
    shift_index: i32,
    service_income: f64,
    part_sales_income: f64,
    material_expense: f64,
    kaspi_amount: f64,
    cash_amount: f64,
    opex_lunch: f64,
    opex_transport: f64,
    opex_rent: f64,
    kaspi_tax_percent: f64,
    kaspi_tax_amount: f64,
    charity_percent: f64,
    charity_raw: f64,
    charity_rounded: f64,
    net_before_charity: f64,
    distributable_after_charity: f64,
    manager_percent: f64,
    manager_amount: f64,
    masters_percent: f64,
    masters_pool: f64,
    owner_percent: f64,
    owner_service_dividend: f64,
    owner_parts_dividend: f64,
    edit_reason: Option<String>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SnapshotRow> for DayCloseSnapshot {
    fn from(row: SnapshotRow) -> Self {
        DayCloseSnapshot {
            id: row.id,
            service_id: row.service_id,
            close_date: row.close_date,
            shift_index: row.shift_index,
            service_income: row.service_income,
            part_sales_income: row.part_sales_income,
            material_expense: row.material_expense,
            kaspi_amount: row.kaspi_amount,
            cash_amount: row.cash_amount,
            opex_lunch: row.opex_lunch,
            opex_transport: row.opex_transport,
            opex_rent: row.opex_rent,
            kaspi_tax_percent: row.kaspi_tax_percent,
            kaspi_tax_amount: row.kaspi_tax_amount,
            charity_percent: row.charity_percent,
            charity_raw: row.charity_raw,
            charity_rounded: row.charity_rounded,
            net_before_charity: row.net_before_charity,
            distributable_after_charity: row.distributable_after_charity,
            manager_percent: row.manager_percent,
            manager_amount: row.manager_amount,
            masters_percent: row.masters_percent,
            masters_pool: row.masters_pool,
            owner_percent: row.owner_percent,
            owner_service_dividend: row.owner_service_dividend,
            owner_parts_dividend: row.owner_parts_dividend,
            edit_reason: row.edit_reason,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ShareRow {
    id: Uuid,
    day_close_id: Uuid,
    master_id: Uuid,
    amount: f64,
    percent: Option<f64>,
}

const SELECT_SNAPSHOT: &str = r#"
    SELECT id, service_id, close_date, shift_index, service_income,
           part_sales_income, material_expense, kaspi_amount, cash_amount,
           opex_lunch, opex_transport, opex_rent, kaspi_tax_percent,
           kaspi_tax_amount, charity_percent, charity_raw, charity_rounded,
           net_before_charity, distributable_after_charity, manager_percent,
           manager_amount, masters_percent, masters_pool, owner_percent,
           owner_service_dividend, owner_parts_dividend, edit_reason,
           created_by, created_at, updated_at
    FROM day_close
"#;

impl DayCloseRepository {
    /// Closes one more shift for the date: aggregates the day, runs the
    /// breakdown and distribution, and appends the snapshot with
    /// shift_index = max(existing) + 1.
    pub async fn create(
        pool: &PgPool,
        service_id: Uuid,
        acting_user: Uuid,
        req: &CreateDayCloseRequest,
        settings: &ShopSettings,
    ) -> StoreResult<DayCloseBundle> {
        require_tenant(service_id);

        let mut tx = pool.begin().await?;

        // Serializes concurrent closes of the same tenant+date; released at
        // commit/rollback.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(format!("day_close:{}:{}", service_id, req.date))
            .execute(&mut *tx)
            .await?;

        let aggregates =
            BookingRepository::day_aggregates(&mut *tx, service_id, req.date).await?;

        let inputs = CloseInputs {
            kaspi_amount: req.kaspi_amount,
            cash_amount: req.cash_amount,
            opex_lunch: req.opex_lunch,
            opex_transport: req.opex_transport,
            opex_rent: req.opex_rent,
        };
        let breakdown = compute_breakdown(aggregates, &inputs, settings)?;

        let manual = (req.manual_master_distribution && !req.master_percents.is_empty())
            .then_some(req.master_percents.as_slice());
        let shares = distribute_masters(breakdown.masters_pool, &req.present_master_ids, manual)?;

        let shift_index: i32 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(MAX(shift_index), -1) + 1
            FROM day_close
            WHERE service_id = $1 AND close_date = $2
            "#,
        )
        .bind(service_id)
        .bind(req.date)
        .fetch_one(&mut *tx)
        .await?;

        let now = Utc::now();
        let snapshot = snapshot_from_parts(
            Uuid::new_v4(),
            service_id,
            req.date,
            shift_index,
            aggregates,
            &inputs,
            &breakdown,
            settings,
            None,
            acting_user,
            now,
            now,
        );

        insert_snapshot(&mut tx, &snapshot).await?;
        let master_shares = insert_shares(&mut tx, snapshot.id, &shares).await?;

        tx.commit().await?;

        info!(
            service_id = %service_id,
            date = %req.date,
            shift_index,
            distributable = snapshot.distributable_after_charity,
            "day close created"
        );

        Ok(DayCloseBundle {
            snapshot,
            master_shares,
            aggregates,
        })
    }

    /// Reason-logged edit: re-resolves live aggregates and current settings,
    /// merges overrides over stored values, recomputes every derived column
    /// and fully replaces the share rows. shift_index and date never change.
    pub async fn update(
        pool: &PgPool,
        service_id: Uuid,
        snapshot_id: Uuid,
        req: &UpdateDayCloseRequest,
        settings: &ShopSettings,
    ) -> StoreResult<DayCloseBundle> {
        require_tenant(service_id);

        let reason = require_edit_reason(req.edit_reason.as_deref())?;

        let mut tx = pool.begin().await?;

        let row: Option<SnapshotRow> =
            sqlx::query_as(&format!("{SELECT_SNAPSHOT} WHERE id = $1 AND service_id = $2 FOR UPDATE"))
                .bind(snapshot_id)
                .bind(service_id)
                .fetch_optional(&mut *tx)
                .await?;
        let stored: DayCloseSnapshot = row
            .ok_or_else(|| CoreError::NotFound("day close not found".into()))?
            .into();

        let stored_shares: Vec<ShareRow> = sqlx::query_as(
            "SELECT id, day_close_id, master_id, amount, percent FROM day_close_masters WHERE day_close_id = $1",
        )
        .bind(snapshot_id)
        .fetch_all(&mut *tx)
        .await?;

        let aggregates =
            BookingRepository::day_aggregates(&mut *tx, service_id, stored.close_date).await?;

        let inputs = CloseInputs {
            kaspi_amount: req.kaspi_amount.unwrap_or(stored.kaspi_amount),
            cash_amount: Some(req.cash_amount.unwrap_or(stored.cash_amount)),
            opex_lunch: req.opex_lunch.unwrap_or(stored.opex_lunch),
            opex_transport: req.opex_transport.unwrap_or(stored.opex_transport),
            opex_rent: req.opex_rent.unwrap_or(stored.opex_rent),
        };
        let breakdown = compute_breakdown(aggregates, &inputs, settings)?;

        let present: Vec<Uuid> = match &req.present_master_ids {
            Some(ids) => ids.clone(),
            None => stored_shares.iter().map(|s| s.master_id).collect(),
        };
        let stored_percents: Vec<MasterPercent> = stored_shares
            .iter()
            .filter_map(|s| {
                s.percent.map(|percent| MasterPercent {
                    master_id: s.master_id,
                    percent,
                })
            })
            .collect();
        let manual_requested = req
            .manual_master_distribution
            .unwrap_or(!stored_percents.is_empty());
        let percents = req.master_percents.as_ref().unwrap_or(&stored_percents);
        let manual = (manual_requested && !percents.is_empty()).then_some(percents.as_slice());

        let shares = distribute_masters(breakdown.masters_pool, &present, manual)?;

        let snapshot = snapshot_from_parts(
            stored.id,
            service_id,
            stored.close_date,
            stored.shift_index,
            aggregates,
            &inputs,
            &breakdown,
            settings,
            Some(reason),
            stored.created_by,
            stored.created_at,
            Utc::now(),
        );

        sqlx::query(
            r#"
            UPDATE day_close
            SET service_income = $1, part_sales_income = $2, material_expense = $3,
                kaspi_amount = $4, cash_amount = $5, opex_lunch = $6,
                opex_transport = $7, opex_rent = $8, kaspi_tax_percent = $9,
                kaspi_tax_amount = $10, charity_percent = $11, charity_raw = $12,
                charity_rounded = $13, net_before_charity = $14,
                distributable_after_charity = $15, manager_percent = $16,
                manager_amount = $17, masters_percent = $18, masters_pool = $19,
                owner_percent = $20, owner_service_dividend = $21,
                owner_parts_dividend = $22, edit_reason = $23, updated_at = $24
            WHERE id = $25
            "#,
        )
        .bind(snapshot.service_income)
        .bind(snapshot.part_sales_income)
        .bind(snapshot.material_expense)
        .bind(snapshot.kaspi_amount)
        .bind(snapshot.cash_amount)
        .bind(snapshot.opex_lunch)
        .bind(snapshot.opex_transport)
        .bind(snapshot.opex_rent)
        .bind(snapshot.kaspi_tax_percent)
        .bind(snapshot.kaspi_tax_amount)
        .bind(snapshot.charity_percent)
        .bind(snapshot.charity_raw)
        .bind(snapshot.charity_rounded)
        .bind(snapshot.net_before_charity)
        .bind(snapshot.distributable_after_charity)
        .bind(snapshot.manager_percent)
        .bind(snapshot.manager_amount)
        .bind(snapshot.masters_percent)
        .bind(snapshot.masters_pool)
        .bind(snapshot.owner_percent)
        .bind(snapshot.owner_service_dividend)
        .bind(snapshot.owner_parts_dividend)
        .bind(&snapshot.edit_reason)
        .bind(snapshot.updated_at)
        .bind(snapshot.id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM day_close_masters WHERE day_close_id = $1")
            .bind(snapshot.id)
            .execute(&mut *tx)
            .await?;
        let master_shares = insert_shares(&mut tx, snapshot.id, &shares).await?;

        tx.commit().await?;

        info!(
            snapshot_id = %snapshot.id,
            shift_index = snapshot.shift_index,
            "day close edited"
        );

        Ok(DayCloseBundle {
            snapshot,
            master_shares,
            aggregates,
        })
    }

    /// Live aggregates, the date's closed shift indices, and the requested
    /// (or first) snapshot with its shares.
    pub async fn get_by_date(
        pool: &PgPool,
        service_id: Uuid,
        date: NaiveDate,
        shift_index: Option<i32>,
    ) -> StoreResult<DayCloseByDate> {
        require_tenant(service_id);

        let mut conn = pool.acquire().await?;
        let aggregates = BookingRepository::day_aggregates(&mut *conn, service_id, date).await?;

        let shift_indices: Vec<i32> = sqlx::query_scalar(
            "SELECT shift_index FROM day_close WHERE service_id = $1 AND close_date = $2 ORDER BY shift_index",
        )
        .bind(service_id)
        .bind(date)
        .fetch_all(&mut *conn)
        .await?;

        let row: Option<SnapshotRow> = match shift_index {
            Some(index) => {
                sqlx::query_as(&format!(
                    "{SELECT_SNAPSHOT} WHERE service_id = $1 AND close_date = $2 AND shift_index = $3"
                ))
                .bind(service_id)
                .bind(date)
                .bind(index)
                .fetch_optional(&mut *conn)
                .await?
            }
            None => {
                sqlx::query_as(&format!(
                    "{SELECT_SNAPSHOT} WHERE service_id = $1 AND close_date = $2 ORDER BY shift_index LIMIT 1"
                ))
                .bind(service_id)
                .bind(date)
                .fetch_optional(&mut *conn)
                .await?
            }
        };
        let snapshot: Option<DayCloseSnapshot> = row.map(Into::into);

        let master_shares = match &snapshot {
            Some(snapshot) => {
                let rows: Vec<ShareRow> = sqlx::query_as(
                    "SELECT id, day_close_id, master_id, amount, percent FROM day_close_masters WHERE day_close_id = $1",
                )
                .bind(snapshot.id)
                .fetch_all(&mut *conn)
                .await?;
                rows.into_iter().map(share_from_row).collect()
            }
            None => Vec::new(),
        };

        Ok(DayCloseByDate {
            aggregates,
            shift_indices,
            snapshot,
            master_shares,
        })
    }

    /// All snapshots for one date, every shift, ordered. Used by analytics.
    pub async fn list_for_date(
        pool: &PgPool,
        service_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Vec<DayCloseSnapshot>> {
        require_tenant(service_id);
        let rows: Vec<SnapshotRow> = sqlx::query_as(&format!(
            "{SELECT_SNAPSHOT} WHERE service_id = $1 AND close_date = $2 ORDER BY shift_index"
        ))
        .bind(service_id)
        .bind(date)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

fn share_from_row(row: ShareRow) -> DayCloseMasterShare {
    DayCloseMasterShare {
        id: row.id,
        day_close_id: row.day_close_id,
        master_id: row.master_id,
        amount: row.amount,
        percent: row.percent,
    }
}

#[allow(clippy::too_many_arguments)]
fn snapshot_from_parts(
    id: Uuid,
    service_id: Uuid,
    close_date: NaiveDate,
    shift_index: i32,
    aggregates: DayAggregates,
    inputs: &CloseInputs,
    breakdown: &CloseBreakdown,
    settings: &ShopSettings,
    edit_reason: Option<String>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
) -> DayCloseSnapshot {
    DayCloseSnapshot {
        id,
        service_id,
        close_date,
        shift_index,
        service_income: aggregates.service_income,
        part_sales_income: aggregates.part_sales_income,
        material_expense: aggregates.material_expense,
        kaspi_amount: breakdown.kaspi_amount,
        cash_amount: breakdown.cash_amount,
        opex_lunch: inputs.opex_lunch,
        opex_transport: inputs.opex_transport,
        opex_rent: inputs.opex_rent,
        kaspi_tax_percent: settings.kaspi_tax_percent,
        kaspi_tax_amount: breakdown.kaspi_tax_amount,
        charity_percent: settings.charity_percent,
        charity_raw: breakdown.charity_raw,
        charity_rounded: breakdown.charity_rounded,
        net_before_charity: breakdown.net_before_charity,
        distributable_after_charity: breakdown.distributable_after_charity,
        manager_percent: settings.manager_percent,
        manager_amount: breakdown.manager_amount,
        masters_percent: settings.masters_percent,
        masters_pool: breakdown.masters_pool,
        owner_percent: settings.owner_percent,
        owner_service_dividend: breakdown.owner_service_dividend,
        owner_parts_dividend: breakdown.owner_parts_dividend,
        edit_reason,
        created_by,
        created_at,
        updated_at,
    }
}

async fn insert_snapshot(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    snapshot: &DayCloseSnapshot,
) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO day_close (
            id, service_id, close_date, shift_index, service_income,
            part_sales_income, material_expense, kaspi_amount, cash_amount,
            opex_lunch, opex_transport, opex_rent, kaspi_tax_percent,
            kaspi_tax_amount, charity_percent, charity_raw, charity_rounded,
            net_before_charity, distributable_after_charity, manager_percent,
            manager_amount, masters_percent, masters_pool, owner_percent,
            owner_service_dividend, owner_parts_dividend, edit_reason,
            created_by, created_at, updated_at
        ) VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
            $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28,
            $29, $30
        )
        "#,
    )
    .bind(snapshot.id)
    .bind(snapshot.service_id)
    .bind(snapshot.close_date)
    .bind(snapshot.shift_index)
    .bind(snapshot.service_income)
    .bind(snapshot.part_sales_income)
    .bind(snapshot.material_expense)
    .bind(snapshot.kaspi_amount)
    .bind(snapshot.cash_amount)
    .bind(snapshot.opex_lunch)
    .bind(snapshot.opex_transport)
    .bind(snapshot.opex_rent)
    .bind(snapshot.kaspi_tax_percent)
    .bind(snapshot.kaspi_tax_amount)
    .bind(snapshot.charity_percent)
    .bind(snapshot.charity_raw)
    .bind(snapshot.charity_rounded)
    .bind(snapshot.net_before_charity)
    .bind(snapshot.distributable_after_charity)
    .bind(snapshot.manager_percent)
    .bind(snapshot.manager_amount)
    .bind(snapshot.masters_percent)
    .bind(snapshot.masters_pool)
    .bind(snapshot.owner_percent)
    .bind(snapshot.owner_service_dividend)
    .bind(snapshot.owner_parts_dividend)
    .bind(&snapshot.edit_reason)
    .bind(snapshot.created_by)
    .bind(snapshot.created_at)
    .bind(snapshot.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| conflict_on_unique(e, "a day close for this shift already exists"))?;

    Ok(())
}

async fn insert_shares(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    day_close_id: Uuid,
    shares: &[servio_core::close::ShareLine],
) -> StoreResult<Vec<DayCloseMasterShare>> {
    let mut rows = Vec::with_capacity(shares.len());
    for share in shares {
        let row = DayCloseMasterShare {
            id: Uuid::new_v4(),
            day_close_id,
            master_id: share.master_id,
            amount: share.amount,
            percent: share.percent,
        };
        sqlx::query(
            r#"
            INSERT INTO day_close_masters (id, day_close_id, master_id, amount, percent)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(row.id)
        .bind(row.day_close_id)
        .bind(row.master_id)
        .bind(row.amount)
        .bind(row.percent)
        .execute(&mut **tx)
        .await?;
        rows.push(row);
    }
    Ok(rows)
}
