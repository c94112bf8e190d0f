//! Read-side summary over a reporting period: per day, closed snapshots win
//! over live aggregation; productivity is optional enrichment and degrades
//! to an empty list instead of failing the summary.

use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use servio_core::period::{expand, Period};
use servio_core::report::{sum_daily, DailyRow, DaySource, PeriodMetrics, ProductivityRow, WagesBreakdown};
use servio_domain::dayclose::DayCloseSnapshot;

use crate::booking_repo::BookingRepository;
use crate::dayclose_repo::DayCloseRepository;
use crate::{require_tenant, StoreResult};

pub struct AnalyticsRepository;

#[derive(Debug, Clone)]
pub struct SummaryReport {
    pub period: Period,
    pub anchor: NaiveDate,
    pub metrics: PeriodMetrics,
    pub daily: Vec<DailyRow>,
    pub wages: WagesBreakdown,
    pub day_closes: Vec<DayCloseSnapshot>,
    pub productivity: Vec<ProductivityRow>,
}

#[derive(sqlx::FromRow)]
struct ProductivityQueryRow {
    master_id: Uuid,
    completed_jobs: i64,
    total_minutes: i64,
}

impl AnalyticsRepository {
    pub async fn summary(
        pool: &PgPool,
        service_id: Uuid,
        period: Period,
        anchor: NaiveDate,
    ) -> StoreResult<SummaryReport> {
        require_tenant(service_id);

        let dates = expand(period, anchor);
        let mut daily = Vec::with_capacity(dates.len());
        let mut wages = WagesBreakdown::default();
        let mut day_closes = Vec::new();

        for date in &dates {
            let snapshots = DayCloseRepository::list_for_date(pool, service_id, *date).await?;
            if snapshots.is_empty() {
                let mut conn = pool.acquire().await?;
                let aggregates =
                    BookingRepository::day_aggregates(&mut *conn, service_id, *date).await?;
                daily.push(DailyRow {
                    date: *date,
                    service_income: aggregates.service_income,
                    part_sales_income: aggregates.part_sales_income,
                    material_expense: aggregates.material_expense,
                    source: DaySource::Live,
                });
            } else {
                let mut row = DailyRow {
                    date: *date,
                    service_income: 0.0,
                    part_sales_income: 0.0,
                    material_expense: 0.0,
                    source: DaySource::Snapshot,
                };
                for snapshot in &snapshots {
                    row.service_income += snapshot.service_income;
                    row.part_sales_income += snapshot.part_sales_income;
                    row.material_expense += snapshot.material_expense;
                    wages.add(snapshot);
                }
                daily.push(row);
                day_closes.extend(snapshots);
            }
        }

        let first = dates.first().copied().unwrap_or(anchor);
        let last = dates.last().copied().unwrap_or(anchor);
        let productivity = match Self::productivity(pool, service_id, first, last).await {
            Ok(rows) => rows,
            Err(err) => {
                warn!(service_id = %service_id, "productivity rollup failed: {err}");
                Vec::new()
            }
        };

        Ok(SummaryReport {
            period,
            anchor,
            metrics: sum_daily(&daily),
            daily,
            wages,
            day_closes,
            productivity,
        })
    }

    async fn productivity(
        pool: &PgPool,
        service_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<ProductivityRow>> {
        let rows: Vec<ProductivityQueryRow> = sqlx::query_as(
            r#"
            SELECT master_id,
                   COUNT(*)::int8 AS completed_jobs,
                   COALESCE(SUM(duration_minutes), 0)::int8 AS total_minutes
            FROM bookings
            WHERE service_id = $1
              AND date BETWEEN $2 AND $3
              AND status = 'completed'
              AND master_id IS NOT NULL
            GROUP BY master_id
            ORDER BY completed_jobs DESC
            "#,
        )
        .bind(service_id)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ProductivityRow {
                master_id: row.master_id,
                completed_jobs: row.completed_jobs,
                total_minutes: row.total_minutes,
                avg_minutes: if row.completed_jobs > 0 {
                    row.total_minutes as f64 / row.completed_jobs as f64
                } else {
                    0.0
                },
            })
            .collect())
    }
}
