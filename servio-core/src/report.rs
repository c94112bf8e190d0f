//! Read-side report shapes for the analytics summary. No numeric policy of
//! its own: wages fields mirror the day-close waterfall columns.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use servio_domain::dayclose::DayCloseSnapshot;

/// Where a daily row's figures came from: closed snapshots (summed across
/// the date's shifts) or live booking aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DaySource {
    Snapshot,
    Live,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DailyRow {
    pub date: NaiveDate,
    pub service_income: f64,
    pub part_sales_income: f64,
    pub material_expense: f64,
    pub source: DaySource,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PeriodMetrics {
    pub service_income: f64,
    pub part_sales_income: f64,
    pub material_expense: f64,
    pub income_total: f64,
    pub days_closed: usize,
}

pub fn sum_daily(rows: &[DailyRow]) -> PeriodMetrics {
    let mut metrics = PeriodMetrics::default();
    for row in rows {
        metrics.service_income += row.service_income;
        metrics.part_sales_income += row.part_sales_income;
        metrics.material_expense += row.material_expense;
        if row.source == DaySource::Snapshot {
            metrics.days_closed += 1;
        }
    }
    metrics.income_total = metrics.service_income + metrics.part_sales_income;
    metrics
}

/// Period-wide sums of the waterfall columns, over snapshots only.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WagesBreakdown {
    pub kaspi_tax_amount: f64,
    pub net_before_charity: f64,
    pub charity_rounded: f64,
    pub distributable_after_charity: f64,
    pub manager_amount: f64,
    pub masters_pool: f64,
    pub owner_service_dividend: f64,
    pub owner_parts_dividend: f64,
}

impl WagesBreakdown {
    pub fn add(&mut self, snapshot: &DayCloseSnapshot) {
        self.kaspi_tax_amount += snapshot.kaspi_tax_amount;
        self.net_before_charity += snapshot.net_before_charity;
        self.charity_rounded += snapshot.charity_rounded;
        self.distributable_after_charity += snapshot.distributable_after_charity;
        self.manager_amount += snapshot.manager_amount;
        self.masters_pool += snapshot.masters_pool;
        self.owner_service_dividend += snapshot.owner_service_dividend;
        self.owner_parts_dividend += snapshot.owner_parts_dividend;
    }
}

/// Per-master completed-job rollup over the period.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProductivityRow {
    pub master_id: Uuid,
    pub completed_jobs: i64,
    pub total_minutes: i64,
    pub avg_minutes: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_daily_totals_and_counts_closed_days() {
        let d = |day| NaiveDate::from_ymd_opt(2025, 6, day).unwrap();
        let rows = vec![
            DailyRow {
                date: d(1),
                service_income: 100.0,
                part_sales_income: 10.0,
                material_expense: 5.0,
                source: DaySource::Snapshot,
            },
            DailyRow {
                date: d(2),
                service_income: 200.0,
                part_sales_income: 0.0,
                material_expense: 20.0,
                source: DaySource::Live,
            },
        ];
        let metrics = sum_daily(&rows);
        assert_eq!(metrics.service_income, 300.0);
        assert_eq!(metrics.income_total, 310.0);
        assert_eq!(metrics.material_expense, 25.0);
        assert_eq!(metrics.days_closed, 1);
    }

    #[test]
    fn empty_period_is_all_zero() {
        let metrics = sum_daily(&[]);
        assert_eq!(metrics.income_total, 0.0);
        assert_eq!(metrics.days_closed, 0);
    }
}
