//! Day-close reconciliation math: payment split validation, charity
//! set-aside, and the payroll waterfall. Pure functions over the day's
//! aggregates and tenant settings; persistence lives in servio-store.

use uuid::Uuid;

use servio_domain::dayclose::{DayAggregates, MasterPercent};
use servio_domain::settings::ShopSettings;

use crate::{CoreError, CoreResult};

/// No charity set-aside below this net.
pub const CHARITY_THRESHOLD: f64 = 10_000.0;

/// Tolerance for manual percent sums and the payment-split bound.
pub const PERCENT_TOLERANCE: f64 = 0.01;

/// Every edit of a stored snapshot must carry a non-blank reason.
/// Returns the reason trimmed, ready to store.
pub fn require_edit_reason(reason: Option<&str>) -> CoreResult<String> {
    reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .ok_or_else(|| CoreError::Validation("edit reason is required".into()))
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn round_to_nearest_1000(x: f64) -> f64 {
    (x / 1000.0).round() * 1000.0
}

/// Caller-declared figures for one shift close.
#[derive(Debug, Clone, Copy)]
pub struct CloseInputs {
    pub kaspi_amount: f64,
    /// None derives max(income_total - kaspi, 0).
    pub cash_amount: Option<f64>,
    pub opex_lunch: f64,
    pub opex_transport: f64,
    pub opex_rent: f64,
}

/// Every derived column of a snapshot, recomputed in full on create and on
/// every edit.
#[derive(Debug, Clone, Copy)]
pub struct CloseBreakdown {
    pub income_total: f64,
    pub kaspi_amount: f64,
    pub cash_amount: f64,
    pub kaspi_tax_amount: f64,
    pub net_before_charity: f64,
    pub charity_raw: f64,
    pub charity_rounded: f64,
    pub distributable_after_charity: f64,
    pub manager_amount: f64,
    pub masters_pool: f64,
    pub owner_service_dividend: f64,
    pub owner_parts_dividend: f64,
}

pub fn compute_breakdown(
    aggregates: DayAggregates,
    inputs: &CloseInputs,
    settings: &ShopSettings,
) -> CoreResult<CloseBreakdown> {
    let income_total = aggregates.service_income + aggregates.part_sales_income;

    if inputs.kaspi_amount < 0.0 {
        return Err(CoreError::Validation(
            "kaspi amount cannot be negative".into(),
        ));
    }
    if inputs.kaspi_amount > income_total + PERCENT_TOLERANCE {
        return Err(CoreError::Validation(format!(
            "kaspi amount {} exceeds day income {}",
            inputs.kaspi_amount, income_total
        )));
    }

    let cash_amount = match inputs.cash_amount {
        Some(cash) if cash < 0.0 => {
            return Err(CoreError::Validation(
                "cash amount cannot be negative".into(),
            ));
        }
        Some(cash) => cash,
        None => (income_total - inputs.kaspi_amount).max(0.0),
    };

    if inputs.kaspi_amount + cash_amount > income_total + PERCENT_TOLERANCE {
        return Err(CoreError::Validation(format!(
            "declared payments {} exceed day income {}",
            inputs.kaspi_amount + cash_amount,
            income_total
        )));
    }

    let kaspi_tax_amount = income_total * settings.kaspi_tax_percent / 100.0;

    // Part-sales revenue is deliberately excluded from the payroll base;
    // it flows to the owner in full as a separate dividend below.
    let net_before_charity = aggregates.service_income
        - aggregates.material_expense
        - inputs.opex_lunch
        - inputs.opex_transport
        - inputs.opex_rent
        - kaspi_tax_amount;

    let charity_raw = if net_before_charity >= CHARITY_THRESHOLD {
        net_before_charity * settings.charity_percent / 100.0
    } else {
        0.0
    };
    let charity_rounded = if settings.round_charity_to_nearest_1000 && charity_raw > 0.0 {
        round_to_nearest_1000(charity_raw)
    } else {
        charity_raw
    };

    let distributable_after_charity = net_before_charity - charity_rounded;

    let manager_amount = distributable_after_charity * settings.manager_percent / 100.0;
    let remainder = distributable_after_charity - manager_amount;
    let masters_pool = remainder * settings.masters_percent / 100.0;
    let owner_service_dividend = remainder * settings.owner_percent / 100.0;

    Ok(CloseBreakdown {
        income_total,
        kaspi_amount: inputs.kaspi_amount,
        cash_amount,
        kaspi_tax_amount,
        net_before_charity,
        charity_raw,
        charity_rounded,
        distributable_after_charity,
        manager_amount,
        masters_pool,
        owner_service_dividend,
        owner_parts_dividend: aggregates.part_sales_income,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShareLine {
    pub master_id: Uuid,
    pub amount: f64,
    /// None on the equal-split path; Some(percent) when supplied manually.
    pub percent: Option<f64>,
}

/// Splits the masters pool across present workers. With a manual
/// distribution every present worker must be listed and the percents must
/// sum to 100 (within 0.01); otherwise the pool is divided equally.
pub fn distribute_masters(
    masters_pool: f64,
    present: &[Uuid],
    manual: Option<&[MasterPercent]>,
) -> CoreResult<Vec<ShareLine>> {
    for (i, id) in present.iter().enumerate() {
        if present[..i].contains(id) {
            return Err(CoreError::Validation(
                "present master ids must be unique".into(),
            ));
        }
    }

    if let Some(percents) = manual {
        if percents.len() != present.len()
            || !present
                .iter()
                .all(|id| percents.iter().any(|p| p.master_id == *id))
        {
            return Err(CoreError::Validation(
                "manual distribution must list every present master exactly once".into(),
            ));
        }

        if percents
            .iter()
            .any(|p| p.percent < 0.0 || p.percent > 100.0)
        {
            return Err(CoreError::Validation(
                "each master percent must be between 0 and 100".into(),
            ));
        }

        let sum: f64 = percents.iter().map(|p| p.percent).sum();
        if (sum - 100.0).abs() > PERCENT_TOLERANCE {
            return Err(CoreError::Validation(format!(
                "master percents must sum to 100, got {sum}"
            )));
        }

        return Ok(percents
            .iter()
            .map(|p| ShareLine {
                master_id: p.master_id,
                amount: round2(masters_pool * p.percent / 100.0),
                percent: Some(p.percent),
            })
            .collect());
    }

    if present.is_empty() {
        return Ok(Vec::new());
    }

    let share = masters_pool / present.len() as f64;
    Ok(present
        .iter()
        .map(|id| ShareLine {
            master_id: *id,
            amount: share,
            percent: None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ShopSettings {
        ShopSettings {
            manager_percent: 8.0,
            masters_percent: 60.0,
            owner_percent: 40.0,
            kaspi_tax_percent: 4.0,
            charity_percent: 10.0,
            round_charity_to_nearest_1000: true,
        }
    }

    fn day() -> DayAggregates {
        DayAggregates {
            service_income: 100_000.0,
            material_expense: 10_000.0,
            part_sales_income: 5_000.0,
        }
    }

    fn inputs(kaspi: f64) -> CloseInputs {
        CloseInputs {
            kaspi_amount: kaspi,
            cash_amount: None,
            opex_lunch: 0.0,
            opex_transport: 0.0,
            opex_rent: 0.0,
        }
    }

    #[test]
    fn full_waterfall_with_rounded_charity() {
        let breakdown = compute_breakdown(day(), &inputs(0.0), &settings()).unwrap();

        assert_eq!(breakdown.income_total, 105_000.0);
        assert_eq!(breakdown.kaspi_tax_amount, 4_200.0);
        assert_eq!(breakdown.net_before_charity, 85_800.0);
        assert_eq!(breakdown.charity_raw, 8_580.0);
        assert_eq!(breakdown.charity_rounded, 9_000.0);
        assert_eq!(breakdown.distributable_after_charity, 76_800.0);
        assert_eq!(breakdown.manager_amount, 6_144.0);
        assert!((breakdown.masters_pool - 42_393.6).abs() < 1e-9);
        assert!((breakdown.owner_service_dividend - 28_262.4).abs() < 1e-9);
        assert_eq!(breakdown.owner_parts_dividend, 5_000.0);
    }

    #[test]
    fn waterfall_conserves_distributable() {
        let breakdown = compute_breakdown(day(), &inputs(20_000.0), &settings()).unwrap();
        let recombined =
            breakdown.manager_amount + breakdown.masters_pool + breakdown.owner_service_dividend;
        assert!((recombined - breakdown.distributable_after_charity).abs() < 0.01);
    }

    #[test]
    fn charity_skipped_below_threshold() {
        let aggregates = DayAggregates {
            service_income: 12_000.0,
            material_expense: 3_000.0,
            part_sales_income: 0.0,
        };
        // net = 12000 - 3000 - 480 tax = 8520, below the 10000 threshold
        let breakdown = compute_breakdown(aggregates, &inputs(0.0), &settings()).unwrap();
        assert_eq!(breakdown.charity_raw, 0.0);
        assert_eq!(breakdown.charity_rounded, 0.0);
        assert_eq!(
            breakdown.distributable_after_charity,
            breakdown.net_before_charity
        );
    }

    #[test]
    fn charity_unrounded_when_flag_off() {
        let mut cfg = settings();
        cfg.round_charity_to_nearest_1000 = false;
        let breakdown = compute_breakdown(day(), &inputs(0.0), &cfg).unwrap();
        assert_eq!(breakdown.charity_rounded, 8_580.0);
    }

    #[test]
    fn rounding_to_1000_is_idempotent() {
        for x in [0.0, 499.99, 500.0, 8_580.0, 12_345.67, 999_999.5] {
            let once = round_to_nearest_1000(x);
            assert_eq!(round_to_nearest_1000(once), once);
        }
    }

    #[test]
    fn kaspi_above_income_rejected() {
        let err = compute_breakdown(day(), &inputs(110_000.0), &settings()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn declared_split_above_income_rejected() {
        let mut declared = inputs(100_000.0);
        declared.cash_amount = Some(10_000.0);
        let err = compute_breakdown(day(), &declared, &settings()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn omitted_cash_derived_from_income() {
        let breakdown = compute_breakdown(day(), &inputs(40_000.0), &settings()).unwrap();
        assert_eq!(breakdown.cash_amount, 65_000.0);
    }

    #[test]
    fn equal_split_across_two_masters() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let shares = distribute_masters(42_393.6, &[a, b], None).unwrap();
        assert_eq!(shares.len(), 2);
        for share in &shares {
            assert!((share.amount - 21_196.8).abs() < 1e-9);
            assert_eq!(share.percent, None);
        }
    }

    #[test]
    fn manual_split_rounds_each_share() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let percents = vec![
            MasterPercent { master_id: a, percent: 70.0 },
            MasterPercent { master_id: b, percent: 30.0 },
        ];
        let shares = distribute_masters(42_393.6, &[a, b], Some(&percents)).unwrap();
        assert_eq!(shares[0].amount, 29_675.52);
        assert_eq!(shares[1].amount, 12_718.08);
        assert_eq!(shares[0].percent, Some(70.0));
    }

    #[test]
    fn manual_split_must_sum_to_100() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let percents = vec![
            MasterPercent { master_id: a, percent: 70.0 },
            MasterPercent { master_id: b, percent: 40.0 },
        ];
        let err = distribute_masters(1_000.0, &[a, b], Some(&percents)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn manual_split_must_cover_present_masters() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let percents = vec![MasterPercent { master_id: a, percent: 100.0 }];
        let err = distribute_masters(1_000.0, &[a, b], Some(&percents)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn duplicate_present_masters_rejected() {
        let a = Uuid::new_v4();

        let err = distribute_masters(1_000.0, &[a, a], None).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let percents = vec![
            MasterPercent { master_id: a, percent: 50.0 },
            MasterPercent { master_id: a, percent: 50.0 },
        ];
        let err = distribute_masters(1_000.0, &[a, a], Some(&percents)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn manual_percents_must_be_within_0_to_100() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        // Sums to 100 but would pay b a negative wage.
        let percents = vec![
            MasterPercent { master_id: a, percent: 150.0 },
            MasterPercent { master_id: b, percent: -50.0 },
        ];
        let err = distribute_masters(1_000.0, &[a, b], Some(&percents)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn edit_reason_must_be_non_blank() {
        assert!(matches!(
            require_edit_reason(None),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            require_edit_reason(Some("")),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            require_edit_reason(Some("   ")),
            Err(CoreError::Validation(_))
        ));
        assert_eq!(
            require_edit_reason(Some("  corrected kaspi total  ")).unwrap(),
            "corrected kaspi total"
        );
    }

    #[test]
    fn no_masters_no_shares() {
        let shares = distribute_masters(5_000.0, &[], None).unwrap();
        assert!(shares.is_empty());
    }
}
