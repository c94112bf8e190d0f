//! Derivations performed by the booking completion transaction: the
//! booking-level Kaspi tax default, execution duration, and warranty expiry.

use chrono::{DateTime, Months, NaiveDate, Utc};

use servio_domain::booking::PaymentType;

use crate::close::round2;

/// Fixed booking-level default, applied only to kaspipay when no explicit
/// tax was supplied. Independent of the day-close tax percent, which runs
/// over the whole day income.
pub const KASPI_BOOKING_TAX_RATE: f64 = 0.04;

pub fn kaspi_tax_for_booking(
    payment_type: PaymentType,
    service_payment_amount: f64,
    explicit: Option<f64>,
) -> f64 {
    match explicit {
        Some(tax) => tax,
        None if payment_type == PaymentType::Kaspipay => {
            round2(service_payment_amount * KASPI_BOOKING_TAX_RATE)
        }
        None => 0.0,
    }
}

/// Whole-minute duration, floored, never negative.
pub fn duration_minutes(started_at: DateTime<Utc>, completed_at: DateTime<Utc>) -> i32 {
    (completed_at - started_at).num_minutes().max(0) as i32
}

/// Warranties run 3 calendar months from completion, date-only.
pub fn warranty_expiry(completed_at: DateTime<Utc>) -> NaiveDate {
    let date = completed_at.date_naive();
    date.checked_add_months(Months::new(3)).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn kaspipay_defaults_to_four_percent() {
        assert_eq!(
            kaspi_tax_for_booking(PaymentType::Kaspipay, 100_000.0, None),
            4_000.0
        );
        assert_eq!(
            kaspi_tax_for_booking(PaymentType::Kaspipay, 12_345.0, None),
            493.8
        );
    }

    #[test]
    fn explicit_tax_wins_over_default() {
        assert_eq!(
            kaspi_tax_for_booking(PaymentType::Kaspipay, 100_000.0, Some(3_500.0)),
            3_500.0
        );
        assert_eq!(
            kaspi_tax_for_booking(PaymentType::Cash, 100_000.0, Some(1_000.0)),
            1_000.0
        );
    }

    #[test]
    fn non_kaspipay_defaults_to_zero() {
        assert_eq!(kaspi_tax_for_booking(PaymentType::Cash, 100_000.0, None), 0.0);
        assert_eq!(kaspi_tax_for_booking(PaymentType::Mixed, 100_000.0, None), 0.0);
    }

    #[test]
    fn duration_floors_to_whole_minutes() {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 3, 10, 10, 32, 59).unwrap();
        assert_eq!(duration_minutes(start, end), 92);
    }

    #[test]
    fn duration_never_negative() {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap();
        assert_eq!(duration_minutes(start, end), 0);
    }

    #[test]
    fn warranty_runs_three_months() {
        let done = Utc.with_ymd_and_hms(2025, 1, 15, 18, 30, 0).unwrap();
        assert_eq!(
            warranty_expiry(done),
            NaiveDate::from_ymd_opt(2025, 4, 15).unwrap()
        );
    }

    #[test]
    fn warranty_clamps_to_month_end() {
        let done = Utc.with_ymd_and_hms(2025, 11, 30, 12, 0, 0).unwrap();
        assert_eq!(
            warranty_expiry(done),
            NaiveDate::from_ymd_opt(2026, 2, 28).unwrap()
        );
    }
}
