//! Contract tests for the day-close surface: request payloads deserialize
//! with the documented defaults, the engine produces the documented
//! breakdown for them, and domain errors map to the right status codes.

use axum::http::StatusCode;
use axum::response::IntoResponse;

use servio_api::error::AppError;
use servio_core::close::{compute_breakdown, distribute_masters, CloseInputs};
use servio_core::CoreError;
use servio_domain::booking::CompleteBookingRequest;
use servio_domain::dayclose::{CreateDayCloseRequest, DayAggregates};
use servio_domain::settings::ShopSettings;

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

#[test]
fn create_payload_defaults_optional_fields() {
    let req: CreateDayCloseRequest = serde_json::from_str(
        r#"{"date": "2025-06-18", "kaspi_amount": 40000}"#,
    )
    .unwrap();

    assert_eq!(req.kaspi_amount, 40_000.0);
    assert_eq!(req.cash_amount, None);
    assert_eq!(req.opex_lunch, 0.0);
    assert!(req.present_master_ids.is_empty());
    assert!(!req.manual_master_distribution);
}

#[test]
fn create_payload_drives_the_documented_breakdown() {
    let req: CreateDayCloseRequest = serde_json::from_str(
        r#"{
            "date": "2025-06-18",
            "kaspi_amount": 0,
            "present_master_ids": [
                "5f0efb77-cc70-41c6-b13a-a0f8bc8cf42f",
                "e61f7e85-0327-47dc-b2a4-b54b2c2142a8"
            ]
        }"#,
    )
    .unwrap();

    let aggregates = DayAggregates {
        service_income: 100_000.0,
        material_expense: 10_000.0,
        part_sales_income: 5_000.0,
    };
    let inputs = CloseInputs {
        kaspi_amount: req.kaspi_amount,
        cash_amount: req.cash_amount,
        opex_lunch: req.opex_lunch,
        opex_transport: req.opex_transport,
        opex_rent: req.opex_rent,
    };

    let breakdown = compute_breakdown(aggregates, &inputs, &settings()).unwrap();
    assert_eq!(breakdown.kaspi_tax_amount, 4_200.0);
    assert_eq!(breakdown.charity_rounded, 9_000.0);
    assert_eq!(breakdown.distributable_after_charity, 76_800.0);
    assert_eq!(breakdown.owner_parts_dividend, 5_000.0);

    let shares =
        distribute_masters(breakdown.masters_pool, &req.present_master_ids, None).unwrap();
    assert_eq!(shares.len(), 2);
    assert!((shares[0].amount - 21_196.8).abs() < 1e-9);
}

#[test]
fn complete_payload_defaults_optional_fields() {
    let req: CompleteBookingRequest = serde_json::from_str(
        r#"{"service_payment_amount": 45000, "payment_type": "kaspipay"}"#,
    )
    .unwrap();

    assert_eq!(req.material_expense, 0.0);
    assert_eq!(req.kaspi_tax_amount, None);
    assert!(req.part_sales.is_empty());
    assert!(req.warranty_service_ids.is_empty());
}

#[test]
fn domain_errors_map_to_documented_statuses() {
    let cases = [
        (CoreError::Validation("bad".into()), StatusCode::BAD_REQUEST),
        (CoreError::Conflict("dup".into()), StatusCode::CONFLICT),
        (CoreError::NotFound("gone".into()), StatusCode::NOT_FOUND),
        (
            CoreError::Internal("boom".into()),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];
    for (err, expected) in cases {
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), expected);
    }
}

#[test]
fn internal_errors_do_not_leak_details() {
    let response = AppError::InternalServerError("connection string".into()).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
