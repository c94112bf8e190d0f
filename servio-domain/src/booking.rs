use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub service_id: Uuid,
    pub client_id: Option<Uuid>,
    pub client_name: Option<String>,
    pub client_phone: Option<String>,
    pub car_model: Option<String>,
    pub plate_number: Option<String>,
    pub box_id: Option<Uuid>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: BookingStatus,
    pub master_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub service_payment_amount: Option<f64>,
    pub payment_type: Option<PaymentType>,
    pub material_expense: Option<f64>,
    pub kaspi_tax_amount: Option<f64>,
}

/// Lifecycle: Planned -> Arrived -> InProgress -> Completed, or NoShow.
/// Execution fields (amounts, timestamps) are only ever written by the
/// completion transaction, and only from InProgress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Planned,
    Arrived,
    InProgress,
    Completed,
    NoShow,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Planned => "planned",
            BookingStatus::Arrived => "arrived",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::Completed => "completed",
            BookingStatus::NoShow => "no_show",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "planned" => Some(BookingStatus::Planned),
            "arrived" => Some(BookingStatus::Arrived),
            "in_progress" => Some(BookingStatus::InProgress),
            "completed" => Some(BookingStatus::Completed),
            "no_show" => Some(BookingStatus::NoShow),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Cash,
    Kaspipay,
    Mixed,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Cash => "cash",
            PaymentType::Kaspipay => "kaspipay",
            PaymentType::Mixed => "mixed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cash" => Some(PaymentType::Cash),
            "kaspipay" => Some(PaymentType::Kaspipay),
            "mixed" => Some(PaymentType::Mixed),
            _ => None,
        }
    }
}

/// Payload of the booking completion transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct CompleteBookingRequest {
    pub service_payment_amount: f64,
    pub payment_type: PaymentType,
    #[serde(default)]
    pub material_expense: f64,
    /// Explicit Kaspi tax overrides the 4% kaspipay default.
    pub kaspi_tax_amount: Option<f64>,
    #[serde(default)]
    pub part_sales: Vec<PartSaleLine>,
    #[serde(default)]
    pub warranty_service_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartSaleLine {
    pub inventory_item_id: Uuid,
    pub quantity: i32,
    pub unit_price: f64,
}

/// A persisted part-sale line item. Immutable after the completion
/// transaction that created it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartSale {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub inventory_item_id: Uuid,
    pub quantity: i32,
    pub unit_price: f64,
}
