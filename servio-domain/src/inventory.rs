use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: Uuid,
    pub service_id: Uuid,
    pub name: String,
    /// Allowed sale band, min <= max. Unit prices outside it are rejected
    /// at completion time.
    pub sale_price_min: f64,
    pub sale_price_max: f64,
    /// Current stock, never negative.
    pub quantity: i32,
    /// Reorder threshold.
    pub min_quantity: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    In,
    Out,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::In => "in",
            MovementKind::Out => "out",
        }
    }
}

/// Audit entry written for every stock mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    pub service_id: Uuid,
    pub inventory_item_id: Uuid,
    pub kind: MovementKind,
    pub quantity: i32,
    pub booking_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
