use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub service_id: Uuid,
    pub name: Option<String>,
    pub phone: String,
    pub car_model: Option<String>,
    pub plate_number: Option<String>,
    pub created_at: DateTime<Utc>,
}
