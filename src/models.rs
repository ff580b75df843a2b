use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::lifecycle::OrderStatus;
use crate::risk::RiskLevel;

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub order_code: String,
    pub owner_id: Uuid,
    pub customer_name: String,
    /// Phone as the operator entered it; normalization is lookup-only.
    pub phone: String,
    pub address_detail: Option<String>,
    pub ward: Option<String>,
    pub district: Option<String>,
    pub province: Option<String>,
    pub amount: i64,
    pub payment_method: String,
    pub product_id: Option<Uuid>,
    pub status: OrderStatus,
    pub risk_score: Option<i32>,
    pub risk_level: RiskLevel,
    pub paid_at: Option<DateTime<Utc>>,
    pub qr_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderEvent {
    pub id: Uuid,
    pub order_id: Uuid,
    pub event_type: String,
    pub payload: Option<Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BlacklistEntry {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub phone: String,
    pub reason: Option<String>,
    pub added_at: DateTime<Utc>,
}
