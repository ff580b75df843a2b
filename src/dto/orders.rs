use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::lifecycle::OrderAction;
use crate::models::{Order, OrderEvent};
use crate::risk::RiskAssessment;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub customer_name: String,
    pub phone: String,
    pub address_detail: Option<String>,
    pub ward: Option<String>,
    pub district: Option<String>,
    pub province: Option<String>,
    /// Smallest currency unit; must be positive.
    pub amount: i64,
    /// `COD` or the prepaid method name.
    pub payment_method: String,
    pub product_id: Option<Uuid>,
}

/// Partial update. Changing the amount, phone, address or product re-runs
/// the risk evaluator.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateOrderRequest {
    pub customer_name: Option<String>,
    pub phone: Option<String>,
    pub address_detail: Option<String>,
    pub ward: Option<String>,
    pub district: Option<String>,
    pub province: Option<String>,
    pub amount: Option<i64>,
    pub product_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApplyActionRequest {
    pub action: OrderAction,
    /// Required for `reject`.
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderWithAssessment {
    pub order: Order,
    pub assessment: RiskAssessment,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderWithEvents {
    pub order: Order,
    pub events: Vec<OrderEvent>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActionSet {
    pub actions: Vec<OrderAction>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AppliedAction {
    pub order: Order,
    pub event: OrderEvent,
}
