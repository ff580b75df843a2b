//! Append-only order event log.
//!
//! Events are written in the same transaction as the status or flag change
//! they describe, and are never updated or deleted afterwards. Earlier
//! versions of the dashboard wrote a handful of divergent event-type strings;
//! `OrderEventType::parse` folds those aliases onto the canonical names once,
//! at read time.

use sea_orm::{ActiveModelTrait, ConnectionTrait};
use sea_orm::ActiveValue::{NotSet, Set};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::order_events::{ActiveModel as EventActive, Model as EventModel};
use crate::lifecycle::OrderAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderEventType {
    OrderCreated,
    RiskEvaluated,
    OrderApproved,
    OrderRejected,
    ConfirmationSent,
    CustomerConfirmed,
    CustomerCancelled,
    CustomerUnreachable,
    DeliveryStarted,
    OrderCompleted,
    QrSent,
    PaymentRecorded,
}

impl OrderEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderEventType::OrderCreated => "order_created",
            OrderEventType::RiskEvaluated => "risk_evaluated",
            OrderEventType::OrderApproved => "order_approved",
            OrderEventType::OrderRejected => "order_rejected",
            OrderEventType::ConfirmationSent => "confirmation_sent",
            OrderEventType::CustomerConfirmed => "customer_confirmed",
            OrderEventType::CustomerCancelled => "customer_cancelled",
            OrderEventType::CustomerUnreachable => "customer_unreachable",
            OrderEventType::DeliveryStarted => "delivery_started",
            OrderEventType::OrderCompleted => "order_completed",
            OrderEventType::QrSent => "qr_sent",
            OrderEventType::PaymentRecorded => "payment_recorded",
        }
    }

    /// Parse a stored event-type string. Legacy aliases map onto their
    /// canonical variant; unknown strings return `None` and are surfaced
    /// verbatim by the timeline instead of being dropped.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "order_created" => Some(OrderEventType::OrderCreated),
            "risk_evaluated" | "risk_scored" => Some(OrderEventType::RiskEvaluated),
            "order_approved" => Some(OrderEventType::OrderApproved),
            "order_rejected" => Some(OrderEventType::OrderRejected),
            "confirmation_sent" | "zalo_notified" => Some(OrderEventType::ConfirmationSent),
            "customer_confirmed" => Some(OrderEventType::CustomerConfirmed),
            "customer_cancelled" | "customer_canceled" | "order_cancelled" => {
                Some(OrderEventType::CustomerCancelled)
            }
            "customer_unreachable" => Some(OrderEventType::CustomerUnreachable),
            "delivery_started" | "shipping_started" => Some(OrderEventType::DeliveryStarted),
            "order_completed" => Some(OrderEventType::OrderCompleted),
            "qr_sent" | "qr_code_sent" => Some(OrderEventType::QrSent),
            "payment_recorded" | "payment_simulated" => Some(OrderEventType::PaymentRecorded),
            _ => None,
        }
    }

    pub fn for_action(action: OrderAction) -> Self {
        match action {
            OrderAction::Approve => OrderEventType::OrderApproved,
            OrderAction::Reject => OrderEventType::OrderRejected,
            OrderAction::Notify => OrderEventType::ConfirmationSent,
            OrderAction::CustomerConfirm => OrderEventType::CustomerConfirmed,
            OrderAction::CustomerCancel => OrderEventType::CustomerCancelled,
            OrderAction::MarkUnreachable => OrderEventType::CustomerUnreachable,
            OrderAction::StartDelivery => OrderEventType::DeliveryStarted,
            OrderAction::MarkCompleted => OrderEventType::OrderCompleted,
            OrderAction::SendQr => OrderEventType::QrSent,
            OrderAction::SimulatePaid => OrderEventType::PaymentRecorded,
        }
    }
}

impl std::fmt::Display for OrderEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonicalize a stored event-type string for display.
pub fn canonical_event_type(raw: &str) -> String {
    match OrderEventType::parse(raw) {
        Some(event_type) => event_type.as_str().to_string(),
        None => raw.to_string(),
    }
}

/// Append one event inside the caller's transaction.
pub async fn record_event<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    event_type: OrderEventType,
    payload: Option<Value>,
) -> Result<EventModel, sea_orm::DbErr> {
    EventActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        event_type: Set(event_type.as_str().to_string()),
        payload: Set(payload),
        created_at: NotSet,
    }
    .insert(conn)
    .await
}
