//! Order status machine and action availability.
//!
//! `available_actions` is the single authority on what an operator may do
//! with an order; `apply_action` consults it before computing the outcome.
//! Both are pure so the service layer can recheck them inside its
//! compare-and-set commit without holding any lock.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::risk::RiskLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    PendingReview,
    VerificationRequired,
    OrderRejected,
    OrderApproved,
    OrderConfirmationSent,
    CustomerConfirmed,
    CustomerCancelled,
    CustomerUnreachable,
    OrderPaid,
    Delivering,
    Completed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingReview => "PENDING_REVIEW",
            OrderStatus::VerificationRequired => "VERIFICATION_REQUIRED",
            OrderStatus::OrderRejected => "ORDER_REJECTED",
            OrderStatus::OrderApproved => "ORDER_APPROVED",
            OrderStatus::OrderConfirmationSent => "ORDER_CONFIRMATION_SENT",
            OrderStatus::CustomerConfirmed => "CUSTOMER_CONFIRMED",
            OrderStatus::CustomerCancelled => "CUSTOMER_CANCELLED",
            OrderStatus::CustomerUnreachable => "CUSTOMER_UNREACHABLE",
            OrderStatus::OrderPaid => "ORDER_PAID",
            OrderStatus::Delivering => "DELIVERING",
            OrderStatus::Completed => "COMPLETED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "PENDING_REVIEW" => Some(OrderStatus::PendingReview),
            "VERIFICATION_REQUIRED" => Some(OrderStatus::VerificationRequired),
            "ORDER_REJECTED" => Some(OrderStatus::OrderRejected),
            "ORDER_APPROVED" => Some(OrderStatus::OrderApproved),
            "ORDER_CONFIRMATION_SENT" => Some(OrderStatus::OrderConfirmationSent),
            "CUSTOMER_CONFIRMED" => Some(OrderStatus::CustomerConfirmed),
            "CUSTOMER_CANCELLED" => Some(OrderStatus::CustomerCancelled),
            "CUSTOMER_UNREACHABLE" => Some(OrderStatus::CustomerUnreachable),
            "ORDER_PAID" => Some(OrderStatus::OrderPaid),
            "DELIVERING" => Some(OrderStatus::Delivering),
            "COMPLETED" => Some(OrderStatus::Completed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::OrderRejected
                | OrderStatus::CustomerCancelled
                | OrderStatus::CustomerUnreachable
                | OrderStatus::Completed
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator actions. `Notify` is issued by the system right after approval of
/// a medium/high-risk COD order; the rest come from the dashboard menu.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum OrderAction {
    Approve,
    Reject,
    Notify,
    CustomerConfirm,
    CustomerCancel,
    MarkUnreachable,
    StartDelivery,
    MarkCompleted,
    SendQr,
    SimulatePaid,
}

impl OrderAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderAction::Approve => "approve",
            OrderAction::Reject => "reject",
            OrderAction::Notify => "notify",
            OrderAction::CustomerConfirm => "customer_confirm",
            OrderAction::CustomerCancel => "customer_cancel",
            OrderAction::MarkUnreachable => "mark_unreachable",
            OrderAction::StartDelivery => "start_delivery",
            OrderAction::MarkCompleted => "mark_completed",
            OrderAction::SendQr => "send_qr",
            OrderAction::SimulatePaid => "simulate_paid",
        }
    }
}

impl std::fmt::Display for OrderAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentClass {
    Cod,
    Prepaid,
}

impl PaymentClass {
    /// `COD` (any casing) and an absent method both count as COD; every other
    /// value means the order was prepaid.
    pub fn from_method(method: Option<&str>) -> Self {
        match method {
            Some(m) if !m.trim().eq_ignore_ascii_case("cod") => PaymentClass::Prepaid,
            _ => PaymentClass::Cod,
        }
    }
}

/// Snapshot of the order fields the machine branches on.
#[derive(Debug, Clone, Copy)]
pub struct OrderFacts {
    pub status: OrderStatus,
    pub payment: PaymentClass,
    pub risk: RiskLevel,
    pub paid: bool,
    pub qr_sent: bool,
}

impl OrderFacts {
    fn requires_confirmation(&self) -> bool {
        matches!(self.risk, RiskLevel::Medium | RiskLevel::High)
    }

    /// Post-approval statuses in which the QR/payment side channel applies.
    fn payment_side_channel_open(&self) -> bool {
        self.payment == PaymentClass::Cod
            && !self.paid
            && matches!(
                self.status,
                OrderStatus::OrderApproved
                    | OrderStatus::OrderConfirmationSent
                    | OrderStatus::CustomerConfirmed
                    | OrderStatus::Delivering
            )
    }
}

/// Resolve the set of actions currently permitted for an order. Total over
/// every combination; terminal statuses and uncovered combinations resolve to
/// the empty set.
pub fn available_actions(facts: &OrderFacts) -> BTreeSet<OrderAction> {
    let mut actions = BTreeSet::new();
    if facts.status.is_terminal() {
        return actions;
    }

    match facts.status {
        OrderStatus::PendingReview | OrderStatus::VerificationRequired => {
            actions.insert(OrderAction::Approve);
            actions.insert(OrderAction::Reject);
        }
        OrderStatus::OrderApproved => match facts.payment {
            PaymentClass::Prepaid => {
                actions.insert(OrderAction::StartDelivery);
            }
            PaymentClass::Cod => {
                if facts.requires_confirmation() {
                    actions.insert(OrderAction::Notify);
                } else {
                    actions.insert(OrderAction::StartDelivery);
                }
            }
        },
        OrderStatus::OrderConfirmationSent => {
            if facts.requires_confirmation() {
                actions.insert(OrderAction::CustomerConfirm);
                actions.insert(OrderAction::CustomerCancel);
                actions.insert(OrderAction::MarkUnreachable);
            } else {
                actions.insert(OrderAction::StartDelivery);
            }
        }
        OrderStatus::CustomerConfirmed | OrderStatus::OrderPaid => {
            actions.insert(OrderAction::StartDelivery);
        }
        OrderStatus::Delivering => {
            actions.insert(OrderAction::MarkCompleted);
        }
        _ => {}
    }

    if facts.payment_side_channel_open() {
        if !facts.qr_sent {
            actions.insert(OrderAction::SendQr);
        } else {
            actions.insert(OrderAction::SimulatePaid);
        }
    }

    actions
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("action `{action}` is not available while the order is {status}")]
    NotPermitted {
        status: OrderStatus,
        action: OrderAction,
    },
    #[error("a rejection reason is required")]
    ReasonRequired,
}

/// What a permitted action does to the order row. The QR and payment flags
/// are orthogonal to `status`: setting them never transitions the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Status(OrderStatus),
    MarkQrSent,
    MarkPaid,
}

/// Validate an action against the resolved set and compute its outcome.
pub fn apply_action(
    facts: &OrderFacts,
    action: OrderAction,
    reason: Option<&str>,
) -> Result<TransitionOutcome, TransitionError> {
    if !available_actions(facts).contains(&action) {
        return Err(TransitionError::NotPermitted {
            status: facts.status,
            action,
        });
    }

    if action == OrderAction::Reject && present(reason).is_none() {
        return Err(TransitionError::ReasonRequired);
    }

    Ok(match action {
        OrderAction::Approve => TransitionOutcome::Status(OrderStatus::OrderApproved),
        OrderAction::Reject => TransitionOutcome::Status(OrderStatus::OrderRejected),
        OrderAction::Notify => TransitionOutcome::Status(OrderStatus::OrderConfirmationSent),
        OrderAction::CustomerConfirm => TransitionOutcome::Status(OrderStatus::CustomerConfirmed),
        OrderAction::CustomerCancel => TransitionOutcome::Status(OrderStatus::CustomerCancelled),
        OrderAction::MarkUnreachable => {
            TransitionOutcome::Status(OrderStatus::CustomerUnreachable)
        }
        OrderAction::StartDelivery => TransitionOutcome::Status(OrderStatus::Delivering),
        OrderAction::MarkCompleted => TransitionOutcome::Status(OrderStatus::Completed),
        OrderAction::SendQr => TransitionOutcome::MarkQrSent,
        OrderAction::SimulatePaid => TransitionOutcome::MarkPaid,
    })
}

/// Intake triage: high-risk orders queue for manual verification, everything
/// else starts in the regular review queue.
pub fn initial_status(risk: RiskLevel) -> OrderStatus {
    if risk == RiskLevel::High {
        OrderStatus::VerificationRequired
    } else {
        OrderStatus::PendingReview
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
