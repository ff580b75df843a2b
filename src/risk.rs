//! Fraud/return-risk scoring for COD orders.
//!
//! `evaluate` is a pure function over the order attributes, the customer's
//! order history and the owner's blacklist. It performs no I/O, so the same
//! inputs always produce the same assessment, including the reason order.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::lifecycle::OrderStatus;
use crate::phone::normalize_phone;

/// Coarse risk bucket derived from the numeric score. `None` is reserved for
/// prepaid orders, which are not scored at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::None => "none",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "none" => Some(RiskLevel::None),
            "low" => Some(RiskLevel::Low),
            "medium" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One contributing rule. `weight` is the additive points the rule applied;
/// informational entries such as the blacklist floor carry weight 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RiskReason {
    pub code: String,
    pub weight: i32,
    pub description: String,
}

impl RiskReason {
    fn new(code: &str, weight: i32, description: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            weight,
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RiskAssessment {
    /// 0..=100 for COD orders, `None` for prepaid.
    pub score: Option<i32>,
    pub level: RiskLevel,
    pub reasons: Vec<RiskReason>,
}

impl RiskAssessment {
    fn unscored() -> Self {
        Self {
            score: None,
            level: RiskLevel::None,
            reasons: Vec::new(),
        }
    }
}

/// Delivery address as entered on the order: either all four structured
/// fields, or a single free-text detail line, or anything in between.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddressInput<'a> {
    pub detail: Option<&'a str>,
    pub ward: Option<&'a str>,
    pub district: Option<&'a str>,
    pub province: Option<&'a str>,
}

/// Attributes of the order under evaluation.
#[derive(Debug, Clone, Copy)]
pub struct RiskInput<'a> {
    pub payment_method: Option<&'a str>,
    pub amount: i64,
    pub product_name: Option<&'a str>,
    pub address: AddressInput<'a>,
    pub phone: &'a str,
}

/// Prior order of the same shop, matched against the evaluated order by
/// normalized phone.
#[derive(Debug, Clone, Copy)]
pub struct PastOrder<'a> {
    pub phone: &'a str,
    pub status: OrderStatus,
}

const AMOUNT_HIGH: i64 = 1_000_000;
const AMOUNT_ELEVATED: i64 = 500_000;

const BLACKLIST_FLOOR: i32 = 85;

const ELECTRONICS_KEYWORDS: &[&str] = &[
    "fryer",
    "charger",
    "cable",
    "headphones",
    "speaker",
    "bluetooth",
    "phone",
    "laptop",
    "watch",
    "camera",
];

const FASHION_KEYWORDS: &[&str] = &[
    "shirt", "pants", "shoes", "sandals", "bag", "backpack", "wallet", "skirt", "dress", "set",
];

/// Administrative-unit markers that indicate a free-text address still names
/// its ward/district/province.
const ADMIN_UNIT_KEYWORDS: &[&str] = &[
    "p.",
    "phường",
    "xã",
    "q.",
    "quận",
    "h.",
    "huyện",
    "tp",
    "thành phố",
    "tỉnh",
];

enum AddressShape {
    Full,
    DetailOnly,
    Partial,
}

fn present(field: Option<&str>) -> Option<&str> {
    field.map(str::trim).filter(|s| !s.is_empty())
}

fn classify_address(address: &AddressInput<'_>) -> AddressShape {
    let detail = present(address.detail).is_some();
    let ward = present(address.ward).is_some();
    let district = present(address.district).is_some();
    let province = present(address.province).is_some();

    if detail && ward && district && province {
        AddressShape::Full
    } else if detail && !ward && !district && !province {
        AddressShape::DetailOnly
    } else {
        AddressShape::Partial
    }
}

fn match_category(product_name: &str) -> Option<(&'static str, i32, &'static str)> {
    let name = product_name.to_lowercase();
    if ELECTRONICS_KEYWORDS.iter().any(|kw| name.contains(kw)) {
        return Some(("category_electronics", 20, "Electronics product (+20)"));
    }
    if FASHION_KEYWORDS.iter().any(|kw| name.contains(kw)) {
        return Some(("category_fashion", 10, "Fashion product (+10)"));
    }
    None
}

pub fn level_for_score(score: i32) -> RiskLevel {
    if score <= 30 {
        RiskLevel::Low
    } else if score <= 70 {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

/// Score a single order. `past_orders` is the shop's prior orders for the
/// customer (any phone formatting); `blacklist` holds normalized phones.
pub fn evaluate(
    input: &RiskInput<'_>,
    past_orders: &[PastOrder<'_>],
    blacklist: &HashSet<String>,
) -> RiskAssessment {
    // Prepaid orders carry no COD exposure and are not scored.
    if let Some(method) = input.payment_method {
        if !method.eq_ignore_ascii_case("cod") {
            return RiskAssessment::unscored();
        }
    }

    let mut score: i32 = 0;
    let mut reasons: Vec<RiskReason> = Vec::new();

    score += 10;
    reasons.push(RiskReason::new("cod_base", 10, "COD Order (+10)"));

    if input.amount >= AMOUNT_HIGH {
        score += 25;
        reasons.push(RiskReason::new("amount_high", 25, "High order value (+25)"));
    } else if input.amount >= AMOUNT_ELEVATED {
        score += 10;
        reasons.push(RiskReason::new(
            "amount_elevated",
            10,
            "Elevated order value (+10)",
        ));
    }

    if let Some(name) = present(input.product_name) {
        if let Some((code, weight, description)) = match_category(name) {
            score += weight;
            reasons.push(RiskReason::new(code, weight, description));
        }
    }

    match classify_address(&input.address) {
        AddressShape::Full => {}
        AddressShape::DetailOnly => {
            // present() returned Some for detail in this branch
            let detail = present(input.address.detail).unwrap_or_default();
            if detail.chars().count() < 15 {
                score += 25;
                reasons.push(RiskReason::new("address_vague", 25, "Vague address (+25)"));
            } else {
                let lowered = detail.to_lowercase();
                if !ADMIN_UNIT_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
                    score += 15;
                    reasons.push(RiskReason::new(
                        "address_unstructured",
                        15,
                        "Unstructured address (+15)",
                    ));
                }
            }
        }
        AddressShape::Partial => {
            score += 15;
            reasons.push(RiskReason::new(
                "address_partial",
                15,
                "Incomplete address structure (+15)",
            ));
        }
    }

    let phone = normalize_phone(input.phone);
    let strikes = past_orders
        .iter()
        .filter(|past| {
            matches!(
                past.status,
                OrderStatus::CustomerCancelled | OrderStatus::OrderRejected
            ) && normalize_phone(past.phone) == phone
        })
        .count();
    if strikes >= 3 {
        score += 30;
        reasons.push(RiskReason::new(
            "history_repeat",
            30,
            "3+ cancelled or rejected orders (+30)",
        ));
    } else if strikes >= 1 {
        score += 10;
        reasons.push(RiskReason::new(
            "history_single",
            10,
            "Previous cancelled or rejected order (+10)",
        ));
    }

    if blacklist.contains(&phone) {
        score = score.max(BLACKLIST_FLOOR);
        reasons.push(RiskReason::new(
            "blacklist_override",
            0,
            "Phone number is blacklisted (score floored at 85)",
        ));
    }

    let score = score.clamp(0, 100);

    RiskAssessment {
        score: Some(score),
        level: level_for_score(score),
        reasons,
    }
}
