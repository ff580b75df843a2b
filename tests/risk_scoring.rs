use std::collections::HashSet;

use cod_dashboard_api::lifecycle::OrderStatus;
use cod_dashboard_api::phone::{is_valid_phone, normalize_phone};
use cod_dashboard_api::risk::{
    AddressInput, PastOrder, RiskInput, RiskLevel, evaluate, level_for_score,
};

const FULL_ADDRESS: AddressInput<'static> = AddressInput {
    detail: Some("12 Lê Lợi"),
    ward: Some("Bến Thành"),
    district: Some("Quận 1"),
    province: Some("TP.HCM"),
};

fn cod_order(amount: i64) -> RiskInput<'static> {
    RiskInput {
        payment_method: Some("COD"),
        amount,
        product_name: None,
        address: FULL_ADDRESS,
        phone: "0901234567",
    }
}

fn codes(assessment: &cod_dashboard_api::risk::RiskAssessment) -> Vec<&str> {
    assessment
        .reasons
        .iter()
        .map(|r| r.code.as_str())
        .collect()
}

#[test]
fn prepaid_orders_are_not_scored() {
    let input = RiskInput {
        payment_method: Some("BANK_TRANSFER"),
        amount: 5_000_000,
        product_name: Some("Laptop Pro"),
        address: AddressInput::default(),
        phone: "0901234567",
    };
    let assessment = evaluate(&input, &[], &HashSet::new());
    assert_eq!(assessment.score, None);
    assert_eq!(assessment.level, RiskLevel::None);
    assert!(assessment.reasons.is_empty());
}

#[test]
fn high_value_structured_address_scores_medium() {
    let assessment = evaluate(&cod_order(1_200_000), &[], &HashSet::new());
    assert_eq!(assessment.score, Some(35));
    assert_eq!(assessment.level, RiskLevel::Medium);
    assert_eq!(codes(&assessment), vec!["cod_base", "amount_high"]);
}

#[test]
fn elevated_value_tier_applies_below_one_million() {
    let assessment = evaluate(&cod_order(600_000), &[], &HashSet::new());
    assert_eq!(assessment.score, Some(20));
    assert_eq!(codes(&assessment), vec!["cod_base", "amount_elevated"]);
}

#[test]
fn vague_detail_only_address_scores_medium() {
    let input = RiskInput {
        payment_method: Some("COD"),
        amount: 300_000,
        product_name: None,
        address: AddressInput {
            detail: Some("Nhà số 5"),
            ward: None,
            district: None,
            province: None,
        },
        phone: "0901234567",
    };
    let assessment = evaluate(&input, &[], &HashSet::new());
    assert_eq!(assessment.score, Some(35));
    assert_eq!(assessment.level, RiskLevel::Medium);
    assert_eq!(codes(&assessment), vec!["cod_base", "address_vague"]);
}

#[test]
fn long_detail_without_admin_markers_is_unstructured() {
    let input = RiskInput {
        address: AddressInput {
            detail: Some("số 12 đường Nguyễn Văn Cừ"),
            ward: None,
            district: None,
            province: None,
        },
        ..cod_order(100_000)
    };
    let assessment = evaluate(&input, &[], &HashSet::new());
    assert_eq!(assessment.score, Some(25));
    assert_eq!(codes(&assessment), vec!["cod_base", "address_unstructured"]);
}

#[test]
fn detail_with_admin_markers_is_not_penalized() {
    let input = RiskInput {
        address: AddressInput {
            detail: Some("12 Lê Lợi, P. Bến Thành, Q.1, TP.HCM"),
            ward: None,
            district: None,
            province: None,
        },
        ..cod_order(100_000)
    };
    let assessment = evaluate(&input, &[], &HashSet::new());
    assert_eq!(assessment.score, Some(10));
    assert_eq!(assessment.level, RiskLevel::Low);
}

#[test]
fn partially_structured_address_is_penalized() {
    let input = RiskInput {
        address: AddressInput {
            detail: Some("12 Lê Lợi"),
            ward: None,
            district: Some("Quận 1"),
            province: None,
        },
        ..cod_order(100_000)
    };
    let assessment = evaluate(&input, &[], &HashSet::new());
    assert_eq!(assessment.score, Some(25));
    assert_eq!(codes(&assessment), vec!["cod_base", "address_partial"]);
}

#[test]
fn entirely_blank_address_counts_as_incomplete() {
    let input = RiskInput {
        address: AddressInput {
            detail: Some("   "),
            ward: None,
            district: None,
            province: None,
        },
        ..cod_order(100_000)
    };
    let assessment = evaluate(&input, &[], &HashSet::new());
    assert_eq!(codes(&assessment), vec!["cod_base", "address_partial"]);
}

#[test]
fn electronics_keyword_wins_over_fashion() {
    let input = RiskInput {
        product_name: Some("Bluetooth Dress Set"),
        ..cod_order(100_000)
    };
    let assessment = evaluate(&input, &[], &HashSet::new());
    assert_eq!(assessment.score, Some(30));
    assert_eq!(codes(&assessment), vec!["cod_base", "category_electronics"]);
}

#[test]
fn fashion_keyword_matches_case_insensitively() {
    let input = RiskInput {
        product_name: Some("Summer DRESS"),
        ..cod_order(100_000)
    };
    let assessment = evaluate(&input, &[], &HashSet::new());
    assert_eq!(assessment.score, Some(20));
    assert_eq!(codes(&assessment), vec!["cod_base", "category_fashion"]);
}

#[test]
fn history_single_strike_adds_ten() {
    let past = [PastOrder {
        phone: "0901234567",
        status: OrderStatus::CustomerCancelled,
    }];
    let assessment = evaluate(&cod_order(100_000), &past, &HashSet::new());
    assert_eq!(assessment.score, Some(20));
    assert_eq!(codes(&assessment), vec!["cod_base", "history_single"]);
}

#[test]
fn history_three_strikes_adds_thirty() {
    let strike = PastOrder {
        phone: "0901234567",
        status: OrderStatus::OrderRejected,
    };
    let past = [strike, strike, strike];
    let assessment = evaluate(&cod_order(100_000), &past, &HashSet::new());
    assert_eq!(assessment.score, Some(40));
    assert_eq!(codes(&assessment), vec!["cod_base", "history_repeat"]);
}

#[test]
fn completed_history_does_not_count() {
    let past = [
        PastOrder {
            phone: "0901234567",
            status: OrderStatus::Completed,
        },
        PastOrder {
            phone: "0901234567",
            status: OrderStatus::Delivering,
        },
    ];
    let assessment = evaluate(&cod_order(100_000), &past, &HashSet::new());
    assert_eq!(assessment.score, Some(10));
}

#[test]
fn history_matches_international_spelling() {
    let past = [PastOrder {
        phone: "+84 901 234 567",
        status: OrderStatus::CustomerCancelled,
    }];
    let assessment = evaluate(&cod_order(100_000), &past, &HashSet::new());
    assert_eq!(codes(&assessment), vec!["cod_base", "history_single"]);
}

#[test]
fn blacklisted_phone_is_floored_at_85() {
    let blacklist: HashSet<String> = ["0901234567".to_string()].into_iter().collect();
    let assessment = evaluate(&cod_order(100_000), &[], &blacklist);
    assert_eq!(assessment.score, Some(85));
    assert_eq!(assessment.level, RiskLevel::High);
    let last = assessment.reasons.last().expect("override reason");
    assert_eq!(last.code, "blacklist_override");
    assert_eq!(last.weight, 0);
}

#[test]
fn blacklist_floor_does_not_lower_a_higher_score() {
    let blacklist: HashSet<String> = ["0901234567".to_string()].into_iter().collect();
    let strike = PastOrder {
        phone: "0901234567",
        status: OrderStatus::CustomerCancelled,
    };
    let input = RiskInput {
        product_name: Some("Air Fryer 5L"),
        address: AddressInput {
            detail: Some("Nhà số 5"),
            ward: None,
            district: None,
            province: None,
        },
        ..cod_order(1_200_000)
    };
    // 10 + 25 + 20 + 25 + 30 = 110, clamped to 100.
    let assessment = evaluate(&input, &[strike, strike, strike], &blacklist);
    assert_eq!(assessment.score, Some(100));
    assert_eq!(assessment.level, RiskLevel::High);
}

#[test]
fn score_is_monotonic_in_amount_tier() {
    let low = evaluate(&cod_order(100_000), &[], &HashSet::new())
        .score
        .unwrap();
    let mid = evaluate(&cod_order(600_000), &[], &HashSet::new())
        .score
        .unwrap();
    let high = evaluate(&cod_order(1_500_000), &[], &HashSet::new())
        .score
        .unwrap();
    assert!(low <= mid && mid <= high);
}

#[test]
fn evaluate_is_deterministic() {
    let blacklist: HashSet<String> = ["0909999999".to_string()].into_iter().collect();
    let past = [PastOrder {
        phone: "0901234567",
        status: OrderStatus::CustomerCancelled,
    }];
    let input = RiskInput {
        product_name: Some("Wireless Charger"),
        ..cod_order(700_000)
    };
    let first = evaluate(&input, &past, &blacklist);
    let second = evaluate(&input, &past, &blacklist);
    assert_eq!(first, second);
}

#[test]
fn tier_boundaries() {
    assert_eq!(level_for_score(0), RiskLevel::Low);
    assert_eq!(level_for_score(30), RiskLevel::Low);
    assert_eq!(level_for_score(31), RiskLevel::Medium);
    assert_eq!(level_for_score(70), RiskLevel::Medium);
    assert_eq!(level_for_score(71), RiskLevel::High);
    assert_eq!(level_for_score(100), RiskLevel::High);
}

#[test]
fn phone_normalization_strips_separators() {
    assert_eq!(normalize_phone("090-123-4567"), "0901234567");
    assert_eq!(normalize_phone("090.123.4567"), "0901234567");
    assert_eq!(normalize_phone("(090) 123 4567"), "0901234567");
}

#[test]
fn phone_normalization_rewrites_plus84() {
    assert_eq!(normalize_phone("+84901234567"), "0901234567");
    assert_eq!(normalize_phone("+84 901 234 567"), "0901234567");
    // Wrong digit count after +84 is left alone.
    assert_eq!(normalize_phone("+84123"), "+84123");
}

#[test]
fn phone_validity() {
    assert!(is_valid_phone("0901234567"));
    assert!(is_valid_phone("+84 901 234 567"));
    assert!(!is_valid_phone("12345"));
    assert!(!is_valid_phone("0901234abc"));
    assert!(!is_valid_phone("090123456789"));
}
