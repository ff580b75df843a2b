use chrono::Utc;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    dto::orders::{
        ActionSet, AppliedAction, ApplyActionRequest, CreateOrderRequest, OrderList,
        OrderWithAssessment, OrderWithEvents, UpdateOrderRequest,
    },
    entity::{
        order_events::{Column as EventCol, Entity as OrderEvents, Model as EventModel},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    events::{OrderEventType, canonical_event_type, record_event},
    lifecycle::{self, OrderFacts, OrderStatus, PaymentClass, TransitionOutcome},
    middleware::auth::AuthUser,
    models::{Order, OrderEvent},
    phone::normalize_phone,
    response::{ApiResponse, Meta},
    risk::{self, AddressInput, PastOrder, RiskInput, RiskLevel},
    routes::params::{OrderListQuery, SortOrder},
    services::blacklist_service,
    state::AppState,
};

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all().add(OrderCol::OwnerId.eq(user.user_id));

    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        let status = OrderStatus::parse(status)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown status `{status}`")))?;
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    if let Some(level) = query.risk_level.as_ref().filter(|s| !s.is_empty()) {
        let level = RiskLevel::parse(level)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown risk level `{level}`")))?;
        condition = condition.add(OrderCol::RiskLevel.eq(level.as_str()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderWithAssessment>> {
    if payload.amount <= 0 {
        return Err(AppError::BadRequest("Amount must be positive".into()));
    }
    if payload.payment_method.trim().is_empty() {
        return Err(AppError::BadRequest("Payment method is required".into()));
    }
    if payload.customer_name.trim().is_empty() {
        return Err(AppError::BadRequest("Customer name is required".into()));
    }
    if payload.phone.trim().is_empty() {
        return Err(AppError::BadRequest("Customer phone is required".into()));
    }

    let product_name = match payload.product_id {
        Some(product_id) => Some(fetch_product_name(state, user, product_id).await?),
        None => None,
    };

    let history = fetch_history(state, user, &payload.phone, None).await?;
    let blacklist = blacklist_service::normalized_set(state, user.user_id).await?;

    let input = RiskInput {
        payment_method: Some(payload.payment_method.as_str()),
        amount: payload.amount,
        product_name: product_name.as_deref(),
        address: AddressInput {
            detail: payload.address_detail.as_deref(),
            ward: payload.ward.as_deref(),
            district: payload.district.as_deref(),
            province: payload.province.as_deref(),
        },
        phone: &payload.phone,
    };
    let past: Vec<PastOrder<'_>> = history
        .iter()
        .map(|(phone, status)| PastOrder {
            phone: phone.as_str(),
            status: *status,
        })
        .collect();
    let assessment = risk::evaluate(&input, &past, &blacklist);
    let status = lifecycle::initial_status(assessment.level);

    let order_id = Uuid::new_v4();
    let order_code = build_order_code(order_id);

    let txn = state.orm.begin().await?;

    let order = OrderActive {
        id: Set(order_id),
        order_code: Set(order_code),
        owner_id: Set(user.user_id),
        customer_name: Set(payload.customer_name),
        phone: Set(payload.phone),
        address_detail: Set(payload.address_detail),
        ward: Set(payload.ward),
        district: Set(payload.district),
        province: Set(payload.province),
        amount: Set(payload.amount),
        payment_method: Set(payload.payment_method),
        product_id: Set(payload.product_id),
        status: Set(status.as_str().to_string()),
        risk_score: Set(assessment.score),
        risk_level: Set(assessment.level.as_str().to_string()),
        paid_at: Set(None),
        qr_sent_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    record_event(
        &txn,
        order.id,
        OrderEventType::OrderCreated,
        Some(json!({
            "status": status.as_str(),
            "risk_score": assessment.score,
            "risk_level": assessment.level.as_str(),
            "reasons": &assessment.reasons,
        })),
    )
    .await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        risk_level = %assessment.level,
        status = %status,
        "order created"
    );

    Ok(ApiResponse::success(
        "Order created",
        OrderWithAssessment {
            order: order_from_entity(order)?,
            assessment,
        },
        Some(Meta::empty()),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithEvents>> {
    let order = find_owned(state, user, id).await?;

    let events = OrderEvents::find()
        .filter(EventCol::OrderId.eq(order.id))
        .order_by_asc(EventCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(event_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderWithEvents {
            order: order_from_entity(order)?,
            events,
        },
        Some(Meta::empty()),
    ))
}

/// Edit customer-facing order fields. Changes to the amount, phone, address
/// or product re-run the risk evaluator and, while the order is still in a
/// review status, re-select its triage queue.
pub async fn update_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderRequest,
) -> AppResult<ApiResponse<OrderWithAssessment>> {
    let existing = find_owned(state, user, id).await?;
    let current_status = parse_status(&existing.status)?;

    if let Some(amount) = payload.amount {
        if amount <= 0 {
            return Err(AppError::BadRequest("Amount must be positive".into()));
        }
    }

    let mut updated = existing.clone();
    if let Some(name) = payload.customer_name {
        updated.customer_name = name;
    }
    if let Some(phone) = payload.phone {
        updated.phone = phone;
    }
    if let Some(detail) = payload.address_detail {
        updated.address_detail = non_blank(detail);
    }
    if let Some(ward) = payload.ward {
        updated.ward = non_blank(ward);
    }
    if let Some(district) = payload.district {
        updated.district = non_blank(district);
    }
    if let Some(province) = payload.province {
        updated.province = non_blank(province);
    }
    if let Some(amount) = payload.amount {
        updated.amount = amount;
    }
    if let Some(product_id) = payload.product_id {
        updated.product_id = Some(product_id);
    }

    let material = updated.amount != existing.amount
        || updated.phone != existing.phone
        || updated.product_id != existing.product_id
        || updated.address_detail != existing.address_detail
        || updated.ward != existing.ward
        || updated.district != existing.district
        || updated.province != existing.province;

    let assessment = if material {
        let product_name = match updated.product_id {
            Some(product_id) => Some(fetch_product_name(state, user, product_id).await?),
            None => None,
        };
        let history = fetch_history(state, user, &updated.phone, Some(existing.id)).await?;
        let blacklist = blacklist_service::normalized_set(state, user.user_id).await?;
        let past: Vec<PastOrder<'_>> = history
            .iter()
            .map(|(phone, status)| PastOrder {
                phone: phone.as_str(),
                status: *status,
            })
            .collect();
        Some(risk::evaluate(
            &risk_input(&updated, product_name.as_deref()),
            &past,
            &blacklist,
        ))
    } else {
        None
    };

    let next_status = match &assessment {
        Some(assessment)
            if matches!(
                current_status,
                OrderStatus::PendingReview | OrderStatus::VerificationRequired
            ) =>
        {
            lifecycle::initial_status(assessment.level)
        }
        _ => current_status,
    };

    let txn = state.orm.begin().await?;

    let mut active: OrderActive = existing.into();
    active.customer_name = Set(updated.customer_name.clone());
    active.phone = Set(updated.phone.clone());
    active.address_detail = Set(updated.address_detail.clone());
    active.ward = Set(updated.ward.clone());
    active.district = Set(updated.district.clone());
    active.province = Set(updated.province.clone());
    active.amount = Set(updated.amount);
    active.product_id = Set(updated.product_id);
    if let Some(assessment) = &assessment {
        active.risk_score = Set(assessment.score);
        active.risk_level = Set(assessment.level.as_str().to_string());
        active.status = Set(next_status.as_str().to_string());
    }
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    if let Some(assessment) = &assessment {
        record_event(
            &txn,
            order.id,
            OrderEventType::RiskEvaluated,
            Some(json!({
                "status": next_status.as_str(),
                "risk_score": assessment.score,
                "risk_level": assessment.level.as_str(),
                "reasons": &assessment.reasons,
                "actor": user.user_id,
            })),
        )
        .await?;
    }

    txn.commit().await?;

    let assessment = assessment.unwrap_or_else(|| stored_assessment(&order));

    Ok(ApiResponse::success(
        "Order updated",
        OrderWithAssessment {
            order: order_from_entity(order)?,
            assessment,
        },
        Some(Meta::empty()),
    ))
}

pub async fn resolve_actions(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<ActionSet>> {
    let order = find_owned(state, user, id).await?;
    let facts = facts_from(&order)?;
    let actions = lifecycle::available_actions(&facts).into_iter().collect();
    Ok(ApiResponse::success(
        "Actions",
        ActionSet { actions },
        Some(Meta::empty()),
    ))
}

/// Apply an operator action under optimistic concurrency control: the row is
/// only updated if `(status, paid_at, qr_sent_at)` still match what was read,
/// and the matching event is appended in the same transaction.
pub async fn apply_action(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: ApplyActionRequest,
) -> AppResult<ApiResponse<AppliedAction>> {
    let order = find_owned(state, user, id).await?;
    let facts = facts_from(&order)?;
    let outcome = lifecycle::apply_action(&facts, payload.action, payload.reason.as_deref())?;

    let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
    let txn = state.orm.begin().await?;

    let mut update = Orders::update_many()
        .filter(OrderCol::Id.eq(order.id))
        .filter(OrderCol::Status.eq(order.status.as_str()));
    update = match order.paid_at {
        Some(ts) => update.filter(OrderCol::PaidAt.eq(ts)),
        None => update.filter(OrderCol::PaidAt.is_null()),
    };
    update = match order.qr_sent_at {
        Some(ts) => update.filter(OrderCol::QrSentAt.eq(ts)),
        None => update.filter(OrderCol::QrSentAt.is_null()),
    };
    update = update.col_expr(OrderCol::UpdatedAt, Expr::value(now));

    let (event_type, next_status) = match outcome {
        TransitionOutcome::Status(next) => {
            update = update.col_expr(OrderCol::Status, Expr::value(next.as_str()));
            (OrderEventType::for_action(payload.action), Some(next))
        }
        TransitionOutcome::MarkQrSent => {
            update = update.col_expr(OrderCol::QrSentAt, Expr::value(now));
            (OrderEventType::QrSent, None)
        }
        TransitionOutcome::MarkPaid => {
            update = update.col_expr(OrderCol::PaidAt, Expr::value(now));
            (OrderEventType::PaymentRecorded, None)
        }
    };

    let result = update.exec(&txn).await?;
    if result.rows_affected == 0 {
        // Another operator won the race; nothing was written.
        return Err(AppError::ConcurrencyConflict);
    }

    let mut event_payload = json!({
        "action": payload.action.as_str(),
        "actor": user.user_id,
    });
    if let Some(next) = next_status {
        event_payload["from"] = json!(facts.status.as_str());
        event_payload["to"] = json!(next.as_str());
    }
    if let Some(reason) = payload.reason.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        event_payload["reason"] = json!(reason);
    }

    let event = record_event(&txn, order.id, event_type, Some(event_payload)).await?;
    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        action = %payload.action,
        event_type = %event_type,
        "order action applied"
    );

    let refreshed = find_owned(state, user, order.id).await?;
    Ok(ApiResponse::success(
        "Action applied",
        AppliedAction {
            order: order_from_entity(refreshed)?,
            event: event_from_entity(event),
        },
        Some(Meta::empty()),
    ))
}

async fn find_owned(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<OrderModel> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::OwnerId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?;
    order.ok_or(AppError::NotFound)
}

async fn fetch_product_name(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<String> {
    let product = Products::find()
        .filter(
            Condition::all()
                .add(ProdCol::OwnerId.eq(user.user_id))
                .add(ProdCol::Id.eq(product_id)),
        )
        .one(&state.orm)
        .await?;
    match product {
        Some(product) => Ok(product.name),
        None => Err(AppError::BadRequest("Unknown product".into())),
    }
}

/// Prior orders of this shop for the same customer phone. Matching happens on
/// both the raw and normalized spellings so `+84` entries line up with local
/// ones; the evaluator re-checks with normalized comparison.
async fn fetch_history(
    state: &AppState,
    user: &AuthUser,
    phone: &str,
    exclude: Option<Uuid>,
) -> AppResult<Vec<(String, OrderStatus)>> {
    let normalized = normalize_phone(phone);
    let mut finder = Orders::find()
        .filter(OrderCol::OwnerId.eq(user.user_id))
        .filter(OrderCol::Phone.is_in([phone.to_string(), normalized]));
    if let Some(id) = exclude {
        finder = finder.filter(OrderCol::Id.ne(id));
    }

    let rows = finder.all(&state.orm).await?;
    Ok(rows
        .into_iter()
        .filter_map(|row| OrderStatus::parse(&row.status).map(|status| (row.phone, status)))
        .collect())
}

fn risk_input<'a>(model: &'a OrderModel, product_name: Option<&'a str>) -> RiskInput<'a> {
    RiskInput {
        payment_method: Some(model.payment_method.as_str()),
        amount: model.amount,
        product_name,
        address: AddressInput {
            detail: model.address_detail.as_deref(),
            ward: model.ward.as_deref(),
            district: model.district.as_deref(),
            province: model.province.as_deref(),
        },
        phone: &model.phone,
    }
}

/// Reconstruct an assessment from the persisted score/level when no
/// re-evaluation ran; itemized reasons live in the event log.
fn stored_assessment(model: &OrderModel) -> risk::RiskAssessment {
    risk::RiskAssessment {
        score: model.risk_score,
        level: RiskLevel::parse(&model.risk_level).unwrap_or(RiskLevel::None),
        reasons: Vec::new(),
    }
}

fn facts_from(model: &OrderModel) -> AppResult<OrderFacts> {
    Ok(OrderFacts {
        status: parse_status(&model.status)?,
        payment: PaymentClass::from_method(Some(&model.payment_method)),
        risk: parse_risk_level(&model.risk_level)?,
        paid: model.paid_at.is_some(),
        qr_sent: model.qr_sent_at.is_some(),
    })
}

fn parse_status(raw: &str) -> AppResult<OrderStatus> {
    OrderStatus::parse(raw)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("unknown order status `{raw}`")))
}

fn parse_risk_level(raw: &str) -> AppResult<RiskLevel> {
    RiskLevel::parse(raw)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("unknown risk level `{raw}`")))
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn order_from_entity(model: OrderModel) -> AppResult<Order> {
    let status = parse_status(&model.status)?;
    let risk_level = parse_risk_level(&model.risk_level)?;
    Ok(Order {
        id: model.id,
        order_code: model.order_code,
        owner_id: model.owner_id,
        customer_name: model.customer_name,
        phone: model.phone,
        address_detail: model.address_detail,
        ward: model.ward,
        district: model.district,
        province: model.province,
        amount: model.amount,
        payment_method: model.payment_method,
        product_id: model.product_id,
        status,
        risk_score: model.risk_score,
        risk_level,
        paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
        qr_sent_at: model.qr_sent_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn event_from_entity(model: EventModel) -> OrderEvent {
    OrderEvent {
        id: model.id,
        order_id: model.order_id,
        event_type: canonical_event_type(&model.event_type),
        payload: model.payload,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn build_order_code(order_id: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = order_id.to_string();
    let short = &suffix[..8];
    format!("COD-{}-{}", date, short)
}
