use std::collections::HashSet;

use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use uuid::Uuid;

use crate::{
    dto::blacklist::{AddBlacklistRequest, BlacklistList},
    entity::blacklist_entries::{
        ActiveModel as EntryActive, Column as EntryCol, Entity as BlacklistEntries,
        Model as EntryModel,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::BlacklistEntry,
    phone::{is_valid_phone, normalize_phone},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub async fn list_entries(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<BlacklistList>> {
    let (page, limit, offset) = pagination.normalize();

    let finder = BlacklistEntries::find()
        .filter(EntryCol::OwnerId.eq(user.user_id))
        .order_by_desc(EntryCol::AddedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(entry_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Blacklist",
        BlacklistList { items },
        Some(meta),
    ))
}

pub async fn add_entry(
    state: &AppState,
    user: &AuthUser,
    payload: AddBlacklistRequest,
) -> AppResult<ApiResponse<BlacklistEntry>> {
    if !is_valid_phone(&payload.phone) {
        return Err(AppError::BadRequest("Invalid phone number".into()));
    }
    let phone = normalize_phone(&payload.phone);

    let existing = BlacklistEntries::find()
        .filter(
            Condition::all()
                .add(EntryCol::OwnerId.eq(user.user_id))
                .add(EntryCol::Phone.eq(phone.as_str())),
        )
        .one(&state.orm)
        .await?;
    if existing.is_some() {
        return Err(AppError::BadRequest("Phone is already blacklisted".into()));
    }

    let entry = EntryActive {
        id: Set(Uuid::new_v4()),
        owner_id: Set(user.user_id),
        phone: Set(phone),
        reason: Set(payload.reason),
        added_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(phone = %entry.phone, "phone blacklisted");

    Ok(ApiResponse::success(
        "Phone blacklisted",
        entry_from_entity(entry),
        Some(Meta::empty()),
    ))
}

pub async fn remove_entry(
    state: &AppState,
    user: &AuthUser,
    phone: &str,
) -> AppResult<ApiResponse<BlacklistEntry>> {
    let phone = normalize_phone(phone);

    let existing = BlacklistEntries::find()
        .filter(
            Condition::all()
                .add(EntryCol::OwnerId.eq(user.user_id))
                .add(EntryCol::Phone.eq(phone.as_str())),
        )
        .one(&state.orm)
        .await?;
    let existing = match existing {
        Some(entry) => entry,
        None => return Err(AppError::NotFound),
    };

    BlacklistEntries::delete_by_id(existing.id)
        .exec(&state.orm)
        .await?;

    tracing::info!(phone = %existing.phone, "phone removed from blacklist");

    Ok(ApiResponse::success(
        "Phone removed",
        entry_from_entity(existing),
        Some(Meta::empty()),
    ))
}

/// The owner's blacklist as the normalized-phone set the risk evaluator
/// consumes.
pub async fn normalized_set(state: &AppState, owner_id: Uuid) -> AppResult<HashSet<String>> {
    let entries = BlacklistEntries::find()
        .filter(EntryCol::OwnerId.eq(owner_id))
        .all(&state.orm)
        .await?;
    Ok(entries.into_iter().map(|entry| entry.phone).collect())
}

fn entry_from_entity(model: EntryModel) -> BlacklistEntry {
    BlacklistEntry {
        id: model.id,
        owner_id: model.owner_id,
        phone: model.phone,
        reason: model.reason,
        added_at: model.added_at.with_timezone(&chrono::Utc),
    }
}
