use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post},
};

use crate::{
    dto::blacklist::{AddBlacklistRequest, BlacklistList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::BlacklistEntry,
    response::ApiResponse,
    routes::params::Pagination,
    services::blacklist_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_blacklist))
        .route("/", post(add_to_blacklist))
        .route("/{phone}", delete(remove_from_blacklist))
}

#[utoipa::path(
    get,
    path = "/api/blacklist",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "List blacklisted phones", body = ApiResponse<BlacklistList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Blacklist"
)]
pub async fn list_blacklist(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<BlacklistList>>> {
    let resp = blacklist_service::list_entries(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/blacklist",
    request_body = AddBlacklistRequest,
    responses(
        (status = 200, description = "Phone blacklisted", body = ApiResponse<BlacklistEntry>),
        (status = 400, description = "Invalid or duplicate phone"),
    ),
    security(("bearer_auth" = [])),
    tag = "Blacklist"
)]
pub async fn add_to_blacklist(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddBlacklistRequest>,
) -> AppResult<Json<ApiResponse<BlacklistEntry>>> {
    let resp = blacklist_service::add_entry(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/blacklist/{phone}",
    params(("phone" = String, Path, description = "Phone number, any formatting")),
    responses(
        (status = 200, description = "Phone removed", body = ApiResponse<BlacklistEntry>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Blacklist"
)]
pub async fn remove_from_blacklist(
    State(state): State<AppState>,
    user: AuthUser,
    Path(phone): Path<String>,
) -> AppResult<Json<ApiResponse<BlacklistEntry>>> {
    let resp = blacklist_service::remove_entry(&state, &user, &phone).await?;
    Ok(Json(resp))
}
