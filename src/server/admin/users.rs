use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::account::{NewAccount, create_user_err};
use crate::server::dto::{CreateUserRequest, UserDetailsResponse, UserListParams, UserProfile};
use crate::server::extract::ApiJson;
use crate::server::response::{ApiError, MessageResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::{Validator, non_blank, parse_role};
use crate::types::{RatingSummary, Role, Sort, SortDir, UserFilter, UserSortField};

pub async fn list_users(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserListParams>,
) -> impl IntoResponse {
    let mut v = Validator::new();
    let role = match non_blank(params.role) {
        Some(role) => v.parse("role", parse_role(&role)),
        None => None,
    };
    v.finish()?;

    let filter = UserFilter {
        name: non_blank(params.name),
        email: non_blank(params.email),
        address: non_blank(params.address),
        role,
    };
    let sort = Sort::new(
        UserSortField::parse(params.sort_by.as_deref()),
        SortDir::parse(params.sort_dir.as_deref()),
    );

    let users = state
        .db
        .list_users(&filter, sort)
        .api_err("Failed to list users")?;

    Ok::<_, ApiError>(Json(users))
}

pub async fn get_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let user = state
        .db
        .get_user(&id)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;

    let owner_rating = if user.role == Role::Owner {
        state
            .db
            .get_store_by_owner(&user.id)
            .api_err("Failed to get owner store")?
            .map(|store| RatingSummary {
                average_rating: store.average_rating,
                ratings_count: store.ratings_count,
            })
    } else {
        None
    };

    Ok::<_, ApiError>(Json(UserDetailsResponse { user, owner_rating }))
}

pub async fn create_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> impl IntoResponse {
    let mut v = Validator::new();
    let account = NewAccount::validate(&mut v, req.name, req.email, req.address, req.password);
    let role = v.text("role", req.role).unwrap_or_default();
    let role = v.parse("role", parse_role(&role));
    v.finish()?;
    let role = role.ok_or_else(ApiError::internal)?;

    let user = account.into_user(&state, role)?;
    state.db.create_user(&user).map_err(create_user_err)?;

    tracing::info!(
        admin_id = %admin.id,
        user_id = %user.id,
        role = %user.role,
        "User created"
    );

    Ok::<_, ApiError>((StatusCode::CREATED, Json(UserProfile::from(&user))))
}

pub async fn delete_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if id == admin.id {
        return Err(ApiError::bad_request(
            "Admin cannot delete self via this endpoint",
        ));
    }

    let deleted = state
        .db
        .delete_user(&id)
        .api_err("Failed to delete user")?;

    if !deleted {
        return Err(ApiError::not_found("User not found"));
    }

    tracing::info!(admin_id = %admin.id, user_id = %id, "User deleted");

    Ok::<_, ApiError>(Json(MessageResponse::new("User deleted")))
}
