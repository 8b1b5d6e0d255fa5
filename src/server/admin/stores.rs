use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::{CreateStoreRequest, StoreListParams, StoreRatingsResponse};
use crate::server::extract::ApiJson;
use crate::server::response::{ApiError, MessageResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::{
    Validator, non_blank, validate_address, validate_email, validate_store_name,
};
use crate::types::{Role, Sort, SortDir, Store, StoreFilter, StoreSortField};

pub async fn list_stores(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<StoreListParams>,
) -> impl IntoResponse {
    let filter = StoreFilter {
        name: non_blank(params.name),
        email: non_blank(params.email),
        address: non_blank(params.address),
    };
    let sort = Sort::new(
        StoreSortField::parse(params.sort_by.as_deref()),
        SortDir::parse(params.sort_dir.as_deref()),
    );

    let stores = state
        .db
        .list_stores(&filter, sort)
        .api_err("Failed to list stores")?;

    Ok::<_, ApiError>(Json(stores))
}

pub async fn create_store(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateStoreRequest>,
) -> impl IntoResponse {
    let mut v = Validator::new();
    let name = v.text("name", req.name).unwrap_or_default().trim().to_string();
    let email = non_blank(v.text("email", req.email));
    let address = non_blank(v.text("address", req.address));
    let owner_id = non_blank(v.text("ownerId", req.owner_id));

    v.check("name", validate_store_name(&name));
    if let Some(email) = &email {
        v.check("email", validate_email(email));
    }
    v.check("address", validate_address(address.as_deref()));
    v.finish()?;

    if let Some(owner_id) = &owner_id {
        let owner = state
            .db
            .get_user(owner_id)
            .api_err("Failed to get store owner")?;

        if !owner.is_some_and(|o| o.role == Role::Owner) {
            return Err(ApiError::bad_request("Invalid ownerId (must be OWNER)"));
        }
    }

    let now = Utc::now();
    let store = Store {
        id: Uuid::new_v4().to_string(),
        name,
        email: email.map(|e| e.trim().to_string()),
        address,
        owner_id,
        average_rating: 0.0,
        ratings_count: 0,
        created_at: now,
        updated_at: now,
    };

    state
        .db
        .create_store(&store)
        .api_err("Failed to create store")?;

    tracing::info!(admin_id = %admin.id, store_id = %store.id, "Store created");

    Ok::<_, ApiError>((StatusCode::CREATED, Json(store)))
}

pub async fn get_store_ratings(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state
        .db
        .get_store(&id)
        .api_err("Failed to get store")?
        .or_not_found("Store not found")?;

    let ratings = state
        .db
        .list_store_ratings(&store.id)
        .api_err("Failed to list ratings")?;

    Ok::<_, ApiError>(Json(StoreRatingsResponse::new(store, ratings)))
}

pub async fn delete_store(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let deleted = state
        .db
        .delete_store(&id)
        .api_err("Failed to delete store")?;

    if !deleted {
        return Err(ApiError::not_found("Store not found"));
    }

    tracing::info!(admin_id = %admin.id, store_id = %id, "Store deleted");

    Ok::<_, ApiError>(Json(MessageResponse::new("Store deleted")))
}
