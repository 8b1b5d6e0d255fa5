use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireAuth;
use crate::server::AppState;
use crate::server::dto::{
    BrowseStoreResponse, RatingSubmittedResponse, StoreListParams, SubmitRatingRequest,
};
use crate::server::extract::ApiJson;
use crate::server::response::{ApiError, StoreOptionExt, StoreResultExt};
use crate::server::validation::{Validator, non_blank, parse_rating_value};
use crate::types::{Rating, Sort, SortDir, StoreFilter, StoreSortField};

pub fn stores_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stores", get(list_stores))
        .route("/stores/{id}/ratings", post(submit_rating))
}

/// Lists stores for any signed-in account, with the caller's own rating.
pub async fn list_stores(
    RequireAuth(user): RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<StoreListParams>,
) -> impl IntoResponse {
    let filter = StoreFilter {
        name: non_blank(params.name),
        email: None,
        address: non_blank(params.address),
    };
    let sort = Sort::new(
        StoreSortField::parse_browse(params.sort_by.as_deref()),
        SortDir::parse(params.sort_dir.as_deref()),
    );

    let stores = state
        .db
        .list_stores(&filter, sort)
        .api_err("Failed to list stores")?;

    let own: HashMap<String, u8> = state
        .db
        .list_user_ratings(&user.id)
        .api_err("Failed to list user ratings")?
        .into_iter()
        .map(|r| (r.store_id, r.value))
        .collect();

    let stores: Vec<BrowseStoreResponse> = stores
        .into_iter()
        .map(|s| BrowseStoreResponse {
            user_rating: own.get(&s.store.id).copied(),
            id: s.store.id,
            name: s.store.name,
            address: s.store.address,
            overall_rating: s.store.average_rating,
            ratings_count: s.store.ratings_count,
        })
        .collect();

    Ok::<_, ApiError>(Json(stores))
}

pub async fn submit_rating(
    RequireAuth(user): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(store_id): Path<String>,
    ApiJson(req): ApiJson<SubmitRatingRequest>,
) -> impl IntoResponse {
    let mut v = Validator::new();
    let value = v.parse("value", parse_rating_value(req.value.as_ref()));
    v.finish()?;
    let value = value.ok_or_else(ApiError::internal)?;

    let store = state
        .db
        .get_store(&store_id)
        .api_err("Failed to get store")?
        .or_not_found("Store not found")?;

    let now = Utc::now();
    let rating = Rating {
        id: Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        store_id: store.id,
        value,
        created_at: now,
        updated_at: now,
    };

    let summary = state
        .db
        .submit_rating(&rating)
        .api_err("Failed to submit rating")?;

    tracing::info!(
        user_id = %user.id,
        store_id = %rating.store_id,
        value,
        "Rating submitted"
    );

    Ok::<_, ApiError>(Json(RatingSubmittedResponse {
        message: "Rating submitted",
        rating_value: value,
        average_rating: summary.average_rating,
        ratings_count: summary.ratings_count,
    }))
}
