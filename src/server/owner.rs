use std::sync::Arc;

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};

use crate::auth::RequireOwner;
use crate::server::AppState;
use crate::server::dto::StoreRatingsResponse;
use crate::server::response::{ApiError, StoreOptionExt, StoreResultExt};

pub fn owner_router() -> Router<Arc<AppState>> {
    Router::new().route("/my-store/ratings", get(my_store_ratings))
}

pub async fn my_store_ratings(
    RequireOwner(owner): RequireOwner,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let store = state
        .db
        .get_store_by_owner(&owner.id)
        .api_err("Failed to get owner store")?
        .or_not_found("Store not found for owner")?;

    let ratings = state
        .db
        .list_store_ratings(&store.id)
        .api_err("Failed to list ratings")?;

    Ok::<_, ApiError>(Json(StoreRatingsResponse::new(store, ratings)))
}
