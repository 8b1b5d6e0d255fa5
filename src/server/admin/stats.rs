use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::StatsResponse;
use crate::server::response::{ApiError, StoreResultExt};

pub async fn get_stats(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let total_users = state.db.count_users().api_err("Failed to count users")?;
    let total_stores = state.db.count_stores().api_err("Failed to count stores")?;
    let total_ratings = state.db.count_ratings().api_err("Failed to count ratings")?;

    Ok::<_, ApiError>(Json(StatsResponse {
        total_users,
        total_stores,
        total_ratings,
    }))
}
