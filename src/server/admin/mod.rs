mod stats;
mod stores;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get},
};

use crate::server::AppState;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats", get(stats::get_stats))
        // User routes
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}", delete(users::delete_user))
        // Store routes
        .route("/stores", get(stores::list_stores).post(stores::create_store))
        .route("/stores/{id}", delete(stores::delete_store))
        .route("/stores/{id}/ratings", get(stores::get_store_ratings))
}
