use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::http::{HeaderValue, Method, header};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::account::auth_router;
use super::admin::admin_router;
use super::owner::owner_router;
use super::stores::stores_router;
use crate::auth::{JwtKeys, PasswordHasher};
use crate::db::Database;

pub struct AppState {
    pub db: Arc<dyn Database>,
    pub jwt: JwtKeys,
    pub passwords: PasswordHasher,
    /// Origins allowed by CORS. Empty allows any origin.
    pub allowed_origins: Vec<String>,
}

impl AppState {
    pub fn new(db: Arc<dyn Database>, jwt: JwtKeys) -> Self {
        Self {
            db,
            jwt,
            passwords: PasswordHasher::new(),
            allowed_origins: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }
}

async fn index() -> &'static str {
    "API is running"
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(AllowOrigin::list(origins))
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.allowed_origins);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .nest("/api/auth", auth_router())
        .nest("/api/admin", admin_router())
        .nest("/api/owner", owner_router())
        .nest("/api", stores_router())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(log_request))
                .layer(cors),
        )
        .with_state(state)
}
