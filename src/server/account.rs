use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{post, put},
};
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::auth::RequireAuth;
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{
    ChangePasswordRequest, LoginRequest, LoginResponse, SignupOwnerRequest, SignupOwnerResponse,
    SignupRequest, SignupResponse, StoreSummary, UserProfile, UserSummary,
};
use crate::server::extract::ApiJson;
use crate::server::response::{ApiError, MessageResponse, StoreResultExt};
use crate::server::validation::{
    Validator, non_blank, normalize_email, validate_address, validate_email, validate_password,
    validate_store_name, validate_user_name,
};
use crate::types::{Role, Store, User};

const EMAIL_TAKEN: &str = "Email already registered";
const INVALID_CREDENTIALS: &str = "Invalid credentials";

pub fn auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/signup", post(signup))
        .route("/signup-owner", post(signup_owner))
        .route("/login", post(login))
        .route("/password", put(change_password))
}

/// Account fields shared by signup and admin user creation.
pub(super) struct NewAccount {
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    pub password: String,
}

impl NewAccount {
    /// Records every invalid field in `v` and returns the normalized input.
    pub(super) fn validate(
        v: &mut Validator,
        name: Option<Value>,
        email: Option<Value>,
        address: Option<Value>,
        password: Option<Value>,
    ) -> Self {
        let name = v.text("name", name).unwrap_or_default().trim().to_string();
        let email = v.text("email", email).unwrap_or_default();
        let address = non_blank(v.text("address", address));
        let password = v.text("password", password).unwrap_or_default();

        v.check("name", validate_user_name(&name));
        v.check("email", validate_email(&email));
        v.check("address", validate_address(address.as_deref()));
        v.check("password", validate_password(&password));

        Self {
            name,
            email: normalize_email(&email),
            address,
            password,
        }
    }

    /// Rejects taken emails and hashes the password into a new `User`.
    pub(super) fn into_user(self, state: &AppState, role: Role) -> Result<User, ApiError> {
        let existing = state
            .db
            .get_user_by_email(&self.email)
            .api_err("Failed to check email")?;

        if existing.is_some() {
            return Err(ApiError::bad_request(EMAIL_TAKEN));
        }

        let password_hash = state
            .passwords
            .hash(&self.password)
            .api_err("Failed to hash password")?;

        let now = Utc::now();
        Ok(User {
            id: Uuid::new_v4().to_string(),
            name: self.name,
            email: self.email,
            address: self.address,
            password_hash,
            role,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Maps a failed user insert, treating a lost race on the email as a conflict.
pub(super) fn create_user_err(e: Error) -> ApiError {
    match e {
        Error::AlreadyExists => ApiError::bad_request(EMAIL_TAKEN),
        e => {
            tracing::error!("Failed to create user: {e}");
            ApiError::internal()
        }
    }
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> impl IntoResponse {
    let mut v = Validator::new();
    let account = NewAccount::validate(&mut v, req.name, req.email, req.address, req.password);
    v.finish()?;

    let user = account.into_user(&state, Role::User)?;
    state.db.create_user(&user).map_err(create_user_err)?;

    tracing::info!(user_id = %user.id, "User signed up");

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User registered",
            user: UserSummary::from(&user),
        }),
    ))
}

pub async fn signup_owner(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SignupOwnerRequest>,
) -> impl IntoResponse {
    let mut v = Validator::new();
    let account = NewAccount::validate(&mut v, req.name, req.email, req.address, req.password);

    let store_name = v
        .text("storeName", req.store_name)
        .unwrap_or_default()
        .trim()
        .to_string();
    let store_email = non_blank(v.text("storeEmail", req.store_email));
    let store_address = non_blank(v.text("storeAddress", req.store_address));

    v.check("storeName", validate_store_name(&store_name));
    if let Some(email) = &store_email {
        v.check("storeEmail", validate_email(email));
    }
    v.check("storeAddress", validate_address(store_address.as_deref()));
    v.finish()?;

    let owner = account.into_user(&state, Role::Owner)?;
    let store = Store {
        id: Uuid::new_v4().to_string(),
        name: store_name,
        email: store_email.map(|e| e.trim().to_string()),
        address: store_address,
        owner_id: Some(owner.id.clone()),
        average_rating: 0.0,
        ratings_count: 0,
        created_at: owner.created_at,
        updated_at: owner.created_at,
    };

    state
        .db
        .create_owner_with_store(&owner, &store)
        .map_err(create_user_err)?;

    tracing::info!(user_id = %owner.id, store_id = %store.id, "Owner signed up");

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(SignupOwnerResponse {
            message: "Owner and store registered",
            owner: UserSummary::from(&owner),
            store: StoreSummary::from(&store),
        }),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> impl IntoResponse {
    let mut v = Validator::new();
    let email = v.text("email", req.email).unwrap_or_default();
    let password = v.text("password", req.password).unwrap_or_default();

    v.check("email", validate_email(&email));
    if password.is_empty() {
        v.check("password", Err("Password is required".to_string()));
    }
    v.finish()?;

    let user = state
        .db
        .get_user_by_email(&normalize_email(&email))
        .api_err("Failed to look up user")?
        .ok_or_else(|| ApiError::bad_request(INVALID_CREDENTIALS))?;

    let valid = state
        .passwords
        .verify(&password, &user.password_hash)
        .api_err("Failed to verify password")?;

    if !valid {
        tracing::debug!(user_id = %user.id, "Login rejected");
        return Err(ApiError::bad_request(INVALID_CREDENTIALS));
    }

    let token = state.jwt.issue(&user).api_err("Failed to issue token")?;

    Ok::<_, ApiError>(Json(LoginResponse {
        token,
        user: UserProfile::from(&user),
    }))
}

pub async fn change_password(
    RequireAuth(user): RequireAuth,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> impl IntoResponse {
    let mut v = Validator::new();
    let new_password = v
        .text("newPassword", req.new_password)
        .unwrap_or_default();

    v.check("newPassword", validate_password(&new_password));
    v.finish()?;

    let hash = state
        .passwords
        .hash(&new_password)
        .api_err("Failed to hash password")?;

    state
        .db
        .update_user_password(&user.id, &hash)
        .map_err(|e| match e {
            Error::NotFound => ApiError::not_found("User not found"),
            e => {
                tracing::error!("Failed to update password: {e}");
                ApiError::internal()
            }
        })?;

    tracing::info!(user_id = %user.id, "Password changed");

    Ok::<_, ApiError>(Json(MessageResponse::new("Password updated")))
}
