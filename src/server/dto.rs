use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{RatingSummary, RatingWithUser, Role, Store, User};

// Requests. Body fields stay untyped JSON so that a wrong type is reported
// per field by validation.

#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub email: Option<Value>,
    #[serde(default)]
    pub address: Option<Value>,
    #[serde(default)]
    pub password: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupOwnerRequest {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub email: Option<Value>,
    #[serde(default)]
    pub address: Option<Value>,
    #[serde(default)]
    pub password: Option<Value>,
    #[serde(default)]
    pub store_name: Option<Value>,
    #[serde(default)]
    pub store_email: Option<Value>,
    #[serde(default)]
    pub store_address: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<Value>,
    #[serde(default)]
    pub password: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub new_password: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub email: Option<Value>,
    #[serde(default)]
    pub address: Option<Value>,
    #[serde(default)]
    pub password: Option<Value>,
    #[serde(default)]
    pub role: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStoreRequest {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub email: Option<Value>,
    #[serde(default)]
    pub address: Option<Value>,
    #[serde(default)]
    pub owner_id: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubmitRatingRequest {
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListParams {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreListParams {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_dir: Option<String>,
}

// Responses

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// A user as returned from login and admin creation.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub address: Option<String>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            address: user.address.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StoreSummary {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl From<&Store> for StoreSummary {
    fn from(store: &Store) -> Self {
        Self {
            id: store.id.clone(),
            name: store.name.clone(),
            email: store.email.clone(),
            address: store.address.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: &'static str,
    pub user: UserSummary,
}

#[derive(Debug, Serialize)]
pub struct SignupOwnerResponse {
    pub message: &'static str,
    pub owner: UserSummary,
    pub store: StoreSummary,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_users: i64,
    pub total_stores: i64,
    pub total_ratings: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetailsResponse {
    pub user: User,
    pub owner_rating: Option<RatingSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRatingsHeader {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub average_rating: f64,
    pub ratings_count: i64,
}

/// A store's aggregate together with every individual rating.
#[derive(Debug, Serialize)]
pub struct StoreRatingsResponse {
    pub store: StoreRatingsHeader,
    pub ratings: Vec<RatingWithUser>,
}

impl StoreRatingsResponse {
    #[must_use]
    pub fn new(store: Store, ratings: Vec<RatingWithUser>) -> Self {
        Self {
            store: StoreRatingsHeader {
                id: store.id,
                name: store.name,
                email: store.email,
                address: store.address,
                average_rating: store.average_rating,
                ratings_count: store.ratings_count,
            },
            ratings,
        }
    }
}

/// A store as seen by a browsing user, with that user's own rating.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseStoreResponse {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub overall_rating: f64,
    pub ratings_count: i64,
    pub user_rating: Option<u8>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSubmittedResponse {
    pub message: &'static str,
    pub rating_value: u8,
    pub average_rating: f64,
    pub ratings_count: i64,
}
