mod schema;
mod sqlite;

pub use sqlite::SqliteDatabase;

use crate::error::Result;
use crate::types::*;

/// Database defines the persistence interface.
///
/// Operations that touch more than one row (owner signup, rating submission,
/// cascading deletes) are atomic: implementations must apply them in a single
/// transaction.
pub trait Database: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    /// Fails with `Error::AlreadyExists` if the email is taken.
    fn create_user(&self, user: &User) -> Result<()>;
    /// Creates an owner account and its store together.
    fn create_owner_with_store(&self, owner: &User, store: &Store) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn list_users(&self, filter: &UserFilter, sort: Sort<UserSortField>) -> Result<Vec<User>>;
    fn update_user_password(&self, id: &str, password_hash: &str) -> Result<()>;
    /// Deletes a user, their ratings and (for owners) their stores with all
    /// ratings on them, then recomputes every surviving store the user rated.
    fn delete_user(&self, id: &str) -> Result<bool>;
    fn count_users(&self) -> Result<i64>;
    fn has_admin(&self) -> Result<bool>;

    // Store operations
    fn create_store(&self, store: &Store) -> Result<()>;
    fn get_store(&self, id: &str) -> Result<Option<Store>>;
    /// Returns the owner's oldest store.
    fn get_store_by_owner(&self, owner_id: &str) -> Result<Option<Store>>;
    fn list_stores(
        &self,
        filter: &StoreFilter,
        sort: Sort<StoreSortField>,
    ) -> Result<Vec<StoreWithOwner>>;
    /// Deletes a store and every rating on it.
    fn delete_store(&self, id: &str) -> Result<bool>;
    fn count_stores(&self) -> Result<i64>;

    // Rating operations
    /// Inserts or updates the (user, store) rating and recomputes the store's
    /// aggregate from all of its ratings.
    fn submit_rating(&self, rating: &Rating) -> Result<RatingSummary>;
    fn list_store_ratings(&self, store_id: &str) -> Result<Vec<RatingWithUser>>;
    fn list_user_ratings(&self, user_id: &str) -> Result<Vec<Rating>>;
    fn count_ratings(&self) -> Result<i64>;
}
