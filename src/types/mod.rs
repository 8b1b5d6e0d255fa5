mod models;
mod query;
mod role;

pub use models::*;
pub use query::*;
pub use role::Role;
