mod account;
mod admin;
pub mod dto;
pub mod extract;
mod owner;
pub mod response;
mod router;
mod stores;
pub mod validation;

pub use account::auth_router;
pub use admin::admin_router;
pub use owner::owner_router;
pub use router::{AppState, create_router};
pub use stores::stores_router;
