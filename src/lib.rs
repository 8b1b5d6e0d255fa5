//! # storerate
//!
//! A role-based store rating service: administrators manage users and stores,
//! users rate stores from 1 to 5 and owners see the ratings of their store.
//! Usable both as a standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! storerate = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use storerate::auth::JwtKeys;
//! use storerate::db::{Database, SqliteDatabase};
//! use storerate::server::{AppState, create_router};
//!
//! let db = SqliteDatabase::new("./data/storerate.db").unwrap();
//! db.initialize().unwrap();
//!
//! let jwt = JwtKeys::new(b"secret", chrono::Duration::hours(24));
//! let state = Arc::new(AppState::new(Arc::new(db), jwt));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): builds the `storerate` binary. Disable with `default-features = false`.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod server;
pub mod types;
