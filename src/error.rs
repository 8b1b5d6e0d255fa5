use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("not found")]
    NotFound,

    #[error("already exists")]
    AlreadyExists,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    TokenExpired,
}

pub type Result<T> = std::result::Result<T, Error>;
