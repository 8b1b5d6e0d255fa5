use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::Deserialize;

use crate::error::{Error, Result};

pub const DB_FILE: &str = "storerate.db";
pub const JWT_SECRET_FILE: &str = ".jwt_secret";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Lifetime of issued session tokens.
    pub token_ttl_hours: i64,
    /// Origins allowed by CORS. Empty allows any origin.
    pub allowed_origins: Vec<String>,
    /// Overrides the secret stored in `<data_dir>/.jwt_secret`.
    pub jwt_secret: Option<String>,
}

impl ServerConfig {
    /// Reads a TOML config file. Missing keys keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE)
    }

    #[must_use]
    pub fn secret_path(&self) -> PathBuf {
        self.data_dir.join(JWT_SECRET_FILE)
    }

    #[must_use]
    pub fn token_ttl(&self) -> Duration {
        Duration::hours(self.token_ttl_hours)
    }

    /// Returns the configured signing secret, falling back to the secret file
    /// written by `admin init`.
    pub fn load_jwt_secret(&self) -> Result<String> {
        if let Some(secret) = self.jwt_secret.as_deref().filter(|s| !s.is_empty()) {
            return Ok(secret.to_string());
        }

        let path = self.secret_path();
        let secret = fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let secret = secret.trim();

        if secret.is_empty() {
            return Err(Error::Config(format!("{} is empty", path.display())));
        }
        Ok(secret.to_string())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            data_dir: PathBuf::from("./data"),
            token_ttl_hours: 24,
            allowed_origins: Vec::new(),
            jwt_secret: None,
        }
    }
}
