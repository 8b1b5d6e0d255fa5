mod server;

pub use server::{DB_FILE, JWT_SECRET_FILE, ServerConfig};
