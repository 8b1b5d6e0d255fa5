mod helpers;
mod jwt;
mod middleware;
mod password;

pub use jwt::{Claims, JwtKeys, generate_secret};
pub use middleware::{AuthError, RequireAdmin, RequireAuth, RequireOwner};
pub use password::PasswordHasher;
