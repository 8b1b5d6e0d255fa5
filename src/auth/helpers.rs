use crate::error::Error;
use crate::server::AppState;
use crate::types::{Role, User};

#[derive(Debug)]
pub enum TokenValidationError {
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    InternalError,
}

/// Extracts the token from a Bearer authorization header.
/// Returns None if no auth header is present.
/// Returns Err if the auth scheme is unsupported or the token is empty.
pub fn extract_bearer_token(
    auth_header: Option<&str>,
) -> Result<Option<String>, TokenValidationError> {
    let Some(header) = auth_header else {
        return Ok(None);
    };

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(TokenValidationError::InvalidScheme)?
        .trim();

    if token.is_empty() {
        return Err(TokenValidationError::InvalidToken);
    }

    Ok(Some(token.to_string()))
}

/// Verifies a raw token and resolves it to the stored user.
/// A valid token whose user has since been deleted is rejected as invalid.
/// Authorization uses the stored role, not the role claim.
pub fn validate_token(state: &AppState, raw_token: &str) -> Result<User, TokenValidationError> {
    let claims = state.jwt.verify(raw_token).map_err(|e| match e {
        Error::TokenExpired => TokenValidationError::TokenExpired,
        _ => TokenValidationError::InvalidToken,
    })?;

    state
        .db
        .get_user(&claims.sub)
        .map_err(|e| {
            tracing::error!("Failed to resolve token user: {e}");
            TokenValidationError::InternalError
        })?
        .ok_or(TokenValidationError::InvalidToken)
}

/// Returns true if the user may access a route open to `allowed`.
#[must_use]
pub fn has_role(user: &User, allowed: &[Role]) -> bool {
    user.role.is_allowed(allowed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(
            extract_bearer_token(Some("Bearer abc.def.ghi")).unwrap(),
            Some("abc.def.ghi".to_string())
        );
        assert!(extract_bearer_token(None).unwrap().is_none());
    }

    #[test]
    fn test_extract_rejects_other_schemes() {
        assert!(matches!(
            extract_bearer_token(Some("Basic dXNlcjpwYXNz")),
            Err(TokenValidationError::InvalidScheme)
        ));
        assert!(matches!(
            extract_bearer_token(Some("Bearer   ")),
            Err(TokenValidationError::InvalidToken)
        ));
    }
}
