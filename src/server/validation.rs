use serde_json::Value;

use crate::server::response::{ApiError, FieldError};
use crate::types::Role;

const MIN_NAME_LEN: usize = 20;
const MAX_NAME_LEN: usize = 60;
const MAX_ADDRESS_LEN: usize = 400;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 16;
const MAX_EMAIL_LEN: usize = 254;

/// Characters that satisfy the "special character" password rule.
pub const PASSWORD_SPECIALS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Collects every failing field of a request before rejecting it.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure for `field`. Only the first failure per field is kept.
    pub fn check(&mut self, field: &str, result: Result<(), String>) {
        if let Err(message) = result {
            if self.errors.iter().any(|e| e.field == field) {
                return;
            }
            self.errors.push(FieldError {
                field: field.to_string(),
                message,
            });
        }
    }

    /// Like `check`, but keeps the parsed value on success.
    pub fn parse<T>(&mut self, field: &str, result: Result<T, String>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(message) => {
                self.check(field, Err(message));
                None
            }
        }
    }

    /// Reads an optional text field. Any other JSON type is a field error.
    pub fn text(&mut self, field: &str, value: Option<Value>) -> Option<String> {
        match value {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(_) => {
                self.check(field, Err("Must be a string".to_string()));
                None
            }
        }
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation(self.errors))
        }
    }
}

pub fn validate_user_name(name: &str) -> Result<(), String> {
    let len = name.chars().count();
    if !(MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) {
        return Err(format!(
            "Name must be between {MIN_NAME_LEN} and {MAX_NAME_LEN} characters"
        ));
    }
    Ok(())
}

pub fn validate_store_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Store name is required".to_string());
    }
    Ok(())
}

pub fn validate_address(address: Option<&str>) -> Result<(), String> {
    match address {
        Some(a) if a.chars().count() > MAX_ADDRESS_LEN => Err(format!(
            "Address cannot exceed {MAX_ADDRESS_LEN} characters"
        )),
        _ => Ok(()),
    }
}

pub fn validate_email(email: &str) -> Result<(), String> {
    let invalid = || Err("A valid email address is required".to_string());
    let email = email.trim();

    if email.is_empty() || email.len() > MAX_EMAIL_LEN || email.contains(char::is_whitespace) {
        return invalid();
    }

    let Some((local, domain)) = email.split_once('@') else {
        return invalid();
    };

    if local.is_empty() || domain.contains('@') {
        return invalid();
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2
        || labels
            .iter()
            .any(|l| l.is_empty() || l.starts_with('-') || l.ends_with('-'))
    {
        return invalid();
    }

    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    let len = password.chars().count();
    let length_ok = (MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len);
    let upper_ok = password.chars().any(|c| c.is_ascii_uppercase());
    let special_ok = password.chars().any(|c| PASSWORD_SPECIALS.contains(c));

    if !length_ok || !upper_ok || !special_ok {
        return Err(format!(
            "Password must be {MIN_PASSWORD_LEN}-{MAX_PASSWORD_LEN} chars, include at least one \
             uppercase and one special character"
        ));
    }
    Ok(())
}

/// Accepts an integer JSON number (or a string holding one) between 1 and 5.
pub fn parse_rating_value(value: Option<&Value>) -> Result<u8, String> {
    let invalid = || "Rating must be an integer between 1 and 5".to_string();

    let n = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(invalid)?;

    u8::try_from(n)
        .ok()
        .filter(|v| (1..=5).contains(v))
        .ok_or_else(invalid)
}

pub fn parse_role(role: &str) -> Result<Role, String> {
    Role::parse(role.trim()).ok_or_else(|| "Role must be one of ADMIN, USER, OWNER".to_string())
}

/// Emails are stored and looked up trimmed and lowercased.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Treats blank optional text as absent.
#[must_use]
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
