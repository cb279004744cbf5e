use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::dto::{
    string_or_number,
    validation::{validate_email_address, validate_not_blank},
};

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Account email, trimmed before sending.
    pub email: String,
    /// Plain password; never logged.
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_email_address(&self.email) {
            errors.add("email", e);
        }
        if let Err(e) = validate_not_blank(&self.password) {
            errors.add("password", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Authenticated user as returned by the login endpoint and persisted locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Server-side user id, numeric ids are kept as strings.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Account email.
    pub email: String,
}

/// Response of `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Bearer token attached to later API calls.
    pub token: String,
    /// Signed-in user.
    pub user: AuthUser,
}
