//! Validation helpers for DTOs.

use validator::{ValidateEmail, ValidationError};

/// Validates that a value contains something other than whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("value must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Validates that an email address is well formed.
///
/// # Examples
///
/// ```ignore
/// validate_email_address("coach@club.org") // Ok
/// validate_email_address("coach")          // Err - no domain
/// ```
pub fn validate_email_address(email: &str) -> Result<(), ValidationError> {
    if !email.trim().to_string().validate_email() {
        let mut err = ValidationError::new("email_format");
        err.message = Some(format!("`{email}` is not a valid email address").into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("secret").is_ok());
        assert!(validate_not_blank("").is_err());
        assert!(validate_not_blank(" \t ").is_err());
    }

    #[test]
    fn test_validate_email_address() {
        assert!(validate_email_address("coach@club.org").is_ok());
        assert!(validate_email_address("coach").is_err());
        assert!(validate_email_address("").is_err());
    }
}
