// Common validation types and traits

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<FieldError>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.is_valid = false;
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    /// Ok when no errors were collected, otherwise the result itself as the error
    pub fn into_result(self) -> Result<(), ValidationResult> {
        if self.is_valid {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

pub trait Validator {
    fn validate(&self) -> ValidationResult;
}

pub const MIN_NAME_LENGTH: usize = 2;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_EMAIL_LENGTH: usize = 254;

fn email_regex() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
            .expect("email regex is valid")
    })
}

/// Trimmed, lower-cased form under which emails are stored and looked up
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.len() <= MAX_EMAIL_LENGTH && email_regex().is_match(email)
}

/// Adds an error for `field` unless `email` is well formed
pub fn check_email(result: &mut ValidationResult, field: &str, email: &str) {
    if email.trim().is_empty() {
        result.add_error(field, "Email is required");
    } else if !is_valid_email(email) {
        result.add_error(field, "Invalid email address");
    }
}

/// Adds an error for `field` when `password` is shorter than the minimum
pub fn check_password(result: &mut ValidationResult, field: &str, password: &str) {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        result.add_error(field, "Password must be at least 8 characters");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last+chat@mail.example.co.uk"));
        assert!(is_valid_email("  padded@example.com  "));
    }

    #[test]
    fn test_invalid_emails() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("user name@example.com"));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  User@Example.COM "), "user@example.com");
    }

    #[test]
    fn test_password_length_counts_characters() {
        let mut result = ValidationResult::new();
        // Bangla text: fewer characters than bytes
        check_password(&mut result, "password", "আমারসোনারব");
        assert!(result.is_valid);

        let mut result = ValidationResult::new();
        check_password(&mut result, "password", "short");
        assert!(!result.is_valid);
        assert_eq!(result.errors[0].field, "password");
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationResult::new().into_result().is_ok());

        let mut result = ValidationResult::new();
        result.add_error("email", "Email is required");
        let err = result.into_result().unwrap_err();
        assert_eq!(err.errors.len(), 1);
    }
}
