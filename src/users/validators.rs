use super::models::RegisterRequest;
use crate::common::validation::{check_email, check_password, MIN_NAME_LENGTH};
use crate::common::{ValidationResult, Validator};

impl Validator for RegisterRequest {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        if self.name.trim().chars().count() < MIN_NAME_LENGTH {
            result.add_error("name", "Name must be at least 2 characters");
        }

        check_email(&mut result, "email", &self.email);
        check_password(&mut result, "password", &self.password);

        result
    }
}
