use super::models::{LoginRequest, RegisterRequest, UpdateProfileRequest};
use crate::common::validation::{check_length, is_valid_email};
use crate::common::{ValidationResult, Validator};

impl Validator<RegisterRequest> for RegisterRequest {
    fn validate(&self, data: &RegisterRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.email.trim().is_empty() {
            result.add_error("email", "Email is required");
        } else if !is_valid_email(&data.email) {
            result.add_error("email", "Email must be a valid email address");
        } else if data.email.trim().len() > 255 {
            result.add_error("email", "Email must not exceed 255 characters");
        }

        if data.password.len() < 8 {
            result.add_error("password", "Password must be at least 8 characters");
        } else if data.password.len() > 72 {
            result.add_error("password", "Password must not exceed 72 characters");
        }

        check_length(&mut result, "full_name", data.full_name.trim(), 2, 255);

        result
    }
}

impl Validator<LoginRequest> for LoginRequest {
    fn validate(&self, data: &LoginRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.email.trim().is_empty() {
            result.add_error("email", "Email is required");
        } else if !is_valid_email(&data.email) {
            result.add_error("email", "Email must be a valid email address");
        }

        if data.password.is_empty() {
            result.add_error("password", "Password is required");
        }

        result
    }
}

impl Validator<UpdateProfileRequest> for UpdateProfileRequest {
    fn validate(&self, data: &UpdateProfileRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        check_length(&mut result, "full_name", data.full_name.trim(), 2, 255);

        if let Some(phone) = &data.phone {
            if phone.trim().chars().count() > 20 {
                result.add_error("phone", "Phone must not exceed 20 characters");
            }
        }

        if let Some(address) = &data.address {
            if address.trim().chars().count() > 500 {
                result.add_error("address", "Address must not exceed 500 characters");
            }
        }

        result
    }
}
