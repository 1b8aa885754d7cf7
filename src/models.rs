use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::model::role::Role;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[schema(example = "John")]
    pub first_name: String,
    #[schema(example = "Manager")]
    pub last_name: String,
    #[schema(example = "manager@gmail.com", format = "email")]
    pub email: String,
    #[schema(example = "password123")]
    pub password: String,
    #[schema(example = "EMPLOYEE")]
    pub role: String,
}

impl SignupRequest {
    /// Field rules for every registration path; returns the requested role.
    pub fn validate(&self) -> Result<Role, AppError> {
        check_name("First name", &self.first_name)?;
        check_name("Last name", &self.last_name)?;

        let email = normalize_email(&self.email);
        if email.is_empty() {
            return Err(AppError::ValidationFailed("Email is required".into()));
        }
        if !is_valid_email(&email) {
            return Err(AppError::ValidationFailed("Email should be valid".into()));
        }
        if !email.ends_with("@gmail.com") {
            return Err(AppError::ValidationFailed("Only Gmail addresses are allowed".into()));
        }

        let password_len = self.password.chars().count();
        if self.password.trim().is_empty() {
            return Err(AppError::ValidationFailed("Password is required".into()));
        }
        if !(6..=100).contains(&password_len) {
            return Err(AppError::ValidationFailed(
                "Password must be between 6 and 100 characters".into(),
            ));
        }

        Role::from_str(self.role.trim()).map_err(|_| {
            AppError::ValidationFailed("Role must be either EMPLOYEE or MANAGER".into())
        })
    }
}

fn check_name(field: &str, value: &str) -> Result<(), AppError> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(AppError::ValidationFailed(format!("{field} is required")));
    }
    if !(2..=50).contains(&len) {
        return Err(AppError::ValidationFailed(format!(
            "{field} must be between 2 and 50 characters"
        )));
    }
    Ok(())
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[schema(example = "manager@gmail.com")]
    pub email: String,
    #[schema(example = "password123")]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RejectRequest {
    #[schema(example = "Budget freeze for this quarter")]
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    /// Email of the account.
    pub sub: String,
    pub role: Role,
    pub exp: usize,
    pub jti: String,
    pub token_type: TokenType,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(email: &str, password: &str, role: &str) -> SignupRequest {
        SignupRequest {
            first_name: "Alice".into(),
            last_name: "Johnson".into(),
            email: email.into(),
            password: password.into(),
            role: role.into(),
        }
    }

    #[test]
    fn accepts_well_formed_signup() {
        let role = signup("  Alice@Gmail.com ", "secret1", "employee").validate().unwrap();
        assert_eq!(role, Role::Employee);
    }

    #[test]
    fn rejects_non_gmail_and_short_passwords() {
        assert!(matches!(
            signup("alice@yahoo.com", "secret1", "EMPLOYEE").validate(),
            Err(AppError::ValidationFailed(_))
        ));
        assert!(matches!(
            signup("alice@gmail.com", "12345", "EMPLOYEE").validate(),
            Err(AppError::ValidationFailed(_))
        ));
        assert!(matches!(
            signup("@gmail.com", "secret1", "EMPLOYEE").validate(),
            Err(AppError::ValidationFailed(_))
        ));
    }

    #[test]
    fn rejects_unknown_role_and_short_names() {
        assert!(matches!(
            signup("alice@gmail.com", "secret1", "ADMIN").validate(),
            Err(AppError::ValidationFailed(_))
        ));

        let mut short = signup("alice@gmail.com", "secret1", "EMPLOYEE");
        short.last_name = "J".into();
        assert!(matches!(short.validate(), Err(AppError::ValidationFailed(_))));
    }
}
