use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::AppError;
use crate::model::role::Role;
use crate::models::TokenType;
use crate::service::Principal;

/// Caller identity established from a bearer access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub email: String,
    pub role: Role,
}

/// Decodes `Authorization: Bearer <access token>` into an [`AuthUser`].
pub fn authenticate_header(header: Option<&str>, config: &Config) -> Result<AuthUser, AppError> {
    let header = header.ok_or(AppError::Unauthorized("Missing Authorization header"))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized("Authorization header must start with Bearer"))?;

    let claims = verify_token(token, &config.jwt_secret).map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        AppError::Unauthorized("Invalid or expired token")
    })?;

    if claims.token_type != TokenType::Access {
        return Err(AppError::Unauthorized("Access token required"));
    }

    Ok(AuthUser {
        user_id: claims.user_id,
        email: claims.sub,
        role: claims.role,
    })
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // set by auth_middleware on protected scopes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let Some(config) = req.app_data::<Data<Config>>() else {
            tracing::error!("Config missing from app data");
            return ready(Err(AppError::Internal));
        };

        let header = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok());

        ready(authenticate_header(header, config))
    }
}

impl AuthUser {
    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.user_id,
            role: self.role,
        }
    }

    pub fn require_manager(&self) -> Result<(), AppError> {
        if self.role.is_manager() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Manager only"))
        }
    }

    /// Both roles may submit and view their own requests. Total over [`Role`];
    /// a new role has to be placed here explicitly.
    pub fn require_employee_or_manager(&self) -> Result<(), AppError> {
        match self.role {
            Role::Employee | Role::Manager => Ok(()),
        }
    }
}
