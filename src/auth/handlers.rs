use actix_web::{HttpRequest, HttpResponse, web};
use serde::Serialize;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

use crate::{
    auth::jwt::{generate_access_token, generate_refresh_token, verify_token},
    config::Config,
    error::AppError,
    model::{role::Role, user::{User, UserSummary}},
    models::{LoginRequest, SignupRequest, TokenType},
    service::user_ledger::UserLedger,
};

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    pub id: u64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

fn issue_tokens(user: &User, config: &Config) -> Result<LoginResponse, AppError> {
    let access_token =
        generate_access_token(user, &config.jwt_secret, config.access_token_ttl).map_err(|e| {
            error!(error = %e, "Failed to sign access token");
            AppError::Internal
        })?;

    let (refresh_token, refresh_claims) =
        generate_refresh_token(user, &config.jwt_secret, config.refresh_token_ttl).map_err(|e| {
            error!(error = %e, "Failed to sign refresh token");
            AppError::Internal
        })?;
    debug!(user_id = user.id, jti = %refresh_claims.jti, "Issued refresh token");

    Ok(LoginResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        id: user.id,
        email: user.email.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        role: user.role,
    })
}

/// Exchange email and password for an access/refresh token pair
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Unknown user or wrong password", body = Object, example = json!({
            "error": "INVALID_CREDENTIALS",
            "message": "Invalid password"
        }))
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(users, config, payload), fields(email = %payload.email))]
pub async fn login(
    payload: web::Json<LoginRequest>,
    users: web::Data<UserLedger>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    info!("Login request received");

    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::ValidationFailed("Email and password are required".into()));
    }

    let user = users.authenticate(&payload.email, &payload.password).await?;
    let response = issue_tokens(&user, &config)?;

    info!(user_id = user.id, "Login successful");
    Ok(HttpResponse::Ok().json(response))
}

/// Rotate a refresh token into a fresh token pair
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = LoginResponse),
        (status = 401, description = "Missing, invalid or non-refresh token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    users: web::Data<UserLedger>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized("Missing refresh token"))?;

    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token"))?;

    if claims.token_type != TokenType::Refresh {
        return Err(AppError::Unauthorized("Refresh token required"));
    }

    // reload so role and profile changes since login are picked up
    let user = users
        .find_by_id(claims.user_id)
        .await
        .map_err(|_| AppError::Unauthorized("Account no longer exists"))?;

    Ok(HttpResponse::Ok().json(issue_tokens(&user, &config)?))
}

/// Public signup, only open while no manager exists; always creates a manager
#[utoipa::path(
    post,
    path = "/auth/signup/public",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Manager account created", body = UserSummary),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Public registration disabled", body = Object, example = json!({
            "error": "REGISTRATION_CLOSED",
            "message": "Public registration disabled, please contact your manager for account creation"
        })),
        (status = 409, description = "Email already exists")
    ),
    tag = "Auth"
)]
pub async fn signup_public(
    payload: web::Json<SignupRequest>,
    users: web::Data<UserLedger>,
) -> Result<HttpResponse, AppError> {
    let user = users.register_public(&payload).await?;
    Ok(HttpResponse::Created().json(UserSummary::from(&user)))
}
