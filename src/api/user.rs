use actix_web::{HttpResponse, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::model::user::UserSummary;
use crate::models::SignupRequest;
use crate::service::user_ledger::UserLedger;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveBalance {
    #[schema(example = 25)]
    pub leaves_left: i32,
}

/// Create an account (manager only). Employees are linked to the creating manager.
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = UserSummary),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Email already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn create_user(
    auth: AuthUser,
    users: web::Data<UserLedger>,
    payload: web::Json<SignupRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_manager()?;

    let user = users.register_by_manager(&auth.principal(), &payload).await?;
    Ok(HttpResponse::Created().json(UserSummary::from(&user)))
}

/// Profile of the calling user
#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Own profile", body = UserSummary),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn me(auth: AuthUser, users: web::Data<UserLedger>) -> Result<HttpResponse, AppError> {
    let user = users.find_by_id(auth.user_id).await?;
    Ok(HttpResponse::Ok().json(UserSummary::from(&user)))
}

/// Remaining leave days; self, or any user for managers
#[utoipa::path(
    get,
    path = "/api/users/{id}/leaves",
    params(("id" = u64, Path, description = "User whose balance to read")),
    responses(
        (status = 200, description = "Leave balance", body = LeaveBalance),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not your balance"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn leave_balance(
    auth: AuthUser,
    users: web::Data<UserLedger>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let leaves_left = users
        .leave_balance(&auth.principal(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(LeaveBalance { leaves_left }))
}
