use actix_web::{HttpResponse, web};
use serde::Deserialize;
use std::str::FromStr;
use utoipa::IntoParams;

use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::model::travel_request::{TravelDraft, TravelStatus};
use crate::models::RejectRequest;
use crate::service::{
    lifecycle::LifecycleEngine,
    projection::{Projections, TravelRequestView},
};

#[derive(Deserialize, IntoParams)]
pub struct StatusFilter {
    /// Only requests in this status (PENDING, APPROVED, REJECTED)
    #[param(example = "PENDING")]
    pub status: Option<String>,
    /// Every request in the organisation instead of the caller's reports
    pub everyone: Option<bool>,
}

impl StatusFilter {
    fn parse(&self) -> Result<Option<TravelStatus>, AppError> {
        self.status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                TravelStatus::from_str(s).map_err(|_| {
                    AppError::ValidationFailed(format!(
                        "Unknown status '{s}'. Allowed: PENDING, APPROVED, REJECTED"
                    ))
                })
            })
            .transpose()
    }
}

/* =========================
Submit travel request
========================= */
#[utoipa::path(
    post,
    path = "/api/travel",
    request_body(content = TravelDraft, description = "Travel request payload", content_type = "application/json"),
    responses(
        (status = 200, description = "Travel request submitted", body = TravelRequestView),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized"),
        (status = 422, description = "Not enough leave days left", body = Object, example = json!({
            "error": "INSUFFICIENT_BALANCE",
            "message": "Insufficient leave balance. Available: 2, Required: 5"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Travel"
)]
pub async fn create_travel(
    auth: AuthUser,
    engine: web::Data<LifecycleEngine>,
    projections: web::Data<Projections>,
    payload: web::Json<TravelDraft>,
) -> Result<HttpResponse, AppError> {
    auth.require_employee_or_manager()?;

    let request = engine
        .create_request(&auth.principal(), payload.into_inner())
        .await?;
    let view = projections.view(request).await?;

    Ok(HttpResponse::Ok().json(view))
}

/// The caller's own travel requests
#[utoipa::path(
    get,
    path = "/api/travel/myrequests",
    responses(
        (status = 200, description = "Own requests", body = [TravelRequestView]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Travel"
)]
pub async fn my_requests(
    auth: AuthUser,
    projections: web::Data<Projections>,
) -> Result<HttpResponse, AppError> {
    auth.require_employee_or_manager()?;

    let views = projections.list_by_employee(auth.user_id).await?;
    Ok(HttpResponse::Ok().json(views))
}

/// Requests of employees reporting to the calling manager, or all of them with `everyone=true`
#[utoipa::path(
    get,
    path = "/api/travel/all",
    params(StatusFilter),
    responses(
        (status = 200, description = "Subordinate requests", body = [TravelRequestView]),
        (status = 400, description = "Unknown status"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Travel"
)]
pub async fn manager_requests(
    auth: AuthUser,
    projections: web::Data<Projections>,
    query: web::Query<StatusFilter>,
) -> Result<HttpResponse, AppError> {
    auth.require_manager()?;

    let status = query.parse()?;
    let views = if query.everyone.unwrap_or(false) {
        projections.list_all(status).await?
    } else {
        projections.list_by_manager(auth.user_id, status).await?
    };
    Ok(HttpResponse::Ok().json(views))
}

#[utoipa::path(
    get,
    path = "/api/travel/{id}",
    params(("id" = u64, Path, description = "ID of the travel request")),
    responses(
        (status = 200, description = "Travel request found", body = TravelRequestView),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Travel request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Travel"
)]
pub async fn get_travel(
    auth: AuthUser,
    projections: web::Data<Projections>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_employee_or_manager()?;

    let view = projections.get_by_id(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(view))
}

/* =========================
Approve (manager)
========================= */
#[utoipa::path(
    put,
    path = "/api/travel/{id}/approve",
    params(("id" = u64, Path, description = "ID of the travel request to approve")),
    responses(
        (status = 200, description = "Approved, days deducted from the employee", body = TravelRequestView),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Travel request not found"),
        (status = 409, description = "Already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Travel"
)]
pub async fn approve_travel(
    auth: AuthUser,
    engine: web::Data<LifecycleEngine>,
    projections: web::Data<Projections>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_manager()?;

    let request = engine.approve(path.into_inner(), &auth.principal()).await?;
    Ok(HttpResponse::Ok().json(projections.view(request).await?))
}

/* =========================
Reject (manager)
========================= */
#[utoipa::path(
    put,
    path = "/api/travel/{id}/reject",
    params(("id" = u64, Path, description = "ID of the travel request to reject")),
    request_body = RejectRequest,
    responses(
        (status = 200, description = "Rejected", body = TravelRequestView),
        (status = 400, description = "Rejection reason is required"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Travel request not found"),
        (status = 409, description = "Already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Travel"
)]
pub async fn reject_travel(
    auth: AuthUser,
    engine: web::Data<LifecycleEngine>,
    projections: web::Data<Projections>,
    path: web::Path<u64>,
    payload: web::Json<RejectRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_manager()?;

    let request = engine
        .reject(path.into_inner(), &auth.principal(), &payload.reason)
        .await?;
    Ok(HttpResponse::Ok().json(projections.view(request).await?))
}
