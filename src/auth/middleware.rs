use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};

use crate::auth::auth::authenticate_header;
use crate::config::Config;
use crate::error::AppError;

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let Some(config) = req.app_data::<Data<Config>>().cloned() else {
        tracing::error!("App config missing");
        let resp = AppError::Internal.error_response();
        return Ok(req.into_response(resp));
    };

    let header = req
        .headers()
        .get("Authorization")
        .map(|h| h.to_str().map_err(|_| AppError::Unauthorized("Invalid Authorization header encoding")))
        .transpose();

    let auth_user = match header.and_then(|h| authenticate_header(h, &config)) {
        Ok(user) => user,
        Err(err) => {
            let resp = err.error_response();
            return Ok(req.into_response(resp));
        }
    };

    tracing::debug!(user_id = auth_user.user_id, email = %auth_user.email, "Authenticated request");
    req.extensions_mut().insert(auth_user);

    next.call(req).await
}
