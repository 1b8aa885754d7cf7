use crate::{
    api::{travel_request, user},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    error::AppError,
    service::Services,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = 60_000 / u64::from(requests_per_min);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms.max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_default();
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config, services: Services) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    cfg.app_data(web::Data::new(config.clone()))
        .app_data(services.users)
        .app_data(services.lifecycle)
        .app_data(services.projections);

    // Extractor failures use the same {error, message} body as AppError
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _| AppError::ValidationFailed(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _| AppError::ValidationFailed(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _| AppError::ValidationFailed(err.to_string()).into()),
    );

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/signup/public")
                    .wrap(register_limiter.clone())
                    .route(web::post().to(handlers::signup_public)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/travel")
                    // /travel
                    .service(web::resource("").route(web::post().to(travel_request::create_travel)))
                    // /travel/myrequests
                    .service(
                        web::resource("/myrequests").route(web::get().to(travel_request::my_requests)),
                    )
                    // /travel/all?status=
                    .service(
                        web::resource("/all").route(web::get().to(travel_request::manager_requests)),
                    )
                    // /travel/{id}
                    .service(web::resource("/{id}").route(web::get().to(travel_request::get_travel)))
                    // /travel/{id}/approve
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(travel_request::approve_travel)),
                    )
                    // /travel/{id}/reject
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(travel_request::reject_travel)),
                    ),
            )
            .service(
                web::scope("/users")
                    // /users
                    .service(web::resource("").route(web::post().to(user::create_user)))
                    // /users/me
                    .service(web::resource("/me").route(web::get().to(user::me)))
                    // /users/{id}/leaves
                    .service(web::resource("/{id}/leaves").route(web::get().to(user::leave_balance))),
            ),
    );
}
