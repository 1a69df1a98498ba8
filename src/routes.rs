use crate::{
    api::{leave_balance, leave_request},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

// Per-IP limiter; `None` when the settings cannot form a quota.
fn build_limiter(requests_per_min: u32) -> Option<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / requests_per_min as u64).max(1)
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()?;
    Some(Governor::new(&cfg))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let scope = web::scope(&config.api_prefix)
        // authentication
        .wrap(from_fn(auth_middleware))
        .configure(leave_routes);

    // rate limiting
    match build_limiter(config.rate_protected_per_min) {
        Some(limiter) => cfg.service(scope.wrap(limiter)),
        None => {
            tracing::warn!(
                rate = config.rate_protected_per_min,
                "Invalid rate limit, protected routes are not throttled"
            );
            cfg.service(scope)
        }
    };
}

/// Leave routes, relative to the protected scope.
pub fn leave_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/leave")
            // /leave/balance
            .service(web::resource("/balance").route(web::get().to(leave_balance::my_balances)))
            // /leave/balance/{employee_id}
            .service(
                web::resource("/balance/{employee_id}")
                    .route(web::get().to(leave_balance::employee_balances)),
            )
            // /leave/balance/{employee_id}/init/{year}
            .service(
                web::resource("/balance/{employee_id}/init/{year}")
                    .route(web::post().to(leave_balance::initialize_year)),
            )
            // /leave/balance/{employee_id}/{leave_type_id}/{year}
            .service(
                web::resource("/balance/{employee_id}/{leave_type_id}/{year}")
                    .route(web::put().to(leave_balance::adjust_balance)),
            )
            // /leave/pending
            .service(web::resource("/pending").route(web::get().to(leave_request::pending_leave)))
            // /leave
            .service(
                web::resource("")
                    .route(web::get().to(leave_request::leave_list))
                    .route(web::post().to(leave_request::create_leave)),
            )
            // /leave/{id}
            .service(web::resource("/{id}").route(web::get().to(leave_request::get_leave)))
            // /leave/{id}/approve
            .service(
                web::resource("/{id}/approve").route(web::put().to(leave_request::approve_leave)),
            )
            // /leave/{id}/reject
            .service(
                web::resource("/{id}/reject").route(web::put().to(leave_request::reject_leave)),
            )
            // /leave/{id}/cancel
            .service(
                web::resource("/{id}/cancel").route(web::put().to(leave_request::cancel_leave)),
            ),
    );
}
