use crate::{
    api::{attendance, employee},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .milliseconds_per_request(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let check_in_limiter = Arc::new(build_limiter(config.rate_check_in_per_min));
    let check_out_limiter = Arc::new(build_limiter(config.rate_check_out_per_min));
    let verify_limiter = Arc::new(build_limiter(config.rate_verify_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Everything sits behind bearer auth; check-in/out/verify get their own
    // tighter limiters on top of the blanket one.
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(
                web::scope("/attendance")
                    .service(
                        web::resource("/check-in")
                            .wrap(check_in_limiter.clone())
                            .route(web::post().to(attendance::check_in)),
                    )
                    .service(
                        web::resource("/check-out")
                            .wrap(check_out_limiter.clone())
                            .route(web::put().to(attendance::check_out)),
                    )
                    .service(
                        web::resource("/verify-face")
                            .wrap(verify_limiter.clone())
                            .route(web::post().to(attendance::verify_face)),
                    )
                    .service(web::resource("/today").route(web::get().to(attendance::today)))
                    // /attendance/{id} (admin surface)
                    .service(
                        web::resource("/{id}")
                            .route(web::patch().to(attendance::override_record))
                            .route(web::delete().to(attendance::delete_record)),
                    ),
            )
            .service(
                web::scope("/employees")
                    // /employees/{id}
                    .service(
                        web::resource("/{id}").route(web::get().to(employee::get_employee)),
                    )
                    // /employees/{id}/face
                    .service(
                        web::resource("/{id}/face")
                            .route(web::put().to(employee::register_face)),
                    ),
            ),
    );
}
