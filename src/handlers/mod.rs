//! HTTP request handlers and route wiring.

pub mod transcriptions;

use actix_web::dev::HttpServiceFactory;
use actix_web::web;

use crate::config::AppConfig;
use crate::health;
use crate::middleware::{BearerAuth, RateLimit};

/// Build the `/api/v1` scope: health (unauthenticated) plus the
/// transcription routes behind the bearer guard and rate limiter.
///
/// The rate limiter is constructed once in main and cloned in here so all
/// server workers share one window map.
pub fn api_scope(config: &AppConfig, rate_limit: RateLimit) -> impl HttpServiceFactory {
    web::scope("/api/v1")
        .route("/health", web::get().to(health::health_check))
        .service(
            // Later-registered wrap runs first, so the limiter sees every
            // request before the bearer guard.
            web::scope("/transcriptions")
                .wrap(BearerAuth::new(config.auth.token.clone()))
                .wrap(rate_limit)
                .route("/upload", web::post().to(transcriptions::upload))
                .route("", web::get().to(transcriptions::list))
                .route("/{id}", web::get().to(transcriptions::get))
                .route("/{id}", web::delete().to(transcriptions::delete)),
        )
}
