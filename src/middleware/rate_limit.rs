//! Fixed-window rate limiting, applied uniformly to the API surface.
//!
//! Each client IP gets a request budget per window (100 requests per 15
//! minutes by default). The counter state lives in process memory; a
//! restart resets all windows, which is acceptable for this service's
//! availability-over-strictness posture.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, ResponseError,
};
use futures_util::future::LocalBoxFuture;
use std::collections::HashMap;
use std::future::{ready, Ready};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::RateLimitConfig;
use crate::error::AppError;

// Windows map entries are pruned once the map grows past this.
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug, Default)]
struct Windows {
    by_client: HashMap<String, Window>,
}

/// Cloneable so one shared window map serves every server worker.
#[derive(Clone)]
pub struct RateLimit {
    max_requests: u32,
    window: Duration,
    windows: Arc<Mutex<Windows>>,
}

impl RateLimit {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max_requests: config.requests,
            window: Duration::from_secs(config.window),
            windows: Arc::new(Mutex::new(Windows::default())),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddleware {
            service,
            max_requests: self.max_requests,
            window: self.window,
            windows: Arc::clone(&self.windows),
        }))
    }
}

pub struct RateLimitMiddleware<S> {
    service: S,
    max_requests: u32,
    window: Duration,
    windows: Arc<Mutex<Windows>>,
}

impl<S> RateLimitMiddleware<S> {
    /// Count this request against the client's window. Returns false once
    /// the budget is exhausted.
    fn admit(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if windows.by_client.len() > PRUNE_THRESHOLD {
            let window = self.window;
            windows
                .by_client
                .retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = windows
            .by_client
            .entry(client.to_string())
            .or_insert(Window {
                started: now,
                count: 0,
            });

        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        entry.count += 1;
        entry.count <= self.max_requests
    }
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let client = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string();

        if !self.admit(&client) {
            debug!(client = %client, uri = %req.uri(), "rate limit exceeded");
            // Render the 429 here so the limiter itself produces the JSON
            // error body instead of a service-level error.
            let response = AppError::RateLimited("too many requests, try again later".to_string())
                .error_response();
            return Box::pin(ready(Ok(req.into_response(response).map_into_right_body())));
        }

        let fut = self.service.call(req);
        Box::pin(async move { Ok(fut.await?.map_into_left_body()) })
    }
}
