//! Bearer-token guard for the API surface.
//!
//! Compares the `Authorization: Bearer <token>` header against the token
//! configured at startup. This is a static credential check, not an
//! authentication system; token issuance and user management live outside
//! this service. An empty configured token disables the guard (local
//! development only; startup validation warns about it).

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, ResponseError,
};
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use tracing::debug;

use crate::error::AppError;

pub struct BearerAuth {
    token: Rc<String>,
}

impl BearerAuth {
    pub fn new(token: String) -> Self {
        Self {
            token: Rc::new(token),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for BearerAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = BearerAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(BearerAuthMiddleware {
            service,
            token: Rc::clone(&self.token),
        }))
    }
}

pub struct BearerAuthMiddleware<S> {
    service: S,
    token: Rc<String>,
}

/// Short-circuit with the 401 JSON body rendered by this guard rather than
/// handing an error up to the dispatcher.
fn reject<B>(req: ServiceRequest, message: &str) -> ServiceResponse<EitherBody<B>> {
    let response = AppError::Unauthorized(message.to_string()).error_response();
    req.into_response(response).map_into_right_body()
}

impl<S, B> Service<ServiceRequest> for BearerAuthMiddleware<S>
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
        if !self.token.is_empty() {
            let presented = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "));

            match presented {
                Some(presented) if presented == self.token.as_str() => {}
                Some(_) => {
                    debug!(uri = %req.uri(), "rejected request with invalid bearer token");
                    return Box::pin(ready(Ok(reject(req, "invalid bearer token"))));
                }
                None => {
                    debug!(uri = %req.uri(), "rejected request without bearer token");
                    return Box::pin(ready(Ok(reject(req, "missing bearer token"))));
                }
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move { Ok(fut.await?.map_into_left_body()) })
    }
}
