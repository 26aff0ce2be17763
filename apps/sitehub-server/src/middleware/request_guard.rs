//! Rejects requests without a Host or with an oversized declared body.

use actix_web::{
    Error, ResponseError,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::{CONTENT_LENGTH, HOST},
};
use std::future::{Future, Ready, ready};
use std::pin::Pin;

use super::error::AppError;

/// Request guard middleware factory.
pub struct RequestGuard {
    max_body_bytes: u64,
}

impl RequestGuard {
    pub fn new(max_body_bytes: u64) -> Self {
        Self { max_body_bytes }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RequestGuardService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestGuardService {
            service,
            max_body_bytes: self.max_body_bytes,
        }))
    }
}

pub struct RequestGuardService<S> {
    service: S,
    max_body_bytes: u64,
}

impl<S> RequestGuardService<S> {
    fn check(&self, req: &ServiceRequest) -> Result<(), AppError> {
        let has_host = req
            .headers()
            .get(HOST)
            .is_some_and(|v| !v.as_bytes().is_empty())
            || req.uri().host().is_some();
        if !has_host {
            tracing::warn!("Request without Host header");
            return Err(AppError::MissingHost);
        }

        let declared = req
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        if declared.is_some_and(|len| len > self.max_body_bytes) {
            tracing::warn!(
                declared = declared.unwrap_or_default(),
                limit = self.max_body_bytes,
                "Request body too large"
            );
            return Err(AppError::PayloadTooLarge);
        }

        Ok(())
    }
}

impl<S, B> Service<ServiceRequest> for RequestGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if let Err(err) = self.check(&req) {
            let response = req.into_response(err.error_response());
            return Box::pin(async move { Ok(response.map_into_right_body()) });
        }

        let fut = self.service.call(req);
        Box::pin(async move { Ok(fut.await?.map_into_left_body()) })
    }
}
