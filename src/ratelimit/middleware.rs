//! Actix middleware enforcing the distributed rate limit per route scope.
//!
//! Admission always runs before the wrapped handler, so a rejected request
//! never touches the cache or the record store.

use std::sync::Arc;

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderValue, RETRY_AFTER},
    Error, HttpResponse,
};
use futures_util::future::LocalBoxFuture;

use super::{Admission, RateLimiter};

/// Client identity for rate limiting: the request's origin address.
///
/// Priority with `trust_proxy`:
/// 1. `X-Forwarded-For` header (first IP)
/// 2. `Forwarded` header (`for=` field, RFC 7239)
/// 3. peer address from the connection
pub fn extract_client_ip(req: &ServiceRequest, trust_proxy: bool) -> String {
    if trust_proxy {
        if let Some(header) = req.headers().get("X-Forwarded-For") {
            if let Ok(s) = header.to_str() {
                if let Some(ip) = s.split(',').next() {
                    return ip.trim().to_string();
                }
            }
        }

        if let Some(header) = req.headers().get("Forwarded") {
            if let Ok(s) = header.to_str() {
                if let Some(for_clause) = s.split(';').find(|c| c.trim().starts_with("for=")) {
                    let ip = for_clause
                        .trim()
                        .trim_start_matches("for=")
                        .trim_start_matches('[')
                        .trim_end_matches(']');
                    return ip.to_string();
                }
            }
        }
    }

    req.connection_info()
        .peer_addr()
        .unwrap_or("127.0.0.1")
        .to_string()
}

pub struct RateLimitMiddleware {
    limiter: Arc<RateLimiter>,
    trust_proxy: bool,
}

impl RateLimitMiddleware {
    pub fn new(limiter: Arc<RateLimiter>, trust_proxy: bool) -> Self {
        Self {
            limiter,
            trust_proxy,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RateLimitMiddlewareService {
            service: Arc::new(service),
            limiter: Arc::clone(&self.limiter),
            trust_proxy: self.trust_proxy,
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Arc<S>,
    limiter: Arc<RateLimiter>,
    trust_proxy: bool,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let client_ip = extract_client_ip(&req, self.trust_proxy);
        let limiter = Arc::clone(&self.limiter);
        let service = Arc::clone(&self.service);

        Box::pin(async move {
            match limiter.admit(&client_ip).await {
                Admission::Admitted => {
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Admission::Rejected { retry_after_secs } => {
                    let resp = HttpResponse::TooManyRequests()
                        .insert_header((
                            RETRY_AFTER,
                            HeaderValue::from_str(&retry_after_secs.to_string())
                                .unwrap_or_else(|_| HeaderValue::from_static("1")),
                        ))
                        .json(serde_json::json!({
                            "success": false,
                            "message": "Too many requests, please try again later.",
                        }));
                    Ok(req.into_response(resp.map_into_right_body()))
                }
            }
        })
    }
}
