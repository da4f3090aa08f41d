//! HTTP surface: route wiring, shared state and the error-to-response map.

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer, ResponseError};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::ApiConfig;
use crate::gateway::QueryGateway;
use crate::ratelimit::middleware::RateLimitMiddleware;
use crate::ratelimit::RateLimiter;
use crate::store::StoreError;

pub mod chapter_routes;
pub mod request_log;

#[derive(Clone)]
pub struct AppState {
    pub gateway: QueryGateway,
    pub limiter: Arc<RateLimiter>,
    pub config: ApiConfig,
}

/// Client-facing error taxonomy. Store outages never appear here; they are
/// absorbed by the cache and limiter fail-open paths.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Chapter not found")]
    NotFound,
    #[error("Unauthorized access. Admin token required.")]
    Unauthorized,
    #[error("{0}")]
    BadRequest(String),
    #[error("Server error")]
    Upstream(#[from] StoreError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ApiError::Upstream(cause) = self {
            // The client gets an opaque failure; the cause stays in the log.
            error!(error = %cause, "record store failure");
        }
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "success": false,
            "message": self.to_string(),
        }))
    }
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json("OK")
}

/// Demo helper mirroring the original service: mints a token for use in the
/// `x-admin-token` header. The accepted token itself comes from the
/// environment; this endpoint only generates candidate values.
async fn setup_admin() -> HttpResponse {
    let token = Uuid::new_v4().simple().to_string();
    info!("generated admin token candidate");
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Use this token in x-admin-token header for admin access",
        "token": token,
    }))
}

/// Register all routes on a service config. The rate limiter wraps the
/// chapters scope only, so admission always precedes cache and store work
/// on those routes.
pub fn configure(state: AppState) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        let limiter = Arc::clone(&state.limiter);
        let trust_proxy = state.config.trust_proxy;
        cfg.app_data(web::Data::new(state))
            .service(
                web::scope("/api/v1/chapters")
                    .wrap(RateLimitMiddleware::new(limiter, trust_proxy))
                    .route("", web::get().to(chapter_routes::get_chapters))
                    .route("", web::post().to(chapter_routes::upload_chapters))
                    .route("/{id}", web::get().to(chapter_routes::get_chapter)),
            )
            .route("/api/v1/setup-admin", web::get().to(setup_admin))
            .route("/health", web::get().to(health));
    }
}

pub async fn start_api_server(config: &ApiConfig, state: AppState) -> std::io::Result<()> {
    let bind = (config.host.clone(), config.port);
    info!(host = %config.host, port = config.port, "starting api server");

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(request_log::RequestLog)
            .configure(configure(state.clone()))
    })
    .bind(bind)?
    .run()
    .await
}
