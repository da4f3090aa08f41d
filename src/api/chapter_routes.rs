//! Chapter endpoint handlers.

use actix_multipart::Multipart;
use actix_web::http::header::ContentType;
use actix_web::{web, HttpRequest, HttpResponse};
use futures_util::StreamExt;
use serde_json::Value;

use super::{ApiError, AppState};

/// GET /api/v1/chapters - filtered, paginated list, served through the
/// cache-aside gateway.
pub async fn get_chapters(
    state: web::Data<AppState>,
    query: web::Query<crate::gateway::ChapterListQuery>,
) -> Result<HttpResponse, ApiError> {
    let outcome = state.gateway.list_chapters(&query).await?;
    Ok(HttpResponse::Ok()
        .content_type(ContentType::json())
        .body(outcome.body))
}

/// GET /api/v1/chapters/{id}
pub async fn get_chapter(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    match state.gateway.get_chapter(&id).await? {
        Some(chapter) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "data": chapter,
        }))),
        None => Err(ApiError::NotFound),
    }
}

fn require_admin(req: &HttpRequest, state: &AppState) -> Result<(), ApiError> {
    let configured = state.config.admin_token.as_str();
    // An unset token means admin access is disabled outright, never open.
    if configured.is_empty() {
        return Err(ApiError::Unauthorized);
    }
    let presented = req
        .headers()
        .get("x-admin-token")
        .and_then(|v| v.to_str().ok());
    if presented == Some(configured) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

async fn read_file_field(mut payload: Multipart) -> Result<Vec<u8>, ApiError> {
    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| ApiError::BadRequest(format!("File upload failed: {e}")))?;
        if field.name() != Some("file") {
            continue;
        }
        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|e| ApiError::BadRequest(format!("File upload failed: {e}")))?;
            bytes.extend_from_slice(&chunk);
        }
        return Ok(bytes);
    }
    Err(ApiError::BadRequest("No file uploaded".to_string()))
}

/// POST /api/v1/chapters - admin-only batch upload of a JSON array file.
/// Per-item validation failures are reported, not fatal.
pub async fn upload_chapters(
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    require_admin(&req, &state)?;

    let bytes = read_file_field(payload).await?;
    let parsed: Value = serde_json::from_slice(&bytes)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON file: {e}")))?;
    let items = match parsed {
        Value::Array(items) => items,
        _ => {
            return Err(ApiError::BadRequest(
                "Invalid file format. Expected an array of chapters.".to_string(),
            ))
        }
    };

    let response = state.gateway.upload_chapters(items).await?;
    Ok(HttpResponse::Ok().json(response))
}
