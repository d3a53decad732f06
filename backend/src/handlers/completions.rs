use actix_web::{web, HttpResponse, Result};
use serde::Deserialize;
use shared::{ApiError, ApiSuccess};
use uuid::Uuid;

use crate::models::AppState;
use crate::services::completions as completion_service;

#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    pub limit: Option<i64>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/completions")
            .route("/pending", web::get().to(list_pending))
            .route("/{completion_id}/approve", web::post().to(approve_completion))
            .route("/{completion_id}/reject", web::post().to(reject_completion)),
    );
}

/// The admin review queue, oldest first.
async fn list_pending(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    query: web::Query<PendingQuery>,
) -> Result<HttpResponse> {
    let user = match crate::middleware::telegram::extract_user(&req, &state.config.bot_token) {
        Ok(user) => user,
        Err(_) => {
            return Ok(HttpResponse::Unauthorized().json(ApiError {
                error: "unauthorized".to_string(),
                message: "Invalid or missing Telegram credentials".to_string(),
            }));
        }
    };

    if !state.config.is_admin(user.id) {
        return Ok(HttpResponse::Forbidden().json(ApiError {
            error: "forbidden".to_string(),
            message: "You do not have permission to review completions".to_string(),
        }));
    }

    match completion_service::list_pending(&state.db, query.limit).await {
        Ok(items) => Ok(HttpResponse::Ok().json(ApiSuccess::new(items))),
        Err(e) => {
            log::error!("Error listing pending completions: {e:?}");
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to list pending completions".to_string(),
            }))
        }
    }
}

async fn approve_completion(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user = match crate::middleware::telegram::extract_user(&req, &state.config.bot_token) {
        Ok(user) => user,
        Err(_) => {
            return Ok(HttpResponse::Unauthorized().json(ApiError {
                error: "unauthorized".to_string(),
                message: "Invalid or missing Telegram credentials".to_string(),
            }));
        }
    };

    if !state.config.is_admin(user.id) {
        return Ok(HttpResponse::Forbidden().json(ApiError {
            error: "forbidden".to_string(),
            message: "You do not have permission to approve completions".to_string(),
        }));
    }

    let completion_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid completion ID format".to_string(),
            }));
        }
    };

    match completion_service::approve(&state.db, &completion_id, user.id).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiSuccess::new(response))),
        Err(completion_service::CompletionError::NotFound) => {
            Ok(HttpResponse::NotFound().json(ApiError {
                error: "completion_not_found".to_string(),
                message: "Task completion not found".to_string(),
            }))
        }
        Err(completion_service::CompletionError::InvalidStatus) => {
            Ok(HttpResponse::Conflict().json(ApiError {
                error: "invalid_status".to_string(),
                message: "Completion is not pending".to_string(),
            }))
        }
        Err(e) => {
            log::error!("Error approving completion {completion_id}: {e:?}");
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to approve completion".to_string(),
            }))
        }
    }
}

async fn reject_completion(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user = match crate::middleware::telegram::extract_user(&req, &state.config.bot_token) {
        Ok(user) => user,
        Err(_) => {
            return Ok(HttpResponse::Unauthorized().json(ApiError {
                error: "unauthorized".to_string(),
                message: "Invalid or missing Telegram credentials".to_string(),
            }));
        }
    };

    if !state.config.is_admin(user.id) {
        return Ok(HttpResponse::Forbidden().json(ApiError {
            error: "forbidden".to_string(),
            message: "You do not have permission to reject completions".to_string(),
        }));
    }

    let completion_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid completion ID format".to_string(),
            }));
        }
    };

    match completion_service::reject(&state.db, &completion_id, user.id).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiSuccess::new(response))),
        Err(completion_service::CompletionError::NotFound) => {
            Ok(HttpResponse::NotFound().json(ApiError {
                error: "completion_not_found".to_string(),
                message: "Task completion not found".to_string(),
            }))
        }
        Err(completion_service::CompletionError::InvalidStatus) => {
            Ok(HttpResponse::Conflict().json(ApiError {
                error: "invalid_status".to_string(),
                message: "Completion is not pending".to_string(),
            }))
        }
        Err(e) => {
            log::error!("Error rejecting completion {completion_id}: {e:?}");
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to reject completion".to_string(),
            }))
        }
    }
}
