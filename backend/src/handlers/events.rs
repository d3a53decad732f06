use actix_web::{web, HttpResponse, Result};
use shared::{ApiError, ApiSuccess, RecordEventRequest, XpEventType};

use crate::models::AppState;
use crate::services::events as event_service;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/events")
            .route("", web::get().to(list_events))
            .route("", web::post().to(record_event)),
    );
}

/// The caller's XP event feed, newest first.
async fn list_events(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
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

    match event_service::list_events(&state.db, user.id).await {
        Ok(events) => Ok(HttpResponse::Ok().json(ApiSuccess::new(events))),
        Err(e) => {
            log::error!("Error fetching events for user {}: {e:?}", user.id);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to fetch events".to_string(),
            }))
        }
    }
}

/// Record a client-side XP event into the caller's own feed.
async fn record_event(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    body: web::Json<RecordEventRequest>,
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

    let event_type: XpEventType = match body.event_type.parse() {
        Ok(event_type) => event_type,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "validation_error".to_string(),
                message: format!("Unknown event type: {}", body.event_type),
            }));
        }
    };

    let event = event_service::NewXpEvent {
        user_id: user.id,
        event_type,
        amount: body.amount,
        source: body.source.clone(),
        task_id: body.task_id,
        level_from: body.level_from,
        level_to: body.level_to,
    };

    match event_service::append_event(&state.db, &event).await {
        Ok(saved) => Ok(HttpResponse::Created().json(ApiSuccess::new(saved))),
        Err(e) => {
            log::error!("Error recording event for user {}: {e:?}", user.id);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to record event".to_string(),
            }))
        }
    }
}
