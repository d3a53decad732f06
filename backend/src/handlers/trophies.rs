use actix_web::{web, HttpResponse, Result};
use shared::{ApiError, ApiSuccess};

use crate::models::AppState;
use crate::services::trophies as trophy_service;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/trophies").route("", web::get().to(list_trophies)));
}

/// The trophy catalog annotated with the caller's unlock state.
async fn list_trophies(
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

    match trophy_service::list_trophies(&state.db, Some(user.id)).await {
        Ok(trophies) => Ok(HttpResponse::Ok().json(ApiSuccess::new(trophies))),
        Err(e) => {
            log::error!("Error fetching trophies for user {}: {e:?}", user.id);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to fetch trophies".to_string(),
            }))
        }
    }
}
