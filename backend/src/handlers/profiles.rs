use actix_web::{web, HttpResponse, Result};
use shared::{ApiError, ApiSuccess, ProfileResponse, SyncProfileRequest};

use crate::models::AppState;
use crate::services::profiles as profile_service;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/profile")
            .route("", web::get().to(get_profile))
            .route("/sync", web::post().to(sync_profile)),
    );
}

/// The caller's own XP profile. Users who never earned XP get the default
/// view (level 1, 0 XP) without a row being persisted.
async fn get_profile(
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

    match profile_service::get_profile(&state.db, user.id).await {
        Ok((profile, is_new)) => {
            Ok(HttpResponse::Ok().json(ApiSuccess::new(ProfileResponse { profile, is_new })))
        }
        Err(e) => {
            log::error!("Error fetching profile for user {}: {e:?}", user.id);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to fetch profile".to_string(),
            }))
        }
    }
}

/// Persist a client-reported XP total. Level fields are recomputed
/// server-side from the total; clients cannot set them directly.
async fn sync_profile(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    body: web::Json<SyncProfileRequest>,
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

    if body.total_xp < 0 {
        return Ok(HttpResponse::BadRequest().json(ApiError {
            error: "validation_error".to_string(),
            message: "total_xp must not be negative".to_string(),
        }));
    }

    match profile_service::sync_profile(&state.db, user.id, body.total_xp).await {
        Ok(profile) => Ok(HttpResponse::Ok().json(ApiSuccess::new(profile))),
        Err(e) => {
            log::error!("Error syncing profile for user {}: {e:?}", user.id);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to sync profile".to_string(),
            }))
        }
    }
}
