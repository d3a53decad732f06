use actix_web::{web, HttpResponse, Result};
use serde::Deserialize;
use shared::{ApiError, ApiSuccess, ArchiveTaskResponse, CreateTaskRequest, SubmitCompletionRequest};

use crate::models::AppState;
use crate::services::{completions as completion_service, limits, tasks as task_service};

#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    pub include_inactive: Option<bool>,
    pub category: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tasks")
            .route("", web::get().to(list_tasks))
            .route("", web::post().to(create_task))
            // Submission endpoint (must come before /{code} routes)
            .route("/submit", web::post().to(submit_completion))
            .route("/{code}/archive", web::post().to(archive_task)),
    );
}

/// Task catalog. Regular callers get the active catalog annotated with their
/// own quota standing (tasks they can no longer earn are omitted); admins may
/// pass `include_inactive=true` for the full unfiltered catalog.
async fn list_tasks(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    query: web::Query<ListTasksQuery>,
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

    let category = query.category.as_deref();

    if query.include_inactive.unwrap_or(false) {
        if !state.config.is_admin(user.id) {
            return Ok(HttpResponse::Forbidden().json(ApiError {
                error: "forbidden".to_string(),
                message: "Only admins may list inactive tasks".to_string(),
            }));
        }

        return match task_service::list_tasks(&state.db, true, category).await {
            Ok(tasks) => Ok(HttpResponse::Ok().json(ApiSuccess::new(tasks))),
            Err(e) => {
                log::error!("Error listing tasks: {e:?}");
                Ok(HttpResponse::InternalServerError().json(ApiError {
                    error: "internal_error".to_string(),
                    message: "Failed to list tasks".to_string(),
                }))
            }
        };
    }

    let day_start = limits::current_day_start();
    match task_service::list_tasks_with_quota(&state.db, user.id, category, day_start).await {
        Ok(tasks) => Ok(HttpResponse::Ok().json(ApiSuccess::new(tasks))),
        Err(e) => {
            log::error!("Error listing tasks for user {}: {e:?}", user.id);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to list tasks".to_string(),
            }))
        }
    }
}

async fn create_task(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    body: web::Json<CreateTaskRequest>,
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
            message: "You do not have permission to create tasks".to_string(),
        }));
    }

    let request = body.into_inner();

    if request.title.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(ApiError {
            error: "validation_error".to_string(),
            message: "Task title is required".to_string(),
        }));
    }

    if request.reward_xp <= 0 {
        return Ok(HttpResponse::BadRequest().json(ApiError {
            error: "validation_error".to_string(),
            message: "reward_xp must be a positive number".to_string(),
        }));
    }

    if request.max_user_completions.map(|max| max < 0).unwrap_or(false) {
        return Ok(HttpResponse::BadRequest().json(ApiError {
            error: "validation_error".to_string(),
            message: "max_user_completions must not be negative".to_string(),
        }));
    }

    match task_service::create_task(&state.db, &request, user.id).await {
        Ok(task) => Ok(HttpResponse::Created().json(ApiSuccess::new(task))),
        Err(e) => {
            log::error!("Error creating task: {e:?}");
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to create task".to_string(),
            }))
        }
    }
}

/// Submit a completion claim. Business outcomes (unknown code, inactive
/// task, exhausted limit) come back as 200s with a status discriminator.
async fn submit_completion(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    body: web::Json<SubmitCompletionRequest>,
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

    if body.task_code.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(ApiError {
            error: "validation_error".to_string(),
            message: "task_code is required".to_string(),
        }));
    }

    match completion_service::submit(&state.db, user.id, &body.task_code).await {
        Ok(outcome) => Ok(HttpResponse::Ok().json(ApiSuccess::new(outcome))),
        Err(e) => {
            log::error!("Error submitting completion for user {}: {e:?}", user.id);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to submit completion".to_string(),
            }))
        }
    }
}

/// Soft-delete: archive a task by code. Idempotent.
async fn archive_task(
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
            message: "You do not have permission to archive tasks".to_string(),
        }));
    }

    let code = path.into_inner().trim().to_uppercase();

    match task_service::archive_task(&state.db, &code).await {
        Ok((task, already_archived)) => Ok(HttpResponse::Ok().json(ApiSuccess::new(
            ArchiveTaskResponse {
                task_code: task.code,
                status: task.status,
                already_archived,
            },
        ))),
        Err(task_service::TaskError::NotFound) => Ok(HttpResponse::NotFound().json(ApiError {
            error: "task_not_found".to_string(),
            message: format!("Task with code {code} not found"),
        })),
        Err(e) => {
            log::error!("Error archiving task {code}: {e:?}");
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to archive task".to_string(),
            }))
        }
    }
}
