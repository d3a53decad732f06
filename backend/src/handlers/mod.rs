use actix_web::{web, HttpResponse};

pub mod completions;
pub mod events;
pub mod profiles;
pub mod tasks;
pub mod trophies;

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "ok": true }))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health))
            .configure(tasks::configure)
            .configure(completions::configure)
            .configure(profiles::configure)
            .configure(events::configure)
            .configure(trophies::configure),
    );
}
