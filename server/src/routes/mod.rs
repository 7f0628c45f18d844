use actix_web::{get, web, HttpResponse, Responder};
use rusqlite::Connection;
use serde_json::json;

use crate::{config::Config, error::ReportError, AppState};

pub mod auth;
pub mod filters;
pub mod reports;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ReportError::BadRequest(err.to_string()).into()),
    )
    .service(health)
    .service(reports::dashboard::dashboard_report)
    .service(reports::dashboard::dashboard_export)
    .service(reports::enrollment::enrollment_report)
    .service(reports::enrollment::enrollment_export)
    .service(reports::modules::module_report)
    .service(reports::modules::module_export)
    .service(reports::roster::roster_report)
    .service(reports::roster::roster_export)
    .service(filters::cities)
    .service(filters::faculties)
    .service(filters::faculty_city);
}

/// Runs `f` with a pooled connection on the blocking thread pool.
pub(crate) async fn with_conn<T, F>(data: &web::Data<AppState>, f: F) -> Result<T, ReportError>
where
    F: FnOnce(&Connection, &Config) -> Result<T, ReportError> + Send + 'static,
    T: Send + 'static,
{
    let state = data.clone();
    web::block(move || {
        let conn = state.pool.get()?;
        f(&conn, &state.config)
    })
    .await
    .map_err(|e| ReportError::Blocking(e.to_string()))?
}

/// `page` query value, 1-based.
pub(crate) fn page_param(page: Option<u32>) -> Result<u32, ReportError> {
    match page {
        None => Ok(1),
        Some(0) => Err(ReportError::BadRequest("page must be 1 or greater".to_string())),
        Some(p) => Ok(p),
    }
}

pub(crate) fn per_page_param(per_page: Option<u32>, default: u32, max: u32) -> Result<u32, ReportError> {
    match per_page {
        None => Ok(default),
        Some(n) if n == 0 || n > max => Err(ReportError::BadRequest(format!(
            "per_page must be between 1 and {max}"
        ))),
        Some(n) => Ok(n),
    }
}

#[get("/health")]
pub async fn health(data: web::Data<AppState>) -> impl Responder {
    let state = data.pool.state();
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "connections": state.connections,
        "idle_connections": state.idle_connections,
    }))
}
