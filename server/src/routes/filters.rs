use actix_web::{get, web, HttpResponse};
use serde::Deserialize;

use crate::{access::Viewer, error::ReportError, report::filters, AppState};

use super::with_conn;

#[derive(Debug, Deserialize)]
pub struct CityQuery {
    pub city: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FacultyQuery {
    pub faculty: Option<String>,
}

#[get("/api/filters/cities")]
pub async fn cities(viewer: Viewer, data: web::Data<AppState>) -> Result<HttpResponse, ReportError> {
    let body = with_conn(&data, move |conn, _| filters::cities(conn, &viewer)).await?;
    Ok(HttpResponse::Ok().json(body))
}

#[get("/api/filters/faculties")]
pub async fn faculties(
    viewer: Viewer,
    data: web::Data<AppState>,
    query: web::Query<CityQuery>,
) -> Result<HttpResponse, ReportError> {
    let city = query.into_inner().city;
    let body = with_conn(&data, move |conn, _| filters::faculties(conn, &viewer, city.as_deref())).await?;
    Ok(HttpResponse::Ok().json(body))
}

#[get("/api/filters/faculty-city")]
pub async fn faculty_city(
    viewer: Viewer,
    data: web::Data<AppState>,
    query: web::Query<FacultyQuery>,
) -> Result<HttpResponse, ReportError> {
    let faculty = query
        .into_inner()
        .faculty
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| ReportError::BadRequest("a faculty is required".to_string()))?;
    let body = with_conn(&data, move |conn, _| filters::faculty_city(conn, &viewer, &faculty)).await?;
    Ok(HttpResponse::Ok().json(body))
}
