use actix_web::{get, web, HttpResponse};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    access::Viewer,
    error::ReportError,
    export::{self, FormatQuery, Table},
    report::enrollment::{self, EnrollmentParams},
    routes::with_conn,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct EnrollmentQuery {
    pub faculty: Option<String>,
    pub city: Option<String>,
}

impl From<EnrollmentQuery> for EnrollmentParams {
    fn from(q: EnrollmentQuery) -> Self {
        EnrollmentParams {
            faculty: q.faculty,
            city: q.city,
        }
    }
}

#[get("/api/reports/enrollment")]
pub async fn enrollment_report(
    viewer: Viewer,
    data: web::Data<AppState>,
    query: web::Query<EnrollmentQuery>,
) -> Result<HttpResponse, ReportError> {
    let params = EnrollmentParams::from(query.into_inner());
    let report = with_conn(&data, move |conn, cfg| enrollment::assemble(conn, cfg, &viewer, &params)).await?;
    Ok(HttpResponse::Ok().json(report))
}

#[get("/api/reports/enrollment/export")]
pub async fn enrollment_export(
    viewer: Viewer,
    data: web::Data<AppState>,
    query: web::Query<EnrollmentQuery>,
    format: web::Query<FormatQuery>,
) -> Result<HttpResponse, ReportError> {
    let params = EnrollmentParams::from(query.into_inner());
    let format = format.format;

    let download = with_conn(&data, move |conn, cfg| {
        let report = enrollment::assemble(conn, cfg, &viewer, &params)?;
        let now = OffsetDateTime::now_utc();
        let stem = export::file_stem(
            &[
                Some("Enrollment_Report"),
                Some(report.faculty_name.as_str()),
                report.city.as_deref(),
            ],
            &export::stamp(now)?,
        );
        let title = format!("Enrollment Report - {}", report.faculty_name);
        export::render(format, &stem, &title, Table::Rows(&report.rows), &report, now)
    })
    .await?;
    Ok(download.into_response())
}
