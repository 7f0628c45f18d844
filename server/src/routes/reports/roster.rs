use actix_web::{get, web, HttpResponse};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    access::Viewer,
    error::ReportError,
    export::{self, FormatQuery, Table},
    report::roster::{self, RosterType},
    routes::with_conn,
    AppState,
};

/// Longest course-name fragment kept in a download filename.
const COURSE_NAME_IN_FILENAME: usize = 50;

#[derive(Debug, Deserialize)]
pub struct RosterQuery {
    pub course_id: Option<i64>,
    #[serde(rename = "type", default)]
    pub roster_type: RosterType,
}

impl RosterQuery {
    fn course_id(&self) -> Result<i64, ReportError> {
        self.course_id
            .ok_or_else(|| ReportError::BadRequest("course_id is required".to_string()))
    }
}

#[get("/api/reports/roster")]
pub async fn roster_report(
    viewer: Viewer,
    data: web::Data<AppState>,
    query: web::Query<RosterQuery>,
) -> Result<HttpResponse, ReportError> {
    let course_id = query.course_id()?;
    let roster_type = query.roster_type;
    let report = with_conn(&data, move |conn, cfg| {
        roster::assemble(conn, cfg, &viewer, course_id, roster_type)
    })
    .await?;
    Ok(HttpResponse::Ok().json(report))
}

#[get("/api/reports/roster/export")]
pub async fn roster_export(
    viewer: Viewer,
    data: web::Data<AppState>,
    query: web::Query<RosterQuery>,
    format: web::Query<FormatQuery>,
) -> Result<HttpResponse, ReportError> {
    let course_id = query.course_id()?;
    let roster_type = query.roster_type;
    let format = format.format;

    let download = with_conn(&data, move |conn, cfg| {
        let report = roster::assemble(conn, cfg, &viewer, course_id, roster_type)?;
        let now = OffsetDateTime::now_utc();
        let course: String = report.course.course_name.chars().take(COURSE_NAME_IN_FILENAME).collect();
        let stem = export::file_stem(
            &[Some("Student_List"), Some(roster_type.label()), Some(course.as_str())],
            &export::stamp(now)?,
        );
        let title = format!("{} Students - {}", roster_type.label(), report.course.course_name);
        export::render(format, &stem, &title, Table::Rows(&report.students), &report, now)
    })
    .await?;
    Ok(download.into_response())
}
