use actix_web::{get, web, HttpResponse};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    access::Viewer,
    config::Config,
    error::ReportError,
    export::{self, FormatQuery, Table},
    report::dashboard::{self, DashboardParams, Rows},
    routes::{page_param, per_page_param, with_conn},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub city: Option<String>,
    pub faculty: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl DashboardQuery {
    fn into_params(self, cfg: &Config) -> Result<DashboardParams, ReportError> {
        Ok(DashboardParams {
            page: page_param(self.page)?,
            per_page: per_page_param(self.per_page, cfg.dashboard_page_size, cfg.max_page_size)?,
            city: self.city,
            faculty: self.faculty,
        })
    }
}

#[get("/api/reports/dashboard")]
pub async fn dashboard_report(
    viewer: Viewer,
    data: web::Data<AppState>,
    query: web::Query<DashboardQuery>,
) -> Result<HttpResponse, ReportError> {
    let params = query.into_inner().into_params(&data.config)?;
    let report = with_conn(&data, move |conn, cfg| {
        dashboard::assemble(conn, cfg, &viewer, &params, Rows::Page)
    })
    .await?;
    Ok(HttpResponse::Ok().json(report))
}

#[get("/api/reports/dashboard/export")]
pub async fn dashboard_export(
    viewer: Viewer,
    data: web::Data<AppState>,
    query: web::Query<DashboardQuery>,
    format: web::Query<FormatQuery>,
) -> Result<HttpResponse, ReportError> {
    let params = query.into_inner().into_params(&data.config)?;
    let format = format.format;

    let download = with_conn(&data, move |conn, cfg| {
        let report = dashboard::assemble(conn, cfg, &viewer, &params, Rows::All)?;
        let now = OffsetDateTime::now_utc();
        let stem = export::file_stem(
            &[
                Some("Dashboard_Report"),
                report.filters.city.as_deref(),
                report.filters.faculty.as_deref(),
            ],
            &export::stamp(now)?,
        );
        export::render(format, &stem, "Dashboard Report", Table::Rows(&report.rows), &report, now)
    })
    .await?;
    Ok(download.into_response())
}
