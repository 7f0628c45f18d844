use actix_web::{get, web, HttpResponse};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    access::Viewer,
    config::Config,
    error::ReportError,
    export::{self, FormatQuery, Table},
    report::modules::{self, ModuleParams, ModuleReport},
    routes::{page_param, per_page_param, with_conn},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct ModuleQuery {
    pub city: Option<String>,
    pub faculty: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ModuleQuery {
    fn into_params(self, cfg: &Config) -> Result<ModuleParams, ReportError> {
        Ok(ModuleParams {
            page: page_param(self.page)?,
            per_page: Some(per_page_param(self.per_page, cfg.module_page_size, cfg.max_page_size)?),
            city: self.city,
            faculty: self.faculty,
        })
    }
}

/// Faculty, one column per module, total.
fn full_report_table(report: &ModuleReport) -> Table<'static, ()> {
    let mut headers = vec!["Faculty".to_string()];
    headers.extend(report.modules.iter().cloned());
    headers.push("Total".to_string());

    let records = report
        .full_report
        .iter()
        .map(|row| {
            let mut record = vec![row.faculty.clone()];
            record.extend(
                report
                    .modules
                    .iter()
                    .map(|m| row.modules.get(m).copied().unwrap_or(0).to_string()),
            );
            record.push(row.total.to_string());
            record
        })
        .collect();

    Table::Records { headers, records }
}

#[get("/api/reports/modules")]
pub async fn module_report(
    viewer: Viewer,
    data: web::Data<AppState>,
    query: web::Query<ModuleQuery>,
) -> Result<HttpResponse, ReportError> {
    let params = query.into_inner().into_params(&data.config)?;
    let report = with_conn(&data, move |conn, cfg| modules::assemble(conn, cfg, &viewer, &params)).await?;
    Ok(HttpResponse::Ok().json(report))
}

#[get("/api/reports/modules/export")]
pub async fn module_export(
    viewer: Viewer,
    data: web::Data<AppState>,
    query: web::Query<ModuleQuery>,
    format: web::Query<FormatQuery>,
) -> Result<HttpResponse, ReportError> {
    let params = query.into_inner().into_params(&data.config)?;
    let format = format.format;

    let download = with_conn(&data, move |conn, cfg| {
        let report = modules::assemble(conn, cfg, &viewer, &params)?;
        let now = OffsetDateTime::now_utc();
        let stem = export::file_stem(
            &[
                Some("Faculty_Module_Completion_Report"),
                report.city.as_deref(),
                report.faculty.as_deref(),
            ],
            &export::stamp(now)?,
        );
        export::render(
            format,
            &stem,
            "Faculty Module Completion Report",
            full_report_table(&report),
            &report,
            now,
        )
    })
    .await?;
    Ok(download.into_response())
}
