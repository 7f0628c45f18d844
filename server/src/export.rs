//! Report downloads: CSV, Excel-friendly CSV and a JSON envelope.

use actix_web::{http::header, HttpResponse};
use serde::{Deserialize, Serialize};
use time::{format_description, format_description::well_known::Rfc3339, OffsetDateTime};

use crate::error::ReportError;

/// UTF-8 byte order mark; makes spreadsheet tools detect the encoding.
const BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Excel,
    Json,
}

impl ExportFormat {
    fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv | ExportFormat::Excel => "csv",
            ExportFormat::Json => "json",
        }
    }

    fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv | ExportFormat::Excel => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct FormatQuery {
    #[serde(default)]
    pub format: ExportFormat,
}

/// A rendered file ready to be sent as an attachment.
#[derive(Debug, Clone)]
pub struct Download {
    pub filename: String,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Download {
    pub fn into_response(self) -> HttpResponse {
        HttpResponse::Ok()
            .content_type(self.content_type)
            .insert_header((
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", self.filename),
            ))
            .body(self.body)
    }
}

/// Tabular content of a download.
pub enum Table<'a, R> {
    /// Rows with a fixed shape; headers come from field names.
    Rows(&'a [R]),
    /// Rows whose columns are only known at runtime.
    Records { headers: Vec<String>, records: Vec<Vec<String>> },
}

#[derive(Serialize)]
struct Envelope<'a, P: Serialize> {
    report_title: &'a str,
    generated_at: String,
    report: &'a P,
}

/// Replaces everything but ASCII letters and digits with `_`.
pub fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// `YYYY-MM-DD_HH-MM`.
pub fn stamp(at: OffsetDateTime) -> Result<String, ReportError> {
    let fmt = format_description::parse("[year]-[month]-[day]_[hour]-[minute]")
        .map_err(|e| ReportError::Export(e.to_string()))?;
    at.format(&fmt).map_err(|e| ReportError::Export(e.to_string()))
}

/// Joins the non-empty parts, sanitised, with `_` and appends the stamp.
pub fn file_stem(parts: &[Option<&str>], stamp: &str) -> String {
    let mut out: Vec<String> = parts
        .iter()
        .flatten()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(sanitize)
        .collect();
    out.push(stamp.to_string());
    out.join("_")
}

pub fn rows_to_csv<R: Serialize>(rows: &[R]) -> Result<Vec<u8>, ReportError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for row in rows {
        wtr.serialize(row)
            .map_err(|e| ReportError::Export(format!("CSV write error: {e}")))?;
    }
    wtr.into_inner()
        .map_err(|e| ReportError::Export(format!("CSV flush error: {e}")))
}

pub fn records_to_csv(headers: &[String], records: &[Vec<String>]) -> Result<Vec<u8>, ReportError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(headers)
        .map_err(|e| ReportError::Export(format!("CSV write error: {e}")))?;
    for record in records {
        wtr.write_record(record)
            .map_err(|e| ReportError::Export(format!("CSV write error: {e}")))?;
    }
    wtr.into_inner()
        .map_err(|e| ReportError::Export(format!("CSV flush error: {e}")))
}

/// Renders `table` (CSV formats) or `payload` (JSON) as a download named
/// `stem.<ext>`.
pub fn render<R: Serialize, P: Serialize>(
    format: ExportFormat,
    stem: &str,
    title: &str,
    table: Table<'_, R>,
    payload: &P,
    generated_at: OffsetDateTime,
) -> Result<Download, ReportError> {
    let body = match format {
        ExportFormat::Json => {
            let envelope = Envelope {
                report_title: title,
                generated_at: generated_at
                    .format(&Rfc3339)
                    .map_err(|e| ReportError::Export(e.to_string()))?,
                report: payload,
            };
            serde_json::to_vec_pretty(&envelope).map_err(|e| ReportError::Export(e.to_string()))?
        }
        ExportFormat::Csv | ExportFormat::Excel => {
            let csv = match table {
                Table::Rows(rows) => rows_to_csv(rows)?,
                Table::Records { headers, records } => records_to_csv(&headers, &records)?,
            };
            if format == ExportFormat::Excel {
                [BOM, csv.as_slice()].concat()
            } else {
                csv
            }
        }
    };

    log::info!("exported {} ({} bytes)", stem, body.len());
    Ok(Download {
        filename: format!("{stem}.{}", format.extension()),
        content_type: format.content_type(),
        body,
    })
}
