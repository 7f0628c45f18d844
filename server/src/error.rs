use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Everything a report request can fail with.
///
/// An empty result is not an error: assembled reports carry explicit
/// no-data states instead.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("data store error: {0}")]
    DataStore(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("export error: {0}")]
    Export(String),

    #[error("worker error: {0}")]
    Blocking(String),
}

impl ReportError {
    pub fn kind(&self) -> &'static str {
        match self {
            ReportError::NotFound(_) => "not_found",
            ReportError::Forbidden(_) => "forbidden",
            ReportError::Unauthenticated(_) => "unauthenticated",
            ReportError::BadRequest(_) => "bad_request",
            ReportError::DataStore(_) | ReportError::Pool(_) => "data_store",
            ReportError::Export(_) => "export",
            ReportError::Blocking(_) => "internal",
        }
    }

    /// Message shown to the caller; store internals stay in the log.
    fn public_message(&self) -> String {
        match self {
            ReportError::NotFound(m)
            | ReportError::Forbidden(m)
            | ReportError::Unauthenticated(m)
            | ReportError::BadRequest(m) => m.clone(),
            ReportError::DataStore(_) | ReportError::Pool(_) => {
                "the reporting data store is unavailable".to_string()
            }
            ReportError::Export(_) => "the report could not be exported".to_string(),
            ReportError::Blocking(_) => "internal error".to_string(),
        }
    }
}

impl ResponseError for ReportError {
    fn status_code(&self) -> StatusCode {
        match self {
            ReportError::NotFound(_) => StatusCode::NOT_FOUND,
            ReportError::Forbidden(_) => StatusCode::FORBIDDEN,
            ReportError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ReportError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ReportError::DataStore(_)
            | ReportError::Pool(_)
            | ReportError::Export(_)
            | ReportError::Blocking(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{self}");
        } else {
            log::warn!("request rejected: {self}");
        }
        HttpResponse::build(status).json(json!({
            "error": {
                "kind": self.kind(),
                "message": self.public_message(),
            }
        }))
    }
}
