use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;

use crate::{access::Viewer, db::catalog, error::ReportError, AppState};

use super::with_conn;

/// Reads the LMS user id the host put in the identity header.
fn user_id_from(req: &HttpRequest, header_name: &str) -> Result<i64, ReportError> {
    let raw = req
        .headers()
        .get(header_name)
        .ok_or_else(|| ReportError::Unauthenticated(format!("missing {header_name} header")))?;
    raw.to_str()
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|id| *id > 0)
        .ok_or_else(|| ReportError::Unauthenticated(format!("invalid {header_name} header")))
}

/// The requesting user, loaded from the LMS user table.
impl FromRequest for Viewer {
    type Error = ReportError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let data = req.app_data::<web::Data<AppState>>().cloned();
        let user_id = data
            .as_ref()
            .map(|d| user_id_from(req, &d.config.identity_header));

        Box::pin(async move {
            let (Some(data), Some(user_id)) = (data, user_id) else {
                return Err(ReportError::Blocking("application state not configured".to_string()));
            };
            let user_id = user_id?;

            let viewer = with_conn(&data, move |conn, cfg| {
                catalog::load_viewer(conn, user_id, &cfg.site_admins)
            })
            .await?;

            match viewer {
                Some(v) => {
                    log::debug!("request by user {} as {:?}", v.user_id, v.role);
                    Ok(v)
                }
                None => Err(ReportError::Unauthenticated(format!("unknown user {user_id}"))),
            }
        })
    }
}
