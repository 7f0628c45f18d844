use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params_from_iter, Connection, OpenFlags, Row};

use crate::{error::ReportError, sql::SqlBuf};

pub mod catalog;
pub mod enrollment;
pub mod modules;
pub mod users;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Context level of a course in the host LMS.
pub const COURSE_CONTEXT_LEVEL: i64 = 50;

/// Opens a pool over the host database.
///
/// Connections are read-only: the schema belongs to the LMS and its sync
/// process, this service only ever reads it.
pub fn init_pool(path: &str, size: u32, busy_timeout: Duration) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(path)
        .with_flags(
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_init(move |conn| conn.busy_timeout(busy_timeout));
    Pool::builder().max_size(size).build(manager)
}

/// Offset/limit pair applied after the deterministic ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub limit: u32,
    pub offset: u32,
}

impl Window {
    /// Window of 1-based `page`.
    pub fn page(page: u32, per_page: u32) -> Self {
        Window {
            limit: per_page,
            offset: page.saturating_sub(1).saturating_mul(per_page),
        }
    }
}

pub fn fetch_all<T, F>(conn: &Connection, q: &SqlBuf, map: F) -> Result<Vec<T>, ReportError>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(q.sql())?;
    let rows = stmt.query_map(params_from_iter(q.args()), map)?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn fetch_optional<T, F>(conn: &Connection, q: &SqlBuf, map: F) -> Result<Option<T>, ReportError>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    Ok(fetch_all(conn, q, map)?.into_iter().next())
}

pub fn fetch_count(conn: &Connection, q: &SqlBuf) -> Result<i64, ReportError> {
    let n = conn.query_row(q.sql(), params_from_iter(q.args()), |r| r.get::<_, Option<i64>>(0))?;
    Ok(n.unwrap_or(0))
}
