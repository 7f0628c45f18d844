use rusqlite::Connection;
use serde::Serialize;

use crate::{
    error::ReportError,
    sql::{Predicate, SqlBuf, FACULTY_NAME},
};

use super::fetch_all;

const MODULE_JOINS: &str = " FROM my_faculty f
    JOIN my_moodle_course moc ON moc.FACULTY = f.ID
    JOIN mdl_course_modules cm ON cm.course = moc.MOODLE_COURSE
    JOIN mdl_modules m ON m.id = cm.module
   WHERE 1=1";

/// Distinct course-module instances of one module type under one faculty.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FacultyModuleCount {
    pub faculty_name: String,
    pub module: String,
    pub count: i64,
}

/// Module counts grouped by (normalised faculty name, module type).
///
/// Faculty records sharing a display name are folded together.
pub fn faculty_module_counts(conn: &Connection, pred: &Predicate) -> Result<Vec<FacultyModuleCount>, ReportError> {
    let mut q = SqlBuf::new(&format!(
        "SELECT {FACULTY_NAME} AS faculty_name, m.name AS module_name, COUNT(DISTINCT cm.id)"
    ));
    q.push(MODULE_JOINS)
        .predicate(pred)
        .push(" GROUP BY faculty_name, module_name ORDER BY faculty_name, module_name");

    fetch_all(conn, &q, |r| {
        Ok(FacultyModuleCount {
            faculty_name: r.get(0)?,
            module: r.get(1)?,
            count: r.get(2)?,
        })
    })
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CampusModuleCount {
    pub city: String,
    pub module: String,
    pub count: i64,
}

/// Module counts grouped by campus, ordered by campus.
pub fn campus_module_counts(conn: &Connection, pred: &Predicate) -> Result<Vec<CampusModuleCount>, ReportError> {
    let mut q = SqlBuf::new("SELECT COALESCE(f.CITY, '') AS city, m.name AS module_name, COUNT(DISTINCT cm.id)");
    q.push(MODULE_JOINS)
        .predicate(pred)
        .push(" GROUP BY city, module_name ORDER BY city, module_name");

    fetch_all(conn, &q, |r| {
        Ok(CampusModuleCount {
            city: r.get(0)?,
            module: r.get(1)?,
            count: r.get(2)?,
        })
    })
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ModuleTotal {
    pub module: String,
    pub count: i64,
}

/// Module counts over the whole predicate, largest first.
pub fn module_distribution(conn: &Connection, pred: &Predicate) -> Result<Vec<ModuleTotal>, ReportError> {
    let mut q = SqlBuf::new("SELECT m.name AS module_name, COUNT(DISTINCT cm.id) AS module_count");
    q.push(MODULE_JOINS)
        .predicate(pred)
        .push(" GROUP BY module_name ORDER BY module_count DESC, module_name");

    fetch_all(conn, &q, |r| {
        Ok(ModuleTotal {
            module: r.get(0)?,
            count: r.get(1)?,
        })
    })
}
