//! Lookups of people, faculties and courses; the raw material for scoping
//! and for the filter dropdowns.

use rusqlite::Connection;
use serde::Serialize;

use crate::{
    access::{OwnFaculty, Role, Viewer},
    error::ReportError,
    sql::{Predicate, SqlBuf, FACULTY_NAME},
};

use super::{fetch_all, fetch_optional};

/// Loads the LMS account behind an authenticated user id.
pub fn load_viewer(conn: &Connection, user_id: i64, site_admins: &[i64]) -> Result<Option<Viewer>, ReportError> {
    let mut q = SqlBuf::new("SELECT u.id, u.usertype, u.usercode, u.idnumber FROM mdl_user u");
    q.bind(" WHERE u.id = ?", user_id).push(" AND COALESCE(u.deleted, 0) = 0");

    fetch_optional(conn, &q, |r| {
        let id: i64 = r.get(0)?;
        let usertype: Option<String> = r.get(1)?;
        let role = if site_admins.contains(&id) {
            Role::Admin
        } else {
            Role::from_usertype(usertype.as_deref())
        };
        Ok(Viewer {
            user_id: id,
            role,
            usercode: r.get(2)?,
            idnumber: r.get(3)?,
        })
    })
}

/// Institutions owned by a head of institute's staff code.
pub fn hoi_institutions(conn: &Connection, staff_code: &str) -> Result<Vec<i64>, ReportError> {
    let mut q = SqlBuf::new("SELECT DISTINCT h.iinstituteid FROM my_hoi h");
    q.bind(" WHERE h.sStaffCode = ?", staff_code.to_string())
        .push(" ORDER BY h.iinstituteid");
    fetch_all(conn, &q, |r| r.get(0))
}

pub fn faculty_by_id(conn: &Connection, faculty_id: i64) -> Result<Option<OwnFaculty>, ReportError> {
    let mut q = SqlBuf::new(&format!(
        "SELECT f.ID, {FACULTY_NAME}, COALESCE(f.CITY, '') FROM my_faculty f"
    ));
    q.bind(" WHERE f.ID = ?", faculty_id);
    fetch_optional(conn, &q, |r| {
        Ok(OwnFaculty {
            id: r.get(0)?,
            name: r.get(1)?,
            city: r.get(2)?,
        })
    })
}

/// A faculty record that passed a scoped lookup.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FacultyRef {
    pub id: i64,
    pub name: String,
    pub city: String,
    pub username: Option<String>,
}

/// First faculty (by id) matching the predicate.
pub fn find_faculty(conn: &Connection, pred: &Predicate) -> Result<Option<FacultyRef>, ReportError> {
    let mut q = SqlBuf::new(&format!(
        "SELECT f.ID, {FACULTY_NAME}, COALESCE(f.CITY, ''), f.username FROM my_faculty f WHERE 1=1"
    ));
    q.predicate(pred).push(" ORDER BY f.ID LIMIT 1");
    fetch_optional(conn, &q, |r| {
        Ok(FacultyRef {
            id: r.get(0)?,
            name: r.get(1)?,
            city: r.get(2)?,
            username: r.get(3)?,
        })
    })
}

/// Campus of the first faculty matching the predicate.
pub fn faculty_city(conn: &Connection, pred: &Predicate) -> Result<Option<String>, ReportError> {
    let mut q = SqlBuf::new("SELECT f.CITY FROM my_faculty f WHERE f.CITY IS NOT NULL");
    q.predicate(pred).push(" ORDER BY f.CITY LIMIT 1");
    fetch_optional(conn, &q, |r| r.get(0))
}

pub fn available_cities(conn: &Connection, pred: &Predicate) -> Result<Vec<String>, ReportError> {
    let mut q = SqlBuf::new("SELECT DISTINCT f.CITY AS city FROM my_faculty f WHERE f.CITY IS NOT NULL");
    q.predicate(pred).push(" ORDER BY city");
    fetch_all(conn, &q, |r| r.get(0))
}

/// Distinct display names of the faculties matching the predicate, sorted.
/// Faculties without a name are left out.
pub fn available_faculties(conn: &Connection, pred: &Predicate) -> Result<Vec<String>, ReportError> {
    let mut q = SqlBuf::new(&format!(
        "SELECT DISTINCT {FACULTY_NAME} AS faculty_name FROM my_faculty f WHERE {FACULTY_NAME} <> ''"
    ));
    q.predicate(pred).push(" ORDER BY faculty_name");
    fetch_all(conn, &q, |r| r.get(0))
}

pub fn count_faculties(conn: &Connection, pred: &Predicate) -> Result<i64, ReportError> {
    let mut q = SqlBuf::new("SELECT COUNT(DISTINCT f.ID) FROM my_faculty f WHERE 1=1");
    q.predicate(pred);
    super::fetch_count(conn, &q)
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CourseDetails {
    pub course_id: i64,
    pub course_name: String,
    pub faculty_id: i64,
    pub faculty_name: String,
    pub campus: String,
    #[serde(skip)]
    pub institution: Option<i64>,
}

pub fn course_details(conn: &Connection, course_id: i64) -> Result<Option<CourseDetails>, ReportError> {
    let mut q = SqlBuf::new(&format!(
        "SELECT a.ID, COALESCE(a.TITLE, ''), f.ID, {FACULTY_NAME}, COALESCE(f.CITY, ''), f.INSTITUTION
           FROM my_moodle_course a
           JOIN my_faculty f ON a.FACULTY = f.ID"
    ));
    q.bind(" WHERE a.ID = ?", course_id);
    fetch_optional(conn, &q, |r| {
        Ok(CourseDetails {
            course_id: r.get(0)?,
            course_name: r.get(1)?,
            faculty_id: r.get(2)?,
            faculty_name: r.get(3)?,
            campus: r.get(4)?,
            institution: r.get(5)?,
        })
    })
}
