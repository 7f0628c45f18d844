//! Section enrollment facts.
//!
//! A student is enrolled in a section when their LMS account holds the student
//! role in the section's course context. Every count here is over distinct
//! students; role-assignment rows are never counted directly.

use rusqlite::Connection;
use serde::Serialize;

use crate::{
    error::ReportError,
    sql::{Predicate, SqlBuf, FACULTY_NAME},
};

use super::{fetch_all, fetch_count, Window, COURSE_CONTEXT_LEVEL};

/// Joins from a section membership row (`ss`) to its student (`s`) and the
/// matching student-role assignment (`ra`), if any.
fn push_enrollment_joins(q: &mut SqlBuf, student_role_id: i64) {
    q.push(" LEFT JOIN my_student s ON s.ID = ss.STUDENT")
        .push(" LEFT JOIN mdl_context ctx ON ctx.instanceid = a.MOODLE_COURSE")
        .push(&format!(" AND ctx.contextlevel = {COURSE_CONTEXT_LEVEL}"))
        .push(" LEFT JOIN mdl_role_assignments ra ON ra.contextid = ctx.id")
        .push(" AND ra.userid = s.MOODLESTUDENTID")
        .bind(" AND ra.roleid = ?", student_role_id);
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SectionEnrollment {
    pub course_id: i64,
    pub course_name: String,
    pub faculty_id: i64,
    pub faculty_name: String,
    pub faculty_username: Option<String>,
    pub campus: String,
    pub total_students: i64,
    pub enrolled_students: i64,
}

impl SectionEnrollment {
    pub fn unenrolled_students(&self) -> i64 {
        self.total_students - self.enrolled_students
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionOrder {
    /// Faculty name, then course title. Used by the dashboard.
    FacultyCourse,
    /// Course title only. Used inside a single faculty.
    Course,
}

impl SectionOrder {
    fn sql(self) -> &'static str {
        match self {
            SectionOrder::FacultyCourse => " ORDER BY faculty_name, course_name, a.ID",
            SectionOrder::Course => " ORDER BY course_name, a.ID",
        }
    }
}

/// Per-section total/enrolled counts for every section matching `pred`.
///
/// Sections without students are included with zero counts. The ordering
/// ends in the section id so pages never overlap.
pub fn section_enrollment(
    conn: &Connection,
    student_role_id: i64,
    pred: &Predicate,
    order: SectionOrder,
    window: Option<Window>,
) -> Result<Vec<SectionEnrollment>, ReportError> {
    let mut q = SqlBuf::new(&format!(
        "SELECT a.ID, COALESCE(a.TITLE, '') AS course_name, f.ID, {FACULTY_NAME} AS faculty_name,
                f.username, COALESCE(f.CITY, ''),
                COUNT(DISTINCT ss.STUDENT),
                COUNT(DISTINCT CASE WHEN ra.id IS NOT NULL THEN ss.STUDENT END)
           FROM my_moodle_course a
           JOIN my_faculty f ON a.FACULTY = f.ID
           LEFT JOIN my_section_students ss ON ss.SECTION = a.ID"
    ));
    push_enrollment_joins(&mut q, student_role_id);
    q.push(" WHERE 1=1").predicate(pred).push(" GROUP BY a.ID").push(order.sql());
    if let Some(w) = window {
        q.bind(" LIMIT ?", w.limit).bind(" OFFSET ?", w.offset);
    }

    fetch_all(conn, &q, |r| {
        Ok(SectionEnrollment {
            course_id: r.get(0)?,
            course_name: r.get(1)?,
            faculty_id: r.get(2)?,
            faculty_name: r.get(3)?,
            faculty_username: r.get(4)?,
            campus: r.get(5)?,
            total_students: r.get(6)?,
            enrolled_students: r.get(7)?,
        })
    })
}

/// Number of rows [`section_enrollment`] yields for `pred` without a window.
pub fn count_sections(conn: &Connection, pred: &Predicate) -> Result<i64, ReportError> {
    let mut q = SqlBuf::new(
        "SELECT COUNT(*) FROM my_moodle_course a JOIN my_faculty f ON a.FACULTY = f.ID WHERE 1=1",
    );
    q.predicate(pred);
    fetch_count(conn, &q)
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct EnrollmentTotals {
    pub total_students: i64,
    pub enrolled_students: i64,
}

impl EnrollmentTotals {
    pub fn unenrolled_students(&self) -> i64 {
        self.total_students - self.enrolled_students
    }
}

/// Aggregate counts over every section matching `pred`, computed in one
/// query over distinct (section, student) pairs.
///
/// Equals the sum of the [`section_enrollment`] rows for the same predicate.
pub fn scope_totals(
    conn: &Connection,
    student_role_id: i64,
    pred: &Predicate,
) -> Result<EnrollmentTotals, ReportError> {
    let mut q = SqlBuf::new(
        "SELECT COUNT(*), COALESCE(SUM(enrolled), 0) FROM (
           SELECT ss.SECTION, ss.STUDENT,
                  MAX(CASE WHEN ra.id IS NOT NULL THEN 1 ELSE 0 END) AS enrolled
             FROM my_moodle_course a
             JOIN my_faculty f ON a.FACULTY = f.ID
             JOIN my_section_students ss ON ss.SECTION = a.ID",
    );
    push_enrollment_joins(&mut q, student_role_id);
    q.push(" WHERE 1=1")
        .predicate(pred)
        .push(" GROUP BY ss.SECTION, ss.STUDENT)");

    let totals = conn.query_row(q.sql(), rusqlite::params_from_iter(q.args()), |r| {
        Ok(EnrollmentTotals {
            total_students: r.get(0)?,
            enrolled_students: r.get(1)?,
        })
    })?;
    Ok(totals)
}

/// Distinct student records linked to a live student account, ignoring any
/// scope. Only meaningful for an unfiltered admin view.
pub fn registered_students_global(conn: &Connection) -> Result<i64, ReportError> {
    let q = SqlBuf::new(
        "SELECT COUNT(DISTINCT s.ID)
           FROM my_student s
           JOIN mdl_user u ON u.id = s.MOODLESTUDENTID
          WHERE u.usertype = 'Student' AND COALESCE(u.deleted, 0) = 0",
    );
    fetch_count(conn, &q)
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum EnrollmentStatus {
    Enrolled,
    Unenrolled,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RosterEntry {
    pub student_id: i64,
    pub name: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub status: EnrollmentStatus,
}

/// Every student linked to a section, unenrolled first, then by name.
pub fn roster(conn: &Connection, student_role_id: i64, course_id: i64) -> Result<Vec<RosterEntry>, ReportError> {
    let mut q = SqlBuf::new(
        "SELECT ss.STUDENT, COALESCE(s.NAME, '') AS student_name, s.username, s.email,
                MAX(CASE WHEN ra.id IS NOT NULL THEN 1 ELSE 0 END) AS enrolled
           FROM my_moodle_course a
           JOIN my_section_students ss ON ss.SECTION = a.ID",
    );
    push_enrollment_joins(&mut q, student_role_id);
    q.bind(" WHERE a.ID = ?", course_id)
        .push(" GROUP BY ss.STUDENT")
        .push(" ORDER BY enrolled ASC, student_name, ss.STUDENT");

    fetch_all(conn, &q, |r| {
        let enrolled: i64 = r.get(4)?;
        Ok(RosterEntry {
            student_id: r.get(0)?,
            name: r.get(1)?,
            username: r.get(2)?,
            email: r.get(3)?,
            status: if enrolled > 0 {
                EnrollmentStatus::Enrolled
            } else {
                EnrollmentStatus::Unenrolled
            },
        })
    })
}
