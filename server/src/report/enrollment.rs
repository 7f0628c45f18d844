use rusqlite::Connection;
use serde::Serialize;

use crate::{
    access::{Scope, Viewer},
    config::Config,
    db::{
        catalog,
        enrollment::{self, SectionOrder},
    },
    error::ReportError,
};

use super::{percent_2dp, percent_whole, Chart, EnrollmentRow};

#[derive(Debug, Clone, Default)]
pub struct EnrollmentParams {
    pub faculty: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EnrollmentReport {
    pub faculty_name: String,
    pub faculty_username: Option<String>,
    pub city: Option<String>,
    pub summary: EnrollmentSummary,
    pub chart: Chart<CourseEnrollmentChart>,
    pub rows: Vec<EnrollmentRow>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EnrollmentSummary {
    pub total_courses: i64,
    pub total_students: i64,
    pub enrolled_students: i64,
    pub unenrolled_students: i64,
    pub enrollment_percentage: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CourseEnrollmentChart {
    pub courses: Vec<String>,
    pub total: Vec<i64>,
    pub enrolled: Vec<i64>,
    pub unenrolled: Vec<i64>,
    pub percentages: Vec<i64>,
}

/// Per-course enrollment inside one faculty.
///
/// The summary is computed at the faculty level, not summed from the
/// rounded rows.
pub fn assemble(
    conn: &Connection,
    cfg: &Config,
    viewer: &Viewer,
    params: &EnrollmentParams,
) -> Result<EnrollmentReport, ReportError> {
    let scope = Scope::resolve(conn, viewer, params.city.as_deref(), params.faculty.as_deref())?;
    let faculty_name = scope
        .faculty
        .clone()
        .ok_or_else(|| ReportError::BadRequest("a faculty is required".to_string()))?;

    let pred = scope.predicate();
    let Some(faculty) = catalog::find_faculty(conn, &pred)? else {
        return Err(ReportError::NotFound(format!("faculty '{faculty_name}' not found")));
    };

    let sections = enrollment::section_enrollment(conn, cfg.student_role_id, &pred, SectionOrder::Course, None)?;
    let totals = enrollment::scope_totals(conn, cfg.student_role_id, &pred)?;

    let faculty_username = sections
        .first()
        .and_then(|s| s.faculty_username.clone())
        .or(faculty.username);

    let chart = CourseEnrollmentChart {
        courses: sections.iter().map(|s| s.course_name.clone()).collect(),
        total: sections.iter().map(|s| s.total_students).collect(),
        enrolled: sections.iter().map(|s| s.enrolled_students).collect(),
        unenrolled: sections.iter().map(|s| s.unenrolled_students()).collect(),
        percentages: sections
            .iter()
            .map(|s| percent_whole(s.enrolled_students, s.total_students))
            .collect(),
    };

    Ok(EnrollmentReport {
        faculty_name,
        faculty_username,
        city: scope.city,
        summary: EnrollmentSummary {
            total_courses: sections.len() as i64,
            total_students: totals.total_students,
            enrolled_students: totals.enrolled_students,
            unenrolled_students: totals.unenrolled_students(),
            enrollment_percentage: percent_2dp(totals.enrolled_students, totals.total_students),
        },
        chart: Chart::or_no_data(chart, sections.is_empty(), "no enrollment data available"),
        rows: sections.iter().map(EnrollmentRow::from).collect(),
    })
}
