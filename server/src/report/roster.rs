use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    access::{resolve_visibility, Role, Viewer},
    config::Config,
    db::{
        catalog::{self, CourseDetails},
        enrollment::{self, EnrollmentStatus, RosterEntry},
    },
    error::ReportError,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RosterType {
    #[default]
    Total,
    Enrolled,
    Unenrolled,
}

impl RosterType {
    pub fn label(self) -> &'static str {
        match self {
            RosterType::Total => "Total",
            RosterType::Enrolled => "Enrolled",
            RosterType::Unenrolled => "Unenrolled",
        }
    }

    fn admits(self, status: EnrollmentStatus) -> bool {
        match self {
            RosterType::Total => true,
            RosterType::Enrolled => status == EnrollmentStatus::Enrolled,
            RosterType::Unenrolled => status == EnrollmentStatus::Unenrolled,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RosterCounts {
    pub total: i64,
    pub enrolled: i64,
    pub unenrolled: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RosterReport {
    pub course: CourseDetails,
    #[serde(rename = "type")]
    pub roster_type: RosterType,
    /// Counts of the whole roster, whatever `type` selects.
    pub counts: RosterCounts,
    pub students: Vec<RosterEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Students of one course section, filtered by enrollment status.
pub fn assemble(
    conn: &Connection,
    cfg: &Config,
    viewer: &Viewer,
    course_id: i64,
    roster_type: RosterType,
) -> Result<RosterReport, ReportError> {
    viewer.ensure_staff()?;
    let visibility = resolve_visibility(conn, viewer)?;

    let Some(course) = catalog::course_details(conn, course_id)? else {
        return Err(ReportError::NotFound(format!("course {course_id} not found")));
    };
    if !visibility.admits(course.faculty_id, course.institution) {
        return Err(match viewer.role {
            Role::Faculty => ReportError::Forbidden("this course belongs to another faculty".to_string()),
            _ => ReportError::NotFound(format!("course {course_id} not found")),
        });
    }

    let everyone = enrollment::roster(conn, cfg.student_role_id, course_id)?;
    let enrolled = everyone
        .iter()
        .filter(|e| e.status == EnrollmentStatus::Enrolled)
        .count() as i64;
    let counts = RosterCounts {
        total: everyone.len() as i64,
        enrolled,
        unenrolled: everyone.len() as i64 - enrolled,
    };

    let students: Vec<RosterEntry> = everyone.into_iter().filter(|e| roster_type.admits(e.status)).collect();
    let message = students.is_empty().then(|| match roster_type {
        RosterType::Total => "no students found".to_string(),
        other => format!("no {} students found", other.label().to_lowercase()),
    });

    Ok(RosterReport {
        course,
        roster_type,
        counts,
        students,
        message,
    })
}
