use rusqlite::{types::Value, Connection};
use serde::Serialize;

use crate::{
    error::ReportError,
    sql::{placeholders, Predicate, SqlBuf, USER_FACULTY_ID},
};

use super::{fetch_all, COURSE_CONTEXT_LEVEL};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RoleCount {
    pub usertype: String,
    pub count: i64,
}

/// Which accounts a role-wise count covers.
#[derive(Debug, Clone, Copy)]
pub enum UserSet<'a> {
    /// Every live account, optionally only those whose profile city matches.
    All { city: Option<&'a str> },
    /// Accounts reachable from faculties matching `pred`: the faculty staff
    /// themselves and the students enrolled in their sections. `hoi_of`
    /// adds the heads of those institutions.
    Related {
        pred: &'a Predicate,
        student_role_id: i64,
        hoi_of: Option<&'a [i64]>,
    },
}

/// Live accounts per usertype.
///
/// User rows carry no institution or faculty linkage, so scoped counts go
/// through the faculty id-number back-reference and the enrollment join.
pub fn role_counts(conn: &Connection, users: UserSet<'_>) -> Result<Vec<RoleCount>, ReportError> {
    let mut q = SqlBuf::new(
        "SELECT u.usertype, COUNT(DISTINCT u.id) FROM mdl_user u
          WHERE u.usertype IS NOT NULL AND COALESCE(u.deleted, 0) = 0",
    );

    match users {
        UserSet::All { city } => {
            if let Some(city) = city {
                q.bind(" AND u.city = ?", city.to_string());
            }
        }
        UserSet::Related { pred, student_role_id, hoi_of } => {
            q.push(
                &format!(
                    " AND ((u.usertype = 'Faculty' AND {USER_FACULTY_ID} IN (
                        SELECT f.ID FROM my_faculty f WHERE 1=1"
                ),
            )
            .predicate(pred)
            .push(
                "))
                   OR (u.usertype = 'Student' AND u.id IN (
                        SELECT ra.userid
                          FROM my_moodle_course a
                          JOIN my_faculty f ON a.FACULTY = f.ID
                          JOIN my_section_students ss ON ss.SECTION = a.ID
                          JOIN my_student s ON s.ID = ss.STUDENT
                          JOIN mdl_context ctx ON ctx.instanceid = a.MOODLE_COURSE",
            )
            .push(&format!(" AND ctx.contextlevel = {COURSE_CONTEXT_LEVEL}"))
            .push(" JOIN mdl_role_assignments ra ON ra.contextid = ctx.id AND ra.userid = s.MOODLESTUDENTID")
            .bind(" AND ra.roleid = ?", student_role_id)
            .push(" WHERE 1=1")
            .predicate(pred)
            .push("))");

            if let Some(ids) = hoi_of.filter(|ids| !ids.is_empty()) {
                let inst = Predicate::new().and(
                    format!("h.iinstituteid IN ({})", placeholders(ids.len())),
                    ids.iter().map(|id| Value::Integer(*id)),
                );
                q.push(
                    " OR (u.usertype = 'HOI' AND u.usercode IN (
                        SELECT h.sStaffCode FROM my_hoi h WHERE 1=1",
                )
                .predicate(&inst)
                .push("))");
            }
            q.push(")");
        }
    }
    q.push(" GROUP BY u.usertype ORDER BY u.usertype");

    fetch_all(conn, &q, |r| {
        Ok(RoleCount {
            usertype: r.get(0)?,
            count: r.get(1)?,
        })
    })
}
