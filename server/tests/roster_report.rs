mod common;

use common::{Fixture, ADMIN, CONTRACT_LAW, FACULTY_CS, FACULTY_NO_RECORD, HOI_ONE, PAINTING, SECTION_A};
use lms_reports_server::{
    config::Config,
    db::enrollment::EnrollmentStatus,
    error::ReportError,
    report::roster::{assemble, RosterType},
};

#[test]
fn roster_lists_unenrolled_students_first() {
    let fx = Fixture::seeded();
    let pool = fx.pool();
    let conn = pool.get().expect("conn");
    let admin = common::viewer(&conn, ADMIN);

    let report = assemble(&conn, &Config::default(), &admin, SECTION_A, RosterType::Total).expect("roster");
    assert_eq!(report.course.course_name, "Section A");
    assert_eq!(report.course.faculty_name, "Dept of CS");
    assert_eq!(report.course.campus, "Noida");
    assert_eq!((report.counts.total, report.counts.enrolled, report.counts.unenrolled), (10, 7, 3));
    assert_eq!(report.students.len(), 10);

    let names: Vec<&str> = report.students.iter().take(4).map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Student 08", "Student 09", "Student 10", "Student 01"]);
    assert_eq!(report.students[0].status, EnrollmentStatus::Unenrolled);
    assert_eq!(report.students[3].status, EnrollmentStatus::Enrolled);
    assert_eq!(report.students[3].email.as_deref(), Some("s1@example.edu"));
}

#[test]
fn type_filters_rows_but_not_counts() {
    let fx = Fixture::seeded();
    let pool = fx.pool();
    let conn = pool.get().expect("conn");
    let admin = common::viewer(&conn, ADMIN);

    let unenrolled = assemble(&conn, &Config::default(), &admin, SECTION_A, RosterType::Unenrolled).expect("roster");
    let ids: Vec<i64> = unenrolled.students.iter().map(|s| s.student_id).collect();
    assert_eq!(ids, vec![8, 9, 10]);
    assert_eq!(unenrolled.counts.total, 10);

    let enrolled = assemble(&conn, &Config::default(), &admin, SECTION_A, RosterType::Enrolled).expect("roster");
    assert_eq!(enrolled.students.len(), 7);
    assert!(enrolled.message.is_none());
}

#[test]
fn empty_selection_carries_a_message() {
    let fx = Fixture::seeded();
    let pool = fx.pool();
    let conn = pool.get().expect("conn");
    let admin = common::viewer(&conn, ADMIN);

    let report = assemble(&conn, &Config::default(), &admin, common::SECTION_B, RosterType::Unenrolled).expect("roster");
    assert!(report.students.is_empty());
    assert_eq!(report.message.as_deref(), Some("no unenrolled students found"));
}

#[test]
fn missing_course_is_not_found() {
    let fx = Fixture::seeded();
    let pool = fx.pool();
    let conn = pool.get().expect("conn");
    let admin = common::viewer(&conn, ADMIN);

    let err = assemble(&conn, &Config::default(), &admin, 9999, RosterType::Total).unwrap_err();
    assert!(matches!(err, ReportError::NotFound(_)));
}

#[test]
fn faculty_cannot_open_another_faculty_course() {
    let fx = Fixture::seeded();
    let pool = fx.pool();
    let conn = pool.get().expect("conn");

    let own = common::viewer(&conn, FACULTY_CS);
    assert!(assemble(&conn, &Config::default(), &own, SECTION_A, RosterType::Total).is_ok());
    let err = assemble(&conn, &Config::default(), &own, CONTRACT_LAW, RosterType::Total).unwrap_err();
    assert!(matches!(err, ReportError::Forbidden(_)), "{err:?}");

    let orphan = common::viewer(&conn, FACULTY_NO_RECORD);
    let err = assemble(&conn, &Config::default(), &orphan, SECTION_A, RosterType::Total).unwrap_err();
    assert!(matches!(err, ReportError::Forbidden(_)), "{err:?}");
}

#[test]
fn hoi_cannot_see_courses_of_other_institutions() {
    let fx = Fixture::seeded();
    let pool = fx.pool();
    let conn = pool.get().expect("conn");
    let hoi = common::viewer(&conn, HOI_ONE);

    assert!(assemble(&conn, &Config::default(), &hoi, CONTRACT_LAW, RosterType::Total).is_ok());
    let err = assemble(&conn, &Config::default(), &hoi, PAINTING, RosterType::Total).unwrap_err();
    assert!(matches!(err, ReportError::NotFound(_)), "{err:?}");
}
