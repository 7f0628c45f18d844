mod common;

use common::{
    Fixture, ADMIN, CHOIR, CONTRACT_LAW, FACULTY_ARTS, FACULTY_CS, FACULTY_NO_RECORD, HOI_NO_INSTITUTES, HOI_ONE,
    HOI_TWO, PAINTING, SECTION_A, SECTION_B, STUDENT, STUDENT_ROLE,
};
use lms_reports_server::{
    access::{resolve_visibility, OwnFaculty, Role, Scope, Visibility},
    config::Config,
    db::{
        catalog,
        enrollment::{self, SectionOrder},
    },
    error::ReportError,
    report::dashboard::{self, DashboardParams, Rows},
};

fn dashboard_params() -> DashboardParams {
    DashboardParams {
        page: 1,
        per_page: 26,
        ..DashboardParams::default()
    }
}

#[test]
fn roles_resolve_to_their_visibility() {
    let fx = Fixture::seeded();
    let pool = fx.pool();
    let conn = pool.get().expect("conn");

    let admin = common::viewer(&conn, ADMIN);
    assert_eq!(admin.role, Role::Admin);
    assert_eq!(resolve_visibility(&conn, &admin).unwrap(), Visibility::Unrestricted);

    let hoi = common::viewer(&conn, HOI_ONE);
    assert_eq!(resolve_visibility(&conn, &hoi).unwrap(), Visibility::Institutions(vec![1]));

    let faculty = common::viewer(&conn, FACULTY_CS);
    assert_eq!(
        resolve_visibility(&conn, &faculty).unwrap(),
        Visibility::Faculty(OwnFaculty {
            id: 10,
            name: "Dept of CS".into(),
            city: "Noida".into()
        })
    );

    let orphan_hoi = common::viewer(&conn, HOI_NO_INSTITUTES);
    assert_eq!(resolve_visibility(&conn, &orphan_hoi).unwrap(), Visibility::Denied);

    let orphan_faculty = common::viewer(&conn, FACULTY_NO_RECORD);
    assert_eq!(resolve_visibility(&conn, &orphan_faculty).unwrap(), Visibility::Denied);
}

#[test]
fn site_admin_list_overrides_usertype_and_deleted_users_are_unknown() {
    let fx = Fixture::seeded();
    let pool = fx.pool();
    let conn = pool.get().expect("conn");

    let promoted = catalog::load_viewer(&conn, FACULTY_ARTS, &[FACULTY_ARTS]).unwrap().unwrap();
    assert_eq!(promoted.role, Role::Admin);
    assert!(catalog::load_viewer(&conn, common::DELETED_USER, &[]).unwrap().is_none());
    assert!(catalog::load_viewer(&conn, 424242, &[]).unwrap().is_none());
}

#[test]
fn hoi_rows_stay_inside_owned_institutions() {
    let fx = Fixture::seeded();
    let pool = fx.pool();
    let conn = pool.get().expect("conn");

    for (user, expected) in [
        (HOI_ONE, vec![SECTION_A, SECTION_B, CONTRACT_LAW, CHOIR]),
        (HOI_TWO, vec![PAINTING]),
    ] {
        let hoi = common::viewer(&conn, user);
        let pred = Scope::resolve(&conn, &hoi, None, None).unwrap().predicate();
        let mut ids: Vec<i64> = enrollment::section_enrollment(&conn, STUDENT_ROLE, &pred, SectionOrder::Course, None)
            .unwrap()
            .iter()
            .map(|r| r.course_id)
            .collect();
        ids.sort();
        let mut expected = expected;
        expected.sort();
        assert_eq!(ids, expected, "user {user}");
    }
}

#[test]
fn hoi_cannot_reach_another_institution_by_filtering() {
    let fx = Fixture::seeded();
    let pool = fx.pool();
    let conn = pool.get().expect("conn");
    let hoi = common::viewer(&conn, HOI_ONE);

    let params = DashboardParams {
        city: Some("Delhi".into()),
        faculty: Some("School of Arts".into()),
        ..dashboard_params()
    };
    let report = dashboard::assemble(&conn, &Config::default(), &hoi, &params, Rows::Page).unwrap();
    assert!(report.rows.is_empty());
    assert_eq!(report.summary.total_courses, 0);
    assert_eq!(report.summary.registered_students, 0);
}

#[test]
fn faculty_rows_are_only_their_own() {
    let fx = Fixture::seeded();
    let pool = fx.pool();
    let conn = pool.get().expect("conn");
    let faculty = common::viewer(&conn, FACULTY_CS);

    let report = dashboard::assemble(&conn, &Config::default(), &faculty, &dashboard_params(), Rows::Page).unwrap();
    assert!(report.rows.iter().all(|r| r.faculty_name == "Dept of CS"));
    assert_eq!(report.rows.len(), 2);
    assert_eq!(report.filters.faculty.as_deref(), Some("Dept of CS"));
    assert_eq!(report.filters.available_faculties, vec!["Dept of CS"]);
    assert_eq!(report.summary.total_faculty, 1);
    assert_eq!(report.summary.registered_students, 15);
    assert_eq!(report.summary.enrolled_students, 12);
    assert_eq!(report.summary.enrollment_percentage, 80.0);
}

#[test]
fn faculty_asking_for_another_faculty_is_forbidden() {
    let fx = Fixture::seeded();
    let pool = fx.pool();
    let conn = pool.get().expect("conn");
    let faculty = common::viewer(&conn, FACULTY_CS);

    let params = DashboardParams {
        faculty: Some("Dept of Law".into()),
        ..dashboard_params()
    };
    let err = dashboard::assemble(&conn, &Config::default(), &faculty, &params, Rows::Page).unwrap_err();
    assert!(matches!(err, ReportError::Forbidden(_)), "{err:?}");
}

#[test]
fn faculty_without_a_record_sees_the_empty_sentinel() {
    let fx = Fixture::seeded();
    let pool = fx.pool();
    let conn = pool.get().expect("conn");
    let orphan = common::viewer(&conn, FACULTY_NO_RECORD);

    let report = dashboard::assemble(&conn, &Config::default(), &orphan, &dashboard_params(), Rows::Page).unwrap();
    assert_eq!(report.summary.total_faculty, 0);
    assert_eq!(report.summary.total_courses, 0);
    assert_eq!(report.summary.registered_students, 0);
    assert_eq!(report.summary.enrolled_students, 0);
    assert_eq!(report.summary.enrollment_percentage, 0.0);
    assert!(report.rows.is_empty());
    assert!(report.filters.available_faculties.is_empty());
    assert!(!report.role_distribution.is_ready());
    assert!(!report.enrollment_chart.is_ready());
}

#[test]
fn students_are_rejected_before_any_report() {
    let fx = Fixture::seeded();
    let pool = fx.pool();
    let conn = pool.get().expect("conn");
    let student = common::viewer(&conn, STUDENT);
    assert_eq!(student.role, Role::Student);

    let err = dashboard::assemble(&conn, &Config::default(), &student, &dashboard_params(), Rows::Page).unwrap_err();
    assert!(matches!(err, ReportError::Forbidden(_)));
    assert!(matches!(Scope::resolve(&conn, &student, None, None), Err(ReportError::Forbidden(_))));
}

#[test]
fn filter_values_are_bound_not_interpolated() {
    let fx = Fixture::seeded();
    let pool = fx.pool();
    let conn = pool.get().expect("conn");
    let hoi = common::viewer(&conn, HOI_ONE);

    let params = DashboardParams {
        city: Some("x' OR '1'='1".into()),
        ..dashboard_params()
    };
    let report = dashboard::assemble(&conn, &Config::default(), &hoi, &params, Rows::Page).unwrap();
    assert!(report.rows.is_empty());
    assert_eq!(report.summary.total_faculty, 0);
}
