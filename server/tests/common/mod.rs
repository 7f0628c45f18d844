#![allow(dead_code)]

//! A seeded LMS database shared by the integration tests.
//!
//! Faculties:
//! - 10 "Dept of CS\r" (Noida, institution 1): Section A (10 students, 7
//!   enrolled) and Section B (5 students, all enrolled)
//! - 20 "Dept of Law" (Noida, institution 1): Contract Law (4 students, 2
//!   enrolled)
//! - 30 "School of Arts" (Delhi, institution 2): Painting (2 students, 1
//!   enrolled)
//! - 40 "Dept of Music" (Noida, institution 1): Choir, no students, no modules

use std::{
    path::PathBuf,
    sync::atomic::{AtomicUsize, Ordering},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use actix_web::web;
use lms_reports_server::{
    access::Viewer,
    config::Config,
    db::{self, catalog, DbPool},
    AppState,
};
use rusqlite::{params, Connection};

pub const ADMIN: i64 = 1;
pub const HOI_ONE: i64 = 2;
pub const FACULTY_CS: i64 = 3;
pub const FACULTY_NO_RECORD: i64 = 4;
pub const HOI_NO_INSTITUTES: i64 = 6;
pub const FACULTY_LAW: i64 = 7;
pub const FACULTY_ARTS: i64 = 8;
pub const DELETED_USER: i64 = 9;
pub const HOI_TWO: i64 = 10;
/// LMS account of student 1.
pub const STUDENT: i64 = 3001;

pub const STUDENT_ROLE: i64 = 5;
pub const TEACHER_ROLE: i64 = 3;

pub const SECTION_A: i64 = 101;
pub const SECTION_B: i64 = 102;
pub const CONTRACT_LAW: i64 = 201;
pub const PAINTING: i64 = 301;
pub const CHOIR: i64 = 401;

static SEQ: AtomicUsize = AtomicUsize::new(0);

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos(),
        SEQ.fetch_add(1, Ordering::SeqCst)
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub struct Fixture {
    dir: PathBuf,
    pub path: PathBuf,
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

impl Fixture {
    pub fn seeded() -> Self {
        let dir = temp_dir("lms-reports");
        let path = dir.join("lms.db");
        let conn = Connection::open(&path).expect("create fixture db");
        conn.execute_batch(include_str!("../fixtures/lms_schema.sql"))
            .expect("create schema");
        seed(&conn);
        Fixture { dir, path }
    }

    /// Applies extra rows on a writable connection, outside the shared seed.
    pub fn execute(&self, sql: &str) {
        let conn = Connection::open(&self.path).expect("open fixture db");
        conn.execute_batch(sql).expect("apply fixture rows");
    }

    /// Read-only pool, opened the way the server opens it.
    pub fn pool(&self) -> DbPool {
        db::init_pool(self.path.to_str().expect("utf-8 path"), 2, Duration::from_millis(500))
            .expect("open pool")
    }

    pub fn state(&self, config: Config) -> web::Data<AppState> {
        web::Data::new(AppState {
            pool: self.pool(),
            config,
        })
    }
}

pub fn viewer(conn: &Connection, user_id: i64) -> Viewer {
    catalog::load_viewer(conn, user_id, &[])
        .expect("load viewer")
        .expect("viewer exists")
}

fn seed(conn: &Connection) {
    conn.execute_batch(
        "INSERT INTO my_hoi VALUES ('HOI-1', 1), ('HOI-2', 2);

         INSERT INTO my_faculty VALUES
            (10, 'Dept of CS' || char(13), 'Noida', 1, 'fac_cs'),
            (20, 'Dept of Law', 'Noida', 1, 'fac_law'),
            (30, 'School of Arts', 'Delhi', 2, 'fac_arts'),
            (40, 'Dept of Music', 'Noida', 1, 'fac_music');

         INSERT INTO my_moodle_course VALUES
            (101, 'Section A', 10, 1001),
            (102, 'Section B', 10, 1002),
            (201, 'Contract Law', 20, 2001),
            (301, 'Painting', 30, 3001),
            (401, 'Choir', 40, 4001);

         INSERT INTO mdl_context VALUES
            (5001, 50, 1001),
            (5002, 50, 1002),
            (5003, 50, 2001),
            (5004, 50, 3001),
            (5005, 50, 4001),
            (5999, 70, 1001);

         INSERT INTO mdl_modules VALUES (1, 'quiz'), (2, 'forum'), (3, 'assign');
         INSERT INTO mdl_course_modules VALUES
            (1, 1001, 1), (2, 1001, 1), (3, 1001, 2),
            (4, 1002, 1),
            (5, 2001, 3),
            (6, 3001, 2), (7, 3001, 2);

         INSERT INTO mdl_user (id, username, usertype, usercode, idnumber, city, deleted) VALUES
            (1, 'admin', 'Admin', NULL, NULL, 'Noida', 0),
            (2, 'hoi1', 'HOI', 'HOI-1', NULL, 'Noida', 0),
            (3, 'cs.head', 'Faculty', NULL, '10', 'Noida', 0),
            (4, 'ghost', 'Faculty', NULL, '999', 'Noida', 0),
            (6, 'hoix', 'HOI', 'HOI-X', NULL, 'Noida', 0),
            (7, 'law.head', 'Faculty', NULL, '20', 'Noida', 0),
            (8, 'arts.head', 'Faculty', NULL, '30', 'Delhi', 0),
            (9, 'gone', 'Faculty', NULL, '10', 'Noida', 1),
            (10, 'hoi2', 'HOI', 'HOI-2', NULL, 'Delhi', 0);",
    )
    .expect("seed reference rows");

    // 22 student records; 1..=21 sit in sections, 22 is registered nowhere.
    for n in 1..=22_i64 {
        let lms_id = 3000 + n;
        let city = if n >= 20 { "Delhi" } else { "Noida" };
        conn.execute(
            "INSERT INTO my_student VALUES (?1, ?2, ?3, ?4, ?5)",
            params![n, format!("Student {n:02}"), format!("E{n:04}"), format!("s{n}@example.edu"), lms_id],
        )
        .expect("insert student");
        conn.execute(
            "INSERT INTO mdl_user (id, username, usertype, city) VALUES (?1, ?2, 'Student', ?3)",
            params![lms_id, format!("E{n:04}"), city],
        )
        .expect("insert student user");
    }

    let sections: [(i64, std::ops::RangeInclusive<i64>); 4] =
        [(SECTION_A, 1..=10), (SECTION_B, 11..=15), (CONTRACT_LAW, 16..=19), (PAINTING, 20..=21)];
    for (section, students) in sections {
        for student in students {
            conn.execute("INSERT INTO my_section_students VALUES (?1, ?2)", params![section, student])
                .expect("insert membership");
        }
    }
    // Duplicate membership row; counts must stay distinct.
    conn.execute("INSERT INTO my_section_students VALUES (?1, 1)", params![SECTION_A])
        .expect("insert duplicate membership");

    let enrolled: [(i64, std::ops::RangeInclusive<i64>); 4] =
        [(5001, 1..=7), (5002, 11..=15), (5003, 16..=17), (5004, 20..=20)];
    for (context, students) in enrolled {
        for student in students {
            assign(conn, STUDENT_ROLE, context, 3000 + student);
        }
    }
    // Noise that must not count as enrollment.
    assign(conn, STUDENT_ROLE, 5001, 3001);
    assign(conn, TEACHER_ROLE, 5001, 3008);
    assign(conn, STUDENT_ROLE, 5999, 3009);
}

fn assign(conn: &Connection, role: i64, context: i64, user: i64) {
    conn.execute(
        "INSERT INTO mdl_role_assignments (roleid, contextid, userid) VALUES (?1, ?2, ?3)",
        params![role, context, user],
    )
    .expect("insert role assignment");
}
