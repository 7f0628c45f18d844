use rusqlite::{types::Value, Connection};
use serde::Serialize;

use crate::{
    access::{Role, Scope, Viewer, Visibility},
    config::{Config, RegisteredMode},
    db::{
        catalog,
        enrollment::{self, SectionEnrollment, SectionOrder},
        modules,
        users::{self, RoleCount, UserSet},
        Window,
    },
    error::ReportError,
    sql::FACULTY_NAME,
};

use super::{
    first_seen, link_to, module_color, percent_2dp, Chart, Distribution, EnrollmentRow, Pagination, Series, Slice,
    CAMPUS_PALETTE,
};

pub const PATH: &str = "/api/reports/dashboard";

#[derive(Debug, Clone, Default)]
pub struct DashboardParams {
    pub city: Option<String>,
    pub faculty: Option<String>,
    pub page: u32,
    pub per_page: u32,
}

/// Which section rows to attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rows {
    Page,
    /// Every row in scope, for downloads.
    All,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardReport {
    pub filters: AppliedFilters,
    pub summary: DashboardSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campus_modules: Option<Chart<CampusModules>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_distribution: Option<Chart<Distribution>>,
    pub role_distribution: Chart<RoleDistribution>,
    pub enrollment_chart: Chart<FacultyEnrollmentChart>,
    pub rows: Vec<EnrollmentRow>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AppliedFilters {
    pub city: Option<String>,
    pub faculty: Option<String>,
    pub available_cities: Vec<String>,
    pub available_faculties: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RegisteredBasis {
    SectionMembership,
    Global,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardSummary {
    pub total_faculty: i64,
    pub total_courses: i64,
    pub registered_students: i64,
    pub registered_basis: RegisteredBasis,
    pub enrolled_students: i64,
    pub unenrolled_students: i64,
    pub enrollment_percentage: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CampusModules {
    pub cities: Vec<String>,
    pub series: Vec<Series>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RoleDistribution {
    pub roles: Vec<RoleCount>,
}

/// Page rows grouped by faculty.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FacultyEnrollmentChart {
    pub faculties: Vec<String>,
    pub total: Vec<i64>,
    pub enrolled: Vec<i64>,
    pub unenrolled: Vec<i64>,
}

#[derive(Serialize)]
struct PageQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    city: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    faculty: Option<&'a str>,
    page: u32,
    per_page: u32,
}

pub fn assemble(
    conn: &Connection,
    cfg: &Config,
    viewer: &Viewer,
    params: &DashboardParams,
    rows: Rows,
) -> Result<DashboardReport, ReportError> {
    let mut scope = Scope::resolve(conn, viewer, params.city.as_deref(), params.faculty.as_deref())?;

    // A selected faculty implies its campus; must run before any report query.
    if !scope.is_faculty_viewer() && scope.city.is_none() {
        if let Some(name) = &scope.faculty {
            let pred = scope
                .visibility_predicate()
                .and(format!("{FACULTY_NAME} = ?"), [Value::Text(name.clone())]);
            scope.city = catalog::faculty_city(conn, &pred)?;
        }
    }
    log::debug!("dashboard scope: {:?} city={:?} faculty={:?}", scope.visibility.kind(), scope.city, scope.faculty);

    let available_cities = catalog::available_cities(conn, &scope.visibility_predicate())?;
    let available_faculties = match scope.visibility.own_faculty() {
        Some(own) => vec![own.name.clone()],
        None if scope.is_faculty_viewer() => Vec::new(),
        None => catalog::available_faculties(conn, &scope.city_predicate())?,
    };

    let pred = scope.predicate();
    let total_faculty = catalog::count_faculties(conn, &pred)?;
    let total_courses = enrollment::count_sections(conn, &pred)?;
    let totals = enrollment::scope_totals(conn, cfg.student_role_id, &pred)?;

    let unfiltered_admin = viewer.role == Role::Admin && scope.city.is_none() && scope.faculty.is_none();
    let (registered_students, registered_basis) = match cfg.registered_mode {
        RegisteredMode::Global if unfiltered_admin => {
            (enrollment::registered_students_global(conn)?, RegisteredBasis::Global)
        }
        _ => (totals.total_students, RegisteredBasis::SectionMembership),
    };

    let summary = DashboardSummary {
        total_faculty,
        total_courses,
        registered_students,
        registered_basis,
        enrolled_students: totals.enrolled_students,
        unenrolled_students: totals.unenrolled_students(),
        enrollment_percentage: percent_2dp(totals.enrolled_students, totals.total_students),
    };

    let (campus_modules, module_distribution) = if viewer.role == Role::Admin {
        (Some(campus_chart(&modules::campus_module_counts(conn, &pred)?)), None)
    } else {
        (None, Some(distribution_chart(modules::module_distribution(conn, &pred)?)))
    };

    let user_set = match &scope.visibility {
        Visibility::Unrestricted if scope.faculty.is_none() => UserSet::All {
            city: scope.city.as_deref(),
        },
        Visibility::Institutions(ids) if scope.faculty.is_none() => UserSet::Related {
            pred: &pred,
            student_role_id: cfg.student_role_id,
            hoi_of: Some(ids.as_slice()),
        },
        _ => UserSet::Related {
            pred: &pred,
            student_role_id: cfg.student_role_id,
            hoi_of: None,
        },
    };
    let roles = users::role_counts(conn, user_set)?;
    let role_distribution = Chart::or_no_data(
        RoleDistribution { roles: roles.clone() },
        roles.is_empty(),
        "no user data available",
    );

    let page = params.page.max(1);
    let per_page = params.per_page.clamp(1, cfg.max_page_size);
    let window = match rows {
        Rows::Page => Some(Window::page(page, per_page)),
        Rows::All => None,
    };
    let sections = enrollment::section_enrollment(conn, cfg.student_role_id, &pred, SectionOrder::FacultyCourse, window)?;

    let city = scope.city.as_deref();
    let faculty = scope.faculty.as_deref();
    let pagination = Pagination::new(page, per_page, total_courses, |n| {
        link_to(PATH, &PageQuery { city, faculty, page: n, per_page })
    });

    Ok(DashboardReport {
        enrollment_chart: enrollment_chart(&sections),
        rows: sections.iter().map(EnrollmentRow::from).collect(),
        filters: AppliedFilters {
            city: scope.city.clone(),
            faculty: scope.faculty.clone(),
            available_cities,
            available_faculties,
        },
        summary,
        campus_modules,
        module_distribution,
        role_distribution,
        pagination,
    })
}

fn campus_chart(counts: &[modules::CampusModuleCount]) -> Chart<CampusModules> {
    let cities = first_seen(counts.iter().map(|c| c.city.as_str()));
    let module_names = first_seen(counts.iter().map(|c| c.module.as_str()));

    let series = module_names
        .into_iter()
        .enumerate()
        .map(|(i, module)| {
            let data = cities
                .iter()
                .map(|city| {
                    counts
                        .iter()
                        .find(|c| &c.city == city && c.module == module)
                        .map_or(0, |c| c.count)
                })
                .collect();
            Series {
                name: module,
                data,
                color: Some(CAMPUS_PALETTE[i % CAMPUS_PALETTE.len()]),
            }
        })
        .collect::<Vec<_>>();

    let empty = series.is_empty();
    Chart::or_no_data(CampusModules { cities, series }, empty, "no module data available")
}

pub(crate) fn distribution_chart(totals: Vec<modules::ModuleTotal>) -> Chart<Distribution> {
    let slices: Vec<Slice> = totals
        .into_iter()
        .filter(|t| t.count > 0)
        .map(|t| Slice {
            color: module_color(&t.module),
            name: t.module,
            y: t.count,
        })
        .collect();
    let empty = slices.is_empty();
    Chart::or_no_data(Distribution { slices }, empty, "no module data available")
}

fn enrollment_chart(sections: &[SectionEnrollment]) -> Chart<FacultyEnrollmentChart> {
    let faculties = first_seen(sections.iter().map(|s| s.faculty_name.as_str()));
    let mut chart = FacultyEnrollmentChart {
        total: vec![0; faculties.len()],
        enrolled: vec![0; faculties.len()],
        unenrolled: vec![0; faculties.len()],
        faculties,
    };
    for s in sections {
        if let Some(i) = chart.faculties.iter().position(|f| f == &s.faculty_name) {
            chart.total[i] += s.total_students;
            chart.enrolled[i] += s.enrolled_students;
            chart.unenrolled[i] += s.unenrolled_students();
        }
    }
    let empty = chart.faculties.is_empty();
    Chart::or_no_data(chart, empty, "no enrollment data available")
}
