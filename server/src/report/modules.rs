use std::collections::{BTreeMap, BTreeSet};

use rusqlite::Connection;
use serde::Serialize;

use crate::{
    access::{Scope, Viewer},
    config::Config,
    db::{catalog, modules},
    error::ReportError,
};

use super::{dashboard::distribution_chart, link_to, module_color, total_pages, Chart, Distribution, Pagination, Series};

pub const PATH: &str = "/api/reports/modules";

#[derive(Debug, Clone, Default)]
pub struct ModuleParams {
    pub city: Option<String>,
    pub faculty: Option<String>,
    pub page: u32,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModuleReport {
    pub city: Option<String>,
    pub faculty: Option<String>,
    pub available_faculties: Vec<String>,
    /// Every module type seen in scope, alphabetical.
    pub modules: Vec<String>,
    pub completion: Chart<ModuleCompletion>,
    pub faculty_totals: Vec<FacultyTotal>,
    pub distribution: Chart<Distribution>,
    pub full_report: Vec<FacultyModuleRow>,
    pub pagination: Pagination,
}

/// Stacked module counts for the faculties on the current page.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ModuleCompletion {
    pub faculties: Vec<String>,
    pub series: Vec<Series>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FacultyTotal {
    pub faculty: String,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FacultyModuleRow {
    pub faculty: String,
    pub modules: BTreeMap<String, i64>,
    pub total: i64,
}

#[derive(Serialize)]
struct PageQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    city: Option<&'a str>,
    page: u32,
}

pub fn assemble(
    conn: &Connection,
    cfg: &Config,
    viewer: &Viewer,
    params: &ModuleParams,
) -> Result<ModuleReport, ReportError> {
    let scope = Scope::resolve(conn, viewer, params.city.as_deref(), params.faculty.as_deref())?;
    let per_page = params.per_page.unwrap_or(cfg.module_page_size).clamp(1, cfg.max_page_size);

    let city_pred = scope.city_predicate();
    let available = catalog::available_faculties(conn, &city_pred)?;

    let mut counts: BTreeMap<String, BTreeMap<String, i64>> = BTreeMap::new();
    let mut module_set = BTreeSet::new();
    for row in modules::faculty_module_counts(conn, &city_pred)? {
        module_set.insert(row.module.clone());
        *counts
            .entry(row.faculty_name)
            .or_default()
            .entry(row.module)
            .or_default() += row.count;
    }
    let module_names: Vec<String> = module_set.into_iter().collect();

    let (report_set, on_page, page) = match &scope.faculty {
        Some(selected) => {
            if !available.contains(selected) {
                return Err(ReportError::NotFound(format!("faculty '{selected}' not found")));
            }
            (vec![selected.clone()], vec![selected.clone()], 1)
        }
        None => {
            let pages = total_pages(available.len() as i64, per_page);
            let page = params.page.max(1).min(pages.max(1));
            let start = ((page - 1) * per_page) as usize;
            let on_page = available.iter().skip(start).take(per_page as usize).cloned().collect();
            (available.clone(), on_page, page)
        }
    };

    let count_of = |faculty: &str, module: &str| {
        counts.get(faculty).and_then(|m| m.get(module)).copied().unwrap_or(0)
    };

    let series: Vec<Series> = module_names
        .iter()
        .filter_map(|module| {
            let data: Vec<i64> = on_page.iter().map(|f| count_of(f, module)).collect();
            data.iter().any(|&v| v > 0).then(|| Series {
                name: module.clone(),
                data,
                color: module_color(module),
            })
        })
        .collect();

    let faculty_totals = on_page
        .iter()
        .map(|f| FacultyTotal {
            faculty: f.clone(),
            total: counts.get(f).map_or(0, |m| m.values().sum()),
        })
        .collect();

    let mut distribution: BTreeMap<&str, i64> = BTreeMap::new();
    let sources: Vec<&BTreeMap<String, i64>> = match &scope.faculty {
        Some(selected) => counts.get(selected).into_iter().collect(),
        None => counts.values().collect(),
    };
    for per_module in sources {
        for (module, n) in per_module {
            *distribution.entry(module.as_str()).or_default() += n;
        }
    }
    let mut slices: Vec<modules::ModuleTotal> = distribution
        .into_iter()
        .map(|(module, count)| modules::ModuleTotal { module: module.to_string(), count })
        .collect();
    slices.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.module.cmp(&b.module)));

    let full_report = report_set
        .iter()
        .map(|f| {
            let per_module: BTreeMap<String, i64> =
                module_names.iter().map(|m| (m.clone(), count_of(f, m))).collect();
            FacultyModuleRow {
                faculty: f.clone(),
                total: per_module.values().sum(),
                modules: per_module,
            }
        })
        .collect();

    let total_items = report_set.len() as i64;
    let city = scope.city.as_deref();
    let pagination = Pagination::new(page, per_page, total_items, |n| link_to(PATH, &PageQuery { city, page: n }));

    let empty = series.is_empty();
    Ok(ModuleReport {
        city: scope.city.clone(),
        faculty: scope.faculty.clone(),
        available_faculties: available,
        modules: module_names,
        completion: Chart::or_no_data(ModuleCompletion { faculties: on_page, series }, empty, "no module data available"),
        faculty_totals,
        distribution: distribution_chart(slices),
        full_report,
        pagination,
    })
}
