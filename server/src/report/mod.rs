//! View models returned by the JSON API.
//!
//! Each report is assembled from query-layer rows into immutable structs;
//! nothing here talks HTTP.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::db::enrollment::SectionEnrollment;

pub mod dashboard;
pub mod enrollment;
pub mod filters;
pub mod modules;
pub mod roster;

/// Percentage for detail rows, 0 decimal places.
pub fn percent_whole(part: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (part as f64 / total as f64 * 100.0).round() as i64
}

/// Percentage for summary cards, 2 decimal places.
pub fn percent_2dp(part: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    (part as f64 / total as f64 * 10_000.0).round() / 100.0
}

/// A chart payload, or an explicit empty state.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Chart<T> {
    Ready(T),
    NoData { message: String },
}

impl<T> Chart<T> {
    pub fn no_data(message: &str) -> Self {
        Chart::NoData {
            message: message.to_string(),
        }
    }

    /// `Ready(data)` unless `empty`.
    pub fn or_no_data(data: T, empty: bool, message: &str) -> Self {
        if empty { Chart::no_data(message) } else { Chart::Ready(data) }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Chart::Ready(_))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Series {
    pub name: String,
    pub data: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
}

/// One slice of a distribution (pie) chart.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Slice {
    pub name: String,
    pub y: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Distribution {
    pub slices: Vec<Slice>,
}

/// Colours of the campus-wise module chart, assigned by module index.
pub const CAMPUS_PALETTE: [&str; 6] = ["#36A2EB", "#9966FF", "#4BC0C0", "#FF6384", "#FFCE56", "#FF9F40"];

static MODULE_COLORS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("room", "#7CB5EC"),
        ("imm", "#F7A35C"),
        ("masterie", "#90ED7D"),
        ("assign", "#7CB5EC"),
        ("book", "#434348"),
        ("forum", "#90ED7D"),
        ("lesson", "#F7A35C"),
        ("page", "#8085E9"),
        ("quiz", "#F15C80"),
        ("url", "#E4D354"),
        ("resource", "#2B908F"),
        ("folder", "#91E8E1"),
        ("workshop", "#A8A8A8"),
    ])
});

pub fn module_color(module: &str) -> Option<&'static str> {
    MODULE_COLORS.get(module).copied()
}

/// Distinct values in the order they first appear.
pub fn first_seen<'a>(items: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.iter().any(|seen| seen == item) {
            out.push(item.to_string());
        }
    }
    out
}

/// A section's enrollment as shown in tables and CSV exports.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EnrollmentRow {
    pub course_id: i64,
    pub course_name: String,
    pub faculty_name: String,
    pub campus: String,
    pub total_students: i64,
    pub enrolled_students: i64,
    pub unenrolled_students: i64,
    pub percentage: i64,
}

impl From<&SectionEnrollment> for EnrollmentRow {
    fn from(s: &SectionEnrollment) -> Self {
        EnrollmentRow {
            course_id: s.course_id,
            course_name: s.course_name.clone(),
            faculty_name: s.faculty_name.clone(),
            campus: s.campus.clone(),
            total_students: s.total_students,
            enrolled_students: s.enrolled_students,
            unenrolled_students: s.unenrolled_students(),
            percentage: percent_whole(s.enrolled_students, s.total_students),
        }
    }
}

/// Offset pagination state with a window of nearby page numbers and
/// ready-made links.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total_items: i64,
    pub total_pages: u32,
    pub pages: Vec<u32>,
    pub prev: Option<String>,
    pub next: Option<String>,
}

/// Pages either side of the current one listed in [`Pagination::pages`].
const PAGE_WINDOW: u32 = 2;

impl Pagination {
    /// `link` renders the URL of a given page with the active filters.
    pub fn new(page: u32, per_page: u32, total_items: i64, link: impl Fn(u32) -> Option<String>) -> Self {
        let total_pages = total_pages(total_items, per_page);
        let pages = if total_pages == 0 {
            Vec::new()
        } else {
            let first = page.saturating_sub(PAGE_WINDOW).max(1);
            let last = page.saturating_add(PAGE_WINDOW).min(total_pages);
            (first..=last).collect()
        };
        Pagination {
            page,
            per_page,
            total_items,
            total_pages,
            pages,
            prev: (page > 1 && total_pages > 0).then(|| link(page - 1)).flatten(),
            next: (page < total_pages).then(|| link(page + 1)).flatten(),
        }
    }
}

pub fn total_pages(total_items: i64, per_page: u32) -> u32 {
    if total_items <= 0 || per_page == 0 {
        return 0;
    }
    let per_page = i64::from(per_page);
    u32::try_from((total_items + per_page - 1) / per_page).unwrap_or(u32::MAX)
}

/// `path?query` for a serialisable query struct.
pub fn link_to<Q: Serialize>(path: &str, query: &Q) -> Option<String> {
    match serde_qs::to_string(query) {
        Ok(qs) if qs.is_empty() => Some(path.to_string()),
        Ok(qs) => Some(format!("{path}?{qs}")),
        Err(e) => {
            log::warn!("could not encode page link for {path}: {e}");
            None
        }
    }
}
