//! Who may see what.
//!
//! A request's visibility is resolved once from the viewer and then threaded
//! into every report query as a [`Predicate`] over the faculty alias `f`.

use rusqlite::{types::Value, Connection};
use serde::Serialize;

use crate::{
    db::catalog,
    error::ReportError,
    sql::{normalize_faculty_name, parse_id_number, placeholders, Predicate, FACULTY_NAME},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "HOI")]
    Hoi,
    Faculty,
    Student,
}

impl Role {
    /// Maps the LMS `usertype` column. Unknown types get no report access.
    pub fn from_usertype(usertype: Option<&str>) -> Self {
        match usertype.map(str::trim) {
            Some(t) if t.eq_ignore_ascii_case("admin") => Role::Admin,
            Some("HOI") => Role::Hoi,
            Some("Faculty") => Role::Faculty,
            _ => Role::Student,
        }
    }
}

/// The authenticated LMS account behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: i64,
    pub role: Role,
    /// Staff code, set for heads of institute.
    pub usercode: Option<String>,
    /// Back-reference to the faculty record, set for faculty accounts.
    pub idnumber: Option<String>,
}

impl Viewer {
    pub fn ensure_staff(&self) -> Result<(), ReportError> {
        match self.role {
            Role::Student => Err(ReportError::Forbidden(
                "you do not have permission to access reports".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// The faculty record a faculty viewer is pinned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnFaculty {
    pub id: i64,
    pub name: String,
    pub city: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    Unrestricted,
    Institutions(Vec<i64>),
    Faculty(OwnFaculty),
    /// Matches nothing. Used when the viewer's scope cannot be established.
    Denied,
}

impl Visibility {
    pub fn kind(&self) -> &'static str {
        match self {
            Visibility::Unrestricted => "unrestricted",
            Visibility::Institutions(_) => "institutions",
            Visibility::Faculty(_) => "faculty",
            Visibility::Denied => "denied",
        }
    }

    pub fn predicate(&self) -> Predicate {
        let mut p = Predicate::new();
        match self {
            Visibility::Unrestricted => {}
            Visibility::Institutions(ids) => p.push(
                format!("f.INSTITUTION IN ({})", placeholders(ids.len())),
                ids.iter().map(|id| Value::Integer(*id)),
            ),
            Visibility::Faculty(own) => p.push("f.ID = ?", [Value::Integer(own.id)]),
            Visibility::Denied => p.push("1 = 0", []),
        }
        p
    }

    /// Whether a faculty record with this id and institution is in scope.
    pub fn admits(&self, faculty_id: i64, institution: Option<i64>) -> bool {
        match self {
            Visibility::Unrestricted => true,
            Visibility::Institutions(ids) => institution.is_some_and(|i| ids.contains(&i)),
            Visibility::Faculty(own) => own.id == faculty_id,
            Visibility::Denied => false,
        }
    }

    pub fn own_faculty(&self) -> Option<&OwnFaculty> {
        match self {
            Visibility::Faculty(own) => Some(own),
            _ => None,
        }
    }
}

/// Resolves what `viewer` may see.
///
/// A missing faculty or institution mapping yields [`Visibility::Denied`],
/// never an error and never an unrestricted view.
pub fn resolve_visibility(conn: &Connection, viewer: &Viewer) -> Result<Visibility, ReportError> {
    let vis = match viewer.role {
        Role::Admin => Visibility::Unrestricted,
        Role::Hoi => {
            let ids = match viewer.usercode.as_deref().map(str::trim) {
                Some(code) if !code.is_empty() => catalog::hoi_institutions(conn, code)?,
                _ => Vec::new(),
            };
            if ids.is_empty() { Visibility::Denied } else { Visibility::Institutions(ids) }
        }
        Role::Faculty => {
            let own = match viewer.idnumber.as_deref().and_then(parse_id_number) {
                Some(id) => catalog::faculty_by_id(conn, id)?,
                None => None,
            };
            own.map(Visibility::Faculty).unwrap_or(Visibility::Denied)
        }
        Role::Student => Visibility::Denied,
    };
    log::debug!("user {} ({:?}) resolved to {} scope", viewer.user_id, viewer.role, vis.kind());
    Ok(vis)
}

/// Visibility plus the caller's city/faculty filters for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub role: Role,
    pub visibility: Visibility,
    pub city: Option<String>,
    /// Normalised faculty name filter.
    pub faculty: Option<String>,
}

impl Scope {
    /// Rejects students, resolves visibility and normalises the filters.
    ///
    /// Faculty viewers are pinned to their own faculty; naming another one is
    /// forbidden.
    pub fn resolve(
        conn: &Connection,
        viewer: &Viewer,
        city: Option<&str>,
        faculty: Option<&str>,
    ) -> Result<Self, ReportError> {
        viewer.ensure_staff()?;
        let visibility = resolve_visibility(conn, viewer)?;

        let city = non_empty(city).map(str::to_string);
        let mut faculty = non_empty(faculty).map(normalize_faculty_name).filter(|s| !s.is_empty());

        if viewer.role == Role::Faculty {
            if let Some(own) = visibility.own_faculty() {
                match &faculty {
                    Some(requested) if requested != &own.name => {
                        return Err(ReportError::Forbidden(
                            "faculty users may only view their own faculty".to_string(),
                        ));
                    }
                    _ => faculty = Some(own.name.clone()),
                }
            }
        }

        Ok(Scope {
            role: viewer.role,
            visibility,
            city,
            faculty,
        })
    }

    pub fn is_faculty_viewer(&self) -> bool {
        self.role == Role::Faculty
    }

    /// Visibility only, ignoring the city/faculty filters.
    pub fn visibility_predicate(&self) -> Predicate {
        self.visibility.predicate()
    }

    /// Visibility and city filter.
    pub fn city_predicate(&self) -> Predicate {
        let mut p = self.visibility.predicate();
        if let Some(city) = &self.city {
            p.push("f.CITY = ?", [Value::Text(city.clone())]);
        }
        p
    }

    /// Visibility, city and faculty filters.
    pub fn predicate(&self) -> Predicate {
        let mut p = self.city_predicate();
        if let Some(name) = &self.faculty {
            p.push(format!("{FACULTY_NAME} = ?"), [Value::Text(name.clone())]);
        }
        p
    }
}

fn non_empty(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn own() -> OwnFaculty {
        OwnFaculty { id: 10, name: "Dept of CS".into(), city: "Noida".into() }
    }

    #[test]
    fn usertype_mapping() {
        assert_eq!(Role::from_usertype(Some("HOI")), Role::Hoi);
        assert_eq!(Role::from_usertype(Some("Faculty")), Role::Faculty);
        assert_eq!(Role::from_usertype(Some("admin")), Role::Admin);
        assert_eq!(Role::from_usertype(Some("Parent")), Role::Student);
        assert_eq!(Role::from_usertype(None), Role::Student);
    }

    #[test]
    fn predicates_per_visibility() {
        assert!(Visibility::Unrestricted.predicate().is_empty());
        assert_eq!(Visibility::Denied.predicate().sql(), " AND (1 = 0)");
        let inst = Visibility::Institutions(vec![1, 2]).predicate();
        assert_eq!(inst.sql(), " AND (f.INSTITUTION IN (?, ?))");
        assert_eq!(inst.args(), &[Value::Integer(1), Value::Integer(2)]);
        assert_eq!(Visibility::Faculty(own()).predicate().args(), &[Value::Integer(10)]);
    }

    #[test]
    fn admits_respects_scope() {
        assert!(Visibility::Unrestricted.admits(1, None));
        assert!(Visibility::Institutions(vec![1]).admits(5, Some(1)));
        assert!(!Visibility::Institutions(vec![1]).admits(5, Some(2)));
        assert!(!Visibility::Institutions(vec![1]).admits(5, None));
        assert!(Visibility::Faculty(own()).admits(10, Some(9)));
        assert!(!Visibility::Faculty(own()).admits(11, Some(9)));
        assert!(!Visibility::Denied.admits(10, Some(1)));
    }

    #[test]
    fn students_are_not_staff() {
        let viewer = Viewer { user_id: 1, role: Role::Student, usercode: None, idnumber: None };
        assert!(matches!(viewer.ensure_staff(), Err(ReportError::Forbidden(_))));
    }
}
