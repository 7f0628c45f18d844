use rusqlite::{types::Value, Connection};
use serde::Serialize;

use crate::{
    access::{Scope, Viewer},
    db::catalog,
    error::ReportError,
    sql::FACULTY_NAME,
};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Cities {
    pub cities: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Faculties {
    pub city: Option<String>,
    pub faculties: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FacultyCity {
    pub faculty: String,
    pub city: String,
}

pub fn cities(conn: &Connection, viewer: &Viewer) -> Result<Cities, ReportError> {
    let scope = Scope::resolve(conn, viewer, None, None)?;
    Ok(Cities {
        cities: catalog::available_cities(conn, &scope.visibility_predicate())?,
    })
}

/// Faculty names for the dropdown; a faculty viewer only ever sees their own.
pub fn faculties(conn: &Connection, viewer: &Viewer, city: Option<&str>) -> Result<Faculties, ReportError> {
    let scope = Scope::resolve(conn, viewer, city, None)?;
    let faculties = if scope.is_faculty_viewer() {
        catalog::available_faculties(conn, &scope.predicate())?
    } else {
        catalog::available_faculties(conn, &scope.city_predicate())?
    };
    Ok(Faculties {
        city: scope.city,
        faculties,
    })
}

/// Campus of a faculty the viewer can see.
pub fn faculty_city(conn: &Connection, viewer: &Viewer, faculty: &str) -> Result<FacultyCity, ReportError> {
    let scope = Scope::resolve(conn, viewer, None, Some(faculty))?;
    let Some(name) = scope.faculty.clone() else {
        return Err(ReportError::BadRequest("a faculty is required".to_string()));
    };
    let pred = scope
        .visibility_predicate()
        .and(format!("{FACULTY_NAME} = ?"), [Value::Text(name.clone())]);

    match catalog::faculty_city(conn, &pred)? {
        Some(city) => Ok(FacultyCity { faculty: name, city }),
        None => Err(ReportError::NotFound(format!("faculty '{name}' not found"))),
    }
}
