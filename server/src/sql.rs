//! Parameterised query assembly.
//!
//! Filter values never reach the SQL text: every clause carries its own
//! positional `?` placeholders and the values travel alongside in order.

use rusqlite::types::Value;

/// Padding trimmed from both ends of names and id-numbers: space, tab, line
/// feed, vertical tab and form feed. The SQL expressions below trim exactly
/// this set.
const PADDING: [char; 5] = [' ', '\t', '\n', '\x0B', '\x0C'];

/// Display form of a faculty name in SQL (alias `f`): carriage returns
/// stripped, [`PADDING`] trimmed, NULL read as the empty name.
pub const FACULTY_NAME: &str =
    "TRIM(REPLACE(COALESCE(f.NAME, ''), char(13), ''), ' ' || char(9) || char(10) || char(11) || char(12))";

/// Faculty id referenced by an account's id-number (alias `u`), NULL unless
/// the trimmed value is all digits.
pub const USER_FACULTY_ID: &str = "CASE
    WHEN TRIM(u.idnumber, ' ' || char(9) || char(10) || char(11) || char(12)) <> ''
     AND TRIM(u.idnumber, ' ' || char(9) || char(10) || char(11) || char(12)) NOT GLOB '*[^0-9]*'
    THEN CAST(TRIM(u.idnumber, ' ' || char(9) || char(10) || char(11) || char(12)) AS INTEGER)
    END";

/// Rust-side twin of [`FACULTY_NAME`], applied to stored names and to
/// user-supplied filter values alike.
pub fn normalize_faculty_name(raw: &str) -> String {
    raw.replace('\r', "").trim_matches(&PADDING[..]).to_string()
}

/// Rust-side twin of [`USER_FACULTY_ID`].
pub fn parse_id_number(raw: &str) -> Option<i64> {
    let digits = raw.trim_matches(&PADDING[..]);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// `?, ?, ?` for `n` values.
pub fn placeholders(n: usize) -> String {
    std::iter::repeat("?").take(n).collect::<Vec<_>>().join(", ")
}

/// A conjunction of clauses plus their bound values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    clauses: Vec<String>,
    args: Vec<Value>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a clause; `args` must match its `?` count.
    pub fn push(&mut self, clause: impl Into<String>, args: impl IntoIterator<Item = Value>) {
        let clause = clause.into();
        let args: Vec<Value> = args.into_iter().collect();
        debug_assert_eq!(clause.matches('?').count(), args.len(), "placeholder mismatch in {clause}");
        self.clauses.push(clause);
        self.args.extend(args);
    }

    pub fn and(mut self, clause: impl Into<String>, args: impl IntoIterator<Item = Value>) -> Self {
        self.push(clause, args);
        self
    }

    pub fn extend(&mut self, other: &Predicate) {
        self.clauses.extend(other.clauses.iter().cloned());
        self.args.extend(other.args.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Renders as ` AND (..)` fragments, meant to follow `WHERE 1=1`.
    pub fn sql(&self) -> String {
        self.clauses.iter().map(|c| format!(" AND ({c})")).collect()
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }
}

/// SQL text and its positional values, built left to right.
#[derive(Debug, Clone, Default)]
pub struct SqlBuf {
    sql: String,
    args: Vec<Value>,
}

impl SqlBuf {
    pub fn new(sql: &str) -> Self {
        SqlBuf {
            sql: sql.to_string(),
            args: Vec::new(),
        }
    }

    pub fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Appends SQL containing exactly one `?` and its value.
    pub fn bind(&mut self, sql: &str, value: impl Into<Value>) -> &mut Self {
        self.sql.push_str(sql);
        self.args.push(value.into());
        self
    }

    pub fn predicate(&mut self, p: &Predicate) -> &mut Self {
        self.sql.push_str(&p.sql());
        self.args.extend(p.args().iter().cloned());
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_lose_carriage_returns_and_padding() {
        assert_eq!(normalize_faculty_name("  Dept of CS\r\n"), "Dept of CS");
        assert_eq!(normalize_faculty_name("Law\r School"), "Law School");
        assert_eq!(normalize_faculty_name("\tArts\x0C"), "Arts");
    }

    #[test]
    fn sql_and_rust_names_agree() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        for raw in [
            Some("Dept of Physics\r\n"),
            Some(" \t Dept of CS\r"),
            Some("\n\x0BLaw\r School\x0C "),
            Some("   "),
            None,
        ] {
            let sql = format!("SELECT {FACULTY_NAME} FROM (SELECT ?1 AS NAME) f");
            let from_sql: String = conn.query_row(&sql, [raw], |r| r.get(0)).unwrap();
            assert_eq!(from_sql, normalize_faculty_name(raw.unwrap_or_default()), "{raw:?}");
        }
    }

    #[test]
    fn sql_and_rust_id_numbers_agree() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        for raw in [Some("10"), Some(" 010\t"), Some("\n20\r"), Some("1O"), Some("-3"), Some(" "), None] {
            let sql = format!("SELECT {USER_FACULTY_ID} FROM (SELECT ?1 AS idnumber) u");
            let from_sql: Option<i64> = conn.query_row(&sql, [raw], |r| r.get(0)).unwrap();
            assert_eq!(from_sql, raw.and_then(parse_id_number), "{raw:?}");
        }
        assert_eq!(parse_id_number(" 010\t"), Some(10));
        assert_eq!(parse_id_number("1O"), None);
    }

    #[test]
    fn predicate_keeps_values_out_of_sql() {
        let p = Predicate::new()
            .and("f.CITY = ?", [Value::Text("x' OR '1'='1".into())])
            .and(format!("f.INSTITUTION IN ({})", placeholders(2)), [Value::Integer(1), Value::Integer(2)]);

        assert_eq!(p.sql(), " AND (f.CITY = ?) AND (f.INSTITUTION IN (?, ?))");
        assert!(!p.sql().contains("OR '1'"));
        assert_eq!(p.args().len(), 3);
    }

    #[test]
    fn sqlbuf_orders_values_like_the_text() {
        let p = Predicate::new().and("f.ID = ?", [Value::Integer(9)]);
        let mut q = SqlBuf::new("SELECT 1 FROM t WHERE x = ?");
        q.args.push(Value::Integer(1));
        q.push(" AND 1=1").predicate(&p).bind(" LIMIT ?", 5_i64);

        assert_eq!(q.sql(), "SELECT 1 FROM t WHERE x = ? AND 1=1 AND (f.ID = ?) LIMIT ?");
        assert_eq!(q.args(), &[Value::Integer(1), Value::Integer(9), Value::Integer(5)]);
    }
}
