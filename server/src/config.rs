use std::{env, str::FromStr, time::Duration};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be {expected}, got '{value}'")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// How the dashboard counts "registered" students.
///
/// `Scoped` uses section membership for every view, the same basis as the
/// enrolled count. `Global` keeps the legacy number for an unfiltered admin
/// view (every student record linked to a Student account) and falls back to
/// `Scoped` everywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegisteredMode {
    #[default]
    Scoped,
    Global,
}

impl FromStr for RegisteredMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scoped" => Ok(RegisteredMode::Scoped),
            "global" => Ok(RegisteredMode::Global),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub sqlite_path: String,
    pub pool_size: u32,
    pub busy_timeout: Duration,
    /// Role id whose assignment in a course context means "enrolled".
    pub student_role_id: i64,
    /// LMS user ids that are treated as site administrators.
    pub site_admins: Vec<i64>,
    pub identity_header: String,
    pub dashboard_page_size: u32,
    pub module_page_size: u32,
    pub max_page_size: u32,
    pub registered_mode: RegisteredMode,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            sqlite_path: "data/lms.db".to_string(),
            pool_size: 8,
            busy_timeout: Duration::from_millis(5000),
            student_role_id: 5,
            site_admins: Vec::new(),
            identity_header: "X-Lms-User-Id".to_string(),
            dashboard_page_size: 26,
            module_page_size: 5,
            max_page_size: 500,
            registered_mode: RegisteredMode::Scoped,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Config::default();

        if let Some(v) = get("APP_HOST") {
            cfg.host = v;
        }
        if let Some(v) = get("SQLITE_PATH") {
            cfg.sqlite_path = v;
        }
        if let Some(v) = get("IDENTITY_HEADER") {
            cfg.identity_header = v;
        }

        cfg.port = parse_or(&get, "APP_PORT", "a port number", cfg.port)?;
        cfg.pool_size = parse_or(&get, "DB_POOL_SIZE", "a positive integer", cfg.pool_size)?;
        let timeout_ms: u64 = parse_or(&get, "DB_BUSY_TIMEOUT_MS", "milliseconds", 5000)?;
        cfg.busy_timeout = Duration::from_millis(timeout_ms);
        cfg.student_role_id = parse_or(&get, "STUDENT_ROLE_ID", "an integer", cfg.student_role_id)?;
        cfg.dashboard_page_size =
            parse_or(&get, "DASHBOARD_PAGE_SIZE", "a positive integer", cfg.dashboard_page_size)?;
        cfg.module_page_size =
            parse_or(&get, "MODULE_PAGE_SIZE", "a positive integer", cfg.module_page_size)?;
        cfg.max_page_size = parse_or(&get, "MAX_PAGE_SIZE", "a positive integer", cfg.max_page_size)?;

        for (key, value) in [
            ("DB_POOL_SIZE", cfg.pool_size),
            ("DASHBOARD_PAGE_SIZE", cfg.dashboard_page_size),
            ("MODULE_PAGE_SIZE", cfg.module_page_size),
            ("MAX_PAGE_SIZE", cfg.max_page_size),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    key,
                    expected: "a positive integer",
                    value: "0".to_string(),
                });
            }
        }

        if let Some(raw) = get("SITE_ADMINS") {
            cfg.site_admins = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<i64>().map_err(|_| ConfigError::Invalid {
                        key: "SITE_ADMINS",
                        expected: "a comma-separated list of user ids",
                        value: raw.clone(),
                    })
                })
                .collect::<Result<_, _>>()?;
        }

        if let Some(raw) = get("REGISTERED_STUDENTS_MODE") {
            cfg.registered_mode = raw.parse().map_err(|_| ConfigError::Invalid {
                key: "REGISTERED_STUDENTS_MODE",
                expected: "'scoped' or 'global'",
                value: raw.clone(),
            })?;
        }

        Ok(cfg)
    }
}

fn parse_or<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            expected,
            value: raw,
        }),
    }
}
