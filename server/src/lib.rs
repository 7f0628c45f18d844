//! Enrollment and module-completion reports over a learning-management
//! system's database, served as JSON.

pub mod access;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod report;
pub mod routes;
pub mod sql;

use config::Config;
use db::DbPool;

pub struct AppState {
    pub pool: DbPool,
    pub config: Config,
}
