use std::io;

use actix_web::{middleware::Logger, web, App, HttpServer};

use lms_reports_server::{config::Config, db, routes, AppState};

#[actix_web::main]
async fn main() -> io::Result<()> {
    let _ = dotenv::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let pool = db::init_pool(&config.sqlite_path, config.pool_size, config.busy_timeout).map_err(|e| {
        log::error!("cannot open {}: {e}", config.sqlite_path);
        io::Error::other(e)
    })?;

    log::info!(
        "serving reports from {} on {}:{} (registered students: {:?})",
        config.sqlite_path,
        config.host,
        config.port,
        config.registered_mode
    );

    let bind = (config.host.clone(), config.port);
    let data = web::Data::new(AppState { pool, config });

    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .wrap(Logger::default())
            .configure(routes::configure)
    })
    .bind(bind)?
    .run()
    .await
}
