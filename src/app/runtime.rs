use std::path::Path;
use std::sync::{Arc, Mutex};

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use rusqlite::Connection;

use crate::adapters::api::{ApiState, configure_routes};
use crate::adapters::db::{open_connection, run_migrations, schema_version};
use crate::app::config::AppConfig;
use crate::app::error::AppError;
use crate::app::services::SqliteUsageService;
use crate::domain::catalog::UsageRules;

pub fn run(config: AppConfig, rules: UsageRules) -> Result<(), AppError> {
    let connection = open_database(&config.db_path)?;

    let api_state = ApiState {
        usage: SqliteUsageService::new(Arc::new(Mutex::new(connection))),
        rules: Arc::new(rules),
    };

    tracing::info!(bind = %config.http_bind, "http server starting");

    let server_result = actix_web::rt::System::new().block_on(async move {
        HttpServer::new(move || {
            App::new()
                .wrap(Cors::permissive())
                .app_data(web::Data::new(api_state.clone()))
                .configure(configure_routes)
        })
        .bind(&config.http_bind)?
        .run()
        .await
    });

    server_result.map_err(AppError::runtime)
}

/// Opens the submission database, creating its directory and applying migrations.
fn open_database(db_path: &str) -> Result<Connection, AppError> {
    if let Some(parent) = Path::new(db_path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(AppError::database_init)?;
    }

    let mut connection = open_connection(db_path).map_err(AppError::database_init)?;
    run_migrations(&mut connection).map_err(AppError::database_init)?;

    let version = schema_version(&connection).map_err(AppError::database_init)?;
    tracing::info!(db_path, schema_version = version, "database ready");

    Ok(connection)
}
