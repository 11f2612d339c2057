mod config;
mod error;
mod logging;
mod runtime;
pub mod services;

pub use config::AppConfig;
pub use error::AppError;

pub fn run() -> Result<(), AppError> {
    logging::init()?;

    let config = AppConfig::from_env()?;
    let rules = config.usage_rules()?;

    tracing::info!(
        db_path = %config.db_path,
        http_bind = %config.http_bind,
        max_entries = config.max_entries,
        duration_set = ?config.duration_set,
        voltage_tiers = rules.tariffs.tiers().len(),
        group_labels = rules.groups.labels().len(),
        "application bootstrap initialized"
    );

    runtime::run(config, rules)
}
