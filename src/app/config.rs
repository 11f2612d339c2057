use std::path::Path;

use crate::app::AppError;
use crate::domain::catalog::{
    DEFAULT_MAX_ENTRIES, DurationCatalog, DurationSet, GroupCatalog, TariffTable, UsageRules,
};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: String,
    pub http_bind: String,
    pub max_entries: usize,
    pub duration_set: DurationSet,
    pub tariff_table_path: Option<String>,
    pub group_labels: Option<String>,
}

impl AppConfig {
    /// Reads the process environment after loading an optional `.env` file.
    pub fn from_env() -> Result<Self, AppError> {
        if let Err(error) = dotenvy::dotenv()
            && !error.not_found()
        {
            return Err(AppError::config(format!("failed to load .env: {error}")));
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_entries = parse_or_default(&lookup, "MAX_ENTRIES", DEFAULT_MAX_ENTRIES)?;
        if max_entries == 0 {
            return Err(AppError::config("MAX_ENTRIES must be at least 1"));
        }

        let duration_set = match non_empty(&lookup, "DURATION_SET") {
            Some(raw) => raw
                .parse::<DurationSet>()
                .map_err(|error| AppError::config(format!("DURATION_SET: {error}")))?,
            None => DurationSet::default(),
        };

        Ok(Self {
            db_path: non_empty(&lookup, "DB_PATH")
                .unwrap_or_else(|| "/var/lib/energy-usage/usage.db".to_string()),
            http_bind: non_empty(&lookup, "HTTP_BIND")
                .unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            max_entries,
            duration_set,
            tariff_table_path: non_empty(&lookup, "TARIFF_TABLE_PATH"),
            group_labels: non_empty(&lookup, "GROUP_LABELS"),
        })
    }

    /// Builds the catalogs the validator and calculator run against.
    pub fn usage_rules(&self) -> Result<UsageRules, AppError> {
        let tariffs = match &self.tariff_table_path {
            Some(path) => TariffTable::from_json_file(Path::new(path))
                .map_err(|error| AppError::config(format!("TARIFF_TABLE_PATH: {error}")))?,
            None => TariffTable::default(),
        };

        let groups = match &self.group_labels {
            Some(raw) => GroupCatalog::parse_list(raw)
                .map_err(|error| AppError::config(format!("GROUP_LABELS: {error}")))?,
            None => GroupCatalog::default(),
        };

        Ok(UsageRules {
            durations: DurationCatalog::new(self.duration_set),
            tariffs,
            groups,
            max_entries: self.max_entries,
        })
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or_default<T, F>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr + Copy,
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup, key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| AppError::config(format!("{key} must be a valid number"))),
        None => Ok(default),
    }
}
