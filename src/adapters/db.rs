use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::models::{
    ApplianceEntry, CalculationResult, NewUsageSubmission, UsageSubmission,
};

pub const LATEST_SCHEMA_VERSION: u32 = 1;

const MIGRATIONS: &[(u32, &str)] = &[(
    1,
    r#"
CREATE TABLE IF NOT EXISTS usage_submissions (
    id TEXT PRIMARY KEY,
    respondent TEXT NOT NULL,
    group_label TEXT NOT NULL,
    voltage INTEGER NOT NULL,
    voltage_tier_key TEXT NOT NULL,
    electronics_json TEXT NOT NULL,
    total_wh REAL NOT NULL,
    total_kwh REAL NOT NULL,
    tariff_rate REAL NOT NULL,
    daily_cost REAL NOT NULL,
    monthly_cost REAL NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_usage_submissions_created_at_desc
ON usage_submissions (created_at DESC);
"#,
)];

const SELECT_COLUMNS: &str = "id, respondent, group_label, voltage, voltage_tier_key, electronics_json, total_wh, total_kwh, tariff_rate, daily_cost, monthly_cost, created_at";

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database operation failed: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to encode appliance entries: {0}")]
    EncodeEntries(#[from] serde_json::Error),
    #[error("unsupported schema version {current}; latest supported is {latest}")]
    UnsupportedSchemaVersion { current: u32, latest: u32 },
}

/// Stored shape of one appliance, matching the survey's `electronics` column.
#[derive(Debug, Serialize, Deserialize)]
struct StoredElectronic {
    #[serde(rename = "type")]
    label: String,
    power: f64,
    time: f64,
}

pub fn open_connection(path: &str) -> Result<Connection, DbError> {
    Connection::open(path).map_err(DbError::from)
}

pub fn run_migrations(connection: &mut Connection) -> Result<(), DbError> {
    let current_version = schema_version(connection)?;

    if current_version > LATEST_SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            current: current_version,
            latest: LATEST_SCHEMA_VERSION,
        });
    }

    let transaction = connection.transaction()?;

    for (version, sql) in MIGRATIONS {
        if *version > current_version {
            transaction.execute_batch(sql)?;
            transaction.pragma_update(None, "user_version", version)?;
        }
    }

    transaction.commit()?;

    Ok(())
}

pub fn schema_version(connection: &Connection) -> Result<u32, DbError> {
    let version = connection.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

pub fn insert_submission(
    connection: &Connection,
    submission: &NewUsageSubmission,
) -> Result<String, DbError> {
    let id = uuid::Uuid::new_v4().to_string();
    let electronics_json = encode_entries(&submission.record.entries)?;
    let record = &submission.record;
    let result = &submission.result;

    connection.execute(
        "INSERT INTO usage_submissions (id, respondent, group_label, voltage, voltage_tier_key, electronics_json, total_wh, total_kwh, tariff_rate, daily_cost, monthly_cost, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            id,
            record.respondent,
            record.group_label,
            record.voltage,
            record.voltage_tier_key,
            electronics_json,
            result.total_watt_hours,
            result.total_kilowatt_hours,
            result.tariff_rate,
            result.daily_cost,
            result.monthly_cost,
            submission.created_at,
        ],
    )?;

    Ok(id)
}

pub fn get_submission(
    connection: &Connection,
    id: &str,
) -> Result<Option<UsageSubmission>, DbError> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM usage_submissions WHERE id = ?1");
    let submission = connection
        .query_row(&sql, params![id], map_submission_row)
        .optional()?;

    Ok(submission)
}

pub fn list_submissions(
    connection: &Connection,
    limit: u32,
    offset: u32,
) -> Result<Vec<UsageSubmission>, DbError> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS}
         FROM usage_submissions
         ORDER BY created_at DESC, rowid DESC
         LIMIT ?1 OFFSET ?2"
    );
    let mut statement = connection.prepare(&sql)?;

    let rows = statement.query_map(
        params![i64::from(limit), i64::from(offset)],
        map_submission_row,
    )?;

    let mut submissions = Vec::new();
    for row in rows {
        submissions.push(row?);
    }

    Ok(submissions)
}

pub fn count_submissions(connection: &Connection) -> Result<i64, DbError> {
    let count = connection.query_row("SELECT COUNT(*) FROM usage_submissions", [], |row| {
        row.get(0)
    })?;
    Ok(count)
}

fn encode_entries(entries: &[ApplianceEntry]) -> Result<String, DbError> {
    let stored: Vec<StoredElectronic> = entries
        .iter()
        .map(|entry| StoredElectronic {
            label: entry.label.clone(),
            power: entry.power_watts,
            time: entry.hours_used,
        })
        .collect();

    serde_json::to_string(&stored).map_err(DbError::from)
}

fn map_submission_row(row: &Row<'_>) -> rusqlite::Result<UsageSubmission> {
    let electronics_json: String = row.get(5)?;
    let stored: Vec<StoredElectronic> = serde_json::from_str(&electronics_json)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(error)))?;

    Ok(UsageSubmission {
        id: row.get(0)?,
        respondent: row.get(1)?,
        group_label: row.get(2)?,
        voltage: row.get(3)?,
        voltage_tier_key: row.get(4)?,
        entries: stored
            .into_iter()
            .map(|item| ApplianceEntry {
                label: item.label,
                power_watts: item.power,
                hours_used: item.time,
            })
            .collect(),
        result: CalculationResult {
            total_watt_hours: row.get(6)?,
            total_kilowatt_hours: row.get(7)?,
            tariff_rate: row.get(8)?,
            daily_cost: row.get(9)?,
            monthly_cost: row.get(10)?,
        },
        created_at: row.get(11)?,
    })
}
