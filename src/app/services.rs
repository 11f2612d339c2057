use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use thiserror::Error;

use crate::adapters::db;
use crate::adapters::db::DbError;
use crate::domain::calculation::{ConfigurationError, calculate};
use crate::domain::catalog::UsageRules;
use crate::domain::models::{
    CalculationResult, NewUsageSubmission, UsageRecord, UsageSubmission, ValidatedRecord,
};
use crate::domain::validation::{ValidationError, validate_record};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("database lock poisoned")]
    DbLockPoisoned,
    #[error("database operation failed: {0}")]
    Database(#[from] DbError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionErrorKind {
    FieldValidation,
    RecordValidation,
    Configuration,
    Storage,
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("could not save submission: {source}")]
    Storage {
        /// Returned intact so the whole submission can be retried.
        record: Box<ValidatedRecord>,
        #[source]
        source: ServiceError,
    },
}

impl SubmissionError {
    pub fn kind(&self) -> SubmissionErrorKind {
        match self {
            Self::Validation(ValidationError::Field { .. }) => SubmissionErrorKind::FieldValidation,
            Self::Validation(ValidationError::Record(_)) => SubmissionErrorKind::RecordValidation,
            Self::Configuration(_) => SubmissionErrorKind::Configuration,
            Self::Storage { .. } => SubmissionErrorKind::Storage,
        }
    }
}

/// Persistence collaborator for accepted submissions.
pub trait UsageSink {
    fn store_submission(&self, submission: &NewUsageSubmission) -> Result<String, ServiceError>;
}

pub trait UsageQueryHandler {
    fn get_submission(&self, id: &str) -> Result<Option<UsageSubmission>, ServiceError>;
    fn list_submissions(&self, limit: u32, offset: u32)
    -> Result<Vec<UsageSubmission>, ServiceError>;
    fn count_submissions(&self) -> Result<i64, ServiceError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub record: ValidatedRecord,
    pub result: CalculationResult,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredEstimate {
    pub id: String,
    pub created_at: String,
    pub estimate: Estimate,
}

pub fn estimate_usage(record: &UsageRecord, rules: &UsageRules) -> Result<Estimate, SubmissionError> {
    let validated = validate_record(record, rules)?;

    let result = calculate(
        &validated.entries,
        &validated.voltage_tier_key,
        &rules.tariffs,
    )
    .inspect_err(|error| {
        tracing::error!(error = %error, "tariff lookup failed after validation");
    })?;

    Ok(Estimate {
        record: validated,
        result,
    })
}

pub fn submit_usage<S>(
    sink: &S,
    record: &UsageRecord,
    rules: &UsageRules,
    created_at: &str,
) -> Result<StoredEstimate, SubmissionError>
where
    S: UsageSink + ?Sized,
{
    let estimate = estimate_usage(record, rules)?;
    let submission = NewUsageSubmission {
        record: estimate.record,
        result: estimate.result,
        created_at: created_at.to_string(),
    };

    let id = match sink.store_submission(&submission) {
        Ok(id) => id,
        Err(source) => {
            tracing::warn!(
                error = %source,
                group_label = %submission.record.group_label,
                "usage submission could not be stored"
            );
            return Err(SubmissionError::Storage {
                record: Box::new(submission.record),
                source,
            });
        }
    };

    tracing::info!(
        submission_id = %id,
        group_label = %submission.record.group_label,
        voltage_tier = %submission.record.voltage_tier_key,
        entries = submission.record.entries.len(),
        kwh = submission.result.total_kilowatt_hours,
        "usage submission stored"
    );

    Ok(StoredEstimate {
        id,
        created_at: submission.created_at,
        estimate: Estimate {
            record: submission.record,
            result: submission.result,
        },
    })
}

#[derive(Clone)]
pub struct SqliteUsageService {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteUsageService {
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    fn with_connection<T>(
        &self,
        op: impl FnOnce(&Connection) -> Result<T, DbError>,
    ) -> Result<T, ServiceError> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| ServiceError::DbLockPoisoned)?;
        op(&connection).map_err(ServiceError::from)
    }
}

impl UsageSink for SqliteUsageService {
    fn store_submission(&self, submission: &NewUsageSubmission) -> Result<String, ServiceError> {
        self.with_connection(|connection| db::insert_submission(connection, submission))
    }
}

impl UsageQueryHandler for SqliteUsageService {
    fn get_submission(&self, id: &str) -> Result<Option<UsageSubmission>, ServiceError> {
        self.with_connection(|connection| db::get_submission(connection, id))
    }

    fn list_submissions(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<UsageSubmission>, ServiceError> {
        self.with_connection(|connection| db::list_submissions(connection, limit, offset))
    }

    fn count_submissions(&self) -> Result<i64, ServiceError> {
        self.with_connection(db::count_submissions)
    }
}
