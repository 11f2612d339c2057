use std::sync::Arc;

use actix_web::{HttpResponse, Responder, get, post, web};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::app::services::{
    Estimate, ServiceError, SqliteUsageService, StoredEstimate, SubmissionError,
    UsageQueryHandler, estimate_usage, submit_usage,
};
use crate::domain::catalog::{DurationOption, DurationSet, UsageRules, VoltageTier};
use crate::domain::models::{
    ApplianceEntry, CalculationResult, UsageRecord, UsageSubmission, ValidatedRecord,
};
use crate::domain::validation::{ValidationError, collect_violations};

#[derive(Clone)]
pub struct ApiState {
    pub usage: SqliteUsageService,
    pub rules: Arc<UsageRules>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogResponse<'a> {
    pub duration_set: DurationSet,
    pub durations: &'a [DurationOption],
    pub voltage_tiers: &'a [VoltageTier],
    pub group_labels: &'a [String],
    pub max_entries: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateResponse {
    #[serde(flatten)]
    pub record: ValidatedRecord,
    pub result: CalculationResult,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub id: String,
    pub respondent: String,
    pub group_label: String,
    pub voltage: u32,
    pub voltage_tier_key: String,
    pub entries: Vec<ApplianceEntry>,
    pub result: CalculationResult,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationResponse {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    pub constraint: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationErrorResponse {
    pub error: String,
    #[serde(flatten)]
    pub first: ViolationResponse,
    pub violations: Vec<ViolationResponse>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(get_catalog_endpoint)
        .service(estimate_usage_endpoint)
        .service(submit_usage_endpoint)
        .service(list_submissions_endpoint)
        .service(get_submission_endpoint);
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

#[get("/catalog")]
async fn get_catalog_endpoint(state: web::Data<ApiState>) -> impl Responder {
    let rules = &state.rules;
    HttpResponse::Ok().json(CatalogResponse {
        duration_set: rules.durations.set(),
        durations: rules.durations.options(),
        voltage_tiers: rules.tariffs.tiers(),
        group_labels: rules.groups.labels(),
        max_entries: rules.max_entries,
    })
}

#[post("/usage/estimate")]
async fn estimate_usage_endpoint(
    state: web::Data<ApiState>,
    body: web::Json<UsageRecord>,
) -> impl Responder {
    match estimate_usage(&body, &state.rules) {
        Ok(Estimate { record, result }) => {
            HttpResponse::Ok().json(EstimateResponse { record, result })
        }
        Err(error) => submission_error_response(error, &body, &state.rules),
    }
}

#[post("/usage")]
async fn submit_usage_endpoint(
    state: web::Data<ApiState>,
    body: web::Json<UsageRecord>,
) -> impl Responder {
    let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    match submit_usage(&state.usage, &body, &state.rules, &created_at) {
        Ok(stored) => HttpResponse::Created().json(stored_response(stored)),
        Err(error) => submission_error_response(error, &body, &state.rules),
    }
}

#[get("/usage")]
async fn list_submissions_endpoint(
    state: web::Data<ApiState>,
    query: web::Query<ListQuery>,
) -> impl Responder {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let offset = query.offset.unwrap_or(0);

    match state.usage.list_submissions(limit, offset) {
        Ok(submissions) => {
            let mapped: Vec<SubmissionResponse> =
                submissions.into_iter().map(submission_response).collect();
            HttpResponse::Ok().json(mapped)
        }
        Err(error) => service_error_response(error),
    }
}

#[get("/usage/{id}")]
async fn get_submission_endpoint(
    state: web::Data<ApiState>,
    path: web::Path<String>,
) -> impl Responder {
    match state.usage.get_submission(&path) {
        Ok(Some(submission)) => HttpResponse::Ok().json(submission_response(submission)),
        Ok(None) => HttpResponse::NotFound().json(serde_json::json!({
            "error": "submission not found"
        })),
        Err(error) => service_error_response(error),
    }
}

fn submission_response(submission: UsageSubmission) -> SubmissionResponse {
    SubmissionResponse {
        id: submission.id,
        respondent: submission.respondent,
        group_label: submission.group_label,
        voltage: submission.voltage,
        voltage_tier_key: submission.voltage_tier_key,
        entries: submission.entries,
        result: submission.result,
        created_at: submission.created_at,
    }
}

fn stored_response(stored: StoredEstimate) -> SubmissionResponse {
    let record = stored.estimate.record;
    SubmissionResponse {
        id: stored.id,
        respondent: record.respondent,
        group_label: record.group_label,
        voltage: record.voltage,
        voltage_tier_key: record.voltage_tier_key,
        entries: record.entries,
        result: stored.estimate.result,
        created_at: stored.created_at,
    }
}

fn violation_response(error: &ValidationError) -> ViolationResponse {
    match error {
        ValidationError::Field { index, constraint } => ViolationResponse {
            kind: "field",
            message: error.to_string(),
            entry_index: Some(*index),
            field: Some(constraint.field()),
            constraint: constraint.code(),
        },
        ValidationError::Record(constraint) => ViolationResponse {
            kind: "record",
            message: error.to_string(),
            entry_index: None,
            field: None,
            constraint: constraint.code(),
        },
    }
}

fn submission_error_response(
    error: SubmissionError,
    record: &UsageRecord,
    rules: &UsageRules,
) -> HttpResponse {
    match error {
        SubmissionError::Validation(first) => {
            tracing::debug!(error = %first, "usage record rejected");
            HttpResponse::UnprocessableEntity().json(ValidationErrorResponse {
                error: first.to_string(),
                first: violation_response(&first),
                violations: collect_violations(record, rules)
                    .iter()
                    .map(violation_response)
                    .collect(),
            })
        }
        SubmissionError::Configuration(error) => {
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("tariff configuration error: {error}")
            }))
        }
        SubmissionError::Storage { source, .. } => {
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "error": "could not save submission, please retry",
                "detail": source.to_string()
            }))
        }
    }
}

fn service_error_response(error: ServiceError) -> HttpResponse {
    match error {
        ServiceError::DbLockPoisoned => {
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "database lock poisoned"
            }))
        }
        ServiceError::Database(error) => {
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("database query failed: {error}")
            }))
        }
    }
}
