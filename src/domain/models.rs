use serde::{Deserialize, Serialize};

/// Appliance row as it arrives from the input surface. Numbers may be absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawApplianceEntry {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub power_watts: Option<f64>,
    #[serde(default)]
    pub hours_used: Option<f64>,
}

impl RawApplianceEntry {
    pub fn new(label: &str, power_watts: f64, hours_used: f64) -> Self {
        Self {
            label: label.to_string(),
            power_watts: Some(power_watts),
            hours_used: Some(hours_used),
        }
    }

    pub fn power_or_zero(&self) -> f64 {
        self.power_watts.unwrap_or(0.0)
    }

    pub fn hours_or_zero(&self) -> f64 {
        self.hours_used.unwrap_or(0.0)
    }
}

/// Candidate usage record before validation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    #[serde(default)]
    pub respondent: String,
    #[serde(default)]
    pub group_label: String,
    #[serde(default)]
    pub voltage_tier_key: String,
    #[serde(default)]
    pub entries: Vec<RawApplianceEntry>,
}

/// A complete appliance entry. Only the validator produces these from raw input.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplianceEntry {
    pub label: String,
    pub power_watts: f64,
    pub hours_used: f64,
}

impl ApplianceEntry {
    pub fn watt_hours(&self) -> f64 {
        self.power_watts * self.hours_used
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedRecord {
    pub respondent: String,
    pub group_label: String,
    pub voltage_tier_key: String,
    /// VA rating of the tier, stored alongside the key.
    pub voltage: u32,
    pub entries: Vec<ApplianceEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    pub total_watt_hours: f64,
    pub total_kilowatt_hours: f64,
    pub tariff_rate: f64,
    pub daily_cost: f64,
    pub monthly_cost: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUsageSubmission {
    pub record: ValidatedRecord,
    pub result: CalculationResult,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UsageSubmission {
    pub id: String,
    pub respondent: String,
    pub group_label: String,
    pub voltage: u32,
    pub voltage_tier_key: String,
    pub entries: Vec<ApplianceEntry>,
    pub result: CalculationResult,
    pub created_at: String,
}
