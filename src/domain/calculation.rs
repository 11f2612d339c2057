use thiserror::Error;

use crate::domain::catalog::TariffTable;
use crate::domain::models::{ApplianceEntry, CalculationResult};

pub const WATT_HOURS_PER_KILOWATT_HOUR: f64 = 1000.0;
pub const DAYS_PER_MONTH: f64 = 30.0;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("voltage tier `{0}` is not present in the tariff table")]
    UnknownVoltageTier(String),
}

pub fn total_watt_hours(entries: &[ApplianceEntry]) -> f64 {
    entries.iter().map(ApplianceEntry::watt_hours).sum()
}

/// Daily and monthly cost for validated entries. No rounding is applied.
pub fn calculate(
    entries: &[ApplianceEntry],
    voltage_tier_key: &str,
    tariffs: &TariffTable,
) -> Result<CalculationResult, ConfigurationError> {
    let tariff_rate = tariffs
        .rate(voltage_tier_key)
        .ok_or_else(|| ConfigurationError::UnknownVoltageTier(voltage_tier_key.to_string()))?;

    let total_watt_hours = total_watt_hours(entries);
    let daily_cost = (total_watt_hours * tariff_rate) / WATT_HOURS_PER_KILOWATT_HOUR;

    Ok(CalculationResult {
        total_watt_hours,
        total_kilowatt_hours: total_watt_hours / WATT_HOURS_PER_KILOWATT_HOUR,
        tariff_rate,
        daily_cost,
        monthly_cost: daily_cost * DAYS_PER_MONTH,
    })
}
