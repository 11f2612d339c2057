use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MAX_ENTRIES: usize = 10;

const DEFAULT_GROUP_LABELS: &[&str] = &["10A", "10B", "11A", "11B", "12A", "12B"];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid tariff table JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("{0} contains a blank value")]
    BlankValue(&'static str),
    #[error("duplicate voltage tier key `{0}`")]
    DuplicateTierKey(String),
    #[error("voltage tier `{key}` has invalid rate {rate}")]
    InvalidRate { key: String, rate: f64 },
    #[error("unknown duration set `{0}`; expected `hourly` or `half-hour`")]
    UnknownDurationSet(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DurationSet {
    /// Whole hours 1..=24.
    Hourly,
    /// Thirty minutes followed by whole hours 1..=24.
    #[default]
    HalfHour,
}

impl FromStr for DurationSet {
    type Err = CatalogError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hourly" => Ok(Self::Hourly),
            "half-hour" | "half_hour" => Ok(Self::HalfHour),
            other => Err(CatalogError::UnknownDurationSet(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationOption {
    pub value: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DurationCatalog {
    set: DurationSet,
    options: Vec<DurationOption>,
}

impl DurationCatalog {
    pub fn new(set: DurationSet) -> Self {
        let mut options = Vec::with_capacity(25);

        if set == DurationSet::HalfHour {
            options.push(DurationOption {
                value: 0.5,
                label: "30 Menit".to_string(),
            });
        }

        options.extend((1..=24).map(|hours| DurationOption {
            value: f64::from(hours),
            label: format!("{hours} Jam"),
        }));

        Self { set, options }
    }

    pub fn set(&self) -> DurationSet {
        self.set
    }

    pub fn options(&self) -> &[DurationOption] {
        &self.options
    }

    pub fn contains(&self, hours: f64) -> bool {
        self.options.iter().any(|option| option.value == hours)
    }
}

impl Default for DurationCatalog {
    fn default() -> Self {
        Self::new(DurationSet::default())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoltageTier {
    pub key: String,
    pub label: String,
    /// VA rating persisted with each submission.
    pub voltage: u32,
    /// Currency units per kWh.
    pub rate: f64,
}

impl VoltageTier {
    fn new(key: &str, label: &str, voltage: u32, rate: f64) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            voltage,
            rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TariffTable {
    tiers: Vec<VoltageTier>,
}

impl TariffTable {
    pub fn new(tiers: Vec<VoltageTier>) -> Result<Self, CatalogError> {
        if tiers.is_empty() {
            return Err(CatalogError::Empty("tariff table"));
        }

        for (index, tier) in tiers.iter().enumerate() {
            if tier.key.trim().is_empty() {
                return Err(CatalogError::BlankValue("tariff table"));
            }
            if !tier.rate.is_finite() || tier.rate < 0.0 {
                return Err(CatalogError::InvalidRate {
                    key: tier.key.clone(),
                    rate: tier.rate,
                });
            }
            if tiers[..index].iter().any(|other| other.key == tier.key) {
                return Err(CatalogError::DuplicateTierKey(tier.key.clone()));
            }
        }

        Ok(Self { tiers })
    }

    /// Parses a JSON array of `{key, label, voltage, rate}` objects.
    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let tiers: Vec<VoltageTier> = serde_json::from_str(raw)?;
        Self::new(tiers)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn tiers(&self) -> &[VoltageTier] {
        &self.tiers
    }

    pub fn tier(&self, key: &str) -> Option<&VoltageTier> {
        self.tiers.iter().find(|tier| tier.key == key)
    }

    pub fn rate(&self, key: &str) -> Option<f64> {
        self.tier(key).map(|tier| tier.rate)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.tier(key).is_some()
    }
}

impl Default for TariffTable {
    fn default() -> Self {
        Self {
            tiers: vec![
                VoltageTier::new("900", "900 VA (Subsidi)", 900, 1352.0),
                VoltageTier::new("900-non-subsidized", "900 VA (Non-Subsidi)", 900, 1444.7),
                VoltageTier::new("1300", "1300 VA", 1300, 1444.7),
                VoltageTier::new("3500", "3500 VA", 3500, 1699.53),
                VoltageTier::new("6600", "6600 VA", 6600, 1699.53),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupCatalog {
    labels: Vec<String>,
}

impl GroupCatalog {
    pub fn new<I, S>(labels: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut collected: Vec<String> = Vec::new();
        for label in labels {
            let label = label.as_ref().trim();
            if label.is_empty() {
                return Err(CatalogError::BlankValue("group catalog"));
            }
            if !collected.iter().any(|existing| existing == label) {
                collected.push(label.to_string());
            }
        }

        if collected.is_empty() {
            return Err(CatalogError::Empty("group catalog"));
        }

        Ok(Self { labels: collected })
    }

    /// Parses a comma separated list such as `10A,10B,11A`.
    pub fn parse_list(raw: &str) -> Result<Self, CatalogError> {
        Self::new(raw.split(',').filter(|part| !part.trim().is_empty()))
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|known| known == label)
    }
}

impl Default for GroupCatalog {
    fn default() -> Self {
        Self {
            labels: DEFAULT_GROUP_LABELS
                .iter()
                .map(|label| label.to_string())
                .collect(),
        }
    }
}

/// Injected configuration the validator and calculator run against.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageRules {
    pub durations: DurationCatalog,
    pub tariffs: TariffTable,
    pub groups: GroupCatalog,
    pub max_entries: usize,
}

impl Default for UsageRules {
    fn default() -> Self {
        Self {
            durations: DurationCatalog::default(),
            tariffs: TariffTable::default(),
            groups: GroupCatalog::default(),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}
