use std::fmt;

use thiserror::Error;

use crate::domain::catalog::{DurationCatalog, UsageRules};
use crate::domain::models::{ApplianceEntry, RawApplianceEntry, UsageRecord, ValidatedRecord};

/// Upper bound for a single appliance. Keeps every Wh sum finite.
pub const MAX_APPLIANCE_WATTS: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldConstraint {
    MissingLabel,
    NonPositivePower,
    PowerOutOfRange,
    InvalidDuration,
}

impl FieldConstraint {
    pub fn field(self) -> &'static str {
        match self {
            Self::MissingLabel => "label",
            Self::NonPositivePower | Self::PowerOutOfRange => "power",
            Self::InvalidDuration => "duration",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::MissingLabel => "missing_label",
            Self::NonPositivePower => "non_positive_power",
            Self::PowerOutOfRange => "power_out_of_range",
            Self::InvalidDuration => "invalid_duration",
        }
    }
}

impl fmt::Display for FieldConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingLabel => f.write_str("appliance label is required"),
            Self::NonPositivePower => f.write_str("power must be greater than zero"),
            Self::PowerOutOfRange => {
                write!(f, "power must not exceed {MAX_APPLIANCE_WATTS} W")
            }
            Self::InvalidDuration => f.write_str("usage duration is missing or not an allowed option"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordConstraint {
    TooManyEntries { max: usize, actual: usize },
    MissingRespondent,
    MissingGroupLabel,
    UnknownGroupLabel(String),
    MissingVoltageTier,
    UnknownVoltageTier(String),
    NoCompleteEntry,
}

impl RecordConstraint {
    pub fn code(&self) -> &'static str {
        match self {
            Self::TooManyEntries { .. } => "too_many_entries",
            Self::MissingRespondent => "missing_respondent",
            Self::MissingGroupLabel => "missing_group_label",
            Self::UnknownGroupLabel(_) => "unknown_group_label",
            Self::MissingVoltageTier => "missing_voltage_tier",
            Self::UnknownVoltageTier(_) => "unknown_voltage_tier",
            Self::NoCompleteEntry => "no_complete_entry",
        }
    }
}

impl fmt::Display for RecordConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyEntries { max, actual } => {
                write!(f, "at most {max} appliance entries are allowed, got {actual}")
            }
            Self::MissingRespondent => f.write_str("respondent name is required"),
            Self::MissingGroupLabel => f.write_str("group label is required"),
            Self::UnknownGroupLabel(label) => write!(f, "unknown group label `{label}`"),
            Self::MissingVoltageTier => f.write_str("voltage tier is required"),
            Self::UnknownVoltageTier(key) => write!(f, "unknown voltage tier `{key}`"),
            Self::NoCompleteEntry => f.write_str("no complete appliance entry present"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("entry {index}: {constraint}")]
    Field {
        /// 1-based position in the submitted entry list.
        index: usize,
        constraint: FieldConstraint,
    },
    #[error("{0}")]
    Record(RecordConstraint),
}

/// True when any field differs from its default. Any non-zero number counts,
/// so a negative or NaN power on an otherwise blank row is rejected as a
/// field error instead of being dropped as empty.
pub fn has_any_data(entry: &RawApplianceEntry) -> bool {
    !entry.label.trim().is_empty() || entry.power_or_zero() != 0.0 || entry.hours_or_zero() != 0.0
}

/// Classifies one entry: `Ok(None)` when empty, `Ok(Some(_))` when complete.
/// Constraints are checked label, then power, then duration.
pub fn check_entry(
    entry: &RawApplianceEntry,
    durations: &DurationCatalog,
) -> Result<Option<ApplianceEntry>, FieldConstraint> {
    if !has_any_data(entry) {
        return Ok(None);
    }

    let label = entry.label.trim();
    if label.is_empty() {
        return Err(FieldConstraint::MissingLabel);
    }

    let power_watts = entry.power_or_zero();
    if !power_watts.is_finite() || power_watts <= 0.0 {
        return Err(FieldConstraint::NonPositivePower);
    }
    if power_watts > MAX_APPLIANCE_WATTS {
        return Err(FieldConstraint::PowerOutOfRange);
    }

    let hours_used = entry.hours_or_zero();
    if !durations.contains(hours_used) {
        return Err(FieldConstraint::InvalidDuration);
    }

    Ok(Some(ApplianceEntry {
        label: label.to_string(),
        power_watts,
        hours_used,
    }))
}

/// Validates a record and returns the first violation found.
///
/// Order: entry count, per-entry fields in index order, presence of a complete
/// entry, respondent, group label, voltage tier.
pub fn validate_record(
    record: &UsageRecord,
    rules: &UsageRules,
) -> Result<ValidatedRecord, ValidationError> {
    let (entries, violations) = inspect(record, rules);

    if let Some(first) = violations.into_iter().next() {
        return Err(first);
    }

    let voltage_tier_key = record.voltage_tier_key.trim();
    let tier = rules.tariffs.tier(voltage_tier_key).ok_or_else(|| {
        ValidationError::Record(RecordConstraint::UnknownVoltageTier(
            voltage_tier_key.to_string(),
        ))
    })?;

    Ok(ValidatedRecord {
        respondent: record.respondent.trim().to_string(),
        group_label: record.group_label.trim().to_string(),
        voltage_tier_key: tier.key.clone(),
        voltage: tier.voltage,
        entries,
    })
}

/// Every violation in the same order `validate_record` checks them, at most
/// one per entry.
pub fn collect_violations(record: &UsageRecord, rules: &UsageRules) -> Vec<ValidationError> {
    inspect(record, rules).1
}

fn inspect(record: &UsageRecord, rules: &UsageRules) -> (Vec<ApplianceEntry>, Vec<ValidationError>) {
    let mut violations = Vec::new();
    let mut complete = Vec::with_capacity(record.entries.len());

    if record.entries.len() > rules.max_entries {
        violations.push(ValidationError::Record(RecordConstraint::TooManyEntries {
            max: rules.max_entries,
            actual: record.entries.len(),
        }));
    }

    for (position, entry) in record.entries.iter().enumerate() {
        match check_entry(entry, &rules.durations) {
            Ok(Some(entry)) => complete.push(entry),
            Ok(None) => {}
            Err(constraint) => violations.push(ValidationError::Field {
                index: position + 1,
                constraint,
            }),
        }
    }

    if complete.is_empty() {
        violations.push(ValidationError::Record(RecordConstraint::NoCompleteEntry));
    }

    if record.respondent.trim().is_empty() {
        violations.push(ValidationError::Record(RecordConstraint::MissingRespondent));
    }

    let group_label = record.group_label.trim();
    if group_label.is_empty() {
        violations.push(ValidationError::Record(RecordConstraint::MissingGroupLabel));
    } else if !rules.groups.contains(group_label) {
        violations.push(ValidationError::Record(RecordConstraint::UnknownGroupLabel(
            group_label.to_string(),
        )));
    }

    let voltage_tier_key = record.voltage_tier_key.trim();
    if voltage_tier_key.is_empty() {
        violations.push(ValidationError::Record(RecordConstraint::MissingVoltageTier));
    } else if !rules.tariffs.contains(voltage_tier_key) {
        violations.push(ValidationError::Record(RecordConstraint::UnknownVoltageTier(
            voltage_tier_key.to_string(),
        )));
    }

    (complete, violations)
}

#[cfg(test)]
mod tests {
    use crate::domain::catalog::{DurationCatalog, DurationSet, UsageRules};
    use crate::domain::models::{RawApplianceEntry, UsageRecord};

    use super::{
        FieldConstraint, MAX_APPLIANCE_WATTS, RecordConstraint, ValidationError, check_entry,
        collect_violations, has_any_data, validate_record,
    };

    fn record(entries: Vec<RawApplianceEntry>) -> UsageRecord {
        UsageRecord {
            respondent: "Budi".to_string(),
            group_label: "10A".to_string(),
            voltage_tier_key: "900".to_string(),
            entries,
        }
    }

    fn empty_entry() -> RawApplianceEntry {
        RawApplianceEntry::default()
    }

    #[test]
    fn zero_valued_entry_has_no_data() {
        let zeroed = RawApplianceEntry {
            label: "   ".to_string(),
            power_watts: Some(0.0),
            hours_used: Some(0.0),
        };

        assert!(!has_any_data(&empty_entry()));
        assert!(!has_any_data(&zeroed));
        assert!(has_any_data(&RawApplianceEntry {
            hours_used: Some(2.0),
            ..RawApplianceEntry::default()
        }));
    }

    #[test]
    fn drops_empty_entries_and_keeps_order() {
        let input = record(vec![
            empty_entry(),
            RawApplianceEntry::new(" TV ", 100.0, 5.0),
            empty_entry(),
            RawApplianceEntry::new("Kulkas", 150.0, 24.0),
        ]);

        let validated = validate_record(&input, &UsageRules::default()).expect("record is valid");

        let labels: Vec<&str> = validated
            .entries
            .iter()
            .map(|entry| entry.label.as_str())
            .collect();
        assert_eq!(labels, vec!["TV", "Kulkas"]);
        assert_eq!(validated.voltage, 900);
        assert_eq!(validated.voltage_tier_key, "900");
    }

    #[test]
    fn trims_respondent_and_group_label() {
        let mut input = record(vec![RawApplianceEntry::new("TV", 100.0, 5.0)]);
        input.respondent = "  Siti ".to_string();
        input.group_label = " 11B ".to_string();

        let validated = validate_record(&input, &UsageRules::default()).expect("record is valid");

        assert_eq!(validated.respondent, "Siti");
        assert_eq!(validated.group_label, "11B");
    }

    #[test]
    fn reports_each_missing_field_with_its_index() {
        let cases = [
            (
                RawApplianceEntry {
                    label: String::new(),
                    power_watts: Some(60.0),
                    hours_used: Some(2.0),
                },
                FieldConstraint::MissingLabel,
            ),
            (
                RawApplianceEntry {
                    label: "Lampu".to_string(),
                    power_watts: None,
                    hours_used: Some(2.0),
                },
                FieldConstraint::NonPositivePower,
            ),
            (
                RawApplianceEntry {
                    label: "Lampu".to_string(),
                    power_watts: Some(60.0),
                    hours_used: None,
                },
                FieldConstraint::InvalidDuration,
            ),
        ];

        for (entry, expected) in cases {
            let input = record(vec![RawApplianceEntry::new("TV", 100.0, 5.0), entry]);

            let result = validate_record(&input, &UsageRules::default());

            assert_eq!(
                result,
                Err(ValidationError::Field {
                    index: 2,
                    constraint: expected,
                })
            );
        }
    }

    #[test]
    fn rejects_second_entry_without_duration() {
        let input = record(vec![
            RawApplianceEntry::new("TV", 100.0, 5.0),
            RawApplianceEntry {
                label: "Kipas".to_string(),
                power_watts: Some(45.0),
                hours_used: None,
            },
        ]);

        let error = validate_record(&input, &UsageRules::default()).expect_err("must fail");

        assert_eq!(
            error,
            ValidationError::Field {
                index: 2,
                constraint: FieldConstraint::InvalidDuration,
            }
        );
        assert_eq!(
            error.to_string(),
            "entry 2: usage duration is missing or not an allowed option"
        );
    }

    #[test]
    fn label_is_checked_before_power_and_duration() {
        let entry = RawApplianceEntry {
            label: " ".to_string(),
            power_watts: Some(-3.0),
            hours_used: Some(7.5),
        };

        assert_eq!(
            check_entry(&entry, &DurationCatalog::default()),
            Err(FieldConstraint::MissingLabel)
        );
    }

    #[test]
    fn rejects_negative_and_non_finite_power() {
        let durations = DurationCatalog::default();

        for power in [-10.0, f64::NAN, f64::INFINITY] {
            let entry = RawApplianceEntry::new("Setrika", power, 1.0);
            assert_eq!(
                check_entry(&entry, &durations),
                Err(FieldConstraint::NonPositivePower)
            );
        }
    }

    #[test]
    fn blank_row_with_negative_power_is_not_dropped() {
        let input = record(vec![
            RawApplianceEntry::new("TV", 100.0, 5.0),
            RawApplianceEntry {
                label: String::new(),
                power_watts: Some(-5.0),
                hours_used: Some(0.0),
            },
        ]);

        assert_eq!(
            validate_record(&input, &UsageRules::default()),
            Err(ValidationError::Field {
                index: 2,
                constraint: FieldConstraint::MissingLabel,
            })
        );
    }

    #[test]
    fn rejects_power_that_would_overflow_totals() {
        let durations = DurationCatalog::default();

        assert_eq!(
            check_entry(&RawApplianceEntry::new("Smelter", 1e308, 24.0), &durations),
            Err(FieldConstraint::PowerOutOfRange)
        );
        assert!(
            check_entry(
                &RawApplianceEntry::new("Heater", MAX_APPLIANCE_WATTS, 24.0),
                &durations
            )
            .is_ok()
        );

        let input = record(vec![RawApplianceEntry::new("Smelter", 1e308, 24.0)]);
        let error = validate_record(&input, &UsageRules::default()).expect_err("must fail");
        assert_eq!(
            error,
            ValidationError::Field {
                index: 1,
                constraint: FieldConstraint::PowerOutOfRange,
            }
        );
    }

    #[test]
    fn duration_must_come_from_configured_set() {
        let entry = RawApplianceEntry::new("Rice cooker", 300.0, 0.5);

        assert!(check_entry(&entry, &DurationCatalog::new(DurationSet::HalfHour)).is_ok());
        assert_eq!(
            check_entry(&entry, &DurationCatalog::new(DurationSet::Hourly)),
            Err(FieldConstraint::InvalidDuration)
        );
        assert_eq!(
            check_entry(
                &RawApplianceEntry::new("Rice cooker", 300.0, 1.25),
                &DurationCatalog::default()
            ),
            Err(FieldConstraint::InvalidDuration)
        );
    }

    #[test]
    fn all_empty_entries_fail_regardless_of_header() {
        let mut input = record(vec![empty_entry(), empty_entry()]);
        input.respondent = String::new();
        input.group_label = String::new();
        input.voltage_tier_key = "nope".to_string();

        let result = validate_record(&input, &UsageRules::default());

        assert_eq!(
            result,
            Err(ValidationError::Record(RecordConstraint::NoCompleteEntry))
        );
    }

    #[test]
    fn zero_length_entry_list_is_no_complete_entry() {
        let result = validate_record(&record(Vec::new()), &UsageRules::default());

        assert_eq!(
            result,
            Err(ValidationError::Record(RecordConstraint::NoCompleteEntry))
        );
    }

    #[test]
    fn rejects_missing_or_unknown_header_fields() {
        let rules = UsageRules::default();
        let entries = vec![RawApplianceEntry::new("TV", 100.0, 5.0)];

        let mut missing_name = record(entries.clone());
        missing_name.respondent = "  ".to_string();
        assert_eq!(
            validate_record(&missing_name, &rules),
            Err(ValidationError::Record(RecordConstraint::MissingRespondent))
        );

        let mut unknown_group = record(entries.clone());
        unknown_group.group_label = "13C".to_string();
        assert_eq!(
            validate_record(&unknown_group, &rules),
            Err(ValidationError::Record(RecordConstraint::UnknownGroupLabel(
                "13C".to_string()
            )))
        );

        let mut missing_tier = record(entries.clone());
        missing_tier.voltage_tier_key = String::new();
        assert_eq!(
            validate_record(&missing_tier, &rules),
            Err(ValidationError::Record(RecordConstraint::MissingVoltageTier))
        );

        let mut unknown_tier = record(entries);
        unknown_tier.voltage_tier_key = "2200".to_string();
        assert_eq!(
            validate_record(&unknown_tier, &rules),
            Err(ValidationError::Record(RecordConstraint::UnknownVoltageTier(
                "2200".to_string()
            )))
        );
    }

    #[test]
    fn accepts_record_at_entry_cap_and_rejects_beyond() {
        let rules = UsageRules {
            max_entries: 3,
            ..UsageRules::default()
        };
        let at_cap = record(vec![RawApplianceEntry::new("TV", 100.0, 5.0); 3]);
        let over_cap = record(vec![RawApplianceEntry::new("TV", 100.0, 5.0); 4]);

        let validated = validate_record(&at_cap, &rules).expect("cap is inclusive");
        assert_eq!(validated.entries.len(), 3);

        assert_eq!(
            validate_record(&over_cap, &rules),
            Err(ValidationError::Record(RecordConstraint::TooManyEntries {
                max: 3,
                actual: 4,
            }))
        );
    }

    #[test]
    fn collects_every_violation_in_check_order() {
        let input = UsageRecord {
            respondent: String::new(),
            group_label: "10A".to_string(),
            voltage_tier_key: "9999".to_string(),
            entries: vec![
                RawApplianceEntry {
                    label: "Lampu".to_string(),
                    power_watts: Some(0.0),
                    hours_used: Some(3.0),
                },
                empty_entry(),
                RawApplianceEntry {
                    label: String::new(),
                    power_watts: Some(20.0),
                    hours_used: None,
                },
            ],
        };

        let violations = collect_violations(&input, &UsageRules::default());

        assert_eq!(
            violations,
            vec![
                ValidationError::Field {
                    index: 1,
                    constraint: FieldConstraint::NonPositivePower,
                },
                ValidationError::Field {
                    index: 3,
                    constraint: FieldConstraint::MissingLabel,
                },
                ValidationError::Record(RecordConstraint::NoCompleteEntry),
                ValidationError::Record(RecordConstraint::MissingRespondent),
                ValidationError::Record(RecordConstraint::UnknownVoltageTier("9999".to_string())),
            ]
        );
        assert_eq!(
            validate_record(&input, &UsageRules::default()).err(),
            violations.first().cloned()
        );
    }

    #[test]
    fn duplicate_labels_are_allowed() {
        let input = record(vec![
            RawApplianceEntry::new("Lampu", 10.0, 12.0),
            RawApplianceEntry::new("Lampu", 10.0, 12.0),
        ]);

        let validated = validate_record(&input, &UsageRules::default()).expect("record is valid");

        assert_eq!(validated.entries.len(), 2);
    }
}
