use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use energy_usage::adapters::db::{open_connection, run_migrations, schema_version};
use energy_usage::app::services::{SqliteUsageService, UsageQueryHandler, submit_usage};
use energy_usage::domain::catalog::UsageRules;
use energy_usage::domain::models::{RawApplianceEntry, UsageRecord};

const DEFAULT_PATH: &str = "./data/usage_test.db";

struct Options {
    path: String,
    force: bool,
    seed: bool,
}

fn main() {
    if let Err(error) = run() {
        eprintln!("failed to create test db: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let Some(options) = parse_args(std::env::args().skip(1).collect())? else {
        print_help();
        return Ok(());
    };

    let path = Path::new(&options.path);
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .map_err(|error| format!("failed to create parent directory: {error}"))?;
    }

    if options.force && path.exists() {
        std::fs::remove_file(path)
            .map_err(|error| format!("failed to remove existing db file: {error}"))?;
    }

    let mut connection = open_connection(&options.path).map_err(|error| error.to_string())?;
    run_migrations(&mut connection).map_err(|error| error.to_string())?;
    let version = schema_version(&connection).map_err(|error| error.to_string())?;

    let service = SqliteUsageService::new(Arc::new(Mutex::new(connection)));
    if options.seed {
        seed(&service)?;
    }

    let stored = service
        .count_submissions()
        .map_err(|error| error.to_string())?;

    println!("created/updated test db at: {}", options.path);
    println!("schema version: {version}");
    println!("stored submissions: {stored}");
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<Option<Options>, String> {
    let mut options = Options {
        path: DEFAULT_PATH.to_string(),
        force: false,
        seed: false,
    };

    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--path" => {
                let Some(value) = args.get(index + 1) else {
                    return Err("--path requires a value".to_string());
                };
                options.path = value.clone();
                index += 2;
            }
            "--force" => {
                options.force = true;
                index += 1;
            }
            "--seed" => {
                options.seed = true;
                index += 1;
            }
            "--help" | "-h" => return Ok(None),
            other => return Err(format!("unknown argument: {other}")),
        }
    }

    Ok(Some(options))
}

fn seed(service: &SqliteUsageService) -> Result<(), String> {
    let rules = UsageRules::default();
    let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let samples = [
        ("Budi", "10A", "900", vec![RawApplianceEntry::new("TV", 100.0, 5.0)]),
        (
            "Siti",
            "11B",
            "3500",
            vec![
                RawApplianceEntry::new("Kipas", 50.0, 2.0),
                RawApplianceEntry::new("Pompa air", 200.0, 1.0),
            ],
        ),
    ];

    for (respondent, group_label, tier, entries) in samples {
        let record = UsageRecord {
            respondent: respondent.to_string(),
            group_label: group_label.to_string(),
            voltage_tier_key: tier.to_string(),
            entries,
        };
        submit_usage(service, &record, &rules, &created_at).map_err(|error| error.to_string())?;
    }

    Ok(())
}

fn print_help() {
    println!("create_test_db");
    println!();
    println!("Usage:");
    println!("  cargo run --bin create_test_db -- [--path <file>] [--force] [--seed]");
    println!();
    println!("Options:");
    println!("  --path <file>   target sqlite file (default: {DEFAULT_PATH})");
    println!("  --force         delete existing file before creating");
    println!("  --seed          insert two sample submissions");
}
