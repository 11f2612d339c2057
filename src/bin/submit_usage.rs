use energy_usage::app::AppConfig;
use energy_usage::app::services::{SubmissionErrorKind, estimate_usage};
use energy_usage::domain::models::UsageRecord;
use energy_usage::domain::validation::collect_violations;
use reqwest::StatusCode;
use serde_json::Value;

struct Options {
    file: String,
    api: Option<String>,
    dry_run: bool,
}

fn main() {
    if let Err(error) = run() {
        eprintln!("submit_usage failed: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let Some(options) = parse_args(std::env::args().skip(1).collect())? else {
        print_help();
        return Ok(());
    };

    let raw = std::fs::read_to_string(&options.file)
        .map_err(|error| format!("failed to read {}: {error}", options.file))?;
    let record: UsageRecord =
        serde_json::from_str(&raw).map_err(|error| format!("invalid record JSON: {error}"))?;

    // Same env settings as the API, so the local estimate matches the server.
    let rules = AppConfig::from_env()
        .and_then(|config| config.usage_rules())
        .map_err(|error| error.to_string())?;

    let estimate = match estimate_usage(&record, &rules) {
        Ok(estimate) => estimate,
        Err(error) => match error.kind() {
            SubmissionErrorKind::FieldValidation | SubmissionErrorKind::RecordValidation => {
                for violation in collect_violations(&record, &rules) {
                    println!("  - {violation}");
                }
                return Err("record is not valid".to_string());
            }
            SubmissionErrorKind::Configuration | SubmissionErrorKind::Storage => {
                return Err(error.to_string());
            }
        },
    };

    println!(
        "{} ({}, tier {}): {} appliance(s)",
        estimate.record.respondent,
        estimate.record.group_label,
        estimate.record.voltage_tier_key,
        estimate.record.entries.len()
    );
    println!(
        "  energy:  {:.3} kWh/day ({} Wh)",
        estimate.result.total_kilowatt_hours, estimate.result.total_watt_hours
    );
    println!("  tariff:  {} per kWh", estimate.result.tariff_rate);
    println!("  daily:   {:.2}", estimate.result.daily_cost);
    println!("  monthly: {:.2}", estimate.result.monthly_cost);

    let Some(api) = options.api.filter(|_| !options.dry_run) else {
        return Ok(());
    };

    let url = format!("{}/usage", api.trim_end_matches('/'));
    let (status, body) = actix_web::rt::System::new()
        .block_on(post_record(&url, &record))
        .map_err(|error| format!("request to {url} failed: {error}"))?;

    let id = submission_id(status, body)?;
    println!("stored as {id}");
    Ok(())
}

/// Reads the stored id from a `/usage` response; non-JSON bodies are reported verbatim.
fn submission_id(status: StatusCode, body: String) -> Result<String, String> {
    let parsed = serde_json::from_str::<Value>(&body).ok();

    if status.is_success() {
        parsed
            .as_ref()
            .and_then(|json| json["id"].as_str())
            .map(ToString::to_string)
            .ok_or_else(|| format!("api responded {status} without a submission id: {body}"))
    } else {
        let message = parsed
            .as_ref()
            .and_then(|json| json["error"].as_str())
            .map(ToString::to_string)
            .unwrap_or(body);
        Err(format!("api responded {status}: {message}"))
    }
}

async fn post_record(
    url: &str,
    record: &UsageRecord,
) -> Result<(StatusCode, String), reqwest::Error> {
    let response = reqwest::Client::new().post(url).json(record).send().await?;
    let status = response.status();
    let body = response.text().await?;
    Ok((status, body))
}

fn parse_args(args: Vec<String>) -> Result<Option<Options>, String> {
    let mut file = None;
    let mut api = None;
    let mut dry_run = false;

    let mut index = 0;
    while index < args.len() {
        let flag = args[index].as_str();
        match flag {
            "--file" | "--api" => {
                let Some(value) = args.get(index + 1) else {
                    return Err(format!("{flag} requires a value"));
                };
                if flag == "--file" {
                    file = Some(value.clone());
                } else {
                    api = Some(value.clone());
                }
                index += 2;
            }
            "--dry-run" => {
                dry_run = true;
                index += 1;
            }
            "--help" | "-h" => return Ok(None),
            other => return Err(format!("unknown argument: {other}")),
        }
    }

    let file = file.ok_or_else(|| "--file is required".to_string())?;
    Ok(Some(Options {
        file,
        api,
        dry_run,
    }))
}

fn print_help() {
    println!("submit_usage");
    println!();
    println!("Usage:");
    println!(
        "  cargo run --bin submit_usage -- --file <record.json> [--api <url>] [--dry-run]"
    );
    println!();
    println!("Options:");
    println!("  --file <path>     usage record JSON (respondent, groupLabel, voltageTierKey, entries)");
    println!("  --api <url>       base URL of a running usage API; the record is posted to /usage");
    println!("  --dry-run         print the local estimate only");
    println!();
    println!("The local estimate uses the API's settings (.env / environment):");
    println!("  MAX_ENTRIES, DURATION_SET, TARIFF_TABLE_PATH, GROUP_LABELS");
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::{parse_args, submission_id};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn reads_id_from_created_response() {
        let id = submission_id(StatusCode::CREATED, r#"{"id":"abc-123"}"#.to_string())
            .expect("id should be read");

        assert_eq!(id, "abc-123");
    }

    #[test]
    fn reports_api_error_message() {
        let error = submission_id(
            StatusCode::SERVICE_UNAVAILABLE,
            r#"{"error":"could not save submission, please retry"}"#.to_string(),
        )
        .expect_err("503 should fail");

        assert_eq!(
            error,
            "api responded 503 Service Unavailable: could not save submission, please retry"
        );
    }

    #[test]
    fn keeps_non_json_error_body() {
        let error = submission_id(StatusCode::BAD_GATEWAY, "upstream timed out".to_string())
            .expect_err("502 should fail");

        assert_eq!(error, "api responded 502 Bad Gateway: upstream timed out");
    }

    #[test]
    fn success_without_id_is_an_error() {
        let error = submission_id(StatusCode::OK, "<html>ok</html>".to_string())
            .expect_err("a body without an id is not a stored submission");

        assert!(error.contains("without a submission id: <html>ok</html>"));
    }

    #[test]
    fn rejects_tariff_override_flag() {
        let error = parse_args(args(&["--file", "record.json", "--tariffs", "t.json"]))
            .err()
            .expect("--tariffs is no longer accepted");

        assert_eq!(error, "unknown argument: --tariffs");
    }

    #[test]
    fn parses_file_api_and_dry_run() {
        let options = parse_args(args(&["--file", "r.json", "--api", "http://x", "--dry-run"]))
            .expect("arguments should parse")
            .expect("not a help request");

        assert_eq!(options.file, "r.json");
        assert_eq!(options.api.as_deref(), Some("http://x"));
        assert!(options.dry_run);
    }
}
