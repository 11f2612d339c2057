use std::path::PathBuf;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use rusqlite::Connection;
use tempfile::TempDir;

use crate::adapters::db::{open_connection, run_migrations};
use crate::domain::models::{RawApplianceEntry, UsageRecord};

static TEST_DB_COUNTER: AtomicU64 = AtomicU64::new(0);

struct TestDbDir {
    dir: TempDir,
    template: PathBuf,
}

/// Copy of a migrated template database, unique per call.
pub fn open_test_connection(test_name: &str) -> Connection {
    let shared = test_db_dir();
    let counter = TEST_DB_COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = shared
        .dir
        .path()
        .join(format!("{test_name}-{counter}.sqlite"));

    std::fs::copy(&shared.template, &path).expect("template db should be copied");
    open_connection(path.to_string_lossy().as_ref()).expect("test db should open")
}

fn test_db_dir() -> &'static TestDbDir {
    static DIR: OnceLock<TestDbDir> = OnceLock::new();

    DIR.get_or_init(|| {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let template = dir.path().join("usage_template.sqlite");

        let mut connection =
            open_connection(template.to_string_lossy().as_ref()).expect("template db opens");
        run_migrations(&mut connection).expect("template migrations should succeed");

        TestDbDir { dir, template }
    })
}

pub fn sample_record(entries: Vec<RawApplianceEntry>) -> UsageRecord {
    UsageRecord {
        respondent: "Budi".to_string(),
        group_label: "10A".to_string(),
        voltage_tier_key: "900".to_string(),
        entries,
    }
}
