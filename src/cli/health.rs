//! Health CLI command

use crate::config::{BackendKind, Settings};
use crate::health::HealthReport;
use crate::storage::{open_store, LocalFileStore};

/// Print a JSON health report and return whether the backend is connected
///
/// A store that cannot be opened is reported rather than returned as an
/// error, so probes always get a body.
pub fn handle_health(settings: &Settings) -> bool {
    let report = check_health(settings);

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode health report: {}", e),
    }

    report.is_healthy()
}

/// Build the report without changing any stored state
///
/// The local backend is only read; opening it could initialize or
/// quarantine the state file.
pub fn check_health(settings: &Settings) -> HealthReport {
    if let Err(e) = settings.validate() {
        return HealthReport::from_open_error(&e);
    }

    match settings.backend {
        BackendKind::Local => {
            HealthReport::from_liveness(Some(LocalFileStore::check_file(&settings.db_file)))
        }
        BackendKind::Mongo => match open_store(settings) {
            Ok(store) => {
                let report = HealthReport::from_liveness(Some(store.liveness_check()));
                let _ = store.close();
                report
            }
            Err(e) => HealthReport::from_open_error(&e),
        },
    }
}
