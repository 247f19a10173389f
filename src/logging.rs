// src/logging.rs

use crate::models::ApiCallLog;
use flexi_logger::{detailed_format, FileSpec, FlexiLoggerError, Logger, LoggerHandle};
use log::info;
use std::path::Path;

/// Starts the file logger. The terminal belongs to the UI, so nothing goes to stderr.
/// Keep the returned handle alive for the lifetime of the program.
pub fn init_logging(log_dir: &Path, level: &str) -> Result<LoggerHandle, FlexiLoggerError> {
    Logger::try_with_str(level)?
        .log_to_file(
            FileSpec::default()
                .directory(log_dir)
                .basename("melchat")
                .suppress_timestamp(),
        )
        .append()
        .format_for_files(detailed_format)
        .start()
}

/// Formats one API call as a single log line.
pub fn format_api_call(log: &ApiCallLog) -> String {
    format!(
        "[{}] {} - {} - Status: {} - Time: {}ms",
        log.timestamp.to_rfc3339(),
        log.endpoint,
        log.request_summary,
        log.response_status,
        log.response_time_ms
    )
}

/// Logs an API call under the `melchat::api` target.
pub fn log_api_call(log: &ApiCallLog) {
    info!(target: "melchat::api", "{}", format_api_call(log));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_format_api_call() {
        let log = ApiCallLog {
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            endpoint: "http://localhost:11434/api/generate".to_string(),
            request_summary: "generate gemma:2b".to_string(),
            response_status: 200,
            response_time_ms: 1532,
        };
        assert_eq!(
            format_api_call(&log),
            "[2024-05-01T12:00:00+00:00] http://localhost:11434/api/generate - generate gemma:2b - Status: 200 - Time: 1532ms"
        );
    }
}
