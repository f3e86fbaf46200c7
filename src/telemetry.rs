//! Logging setup for the quiz backend.
//!
//! - `LOG_LEVEL` takes a level ("debug") or full directives
//!   ("info,quiz=trace,tower_http=warn"). Invalid values fall back to `DEFAULT_FILTER`
//!   and are reported once the subscriber is up.
//! - `LOG_FORMAT` is "pretty" (default), "compact" or "json".
//!
//! Workflow spans use the `quiz` target, startup and file handling `quizcraft_backend`.

use tracing::warn;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,quiz=debug,quizcraft_backend=debug,tower_http=info,axum=info";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl LogFormat {
    fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("json") => LogFormat::Json,
            Some("compact") => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    }
}

/// Filter from `LOG_LEVEL`, plus the rejected value when it did not parse.
fn filter_from(level: Option<&str>) -> (EnvFilter, Option<String>) {
    match level.map(str::trim).filter(|l| !l.is_empty()) {
        None => (EnvFilter::new(DEFAULT_FILTER), None),
        Some(l) => match EnvFilter::try_new(l) {
            Ok(filter) => (filter, None),
            Err(_) => (EnvFilter::new(DEFAULT_FILTER), Some(l.to_string())),
        },
    }
}

pub fn init_tracing() -> LogFormat {
    let level = std::env::var("LOG_LEVEL").ok();
    let (filter, rejected) = filter_from(level.as_deref());
    let format = LogFormat::parse(std::env::var("LOG_FORMAT").ok().as_deref());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.init(),
    }

    if let Some(bad) = rejected {
        warn!(target: "quizcraft_backend", log_level = %bad, fallback = DEFAULT_FILTER, "Invalid LOG_LEVEL, using default filter");
    }
    format
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats() {
        assert_eq!(LogFormat::parse(Some("JSON")), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some("compact")), LogFormat::Compact);
        assert_eq!(LogFormat::parse(Some("fancy")), LogFormat::Pretty);
        assert_eq!(LogFormat::parse(None), LogFormat::Pretty);
    }

    #[test]
    fn filters() {
        assert!(filter_from(None).1.is_none());
        assert!(filter_from(Some("  ")).1.is_none());
        assert!(filter_from(Some("debug")).1.is_none());
        assert!(filter_from(Some("info,quiz=trace")).1.is_none());
        assert_eq!(filter_from(Some("quiz=notalevel")).1.as_deref(), Some("quiz=notalevel"));
    }
}
