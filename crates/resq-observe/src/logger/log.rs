use tracing::Subscriber;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::logger::{
    config::LoggerConfig,
    error::{LoggerError, LoggerResult},
    object::LoggerRfc3339,
};

fn span_events(cfg: &LoggerConfig) -> FmtSpan {
    if cfg.span_events {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    }
}

/// Initializes text logger.
pub fn logger_text(cfg: &LoggerConfig) -> LoggerResult<()> {
    let fmt_layer = fmt::layer()
        .with_ansi(cfg.should_use_color())
        .with_target(cfg.with_targets)
        .with_span_events(span_events(cfg))
        .with_timer(LoggerRfc3339::new(cfg.tz));

    let subscriber = tracing_subscriber::registry()
        .with(cfg.level.to_env_filter())
        .with(fmt_layer);
    init_subscriber(subscriber)
}

/// Initializes JSON (structured) logger.
///
/// Span fields such as `plan` and `run_id` appear under `span`/`spans` of every event.
pub fn logger_json(cfg: &LoggerConfig) -> LoggerResult<()> {
    let fmt_layer = fmt::layer()
        .json()
        .with_ansi(false)
        .with_target(cfg.with_targets)
        .with_current_span(true)
        .with_span_list(true)
        .with_span_events(span_events(cfg))
        .with_timer(LoggerRfc3339::new(cfg.tz));

    let subscriber = tracing_subscriber::registry()
        .with(cfg.level.to_env_filter())
        .with(fmt_layer);
    init_subscriber(subscriber)
}

/// Initializes journald logger (Linux only).
#[cfg(target_os = "linux")]
pub fn logger_journald(cfg: &LoggerConfig) -> LoggerResult<()> {
    let journald = tracing_journald::layer()
        .map_err(|e| LoggerError::JournaldInitFailed(e.to_string()))?
        .with_syslog_identifier("resq".to_string());

    let subscriber = tracing_subscriber::registry()
        .with(cfg.level.to_env_filter())
        .with(journald);
    init_subscriber(subscriber)
}

/// Stub for journald on non-Linux platforms.
#[cfg(not(target_os = "linux"))]
pub fn logger_journald(_cfg: &LoggerConfig) -> LoggerResult<()> {
    Err(LoggerError::JournaldNotSupported)
}

/// Installs the subscriber as the global default.
fn init_subscriber<S>(subscriber: S) -> LoggerResult<()>
where
    S: Subscriber + Send + Sync + 'static,
{
    subscriber
        .try_init()
        .map_err(|_| LoggerError::AlreadyInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::object::LoggerFormat;

    #[test]
    fn span_events_follow_config() {
        let mut cfg = LoggerConfig::default();
        assert_eq!(span_events(&cfg), FmtSpan::NONE);

        cfg.span_events = true;
        assert_eq!(span_events(&cfg), FmtSpan::CLOSE);
    }

    #[test]
    #[cfg(not(target_os = "linux"))]
    fn journald_is_rejected_off_linux() {
        let config = LoggerConfig {
            format: LoggerFormat::Journald,
            ..Default::default()
        };
        assert!(matches!(
            logger_journald(&config),
            Err(LoggerError::JournaldNotSupported)
        ));
    }

    // One test owns the global subscriber; a second install must fail.
    #[test]
    fn second_init_reports_already_initialized() {
        let config = LoggerConfig {
            format: LoggerFormat::Json,
            use_color: false,
            ..Default::default()
        };

        let first = logger_json(&config);
        let second = logger_text(&config);

        assert!(first.is_ok() || matches!(first, Err(LoggerError::AlreadyInitialized)));
        assert!(matches!(second, Err(LoggerError::AlreadyInitialized)));
    }
}
