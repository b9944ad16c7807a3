mod config;
mod error;
mod log;
mod object;

pub use config::{ENV_LOG_FORMAT, ENV_LOG_LEVEL, ENV_LOG_TZ, LoggerConfig};
pub use error::{LoggerError, LoggerResult};
pub use object::{LoggerFormat, LoggerLevel, LoggerTimeZone, init_local_offset};

/// Initializes the global tracing subscriber with the given configuration.
///
/// Returns [`LoggerError::AlreadyInitialized`] if a global subscriber is already set.
/// With `LoggerTimeZone::Local`, call [`init_local_offset`] first, before any threads start.
///
/// # Examples
/// ```rust
/// use resq_observe::{LoggerConfig, init_logger};
///
/// let config = LoggerConfig::default();
/// init_logger(&config).expect("failed to initialize logger");
///
/// tracing::info!("logger initialized");
/// ```
pub fn init_logger(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    match cfg.format {
        LoggerFormat::Text => log::logger_text(cfg),
        LoggerFormat::Json => log::logger_json(cfg),
        LoggerFormat::Journald => log::logger_journald(cfg),
    }
}
