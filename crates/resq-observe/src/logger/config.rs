use serde::{Deserialize, Serialize};
use std::io::IsTerminal;

use crate::logger::{
    error::LoggerResult,
    object::{LoggerFormat, LoggerLevel, LoggerTimeZone},
};

/// Environment variable overriding [`LoggerConfig::level`].
pub const ENV_LOG_LEVEL: &str = "RESQ_LOG";
/// Environment variable overriding [`LoggerConfig::format`].
pub const ENV_LOG_FORMAT: &str = "RESQ_LOG_FORMAT";
/// Environment variable overriding [`LoggerConfig::tz`].
pub const ENV_LOG_TZ: &str = "RESQ_LOG_TZ";

/// Logger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggerConfig {
    /// Output format.
    pub format: LoggerFormat,
    /// Filter expression (e.g. `"info"`, `"resq_core=debug,info"`).
    pub level: LoggerLevel,
    /// Timezone for timestamps.
    pub tz: LoggerTimeZone,
    /// Include module/target names in log output.
    pub with_targets: bool,
    /// Use colored output when stdout is a terminal.
    pub use_color: bool,
    /// Emit an event when a span closes, with its busy/idle time.
    ///
    /// Useful to see one line per coordinator run (`degrade.run`) with its `run_id`.
    pub span_events: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::default(),
            level: LoggerLevel::default(),
            tz: LoggerTimeZone::default(),
            with_targets: true,
            use_color: true,
            span_events: false,
        }
    }
}

impl LoggerConfig {
    /// Color is used only if enabled in config and stdout is a terminal.
    ///
    /// Call during logger initialization, not during config parsing.
    pub fn should_use_color(&self) -> bool {
        self.use_color && std::io::stdout().is_terminal()
    }

    /// Apply `RESQ_LOG`, `RESQ_LOG_FORMAT` and `RESQ_LOG_TZ` from the process environment.
    pub fn with_env_overrides(self) -> LoggerResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup. Empty values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> LoggerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v: &String| !v.trim().is_empty());

        if let Some(level) = get(ENV_LOG_LEVEL) {
            self.level = level.parse()?;
        }
        if let Some(format) = get(ENV_LOG_FORMAT) {
            self.format = format.parse()?;
        }
        if let Some(tz) = get(ENV_LOG_TZ) {
            self.tz = tz.parse()?;
        }
        Ok(self)
    }
}
