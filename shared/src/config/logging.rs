//! Logging configuration

use serde::{Deserialize, Serialize};

use super::environment::Environment;

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, human-readable (local development)
    Pretty,
    /// Single-line, human-readable
    Compact,
    /// One JSON object per event, for log shipping
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("Unknown log format: {}", other)),
        }
    }
}

/// How the services log
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter directive, e.g. `info` or `sv_core=debug,info`
    pub level: String,

    #[serde(default = "default_format")]
    pub format: LogFormat,

    /// Attach file and line to every event
    #[serde(default)]
    pub source_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::for_environment(Environment::default())
    }
}

impl LoggingConfig {
    /// Defaults per deployment environment
    ///
    /// | environment | level | format |
    /// |-------------|-------|--------|
    /// | development | debug | pretty |
    /// | staging     | info  | json   |
    /// | production  | warn  | json   |
    pub fn for_environment(environment: Environment) -> Self {
        let (level, format) = match environment {
            Environment::Development => ("debug", LogFormat::Pretty),
            Environment::Staging => ("info", LogFormat::Json),
            Environment::Production => ("warn", LogFormat::Json),
        };
        Self {
            level: level.to_string(),
            format,
            source_location: environment == Environment::Development,
        }
    }

    /// Apply `LOG_LEVEL` and `LOG_FORMAT` on top of the current values
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(level) = std::env::var("LOG_LEVEL")
            .ok()
            .map(|level| level.trim().to_lowercase())
            .filter(|level| !level.is_empty())
        {
            self.level = level;
        }
        if let Some(format) = std::env::var("LOG_FORMAT")
            .ok()
            .and_then(|format| format.parse().ok())
        {
            self.format = format;
        }
        self
    }
}

fn default_format() -> LogFormat {
    LogFormat::Pretty
}
