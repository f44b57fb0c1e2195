//! Logging setup for processes that embed the migration runner

use std::io;

use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{SchemaError, SchemaResult};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "warn")
    pub level: String,
    /// Emit JSON lines instead of plain text
    pub json_format: bool,
    /// Environment filter (e.g. "hearth_schema=debug,sqlx=warn")
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            env_filter: Some("hearth_schema=info,hearth_migrations=info,sqlx=warn".to_string()),
        }
    }
}

impl LoggingConfig {
    /// Verbose text output, including every rendered DDL statement
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            json_format: false,
            env_filter: Some("hearth_schema=debug,hearth_migrations=debug,sqlx=info".to_string()),
        }
    }

    /// JSON output for log shippers
    pub fn production() -> Self {
        Self {
            json_format: true,
            ..Self::default()
        }
    }

    /// Minimal output
    pub fn test() -> Self {
        Self {
            level: "error".to_string(),
            json_format: false,
            env_filter: None,
        }
    }

    /// The filter directive that `init_logging` falls back to when
    /// `RUST_LOG` is not set
    pub fn directive(&self) -> &str {
        self.env_filter.as_deref().unwrap_or(&self.level)
    }
}

/// Install a global tracing subscriber. Fails if one is already installed.
pub fn init_logging(config: &LoggingConfig) -> SchemaResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.directive()))
        .map_err(|e| SchemaError::Configuration(format!("Invalid log filter: {}", e)))?;

    let result = if config.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stdout).json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stdout))
            .try_init()
    };
    result.map_err(|e| SchemaError::Configuration(format!("Logging already initialized: {}", e)))?;

    tracing::debug!(level = %config.level, json = config.json_format, "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_prefers_env_filter() {
        assert_eq!(LoggingConfig::test().directive(), "error");
        assert!(LoggingConfig::development().directive().contains("hearth_schema=debug"));
        assert!(LoggingConfig::production().json_format);
    }

    #[test]
    fn test_second_init_is_an_error() {
        let config = LoggingConfig::test();
        // the first call may race with other tests; the second never succeeds
        let _ = init_logging(&config);
        assert!(init_logging(&config).is_err());
    }
}
