use crate::config::{AppEnvironment, TelemetryConfig};
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log level/filter '{value}': unable to build EnvFilter")]
    EnvFilter { value: String, source: ParseError },
    #[error("telemetry error: {0}")]
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

/// Resolve the log filter, preferring `RUST_LOG` over the configured level.
pub fn env_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => {
            EnvFilter::try_new(&config.log_level).map_err(|source| TelemetryError::EnvFilter {
                value: config.log_level.clone(),
                source,
            })
        }
    }
}

/// Install the global subscriber. Production output drops ANSI colors and
/// targets so supervisor log files stay greppable.
pub fn init(config: &TelemetryConfig, environment: AppEnvironment) -> Result<(), TelemetryError> {
    let filter = env_filter(config)?;
    let interactive = environment == AppEnvironment::Development;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(interactive)
        .with_ansi(interactive)
        .compact()
        .try_init()
        .map_err(TelemetryError::Subscriber)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_filter_directive() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = TelemetryConfig {
            log_level: "hunt_property=loudest".to_string(),
        };
        let err = env_filter(&config).expect_err("malformed filter rejected");
        assert!(err.to_string().contains("hunt_property=loudest"));
    }

    #[test]
    fn accepts_plain_level() {
        let config = TelemetryConfig {
            log_level: "debug".to_string(),
        };
        assert!(env_filter(&config).is_ok());
    }
}
