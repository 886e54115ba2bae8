use crate::config::ConfigError;
use crate::marketplace::{ServiceError, StoreError};
use crate::telemetry::TelemetryError;
use std::fmt;

/// Failures that stop the service from starting or serving.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Store(StoreError),
    Service(ServiceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Store(err) => write!(f, "storage error: {}", err),
            AppError::Service(err) => write!(f, "marketplace error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::Service(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<ServiceError> for AppError {
    fn from(value: ServiceError) -> Self {
        Self::Service(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn store_failures_keep_their_source() {
        let err = AppError::from(StoreError::Unavailable("connection refused".to_string()));
        assert_eq!(
            err.to_string(),
            "storage error: store unavailable: connection refused"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn config_failures_render_the_variable() {
        let err = AppError::from(ConfigError::InvalidPort);
        assert!(err.to_string().contains("APP_PORT"));
    }
}
