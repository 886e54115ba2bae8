use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            storage: StorageConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Which document store backs the marketplace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    Memory,
    Mongo(MongoConfig),
}

/// Connection settings for the MongoDB backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MongoConfig {
    pub url: String,
    pub database: String,
    pub max_pool_size: u32,
}

impl StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let backend = env::var("STORAGE_BACKEND").unwrap_or_else(|_| "memory".to_string());

        match backend.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(Self::Memory),
            "mongo" | "mongodb" => {
                let url = env::var("MONGODB_URL").map_err(|_| ConfigError::MissingMongoUrl)?;
                let database =
                    env::var("MONGODB_DATABASE").unwrap_or_else(|_| "hunt_property".to_string());
                let max_pool_size = env::var("MONGODB_MAX_POOL_SIZE")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse::<u32>()
                    .ok()
                    .filter(|size| *size > 0)
                    .ok_or(ConfigError::InvalidPoolSize)?;

                Ok(Self::Mongo(MongoConfig {
                    url,
                    database,
                    max_pool_size,
                }))
            }
            _ => Err(ConfigError::UnknownStorageBackend(backend)),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StorageConfig::Memory => "memory",
            StorageConfig::Mongo(_) => "mongo",
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    UnknownStorageBackend(String),
    MissingMongoUrl,
    InvalidPoolSize,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::UnknownStorageBackend(value) => {
                write!(f, "STORAGE_BACKEND '{}' is not one of memory, mongo", value)
            }
            ConfigError::MissingMongoUrl => {
                write!(f, "MONGODB_URL is required when STORAGE_BACKEND=mongo")
            }
            ConfigError::InvalidPoolSize => {
                write!(f, "MONGODB_MAX_POOL_SIZE must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::UnknownStorageBackend(_)
            | ConfigError::MissingMongoUrl
            | ConfigError::InvalidPoolSize => None,
        }
    }
}
