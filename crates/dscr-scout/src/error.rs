use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::failure::CollaboratorError;
use std::fmt;

/// Failures that stop the process before or outside a pipeline run.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Storage(sqlx::Error),
    Migration(sqlx::migrate::MigrateError),
    Http(reqwest::Error),
    Collaborator(CollaboratorError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Storage(err) => write!(f, "storage error: {}", err),
            AppError::Migration(err) => write!(f, "migration error: {}", err),
            AppError::Http(err) => write!(f, "http client error: {}", err),
            AppError::Collaborator(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Storage(err) => Some(err),
            AppError::Migration(err) => Some(err),
            AppError::Http(err) => Some(err),
            AppError::Collaborator(err) => Some(err),
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

impl From<sqlx::Error> for AppError {
    fn from(value: sqlx::Error) -> Self {
        Self::Storage(value)
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(value: sqlx::migrate::MigrateError) -> Self {
        Self::Migration(value)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

impl From<CollaboratorError> for AppError {
    fn from(value: CollaboratorError) -> Self {
        Self::Collaborator(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::failure::ReasonCode;
    use std::error::Error;

    #[test]
    fn wraps_sources_with_context() {
        let err = AppError::from(ConfigError::MissingPostalCodes);
        assert_eq!(
            err.to_string(),
            "configuration error: MARKET_ZIP_CODES must list at least one postal code"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn collaborator_failures_keep_their_reason_code() {
        let err = AppError::from(CollaboratorError::new(ReasonCode::DbQuery, "locked"));
        assert_eq!(err.to_string(), "DB_QUERY_ERROR: locked");
    }
}
