//! The error taxonomy of the export engine.
//!
//! Every failure an export can hit falls into one of three fatal kinds:
//!
//! - [`Integrity`] for reconciliation mismatches and rounding leftovers.
//! - [`ExternalDependency`] for payment-processor failures.
//! - [`Configuration`] for missing signers or allocation rules.
//!
//! The remaining variants cover request validation and lookups at the API
//! boundary.
//!
//! [`Integrity`]: EngineError::Integrity
//! [`ExternalDependency`]: EngineError::ExternalDependency
//! [`Configuration`]: EngineError::Configuration
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("integrity error: {0}")]
    Integrity(String),
    #[error("external dependency error: {0}")]
    ExternalDependency(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Integrity(a), Self::Integrity(b)) => a == b,
            (Self::ExternalDependency(a), Self::ExternalDependency(b)) => a == b,
            (Self::Configuration(a), Self::Configuration(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::InvalidRequest(a), Self::InvalidRequest(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
