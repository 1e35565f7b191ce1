use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for every conformance crate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConformanceError {
    /// A domain error reported by the service under test.
    #[error("service error (code {code}): {message}")]
    Service { code: i64, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("scenario {scenario} failed at step {step}: {detail}")]
    ScenarioFailed {
        scenario: String,
        step: usize,
        detail: String,
    },
}

impl ConformanceError {
    pub fn service(code: i64, message: impl Into<String>) -> Self {
        ConformanceError::Service {
            code,
            message: message.into(),
        }
    }

    /// Failures of the transport or payload layer rather than the service's domain logic.
    ///
    /// These are never matched against a predicted domain failure.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            ConformanceError::Transport(_) | ConformanceError::Timeout(_) | ConformanceError::Parse(_)
        )
    }

    /// Returns `(code, message)` for domain errors.
    pub fn as_service(&self) -> Option<(i64, &str)> {
        match self {
            ConformanceError::Service { code, message } => Some((*code, message.as_str())),
            _ => None,
        }
    }
}

/// Schema-level violations detected at collection creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaErrorKind {
    DuplicateField,
    MultiplePrimaryKeys,
    NoPrimaryKey,
    MissingMaxLength,
    BadDescriptionType,
}

/// The error taxonomy predicted by the oracle and the action catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidName,
    InvalidDimension,
    SchemaError(SchemaErrorKind),
    DuplicateDifferentParams,
    CannotAddPrimary,
    NotFound,
    DuplicateName,
    IndexNotFound,
    NotLoaded,
    InvalidArgument,
    IndexBuildRejected,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidName => f.write_str("InvalidName"),
            ErrorKind::InvalidDimension => f.write_str("InvalidDimension"),
            ErrorKind::SchemaError(kind) => write!(f, "SchemaError({kind:?})"),
            ErrorKind::DuplicateDifferentParams => f.write_str("DuplicateDifferentParams"),
            ErrorKind::CannotAddPrimary => f.write_str("CannotAddPrimary"),
            ErrorKind::NotFound => f.write_str("NotFound"),
            ErrorKind::DuplicateName => f.write_str("DuplicateName"),
            ErrorKind::IndexNotFound => f.write_str("IndexNotFound"),
            ErrorKind::NotLoaded => f.write_str("NotLoaded"),
            ErrorKind::InvalidArgument => f.write_str("InvalidArgument"),
            ErrorKind::IndexBuildRejected => f.write_str("IndexBuildRejected"),
        }
    }
}
