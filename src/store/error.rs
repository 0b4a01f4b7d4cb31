use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by the remote data or storage service, classified
/// from its error code
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("relation '{relation}' does not exist")]
    RelationMissing { relation: String },
    #[error("foreign key violation: {message}")]
    ForeignKeyViolation { message: String },
    #[error("uniqueness violation: {message}")]
    UniquenessViolation { message: String },
    #[error("request timed out")]
    Timeout,
    #[error("no matching row")]
    NotFound,
    #[error("{message}")]
    Unknown {
        code: Option<String>,
        message: String,
    },
}

/// Error body returned by the row service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl BackendError {
    /// Classify a service error for `relation`. Codes follow the Postgres
    /// SQLSTATE vocabulary plus the row service's own `PGRST*` codes.
    pub fn from_service(relation: &str, body: ServiceErrorBody) -> Self {
        let message = body
            .message
            .clone()
            .or(body.details.clone())
            .unwrap_or_else(|| "unknown backend error".to_string());

        match body.code.as_deref() {
            Some("42P01") | Some("PGRST205") => BackendError::RelationMissing {
                relation: relation.to_string(),
            },
            Some("23503") => BackendError::ForeignKeyViolation { message },
            Some("23505") => BackendError::UniquenessViolation { message },
            Some("57014") => BackendError::Timeout,
            Some("PGRST116") => BackendError::NotFound,
            _ if message.contains("does not exist") && message.contains("relation") => {
                BackendError::RelationMissing {
                    relation: relation.to_string(),
                }
            }
            _ => BackendError::Unknown {
                code: body.code,
                message,
            },
        }
    }

    pub fn is_relation_missing(&self) -> bool {
        matches!(self, BackendError::RelationMissing { .. })
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        BackendError::Unknown {
            code: None,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else {
            BackendError::unknown(err.to_string())
        }
    }
}
