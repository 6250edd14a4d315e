//! Application error types for the notification inbox.
//!
//! These errors are serializable so they can be returned from desktop IPC
//! commands and rendered by the frontend. None of them is fatal to the inbox:
//! every failure degrades to "keep the last good state".

use serde::Serialize;
use thiserror::Error;

/// Inbox-level errors.
///
/// All variants serialize to a structured JSON object for frontend consumption.
#[derive(Debug, Clone, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum AppError {
    /// Retrieving the notification list failed (network or parse).
    #[error("Fetch error: {message}")]
    Fetch {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
        #[serde(skip_serializing_if = "Option::is_none")]
        endpoint: Option<String>,
    },

    /// The server rejected a mark-read request.
    #[error("Mutation error: {message}")]
    Mutation {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
        #[serde(skip_serializing_if = "Option::is_none")]
        id_count: Option<usize>,
    },

    /// Network request failed before a response was received.
    #[error("Network error: {message}")]
    Network { message: String },

    /// An external collaborator (e.g. an installed app) is not available.
    #[error("Missing collaborator: {key}")]
    MissingCollaborator { key: String },

    /// Invalid input provided.
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },

    /// Configuration could not be loaded or is invalid.
    #[error("Config error: {message}")]
    Config { message: String },

    /// Internal error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    /// Create a fetch error.
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::Fetch {
            message: message.into(),
            status_code: None,
            endpoint: None,
        }
    }

    /// Create a fetch error with status code and endpoint.
    pub fn fetch_full(
        message: impl Into<String>,
        status_code: u16,
        endpoint: impl Into<String>,
    ) -> Self {
        Self::Fetch {
            message: message.into(),
            status_code: Some(status_code),
            endpoint: Some(endpoint.into()),
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a missing collaborator error.
    pub fn missing_collaborator(key: impl Into<String>) -> Self {
        Self::MissingCollaborator { key: key.into() }
    }

    /// Create an invalid input error with field name.
    pub fn invalid_input_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }

    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Mutation { .. })
    }

    pub fn is_missing_collaborator(&self) -> bool {
        matches!(self, Self::MissingCollaborator { .. })
    }

    /// Re-tag a transport-level error as a failed list retrieval.
    pub fn into_fetch(self) -> Self {
        match self {
            Self::Network { message } => Self::fetch(message),
            other => other,
        }
    }

    /// Re-tag a transport-level error as a failed mark-read.
    ///
    /// The HTTP layer reports connection failures as `Network`; callers of
    /// the read endpoint want every failure in the mutation taxonomy.
    pub fn into_mutation(self, id_count: usize) -> Self {
        match self {
            Self::Mutation { .. } => self,
            Self::Fetch {
                message,
                status_code,
                ..
            } => Self::Mutation {
                message,
                status_code,
                id_count: Some(id_count),
            },
            other => Self::Mutation {
                message: other.to_string(),
                status_code: None,
                id_count: Some(id_count),
            },
        }
    }
}

// Conversions from common error types

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network("Request timed out")
        } else if err.is_connect() {
            Self::network("Notification service unreachable")
        } else if err.is_decode() {
            Self::fetch(format!("Failed to parse response: {}", err))
        } else {
            Self::network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("Malformed JSON: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let err = AppError::fetch("connection reset");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"type\":\"Fetch\""));
        assert!(json.contains("connection reset"));
    }

    #[test]
    fn test_fetch_error_full() {
        let err = AppError::fetch_full("Not Found", 404, "/api/notification/list");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"status_code\":404"));
        assert!(json.contains("/api/notification/list"));
    }

    #[test]
    fn test_optional_fields_not_serialized() {
        let err = AppError::internal("boom").into_mutation(3);
        let json = serde_json::to_string(&err).unwrap();
        assert!(!json.contains("status_code"));
        assert!(json.contains("\"id_count\":3"));

        let json = serde_json::to_string(&AppError::fetch("reset")).unwrap();
        assert!(!json.contains("endpoint"));
    }

    #[test]
    fn test_into_mutation_keeps_status() {
        let err =
            AppError::fetch_full("Access denied", 403, "/api/notification/read").into_mutation(2);
        match err {
            AppError::Mutation {
                status_code,
                id_count,
                ..
            } => {
                assert_eq!(status_code, Some(403));
                assert_eq!(id_count, Some(2));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let err = AppError::network("Notification service unreachable").into_mutation(1);
        assert!(err.is_mutation());
        assert!(err.to_string().contains("unreachable"));
    }

    #[test]
    fn test_into_fetch() {
        assert!(AppError::network("Request timed out").into_fetch().is_fetch());
        assert!(!AppError::internal("boom").into_fetch().is_fetch());
    }

    #[test]
    fn test_display_impl() {
        let err = AppError::missing_collaborator("system-costcenter");
        assert_eq!(format!("{}", err), "Missing collaborator: system-costcenter");
        assert!(err.is_missing_collaborator());
    }
}
