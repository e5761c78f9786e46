//! Errors raised while provisioning Atlas private endpoints

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProvisionError>;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid Atlas URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Digest authentication failed: {0}")]
    Authentication(String),

    #[error("expected status code {}, but got {}", .expected.as_u16(), .actual.as_u16())]
    UnexpectedStatus {
        expected: StatusCode,
        actual: StatusCode,
    },

    #[error("Atlas response is missing field: {0}")]
    MissingField(&'static str),

    #[error("error in fetching resource ID for endpoint service {endpoint_id}")]
    ResourceIdMissing { endpoint_id: String },

    #[error(
        "Error in configuring private endpoint (HTTP {}, status {}, errorCode {}), check MongoDB Atlas",
        .http_status.as_u16(),
        .status.as_deref().unwrap_or("none"),
        .error_code.as_deref().unwrap_or("none")
    )]
    ConfigurationRejected {
        http_status: StatusCode,
        status: Option<String>,
        error_code: Option<String>,
    },

    #[error("All regions are used, delete all private endpoints manually from MongoDB Atlas and try again")]
    RegionsExhausted,
}

impl ProvisionError {
    /// HTTP status code associated with the failure, `0` when none was received
    pub fn status_code(&self) -> u16 {
        match self {
            ProvisionError::UnexpectedStatus { actual, .. } => actual.as_u16(),
            ProvisionError::ConfigurationRejected { http_status, .. } => http_status.as_u16(),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_status_message_and_code() {
        let err = ProvisionError::UnexpectedStatus {
            expected: StatusCode::OK,
            actual: StatusCode::CONFLICT,
        };
        assert_eq!(err.to_string(), "expected status code 200, but got 409");
        assert_eq!(err.status_code(), 409);
    }

    #[test]
    fn test_exhausted_has_no_status_and_mentions_cleanup() {
        let err = ProvisionError::RegionsExhausted;
        assert_eq!(err.status_code(), 0);
        assert!(err.to_string().contains("manually"));
    }

    #[test]
    fn test_configuration_rejected_message() {
        let err = ProvisionError::ConfigurationRejected {
            http_status: StatusCode::BAD_REQUEST,
            status: None,
            error_code: Some("INVALID_ATTRIBUTE".to_string()),
        };
        assert_eq!(err.status_code(), 400);
        assert!(err.to_string().contains("errorCode INVALID_ATTRIBUTE"));
        assert!(err.to_string().contains("status none"));
    }
}
