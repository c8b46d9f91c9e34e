use std::io;

use thiserror::Error;

use crate::types::{BucketName, Locator, ObjectName};

/// Error type for shape fetching, store access, and validation-service calls.
#[derive(Debug, Error)]
pub enum MillError {
    #[error("shape '{locator}' could not be fetched: {reason}")]
    Fetch { locator: Locator, reason: String },
    #[error("store object '{bucket}/{object}' failed: {reason}")]
    Store {
        bucket: BucketName,
        object: ObjectName,
        reason: String,
    },
    #[error("validation request could not be built: {0}")]
    RequestBuild(String),
    #[error("request to '{endpoint}' failed: {reason}")]
    Transport { endpoint: String, reason: String },
    #[error("request to '{endpoint}' returned status {status}")]
    Status { endpoint: String, status: u16 },
    #[error("request to '{endpoint}' timed out")]
    Timeout { endpoint: String },
    #[error("aggregate buffer write failed: {0}")]
    Aggregation(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl MillError {
    /// True when the error came from an elapsed call deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, MillError::Timeout { .. })
    }

    pub(crate) fn from_ureq(endpoint: &str, err: ureq::Error) -> Self {
        match err {
            ureq::Error::Timeout(_) => MillError::Timeout {
                endpoint: endpoint.to_string(),
            },
            ureq::Error::StatusCode(status) => MillError::Status {
                endpoint: endpoint.to_string(),
                status,
            },
            other => MillError::Transport {
                endpoint: endpoint.to_string(),
                reason: other.to_string(),
            },
        }
    }
}
