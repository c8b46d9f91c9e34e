use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::dispatch::DEFAULT_CONCURRENCY;
use crate::constants::http::{DEFAULT_CALL_TIMEOUT_SECS, DEFAULT_VALIDATOR_ENDPOINT, USER_AGENT};
use crate::constants::store::{DEFAULT_OUTPUT_BUCKET, DEFAULT_SHAPE_BUCKET};
use crate::errors::MillError;
use crate::types::{BucketName, Locator, RunId};

/// One configured shape graph location, remote URL or local path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeReference {
    /// Remote URI (`https://host/shape.ttl`) or local path (`/data/shape.ttl`).
    #[serde(rename = "ref")]
    pub locator: Locator,
}

impl ShapeReference {
    pub fn new(locator: impl Into<Locator>) -> Self {
        Self {
            locator: locator.into(),
        }
    }
}

/// Run identity section (`gleaner:` in the config file).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunSection {
    /// Prefix used for the output object name.
    #[serde(rename = "runid", default)]
    pub run_id: RunId,
}

/// Validation settings (`shacl:` in the config file).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    /// Validation service upload endpoint.
    pub endpoint: String,
    /// Maximum validation calls in flight at once.
    pub concurrency: usize,
    /// Per-call deadline in seconds; `0` disables the deadline.
    pub timeout_secs: u64,
    /// Bucket that holds provisioned shape graphs.
    pub shape_bucket: BucketName,
    /// Bucket that receives run outputs.
    pub output_bucket: BucketName,
    /// User agent sent with every outbound request.
    pub user_agent: String,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_VALIDATOR_ENDPOINT.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            timeout_secs: DEFAULT_CALL_TIMEOUT_SECS,
            shape_bucket: DEFAULT_SHAPE_BUCKET.to_string(),
            output_bucket: DEFAULT_OUTPUT_BUCKET.to_string(),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl ValidationSettings {
    /// Per-call deadline, or `None` when disabled.
    pub fn call_timeout(&self) -> Option<Duration> {
        match self.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Top-level mill configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MillConfig {
    #[serde(rename = "gleaner", default)]
    pub run: RunSection,
    /// Shape graphs to provision before validation.
    #[serde(rename = "shapefiles", default)]
    pub shape_files: Vec<ShapeReference>,
    #[serde(rename = "shacl", default)]
    pub validation: ValidationSettings,
}

impl MillConfig {
    /// Parse a YAML config document.
    pub fn from_yaml_str(text: &str) -> Result<Self, MillError> {
        let config: MillConfig = serde_yaml::from_str(text)
            .map_err(|err| MillError::Configuration(format!("invalid config document: {err}")))?;
        if config.shape_files.is_empty() {
            warn!("[shacl:config] no shapefiles configured; provisioning will be a no-op");
        }
        Ok(config)
    }

    /// Read and parse a YAML config file.
    pub fn load(path: &Path) -> Result<Self, MillError> {
        let text = fs::read_to_string(path).map_err(|err| {
            MillError::Configuration(format!("failed reading {}: {err}", path.display()))
        })?;
        Self::from_yaml_str(&text)
    }

    /// Reject settings a run cannot proceed with.
    pub fn validate(&self) -> Result<(), MillError> {
        if self.run.run_id.trim().is_empty() {
            return Err(MillError::Configuration("gleaner.runid must be set".into()));
        }
        if self.run.run_id.contains('/') {
            return Err(MillError::Configuration(
                "gleaner.runid must not contain '/'".into(),
            ));
        }
        let settings = &self.validation;
        if settings.concurrency == 0 {
            return Err(MillError::Configuration(
                "shacl.concurrency must be at least 1".into(),
            ));
        }
        if settings.endpoint.trim().is_empty() {
            return Err(MillError::Configuration("shacl.endpoint must be set".into()));
        }
        if settings.shape_bucket.trim().is_empty() || settings.output_bucket.trim().is_empty() {
            return Err(MillError::Configuration(
                "shacl.shape_bucket and shacl.output_bucket must be set".into(),
            ));
        }
        Ok(())
    }
}
