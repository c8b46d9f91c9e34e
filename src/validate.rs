use std::time::Duration;

use tracing::{debug, warn};
use ureq::Agent;

use crate::constants::http::{DEFAULT_VALIDATOR_ENDPOINT, USER_AGENT};
use crate::constants::multipart::{DATAGRAPH_FIELD, SHAPEGRAPH_FIELD};
use crate::data::{DocumentEntry, ShapeGraph, ValidationResult};
use crate::errors::MillError;
use crate::multipart::MultipartForm;
use crate::transport::http::{build_agent, read_body};

/// One (document, shape) pair handed to a validator.
#[derive(Clone, Copy, Debug)]
pub struct PairRequest<'a> {
    pub document_id: &'a str,
    pub document: &'a [u8],
    pub shape_key: &'a str,
    pub shape: &'a [u8],
}

impl<'a> PairRequest<'a> {
    pub fn new(document: &'a DocumentEntry, shape: &'a ShapeGraph) -> Self {
        Self {
            document_id: &document.id,
            document: &document.content,
            shape_key: &shape.key,
            shape: &shape.content,
        }
    }
}

/// Synchronous validation of one pair.
///
/// Implementations are shared by every dispatcher worker.
pub trait Validator: Send + Sync {
    /// Validate a pair and return the raw result bytes.
    fn validate(&self, request: &PairRequest<'_>) -> Result<ValidationResult, MillError>;
}

/// Validator backed by the SHACL upload service.
pub struct HttpValidator {
    endpoint: String,
    user_agent: String,
    agent: Agent,
}

impl Default for HttpValidator {
    fn default() -> Self {
        Self::new(DEFAULT_VALIDATOR_ENDPOINT, None)
    }
}

impl HttpValidator {
    /// Create a validator posting to `endpoint` with an optional per-call deadline.
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            endpoint: endpoint.into(),
            user_agent: USER_AGENT.to_string(),
            agent: build_agent(timeout),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_form<'a>(request: &PairRequest<'a>) -> MultipartForm<'a> {
        MultipartForm::new()
            .text(DATAGRAPH_FIELD, request.document_id)
            .text(SHAPEGRAPH_FIELD, request.shape_key)
            .file(DATAGRAPH_FIELD, DATAGRAPH_FIELD, request.document)
            .file(SHAPEGRAPH_FIELD, SHAPEGRAPH_FIELD, request.shape)
    }
}

impl Validator for HttpValidator {
    fn validate(&self, request: &PairRequest<'_>) -> Result<ValidationResult, MillError> {
        let form = Self::build_form(request).encode()?;
        let response = self
            .agent
            .post(&self.endpoint)
            .header("User-Agent", &self.user_agent)
            .header("Content-Type", &form.content_type)
            .send(&form.body[..])
            .map_err(|err| MillError::from_ureq(&self.endpoint, err))?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                "[shacl:validate] {} rejected {} against {}: status {}",
                self.endpoint,
                request.document_id,
                request.shape_key,
                status.as_u16()
            );
            return Err(MillError::Status {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
            });
        }
        let body = read_body(&self.endpoint, response)?;
        debug!(
            document = request.document_id,
            shape = request.shape_key,
            bytes = body.len(),
            "validation response received"
        );
        Ok(body)
    }
}
