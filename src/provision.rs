//! Shape graph provisioning.
//!
//! Each configured `ShapeReference` is classified, fetched, and published
//! into the shape bucket under the last segment of its locator. References
//! are independent: a failure is logged, recorded in the report, and the
//! remaining references still run.

use std::fs;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};
use ureq::Agent;

use crate::config::ShapeReference;
use crate::constants::http::USER_AGENT;
use crate::data::LocatorKind;
use crate::errors::MillError;
use crate::store::CorpusStore;
use crate::transport::http::{build_agent, read_body};
use crate::types::{BucketName, Locator, ShapeKey};

/// Remote iff the locator has a scheme followed by `//` and a non-empty host.
///
/// Only the scheme and authority are inspected; the path may hold characters
/// a strict URI parser rejects (spaces, raw unicode).
pub fn classify_locator(locator: &str) -> LocatorKind {
    if remote_host(locator).is_some() {
        LocatorKind::Remote
    } else {
        LocatorKind::Local
    }
}

fn remote_host(locator: &str) -> Option<&str> {
    let (scheme, rest) = locator.split_once("://")?;
    let mut chars = scheme.chars();
    let valid_scheme = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid_scheme {
        return None;
    }
    let authority = rest
        .split(|c: char| matches!(c, '/' | '?' | '#'))
        .next()
        .unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    let host = if host_port.starts_with('[') {
        host_port.split_inclusive(']').next().unwrap_or_default()
    } else {
        host_port.split(':').next().unwrap_or_default()
    };
    (!host.is_empty()).then_some(host)
}

/// Percent-encode bytes that may not appear raw in a request target.
fn request_target(url: &str) -> String {
    let mut encoded = String::with_capacity(url.len());
    for byte in url.bytes() {
        let unsafe_ascii = matches!(
            byte,
            b'"' | b'<' | b'>' | b'\\' | b'^' | b'`' | b'{' | b'|' | b'}'
        );
        if byte.is_ascii_graphic() && !unsafe_ascii {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

/// Stored key for a locator: everything after the last `/`.
pub fn derive_shape_key(locator: &str) -> Option<ShapeKey> {
    let key = locator.rsplit('/').next().unwrap_or(locator);
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

/// Reads shape content from HTTP or the local filesystem.
pub struct ShapeFetcher {
    agent: Agent,
    user_agent: String,
}

impl ShapeFetcher {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            agent: build_agent(timeout),
            user_agent: USER_AGENT.to_string(),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Fetch `locator` through the path its classification selects.
    pub fn fetch(&self, locator: &str) -> Result<(LocatorKind, Vec<u8>), MillError> {
        match classify_locator(locator) {
            LocatorKind::Remote => Ok((LocatorKind::Remote, self.fetch_remote(locator)?)),
            LocatorKind::Local => Ok((LocatorKind::Local, Self::fetch_local(locator)?)),
        }
    }

    /// `GET` the locator; any status other than 200 yields an empty body.
    pub fn fetch_remote(&self, url: &str) -> Result<Vec<u8>, MillError> {
        let response = self
            .agent
            .get(request_target(url))
            .header("User-Agent", &self.user_agent)
            .call()
            .map_err(|err| fetch_error(url, MillError::from_ureq(url, err)))?;
        let status = response.status().as_u16();
        if status != 200 {
            warn!("[shacl:provision] {url} answered status {status}; treating body as empty");
            return Ok(Vec::new());
        }
        read_body(url, response).map_err(|err| fetch_error(url, err))
    }

    pub fn fetch_local(locator: &str) -> Result<Vec<u8>, MillError> {
        let path = locator.strip_prefix("file://").unwrap_or(locator);
        fs::read(path).map_err(|err| MillError::Fetch {
            locator: locator.to_string(),
            reason: format!("failed reading {path}: {err}"),
        })
    }
}

fn fetch_error(locator: &str, err: MillError) -> MillError {
    match err {
        MillError::Timeout { .. } => err,
        other => MillError::Fetch {
            locator: locator.to_string(),
            reason: other.to_string(),
        },
    }
}

/// Result of provisioning a single reference.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ShapeStatus {
    Published { bytes: usize },
    Failed { reason: String },
}

/// Per-reference provisioning record.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ShapeOutcome {
    pub locator: Locator,
    pub kind: LocatorKind,
    pub key: Option<ShapeKey>,
    #[serde(flatten)]
    pub status: ShapeStatus,
}

impl ShapeOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self.status, ShapeStatus::Published { .. })
    }
}

/// Outcomes for every reference, in input order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ProvisionReport {
    pub bucket: BucketName,
    pub outcomes: Vec<ShapeOutcome>,
}

impl ProvisionReport {
    pub fn published(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_published()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.published()
    }
}

/// Publishes configured shapes into a store bucket.
pub struct ShapeProvisioner<'a, S: CorpusStore + ?Sized> {
    store: &'a S,
    bucket: BucketName,
    fetcher: ShapeFetcher,
}

impl<'a, S: CorpusStore + ?Sized> ShapeProvisioner<'a, S> {
    pub fn new(store: &'a S, bucket: impl Into<BucketName>, fetcher: ShapeFetcher) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            fetcher,
        }
    }

    /// Provision every reference best-effort; never aborts early.
    pub fn provision(&self, references: &[ShapeReference]) -> ProvisionReport {
        let outcomes = references
            .iter()
            .map(|reference| self.provision_one(&reference.locator))
            .collect::<Vec<_>>();
        let report = ProvisionReport {
            bucket: self.bucket.clone(),
            outcomes,
        };
        info!(
            "[shacl:provision] {} of {} shape references published to '{}'",
            report.published(),
            report.outcomes.len(),
            report.bucket
        );
        report
    }

    fn provision_one(&self, locator: &str) -> ShapeOutcome {
        let kind = classify_locator(locator);
        let key = derive_shape_key(locator);
        let status = match self.publish(locator, key.as_deref()) {
            Ok(bytes) => {
                info!("[shacl:provision] loaded shape file: {locator}");
                ShapeStatus::Published { bytes }
            }
            Err(err) => {
                warn!("[shacl:provision] shape '{locator}' not published: {err}");
                ShapeStatus::Failed {
                    reason: err.to_string(),
                }
            }
        };
        ShapeOutcome {
            locator: locator.to_string(),
            kind,
            key,
            status,
        }
    }

    fn publish(&self, locator: &str, key: Option<&str>) -> Result<usize, MillError> {
        let key = key.ok_or_else(|| MillError::Fetch {
            locator: locator.to_string(),
            reason: "locator has no final path segment to use as a key".into(),
        })?;
        let (kind, content) = self.fetcher.fetch(locator)?;
        // Non-200 remote answers arrive as an empty body.
        if kind == LocatorKind::Remote && content.is_empty() {
            return Err(MillError::Fetch {
                locator: locator.to_string(),
                reason: "remote shape content is empty".into(),
            });
        }
        self.store.put_object(&self.bucket, key, &content)?;
        Ok(content.len())
    }
}
