#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Command-line entry point shared by the `shacl-mill` binary.
pub mod app;
/// Mill configuration types and YAML loading.
pub mod config;
/// Centralized defaults for HTTP, dispatch, store layout, and multipart encoding.
pub mod constants;
/// Document, shape, and result data types.
pub mod data;
/// Bounded-concurrency pair dispatcher.
pub mod dispatch;
/// Counting admission gate.
pub mod gate;
/// Per-shape tallies over pair outcomes.
pub mod metrics;
/// `multipart/form-data` encoder for validation uploads.
pub mod multipart;
/// Shape graph provisioning.
pub mod provision;
/// End-to-end run orchestration.
pub mod run;
/// Thread-safe aggregate result buffer.
pub mod sink;
/// Corpus store trait and built-in stores.
pub mod store;
/// Outbound transports (HTTP today).
pub mod transport;
/// Shared type aliases.
pub mod types;
/// Validation client trait and HTTP implementation.
pub mod validate;

mod errors;

pub use config::{MillConfig, RunSection, ShapeReference, ValidationSettings};
pub use data::{DocumentEntry, LocatorKind, ShapeGraph, ValidationResult};
pub use dispatch::{DispatchReport, Dispatcher, PairOutcome, PairStatus};
pub use errors::MillError;
pub use gate::{AdmissionGate, AdmissionPermit};
pub use metrics::{ShapeTally, tally_by_shape};
pub use provision::{
    ProvisionReport, ShapeFetcher, ShapeOutcome, ShapeProvisioner, ShapeStatus, classify_locator,
    derive_shape_key,
};
pub use run::{MillRun, RunSummary, output_object_name};
pub use sink::ResultSink;
pub use store::{CorpusStore, FsCorpusStore, InMemoryStore};
pub use types::{BucketName, DocumentId, Locator, ObjectName, RunId, ShapeKey};
pub use validate::{HttpValidator, PairRequest, Validator};
