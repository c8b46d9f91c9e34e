//! Concurrent fan-out over every (document, shape) pair.
//!
//! The coordinator enumerates pairs shape-major, document-minor. Before each
//! worker is spawned the coordinator takes an admission slot, so launch
//! blocks once `concurrency` calls are in flight. The worker owns the slot
//! until its validation call returns, then appends the result to the shared
//! sink. `thread::scope` is the completion barrier: `dispatch` returns only
//! after every worker has finished and released its slot.
//!
//! Result placement inside the sink follows completion order, not
//! enumeration order. The per-pair outcomes in `DispatchReport` are always in
//! enumeration order.

use std::thread;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::constants::dispatch::DEFAULT_CONCURRENCY;
use crate::data::{DocumentEntry, ShapeGraph};
use crate::errors::MillError;
use crate::gate::AdmissionGate;
use crate::sink::ResultSink;
use crate::types::{DocumentId, ShapeKey};
use crate::validate::{PairRequest, Validator};

/// Result of one pair.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PairStatus {
    /// Validation succeeded and `bytes` were appended to the sink.
    Validated { bytes: usize },
    /// The pair contributed nothing to the sink.
    Failed { reason: String, timed_out: bool },
}

/// Per-pair dispatch record.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PairOutcome {
    pub shape_index: usize,
    pub shape_key: ShapeKey,
    pub document_id: DocumentId,
    #[serde(flatten)]
    pub status: PairStatus,
}

impl PairOutcome {
    pub fn is_validated(&self) -> bool {
        matches!(self.status, PairStatus::Validated { .. })
    }

    pub fn bytes_written(&self) -> usize {
        match self.status {
            PairStatus::Validated { bytes } => bytes,
            PairStatus::Failed { .. } => 0,
        }
    }
}

/// Everything observed during one dispatch.
#[derive(Clone, Debug, Default, Serialize)]
pub struct DispatchReport {
    /// Workers launched; always `documents × shapes`.
    pub launched: usize,
    /// Highest number of simultaneously held admission slots.
    pub peak_in_flight: usize,
    /// Permits handed out during this dispatch.
    pub admitted: u64,
    /// Slots still held once the completion barrier returned; always zero.
    pub in_flight_at_barrier: usize,
    pub elapsed_ms: u128,
    /// One outcome per pair, in enumeration order.
    pub outcomes: Vec<PairOutcome>,
}

impl DispatchReport {
    pub fn validated(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_validated()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.validated()
    }

    pub fn bytes_written(&self) -> usize {
        self.outcomes.iter().map(PairOutcome::bytes_written).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &PairOutcome> {
        self.outcomes.iter().filter(|o| !o.is_validated())
    }
}

/// Bounded-concurrency launcher for pair validation.
///
/// Every `dispatch` call gets its own admission gate, so gate statistics in
/// a report never carry over from an earlier dispatch.
pub struct Dispatcher<'v, V: Validator + ?Sized> {
    validator: &'v V,
    capacity: usize,
}

impl<'v, V: Validator + ?Sized> Dispatcher<'v, V> {
    /// Create a dispatcher admitting at most `concurrency` calls at once.
    pub fn new(validator: &'v V, concurrency: usize) -> Self {
        Self {
            validator,
            capacity: concurrency.max(1),
        }
    }

    pub fn with_default_concurrency(validator: &'v V) -> Self {
        Self::new(validator, DEFAULT_CONCURRENCY)
    }

    /// Admission slots available to each dispatch.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Validate every pair and append successful results to `sink`.
    pub fn dispatch(
        &self,
        documents: &[DocumentEntry],
        shapes: &[ShapeGraph],
        sink: &ResultSink,
    ) -> DispatchReport {
        let started = Instant::now();
        let gate = AdmissionGate::new(self.capacity);
        let mut outcomes = Vec::with_capacity(documents.len() * shapes.len());

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(documents.len() * shapes.len());
            for (shape_index, shape) in shapes.iter().enumerate() {
                info!(
                    "[shacl:dispatch] checking {} data graphs against shape graph: {}",
                    documents.len(),
                    shape.key
                );
                for document in documents {
                    let permit = gate.acquire();
                    let validator = self.validator;
                    let spawned = thread::Builder::new()
                        .name(format!("shacl-pair-{shape_index}"))
                        .spawn_scoped(scope, move || {
                            let result = validator.validate(&PairRequest::new(document, shape));
                            drop(permit);
                            record_pair(shape_index, document, result, sink)
                        });
                    let handle = match spawned {
                        Ok(handle) => Some(handle),
                        Err(err) => {
                            warn!(
                                "[shacl:dispatch] failed to launch worker for {}: {err}",
                                document.id
                            );
                            None
                        }
                    };
                    handles.push((shape_index, shape, document, handle));
                }
            }

            for (shape_index, shape, document, handle) in handles {
                let status = match handle.map(|handle| handle.join()) {
                    Some(Ok(status)) => status,
                    Some(Err(_)) => PairStatus::Failed {
                        reason: "validation worker panicked".into(),
                        timed_out: false,
                    },
                    None => PairStatus::Failed {
                        reason: "validation worker could not be launched".into(),
                        timed_out: false,
                    },
                };
                outcomes.push(PairOutcome {
                    shape_index,
                    shape_key: shape.key.clone(),
                    document_id: document.id.clone(),
                    status,
                });
            }
        });

        let report = DispatchReport {
            launched: outcomes.len(),
            peak_in_flight: gate.peak(),
            admitted: gate.admitted(),
            in_flight_at_barrier: gate.in_flight(),
            elapsed_ms: started.elapsed().as_millis(),
            outcomes,
        };
        info!(
            "[shacl:dispatch] {} pairs done: {} validated, {} failed, {} bytes",
            report.launched,
            report.validated(),
            report.failed(),
            report.bytes_written()
        );
        report
    }
}

fn record_pair(
    shape_index: usize,
    document: &DocumentEntry,
    result: Result<Vec<u8>, MillError>,
    sink: &ResultSink,
) -> PairStatus {
    let failed = |err: MillError| {
        warn!(
            shape_index,
            document = %document.id,
            "[shacl:dispatch] pair failed: {err}"
        );
        PairStatus::Failed {
            timed_out: err.is_timeout(),
            reason: err.to_string(),
        }
    };
    match result.and_then(|bytes| sink.append(&bytes)) {
        Ok(bytes) => {
            info!(
                shape_index,
                document = %document.id,
                bytes,
                "[shacl:dispatch] pair wrote result bytes"
            );
            PairStatus::Validated { bytes }
        }
        Err(err) => failed(err),
    }
}
