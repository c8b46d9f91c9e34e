//! One mill run: provision shapes, dispatch every pair, persist the aggregate.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::MillConfig;
use crate::constants::store::OUTPUT_OBJECT_SUFFIX;
use crate::data::{DocumentEntry, ShapeGraph};
use crate::dispatch::{Dispatcher, PairOutcome};
use crate::errors::MillError;
use crate::metrics::{ShapeTally, tally_by_shape};
use crate::provision::{ProvisionReport, ShapeFetcher, ShapeProvisioner};
use crate::sink::ResultSink;
use crate::store::CorpusStore;
use crate::types::{BucketName, ObjectName, RunId};
use crate::validate::Validator;

/// Output object name: `<runID>/<bucketName>_shacl.nt`.
pub fn output_object_name(run_id: &str, bucket: &str) -> ObjectName {
    format!("{run_id}/{bucket}{OUTPUT_OBJECT_SUFFIX}")
}

/// Observable record of a run, including every failure.
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub bucket: BucketName,
    pub output_bucket: BucketName,
    pub output_object: ObjectName,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Present unless provisioning was skipped.
    pub provision: Option<ProvisionReport>,
    pub documents: usize,
    pub shapes: usize,
    pub listing_errors: Vec<String>,
    pub pairs_launched: usize,
    pub pairs_validated: usize,
    pub pairs_failed: usize,
    pub peak_in_flight: usize,
    pub output_bytes: usize,
    pub persisted: bool,
    pub persist_error: Option<String>,
    pub shape_tallies: Vec<ShapeTally>,
    pub pair_failures: Vec<PairOutcome>,
}

impl RunSummary {
    /// Total failures across provisioning, listing, validation, and persistence.
    pub fn failure_count(&self) -> usize {
        self.provision.as_ref().map_or(0, ProvisionReport::failed)
            + self.listing_errors.len()
            + self.pairs_failed
            + usize::from(!self.persisted)
    }
}

/// Orchestrates a single run against a store and validator.
pub struct MillRun<'a, S: CorpusStore + ?Sized, V: Validator + ?Sized> {
    store: &'a S,
    validator: &'a V,
    config: &'a MillConfig,
    fetcher: Option<ShapeFetcher>,
    skip_provision: bool,
}

impl<'a, S: CorpusStore + ?Sized, V: Validator + ?Sized> MillRun<'a, S, V> {
    pub fn new(store: &'a S, validator: &'a V, config: &'a MillConfig) -> Self {
        Self {
            store,
            validator,
            config,
            fetcher: None,
            skip_provision: false,
        }
    }

    /// Use a specific fetcher for provisioning.
    pub fn with_fetcher(mut self, fetcher: ShapeFetcher) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Dispatch against shapes already in the shape bucket.
    pub fn skip_provision(mut self, skip: bool) -> Self {
        self.skip_provision = skip;
        self
    }

    /// Publish the configured shape files into the shape bucket.
    pub fn provision(&mut self) -> ProvisionReport {
        let settings = &self.config.validation;
        let fetcher = self.fetcher.take().unwrap_or_else(|| {
            ShapeFetcher::new(settings.call_timeout()).with_user_agent(settings.user_agent.clone())
        });
        ShapeProvisioner::new(self.store, settings.shape_bucket.clone(), fetcher)
            .provision(&self.config.shape_files)
    }

    /// Run the full pipeline for `bucket`.
    ///
    /// Only an invalid configuration is returned as an error; every other
    /// failure is recorded in the summary and the run continues.
    pub fn execute(mut self, bucket: &str) -> Result<RunSummary, MillError> {
        let config = self.config;
        config.validate()?;
        let started_at = Utc::now();
        let settings = &config.validation;
        let run_id = config.run.run_id.clone();
        info!("[shacl:run] run '{run_id}' starting for bucket '{bucket}'");

        let provision = if self.skip_provision {
            None
        } else {
            Some(self.provision())
        };

        let mut listing_errors = Vec::new();
        let documents: Vec<DocumentEntry> = self
            .store
            .list_documents(bucket)
            .unwrap_or_else(|err| {
                warn!("[shacl:run] listing documents in '{bucket}' failed: {err}");
                listing_errors.push(err.to_string());
                Vec::new()
            });
        let shapes: Vec<ShapeGraph> = self
            .store
            .list_shapes(&settings.shape_bucket)
            .unwrap_or_else(|err| {
                warn!(
                    "[shacl:run] listing shapes in '{}' failed: {err}",
                    settings.shape_bucket
                );
                listing_errors.push(err.to_string());
                Vec::new()
            });

        let sink = ResultSink::new();
        let report = Dispatcher::new(self.validator, settings.concurrency)
            .dispatch(&documents, &shapes, &sink);

        let output_object = output_object_name(&run_id, bucket);
        let (output_bytes, persist_result) = match sink.into_bytes() {
            Ok(bytes) => (
                bytes.len(),
                self.store
                    .put_object(&settings.output_bucket, &output_object, &bytes),
            ),
            Err(err) => (0, Err(err)),
        };
        let persist_error = match persist_result {
            Ok(()) => {
                info!(
                    "[shacl:run] wrote {output_bytes} bytes to {}/{output_object}",
                    settings.output_bucket
                );
                None
            }
            Err(err) => {
                warn!("[shacl:run] persisting {output_object} failed: {err}");
                Some(err.to_string())
            }
        };

        let summary = RunSummary {
            run_id,
            bucket: bucket.to_string(),
            output_bucket: settings.output_bucket.clone(),
            output_object,
            started_at,
            finished_at: Utc::now(),
            provision,
            documents: documents.len(),
            shapes: shapes.len(),
            listing_errors,
            pairs_launched: report.launched,
            pairs_validated: report.validated(),
            pairs_failed: report.failed(),
            peak_in_flight: report.peak_in_flight,
            output_bytes,
            persisted: persist_error.is_none(),
            persist_error,
            shape_tallies: tally_by_shape(&report.outcomes),
            pair_failures: report.failures().cloned().collect(),
        };
        info!(
            "[shacl:run] run '{}' finished with {} failures",
            summary.run_id,
            summary.failure_count()
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShapeReference;
    use crate::store::InMemoryStore;
    use crate::validate::PairRequest;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct TagValidator;

    impl Validator for TagValidator {
        fn validate(&self, request: &PairRequest<'_>) -> Result<Vec<u8>, MillError> {
            Ok(format!("<{}> <{}> .\n", request.document_id, request.shape_key).into_bytes())
        }
    }

    struct CountingStore {
        inner: InMemoryStore,
        puts: AtomicUsize,
    }

    impl CorpusStore for CountingStore {
        fn list_documents(&self, bucket: &str) -> Result<Vec<DocumentEntry>, MillError> {
            self.inner.list_documents(bucket)
        }

        fn put_object(&self, bucket: &str, name: &str, content: &[u8]) -> Result<(), MillError> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            self.inner.put_object(bucket, name, content)
        }

        fn get_object(&self, bucket: &str, name: &str) -> Result<Option<Vec<u8>>, MillError> {
            self.inner.get_object(bucket, name)
        }
    }

    fn config(run_id: &str) -> MillConfig {
        let mut config = MillConfig::default();
        config.run.run_id = run_id.to_string();
        config.validation.concurrency = 4;
        config
    }

    #[test]
    fn output_name_follows_run_and_bucket() {
        assert_eq!(
            output_object_name("run-1", "summoned"),
            "run-1/summoned_shacl.nt"
        );
    }

    #[test]
    fn provisions_then_validates_and_persists_once() {
        let temp = tempdir().unwrap();
        let shape_path = temp.path().join("required.ttl");
        fs::write(&shape_path, b"<shape> .").unwrap();
        let store = CountingStore {
            inner: InMemoryStore::new().with_documents(
                "summoned",
                vec![DocumentEntry::new("d1", "a"), DocumentEntry::new("d2", "b")],
            ),
            puts: AtomicUsize::new(0),
        };
        let mut config = config("r1");
        config.shape_files = vec![ShapeReference::new(shape_path.to_string_lossy())];

        let summary = MillRun::new(&store, &TagValidator, &config)
            .execute("summoned")
            .unwrap();

        assert_eq!(summary.provision.as_ref().unwrap().published(), 1);
        assert_eq!(summary.documents, 2);
        assert_eq!(summary.shapes, 1);
        assert_eq!(summary.pairs_launched, 2);
        assert_eq!(summary.pairs_failed, 0);
        assert!(summary.persisted);
        assert_eq!(summary.failure_count(), 0);
        // one shape publish plus one output write
        assert_eq!(store.puts.load(Ordering::SeqCst), 2);

        let output = store
            .get_object("gleaner-milled", "r1/summoned_shacl.nt")
            .unwrap()
            .unwrap();
        let text = String::from_utf8(output).unwrap();
        let mut lines: Vec<&str> = text.lines().collect();
        lines.sort();
        assert_eq!(lines, vec!["<d1> <required.ttl> .", "<d2> <required.ttl> ."]);
        assert_eq!(summary.output_bytes, text.len());
    }

    #[test]
    fn empty_bucket_still_persists_empty_output() {
        let store = InMemoryStore::new();
        let config = config("r2");
        let summary = MillRun::new(&store, &TagValidator, &config)
            .skip_provision(true)
            .execute("nothing")
            .unwrap();
        assert!(summary.provision.is_none());
        assert_eq!(summary.pairs_launched, 0);
        assert!(summary.persisted);
        assert_eq!(
            store
                .get_object("gleaner-milled", "r2/nothing_shacl.nt")
                .unwrap()
                .as_deref(),
            Some(&b""[..])
        );
    }

    #[test]
    fn invalid_config_is_rejected_before_any_work() {
        let store = InMemoryStore::new();
        let config = MillConfig::default();
        let err = MillRun::new(&store, &TagValidator, &config)
            .execute("b")
            .unwrap_err();
        assert!(matches!(err, MillError::Configuration(_)));
        assert!(store.object_names("gleaner-milled").is_empty());
    }
}
