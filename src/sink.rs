use std::sync::Mutex;

use crate::errors::MillError;

/// Append-only aggregate of validation results for a single run.
///
/// Each `append` commits its whole slice under one lock acquisition, so
/// concurrent producers never interleave inside each other's bytes. The sink
/// is consumed by `into_bytes` and cannot be reused for another run.
#[derive(Default)]
pub struct ResultSink {
    inner: Mutex<SinkInner>,
}

#[derive(Default)]
struct SinkInner {
    bytes: Vec<u8>,
    blocks: usize,
}

impl ResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one result block; returns the number of bytes written.
    pub fn append(&self, block: &[u8]) -> Result<usize, MillError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| MillError::Aggregation("result sink lock poisoned".into()))?;
        inner.bytes.extend_from_slice(block);
        inner.blocks += 1;
        Ok(block.len())
    }

    /// Bytes accumulated so far.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.bytes.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of appended blocks.
    pub fn block_count(&self) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.blocks)
            .unwrap_or_default()
    }

    /// Take the accumulated contents, ending the sink's life.
    pub fn into_bytes(self) -> Result<Vec<u8>, MillError> {
        self.inner
            .into_inner()
            .map(|inner| inner.bytes)
            .map_err(|_| MillError::Aggregation("result sink lock poisoned".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn concurrent_appends_stay_contiguous() {
        let sink = ResultSink::new();
        thread::scope(|scope| {
            for worker in 0..8u8 {
                let sink = &sink;
                scope.spawn(move || {
                    let block = vec![b'a' + worker; 64];
                    for _ in 0..10 {
                        assert_eq!(sink.append(&block).unwrap(), 64);
                    }
                });
            }
        });
        assert_eq!(sink.block_count(), 80);
        let bytes = sink.into_bytes().unwrap();
        assert_eq!(bytes.len(), 8 * 10 * 64);
        for chunk in bytes.chunks(64) {
            assert!(chunk.iter().all(|byte| *byte == chunk[0]));
        }
    }

    #[test]
    fn empty_sink_yields_empty_output() {
        let sink = ResultSink::new();
        assert!(sink.is_empty());
        sink.append(b"").unwrap();
        assert_eq!(sink.block_count(), 1);
        assert!(sink.into_bytes().unwrap().is_empty());
    }
}
