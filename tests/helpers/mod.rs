pub mod test_metrics;

use procwatch::{SampleError, Sampler, Snapshot};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Wraps a sampler and counts how often it is invoked.
pub struct CountingSampler {
    inner: Arc<dyn Sampler>,
    calls: AtomicUsize,
}

impl CountingSampler {
    pub fn new(inner: Arc<dyn Sampler>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Sampler for CountingSampler {
    fn try_sample(&self) -> Result<Snapshot, SampleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.try_sample()
    }
}
