use crate::error::SampleError;
use crate::sampler::{Sampler, Snapshot};

/// Sampler for platforms without process accounting support.
///
/// Every pass reports [`SampleError::Unsupported`], so a monitor running on
/// such a host simply emits nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedSampler;

impl Sampler for UnsupportedSampler {
    fn try_sample(&self) -> Result<Snapshot, SampleError> {
        Err(SampleError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_produces_data() {
        for _ in 0..3 {
            assert!(matches!(
                UnsupportedSampler.try_sample(),
                Err(SampleError::Unsupported)
            ));
        }
    }
}
