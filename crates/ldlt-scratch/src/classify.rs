//! Stack-versus-heap decision for a single acquisition.

use crate::config::ScratchConfig;

/// Where a scratch region's memory comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Borrowed from storage owned by the calling frame.
    Stack,
    /// Owned heap allocation, freed when the buffer drops.
    Heap,
}

/// Pure threshold test deciding [`Origin`] from a byte count.
///
/// A request qualifies for the stack when its size plus a fixed alignment
/// slack fits under the threshold. The slack is the configured alignment
/// width: a stack region may need up to that many bytes of padding to
/// reach an aligned start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeClassifier {
    threshold: usize,
    overhead: usize,
}

impl SizeClassifier {
    /// Build a classifier from a config.
    pub fn new(config: &ScratchConfig) -> Self {
        Self {
            threshold: config.stack_threshold,
            overhead: config.alignment,
        }
    }

    /// Build a classifier from explicit values.
    pub fn with_overhead(threshold: usize, overhead: usize) -> Self {
        Self {
            threshold,
            overhead,
        }
    }

    /// Stack threshold in bytes.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Fixed alignment slack added to every request.
    pub fn overhead(&self) -> usize {
        self.overhead
    }

    /// True iff `element_count * element_size + overhead <= threshold`.
    ///
    /// Overflow anywhere in the computation means "too large for the
    /// stack".
    pub fn should_use_stack(&self, element_count: usize, element_size: usize) -> bool {
        element_count
            .checked_mul(element_size)
            .and_then(|bytes| bytes.checked_add(self.overhead))
            .is_some_and(|total| total <= self.threshold)
    }

    /// Classify `element_count` elements of `element_size` bytes.
    pub fn classify(&self, element_count: usize, element_size: usize) -> Origin {
        if self.should_use_stack(element_count, element_size) {
            Origin::Stack
        } else {
            Origin::Heap
        }
    }

    /// Classify a raw byte count.
    pub fn classify_bytes(&self, bytes: usize) -> Origin {
        self.classify(bytes, 1)
    }
}

impl Default for SizeClassifier {
    fn default() -> Self {
        Self::new(&ScratchConfig::default())
    }
}

/// Threshold test using the default alignment slack.
///
/// Equivalent to
/// `SizeClassifier::with_overhead(threshold, ScratchConfig::DEFAULT_ALIGNMENT)`.
pub fn should_use_stack(element_count: usize, element_size: usize, threshold: usize) -> bool {
    SizeClassifier::with_overhead(threshold, ScratchConfig::DEFAULT_ALIGNMENT)
        .should_use_stack(element_count, element_size)
}
