//! Scratch allocation configuration parameters.

use crate::error::ScratchError;

/// Configuration for scratch workspace acquisition.
///
/// Controls the stack-versus-heap cutoff and the alignment every packed
/// buffer is padded to. Validated by [`ScratchConfig::validate`]; all
/// values are plain data and immutable once handed to a planner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScratchConfig {
    /// Largest request, in bytes including alignment slack, that may be
    /// served from caller-frame storage.
    ///
    /// Default: 8192 (8 KiB), well inside typical thread stack limits.
    pub stack_threshold: usize,

    /// Alignment width in bytes used to pad every buffer.
    ///
    /// Default: 64, matching a cacheline and the widest (AVX-512) SIMD
    /// register. Must be a power of two and at least [`Self::MIN_ALIGNMENT`].
    pub alignment: usize,
}

impl ScratchConfig {
    /// Default stack threshold: 8 KiB.
    pub const DEFAULT_STACK_THRESHOLD: usize = 8 * 1024;

    /// Default alignment width: one 64-byte cacheline.
    pub const DEFAULT_ALIGNMENT: usize = 64;

    /// Smallest accepted alignment width.
    ///
    /// Every supported element type has size and alignment of at most 8
    /// bytes, so any power of two at or above this keeps packed offsets
    /// aligned for all of them.
    pub const MIN_ALIGNMENT: usize = 16;

    /// Create a config with default values.
    pub fn new() -> Self {
        Self {
            stack_threshold: Self::DEFAULT_STACK_THRESHOLD,
            alignment: Self::DEFAULT_ALIGNMENT,
        }
    }

    /// Replace the stack threshold.
    pub fn with_stack_threshold(mut self, bytes: usize) -> Self {
        self.stack_threshold = bytes;
        self
    }

    /// Replace the alignment width.
    pub fn with_alignment(mut self, bytes: usize) -> Self {
        self.alignment = bytes;
        self
    }

    /// Check the invariants documented on each field.
    pub fn validate(&self) -> Result<(), ScratchError> {
        if !self.alignment.is_power_of_two() || self.alignment < Self::MIN_ALIGNMENT {
            return Err(ScratchError::InvalidConfig {
                reason: format!(
                    "alignment must be a power of two >= {}, got {}",
                    Self::MIN_ALIGNMENT,
                    self.alignment
                ),
            });
        }
        if self.stack_threshold == 0 {
            return Err(ScratchError::InvalidConfig {
                reason: "stack_threshold must be > 0".into(),
            });
        }
        Ok(())
    }
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let config = ScratchConfig::default();
        assert_eq!(config.stack_threshold, 8192);
        assert_eq!(config.alignment, 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builders_replace_fields() {
        let config = ScratchConfig::new()
            .with_stack_threshold(1024)
            .with_alignment(32);
        assert_eq!(config.stack_threshold, 1024);
        assert_eq!(config.alignment, 32);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn non_power_of_two_alignment_rejected() {
        let config = ScratchConfig::new().with_alignment(48);
        assert!(matches!(
            config.validate(),
            Err(ScratchError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn tiny_alignment_rejected() {
        let config = ScratchConfig::new().with_alignment(8);
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_threshold_rejected() {
        let config = ScratchConfig::new().with_stack_threshold(0);
        assert!(config.validate().is_err());
    }
}
