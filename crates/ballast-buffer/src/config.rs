//! Buffer configuration parameters.

/// What [`RawBuffer::shrink_to_fit`](crate::RawBuffer::shrink_to_fit) does
/// when the allocator refuses a shrinking reallocation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShrinkFailure {
    /// Keep the existing, larger allocation. The buffer stays fully usable;
    /// only the memory saving is lost.
    #[default]
    KeepAllocation,
    /// Treat the failure like a failed grow and abort the process.
    Abort,
}

/// Configuration for a buffer's capacity management.
///
/// Controls the first-allocation floor and the shrink failure policy.
/// Validated at buffer construction; immutable for the buffer's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferConfig {
    /// Smallest capacity `grow` will allocate from an empty buffer.
    ///
    /// Default: 1, so pushes from empty allocate 1, 2, 4, 8, ... elements.
    /// Must be at least 1.
    pub min_non_zero_cap: usize,

    /// Policy for a refused shrinking reallocation.
    ///
    /// Default: [`ShrinkFailure::KeepAllocation`].
    pub shrink_failure: ShrinkFailure,
}

impl BufferConfig {
    /// Default first-allocation floor.
    pub const DEFAULT_MIN_NON_ZERO_CAP: usize = 1;

    /// Default shrink failure policy.
    pub const DEFAULT_SHRINK_FAILURE: ShrinkFailure = ShrinkFailure::KeepAllocation;

    /// Create a config with default values.
    pub const fn new() -> Self {
        Self {
            min_non_zero_cap: Self::DEFAULT_MIN_NON_ZERO_CAP,
            shrink_failure: Self::DEFAULT_SHRINK_FAILURE,
        }
    }

    /// Set the first-allocation floor.
    pub const fn with_min_non_zero_cap(mut self, min_non_zero_cap: usize) -> Self {
        self.min_non_zero_cap = min_non_zero_cap;
        self
    }

    /// Set the shrink failure policy.
    pub const fn with_shrink_failure(mut self, shrink_failure: ShrinkFailure) -> Self {
        self.shrink_failure = shrink_failure;
        self
    }

    /// Check the config for values no buffer can operate with.
    ///
    /// # Panics
    ///
    /// Panics if `min_non_zero_cap` is zero.
    pub(crate) fn validate(&self) {
        assert!(
            self.min_non_zero_cap >= 1,
            "BufferConfig::min_non_zero_cap must be at least 1"
        );
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self::new()
    }
}
