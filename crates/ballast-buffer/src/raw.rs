//! Capacity-only storage: the allocation layer under every buffer.
//!
//! [`RawBuffer`] owns a region of `capacity` slots of `T` drawn from an
//! [`Allocator`]. It never tracks how many slots are initialised; that is
//! the job of the layer above. This is the only module in the crate
//! besides `sequence` that contains `unsafe` code, and every block carries
//! a `// SAFETY:` comment.

#![allow(unsafe_code)]

use std::alloc::{handle_alloc_error, Layout};
use std::fmt;
use std::marker::PhantomData;
use std::mem::{self, MaybeUninit};
use std::ptr::NonNull;
use std::slice;

use ballast_core::{Allocator, BufferError, System};
use tracing::{trace, warn};

use crate::config::{BufferConfig, ShrinkFailure};

/// A growable, capacity-tracked region of `T` slots.
///
/// The region is `None` exactly when the capacity is zero. Capacity grows
/// by doubling: from empty the first allocation holds
/// `config.min_non_zero_cap` slots, every later growth at least doubles.
///
/// Zero-sized element types never reach the allocator; their region is a
/// dangling, well-aligned pointer.
pub struct RawBuffer<T, A: Allocator = System> {
    ptr: Option<NonNull<T>>,
    cap: usize,
    alloc: A,
    config: BufferConfig,
    _marker: PhantomData<T>,
}

impl<T> RawBuffer<T, System> {
    /// Create an empty buffer backed by the system allocator.
    pub const fn new() -> Self {
        Self::new_in(System)
    }

    /// Create a buffer with room for `capacity` elements.
    ///
    /// Aborts the process if the allocation fails.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(capacity, System)
    }
}

impl<T> Default for RawBuffer<T, System> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A: Allocator> RawBuffer<T, A> {
    const IS_ZST: bool = mem::size_of::<T>() == 0;

    /// Create an empty buffer. No allocation is performed.
    pub const fn new_in(alloc: A) -> Self {
        Self {
            ptr: None,
            cap: 0,
            alloc,
            config: BufferConfig::new(),
            _marker: PhantomData,
        }
    }

    /// Create an empty buffer with a custom configuration.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid (see [`BufferConfig`]).
    pub fn with_config_in(config: BufferConfig, alloc: A) -> Self {
        config.validate();
        Self {
            ptr: None,
            cap: 0,
            alloc,
            config,
            _marker: PhantomData,
        }
    }

    /// Create a buffer with room for exactly `capacity` elements.
    ///
    /// Aborts the process if the allocation fails.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        Self::try_with_capacity_in(capacity, alloc).unwrap_or_else(|err| alloc_failure::<T>(err))
    }

    /// Create a buffer with room for exactly `capacity` elements,
    /// returning an error instead of aborting.
    pub fn try_with_capacity_in(capacity: usize, alloc: A) -> Result<Self, BufferError> {
        Self::try_with_capacity_and_config_in(capacity, BufferConfig::new(), alloc)
    }

    /// Create a configured buffer with room for exactly `capacity`
    /// elements.
    ///
    /// Aborts the process if the allocation fails.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid (see [`BufferConfig`]).
    pub fn with_capacity_and_config_in(capacity: usize, config: BufferConfig, alloc: A) -> Self {
        Self::try_with_capacity_and_config_in(capacity, config, alloc)
            .unwrap_or_else(|err| alloc_failure::<T>(err))
    }

    /// Create a configured buffer with room for exactly `capacity`
    /// elements, returning an error instead of aborting.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid (see [`BufferConfig`]).
    pub fn try_with_capacity_and_config_in(
        capacity: usize,
        config: BufferConfig,
        alloc: A,
    ) -> Result<Self, BufferError> {
        let mut buf = Self::with_config_in(config, alloc);
        if capacity > 0 {
            buf.try_set_capacity(capacity)?;
        }
        Ok(buf)
    }

    /// Number of elements the current region can hold.
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Whether a region is currently held.
    pub fn is_allocated(&self) -> bool {
        self.ptr.is_some()
    }

    /// The allocator this buffer draws from.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// The configuration this buffer was created with.
    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    /// Grow to hold at least `needed` elements.
    ///
    /// Aborts the process if the allocator fails, panics on capacity
    /// overflow.
    pub fn grow(&mut self, needed: usize) {
        if let Err(err) = self.try_grow(needed) {
            alloc_failure::<T>(err);
        }
    }

    /// Grow to hold at least `needed` elements.
    ///
    /// The new capacity starts at `min_non_zero_cap` when empty, or twice
    /// the current capacity otherwise, and keeps doubling until it covers
    /// `needed`. On error the buffer is unchanged.
    pub fn try_grow(&mut self, needed: usize) -> Result<(), BufferError> {
        let mut new_cap = if self.cap == 0 {
            self.config.min_non_zero_cap
        } else {
            self.cap.checked_mul(2).ok_or(BufferError::CapacityOverflow)?
        };
        while new_cap < needed {
            new_cap = new_cap.checked_mul(2).ok_or(BufferError::CapacityOverflow)?;
        }
        self.try_set_capacity(new_cap)
    }

    /// Make room for `additional` more elements beyond `len`.
    ///
    /// No-op if `len + additional` already fits. Aborts the process if the
    /// allocator fails.
    pub fn reserve(&mut self, len: usize, additional: usize) {
        if let Err(err) = self.try_reserve(len, additional) {
            alloc_failure::<T>(err);
        }
    }

    /// Make room for `additional` more elements beyond `len`, returning an
    /// error instead of aborting.
    ///
    /// `len + additional` overflowing `usize` is a
    /// [`BufferError::CapacityOverflow`].
    pub fn try_reserve(&mut self, len: usize, additional: usize) -> Result<(), BufferError> {
        let needed = len
            .checked_add(additional)
            .ok_or(BufferError::CapacityOverflow)?;
        if needed <= self.cap {
            return Ok(());
        }
        self.try_grow(needed)
    }

    /// Shrink the region to exactly `len` elements.
    ///
    /// With `len == 0` the region is released. If the allocator refuses the
    /// smaller region, the configured [`ShrinkFailure`] policy decides
    /// between keeping the old region and aborting.
    pub fn shrink_to_fit(&mut self, len: usize) {
        if let Err(err) = self.try_shrink_to_fit(len) {
            match self.config.shrink_failure {
                ShrinkFailure::KeepAllocation => {
                    warn!(
                        capacity = self.cap,
                        target = len,
                        error = %err,
                        "shrink refused, keeping existing allocation"
                    );
                }
                ShrinkFailure::Abort => alloc_failure::<T>(err),
            }
        }
    }

    /// Shrink the region to exactly `len` elements, returning the
    /// allocator's refusal instead of applying the shrink policy.
    ///
    /// On error the old region is still owned and valid.
    pub fn try_shrink_to_fit(&mut self, len: usize) -> Result<(), BufferError> {
        if len >= self.cap {
            return Ok(());
        }
        if len == 0 {
            self.release();
            return Ok(());
        }
        self.try_set_capacity(len)
    }

    /// Return the region to the allocator and reset to empty.
    ///
    /// Idempotent: releasing an empty buffer does nothing. Contents are not
    /// dropped; the layer above owns that responsibility.
    pub fn release(&mut self) {
        if let Some(ptr) = self.ptr {
            if !Self::IS_ZST {
                let layout = self.current_layout();
                // SAFETY: ptr is the live region, allocated with the layout
                // for the current capacity.
                unsafe { self.alloc.deallocate(ptr.cast(), layout) };
            }
            self.ptr = None;
            trace!(capacity = self.cap, elem_size = mem::size_of::<T>(), "buffer released");
        }
        self.cap = 0;
    }

    /// View every slot of the region, initialised or not.
    ///
    /// The slice is exactly `capacity` long and borrows the buffer, so no
    /// reallocation can happen while it is alive.
    pub fn as_uninit_slice(&self) -> &[MaybeUninit<T>] {
        match self.ptr {
            // SAFETY: the region holds `cap` slots of T; MaybeUninit<T>
            // has the same layout and tolerates any content.
            Some(ptr) => unsafe { slice::from_raw_parts(ptr.as_ptr().cast(), self.cap) },
            None => &[],
        }
    }

    /// Mutable view over every slot of the region.
    pub fn as_uninit_slice_mut(&mut self) -> &mut [MaybeUninit<T>] {
        match self.ptr {
            // SAFETY: as above; `&mut self` guarantees exclusivity.
            Some(ptr) => unsafe { slice::from_raw_parts_mut(ptr.as_ptr().cast(), self.cap) },
            None => &mut [],
        }
    }

    /// Layout of the live region.
    ///
    /// Only meaningful while a region is held.
    fn current_layout(&self) -> Layout {
        debug_assert!(self.ptr.is_some());
        // SAFETY: `Layout::array::<T>(self.cap)` succeeded when the region
        // was (re)allocated, so size and alignment are valid.
        unsafe {
            Layout::from_size_align_unchecked(mem::size_of::<T>() * self.cap, mem::align_of::<T>())
        }
    }

    /// Move the region to exactly `new_cap` slots.
    ///
    /// Allocates when empty, reallocates otherwise. On error nothing
    /// changes.
    fn try_set_capacity(&mut self, new_cap: usize) -> Result<(), BufferError> {
        debug_assert!(new_cap > 0);
        let new_layout = Layout::array::<T>(new_cap).map_err(|_| BufferError::CapacityOverflow)?;

        let ptr = if Self::IS_ZST {
            NonNull::dangling()
        } else {
            let raw = match self.ptr {
                None => self.alloc.allocate(new_layout),
                // SAFETY: `old` is live with the current layout, and
                // `new_layout` proves the new size is non-zero and in range.
                Some(old) => unsafe {
                    self.alloc
                        .reallocate(old.cast(), self.current_layout(), new_layout.size())
                },
            };
            match raw {
                Some(raw) => raw.cast(),
                None => {
                    warn!(
                        requested = new_layout.size(),
                        old_capacity = self.cap,
                        new_capacity = new_cap,
                        "allocator refused request"
                    );
                    return Err(BufferError::OutOfMemory {
                        requested: new_layout.size(),
                    });
                }
            }
        };

        trace!(
            old_capacity = self.cap,
            new_capacity = new_cap,
            elem_size = mem::size_of::<T>(),
            "buffer resized"
        );
        self.ptr = Some(ptr);
        self.cap = new_cap;
        Ok(())
    }
}

impl<T, A: Allocator> Drop for RawBuffer<T, A> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T, A: Allocator> fmt::Debug for RawBuffer<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawBuffer")
            .field("capacity", &self.cap)
            .field("allocated", &self.ptr.is_some())
            .field("config", &self.config)
            .finish()
    }
}

/// Terminate on an allocation failure reached through an infallible entry
/// point.
///
/// Allocator refusals go through [`handle_alloc_error`]; capacity overflow
/// panics, matching the standard collections.
#[cold]
pub(crate) fn alloc_failure<T>(err: BufferError) -> ! {
    match err {
        BufferError::OutOfMemory { requested } => {
            let layout = Layout::from_size_align(requested, mem::align_of::<T>())
                .unwrap_or_else(|_| Layout::new::<T>());
            handle_alloc_error(layout)
        }
        other => panic!("{other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballast_test_utils::{CountingAllocator, FailingAllocator};

    #[test]
    fn new_holds_no_region() {
        let buf: RawBuffer<u32> = RawBuffer::new();
        assert_eq!(buf.capacity(), 0);
        assert!(!buf.is_allocated());
        assert!(buf.as_uninit_slice().is_empty());
    }

    #[test]
    fn new_does_not_allocate() {
        let counting = CountingAllocator::new();
        let buf: RawBuffer<u64, _> = RawBuffer::new_in(&counting);
        drop(buf);
        assert_eq!(counting.allocations(), 0);
        assert_eq!(counting.deallocations(), 0);
    }

    #[test]
    fn with_capacity_allocates_exactly() {
        let mut buf: RawBuffer<i32> = RawBuffer::with_capacity(10);
        assert!(buf.is_allocated());
        assert_eq!(buf.capacity(), 10);
        assert_eq!(buf.as_uninit_slice().len(), 10);
        buf.release();
        assert!(!buf.is_allocated());
        assert_eq!(buf.capacity(), 0);
    }

    #[test]
    fn with_zero_capacity_stays_empty() {
        let buf: RawBuffer<f64> = RawBuffer::with_capacity(0);
        assert!(!buf.is_allocated());
        assert_eq!(buf.capacity(), 0);
    }

    #[test]
    fn capacity_is_in_elements_not_bytes() {
        let buf: RawBuffer<f64> = RawBuffer::with_capacity(5);
        assert_eq!(buf.capacity(), 5);
    }

    #[test]
    fn grow_doubles_from_one() {
        let mut buf: RawBuffer<u8> = RawBuffer::new();
        buf.grow(10);
        assert_eq!(buf.capacity(), 16);
        let old = buf.capacity();
        buf.grow(20);
        assert!(buf.capacity() > old);
        assert_eq!(buf.capacity(), 32);
    }

    #[test]
    fn grow_always_at_least_doubles() {
        let mut buf: RawBuffer<u8> = RawBuffer::with_capacity(4);
        buf.grow(3);
        assert_eq!(buf.capacity(), 8);
    }

    #[test]
    fn grow_respects_configured_floor() {
        let config = BufferConfig::new().with_min_non_zero_cap(8);
        let mut buf: RawBuffer<u16, _> = RawBuffer::with_config_in(config, System);
        buf.grow(1);
        assert_eq!(buf.capacity(), 8);
        buf.grow(9);
        assert_eq!(buf.capacity(), 16);
    }

    #[test]
    fn reserve_grows_only_when_needed() {
        let mut buf: RawBuffer<i32> = RawBuffer::new();
        buf.reserve(0, 5);
        assert!(buf.capacity() >= 5);
        let old = buf.capacity();
        buf.reserve(5, 10);
        assert!(buf.capacity() >= 15);
        assert!(buf.capacity() > old);

        let cap = buf.capacity();
        buf.reserve(cap - 1, 1);
        assert_eq!(buf.capacity(), cap);
    }

    #[test]
    fn reserve_overflow_is_reported() {
        let mut buf: RawBuffer<u8> = RawBuffer::with_capacity(4);
        let err = buf.try_reserve(usize::MAX, 1).unwrap_err();
        assert_eq!(err, BufferError::CapacityOverflow);
        assert_eq!(buf.capacity(), 4);
    }

    #[test]
    fn oversized_layout_is_capacity_overflow() {
        let mut buf: RawBuffer<u64> = RawBuffer::new();
        let err = buf.try_reserve(0, usize::MAX / 4).unwrap_err();
        assert_eq!(err, BufferError::CapacityOverflow);
        assert!(!buf.is_allocated());
    }

    #[test]
    fn shrink_to_fit_then_to_zero() {
        let mut buf: RawBuffer<i32> = RawBuffer::with_capacity(10);
        buf.shrink_to_fit(5);
        assert_eq!(buf.capacity(), 5);
        buf.shrink_to_fit(0);
        assert_eq!(buf.capacity(), 0);
        assert!(!buf.is_allocated());
    }

    #[test]
    fn shrink_to_fit_never_grows() {
        let mut buf: RawBuffer<i32> = RawBuffer::with_capacity(4);
        buf.shrink_to_fit(9);
        assert_eq!(buf.capacity(), 4);
    }

    #[test]
    fn release_is_idempotent() {
        let counting = CountingAllocator::new();
        let mut buf: RawBuffer<u32, _> = RawBuffer::with_capacity_in(8, &counting);
        buf.release();
        buf.release();
        drop(buf);
        assert_eq!(counting.allocations(), 1);
        assert_eq!(counting.deallocations(), 1);
        assert_eq!(counting.live_bytes(), 0);
    }

    #[test]
    fn released_buffer_matches_fresh_one() {
        let mut buf: RawBuffer<u32> = RawBuffer::with_capacity(3);
        buf.release();
        let fresh: RawBuffer<u32> = RawBuffer::new();
        assert_eq!(buf.capacity(), fresh.capacity());
        assert_eq!(buf.is_allocated(), fresh.is_allocated());
        assert_eq!(buf.as_uninit_slice().len(), fresh.as_uninit_slice().len());
    }

    #[test]
    fn contents_survive_growth() {
        let mut buf: RawBuffer<u32> = RawBuffer::with_capacity(2);
        buf.as_uninit_slice_mut()[0].write(11);
        buf.as_uninit_slice_mut()[1].write(22);
        buf.grow(3);
        // SAFETY: slots 0 and 1 were written above and survive reallocation.
        let kept = unsafe {
            [
                buf.as_uninit_slice()[0].assume_init(),
                buf.as_uninit_slice()[1].assume_init(),
            ]
        };
        assert_eq!(kept, [11, 22]);
    }

    #[test]
    fn failed_grow_leaves_buffer_untouched() {
        let failing = FailingAllocator::fail_after(1);
        let mut buf: RawBuffer<u64, _> = RawBuffer::with_capacity_in(2, &failing);
        let err = buf.try_grow(3).unwrap_err();
        assert_eq!(err, BufferError::OutOfMemory { requested: 32 });
        assert_eq!(buf.capacity(), 2);
        assert!(buf.is_allocated());
    }

    #[test]
    fn failed_initial_allocation_is_reported() {
        let failing = FailingAllocator::fail_after(0);
        let err = RawBuffer::<u8, _>::try_with_capacity_in(16, &failing).unwrap_err();
        assert_eq!(err, BufferError::OutOfMemory { requested: 16 });
    }

    #[test]
    fn refused_shrink_keeps_allocation_by_default() {
        let failing = FailingAllocator::refuse_shrink();
        let mut buf: RawBuffer<u32, _> = RawBuffer::with_capacity_in(10, &failing);
        buf.shrink_to_fit(4);
        assert_eq!(buf.capacity(), 10);
        assert!(buf.is_allocated());
    }

    #[test]
    fn try_shrink_reports_refusal() {
        let failing = FailingAllocator::refuse_shrink();
        let mut buf: RawBuffer<u32, _> = RawBuffer::with_capacity_in(10, &failing);
        let err = buf.try_shrink_to_fit(4).unwrap_err();
        assert_eq!(err, BufferError::OutOfMemory { requested: 16 });
        assert_eq!(buf.capacity(), 10);
        // Shrinking to zero is a release, not a reallocation.
        buf.try_shrink_to_fit(0).unwrap();
        assert!(!buf.is_allocated());
    }

    #[test]
    fn drop_and_release_return_every_byte() {
        let counting = CountingAllocator::new();
        {
            let mut buf: RawBuffer<u64, _> = RawBuffer::with_capacity_in(4, &counting);
            buf.grow(5);
            buf.shrink_to_fit(0);
            assert!(!buf.is_allocated());
            buf.reserve(0, 3);
        }
        assert_eq!(counting.allocations(), 2);
        assert_eq!(counting.deallocations(), 2);
        assert_eq!(counting.live_bytes(), 0);
    }

    #[test]
    fn configured_buffer_with_initial_capacity() {
        let counting = CountingAllocator::new();
        let config = BufferConfig::new()
            .with_min_non_zero_cap(16)
            .with_shrink_failure(ShrinkFailure::Abort);
        let mut buf: RawBuffer<u32, _> =
            RawBuffer::with_capacity_and_config_in(3, config, &counting);
        assert_eq!(buf.capacity(), 3);
        assert_eq!(buf.config(), &config);
        assert_eq!(counting.live_bytes(), 12);
        buf.release();
        buf.grow(1);
        assert_eq!(buf.capacity(), 16);
    }

    #[test]
    fn configured_buffer_reports_failed_initial_allocation() {
        let failing = FailingAllocator::fail_after(0);
        let config = BufferConfig::new().with_min_non_zero_cap(4);
        let err = RawBuffer::<u16, _>::try_with_capacity_and_config_in(8, config, &failing)
            .unwrap_err();
        assert_eq!(err, BufferError::OutOfMemory { requested: 16 });
    }

    #[test]
    fn abort_policy_terminates_on_refused_shrink() {
        const CHILD_ENV: &str = "BALLAST_SHRINK_ABORT_CHILD";
        if std::env::var_os(CHILD_ENV).is_some() {
            let failing = FailingAllocator::refuse_shrink();
            let config = BufferConfig::new().with_shrink_failure(ShrinkFailure::Abort);
            let mut buf: RawBuffer<u32, _> =
                RawBuffer::with_capacity_and_config_in(10, config, &failing);
            buf.shrink_to_fit(4);
            // Reaching this point means the policy did not terminate.
            return;
        }

        let status = std::process::Command::new(std::env::current_exe().unwrap())
            .args([
                "--exact",
                "raw::tests::abort_policy_terminates_on_refused_shrink",
                "--test-threads=1",
                "--nocapture",
            ])
            .env(CHILD_ENV, "1")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .unwrap();
        assert!(!status.success(), "refused shrink under Abort must terminate");
    }

    #[test]
    fn zero_sized_elements_never_touch_the_allocator() {
        let counting = CountingAllocator::new();
        let mut buf: RawBuffer<(), _> = RawBuffer::new_in(&counting);
        buf.grow(100);
        assert_eq!(buf.capacity(), 128);
        assert!(buf.is_allocated());
        buf.shrink_to_fit(3);
        assert_eq!(buf.capacity(), 3);
        buf.release();
        assert_eq!(counting.allocations(), 0);
        assert_eq!(counting.reallocations(), 0);
        assert_eq!(counting.deallocations(), 0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn grow_yields_power_of_two_covering_request(needed in 1usize..100_000) {
                let mut buf: RawBuffer<u8> = RawBuffer::new();
                buf.grow(needed);
                prop_assert!(buf.capacity() >= needed);
                prop_assert!(buf.capacity().is_power_of_two());
                prop_assert!(buf.capacity() < needed * 2);
            }

            #[test]
            fn reserve_sequence_keeps_capacity_monotonic(
                requests in proptest::collection::vec(0usize..500, 1..30),
            ) {
                let mut buf: RawBuffer<u32> = RawBuffer::new();
                let mut len = 0usize;
                for additional in requests {
                    let before = buf.capacity();
                    buf.reserve(len, additional);
                    prop_assert!(buf.capacity() >= len + additional);
                    prop_assert!(buf.capacity() >= before);
                    len += additional / 2;
                }
            }
        }
    }
}
