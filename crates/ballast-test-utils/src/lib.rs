//! Test utilities and allocator doubles for Ballast development.
//!
//! Provides instrumented implementations of [`Allocator`]:
//!
//! - [`CountingAllocator`] records every call and the bytes currently
//!   outstanding, for leak and reallocation-count assertions.
//! - [`FailingAllocator`] refuses requests on a schedule, for exercising
//!   out-of-memory paths and the shrink failure policy.
//!
//! Both are meant to be borrowed by the buffer under test (`&counting`
//! implements [`Allocator`]) so the test keeps access to the counters.

#![deny(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::alloc::Layout;
use std::cell::Cell;
use std::ptr::NonNull;

use ballast_core::{Allocator, System};

pub use fixtures::Person;

/// Snapshot of a [`CountingAllocator`]'s counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AllocStats {
    pub allocations: usize,
    pub deallocations: usize,
    pub reallocations: usize,
    pub live_bytes: usize,
}

/// Allocator that forwards to an inner allocator and counts calls.
///
/// Counters use `Cell`, so the allocator is single-threaded like the
/// buffers it instruments.
#[derive(Debug, Default)]
pub struct CountingAllocator<A = System> {
    inner: A,
    stats: Cell<AllocStats>,
}

impl CountingAllocator<System> {
    pub fn new() -> Self {
        Self::wrapping(System)
    }
}

impl<A: Allocator> CountingAllocator<A> {
    /// Count calls made to `inner`.
    pub fn wrapping(inner: A) -> Self {
        Self {
            inner,
            stats: Cell::new(AllocStats::default()),
        }
    }

    pub fn stats(&self) -> AllocStats {
        self.stats.get()
    }

    pub fn allocations(&self) -> usize {
        self.stats.get().allocations
    }

    pub fn deallocations(&self) -> usize {
        self.stats.get().deallocations
    }

    pub fn reallocations(&self) -> usize {
        self.stats.get().reallocations
    }

    /// Bytes handed out and not yet returned.
    pub fn live_bytes(&self) -> usize {
        self.stats.get().live_bytes
    }

    fn update(&self, f: impl FnOnce(&mut AllocStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }
}

#[allow(unsafe_code)]
unsafe impl<A: Allocator> Allocator for CountingAllocator<A> {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        let ptr = self.inner.allocate(layout)?;
        self.update(|s| {
            s.allocations += 1;
            s.live_bytes += layout.size();
        });
        Some(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.update(|s| {
            s.deallocations += 1;
            s.live_bytes -= layout.size();
        });
        // SAFETY: forwarded from the caller.
        unsafe { self.inner.deallocate(ptr, layout) }
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        // SAFETY: forwarded from the caller.
        let moved = unsafe { self.inner.reallocate(ptr, old_layout, new_size) }?;
        self.update(|s| {
            s.reallocations += 1;
            s.live_bytes = s.live_bytes - old_layout.size() + new_size;
        });
        Some(moved)
    }
}

/// Allocator that refuses requests on a schedule.
///
/// Successful requests are served by the system allocator.
#[derive(Debug)]
pub struct FailingAllocator {
    /// Remaining successful allocate/reallocate calls; `None` is unlimited.
    budget: Cell<Option<usize>>,
    refuse_shrink: bool,
}

impl FailingAllocator {
    /// Serve `successes` allocate/reallocate calls, then refuse all others.
    pub fn fail_after(successes: usize) -> Self {
        Self {
            budget: Cell::new(Some(successes)),
            refuse_shrink: false,
        }
    }

    /// Serve everything except reallocations to a smaller size.
    pub fn refuse_shrink() -> Self {
        Self {
            budget: Cell::new(None),
            refuse_shrink: true,
        }
    }

    /// Consume one unit of budget, returning whether the call may proceed.
    fn admit(&self) -> bool {
        match self.budget.get() {
            None => true,
            Some(0) => false,
            Some(n) => {
                self.budget.set(Some(n - 1));
                true
            }
        }
    }
}

#[allow(unsafe_code)]
unsafe impl Allocator for FailingAllocator {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        if !self.admit() {
            return None;
        }
        System.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: every region this allocator hands out comes from System.
        unsafe { System.deallocate(ptr, layout) }
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        if self.refuse_shrink && new_size < old_layout.size() {
            return None;
        }
        if !self.admit() {
            return None;
        }
        // SAFETY: the region came from System; forwarded from the caller.
        unsafe { System.reallocate(ptr, old_layout, new_size) }
    }
}
