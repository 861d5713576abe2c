//! Length-tracked sequences over a [`RawBuffer`].
//!
//! [`SequenceBuffer`] adds a logical length to the raw region: slots
//! `[0, len)` hold live values, `[len, capacity)` are spare. Element drops
//! happen here; the raw layer only ever sees memory.

#![allow(unsafe_code)]

use std::fmt;
use std::mem::{self, MaybeUninit};
use std::ptr;

use ballast_core::{Allocator, BufferError, System};

use crate::config::BufferConfig;
use crate::raw::RawBuffer;

/// A growable sequence of `T` drawing memory from `A`.
///
/// Invariant: `len() <= capacity()`.
pub struct SequenceBuffer<T, A: Allocator = System> {
    buf: RawBuffer<T, A>,
    len: usize,
}

impl<T> SequenceBuffer<T, System> {
    /// Create an empty sequence backed by the system allocator.
    pub const fn new() -> Self {
        Self::new_in(System)
    }

    /// Create an empty sequence with room for `capacity` elements.
    ///
    /// Aborts the process if the allocation fails.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(capacity, System)
    }
}

impl<T> Default for SequenceBuffer<T, System> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A: Allocator> SequenceBuffer<T, A> {
    /// Create an empty sequence. No allocation is performed.
    pub const fn new_in(alloc: A) -> Self {
        Self {
            buf: RawBuffer::new_in(alloc),
            len: 0,
        }
    }

    /// Create an empty sequence with a custom configuration.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid (see [`BufferConfig`]).
    pub fn with_config_in(config: BufferConfig, alloc: A) -> Self {
        Self {
            buf: RawBuffer::with_config_in(config, alloc),
            len: 0,
        }
    }

    /// Create an empty sequence with room for `capacity` elements.
    ///
    /// Aborts the process if the allocation fails.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        Self {
            buf: RawBuffer::with_capacity_in(capacity, alloc),
            len: 0,
        }
    }

    /// Create an empty sequence with room for `capacity` elements,
    /// returning an error instead of aborting.
    pub fn try_with_capacity_in(capacity: usize, alloc: A) -> Result<Self, BufferError> {
        Ok(Self {
            buf: RawBuffer::try_with_capacity_in(capacity, alloc)?,
            len: 0,
        })
    }

    /// Create an empty, configured sequence with room for `capacity`
    /// elements.
    ///
    /// Aborts the process if the allocation fails.
    pub fn with_capacity_and_config_in(capacity: usize, config: BufferConfig, alloc: A) -> Self {
        Self {
            buf: RawBuffer::with_capacity_and_config_in(capacity, config, alloc),
            len: 0,
        }
    }

    /// Create an empty, configured sequence with room for `capacity`
    /// elements, returning an error instead of aborting.
    pub fn try_with_capacity_and_config_in(
        capacity: usize,
        config: BufferConfig,
        alloc: A,
    ) -> Result<Self, BufferError> {
        Ok(Self {
            buf: RawBuffer::try_with_capacity_and_config_in(capacity, config, alloc)?,
            len: 0,
        })
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the sequence holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of elements the sequence can hold without reallocating.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// The allocator backing this sequence.
    pub fn allocator(&self) -> &A {
        self.buf.allocator()
    }

    /// The configuration this sequence was created with.
    pub fn config(&self) -> &BufferConfig {
        self.buf.config()
    }

    /// Make room for at least `additional` more elements.
    pub fn reserve(&mut self, additional: usize) {
        self.buf.reserve(self.len, additional);
    }

    /// Make room for at least `additional` more elements, returning an
    /// error instead of aborting.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), BufferError> {
        self.buf.try_reserve(self.len, additional)
    }

    /// Append `value`, growing the region when full.
    pub fn push(&mut self, value: T) {
        if self.len == self.buf.capacity() {
            self.buf.reserve(self.len, 1);
        }
        self.write_next(value);
    }

    /// Append `value`, returning an error instead of aborting when the
    /// region cannot grow. On error `value` is dropped and the sequence is
    /// unchanged.
    pub fn try_push(&mut self, value: T) -> Result<(), BufferError> {
        if self.len == self.buf.capacity() {
            self.buf.try_reserve(self.len, 1)?;
        }
        self.write_next(value);
        Ok(())
    }

    /// Remove and return the last element, or `None` when empty.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: slot `len` was initialised and now lies outside the live
        // region, so it is read out exactly once.
        Some(unsafe { self.buf.as_uninit_slice()[self.len].assume_init_read() })
    }

    /// Shared reference to the element at `index`.
    pub fn get(&self, index: usize) -> Result<&T, BufferError> {
        self.as_slice().get(index).ok_or(BufferError::IndexOutOfBounds {
            index,
            len: self.len,
        })
    }

    /// Mutable reference to the element at `index`.
    pub fn get_mut(&mut self, index: usize) -> Result<&mut T, BufferError> {
        let len = self.len;
        self.as_mut_slice()
            .get_mut(index)
            .ok_or(BufferError::IndexOutOfBounds { index, len })
    }

    /// Overwrite the element at `index`, returning the previous value.
    pub fn set(&mut self, index: usize, value: T) -> Result<T, BufferError> {
        let slot = self.get_mut(index)?;
        Ok(mem::replace(slot, value))
    }

    /// Shorten to `new_len`, dropping the removed tail.
    ///
    /// No-op when `new_len >= len()`; never grows.
    pub fn truncate(&mut self, new_len: usize) {
        if new_len >= self.len {
            return;
        }
        let old_len = self.len;
        // Shrink first so a panicking destructor cannot cause a double drop.
        self.len = new_len;
        let tail = &mut self.buf.as_uninit_slice_mut()[new_len..old_len];
        // SAFETY: the tail slots were initialised and are no longer
        // reachable through `len`.
        unsafe { ptr::drop_in_place(tail as *mut [MaybeUninit<T>] as *mut [T]) };
    }

    /// Resize to `new_len`, filling new slots with clones of `fill`.
    ///
    /// Shrinking behaves like [`truncate`](Self::truncate).
    pub fn resize(&mut self, new_len: usize, fill: T)
    where
        T: Clone,
    {
        if new_len <= self.len {
            self.truncate(new_len);
            return;
        }
        self.reserve(new_len - self.len);
        while self.len + 1 < new_len {
            self.write_next(fill.clone());
        }
        self.write_next(fill);
    }

    /// Append clones of every element in `items`.
    pub fn extend_from_slice(&mut self, items: &[T])
    where
        T: Clone,
    {
        self.reserve(items.len());
        for item in items {
            self.write_next(item.clone());
        }
    }

    /// Remove every element. Capacity is retained.
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Reduce capacity to the current length.
    ///
    /// An empty sequence releases its region entirely.
    pub fn shrink_to_fit(&mut self) {
        self.buf.shrink_to_fit(self.len);
    }

    /// Reduce capacity to the current length, returning the allocator's
    /// refusal instead of applying the shrink policy.
    pub fn try_shrink_to_fit(&mut self) -> Result<(), BufferError> {
        self.buf.try_shrink_to_fit(self.len)
    }

    /// Drop every element and return the region to the allocator.
    ///
    /// Idempotent. Afterwards the sequence is indistinguishable from a new
    /// one and may be reused.
    pub fn release(&mut self) {
        self.clear();
        self.buf.release();
    }

    /// The live elements.
    pub fn as_slice(&self) -> &[T] {
        let live = &self.buf.as_uninit_slice()[..self.len];
        // SAFETY: slots [0, len) are initialised; MaybeUninit<T> and T share
        // a layout.
        unsafe { &*(live as *const [MaybeUninit<T>] as *const [T]) }
    }

    /// The live elements, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        let len = self.len;
        let live = &mut self.buf.as_uninit_slice_mut()[..len];
        // SAFETY: as in `as_slice`; `&mut self` guarantees exclusivity.
        unsafe { &mut *(live as *mut [MaybeUninit<T>] as *mut [T]) }
    }

    /// Write `value` into slot `len` and extend the live region over it.
    ///
    /// Capacity must already cover the slot; indexing enforces it.
    fn write_next(&mut self, value: T) {
        self.buf.as_uninit_slice_mut()[self.len].write(value);
        self.len += 1;
    }
}

impl<T, A: Allocator> Drop for SequenceBuffer<T, A> {
    fn drop(&mut self) {
        // The raw buffer's own drop returns the region afterwards.
        self.clear();
    }
}

impl<T: Clone, A: Allocator + Clone> Clone for SequenceBuffer<T, A> {
    fn clone(&self) -> Self {
        let mut copy =
            Self::with_capacity_and_config_in(self.len, *self.config(), self.allocator().clone());
        copy.extend_from_slice(self.as_slice());
        copy
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for SequenceBuffer<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl<T: PartialEq, A: Allocator, B: Allocator> PartialEq<SequenceBuffer<T, B>>
    for SequenceBuffer<T, A>
{
    fn eq(&self, other: &SequenceBuffer<T, B>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, A: Allocator> Eq for SequenceBuffer<T, A> {}
