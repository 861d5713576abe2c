//! NUL-terminated byte text over a [`SequenceBuffer`].
//!
//! [`TextBuffer`] stores its content followed by a single `0x00` byte in
//! the underlying sequence whenever any memory is held, so the content can
//! be handed to APIs that expect a terminated string without copying. The
//! text is byte-oriented: no encoding is assumed or validated.

use std::cmp::Ordering;
use std::ffi::CStr;
use std::fmt;

use ballast_core::{Allocator, BufferError, System};

use crate::config::BufferConfig;
use crate::raw::alloc_failure;
use crate::sequence::SequenceBuffer;

/// A growable, NUL-terminated byte string drawing memory from `A`.
///
/// Invariant: whenever `capacity() > 0`, the byte at index `len()` is
/// `0x00` and `capacity() >= len() + 1`. The terminator is not counted in
/// `len()`.
pub struct TextBuffer<A: Allocator = System> {
    /// Content plus terminator; empty only when nothing is allocated.
    bytes: SequenceBuffer<u8, A>,
}

impl TextBuffer<System> {
    /// Create an empty text backed by the system allocator.
    pub const fn new() -> Self {
        Self::new_in(System)
    }

    /// Create an empty text with room for `capacity` bytes, terminator
    /// included.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(capacity, System)
    }

    /// Copy `bytes` into a new text sized for exactly the content and its
    /// terminator.
    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Self {
        Self::from_bytes_in(bytes, System)
    }
}

impl Default for TextBuffer<System> {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for TextBuffer<System> {
    fn from(text: &str) -> Self {
        Self::from_bytes(text)
    }
}

impl From<&[u8]> for TextBuffer<System> {
    fn from(bytes: &[u8]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl<A: Allocator> TextBuffer<A> {
    /// Create an empty text. No allocation is performed.
    pub const fn new_in(alloc: A) -> Self {
        Self {
            bytes: SequenceBuffer::new_in(alloc),
        }
    }

    /// Create an empty text with a custom configuration.
    pub fn with_config_in(config: BufferConfig, alloc: A) -> Self {
        Self {
            bytes: SequenceBuffer::with_config_in(config, alloc),
        }
    }

    /// Create an empty text with room for `capacity` bytes, terminator
    /// included. A non-zero capacity writes the terminator immediately.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        Self::with_capacity_and_config_in(capacity, BufferConfig::new(), alloc)
    }

    /// Create an empty text with room for `capacity` bytes, returning an
    /// error instead of aborting.
    pub fn try_with_capacity_in(capacity: usize, alloc: A) -> Result<Self, BufferError> {
        Self::try_with_capacity_and_config_in(capacity, BufferConfig::new(), alloc)
    }

    /// Create an empty, configured text with room for `capacity` bytes,
    /// terminator included.
    pub fn with_capacity_and_config_in(capacity: usize, config: BufferConfig, alloc: A) -> Self {
        let mut text = Self {
            bytes: SequenceBuffer::with_capacity_and_config_in(capacity, config, alloc),
        };
        text.restore_terminator();
        text
    }

    /// Create an empty, configured text with room for `capacity` bytes,
    /// returning an error instead of aborting.
    pub fn try_with_capacity_and_config_in(
        capacity: usize,
        config: BufferConfig,
        alloc: A,
    ) -> Result<Self, BufferError> {
        let mut text = Self {
            bytes: SequenceBuffer::try_with_capacity_and_config_in(capacity, config, alloc)?,
        };
        text.restore_terminator();
        Ok(text)
    }

    /// Copy `bytes` into a new text sized for exactly the content and its
    /// terminator.
    pub fn from_bytes_in(bytes: impl AsRef<[u8]>, alloc: A) -> Self {
        let bytes = bytes.as_ref();
        let mut text = Self {
            bytes: SequenceBuffer::with_capacity_in(bytes.len() + 1, alloc),
        };
        text.bytes.extend_from_slice(bytes);
        text.bytes.push(0);
        text
    }

    /// Content length in bytes, terminator excluded.
    pub fn len(&self) -> usize {
        self.bytes.len().saturating_sub(1)
    }

    /// Whether the text has no content.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes the allocation can hold, terminator slot included.
    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    /// The allocator backing this text.
    pub fn allocator(&self) -> &A {
        self.bytes.allocator()
    }

    /// The configuration this text was created with.
    pub fn config(&self) -> &BufferConfig {
        self.bytes.config()
    }

    /// Make room for `additional` more content bytes plus the terminator.
    pub fn reserve(&mut self, additional: usize) {
        if let Err(err) = self.try_reserve(additional) {
            alloc_failure::<u8>(err);
        }
    }

    /// Make room for `additional` more content bytes plus the terminator,
    /// returning an error instead of aborting.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), BufferError> {
        let terminator = usize::from(self.bytes.is_empty());
        let additional = additional
            .checked_add(terminator)
            .ok_or(BufferError::CapacityOverflow)?;
        self.bytes.try_reserve(additional)?;
        self.restore_terminator();
        Ok(())
    }

    /// Append `bytes`.
    ///
    /// Aborts the process if the allocation fails.
    pub fn push_str(&mut self, bytes: impl AsRef<[u8]>) {
        if let Err(err) = self.try_push_str(bytes) {
            alloc_failure::<u8>(err);
        }
    }

    /// Append `bytes`, returning an error instead of aborting. On error
    /// the text is unchanged.
    pub fn try_push_str(&mut self, bytes: impl AsRef<[u8]>) -> Result<(), BufferError> {
        let bytes = bytes.as_ref();
        self.try_reserve(bytes.len())?;
        // Capacity now covers content, `bytes` and the terminator.
        let len = self.len();
        self.bytes.truncate(len);
        self.bytes.extend_from_slice(bytes);
        self.bytes.push(0);
        Ok(())
    }

    /// Append a single byte.
    pub fn push(&mut self, byte: u8) {
        self.push_str([byte]);
    }

    /// Append a single byte, returning an error instead of aborting.
    pub fn try_push(&mut self, byte: u8) -> Result<(), BufferError> {
        self.try_push_str([byte])
    }

    /// Remove and return the last byte, or `None` when empty.
    pub fn pop(&mut self) -> Option<u8> {
        let len = self.len();
        let last = *self.as_bytes().last()?;
        self.truncate(len - 1);
        Some(last)
    }

    /// Shorten the content to `new_len` bytes.
    ///
    /// No-op when `new_len > len()`.
    pub fn truncate(&mut self, new_len: usize) {
        if new_len > self.len() || self.bytes.is_empty() {
            return;
        }
        self.bytes.truncate(new_len);
        self.bytes.push(0);
    }

    /// Remove all content. Capacity is retained; an allocated text keeps
    /// its terminator at index 0.
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Insert `byte` at `index`, shifting the tail right.
    pub fn insert(&mut self, index: usize, byte: u8) -> Result<(), BufferError> {
        self.insert_str(index, [byte])
    }

    /// Insert `bytes` at `index`, shifting the tail right.
    ///
    /// `index` may equal `len()`, which appends. An index violation is
    /// returned; an allocation failure aborts the process.
    pub fn insert_str(&mut self, index: usize, bytes: impl AsRef<[u8]>) -> Result<(), BufferError> {
        match self.try_insert_str(index, bytes) {
            Err(err) if err.is_allocation_failure() => alloc_failure::<u8>(err),
            other => other,
        }
    }

    /// Insert a single byte at `index`, returning allocation failures
    /// instead of aborting.
    pub fn try_insert(&mut self, index: usize, byte: u8) -> Result<(), BufferError> {
        self.try_insert_str(index, [byte])
    }

    /// Insert `bytes` at `index`, returning allocation failures instead of
    /// aborting. On any error the text is unchanged.
    pub fn try_insert_str(
        &mut self,
        index: usize,
        bytes: impl AsRef<[u8]>,
    ) -> Result<(), BufferError> {
        let len = self.len();
        if index > len {
            return Err(BufferError::IndexOutOfBounds { index, len });
        }
        let bytes = bytes.as_ref();
        if self.bytes.is_empty() {
            // Nothing allocated yet, so index is 0 and this is an append.
            return self.try_push_str(bytes);
        }
        self.try_reserve(bytes.len())?;

        let old_total = self.bytes.len();
        self.bytes.resize(old_total + bytes.len(), 0);
        let buf = self.bytes.as_mut_slice();
        buf.copy_within(index..old_total, index + bytes.len());
        buf[index..index + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Remove and return the byte at `index`, shifting the tail left.
    pub fn remove(&mut self, index: usize) -> Result<u8, BufferError> {
        let len = self.len();
        if index >= len {
            return Err(BufferError::IndexOutOfBounds { index, len });
        }
        let buf = self.bytes.as_mut_slice();
        let removed = buf[index];
        buf.copy_within(index + 1.., index);
        self.bytes.truncate(len);
        Ok(removed)
    }

    /// Copy bytes `[start, end)` into a new, independently owned text.
    ///
    /// The copy draws from a clone of this text's allocator.
    pub fn substring(&self, start: usize, end: usize) -> Result<Self, BufferError>
    where
        A: Clone,
    {
        let len = self.len();
        if start > end || end > len {
            return Err(BufferError::InvalidRange { start, end, len });
        }
        Ok(Self::from_bytes_in(
            &self.as_bytes()[start..end],
            self.allocator().clone(),
        ))
    }

    /// Byte-lexicographic comparison of the terminated views.
    ///
    /// Like `strcmp`, content after an embedded NUL does not participate.
    pub fn compare<B: Allocator>(&self, other: &TextBuffer<B>) -> Ordering {
        self.as_c_str().cmp(other.as_c_str())
    }

    /// Whether the terminated views are byte-for-byte equal.
    pub fn equals<B: Allocator>(&self, other: &TextBuffer<B>) -> bool {
        self.compare(other) == Ordering::Equal
    }

    /// The content bytes, terminator excluded.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes.as_slice()[..self.len()]
    }

    /// The content bytes followed by the terminator.
    ///
    /// An unallocated text yields a static `"\0"`.
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        if self.bytes.is_empty() {
            b"\0"
        } else {
            self.bytes.as_slice()
        }
    }

    /// The terminated view, ending at the first NUL byte.
    pub fn as_c_str(&self) -> &CStr {
        CStr::from_bytes_until_nul(self.as_bytes_with_nul()).unwrap_or_default()
    }

    /// Reduce capacity to the content plus terminator.
    ///
    /// Empty text releases its allocation entirely.
    pub fn shrink_to_fit(&mut self) {
        if self.is_empty() {
            self.release();
        } else {
            self.bytes.shrink_to_fit();
        }
    }

    /// Return the allocation to the allocator. Idempotent.
    pub fn release(&mut self) {
        self.bytes.release();
    }

    /// Re-establish the terminator after the allocation appeared.
    fn restore_terminator(&mut self) {
        if self.bytes.is_empty() && self.bytes.capacity() > 0 {
            self.bytes.push(0);
        }
    }
}

impl<A: Allocator + Clone> Clone for TextBuffer<A> {
    fn clone(&self) -> Self {
        Self {
            bytes: self.bytes.clone(),
        }
    }
}

impl<A: Allocator> fmt::Debug for TextBuffer<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&String::from_utf8_lossy(self.as_bytes()), f)
    }
}

impl<A: Allocator> fmt::Display for TextBuffer<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}

impl<A: Allocator, B: Allocator> PartialEq<TextBuffer<B>> for TextBuffer<A> {
    fn eq(&self, other: &TextBuffer<B>) -> bool {
        self.equals(other)
    }
}

impl<A: Allocator> Eq for TextBuffer<A> {}

impl<A: Allocator, B: Allocator> PartialOrd<TextBuffer<B>> for TextBuffer<A> {
    fn partial_cmp(&self, other: &TextBuffer<B>) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl<A: Allocator> Ord for TextBuffer<A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}
