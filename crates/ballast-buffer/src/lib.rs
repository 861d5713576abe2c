//! Allocator-parameterised growable buffers.
//!
//! Three layers, each owning the one below it exclusively:
//!
//! ```text
//! TextBuffer<A>            content + NUL terminator, byte-oriented
//! └── SequenceBuffer<u8, A>
//!     └── RawBuffer<u8, A> capacity only, no notion of length
//!         └── A: Allocator allocate / deallocate / reallocate
//! ```
//!
//! # Growth policy
//!
//! Capacity grows by doubling: an empty buffer allocates
//! [`BufferConfig::min_non_zero_cap`] slots (1 by default) and every later
//! growth at least doubles. `n` appends therefore cost `O(n)` copies in
//! total, at the price of up to 2x transient over-allocation.
//!
//! # Allocation failure
//!
//! Every growing operation comes in two forms. The plain form (`push`,
//! `reserve`, ...) aborts the process through
//! [`std::alloc::handle_alloc_error`] when the allocator refuses; the
//! `try_` form returns [`BufferError::OutOfMemory`] and leaves the buffer
//! unchanged. Index and range violations are always returned as errors.
//!
//! # Views and invalidation
//!
//! Contents are exposed only as slices borrowed from the buffer. Any
//! operation that may reallocate takes `&mut self`, so a view cannot
//! outlive the region it points into.
//!
//! # Unsafe code
//!
//! Confined to `raw` (allocation and uninitialised slot views) and
//! `sequence` (reading and dropping initialised slots). `text` is built
//! entirely on the safe sequence API.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod config;
pub mod raw;
pub mod sequence;
pub mod text;

// Public re-exports for the primary API surface.
pub use ballast_core::{Allocator, BufferError, FnAllocator, System};
pub use config::{BufferConfig, ShrinkFailure};
pub use raw::RawBuffer;
pub use sequence::SequenceBuffer;
pub use text::TextBuffer;
